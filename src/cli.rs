use clap::Parser;
use std::path::PathBuf;

/// 將媒體檔案打包為可自行架設的 HLS 串流套件：
/// 多解析度轉碼、主播放清單、漸進式備援檔、海報與時間軸預覽圖
#[derive(Parser, Debug)]
#[command(name = "hls_packager", version, arg_required_else_help = true)]
pub struct CliArgs {
    /// 輸入媒體檔案或資料夾（資料夾會遞迴掃描媒體檔）
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// 輸出根目錄（預設為輸入檔案所在目錄）
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// 寫入預覽圖 cue 檔的 URL/路徑前綴
    #[arg(long)]
    pub output_prefix: Option<String>,

    /// HLS 分段容器格式（mpegts 或 fmp4）
    #[arg(long, default_value = "mpegts")]
    pub hls_type: String,

    /// HLS 分段長度（秒）
    #[arg(long, default_value_t = 6.0)]
    pub hls_interval: f64,

    /// 分段檔名模板，支援 {stream} 與 {index} 佔位符
    #[arg(long, default_value = "{stream}/segment_{index}")]
    pub hls_segment_name: String,

    /// 主播放清單檔名
    #[arg(long, default_value = "manifest.m3u8")]
    pub hls_root_playlist_name: String,

    /// 影片編碼器
    #[arg(long, default_value = "libx264")]
    pub video_codec: String,

    /// 影片像素格式
    #[arg(long, default_value = "yuv420p")]
    pub video_pixel_format: String,

    /// 目標解析度列表（垂直高度，逗號分隔，由大到小）
    #[arg(long, value_delimiter = ',', default_values_t = [2160, 1440, 1080, 720, 480, 360, 240])]
    pub video_resolutions: Vec<u32>,

    /// 各解析度對應的位元率列表（長度不足時重複最後一項）
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = ["16000k", "10000k", "5000k", "3000k", "1500k", "800k", "400k"].map(String::from)
    )]
    pub video_bitrates: Vec<String>,

    /// 各解析度對應的編碼 profile 列表（長度不足時重複最後一項）
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = ["high", "high", "high", "high", "main", "main", "baseline"].map(String::from)
    )]
    pub video_profiles: Vec<String>,

    /// 各解析度對應的編碼 level 列表（長度不足時重複最後一項）
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = ["5.1", "5.0", "4.2", "4.0", "3.1", "3.0", "3.0"].map(String::from)
    )]
    pub video_levels: Vec<String>,

    /// 音訊編碼器
    #[arg(long, default_value = "aac")]
    pub audio_codec: String,

    /// 音訊編碼 profile
    #[arg(long, default_value = "aac_low")]
    pub audio_profile: String,

    /// 音訊位元率
    #[arg(long, default_value = "128k")]
    pub audio_bitrate: String,

    /// 預覽圖每列磁貼數
    #[arg(long, default_value_t = 10)]
    pub timeline_preview_sprite_columns: u32,

    /// 預覽圖磁貼高度（像素）
    #[arg(long, default_value_t = 90)]
    pub timeline_preview_tile_height: u32,

    /// 預覽幀取樣間隔下限（秒）
    #[arg(long, default_value_t = 1.0)]
    pub timeline_preview_interval_min: f64,

    /// 預覽幀取樣間隔上限（秒）
    #[arg(long, default_value_t = 10.0)]
    pub timeline_preview_interval_max: f64,

    /// 預覽幀數量上限
    #[arg(long, default_value_t = 180)]
    pub timeline_preview_max_images: u32,

    /// 海報與預覽圖格式（webp、jpeg 或 avif）
    #[arg(long, default_value = "webp")]
    pub image_format: String,

    /// 以此根目錄為基準，在輸出目錄中保留輸入檔的相對路徑結構
    #[arg(long)]
    pub preserve_dirs_from: Option<PathBuf>,

    /// 探測時實際計算影格數（較慢，進度回報更精確）
    #[arg(long)]
    pub count_frames: bool,

    /// 所有輸出皆不含音訊
    #[arg(long)]
    pub no_audio: bool,

    /// 不產生 HLS 套件
    #[arg(long)]
    pub no_hls: bool,

    /// 不產生漸進式備援檔
    #[arg(long)]
    pub no_fallback: bool,

    /// 不產生時間軸預覽圖
    #[arg(long)]
    pub no_timeline_previews: bool,

    /// 覆寫既有輸出
    #[arg(long)]
    pub overwrite: bool,

    /// 僅顯示將執行的轉碼命令，不實際執行
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// 靜默模式（僅輸出錯誤）
    #[arg(short = 's', long, conflicts_with = "verbose")]
    pub silent: bool,

    /// 詳細輸出（除錯用）
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rendition_ladder() {
        let args = CliArgs::parse_from(["hls_packager", "input.mp4"]);
        assert_eq!(args.video_resolutions, vec![2160, 1440, 1080, 720, 480, 360, 240]);
        assert_eq!(args.video_bitrates.len(), 7);
        assert_eq!(args.video_profiles.len(), 7);
        assert_eq!(args.video_levels.len(), 7);
        assert_eq!(args.hls_root_playlist_name, "manifest.m3u8");
        assert!((args.hls_interval - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_comma_separated_lists() {
        let args = CliArgs::parse_from([
            "hls_packager",
            "--video-resolutions",
            "1080,720",
            "--video-bitrates",
            "5000k",
            "input.mp4",
        ]);
        assert_eq!(args.video_resolutions, vec![1080, 720]);
        assert_eq!(args.video_bitrates, vec!["5000k".to_string()]);
    }

    #[test]
    fn test_feature_toggles() {
        let args = CliArgs::parse_from([
            "hls_packager",
            "--no-hls",
            "--no-audio",
            "--overwrite",
            "-d",
            "input.mp4",
        ]);
        assert!(args.no_hls);
        assert!(args.no_audio);
        assert!(args.overwrite);
        assert!(args.dry_run);
        assert!(!args.no_fallback);
    }
}
