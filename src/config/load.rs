use crate::cli::CliArgs;
use crate::config::types::{
    AudioSettings, HlsSegmentType, HlsSettings, ImageFormat, MediaTypeTable, PackagingConfig,
    PreviewSettings, VideoSettings,
};
use anyhow::{Context, Result, bail};

/// 編譯時嵌入的媒體副檔名對照表（不需要外部檔案）
const MEDIA_EXTENSIONS_JSON: &str = include_str!("../data/media_extensions.json");

impl PackagingConfig {
    /// 由 CLI 參數建構一份經過驗證的不可變設定
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let media_type_table = Self::load_embedded_media_type_table()?;

        if args.video_resolutions.is_empty() {
            bail!("解析度列表不可為空");
        }
        if args.video_resolutions.iter().any(|&h| h == 0) {
            bail!("解析度必須大於 0");
        }
        if args.video_bitrates.is_empty()
            || args.video_profiles.is_empty()
            || args.video_levels.is_empty()
        {
            bail!("位元率、profile 與 level 列表皆至少需要一個項目");
        }
        if args.hls_interval <= 0.0 {
            bail!("HLS 分段長度必須大於 0 秒");
        }
        if !args.hls_segment_name.contains("{index}") {
            bail!("分段檔名模板必須包含 {{index}} 佔位符");
        }
        if args.timeline_preview_interval_min <= 0.0 {
            bail!("預覽取樣間隔下限必須大於 0 秒");
        }
        if args.timeline_preview_interval_max < args.timeline_preview_interval_min {
            bail!("預覽取樣間隔上限不可小於下限");
        }
        if args.timeline_preview_max_images == 0 {
            bail!("預覽幀數量上限必須至少為 1");
        }
        if args.timeline_preview_sprite_columns == 0 {
            bail!("預覽圖每列磁貼數必須至少為 1");
        }
        if args.timeline_preview_tile_height == 0 {
            bail!("預覽圖磁貼高度必須大於 0");
        }

        let segment_type = match args.hls_type.as_str() {
            "mpegts" => HlsSegmentType::MpegTs,
            "fmp4" => HlsSegmentType::Fmp4,
            other => bail!("不支援的 HLS 分段格式: {other}（可用: mpegts、fmp4）"),
        };

        let image_format = match args.image_format.as_str() {
            "webp" => ImageFormat::Webp,
            "jpeg" | "jpg" => ImageFormat::Jpeg,
            "avif" => ImageFormat::Avif,
            other => bail!("不支援的圖片格式: {other}（可用: webp、jpeg、avif）"),
        };

        Ok(Self {
            media_type_table,
            output_root: args.output.clone(),
            output_prefix: args.output_prefix.clone(),
            preserve_dirs_from: args.preserve_dirs_from.clone(),
            video: VideoSettings {
                codec: args.video_codec.clone(),
                pixel_format: args.video_pixel_format.clone(),
                heights: args.video_resolutions.clone(),
                bitrates: args.video_bitrates.clone(),
                profiles: args.video_profiles.clone(),
                levels: args.video_levels.clone(),
            },
            audio: AudioSettings {
                codec: args.audio_codec.clone(),
                profile: args.audio_profile.clone(),
                bitrate: args.audio_bitrate.clone(),
            },
            hls: HlsSettings {
                segment_type,
                interval_seconds: args.hls_interval,
                segment_name: args.hls_segment_name.clone(),
                root_playlist_name: args.hls_root_playlist_name.clone(),
            },
            preview: PreviewSettings {
                sprite_columns: args.timeline_preview_sprite_columns,
                tile_height: args.timeline_preview_tile_height,
                interval_min: args.timeline_preview_interval_min,
                interval_max: args.timeline_preview_interval_max,
                max_images: args.timeline_preview_max_images,
            },
            image_format,
            count_frames: args.count_frames,
            mute_audio: args.no_audio,
            hls_enabled: !args.no_hls,
            fallback_enabled: !args.no_fallback,
            previews_enabled: !args.no_timeline_previews,
            overwrite: args.overwrite,
            dry_run: args.dry_run,
        })
    }

    /// 從編譯時嵌入的 JSON 載入媒體副檔名表
    fn load_embedded_media_type_table() -> Result<MediaTypeTable> {
        serde_json::from_str(MEDIA_EXTENSIONS_JSON).context("無法解析嵌入的媒體副檔名設定")
    }
}
