use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 媒體副檔名對照表（編譯時嵌入，見 `load.rs`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaTypeTable {
    #[serde(rename = "VIDEO_FILE")]
    pub video_file: Vec<String>,
    #[serde(rename = "AUDIO_FILE")]
    pub audio_file: Vec<String>,
}

impl MediaTypeTable {
    #[must_use]
    pub fn media_extensions_set(&self) -> HashSet<String> {
        self.video_file
            .iter()
            .chain(self.audio_file.iter())
            .map(|ext| ext.to_lowercase())
            .collect()
    }

    /// 判斷路徑是否為可處理的媒體檔案（影片或純音訊）
    #[must_use]
    pub fn is_media_file(&self, path: &Path) -> bool {
        let media_extensions = self.media_extensions_set();
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| media_extensions.contains(&format!(".{}", ext.to_lowercase())))
    }
}

/// HLS 分段容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlsSegmentType {
    MpegTs,
    Fmp4,
}

impl HlsSegmentType {
    /// ffmpeg `-hls_segment_type` 參數值
    #[must_use]
    pub const fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::MpegTs => "mpegts",
            Self::Fmp4 => "fmp4",
        }
    }

    /// 分段檔案副檔名
    #[must_use]
    pub const fn segment_extension(self) -> &'static str {
        match self {
            Self::MpegTs => "ts",
            Self::Fmp4 => "m4s",
        }
    }
}

/// 海報與預覽圖的輸出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Webp,
    Jpeg,
    Avif,
}

impl ImageFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
            Self::Avif => "avif",
        }
    }
}

/// 影片編碼設定（解析度階梯為同索引對齊的四個列表）
#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub codec: String,
    pub pixel_format: String,
    pub heights: Vec<u32>,
    pub bitrates: Vec<String>,
    pub profiles: Vec<String>,
    pub levels: Vec<String>,
}

/// 音訊編碼設定
#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub codec: String,
    pub profile: String,
    pub bitrate: String,
}

/// HLS 打包設定
#[derive(Debug, Clone)]
pub struct HlsSettings {
    pub segment_type: HlsSegmentType,
    /// 目標分段長度（秒），同時決定關鍵幀間隔
    pub interval_seconds: f64,
    /// 分段檔名模板，支援 `{stream}` 與 `{index}` 佔位符
    pub segment_name: String,
    pub root_playlist_name: String,
}

/// 時間軸預覽圖設定
#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub sprite_columns: u32,
    pub tile_height: u32,
    pub interval_min: f64,
    pub interval_max: f64,
    pub max_images: u32,
}

/// 整體打包設定
///
/// 啟動時由 CLI 參數建構一次，之後以唯讀引用傳入各元件，
/// 不使用任何全域可變狀態
#[derive(Debug, Clone)]
pub struct PackagingConfig {
    pub media_type_table: MediaTypeTable,
    pub output_root: Option<PathBuf>,
    pub output_prefix: Option<String>,
    pub preserve_dirs_from: Option<PathBuf>,
    pub video: VideoSettings,
    pub audio: AudioSettings,
    pub hls: HlsSettings,
    pub preview: PreviewSettings,
    pub image_format: ImageFormat,
    pub count_frames: bool,
    pub mute_audio: bool,
    pub hls_enabled: bool,
    pub fallback_enabled: bool,
    pub previews_enabled: bool,
    pub overwrite: bool,
    pub dry_run: bool,
}
