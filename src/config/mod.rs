pub mod load;
pub mod types;

pub use types::{
    AudioSettings, HlsSegmentType, HlsSettings, ImageFormat, MediaTypeTable, PackagingConfig,
    PreviewSettings, VideoSettings,
};
