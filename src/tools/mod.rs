mod media_probe;
mod media_scanner;
mod path_validator;
mod timestamp;

pub use media_probe::{
    AudioStreamInfo, FrameRate, SourceMediaInfo, VideoStreamInfo, probe_media,
};
pub use media_scanner::expand_media_inputs;
pub use path_validator::{ensure_directory_exists, validate_directory_exists, validate_file_exists};
pub use timestamp::{format_timestamp, parse_timestamp};
