//! HLS 打包元件
//!
//! 五階段流程：
//! A. 探測媒體資訊（ffprobe）
//! B. 規劃輸出變體與預覽取樣
//! C. 單次 ffmpeg 轉碼（海報、備援檔、HLS、預覽幀一次解碼完成）
//! D. 合成時間軸預覽大圖
//! E. 寫出 WebVTT cue 檔

mod cue_writer;
mod main;
mod rendition_planner;
mod sprite_compositor;
mod sprite_planner;
mod transcode_command;
mod transcode_runner;

pub use cue_writer::{CueEntry, build_cue_entries, sprite_reference, write_cue_file};
pub use main::{HlsPackager, PackagingReport};
pub use rendition_planner::{RenditionSpec, plan_renditions};
pub use sprite_compositor::{SpriteSheet, TilePlacement, compose_sprite, compute_placements};
pub use sprite_planner::{PreviewSpritePlan, plan_preview_sprite};
pub use transcode_command::{TranscodeCommandBuilder, format_args_for_display};
pub use transcode_runner::run_transcode;
