//! E2E 測試 - 以真實 ffmpeg/ffprobe 驗證完整打包流程
//!
//! 測試資料位於 /tmp/hls_packager_test/input，可用以下命令生成：
//!
//! ```bash
//! mkdir -p /tmp/hls_packager_test/input
//! ffmpeg -f lavfi -i testsrc=duration=12:size=1280x720:rate=30 \
//!        -f lavfi -i sine=frequency=440:duration=12 \
//!        -c:v libx264 -c:a aac -shortest \
//!        /tmp/hls_packager_test/input/test_video_01.mp4
//! ffmpeg -f lavfi -i sine=frequency=220:duration=8 \
//!        /tmp/hls_packager_test/input/test_audio_01.mp3
//! ```
//!
//! 測試資料不存在時各測試直接跳過

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use hls_packager::cli::CliArgs;
use hls_packager::component::HlsPackager;
use hls_packager::config::PackagingConfig;
use hls_packager::tools::probe_media;

const TEST_INPUT_DIR: &str = "/tmp/hls_packager_test/input";

fn test_video() -> PathBuf {
    Path::new(TEST_INPUT_DIR).join("test_video_01.mp4")
}

fn test_audio() -> PathBuf {
    Path::new(TEST_INPUT_DIR).join("test_audio_01.mp3")
}

fn packager_for(output_dir: &Path, extra: &[&str]) -> HlsPackager {
    let mut argv = vec!["hls_packager", "-o"];
    let output = output_dir.to_string_lossy().to_string();
    argv.push(&output);
    argv.extend_from_slice(extra);
    argv.push("placeholder.mp4");
    let config = PackagingConfig::from_cli(&CliArgs::parse_from(argv)).unwrap();
    HlsPackager::new(config, Arc::new(AtomicBool::new(false)), false)
}

/// 測試 1: 探測真實影片
#[test]
fn test_probe_real_video() {
    let video = test_video();
    if !video.exists() {
        println!("跳過測試：測試影片不存在，請先生成測試資料");
        return;
    }

    let info = probe_media(&video, false).unwrap();
    assert!(info.duration_seconds > 10.0);

    let stream = info.video.unwrap();
    assert_eq!(stream.width, 1280);
    assert_eq!(stream.height, 720);
    assert!((stream.frame_rate.as_f64() - 30.0).abs() < 0.01);
    assert!(info.audio.is_some());

    println!("✓ 影片探測測試通過");
}

/// 測試 2: 完整打包一部 720p 測試影片
#[test]
fn test_package_video_end_to_end() {
    let video = test_video();
    if !video.exists() {
        println!("跳過測試：測試影片不存在，請先生成測試資料");
        return;
    }

    let output_root = tempfile::tempdir().unwrap();
    let packager = packager_for(output_root.path(), &["--overwrite"]);
    let report = packager.run(&[video]).unwrap();

    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 0);

    let bundle = output_root.path().join("test_video_01");

    // 720p 來源：2160/1440/1080 被濾除，剩 720/480/360/240 四個變體
    assert!(bundle.join("manifest.m3u8").exists(), "缺少主播放清單");
    for name in ["720p", "480p", "360p", "240p"] {
        assert!(bundle.join(format!("{name}.m3u8")).exists(), "缺少變體播放清單 {name}");
    }
    assert!(!bundle.join("1080p.m3u8").exists());

    assert!(bundle.join("progressive.mp4").exists(), "缺少備援檔");
    assert!(bundle.join("poster.webp").exists(), "缺少海報");
    assert!(bundle.join("seek/storyboard.webp").exists(), "缺少預覽大圖");

    let cue = std::fs::read_to_string(bundle.join("seek/thumbnails.vtt")).unwrap();
    assert!(cue.starts_with("WEBVTT"));
    assert!(cue.contains("storyboard.webp#xywh="));

    // 暫存目錄必須已清理
    assert!(!bundle.join("_tmp").exists(), "暫存目錄未清理");

    println!("✓ 影片打包 E2E 測試通過");
}

/// 測試 3: 純音訊來源走 mp3 備援與單一音訊變體
#[test]
fn test_package_audio_only_end_to_end() {
    let audio = test_audio();
    if !audio.exists() {
        println!("跳過測試：測試音訊不存在，請先生成測試資料");
        return;
    }

    let output_root = tempfile::tempdir().unwrap();
    let packager = packager_for(output_root.path(), &["--overwrite"]);
    let report = packager.run(&[audio]).unwrap();

    assert_eq!(report.successful, 1);

    let bundle = output_root.path().join("test_audio_01");
    assert!(bundle.join("manifest.m3u8").exists());
    assert!(bundle.join("audio.m3u8").exists());
    assert!(bundle.join("progressive.mp3").exists());
    // 沒有視訊就沒有海報與預覽
    assert!(!bundle.join("poster.webp").exists());
    assert!(!bundle.join("seek").exists());

    println!("✓ 純音訊打包 E2E 測試通過");
}

/// 測試 4: 未加 --overwrite 時重複打包應失敗，加上後成功
#[test]
fn test_existing_destination_requires_overwrite() {
    let video = test_video();
    if !video.exists() {
        println!("跳過測試：測試影片不存在，請先生成測試資料");
        return;
    }

    let output_root = tempfile::tempdir().unwrap();

    let first = packager_for(output_root.path(), &[]).run(std::slice::from_ref(&video)).unwrap();
    assert_eq!(first.successful, 1);

    // 同一目的地再跑一次：該檔案應失敗但整批正常結束
    let second = packager_for(output_root.path(), &[]).run(std::slice::from_ref(&video)).unwrap();
    assert_eq!(second.failed, 1);
    assert_eq!(second.successful, 0);

    let third = packager_for(output_root.path(), &["--overwrite"]).run(&[video]).unwrap();
    assert_eq!(third.successful, 1);

    println!("✓ 覆寫保護測試通過");
}

/// 測試 5: dry-run 僅規劃不產出任何檔案
#[test]
fn test_dry_run_writes_nothing() {
    let video = test_video();
    if !video.exists() {
        println!("跳過測試：測試影片不存在，請先生成測試資料");
        return;
    }

    let output_root = tempfile::tempdir().unwrap();
    let packager = packager_for(output_root.path(), &["--dry-run"]);
    let report = packager.run(&[video]).unwrap();

    assert_eq!(report.successful, 1);
    assert!(
        !output_root.path().join("test_video_01").exists(),
        "dry-run 不應建立輸出目錄"
    );

    println!("✓ dry-run 測試通過");
}
