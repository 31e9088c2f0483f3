use super::sprite_compositor::{SpriteSheet, compute_placements};
use crate::tools::format_timestamp;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 單筆時間軸 cue：時間區間對應大圖上的一塊磁貼
#[derive(Debug, Clone, PartialEq)]
pub struct CueEntry {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 依取樣間隔與磁貼佈局建立 cue 列表
///
/// 與取樣幀一一對應：第 i 筆涵蓋 `[i*間隔, (i+1)*間隔)`，
/// 區域即該幀在大圖上的矩形
#[must_use]
pub fn build_cue_entries(
    frame_count: usize,
    frame_interval: f64,
    sheet: &SpriteSheet,
) -> Vec<CueEntry> {
    compute_placements(frame_count, sheet.columns, sheet.tile_width, sheet.tile_height)
        .iter()
        .map(|placement| CueEntry {
            start_seconds: placement.index as f64 * frame_interval,
            end_seconds: (placement.index + 1) as f64 * frame_interval,
            x: placement.x,
            y: placement.y,
            width: sheet.tile_width,
            height: sheet.tile_height,
        })
        .collect()
}

/// cue 檔中的大圖引用：預設為相鄰的相對檔名，
/// 設定前綴時改為 `<前綴>/seek/<檔名>`
#[must_use]
pub fn sprite_reference(prefix: Option<&str>, sprite_file_name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/seek/{sprite_file_name}", prefix.trim_end_matches('/')),
        None => sprite_file_name.to_string(),
    }
}

/// 寫出 WebVTT 格式的 cue 檔
pub fn write_cue_file(path: &Path, entries: &[CueEntry], sprite_ref: &str) -> Result<()> {
    let mut document = String::from("WEBVTT\n\n");
    for entry in entries {
        document.push_str(&format!(
            "{} --> {}\n{sprite_ref}#xywh={},{},{},{}\n\n",
            format_timestamp(entry.start_seconds),
            format_timestamp(entry.end_seconds),
            entry.x,
            entry.y,
            entry.width,
            entry.height,
        ));
    }

    fs::write(path, document).with_context(|| format!("無法寫入 cue 檔: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn sheet(columns: u32, rows: u32) -> SpriteSheet {
        SpriteSheet {
            image_path: PathBuf::from("/out/seek/storyboard.webp"),
            tile_width: 160,
            tile_height: 90,
            columns,
            rows,
        }
    }

    #[test]
    fn test_cue_timestamps_are_contiguous() {
        let entries = build_cue_entries(30, 2.0, &sheet(10, 3));
        assert_eq!(entries.len(), 30);
        for window in entries.windows(2) {
            assert!(
                (window[0].end_seconds - window[1].start_seconds).abs() < f64::EPSILON,
                "相鄰 cue 的時間必須連續"
            );
        }
        assert!((entries[0].start_seconds - 0.0).abs() < f64::EPSILON);
        assert!((entries[29].end_seconds - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_cue_rectangles_tile_the_canvas_exactly() {
        // 30 張、每列 10 張：矩形應無縫無重疊鋪滿 1600x270
        let sheet = sheet(10, 3);
        let entries = build_cue_entries(30, 2.0, &sheet);

        let total_width = sheet.tile_width * sheet.columns;
        let total_height = sheet.tile_height * sheet.rows;
        let mut covered = vec![false; (total_width * total_height) as usize];

        for entry in &entries {
            for y in entry.y..entry.y + entry.height {
                for x in entry.x..entry.x + entry.width {
                    let index = (y * total_width + x) as usize;
                    assert!(!covered[index], "磁貼矩形重疊於 ({x},{y})");
                    covered[index] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c), "磁貼矩形未鋪滿畫布");
    }

    #[test]
    fn test_sprite_reference_with_and_without_prefix() {
        assert_eq!(sprite_reference(None, "storyboard.webp"), "storyboard.webp");
        assert_eq!(
            sprite_reference(Some("https://cdn.example.com/v/abc/"), "storyboard.webp"),
            "https://cdn.example.com/v/abc/seek/storyboard.webp"
        );
    }

    #[test]
    fn test_write_cue_file_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thumbnails.vtt");
        let entries = build_cue_entries(2, 2.0, &sheet(10, 1));
        write_cue_file(&path, &entries, "storyboard.webp").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let expected = "WEBVTT\n\n\
                        0:00:00.000 --> 0:00:02.000\n\
                        storyboard.webp#xywh=0,0,160,90\n\n\
                        0:00:02.000 --> 0:00:04.000\n\
                        storyboard.webp#xywh=160,0,160,90\n\n";
        assert_eq!(content, expected);
    }
}
