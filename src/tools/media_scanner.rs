use crate::config::MediaTypeTable;
use crate::tools::validate_file_exists;
use anyhow::{Result, bail};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 展開輸入路徑列表為實際要處理的媒體檔案
///
/// 檔案參數直接採用（存在即可，格式交給探測階段把關）；
/// 資料夾參數以副檔名表遞迴掃描，結果依路徑排序
pub fn expand_media_inputs(inputs: &[PathBuf], table: &MediaTypeTable) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found = scan_media_files(input, table);
            debug!("於 {} 掃描到 {} 個媒體檔案", input.display(), found.len());
            files.append(&mut found);
        } else {
            validate_file_exists(input)?;
            files.push(input.clone());
        }
    }

    if files.is_empty() {
        bail!("找不到任何可處理的媒體檔案");
    }

    Ok(files)
}

fn scan_media_files(directory: &Path, table: &MediaTypeTable) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| table.is_media_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();

    files.sort();
    files
}
