use crate::config::VideoSettings;
use log::{info, warn};

/// 單一輸出變體：解析度、位元率與編碼參數
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionSpec {
    pub height: u32,
    pub bitrate: String,
    pub profile: String,
    pub level: String,
}

/// 依來源解析度規劃輸出變體
///
/// 位元率、profile 與 level 列表先補齊到解析度列表的長度
/// （重複各自的最後一項），再逐索引組成候選。
/// 高於來源解析度的候選會被濾除；保留設定順序，不重新排序。
/// 過濾後若一個不剩，改以來源高度輸出單一變體，
/// 沿用最小設定項的編碼參數（不放大）
#[must_use]
pub fn plan_renditions(source_height: u32, video: &VideoSettings) -> Vec<RenditionSpec> {
    let count = video.heights.len();
    let bitrates = pad_to_length(&video.bitrates, count);
    let profiles = pad_to_length(&video.profiles, count);
    let levels = pad_to_length(&video.levels, count);

    let mut plan = Vec::new();
    for (i, &height) in video.heights.iter().enumerate() {
        if height > source_height {
            info!("略過 {height}p 變體：高於來源解析度 {source_height}p");
            continue;
        }
        plan.push(RenditionSpec {
            height,
            bitrate: bitrates[i].clone(),
            profile: profiles[i].clone(),
            level: levels[i].clone(),
        });
    }

    if plan.is_empty()
        && let Some((smallest_index, _)) = video
            .heights
            .iter()
            .enumerate()
            .min_by_key(|&(_, &height)| height)
    {
        warn!("所有設定解析度皆高於來源 {source_height}p，改以來源解析度輸出單一變體");
        plan.push(RenditionSpec {
            height: source_height,
            bitrate: bitrates[smallest_index].clone(),
            profile: profiles[smallest_index].clone(),
            level: levels[smallest_index].clone(),
        });
    }

    plan
}

/// 補齊列表到指定長度：重複最後一項；過長則截斷
fn pad_to_length(values: &[String], count: usize) -> Vec<String> {
    let mut padded: Vec<String> = values.iter().take(count).cloned().collect();
    if let Some(last) = padded.last().cloned() {
        while padded.len() < count {
            padded.push(last.clone());
        }
    }
    padded
}
