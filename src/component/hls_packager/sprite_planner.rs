use crate::config::PreviewSettings;

/// 時間軸預覽的取樣計畫
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewSpritePlan {
    /// 相鄰取樣幀的時間間隔（秒）
    pub frame_interval: f64,
    /// 取樣幀總數，至少 1、不超過設定上限
    pub frame_count: u32,
}

/// 由媒體長度推導取樣幀數與間隔
///
/// 三層規則，門檻值與既有輸出的檔名/數量逐位元相容，勿調整：
/// 1. 短片（長度 <= 間隔下限*60）：依下限間隔取樣
/// 2. 中片（長度 <= 間隔上限*60）：固定 60 幀
/// 3. 長片（長度 <= 間隔上限*幀數上限）：依上限間隔取樣
/// 4. 超長片：維持幀數上限，接受更疏的間隔
///
/// 最後以 `間隔 = 長度 / 幀數` 回推，使取樣大致鋪滿全片
#[must_use]
pub fn plan_preview_sprite(duration_seconds: f64, preview: &PreviewSettings) -> PreviewSpritePlan {
    let min_interval = preview.interval_min;
    let max_interval = preview.interval_max;
    let max_images = f64::from(preview.max_images);

    let mut frame_count = max_images;
    if duration_seconds <= min_interval * 60.0 {
        frame_count = duration_seconds / min_interval;
    } else if duration_seconds <= max_interval * 60.0 {
        frame_count = 60.0;
    } else if duration_seconds <= max_interval * max_images {
        frame_count = duration_seconds / max_interval;
    }

    let frame_count = (frame_count.floor() as u32).clamp(1, preview.max_images);
    let frame_interval = duration_seconds / f64::from(frame_count);

    PreviewSpritePlan {
        frame_interval,
        frame_count,
    }
}
