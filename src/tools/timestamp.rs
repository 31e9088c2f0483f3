/// 將秒數格式化為 `H:MM:SS.mmm` 時間戳（小時不補零）
///
/// 負值一律視為 0
#[must_use]
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{h}:{m:02}:{s:02}.{ms:03}")
}

/// 解析 `H:MM:SS.mmm` 時間戳回秒數
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let h: u64 = parts[0].parse().ok()?;
    let m: u64 = parts[1].parse().ok()?;
    if m >= 60 {
        return None;
    }

    let (sec_str, ms_str) = parts[2].split_once('.')?;
    let s: u64 = sec_str.parse().ok()?;
    if s >= 60 || ms_str.len() != 3 {
        return None;
    }
    let ms: u64 = ms_str.parse().ok()?;

    Some((h * 3600 + m * 60 + s) as f64 + ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_zero() {
        assert_eq!(format_timestamp(0.0), "0:00:00.000");
    }

    #[test]
    fn test_format_timestamp_with_fraction() {
        assert_eq!(format_timestamp(3661.5), "1:01:01.500");
        assert_eq!(format_timestamp(59.999), "0:00:59.999");
        assert_eq!(format_timestamp(7200.0), "2:00:00.000");
    }

    #[test]
    fn test_format_timestamp_rounds_to_millisecond() {
        // 59.9996 進位到下一秒
        assert_eq!(format_timestamp(59.9996), "0:01:00.000");
    }

    #[test]
    fn test_format_timestamp_negative_clamps_to_zero() {
        assert_eq!(format_timestamp(-1.5), "0:00:00.000");
    }

    #[test]
    fn test_round_trip_millisecond_precision() {
        for &value in &[0.0, 0.001, 1.5, 61.25, 3661.5, 86399.999] {
            let parsed = parse_timestamp(&format_timestamp(value)).unwrap();
            assert!(
                (parsed - value).abs() < 0.001,
                "round trip 誤差過大: {value} -> {parsed}"
            );
        }
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("1:02").is_none());
        assert!(parse_timestamp("1:02:03").is_none());
        assert!(parse_timestamp("1:99:03.000").is_none());
        assert!(parse_timestamp("1:02:75.000").is_none());
        assert!(parse_timestamp("a:bb:cc.ddd").is_none());
    }
}
