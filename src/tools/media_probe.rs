use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// 精確幀率（有理數，例如 30000/1001）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// 解析 ffprobe 的幀率字串（"30/1"、"30000/1001" 或 "30"）
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some((num_str, den_str)) = raw.split_once('/') {
            let num: u32 = num_str.parse().ok()?;
            let den: u32 = den_str.parse().ok()?;
            if num > 0 && den > 0 {
                return Some(Self { num, den });
            }
            return None;
        }
        let num: u32 = raw.parse().ok()?;
        if num > 0 { Some(Self { num, den: 1 }) } else { None }
    }
}

/// 選定的視訊串流資訊
#[derive(Debug, Clone)]
pub struct VideoStreamInfo {
    /// 來源容器中的絕對串流索引
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// 已知時的總影格數（`--count-frames` 或容器自帶）
    pub frame_count: Option<u64>,
}

/// 選定的音訊串流資訊
#[derive(Debug, Clone)]
pub struct AudioStreamInfo {
    pub index: u32,
    pub channels: u32,
    pub sample_rate: u32,
}

/// 來源媒體的探測結果，載入後不再變動
#[derive(Debug, Clone)]
pub struct SourceMediaInfo {
    pub duration_seconds: f64,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    index: u32,
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    duration: Option<String>,
    disposition: Option<Disposition>,
}

#[derive(Deserialize)]
struct Disposition {
    attached_pic: Option<u8>,
}

impl StreamInfo {
    fn is_attached_pic(&self) -> bool {
        self.disposition
            .as_ref()
            .and_then(|d| d.attached_pic)
            .is_some_and(|v| v != 0)
    }
}

/// 使用 ffprobe 探測媒體檔案
///
/// `count_frames` 為真時加上 `-count_packets`，以實際讀取的封包數
/// 補足容器未記錄的影格數
pub fn probe_media(path: &Path, count_frames: bool) -> Result<SourceMediaInfo> {
    let mut args = vec![
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ];
    if count_frames {
        args.push("-count_packets");
    }

    let output = Command::new("ffprobe")
        .args(&args)
        .arg(path)
        .output()
        .with_context(|| format!("無法執行 ffprobe: {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe 執行失敗: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&stdout, count_frames)
        .with_context(|| format!("無法解析媒體資訊: {}", path.display()))
}

/// 將 ffprobe 的 JSON 輸出轉換為型別化的探測結果
///
/// 必要欄位（尺寸、長度、取樣率）缺失時直接回報錯誤，
/// 不以預設值矇混
fn parse_probe_output(raw: &str, count_frames: bool) -> Result<SourceMediaInfo> {
    let probe: FfprobeOutput = serde_json::from_str(raw).context("無法解析 ffprobe 輸出")?;

    let streams = probe.streams.unwrap_or_default();

    let video_stream = streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video") && !s.is_attached_pic());
    let audio_stream = streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    if video_stream.is_none() && audio_stream.is_none() {
        bail!("找不到任何可用的視訊或音訊串流");
    }

    let video = video_stream
        .map(|s| -> Result<VideoStreamInfo> {
            let width = s.width.ok_or_else(|| anyhow::anyhow!("無法取得影片寬度"))?;
            let height = s.height.ok_or_else(|| anyhow::anyhow!("無法取得影片高度"))?;
            let frame_rate = s
                .r_frame_rate
                .as_deref()
                .and_then(FrameRate::parse)
                .ok_or_else(|| anyhow::anyhow!("無法取得影片幀率"))?;

            let frame_count = s
                .nb_frames
                .as_deref()
                .and_then(|v| v.parse::<u64>().ok())
                .or_else(|| {
                    if count_frames {
                        s.nb_read_packets.as_deref().and_then(|v| v.parse().ok())
                    } else {
                        None
                    }
                });

            Ok(VideoStreamInfo {
                index: s.index,
                width,
                height,
                frame_rate,
                frame_count,
            })
        })
        .transpose()?;

    let audio = audio_stream
        .map(|s| -> Result<AudioStreamInfo> {
            let channels = s
                .channels
                .ok_or_else(|| anyhow::anyhow!("無法取得音訊聲道數"))?;
            let sample_rate = s
                .sample_rate
                .as_deref()
                .and_then(|v| v.parse::<u32>().ok())
                .ok_or_else(|| anyhow::anyhow!("無法取得音訊取樣率"))?;

            Ok(AudioStreamInfo {
                index: s.index,
                channels,
                sample_rate,
            })
        })
        .transpose()?;

    // 長度優先取容器層，其次任一選定串流
    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or_else(|| video_stream.and_then(|s| s.duration.as_ref()))
        .or_else(|| audio_stream.and_then(|s| s.duration.as_ref()))
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| anyhow::anyhow!("無法取得媒體長度"))?;

    Ok(SourceMediaInfo {
        duration_seconds,
        video,
        audio,
    })
}
