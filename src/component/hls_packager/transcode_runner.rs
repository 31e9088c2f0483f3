use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use regex::Regex;
use std::io::{BufRead, BufReader};
use std::process::{ChildStderr, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 錯誤輸出保留的行數上限（回報失敗原因用）
const STDERR_TAIL_LINES: usize = 20;

/// 已知致命錯誤樣式：命中即終止子程序，不等它自行退出
static FATAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"already exists",
        r"Unrecognized option",
        r"Error opening output",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("無效的致命錯誤樣式"))
    .collect()
});

#[derive(Debug, Clone, Default)]
struct ProgressState {
    out_time_ms: u64,
    frame: u64,
    speed: Option<f64>,
}

/// 執行組裝好的 ffmpeg 命令並回報進度
///
/// stdout（`-progress` 的 key=value 串流）與 stderr 各由獨立執行緒
/// 即時排空，子程序不會因輸出堆積而停滯；主執行緒輪詢結束狀態、
/// 換算完成百分比並更新進度列。進度僅供顯示，不參與控制流程
pub fn run_transcode(
    args: &[String],
    total_duration_seconds: f64,
    total_frames: Option<u64>,
    shutdown_signal: &Arc<AtomicBool>,
    show_progress: bool,
) -> Result<()> {
    debug!("執行 ffmpeg {}", args.join(" "));

    let mut child = Command::new("ffmpeg")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("無法啟動 ffmpeg")?;

    let progress = Arc::new(Mutex::new(ProgressState::default()));
    let fatal_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let stderr_tail: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let mut readers: Vec<JoinHandle<()>> = Vec::new();
    if let Some(handle) = spawn_progress_reader(child.stdout.take(), Arc::clone(&progress)) {
        readers.push(handle);
    }
    if let Some(handle) = spawn_error_reader(
        child.stderr.take(),
        Arc::clone(&fatal_error),
        Arc::clone(&stderr_tail),
    ) {
        readers.push(handle);
    }

    let bar = if show_progress {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .expect("無效的進度列模板")
                .progress_chars("#>-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let status = loop {
        if shutdown_signal.load(Ordering::SeqCst) {
            let _ = child.kill();
            let _ = child.wait();
            bar.abandon_with_message("已中斷");
            bail!("收到中斷信號，轉碼已終止");
        }

        if let Some(message) = fatal_error.lock().ok().and_then(|guard| guard.clone()) {
            let _ = child.kill();
            let _ = child.wait();
            bar.abandon_with_message("轉碼失敗");
            bail!("ffmpeg 回報致命錯誤: {message}");
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                bar.abandon_with_message("轉碼失敗");
                return Err(e).context("無法檢查 ffmpeg 程序狀態");
            }
        }

        if let Ok(state) = progress.lock() {
            let percent = percent_complete(&state, total_duration_seconds, total_frames);
            bar.set_position(percent.round() as u64);
            if let Some(speed) = state.speed {
                bar.set_message(format!("{speed:.2}x"));
            }
        }

        thread::sleep(Duration::from_millis(200));
    };

    for handle in readers {
        let _ = handle.join();
    }

    if status.success() {
        bar.finish_with_message("完成");
        Ok(())
    } else {
        bar.abandon_with_message("轉碼失敗");
        let tail = stderr_tail
            .lock()
            .map(|lines| lines.join("\n"))
            .unwrap_or_default();
        match status.code() {
            Some(code) => bail!("ffmpeg 以代碼 {code} 結束:\n{tail}"),
            None => bail!("ffmpeg 被信號終止:\n{tail}"),
        }
    }
}

/// 讀取 `-progress pipe:1` 的 key=value 串流
fn spawn_progress_reader(
    stdout: Option<ChildStdout>,
    progress: Arc<Mutex<ProgressState>>,
) -> Option<JoinHandle<()>> {
    let stdout = stdout?;

    Some(thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        while let Ok(bytes) = reader.read_line(&mut line) {
            if bytes == 0 {
                break;
            }

            let content = line.trim();
            if let Some((key, value)) = content.split_once('=')
                && let Ok(mut state) = progress.lock()
            {
                match key {
                    "out_time_ms" | "out_time_us" | "out_time" => {
                        if let Some(ms) = parse_out_time_ms(value) {
                            state.out_time_ms = ms;
                        }
                    }
                    "frame" => {
                        if let Ok(frame) = value.parse::<u64>() {
                            state.frame = frame;
                        }
                    }
                    "speed" => {
                        if let Some(speed) = parse_speed(value) {
                            state.speed = Some(speed);
                        }
                    }
                    _ => {}
                }
            }

            line.clear();
        }
    }))
}

/// 讀取 stderr：一般行以警告轉發，命中致命樣式時記下訊息
fn spawn_error_reader(
    stderr: Option<ChildStderr>,
    fatal_error: Arc<Mutex<Option<String>>>,
    stderr_tail: Arc<Mutex<Vec<String>>>,
) -> Option<JoinHandle<()>> {
    let stderr = stderr?;

    Some(thread::spawn(move || {
        let mut reader = BufReader::new(stderr);
        let mut line = String::new();
        while let Ok(bytes) = reader.read_line(&mut line) {
            if bytes == 0 {
                break;
            }

            let content = line.trim();
            if !content.is_empty() {
                if is_fatal_line(content) {
                    if let Ok(mut guard) = fatal_error.lock() {
                        guard.get_or_insert_with(|| content.to_string());
                    }
                } else {
                    warn!("ffmpeg: {content}");
                }

                if let Ok(mut tail) = stderr_tail.lock() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(content.to_string());
                }
            }

            line.clear();
        }
    }))
}

fn is_fatal_line(line: &str) -> bool {
    FATAL_PATTERNS.iter().any(|pattern| pattern.is_match(line))
}

/// 換算完成百分比：優先用已編碼時間對總長度，
/// 其次用影格數對已知的總影格數
fn percent_complete(state: &ProgressState, total_duration: f64, total_frames: Option<u64>) -> f64 {
    if total_duration > 0.0 {
        let encoded = state.out_time_ms as f64 / 1000.0;
        return (encoded / total_duration * 100.0).clamp(0.0, 100.0);
    }
    if let Some(total) = total_frames
        && total > 0
    {
        return (state.frame as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
    }
    0.0
}

/// 解析進度串流的時間欄位
///
/// `out_time_ms`/`out_time_us` 為微秒整數；後備解析 `HH:MM:SS.micro`
fn parse_out_time_ms(raw: &str) -> Option<u64> {
    if let Ok(us) = raw.parse::<u64>() {
        return Some(us / 1000);
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() == 3 {
        let h = parts[0].parse::<u64>().ok()?;
        let m = parts[1].parse::<u64>().ok()?;
        let seconds_part = parts[2];
        let (s, micro) = if let Some((sec, micro)) = seconds_part.split_once('.') {
            (sec.parse::<u64>().ok()?, micro.parse::<u64>().unwrap_or(0))
        } else {
            (seconds_part.parse::<u64>().ok()?, 0)
        };
        let total_ms = (h * 3600 + m * 60 + s) * 1000 + micro / 1000;
        return Some(total_ms);
    }
    None
}

fn parse_speed(raw: &str) -> Option<f64> {
    if let Some(stripped) = raw.strip_suffix('x') {
        stripped.parse::<f64>().ok()
    } else {
        raw.parse::<f64>().ok()
    }
}
