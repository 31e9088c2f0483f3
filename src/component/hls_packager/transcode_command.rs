use super::rendition_planner::RenditionSpec;
use super::sprite_planner::PreviewSpritePlan;
use crate::config::PackagingConfig;
use crate::tools::SourceMediaInfo;
use anyhow::{Result, bail};
use std::path::Path;

/// 漸進式備援檔的解析度上限（不放大）
const FALLBACK_MAX_HEIGHT: u32 = 720;

/// 海報擷取位置：全片長度的 5%
const POSTER_SEEK_RATIO: f64 = 0.05;

/// 單一輸出目標：自身的選項序列加上目的地
///
/// ffmpeg 的輸出選項作用於「最近宣告的輸出」；以型別化目標累積
/// 選項、最後一次攤平成引數列表，不仰賴陣列位置紀律
#[derive(Debug)]
struct OutputTarget {
    args: Vec<String>,
    destination: String,
}

impl OutputTarget {
    fn new(destination: impl Into<String>) -> Self {
        Self {
            args: Vec::new(),
            destination: destination.into(),
        }
    }

    fn flag(&mut self, flag: impl Into<String>) -> &mut Self {
        self.args.push(flag.into());
        self
    }

    fn option(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.args.push(key.into());
        self.args.push(value.into());
        self
    }
}

/// 組裝單次 ffmpeg 呼叫：一次解碼，同時餵給海報、備援檔、
/// HLS 套件與預覽幀等所有輸出目標
pub struct TranscodeCommandBuilder<'a> {
    config: &'a PackagingConfig,
    source_path: &'a Path,
    media: &'a SourceMediaInfo,
    renditions: &'a [RenditionSpec],
    sprite_plan: Option<&'a PreviewSpritePlan>,
    output_dir: &'a Path,
    temp_dir: &'a Path,
}

impl<'a> TranscodeCommandBuilder<'a> {
    #[must_use]
    pub fn new(
        config: &'a PackagingConfig,
        source_path: &'a Path,
        media: &'a SourceMediaInfo,
        renditions: &'a [RenditionSpec],
        sprite_plan: Option<&'a PreviewSpritePlan>,
        output_dir: &'a Path,
        temp_dir: &'a Path,
    ) -> Self {
        Self {
            config,
            source_path,
            media,
            renditions,
            sprite_plan,
            output_dir,
            temp_dir,
        }
    }

    /// 暫存海報檔路徑（轉碼完成後由協調器搬到正式位置）
    #[must_use]
    pub fn poster_temp_path(&self) -> std::path::PathBuf {
        self.temp_dir
            .join(format!("poster.{}", self.config.image_format.extension()))
    }

    /// 備援檔路徑（純音訊來源為 mp3，其餘為 mp4）
    #[must_use]
    pub fn fallback_path(&self) -> std::path::PathBuf {
        let extension = if self.media.video.is_some() { "mp4" } else { "mp3" };
        self.output_dir.join(format!("progressive.{extension}"))
    }

    /// 建構完整的引數列表
    ///
    /// 宣告順序固定：全域旗標、`-i`、海報、備援檔、HLS、預覽幀
    pub fn build(&self) -> Result<Vec<String>> {
        if self.media.video.is_none() && self.config.mute_audio {
            bail!("純音訊來源加上 --no-audio 後沒有任何可輸出的內容");
        }

        let mut targets = Vec::new();
        if let Some(target) = self.poster_target() {
            targets.push(target);
        }
        if self.config.fallback_enabled {
            targets.push(self.fallback_target()?);
        }
        if self.config.hls_enabled {
            targets.push(self.hls_target()?);
        }
        if let Some(target) = self.preview_target() {
            targets.push(target);
        }
        if targets.is_empty() {
            bail!("所有輸出皆已停用，沒有要執行的轉碼");
        }

        let mut args = self.global_args();
        args.push("-i".to_string());
        args.push(self.source_path.to_string_lossy().to_string());
        for target in targets {
            args.extend(target.args);
            args.push(target.destination);
        }
        Ok(args)
    }

    fn global_args(&self) -> Vec<String> {
        vec![
            if self.config.overwrite { "-y" } else { "-n" }.to_string(),
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
        ]
    }

    /// 海報輸出：有視訊串流時，於全片 5% 處取單一影格
    fn poster_target(&self) -> Option<OutputTarget> {
        let video = self.media.video.as_ref()?;

        let seek = self.media.duration_seconds * POSTER_SEEK_RATIO;
        let mut target = OutputTarget::new(self.poster_temp_path().to_string_lossy());
        target
            .option("-map", format!("0:{}", video.index))
            .option("-ss", format!("{seek:.3}"))
            .option("-frames:v", "1");
        if self.config.image_format == crate::config::ImageFormat::Jpeg {
            target.option("-q:v", "2");
        }
        // 單一檔名不是序列樣板，image2 需要 -update 才不會抱怨
        target.option("-update", "1").option("-f", "image2");
        Some(target)
    }

    /// 備援輸出：720p 上限（不放大）、沿用階梯中對應的位元率；
    /// 純音訊來源改輸出 mp3
    fn fallback_target(&self) -> Result<OutputTarget> {
        let mut target = OutputTarget::new(self.fallback_path().to_string_lossy());

        match &self.media.video {
            Some(video) => {
                let height = video.height.min(FALLBACK_MAX_HEIGHT);
                let step = self
                    .renditions
                    .iter()
                    .find(|r| r.height <= height)
                    .or_else(|| self.renditions.last())
                    .ok_or_else(|| anyhow::anyhow!("沒有可用的變體作為備援檔參數"))?;

                target.option("-map", format!("0:{}", video.index));
                let audio = self.audible_stream();
                if let Some(audio) = audio {
                    target.option("-map", format!("0:{}", audio.index));
                }
                target
                    .option("-filter:v", format!("scale=-2:{height}"))
                    .option("-c:v", &self.config.video.codec)
                    .option("-b:v", &step.bitrate)
                    .option("-profile:v", &step.profile)
                    .option("-level:v", &step.level)
                    .option("-pix_fmt", &self.config.video.pixel_format);
                if audio.is_some() {
                    target
                        .option("-c:a", &self.config.audio.codec)
                        .option("-profile:a", &self.config.audio.profile)
                        .option("-b:a", &self.config.audio.bitrate);
                } else {
                    target.flag("-an");
                }
                target
                    .option("-movflags", "+faststart")
                    .option("-f", "mp4");
            }
            None => {
                let audio = self
                    .audible_stream()
                    .ok_or_else(|| anyhow::anyhow!("沒有可用的音訊串流"))?;
                target
                    .option("-map", format!("0:{}", audio.index))
                    .option("-c:a", "libmp3lame")
                    .option("-b:a", &self.config.audio.bitrate)
                    .option("-f", "mp3");
            }
        }

        Ok(target)
    }

    /// HLS 輸出：每個變體一組以串流索引為鍵的縮放/編碼選項，
    /// 加上把變體配對命名的 var_stream_map
    fn hls_target(&self) -> Result<OutputTarget> {
        let playlist_pattern = self.output_dir.join("%v.m3u8");
        let mut target = OutputTarget::new(playlist_pattern.to_string_lossy());

        match &self.media.video {
            Some(video) => {
                if self.renditions.is_empty() {
                    bail!("要求 HLS 輸出但沒有任何可編碼的變體");
                }

                let audio = self.audible_stream();
                for _ in self.renditions {
                    target.option("-map", format!("0:{}", video.index));
                    if let Some(audio) = audio {
                        target.option("-map", format!("0:{}", audio.index));
                    }
                }

                for (i, rendition) in self.renditions.iter().enumerate() {
                    target
                        .option(format!("-filter:v:{i}"), format!("scale=-2:{}", rendition.height))
                        .option(format!("-c:v:{i}"), &self.config.video.codec)
                        .option(format!("-b:v:{i}"), &rendition.bitrate)
                        .option(format!("-profile:v:{i}"), &rendition.profile)
                        .option(format!("-level:v:{i}"), &rendition.level);
                }
                target.option("-pix_fmt", &self.config.video.pixel_format);

                // 關鍵幀間隔對齊分段長度，確保每段皆可獨立解碼
                let keyint = (video.frame_rate.as_f64() * self.config.hls.interval_seconds)
                    .round()
                    .max(1.0) as u64;
                target
                    .option("-g", keyint.to_string())
                    .option("-keyint_min", keyint.to_string())
                    .option("-sc_threshold", "0");

                if audio.is_some() {
                    target
                        .option("-c:a", &self.config.audio.codec)
                        .option("-profile:a", &self.config.audio.profile)
                        .option("-b:a", &self.config.audio.bitrate);
                }

                let variant_map: Vec<String> = self
                    .renditions
                    .iter()
                    .enumerate()
                    .map(|(i, rendition)| {
                        if audio.is_some() {
                            format!("v:{i},a:{i},name:{}p", rendition.height)
                        } else {
                            format!("v:{i},name:{}p", rendition.height)
                        }
                    })
                    .collect();

                self.append_hls_options(&mut target, &variant_map.join(" "));
            }
            None => {
                // 純音訊來源：單一音訊變體
                let audio = self
                    .audible_stream()
                    .ok_or_else(|| anyhow::anyhow!("要求 HLS 輸出但沒有可編碼的串流"))?;
                target
                    .option("-map", format!("0:{}", audio.index))
                    .option("-c:a", &self.config.audio.codec)
                    .option("-profile:a", &self.config.audio.profile)
                    .option("-b:a", &self.config.audio.bitrate);
                self.append_hls_options(&mut target, "a:0,name:audio");
            }
        }

        Ok(target)
    }

    fn append_hls_options(&self, target: &mut OutputTarget, variant_map: &str) {
        let segment_name = format!(
            "{}.{}",
            substitute_segment_template(&self.config.hls.segment_name),
            self.config.hls.segment_type.segment_extension()
        );
        let segment_path = self.output_dir.join(segment_name);

        target
            .option("-f", "hls")
            .option("-hls_time", self.config.hls.interval_seconds.to_string())
            .option("-hls_playlist_type", "vod")
            .option("-hls_segment_type", self.config.hls.segment_type.ffmpeg_name())
            .option("-hls_flags", "independent_segments")
            .option("-master_pl_name", &self.config.hls.root_playlist_name)
            .option("-hls_segment_filename", segment_path.to_string_lossy())
            .option("-var_stream_map", variant_map);
    }

    /// 預覽幀輸出：以推導的輸出幀率每隔一段取一幀，
    /// 縮放到磁貼高度後寫入暫存編號序列
    fn preview_target(&self) -> Option<OutputTarget> {
        if !self.config.previews_enabled {
            return None;
        }
        let video = self.media.video.as_ref()?;
        let plan = self.sprite_plan?;

        let pattern = self.temp_dir.join("preview_%04d.jpg");
        let mut target = OutputTarget::new(pattern.to_string_lossy());
        target
            .option("-map", format!("0:{}", video.index))
            .option(
                "-filter:v",
                format!(
                    "fps=1/{:.6},scale=-2:{}",
                    plan.frame_interval, self.config.preview.tile_height
                ),
            )
            .option("-frames:v", plan.frame_count.to_string())
            .option("-q:v", "2")
            .option("-f", "image2");
        Some(target)
    }

    fn audible_stream(&self) -> Option<&crate::tools::AudioStreamInfo> {
        if self.config.mute_audio {
            None
        } else {
            self.media.audio.as_ref()
        }
    }
}

/// 將分段模板的 `{stream}`/`{index}` 佔位符換成 ffmpeg 的 `%v`/`%d`
fn substitute_segment_template(template: &str) -> String {
    template.replace("{stream}", "%v").replace("{index}", "%d")
}

/// 將引數列表排成可讀的多行形式（dry-run 顯示用）：
/// 選項與其值同行
#[must_use]
pub fn format_args_for_display(args: &[String]) -> String {
    let mut lines = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        let line = if arg.starts_with('-') && i + 1 < args.len() && !args[i + 1].starts_with('-') {
            let value = &args[i + 1];
            i += 2;
            format!("  {arg} {value}")
        } else {
            i += 1;
            format!("  {arg}")
        };
        lines.push(line);
    }
    lines.join("\n")
}
