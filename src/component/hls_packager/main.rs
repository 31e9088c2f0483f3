use super::cue_writer::{build_cue_entries, sprite_reference, write_cue_file};
use super::rendition_planner::{RenditionSpec, plan_renditions};
use super::sprite_compositor::compose_sprite;
use super::sprite_planner::{PreviewSpritePlan, plan_preview_sprite};
use super::transcode_command::{TranscodeCommandBuilder, format_args_for_display};
use super::transcode_runner::run_transcode;
use crate::config::PackagingConfig;
use crate::tools::{
    SourceMediaInfo, ensure_directory_exists, expand_media_inputs, probe_media,
};
use anyhow::{Context, Result, bail};
use console::style;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 批次打包結果
#[derive(Debug, Default)]
pub struct PackagingReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// HLS 打包協調器
///
/// 每個輸入檔依序走完五個階段：
/// A. 探測媒體資訊（ffprobe）
/// B. 規劃輸出變體與預覽取樣
/// C. 組裝並執行單次 ffmpeg 轉碼（所有輸出一次解碼完成）
/// D. 合成時間軸預覽大圖
/// E. 寫出 cue 檔
///
/// 一次只處理一個檔案：多路輸出的轉碼本身就吃滿整台機器，
/// 平行處理多個檔案只會互相拖慢。
/// 單一檔案失敗不中斷整批，結尾統整後以非零代碼結束
pub struct HlsPackager {
    config: PackagingConfig,
    shutdown_signal: Arc<AtomicBool>,
    /// 靜默模式：不輸出進度與階段訊息，錯誤仍會回報
    silent: bool,
}

impl HlsPackager {
    #[must_use]
    pub const fn new(config: PackagingConfig, shutdown_signal: Arc<AtomicBool>, silent: bool) -> Self {
        Self {
            config,
            shutdown_signal,
            silent,
        }
    }

    pub fn run(&self, inputs: &[PathBuf]) -> Result<PackagingReport> {
        let files = expand_media_inputs(inputs, &self.config.media_type_table)?;

        if !self.silent {
            println!(
                "{}",
                style(format!("共 {} 個媒體檔案待處理", files.len())).green()
            );
        }

        let mut report = PackagingReport {
            total: files.len(),
            ..PackagingReport::default()
        };

        for (index, file) in files.iter().enumerate() {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷訊號，停止處理");
                report.skipped = files.len() - index;
                break;
            }

            if !self.silent {
                let file_name = file.file_name().unwrap_or_default().to_string_lossy();
                println!(
                    "\n{} [{}/{}] {}",
                    style("處理中").cyan(),
                    index + 1,
                    files.len(),
                    style(file_name.as_ref()).bold()
                );
            }

            match self.process_single_file(file) {
                Ok(()) => {
                    if !self.silent {
                        println!("  {} 打包完成", style("✓").green());
                    }
                    report.successful += 1;
                }
                Err(e) => {
                    error!("處理失敗 {}: {e:#}", file.display());
                    if !self.silent {
                        println!("  {} 處理失敗: {e}", style("✗").red());
                    }
                    report.failed += 1;
                }
            }
        }

        self.print_summary(&report);
        Ok(report)
    }

    /// 決定單一輸入的輸出目錄：
    /// `<輸出根>[/<保留的相對路徑>]/<檔名主幹>/`，
    /// 未指定輸出根時落在輸入檔旁
    fn resolve_output_dir(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map_or_else(|| "media".to_string(), |s| s.to_string_lossy().to_string());

        let base = match &self.config.output_root {
            Some(root) => match &self.config.preserve_dirs_from {
                Some(preserve_root) => {
                    let parent = input.parent().unwrap_or_else(|| Path::new(""));
                    match parent.strip_prefix(preserve_root) {
                        Ok(relative) => root.join(relative),
                        Err(_) => {
                            warn!(
                                "輸入 {} 不在 --preserve-dirs-from 根目錄之下，直接輸出到根目錄",
                                input.display()
                            );
                            root.clone()
                        }
                    }
                }
                None => root.clone(),
            },
            None => input.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        };

        base.join(stem)
    }

    fn process_single_file(&self, input: &Path) -> Result<()> {
        let output_dir = self.resolve_output_dir(input);

        // Stage A: 探測媒體資訊
        if !self.silent {
            print!("  {} 探測媒體資訊...", style("A").dim());
        }
        let media = probe_media(input, self.config.count_frames)
            .with_context(|| format!("無法探測媒體: {}", input.display()))?;
        if !self.silent {
            match &media.video {
                Some(video) => println!(
                    " {:.1}s, {}x{}, {:.2}fps",
                    media.duration_seconds,
                    video.width,
                    video.height,
                    video.frame_rate.as_f64()
                ),
                None => println!(" {:.1}s, 純音訊", media.duration_seconds),
            }
        }

        self.check_destination(&output_dir, &media)?;

        // Stage B: 規劃輸出
        let renditions = media
            .video
            .as_ref()
            .map(|video| plan_renditions(video.height, &self.config.video))
            .unwrap_or_default();
        if !self.silent && !renditions.is_empty() {
            let heights: Vec<String> = renditions
                .iter()
                .map(|r| format!("{}p", r.height))
                .collect();
            println!("  {} 輸出變體: {}", style("B").dim(), heights.join(", "));
        }

        let sprite_plan = if self.config.previews_enabled
            && media.video.is_some()
            && media.duration_seconds > 0.0
        {
            let plan = plan_preview_sprite(media.duration_seconds, &self.config.preview);
            info!(
                "預覽取樣: {} 幀，間隔 {:.2}s",
                plan.frame_count, plan.frame_interval
            );
            Some(plan)
        } else {
            None
        };

        if !self.config.dry_run {
            ensure_directory_exists(&output_dir)?;
            ensure_directory_exists(&output_dir.join("_tmp"))?;
            self.prepare_segment_dirs(&output_dir, &media, &renditions)?;
        }
        let temp_dir = output_dir.join("_tmp");

        let result = self.run_pipeline(
            input,
            &output_dir,
            &temp_dir,
            &media,
            &renditions,
            sprite_plan.as_ref(),
        );

        // 無論成敗都嘗試清理暫存目錄
        if temp_dir.exists() && fs::remove_dir_all(&temp_dir).is_err() {
            warn!("無法清理暫存目錄: {}", temp_dir.display());
        }

        result
    }

    /// 預先建立各變體的分段子目錄
    ///
    /// ffmpeg 的 hls muxer 不會替分段模板中的子目錄做遞迴建立
    fn prepare_segment_dirs(
        &self,
        output_dir: &Path,
        media: &SourceMediaInfo,
        renditions: &[RenditionSpec],
    ) -> Result<()> {
        if !self.config.hls_enabled {
            return Ok(());
        }

        let variant_names: Vec<String> = if media.video.is_some() {
            renditions.iter().map(|r| format!("{}p", r.height)).collect()
        } else {
            vec!["audio".to_string()]
        };

        for name in variant_names {
            let segment_relative = self
                .config
                .hls
                .segment_name
                .replace("{stream}", &name)
                .replace("{index}", "0");
            if let Some(parent) = output_dir.join(segment_relative).parent() {
                ensure_directory_exists(parent)?;
            }
        }
        Ok(())
    }

    /// 目的地已存在且未指定 --overwrite 時直接回報錯誤
    fn check_destination(&self, output_dir: &Path, media: &SourceMediaInfo) -> Result<()> {
        if self.config.overwrite {
            return Ok(());
        }

        let root_playlist = output_dir.join(&self.config.hls.root_playlist_name);
        if self.config.hls_enabled && root_playlist.exists() {
            bail!(
                "輸出已存在: {}（使用 --overwrite 覆寫）",
                root_playlist.display()
            );
        }

        let fallback_extension = if media.video.is_some() { "mp4" } else { "mp3" };
        let fallback = output_dir.join(format!("progressive.{fallback_extension}"));
        if self.config.fallback_enabled && fallback.exists() {
            bail!("輸出已存在: {}（使用 --overwrite 覆寫）", fallback.display());
        }

        Ok(())
    }

    fn run_pipeline(
        &self,
        input: &Path,
        output_dir: &Path,
        temp_dir: &Path,
        media: &SourceMediaInfo,
        renditions: &[RenditionSpec],
        sprite_plan: Option<&PreviewSpritePlan>,
    ) -> Result<()> {
        let builder = TranscodeCommandBuilder::new(
            &self.config,
            input,
            media,
            renditions,
            sprite_plan,
            output_dir,
            temp_dir,
        );
        let args = builder.build()?;

        if self.config.dry_run {
            if !self.silent {
                println!("  {} dry-run，僅顯示 ffmpeg 命令:", style("C").dim());
                println!("{}", style(format_args_for_display(&args)).dim());
            }
            return Ok(());
        }

        // Stage C: 轉碼
        if !self.silent {
            println!("  {} 轉碼中...", style("C").dim());
        }
        let total_frames = media.video.as_ref().and_then(|video| video.frame_count);
        run_transcode(
            &args,
            media.duration_seconds,
            total_frames,
            &self.shutdown_signal,
            !self.silent,
        )?;

        // 海報從暫存位置就位
        let poster_temp = builder.poster_temp_path();
        if poster_temp.exists() {
            let poster_final = output_dir.join(format!(
                "poster.{}",
                self.config.image_format.extension()
            ));
            fs::rename(&poster_temp, &poster_final)
                .with_context(|| format!("無法搬移海報: {}", poster_final.display()))?;
            info!("海報已建立: {}", poster_final.display());
        }

        if let Some(plan) = sprite_plan {
            self.compose_timeline_preview(output_dir, temp_dir, plan)?;
        }

        Ok(())
    }

    /// Stage D/E: 合成預覽大圖並寫出 cue 檔
    fn compose_timeline_preview(
        &self,
        output_dir: &Path,
        temp_dir: &Path,
        plan: &PreviewSpritePlan,
    ) -> Result<()> {
        let frames = collect_preview_frames(temp_dir)?;
        if frames.is_empty() {
            warn!("沒有擷取到任何預覽幀，略過時間軸預覽");
            return Ok(());
        }

        if !self.silent {
            print!("  {} 合成預覽大圖 ({} 幀)...", style("D").dim(), frames.len());
        }
        let seek_dir = output_dir.join("seek");
        ensure_directory_exists(&seek_dir)?;

        let sprite_file_name = format!("storyboard.{}", self.config.image_format.extension());
        let sprite_path = seek_dir.join(&sprite_file_name);
        let sheet = compose_sprite(
            &frames,
            self.config.preview.sprite_columns,
            &sprite_path,
            self.config.image_format,
        )
        .with_context(|| "合成預覽大圖失敗")?;
        if !self.silent {
            println!(" {}x{}", sheet.tile_width * sheet.columns, sheet.tile_height * sheet.rows);
            print!("  {} 寫出 cue 檔...", style("E").dim());
        }
        let entries = build_cue_entries(frames.len(), plan.frame_interval, &sheet);
        let reference = sprite_reference(self.config.output_prefix.as_deref(), &sprite_file_name);
        write_cue_file(&seek_dir.join("thumbnails.vtt"), &entries, &reference)?;
        if !self.silent {
            println!(" {} 筆", entries.len());
        }

        info!("時間軸預覽已建立: {}", sprite_path.display());
        Ok(())
    }

    fn print_summary(&self, report: &PackagingReport) {
        if !self.silent {
            println!();
            println!("{}", style("=== 打包摘要 ===").cyan().bold());
            println!("  總計: {} 個檔案", report.total);
            println!("  成功: {} 個", style(report.successful).green());

            if report.skipped > 0 {
                println!("  未處理: {} 個", style(report.skipped).yellow());
            }
            if report.failed > 0 {
                println!("  失敗: {} 個", style(report.failed).red());
            }
        }

        info!(
            "打包完成 - 成功: {}, 失敗: {}, 未處理: {}",
            report.successful, report.failed, report.skipped
        );
    }
}

/// 收集轉碼階段寫入暫存目錄的預覽幀（依編號排序）
fn collect_preview_frames(temp_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(temp_dir)
        .with_context(|| format!("無法讀取暫存目錄: {}", temp_dir.display()))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("preview_"))
        })
        .collect();

    frames.sort();
    Ok(frames)
}
