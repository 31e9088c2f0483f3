use crate::config::ImageFormat;
use anyhow::{Context, Result, bail};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, imageops};
use log::debug;
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// 單一磁貼在大圖上的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePlacement {
    pub index: usize,
    pub x: u32,
    pub y: u32,
}

/// 合成完畢的預覽大圖
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub image_path: PathBuf,
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
    pub rows: u32,
}

/// 依索引計算每張磁貼的網格位置與像素位移
#[must_use]
pub fn compute_placements(
    frame_count: usize,
    columns: u32,
    tile_width: u32,
    tile_height: u32,
) -> Vec<TilePlacement> {
    (0..frame_count)
        .map(|index| {
            let column = index as u32 % columns;
            let row = index as u32 / columns;
            TilePlacement {
                index,
                x: column * tile_width,
                y: row * tile_height,
            }
        })
        .collect()
}

/// 將預覽幀磁貼成單張大圖並編碼輸出
///
/// 磁貼尺寸取第一張幀的實際尺寸；所有幀必須一致
/// （同一條縮放濾鏡出來的序列本就相同）。
/// 幀以 rayon 平行解碼，單執行緒逐一貼上畫布
pub fn compose_sprite(
    frame_paths: &[PathBuf],
    columns: u32,
    output_path: &Path,
    format: ImageFormat,
) -> Result<SpriteSheet> {
    if frame_paths.is_empty() {
        bail!("沒有可合成的預覽幀");
    }

    let frames: Vec<RgbImage> = frame_paths
        .par_iter()
        .map(|path| {
            image::open(path)
                .map(|img| img.to_rgb8())
                .with_context(|| format!("無法讀取預覽幀: {}", path.display()))
        })
        .collect::<Result<_>>()?;

    let tile_width = frames[0].width();
    let tile_height = frames[0].height();
    if frames
        .iter()
        .any(|frame| frame.width() != tile_width || frame.height() != tile_height)
    {
        bail!("預覽幀尺寸不一致，無法磁貼");
    }

    let rows = (frames.len() as u32).div_ceil(columns);
    let total_width = tile_width * columns;
    let total_height = tile_height * rows;

    debug!(
        "合成 {} 張預覽幀為 {columns}x{rows} 大圖 ({total_width}x{total_height})",
        frames.len()
    );

    let mut canvas = RgbImage::new(total_width, total_height);
    for placement in compute_placements(frames.len(), columns, tile_width, tile_height) {
        imageops::replace(
            &mut canvas,
            &frames[placement.index],
            i64::from(placement.x),
            i64::from(placement.y),
        );
    }

    encode_sprite(&canvas, output_path, format)?;

    Ok(SpriteSheet {
        image_path: output_path.to_path_buf(),
        tile_width,
        tile_height,
        columns,
        rows,
    })
}

fn encode_sprite(canvas: &RgbImage, path: &Path, format: ImageFormat) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("無法建立預覽大圖: {}", path.display()))?;
    let writer = BufWriter::new(file);

    match format {
        ImageFormat::Jpeg => {
            JpegEncoder::new_with_quality(writer, 80).encode_image(canvas)?;
        }
        ImageFormat::Webp => {
            WebPEncoder::new_lossless(writer).encode(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        ImageFormat::Avif => {
            AvifEncoder::new_with_speed_quality(writer, 8, 80).write_image(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::tempdir;

    fn write_frame(dir: &Path, index: usize, color: Rgb<u8>) -> PathBuf {
        let path = dir.join(format!("preview_{index:04}.png"));
        RgbImage::from_pixel(160, 90, color).save(&path).unwrap();
        path
    }

    #[test]
    fn test_compute_placements_grid() {
        let placements = compute_placements(5, 2, 160, 90);
        assert_eq!(placements.len(), 5);
        assert_eq!((placements[0].x, placements[0].y), (0, 0));
        assert_eq!((placements[1].x, placements[1].y), (160, 0));
        assert_eq!((placements[2].x, placements[2].y), (0, 90));
        assert_eq!((placements[4].x, placements[4].y), (0, 180));
    }

    #[test]
    fn test_compose_sprite_dimensions_and_pixels() {
        let dir = tempdir().unwrap();
        let colors = [
            Rgb([255, 0, 0]),
            Rgb([0, 255, 0]),
            Rgb([0, 0, 255]),
            Rgb([255, 255, 0]),
            Rgb([0, 255, 255]),
        ];
        let frames: Vec<PathBuf> = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| write_frame(dir.path(), i + 1, color))
            .collect();

        let output = dir.path().join("storyboard.webp");
        let sheet = compose_sprite(&frames, 2, &output, ImageFormat::Webp).unwrap();

        assert_eq!(sheet.tile_width, 160);
        assert_eq!(sheet.tile_height, 90);
        assert_eq!(sheet.columns, 2);
        assert_eq!(sheet.rows, 3);

        // 無損 webp 回讀驗證磁貼落點
        let canvas = image::open(&output).unwrap().to_rgb8();
        assert_eq!(canvas.width(), 320);
        assert_eq!(canvas.height(), 270);
        assert_eq!(*canvas.get_pixel(80, 45), colors[0]);
        assert_eq!(*canvas.get_pixel(240, 45), colors[1]);
        assert_eq!(*canvas.get_pixel(80, 135), colors[2]);
        assert_eq!(*canvas.get_pixel(240, 135), colors[3]);
        assert_eq!(*canvas.get_pixel(80, 225), colors[4]);
        // 最後一列未使用的格子維持填黑
        assert_eq!(*canvas.get_pixel(240, 225), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_compose_sprite_rejects_empty_input() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("storyboard.webp");
        assert!(compose_sprite(&[], 2, &output, ImageFormat::Webp).is_err());
    }

    #[test]
    fn test_compose_sprite_rejects_mismatched_frames() {
        let dir = tempdir().unwrap();
        let a = write_frame(dir.path(), 1, Rgb([10, 10, 10]));
        let b = dir.path().join("preview_0002.png");
        RgbImage::from_pixel(100, 90, Rgb([20, 20, 20]))
            .save(&b)
            .unwrap();

        let output = dir.path().join("storyboard.webp");
        assert!(compose_sprite(&[a, b], 2, &output, ImageFormat::Webp).is_err());
    }
}
