//! 所見オーバーレイ画像の出力
//!
//! 元画像のコピーに所見ごとの枠線を描き、`<元ファイル名>_overlay.png` として保存する。
//! 枠の左上にはクラスの背景色で小さなタブを付ける。

use crate::error::{EndoLensError, Result};
use endo_lens_common::{DetectionResult, OverlayRect, OverlayRenderer};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

/// 枠線の太さ（ピクセル）
const STROKE: i32 = 2;
/// 左上タブの高さ（ピクセル）
const TAB_HEIGHT: u32 = 6;

/// 所見の枠を描いた画像を返す（元画像は変更しない）
pub fn render_overlay(image: &DynamicImage, findings: &[DetectionResult]) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut renderer = OverlayRenderer::new();
    renderer.measure(width as f64, height as f64);

    let mut canvas = image.to_rgb8();
    for rect in renderer.layout(findings) {
        draw_rect(&mut canvas, &rect);
    }
    canvas
}

fn draw_rect(canvas: &mut RgbImage, rect: &OverlayRect) {
    let left = rect.left.round() as i32;
    let top = rect.top.round() as i32;
    let width = rect.width.round().max(1.0) as u32;
    let height = rect.height.round().max(1.0) as u32;

    let border = Rgb(rect.style.border);
    for inset in 0..STROKE {
        let w = width.saturating_sub(2 * inset as u32).max(1);
        let h = height.saturating_sub(2 * inset as u32).max(1);
        draw_hollow_rect_mut(canvas, Rect::at(left + inset, top + inset).of_size(w, h), border);
    }

    let tab_width = (width / 4).clamp(1, 48);
    let tab = Rect::at(left, top - TAB_HEIGHT as i32).of_size(tab_width, TAB_HEIGHT);
    draw_filled_rect_mut(canvas, tab, Rgb(rect.style.background));
}

/// `<dir>/<stem>_overlay.png`
pub fn overlay_path(dir: &Path, file_name: &str) -> PathBuf {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    dir.join(format!("{}_overlay.png", stem))
}

/// オーバーレイ画像を保存して出力先を返す
pub fn write_overlay(
    image: &DynamicImage,
    file_name: &str,
    findings: &[DetectionResult],
    dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = overlay_path(dir, file_name);
    render_overlay(image, findings)
        .save(&path)
        .map_err(|e| EndoLensError::Export(format!("{}: {}", path.display(), e)))?;
    log::info!("overlay written: {}", path.display());
    Ok(path)
}
