//! 検出結果の正規化
//!
//! 検出器ごとに異なる座標表現（左上+サイズ、2隅、中心+サイズ）のピクセル矩形を
//! 共通の `BoundingBox`（画像サイズに対する割合）へ変換する。

use crate::types::{BoundingBox, FallbackDetection, NormalizedDetection, Size};

/// ピクセル矩形の座標表現
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxConvention {
    /// `[x, y, width, height]`（左上原点）
    TopLeftSize,
    /// `[x1, y1, x2, y2]`
    Corners,
    /// `[cx, cy, width, height]`（YOLO出力）
    CenterSize,
}

/// 任意の表現を `[x, y, width, height]` へ変換
pub fn to_top_left_size(raw: [f64; 4], convention: BoxConvention) -> [f64; 4] {
    let [a, b, c, d] = raw;
    match convention {
        BoxConvention::TopLeftSize => raw,
        BoxConvention::Corners => {
            let (x1, x2) = if a <= c { (a, c) } else { (c, a) };
            let (y1, y2) = if b <= d { (b, d) } else { (d, b) };
            [x1, y1, x2 - x1, y2 - y1]
        }
        BoxConvention::CenterSize => [a - c / 2.0, b - d / 2.0, c, d],
    }
}

/// ピクセル矩形を正規化座標へ変換
///
/// 画像サイズが空の場合は変換できないので `None`。
pub fn normalize_box(raw: [f64; 4], convention: BoxConvention, image: Size) -> Option<BoundingBox> {
    if image.is_empty() {
        return None;
    }
    let [x, y, width, height] = to_top_left_size(raw, convention);
    Some(BoundingBox {
        x: x / image.width,
        y: y / image.height,
        width: width / image.width,
        height: height / image.height,
    })
}

/// フォールバック検出（左上+サイズのピクセル座標）を正規化
pub fn normalize_detection(detection: &FallbackDetection, image: Size) -> Option<NormalizedDetection> {
    let bbox = normalize_box(detection.bbox, BoxConvention::TopLeftSize, image)?;
    Some(NormalizedDetection {
        bbox,
        class_name: detection.class_name.clone(),
        score: detection.score,
    })
}

pub fn normalize_detections(detections: &[FallbackDetection], image: Size) -> Vec<NormalizedDetection> {
    detections
        .iter()
        .filter_map(|d| normalize_detection(d, image))
        .collect()
}
