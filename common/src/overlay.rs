//! オーバーレイ描画の幾何計算
//!
//! 正規化座標の所見を、表示中の画像サイズ（拡大縮小後）のピクセル矩形へ写像する。
//! 表示サイズはモデルとは独立に変わる（画像の読み込み・ウィンドウのリサイズ）ため、
//! `OverlayRenderer` は最後に計測したサイズだけを保持する。

use crate::types::{DetectionResult, FindingCategory, Size};

/// RGB色
pub type Rgb = [u8; 3];

/// クラスごとの描画スタイル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassStyle {
    pub name: &'static str,
    /// 枠線の色
    pub border: Rgb,
    /// ラベル背景の色
    pub background: Rgb,
}

const NO_TREATMENT_STYLE: ClassStyle = ClassStyle {
    name: "blue",
    border: [0x60, 0xa5, 0xfa],
    background: [0x1e, 0x3a, 0x8a],
};

const INCOMPLETE_STYLE: ClassStyle = ClassStyle {
    name: "yellow",
    border: [0xfa, 0xcc, 0x15],
    background: [0x71, 0x3f, 0x12],
};

const COMPLETE_STYLE: ClassStyle = ClassStyle {
    name: "green",
    border: [0x4a, 0xde, 0x80],
    background: [0x14, 0x53, 0x2d],
};

const FAILURE_STYLE: ClassStyle = ClassStyle {
    name: "red",
    border: [0xef, 0x44, 0x44],
    background: [0x7f, 0x1d, 0x1d],
};

/// 未知のラベル用
pub const DEFAULT_STYLE: ClassStyle = ClassStyle {
    name: "purple",
    border: [0xc0, 0x84, 0xfc],
    background: [0x58, 0x1c, 0x87],
};

pub fn style_for(label: &str) -> &'static ClassStyle {
    match FindingCategory::from_label(label) {
        Some(FindingCategory::NoEndodonticTreatment) => &NO_TREATMENT_STYLE,
        Some(FindingCategory::IncompleteEndodonticTreatment) => &INCOMPLETE_STYLE,
        Some(FindingCategory::CompleteEndodonticTreatment) => &COMPLETE_STYLE,
        Some(FindingCategory::TotalEndodonticFailure) => &FAILURE_STYLE,
        None => &DEFAULT_STYLE,
    }
}

/// 表示座標の矩形1つ
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    pub confidence: f64,
    pub style: &'static ClassStyle,
}

impl OverlayRect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// 表示サイズと所見から矩形を計算（純粋関数）
///
/// 画像外にはみ出した所見は表示領域の内側に切り詰める。
pub fn layout_overlay(size: Size, results: &[DetectionResult]) -> Vec<OverlayRect> {
    results
        .iter()
        .map(|r| {
            let bbox = r.bbox.clamped();
            OverlayRect {
                left: bbox.x * size.width,
                top: bbox.y * size.height,
                width: bbox.width * size.width,
                height: bbox.height * size.height,
                label: r.label.clone(),
                confidence: r.confidence,
                style: style_for(&r.label),
            }
        })
        .collect()
}

/// 最後に計測した表示サイズを保持するレンダラ
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    size: Option<Size>,
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 画像読み込み時・リサイズ時に呼ぶ
    pub fn measure(&mut self, width: f64, height: f64) {
        self.size = Some(Size::new(width, height));
    }

    /// 未計測、またはサイズ0の間は何も描かない
    pub fn layout(&self, results: &[DetectionResult]) -> Vec<OverlayRect> {
        match self.size {
            Some(size) if !size.is_empty() => layout_overlay(size, results),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize_detection;
    use crate::types::{BoundingBox, FallbackDetection};

    fn result(label: &str, bbox: BoundingBox) -> DetectionResult {
        DetectionResult {
            bbox,
            label: label.to_string(),
            confidence: 0.875,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_layout_scales_to_render_size() {
        let rects = layout_overlay(
            Size::new(800.0, 600.0),
            &[result("Total Endodontic Failure", BoundingBox::new(0.25, 0.5, 0.5, 0.25))],
        );
        assert_eq!(rects.len(), 1);
        let r = &rects[0];
        assert!(approx(r.left, 200.0));
        assert!(approx(r.top, 300.0));
        assert!(approx(r.width, 400.0));
        assert!(approx(r.height, 150.0));
        assert_eq!(r.style, &FAILURE_STYLE);
    }

    #[test]
    fn test_corners_stay_inside_render_area() {
        let size = Size::new(640.0, 480.0);
        let steps = [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
        for &x in &steps {
            for &w in &steps {
                if x + w > 1.0 {
                    continue;
                }
                for &y in &steps {
                    let h = 1.0 - y;
                    let rects = layout_overlay(size, &[result("x", BoundingBox::new(x, y, w, h))]);
                    let r = &rects[0];
                    assert!(r.left >= 0.0 && r.right() <= size.width + 1e-9);
                    assert!(r.top >= 0.0 && r.bottom() <= size.height + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_unknown_label_uses_default_style() {
        assert_eq!(style_for("Periapical Lesion"), &DEFAULT_STYLE);
        assert_eq!(style_for("Complete Endodontic Treatment"), &COMPLETE_STYLE);
    }

    #[test]
    fn test_out_of_range_finding_is_clipped_to_render_area() {
        let size = Size::new(200.0, 100.0);
        let rects = layout_overlay(
            size,
            &[
                result("Total Endodontic Failure", BoundingBox::new(0.8, -0.2, 0.5, 0.4)),
                result("x", BoundingBox::new(f64::NAN, 0.5, 0.25, 0.25)),
            ],
        );

        let r = &rects[0];
        assert!(approx(r.left, 160.0));
        assert!(approx(r.top, 0.0));
        assert!(approx(r.right(), 200.0));
        assert!(approx(r.height, 40.0));

        // NaN座標は原点扱い
        assert!(approx(rects[1].left, 0.0));
        assert!(approx(rects[1].width, 50.0));
    }

    #[test]
    fn test_renderer_requires_measurement() {
        let results = [result("x", BoundingBox::new(0.1, 0.1, 0.2, 0.2))];
        let mut renderer = OverlayRenderer::new();
        assert!(renderer.layout(&results).is_empty());

        renderer.measure(0.0, 0.0);
        assert!(renderer.layout(&results).is_empty());

        renderer.measure(200.0, 100.0);
        let first = renderer.layout(&results);
        assert!(approx(first[0].left, 20.0));

        // リサイズ後は新しいサイズで再計算
        renderer.measure(400.0, 200.0);
        let second = renderer.layout(&results);
        assert!(approx(second[0].left, 40.0));
        assert!(approx(second[0].width, 80.0));
    }

    #[test]
    fn test_normalized_fallback_matches_finding_rect() {
        let size = Size::new(100.0, 200.0);
        let fallback = FallbackDetection {
            bbox: [10.0, 20.0, 30.0, 40.0],
            class_name: "Complete Endodontic Treatment".to_string(),
            score: 0.7,
        };
        let normalized = normalize_detection(&fallback, size).unwrap();
        let from_fallback = layout_overlay(size, &[result("x", normalized.bbox)]);
        let from_finding = layout_overlay(size, &[result("x", BoundingBox::new(0.1, 0.1, 0.3, 0.2))]);

        for rects in [&from_fallback, &from_finding] {
            let r = &rects[0];
            assert!(approx(r.left, 10.0));
            assert!(approx(r.top, 20.0));
            assert!(approx(r.width, 30.0));
            assert!(approx(r.height, 40.0));
        }
    }
}
