//! 解析結果の型定義
//!
//! CLIと解析パイプラインで共有される型:
//! - BoundingBox: 正規化座標（0.0〜1.0）の矩形
//! - DetectionResult: Gemini所見（オーバーレイ描画の対象）
//! - FallbackDetection: フォールバック検出（ピクセル座標、レポート補強用）
//! - NormalizedDetection: 正規化済みのフォールバック検出

use serde::{Deserialize, Serialize};

/// 画像またはその表示領域のサイズ（ピクセル）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 幅・高さのどちらかが0以下なら空
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// 正規化座標の矩形
///
/// 原点は左上。各値は画像の幅・高さに対する割合。
/// `x + width <= 1`, `y + height <= 1` を前提とするが強制はしない。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// 画像外にはみ出した部分を切り詰めた矩形
    pub fn clamped(&self) -> Self {
        let x = unit(self.x);
        let y = unit(self.y);
        Self {
            x,
            y,
            width: unit(self.width).min(1.0 - x),
            height: unit(self.height).min(1.0 - y),
        }
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// 診断カテゴリ（4種固定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingCategory {
    NoEndodonticTreatment,
    IncompleteEndodonticTreatment,
    CompleteEndodonticTreatment,
    TotalEndodonticFailure,
}

impl FindingCategory {
    pub const ALL: [FindingCategory; 4] = [
        FindingCategory::NoEndodonticTreatment,
        FindingCategory::IncompleteEndodonticTreatment,
        FindingCategory::CompleteEndodonticTreatment,
        FindingCategory::TotalEndodonticFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::NoEndodonticTreatment => "No Endodontic Treatment",
            FindingCategory::IncompleteEndodonticTreatment => "Incomplete Endodontic Treatment",
            FindingCategory::CompleteEndodonticTreatment => "Complete Endodontic Treatment",
            FindingCategory::TotalEndodonticFailure => "Total Endodontic Failure",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }

    /// 「未処置（健全）」は所見として扱わない
    pub fn is_finding(&self) -> bool {
        !matches!(self, FindingCategory::NoEndodonticTreatment)
    }
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 所見ではないクラス名
pub const NON_FINDING_LABEL: &str = "No Endodontic Treatment";

/// Gemini所見: 1領域の診断結果
///
/// 1回の解析サイクルの間だけ保持され、リセットまたは次のアップロードで破棄される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub label: String,
    pub confidence: f64,
}

/// フォールバック検出結果（ピクセル座標 `[x, y, width, height]`）
///
/// `/detect` エンドポイントと同じJSON形状: `{ "bbox": [...], "class": "...", "score": 0.0 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackDetection {
    pub bbox: [f64; 4],
    #[serde(rename = "class")]
    pub class_name: String,
    pub score: f64,
}

impl FallbackDetection {
    pub fn is_finding(&self) -> bool {
        self.class_name != NON_FINDING_LABEL
    }
}

/// 正規化済みのフォールバック検出（レポートプロンプト用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDetection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    #[serde(rename = "class")]
    pub class_name: String,
    pub score: f64,
}
