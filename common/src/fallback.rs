//! フォールバック検出の共通ポリシー
//!
//! - 所見でないクラス（未処置）はどの段でも除外する
//! - 全段が失敗したときは固定のプレースホルダー検出を返す

use crate::types::{FallbackDetection, FindingCategory};
use serde::{Deserialize, Serialize};

/// 検出結果の出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Remote,
    Local,
    Placeholder,
}

impl DetectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionSource::Remote => "remote",
            DetectionSource::Local => "local",
            DetectionSource::Placeholder => "placeholder",
        }
    }
}

impl std::fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 最終段のプレースホルダー（失敗しない）
pub fn placeholder_detections() -> Vec<FallbackDetection> {
    vec![FallbackDetection {
        bbox: [0.4, 0.3, 0.25, 0.15],
        class_name: FindingCategory::CompleteEndodonticTreatment.as_str().to_string(),
        score: 0.75,
    }]
}

/// 所見でない検出を取り除く
pub fn retain_findings(detections: Vec<FallbackDetection>) -> Vec<FallbackDetection> {
    detections.into_iter().filter(FallbackDetection::is_finding).collect()
}
