use endo_lens_common::{ComputeBackend, DetectionResult, DetectionSource, FallbackDetection};
use serde::{Deserialize, Serialize};

/// 1枚分の解析結果（出力JSON・キャッシュの単位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub file_name: String,

    #[serde(default)]
    pub file_path: String,

    /// 解析日時（RFC 3339）
    #[serde(default)]
    pub analyzed_at: String,

    #[serde(default)]
    pub image_width: u32,

    #[serde(default)]
    pub image_height: u32,

    /// 所見検出の結果（正規化座標）
    #[serde(default)]
    pub findings: Vec<DetectionResult>,

    /// レポート本文（所見なしなら定型文）
    #[serde(default)]
    pub description: String,

    pub detection_source: DetectionSource,

    /// フォールバック検出器の結果（元画像ピクセル座標）
    #[serde(default)]
    pub detections: Vec<FallbackDetection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_backend: Option<ComputeBackend>,
}
