//! プロンプト生成モジュール
//!
//! Gemini呼び出しで使う固定文言とプロンプト生成:
//! - FINDINGS_PROMPT: 所見検出（画像付き）用の指示文
//! - findings_response_schema: 所見検出の応答スキーマ
//! - build_report_prompt: レポート生成（テキストのみ）用プロンプト

use crate::types::{DetectionResult, FindingCategory, NormalizedDetection};
use serde_json::{json, Value};

/// 所見なしのときにレポート生成の代わりに表示する文言
pub const NO_FINDINGS_MESSAGE: &str = "No specific root canal issues were detected by the model. A comprehensive clinical examination is always recommended for a complete diagnosis.";

/// 解析失敗時にユーザーへ表示する文言（原因は区別しない）
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze the image. The AI model may be unable to process this image or an API error occurred. Please try another image.";

pub const FINDINGS_PROMPT: &str = r#"
You are an expert AI dental radiologist. Your task is to analyze a dental X-ray image and identify teeth with potential root canal issues.
You must act as an object detection model. For each tooth you identify, provide its root canal status based on the following categories:
- 'No Endodontic Treatment': A healthy tooth or a tooth with a cavity that has not reached the pulp. No signs of root canal procedure.
- 'Incomplete Endodontic Treatment': A root canal procedure has been started but is not complete. Canals may be partially filled or unfilled.
- 'Complete Endodontic Treatment': A successful root canal. The canals are fully filled to the apex, and there are no signs of infection.
- 'Total Endodontic Failure': A root canal has been performed, but there are clear signs of failure, such as periapical lesions (dark areas at the root tip), voids in the filling, or new decay.

For each finding, you must return:
1. A 'label' from the categories above.
2. A 'confidence' score from 0.0 to 1.0.
3. A normalized 'box' object with x, y, width, and height, where (x,y) is the top-left corner. All values must be between 0.0 and 1.0, relative to the image dimensions.

Return ONLY a JSON object that adheres to the provided schema. Do not return markdown or any other text. If no issues are found, return an empty array.
"#;

/// 所見検出の応答スキーマ（Gemini `responseSchema` 形式）
pub fn findings_response_schema() -> Value {
    let labels: Vec<&str> = FindingCategory::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "label": { "type": "STRING", "enum": labels },
                "confidence": { "type": "NUMBER" },
                "box": {
                    "type": "OBJECT",
                    "properties": {
                        "x": { "type": "NUMBER" },
                        "y": { "type": "NUMBER" },
                        "width": { "type": "NUMBER" },
                        "height": { "type": "NUMBER" }
                    },
                    "required": ["x", "y", "width", "height"]
                }
            },
            "required": ["label", "confidence", "box"]
        }
    })
}

/// レポート生成プロンプト
///
/// # Arguments
/// * `findings` - 所見検出の結果（空でないこと）
/// * `supporting` - フォールバック検出器の結果（正規化済み、空なら省略）
pub fn build_report_prompt(findings: &[DetectionResult], supporting: &[NormalizedDetection]) -> String {
    let findings_json = serde_json::to_string_pretty(findings).unwrap_or_else(|_| "[]".into());

    let supporting_section = if supporting.is_empty() {
        String::new()
    } else {
        let supporting_json = serde_json::to_string_pretty(supporting).unwrap_or_else(|_| "[]".into());
        format!(
            r#"
An independent object detector also reported the following regions (normalized coordinates). Use them only as supporting context; they may disagree with the findings above:
{supporting_json}
"#
        )
    };

    format!(
        r####"
You are an expert AI dental radiologist providing a consultation. Based on the following detection results from a dental radiograph, generate a concise and informative report for a dental professional.

First, provide a brief "Overall Summary" of the findings.

Then, for each identified issue, create a section with a markdown heading (e.g., "### Finding 1: Total Endodontic Failure"). In each section, briefly explain the likely visual indicators on the radiograph that led to the diagnosis and suggest potential next steps or treatment considerations.

Maintain a professional and objective tone.

The detected issues are:
{findings_json}
{supporting_section}"####
    )
}
