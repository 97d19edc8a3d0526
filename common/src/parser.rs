//! APIレスポンスパーサー
//!
//! Geminiの応答テキストからJSONを抽出し、所見リストをパースする

use crate::error::{Error, Result};
use crate::types::DetectionResult;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の [...] 配列
/// 3. エラー
///
/// # Examples
/// ```
/// use endo_lens_common::extract_json;
///
/// let response = "[{\"label\": \"Total Endodontic Failure\"}]";
/// let json = extract_json(response).unwrap();
/// assert!(json.contains("label"));
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7;
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の [...] を探す
    if let Some(start) = response.find('[') {
        if let Some(end) = response.rfind(']') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 所見検出レスポンスをパース
///
/// # Returns
/// * `Ok(Vec<DetectionResult>)` - パース成功（所見なしなら空）
/// * `Err` - JSONが見つからないかスキーマ不一致
pub fn parse_findings_response(response: &str) -> Result<Vec<DetectionResult>> {
    let json_str = extract_json(response)?;
    let findings: Vec<DetectionResult> = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("所見JSONパースエラー: {}", e)))?;
    Ok(findings)
}
