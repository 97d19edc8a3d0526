pub mod overlay;
pub mod report;

pub use overlay::{render_overlay, write_overlay};
pub use report::{render_terminal, to_markdown, write_markdown_report};

use crate::analyzer::AnalysisOutcome;
use crate::error::Result;
use std::path::Path;

/// 解析結果一覧をJSONで保存
pub fn write_results(outcomes: &[AnalysisOutcome], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(outcomes)?;
    std::fs::write(output, json)?;
    Ok(())
}

pub fn read_results(input: &Path) -> Result<Vec<AnalysisOutcome>> {
    let content = std::fs::read_to_string(input)?;
    Ok(serde_json::from_str(&content)?)
}
