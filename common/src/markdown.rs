//! 簡易Markdownレンダラ
//!
//! レポート本文を行単位で分類する。対応する記法は行頭の `### `, `## `, `- ` と
//! 行全体を囲む `**...**` のみ。入れ子・エスケープは扱わない。

/// 分類済みの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportBlock {
    /// `## `
    Heading(String),
    /// `### `
    SubHeading(String),
    /// `- `
    ListItem(String),
    /// `**...**`
    Bold(String),
    Paragraph(String),
}

impl ReportBlock {
    pub fn text(&self) -> &str {
        match self {
            ReportBlock::Heading(t)
            | ReportBlock::SubHeading(t)
            | ReportBlock::ListItem(t)
            | ReportBlock::Bold(t)
            | ReportBlock::Paragraph(t) => t,
        }
    }
}

/// 1行を分類（空行は `None`）
pub fn classify_line(line: &str) -> Option<ReportBlock> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let block = if let Some(rest) = trimmed.strip_prefix("### ") {
        ReportBlock::SubHeading(rest.to_string())
    } else if let Some(rest) = trimmed.strip_prefix("## ") {
        ReportBlock::Heading(rest.to_string())
    } else if let Some(rest) = trimmed.strip_prefix("- ") {
        ReportBlock::ListItem(rest.to_string())
    } else if trimmed.len() > 4 && trimmed.starts_with("**") && trimmed.ends_with("**") {
        // 中身のない `**` `***` `****` は太字にせず本文として残す
        ReportBlock::Bold(trimmed[2..trimmed.len() - 2].to_string())
    } else {
        ReportBlock::Paragraph(trimmed.to_string())
    };
    Some(block)
}

/// レポート全体を分類
pub fn parse_report(text: &str) -> Vec<ReportBlock> {
    text.lines().filter_map(classify_line).collect()
}
