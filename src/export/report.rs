//! レポートの出力（ターミナル表示・Markdownファイル）

use crate::analyzer::AnalysisOutcome;
use crate::error::Result;
use endo_lens_common::{parse_report, ReportBlock};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// レポート本文をターミナル表示用テキストへ変換
pub fn render_terminal(report: &str) -> String {
    let mut out = String::new();
    for block in parse_report(report) {
        let line = match &block {
            ReportBlock::Heading(t) => format!("\n■ {}", t),
            ReportBlock::SubHeading(t) => format!("\n▶ {}", t),
            ReportBlock::ListItem(t) => format!("  ・{}", t),
            ReportBlock::Bold(t) => format!("【{}】", t),
            ReportBlock::Paragraph(t) => t.clone(),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// 1枚分の結果をMarkdownにまとめる
pub fn to_markdown(outcome: &AnalysisOutcome) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {}", outcome.file_name);
    let _ = writeln!(md);
    let _ = writeln!(md, "- Analyzed at: {}", outcome.analyzed_at);
    let _ = writeln!(md, "- Image size: {}x{}", outcome.image_width, outcome.image_height);
    let _ = writeln!(md, "- Detector: {}", outcome.detection_source);
    if let Some(backend) = outcome.compute_backend {
        let _ = writeln!(md, "- Compute backend: {}", backend);
    }
    let _ = writeln!(md);

    if !outcome.findings.is_empty() {
        let _ = writeln!(md, "| # | Label | Confidence | Box (x, y, w, h) |");
        let _ = writeln!(md, "|---|-------|------------|------------------|");
        for (i, f) in outcome.findings.iter().enumerate() {
            let _ = writeln!(
                md,
                "| {} | {} | {:.1}% | {:.3}, {:.3}, {:.3}, {:.3} |",
                i + 1,
                f.label,
                f.confidence * 100.0,
                f.bbox.x,
                f.bbox.y,
                f.bbox.width,
                f.bbox.height
            );
        }
        let _ = writeln!(md);
    }

    md.push_str(outcome.description.trim_end());
    md.push('\n');
    md
}

/// `<dir>/<stem>_report.md` に書き出す
pub fn write_markdown_report(outcome: &AnalysisOutcome, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stem = Path::new(&outcome.file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());
    let path = dir.join(format!("{}_report.md", stem));
    std::fs::write(&path, to_markdown(outcome))?;
    log::info!("report written: {}", path.display());
    Ok(path)
}
