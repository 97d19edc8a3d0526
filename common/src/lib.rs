//! endo-lens Common Library
//!
//! CLIと解析パイプラインで共有される型・幾何計算・プロンプト

pub mod types;
pub mod error;
pub mod normalizer;
pub mod overlay;
pub mod markdown;
pub mod prompts;
pub mod parser;
pub mod session;
pub mod capability;
pub mod fallback;

pub use types::{
    BoundingBox, DetectionResult, FallbackDetection, FindingCategory, NormalizedDetection, Size,
    NON_FINDING_LABEL,
};
pub use error::{Error, Result};
pub use normalizer::{normalize_box, normalize_detection, normalize_detections, to_top_left_size, BoxConvention};
pub use overlay::{layout_overlay, style_for, ClassStyle, OverlayRect, OverlayRenderer};
pub use markdown::{classify_line, parse_report, ReportBlock};
pub use prompts::{
    build_report_prompt, findings_response_schema, ANALYSIS_FAILED_MESSAGE, FINDINGS_PROMPT,
    NO_FINDINGS_MESSAGE,
};
pub use parser::{extract_json, parse_findings_response};
pub use session::{AnalysisSession, RunToken, SessionPhase};
pub use capability::{select_backend, CapabilityProvider, ComputeBackend};
pub use fallback::{placeholder_detections, retain_findings, DetectionSource};
