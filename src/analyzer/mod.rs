//! 解析フロー
//!
//! 1枚の画像について次の順で処理する（すべて逐次）:
//! 1. フォールバック検出パイプライン
//! 2. 所見検出（Gemini、画像付き）
//! 3. レポート生成（所見がなければ呼ばずに定型文）
//!
//! 結果は実行トークン付きでセッションへ書き込む。新しい実行が始まった後に
//! 古い実行が書き込もうとしても破棄される。

pub mod cache;
mod gemini;
mod types;

pub use cache::{compute_file_hash, CacheFile};
pub use gemini::GeminiClient;
pub use types::AnalysisOutcome;

use crate::detection::FallbackPipeline;
use crate::error::AnalysisError;
use crate::scanner::LoadedImage;
use endo_lens_common::{
    normalize_detections, AnalysisSession, DetectionResult, NormalizedDetection,
    ANALYSIS_FAILED_MESSAGE, NO_FINDINGS_MESSAGE,
};
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// 所見検出とレポート生成を行う生成モデル
pub trait VisionModel: Send + Sync {
    fn find_lesions<'a>(
        &'a self,
        image: &'a [u8],
        mime_type: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DetectionResult>, AnalysisError>>;

    /// `findings` は空でないこと
    fn write_report<'a>(
        &'a self,
        findings: &'a [DetectionResult],
        supporting: &'a [NormalizedDetection],
    ) -> BoxFuture<'a, Result<String, AnalysisError>>;
}

pub type SharedSession = Arc<Mutex<AnalysisSession>>;

pub fn new_session() -> SharedSession {
    Arc::new(Mutex::new(AnalysisSession::new()))
}

fn lock(session: &SharedSession) -> MutexGuard<'_, AnalysisSession> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

/// 直近の解析がセッションに残したエラーメッセージ
pub fn last_error(session: &SharedSession) -> Option<String> {
    lock(session).error().map(str::to_string)
}

/// 1枚の画像を解析する
///
/// 所見検出かレポート生成が失敗した場合は、セッションに
/// `ANALYSIS_FAILED_MESSAGE` を記録したうえで `Err` を返す。
pub async fn run_analysis(
    session: &SharedSession,
    pipeline: &FallbackPipeline,
    model: &dyn VisionModel,
    image: &LoadedImage,
    path: &Path,
) -> Result<AnalysisOutcome, AnalysisError> {
    let token = lock(session).begin(image.file_name.clone());
    log::info!("{}: analysis started", image.file_name);

    let detection = pipeline.detect(image).await;
    let size = image.size();
    let supporting = normalize_detections(&detection.detections, size);

    let findings = match model.find_lesions(&image.bytes, &image.mime_type).await {
        Ok(findings) => findings,
        Err(e) => {
            log::error!("{}: finding detection failed: {}", image.file_name, e);
            lock(session).fail(token, ANALYSIS_FAILED_MESSAGE);
            return Err(e);
        }
    };

    if !lock(session).apply_results(token, findings.clone()) {
        log::debug!("{}: discarded stale findings", image.file_name);
    }

    let description = if findings.is_empty() {
        NO_FINDINGS_MESSAGE.to_string()
    } else {
        match model.write_report(&findings, &supporting).await {
            Ok(report) => report,
            Err(e) => {
                log::error!("{}: report generation failed: {}", image.file_name, e);
                lock(session).fail(token, ANALYSIS_FAILED_MESSAGE);
                return Err(e);
            }
        }
    };

    {
        let mut guard = lock(session);
        guard.apply_report(token, description.clone());
        guard.finish(token);
    }
    log::info!("{}: {} findings", image.file_name, findings.len());

    Ok(AnalysisOutcome {
        file_name: image.file_name.clone(),
        file_path: path.display().to_string(),
        analyzed_at: chrono::Utc::now().to_rfc3339(),
        image_width: size.width as u32,
        image_height: size.height as u32,
        findings,
        description,
        detection_source: detection.source,
        detections: detection.detections,
        compute_backend: detection.compute_backend,
    })
}
