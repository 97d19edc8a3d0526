//! フォールバック検出パイプライン
//!
//! 優先順に並べた検出プロバイダを順番に試し、最初に成功した結果を使う:
//! 1. リモート検出エンドポイント
//! 2. ローカル検出器
//! 3. プレースホルダー（失敗しない）
//!
//! 1〜2段の失敗はログに出すだけで呼び出し元には返さない。
//! どの段でも「未処置」クラスは除外する。

pub mod local;
pub mod remote;

pub use local::{plan_loader, DetectorPlan, LocalDetector, LocalDetectorSettings, PlanLoader};
pub use remote::RemoteDetector;

use crate::config::Config;
use crate::scanner::LoadedImage;
use endo_lens_common::{
    placeholder_detections, retain_findings, ComputeBackend, DetectionSource, FallbackDetection,
};
use futures::future::BoxFuture;
use std::sync::Arc;

/// 検出プロバイダ（1段分）
pub trait DetectionProvider: Send + Sync {
    fn source(&self) -> DetectionSource;

    fn detect<'a>(&'a self, image: &'a LoadedImage) -> BoxFuture<'a, anyhow::Result<Vec<FallbackDetection>>>;

    /// 診断用: 使用中の演算バックエンド
    fn compute_backend(&self) -> Option<ComputeBackend> {
        None
    }
}

/// パイプラインの結果
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub source: DetectionSource,
    pub detections: Vec<FallbackDetection>,
    pub compute_backend: Option<ComputeBackend>,
}

#[derive(Default)]
pub struct FallbackPipeline {
    providers: Vec<Arc<dyn DetectionProvider>>,
}

impl FallbackPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// 設定からリモート → ローカルの順で構築
    pub fn from_config(config: &Config, local: Arc<LocalDetector>) -> Self {
        Self::new()
            .with_provider(Arc::new(RemoteDetector::new(config.detect_endpoint.clone())))
            .with_provider(local)
    }

    /// 末尾に追加（追加順が優先順）
    pub fn with_provider(mut self, provider: Arc<dyn DetectionProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn detect(&self, image: &LoadedImage) -> PipelineResult {
        for provider in &self.providers {
            match provider.detect(image).await {
                Ok(detections) => {
                    let detections = retain_findings(detections);
                    log::info!(
                        "{}: {} detections from {}",
                        image.file_name,
                        detections.len(),
                        provider.source()
                    );
                    return PipelineResult {
                        source: provider.source(),
                        detections,
                        compute_backend: provider.compute_backend(),
                    };
                }
                Err(e) => {
                    log::warn!("{}: {} detector failed: {:#}", image.file_name, provider.source(), e);
                }
            }
        }

        log::warn!("{}: all detectors failed, using placeholder detections", image.file_name);
        PipelineResult {
            source: DetectionSource::Placeholder,
            detections: retain_findings(placeholder_detections()),
            compute_backend: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use endo_lens_common::NON_FINDING_LABEL;
    use futures::FutureExt;
    use image::{DynamicImage, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        source: DetectionSource,
        outcome: Option<Vec<FallbackDetection>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(source: DetectionSource, detections: Vec<FallbackDetection>) -> Arc<Self> {
            Arc::new(Self { source, outcome: Some(detections), calls: AtomicUsize::new(0) })
        }

        fn failing(source: DetectionSource) -> Arc<Self> {
            Arc::new(Self { source, outcome: None, calls: AtomicUsize::new(0) })
        }
    }

    impl DetectionProvider for Scripted {
        fn source(&self) -> DetectionSource {
            self.source
        }

        fn detect<'a>(&'a self, _image: &'a LoadedImage) -> BoxFuture<'a, anyhow::Result<Vec<FallbackDetection>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = self.outcome.clone();
            async move { outcome.ok_or_else(|| anyhow::anyhow!("scripted failure")) }.boxed()
        }
    }

    fn det(class_name: &str) -> FallbackDetection {
        FallbackDetection {
            bbox: [10.0, 10.0, 20.0, 20.0],
            class_name: class_name.to_string(),
            score: 0.9,
        }
    }

    fn image() -> LoadedImage {
        LoadedImage::from_image("xray.png", DynamicImage::ImageRgb8(RgbImage::new(16, 16))).unwrap()
    }

    #[tokio::test]
    async fn test_remote_success_skips_local() {
        let remote = Scripted::ok(DetectionSource::Remote, vec![det("Total Endodontic Failure")]);
        let local = Scripted::ok(DetectionSource::Local, vec![det("Complete Endodontic Treatment")]);
        let pipeline = FallbackPipeline::new()
            .with_provider(remote.clone())
            .with_provider(local.clone());

        let result = pipeline.detect(&image()).await;
        assert_eq!(result.source, DetectionSource::Remote);
        assert_eq!(result.detections, vec![det("Total Endodontic Failure")]);
        assert_eq!(local.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_through_to_local() {
        let remote = Scripted::failing(DetectionSource::Remote);
        let local = Scripted::ok(DetectionSource::Local, vec![det("Incomplete Endodontic Treatment")]);
        let pipeline = FallbackPipeline::new()
            .with_provider(remote.clone())
            .with_provider(local.clone());

        let result = pipeline.detect(&image()).await;
        assert_eq!(result.source, DetectionSource::Local);
        assert_eq!(result.detections.len(), 1);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_placeholder() {
        let pipeline = FallbackPipeline::new()
            .with_provider(Scripted::failing(DetectionSource::Remote))
            .with_provider(Scripted::failing(DetectionSource::Local));

        let result = pipeline.detect(&image()).await;
        assert_eq!(result.source, DetectionSource::Placeholder);
        assert_eq!(result.detections, placeholder_detections());
        assert_eq!(result.compute_backend, None);
    }

    #[tokio::test]
    async fn test_non_findings_filtered_at_every_stage() {
        let remote = Scripted::ok(
            DetectionSource::Remote,
            vec![det(NON_FINDING_LABEL), det("Total Endodontic Failure"), det(NON_FINDING_LABEL)],
        );
        let result = FallbackPipeline::new().with_provider(remote).detect(&image()).await;
        assert_eq!(result.detections, vec![det("Total Endodontic Failure")]);

        let local = Scripted::ok(DetectionSource::Local, vec![det(NON_FINDING_LABEL)]);
        let result = FallbackPipeline::new()
            .with_provider(Scripted::failing(DetectionSource::Remote))
            .with_provider(local)
            .detect(&image())
            .await;
        assert_eq!(result.source, DetectionSource::Local);
        assert!(result.detections.is_empty());
    }

    #[tokio::test]
    async fn test_empty_pipeline_uses_placeholder() {
        let result = FallbackPipeline::new().detect(&image()).await;
        assert_eq!(result.source, DetectionSource::Placeholder);
        assert_eq!(result.detections.len(), 1);
    }
}
