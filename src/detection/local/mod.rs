//! ローカル検出器（tract によるONNX推論）
//!
//! モデルは初回使用時に読み込む。読み込みは `tokio::sync::Mutex` で直列化され、
//! 同時に呼ばれても1回だけ実行される。失敗した場合は未読み込みのまま残り、
//! 次回の呼び出しで再試行する。

pub mod backend;
pub mod decode;

use super::DetectionProvider;
use crate::config::Config;
use crate::scanner::LoadedImage;
use anyhow::{anyhow, Context};
use endo_lens_common::{
    select_backend, CapabilityProvider, ComputeBackend, DetectionSource, FallbackDetection, Size,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tract_onnx::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDetectorSettings {
    pub model_path: Option<PathBuf>,
    /// 正方形入力の一辺（ピクセル）
    pub input_size: u32,
    pub labels: Vec<String>,
    pub score_threshold: f32,
    pub iou_threshold: f32,
}

impl LocalDetectorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_path: config.local_model_path.clone(),
            input_size: config.local_input_size,
            labels: config.local_labels.clone(),
            score_threshold: config.score_threshold,
            iou_threshold: config.iou_threshold,
        }
    }
}

/// 読み込み済みの推論プラン（入力 `[1, 3, n, n]` → 検出出力1本）
pub trait DetectorPlan: Send + Sync {
    fn run(&self, input: Tensor) -> anyhow::Result<Tensor>;
}

/// モデルパス・入力サイズ・バックエンドからプランを組み立てる
pub type PlanLoader =
    Arc<dyn Fn(&Path, usize, ComputeBackend) -> anyhow::Result<Box<dyn DetectorPlan>> + Send + Sync>;

struct TractPlan(TypedRunnableModel<TypedModel>);

impl DetectorPlan for TractPlan {
    fn run(&self, input: Tensor) -> anyhow::Result<Tensor> {
        let outputs = self.0.run(tvec!(input.into())).context("ONNX inference failed")?;
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        Ok(output.into_tensor())
    }
}

pub fn plan_loader<F>(f: F) -> PlanLoader
where
    F: Fn(&Path, usize, ComputeBackend) -> anyhow::Result<Box<dyn DetectorPlan>> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn tract_loader() -> PlanLoader {
    plan_loader(|path, input_size, backend| {
        let plan = build_plan(path, input_size, backend)?;
        Ok(Box::new(TractPlan(plan)) as Box<dyn DetectorPlan>)
    })
}

struct LoadedModel {
    plan: Box<dyn DetectorPlan>,
    backend: ComputeBackend,
}

enum ModelState {
    Unloaded,
    Loaded(Arc<LoadedModel>),
}

pub struct LocalDetector {
    settings: LocalDetectorSettings,
    providers: Vec<Box<dyn CapabilityProvider>>,
    loader: PlanLoader,
    state: Mutex<ModelState>,
    active_backend: OnceLock<ComputeBackend>,
}

impl LocalDetector {
    pub fn new(settings: LocalDetectorSettings) -> Self {
        Self::with_providers(settings, backend::default_providers())
    }

    pub fn with_providers(settings: LocalDetectorSettings, providers: Vec<Box<dyn CapabilityProvider>>) -> Self {
        Self::with_loader(settings, providers, tract_loader())
    }

    pub fn with_loader(
        settings: LocalDetectorSettings,
        providers: Vec<Box<dyn CapabilityProvider>>,
        loader: PlanLoader,
    ) -> Self {
        Self {
            settings,
            providers,
            loader,
            state: Mutex::new(ModelState::Unloaded),
            active_backend: OnceLock::new(),
        }
    }

    /// 読み込み済みモデルが使っているバックエンド（未読み込みなら `None`）
    pub fn active_backend(&self) -> Option<ComputeBackend> {
        self.active_backend.get().copied()
    }

    pub async fn is_loaded(&self) -> bool {
        matches!(*self.state.lock().await, ModelState::Loaded(_))
    }

    /// モデルを読み込む（読み込み済みなら何もしない）
    async fn ensure_loaded(&self) -> anyhow::Result<Arc<LoadedModel>> {
        let mut state = self.state.lock().await;
        if let ModelState::Loaded(model) = &*state {
            return Ok(model.clone());
        }

        let path = self
            .settings
            .model_path
            .clone()
            .ok_or_else(|| anyhow!("no local model configured"))?;
        let backend = select_backend(&self.providers).ok_or_else(|| anyhow!("no compute backend available"))?;
        let input_size = self.settings.input_size as usize;

        log::info!("loading local model {} ({} backend)", path.display(), backend);
        let loader = self.loader.clone();
        let plan = tokio::task::spawn_blocking(move || loader(&path, input_size, backend))
            .await
            .context("model loading task panicked")??;

        let model = Arc::new(LoadedModel { plan, backend });
        *state = ModelState::Loaded(model.clone());
        let _ = self.active_backend.set(backend);
        Ok(model)
    }

    async fn run(&self, image: &LoadedImage) -> anyhow::Result<Vec<FallbackDetection>> {
        let model = self.ensure_loaded().await?;
        let settings = self.settings.clone();
        let picture = image.image.clone();

        tokio::task::spawn_blocking(move || infer(&model, &settings, &picture))
            .await
            .context("inference task panicked")?
    }
}

fn build_plan(path: &Path, input_size: usize, backend: ComputeBackend) -> anyhow::Result<TypedRunnableModel<TypedModel>> {
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to load ONNX model from {}", path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, input_size, input_size)),
        )
        .context("failed to set input fact")?;

    let typed = match backend {
        ComputeBackend::Cpu => model
            .into_typed()
            .context("failed to type ONNX model")?
            .into_decluttered()
            .context("failed to declutter ONNX model")?,
        ComputeBackend::Simd | ComputeBackend::Gpu => model
            .into_optimized()
            .context("failed to optimize ONNX model")?,
    };

    typed.into_runnable().context("failed to build runnable ONNX model")
}

fn infer(
    model: &LoadedModel,
    settings: &LocalDetectorSettings,
    picture: &DynamicImage,
) -> anyhow::Result<Vec<FallbackDetection>> {
    let original = Size::new(picture.width() as f64, picture.height() as f64);
    let side = settings.input_size;
    let rgb = picture.resize_exact(side, side, FilterType::Triangle).to_rgb8();

    let input: Tensor = tract_ndarray::Array4::from_shape_fn(
        (1, 3, side as usize, side as usize),
        |(_, channel, y, x)| rgb.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
    )
    .into();

    let output = model.plan.run(input)?;
    let data = output.as_slice::<f32>().context("model output tensor was not f32")?;

    let candidates = decode::decode_output(data, output.shape(), settings.labels.len(), settings.score_threshold)
        .map_err(|e| anyhow!(e))?;
    let kept = decode::non_max_suppression(candidates, settings.iou_threshold);
    log::debug!("local detector ({}): {} boxes after NMS", model.backend, kept.len());

    Ok(decode::to_fallback_detections(&kept, &settings.labels, side, original))
}

impl DetectionProvider for LocalDetector {
    fn source(&self) -> DetectionSource {
        DetectionSource::Local
    }

    fn detect<'a>(&'a self, image: &'a LoadedImage) -> BoxFuture<'a, anyhow::Result<Vec<FallbackDetection>>> {
        self.run(image).boxed()
    }

    fn compute_backend(&self) -> Option<ComputeBackend> {
        self.active_backend()
    }
}
