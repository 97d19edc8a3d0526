//! 演算バックエンドの選択
//!
//! ローカル検出器を動かすバックエンドを優先順（GPU → SIMD → CPU）に試し、
//! 最初に準備できたものを採用する。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeBackend {
    Gpu,
    Simd,
    Cpu,
}

impl ComputeBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeBackend::Gpu => "gpu",
            ComputeBackend::Simd => "simd",
            ComputeBackend::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// バックエンドの可用性を判定するプロバイダ
pub trait CapabilityProvider: Send + Sync {
    fn backend(&self) -> ComputeBackend;

    /// 使用可能なら `Ok(())`、不可なら理由
    fn probe(&self) -> Result<(), String>;
}

/// 先頭から順に判定し、最初に使用可能なバックエンドを返す
pub fn select_backend(providers: &[Box<dyn CapabilityProvider>]) -> Option<ComputeBackend> {
    for provider in providers {
        match provider.probe() {
            Ok(()) => {
                log::info!("compute backend selected: {}", provider.backend());
                return Some(provider.backend());
            }
            Err(reason) => {
                log::debug!("compute backend {} unavailable: {}", provider.backend(), reason);
            }
        }
    }
    log::warn!("no compute backend available");
    None
}
