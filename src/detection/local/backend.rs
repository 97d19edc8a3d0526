//! 演算バックエンドの可用性判定（GPU → SIMD → CPU）

use endo_lens_common::{CapabilityProvider, ComputeBackend};

/// tractにはGPU実行経路がないので常に使用不可
pub struct GpuProvider;

impl CapabilityProvider for GpuProvider {
    fn backend(&self) -> ComputeBackend {
        ComputeBackend::Gpu
    }

    fn probe(&self) -> Result<(), String> {
        Err("no GPU execution path in tract".to_string())
    }
}

/// CPUのベクトル命令が使えれば最適化済みプランを使う
pub struct SimdProvider;

impl CapabilityProvider for SimdProvider {
    fn backend(&self) -> ComputeBackend {
        ComputeBackend::Simd
    }

    fn probe(&self) -> Result<(), String> {
        if simd_available() {
            Ok(())
        } else {
            Err("required vector instructions not detected".to_string())
        }
    }
}

pub struct CpuProvider;

impl CapabilityProvider for CpuProvider {
    fn backend(&self) -> ComputeBackend {
        ComputeBackend::Cpu
    }

    fn probe(&self) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(target_arch = "x86_64")]
fn simd_available() -> bool {
    std::is_x86_feature_detected!("avx2") && std::is_x86_feature_detected!("fma")
}

#[cfg(target_arch = "aarch64")]
fn simd_available() -> bool {
    std::arch::is_aarch64_feature_detected!("neon")
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn simd_available() -> bool {
    false
}

pub fn default_providers() -> Vec<Box<dyn CapabilityProvider>> {
    vec![Box::new(GpuProvider), Box::new(SimdProvider), Box::new(CpuProvider)]
}
