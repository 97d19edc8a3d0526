use crate::error::{EndoLensError, Result};
use endo_lens_common::FindingCategory;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// APIキーを読む環境変数（先頭が優先）
const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    /// リモート検出エンドポイント（POST /detect）
    pub detect_endpoint: String,
    /// ローカル検出器のONNXモデル（未設定ならローカル段は常に失敗扱い）
    pub local_model_path: Option<PathBuf>,
    pub local_input_size: u32,
    /// クラスID → クラス名
    pub local_labels: Vec<String>,
    pub score_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            detect_endpoint: "http://localhost:5000/detect".into(),
            local_model_path: None,
            local_input_size: 640,
            local_labels: FindingCategory::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            score_threshold: 0.25,
            iou_threshold: 0.45,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EndoLensError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("endo-lens").join("config.json"))
    }

    /// APIキーを解決（環境変数を優先）
    pub fn resolve_api_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.detect_endpoint, "http://localhost:5000/detect");
        assert_eq!(config.local_input_size, 640);
        assert_eq!(config.local_labels.len(), 4);
        assert_eq!(config.local_labels[0], "No Endodontic Treatment");
        assert!(config.local_model_path.is_none());
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"model": "gemini-2.0-flash"}"#).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.local_input_size, 640);
        assert_eq!(config.detect_endpoint, "http://localhost:5000/detect");
    }

    #[test]
    fn test_config_roundtrip_with_model_path() {
        let config = Config {
            local_model_path: Some(PathBuf::from("/models/endo.onnx")),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let loaded: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.local_model_path, Some(PathBuf::from("/models/endo.onnx")));
    }
}
