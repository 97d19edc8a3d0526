//! 解析結果キャッシュモジュール
//!
//! 画像のSHA-256ハッシュをキーにして解析結果をキャッシュし、
//! 同じ画像の再解析（Gemini呼び出し）をスキップする。

use super::types::AnalysisOutcome;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const CACHE_FILE_NAME: &str = ".endo-lens-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// バージョン（互換性チェック用）
    version: u32,
    /// ファイルハッシュ → 解析結果のマップ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_name: String,
    pub file_size: u64,
    pub outcome: AnalysisOutcome,
}

impl CacheFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（読めなければ空）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("キャッシュを開けません {}: {}", cache_path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_reader::<_, CacheFile>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                log::warn!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                log::warn!("キャッシュが壊れています、再生成します: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// 保存に失敗しても警告ログだけで続行する（保存できたら `true`）
    pub fn save_or_warn(&self, folder: &Path) -> bool {
        match self.save(folder) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("キャッシュを保存できませんでした ({}): {}", Self::cache_path(folder).display(), e);
                false
            }
        }
    }

    /// キャッシュファイルを削除（存在しなければ `Ok(false)`）
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(cache_path)?;
        Ok(true)
    }

    pub fn get(&self, hash: &str) -> Option<&AnalysisOutcome> {
        self.entries.get(hash).map(|e| &e.outcome)
    }

    pub fn insert(&mut self, hash: String, file_size: u64, outcome: AnalysisOutcome) {
        self.entries.insert(
            hash,
            CacheEntry {
                file_name: outcome.file_name.clone(),
                file_size,
                outcome,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// バイト列のSHA-256（16進）
pub fn compute_file_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
