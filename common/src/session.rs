//! 解析セッション
//!
//! 1回のアップロードから結果表示までの状態を保持する。
//! 解析の開始ごとに `RunToken` を発行し、書き込みはトークンが現在の実行と一致する
//! 場合だけ反映する。先に開始した解析が後から完了しても、新しい解析の状態を上書きしない。

use crate::types::DetectionResult;

/// 解析1回分を識別するトークン
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunToken(u64);

/// セッションの表示状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    image: Option<String>,
    results: Option<Vec<DetectionResult>>,
    report: Option<String>,
    error: Option<String>,
    busy: bool,
    generation: u64,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい解析を開始（前回の結果・エラーは破棄）
    pub fn begin(&mut self, image: impl Into<String>) -> RunToken {
        self.generation += 1;
        self.image = Some(image.into());
        self.results = None;
        self.report = None;
        self.error = None;
        self.busy = true;
        RunToken(self.generation)
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        token.0 == self.generation && self.busy
    }

    pub fn apply_results(&mut self, token: RunToken, results: Vec<DetectionResult>) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.results = Some(results);
        true
    }

    pub fn apply_report(&mut self, token: RunToken, report: impl Into<String>) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.report = Some(report.into());
        true
    }

    /// エラーで終了（適用済みの所見は残す）
    pub fn fail(&mut self, token: RunToken, message: impl Into<String>) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.error = Some(message.into());
        self.busy = false;
        true
    }

    pub fn finish(&mut self, token: RunToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.busy = false;
        true
    }

    /// 全フィールドをまとめてクリア。実行中の解析の書き込みも無効になる
    pub fn reset(&mut self) {
        self.generation += 1;
        self.image = None;
        self.results = None;
        self.report = None;
        self.error = None;
        self.busy = false;
    }

    pub fn phase(&self) -> SessionPhase {
        if self.busy {
            SessionPhase::Loading
        } else if self.error.is_some() {
            SessionPhase::Error
        } else if self.results.is_some() || self.report.is_some() {
            SessionPhase::Success
        } else {
            SessionPhase::Idle
        }
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn results(&self) -> Option<&[DetectionResult]> {
        self.results.as_deref()
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}
