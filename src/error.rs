use thiserror::Error;

/// Gemini呼び出し（所見検出・レポート生成）の失敗
///
/// ユーザーには原因を区別せず `ANALYSIS_FAILED_MESSAGE` を表示する。
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Gemini APIキーが設定されていません")]
    MissingApiKey,

    #[error("Gemini API呼び出しエラー: {0}")]
    Request(String),

    #[error("Gemini APIエラー (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Gemini APIの応答が空です")]
    EmptyResponse,

    #[error("APIレスポンスのパースに失敗: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum EndoLensError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("解析エラー: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("出力エラー: {0}")]
    Export(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EndoLensError>;
