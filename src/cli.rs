use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "endo-lens")]
#[command(about = "歯科X線写真のAI解析・所見オーバーレイ・レポート生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// X線画像（ファイルまたはフォルダ）を解析してJSONを出力
    Analyze {
        /// 画像ファイルまたはフォルダのパス
        #[arg(required = true)]
        path: PathBuf,

        /// 出力JSONファイル（デフォルト: 入力フォルダ/endo-lens-result.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 所見オーバーレイ画像の出力先
        #[arg(long)]
        overlay_dir: Option<PathBuf>,

        /// Markdownレポートの出力先
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// キャッシュを使用（再解析をスキップ）
        #[arg(long)]
        use_cache: bool,
    },

    /// フォールバック検出パイプラインだけを実行
    Detect {
        /// 画像ファイル
        #[arg(required = true)]
        image: PathBuf,
    },

    /// 保存済みの解析結果からレポートを表示
    Report {
        /// 解析結果JSONファイル
        #[arg(required = true)]
        input: PathBuf,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

/// 入力パスから出力JSONの既定パスを決める
pub fn default_output_path(input: &std::path::Path) -> PathBuf {
    let dir = if input.is_dir() {
        input.to_path_buf()
    } else {
        input
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    };
    dir.join("endo-lens-result.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::parse_from([
            "endo-lens", "-v", "analyze", "xrays", "--overlay-dir", "out", "--use-cache",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze { path, overlay_dir, report_dir, use_cache, output } => {
                assert_eq!(path, PathBuf::from("xrays"));
                assert_eq!(overlay_dir, Some(PathBuf::from("out")));
                assert!(report_dir.is_none());
                assert!(output.is_none());
                assert!(use_cache);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_default_output_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(default_output_path(dir.path()), dir.path().join("endo-lens-result.json"));

        let file = dir.path().join("xray.png");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(default_output_path(&file), dir.path().join("endo-lens-result.json"));
    }
}
