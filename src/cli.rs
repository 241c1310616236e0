use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "density-ai")]
#[command(about = "密度が未知の食材をAIで密度リファレンスに照合するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (anthropic/claude)
    #[arg(long, value_enum, default_value = "anthropic", global = true)]
    pub ai_provider: AiProvider,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 未解決食材をリファレンスに照合してCSVを出力
    Match {
        /// 密度リファレンスCSV
        #[arg(long, default_value = "density_reference.csv")]
        reference: PathBuf,

        /// 未解決食材CSV
        #[arg(long, default_value = "missing_ingredients.csv")]
        missing: PathBuf,

        /// 処理件数の上限（0で無制限）
        #[arg(short, long, default_value = "1")]
        limit: usize,

        /// 出力CSVファイル（省略時は書き出さない）
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// 使用するモデル（設定ファイルより優先）
        #[arg(short, long)]
        model: Option<String>,

        /// 同時に処理する食材数
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// 1食材あたりの最大試行回数
        #[arg(long)]
        max_attempts: Option<usize>,

        /// 会話の記録をJSONで出力
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// 密度リファレンスを検証（正規化して書き出し）
    Catalog {
        /// 密度リファレンスCSV
        #[arg(long, default_value = "density_reference.csv")]
        reference: PathBuf,

        /// 正規化したCSVの出力先
        #[arg(short, long)]
        output: Option<PathBuf>,
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
}
