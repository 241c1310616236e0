use clap::Parser;
use density_ai_rust::{batch, cli, completion, config, data, error, logging};
use batch::{BatchDriver, BatchOptions};
use cli::{Cli, Commands};
use config::Config;
use data::{CsvSink, RecordSink};
use error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Match { reference, missing, limit, out, model, concurrency, max_attempts, transcript } => {
            println!("🥄 density-ai - 密度照合\n");

            let mut config = Config::load()?;
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            if let Some(max_attempts) = max_attempts {
                config.max_attempts = max_attempts;
            }
            config.validate()?;

            println!("Using {} via {}", config.model, cli.ai_provider);

            // 1. 読み込み
            println!("[1/3] CSVを読み込み中...");
            let catalog = data::load_catalog(&reference)?;
            println!("✔ 密度リファレンス {}件", catalog.len());
            let records = data::load_unresolved(&missing)?;
            println!("✔ 未解決食材 {}件\n", records.len());

            // 2. 照合
            println!("[2/3] AI照合中...");
            let service = completion::build_service(cli.ai_provider, &config, cli.verbose)?;
            let options = BatchOptions {
                limit,
                concurrency: config.concurrency,
                max_attempts: config.max_attempts,
                params: completion::GenerationParams::from(&config),
            };
            let driver = BatchDriver::new(&catalog, service.as_ref(), options);
            let progress = if cli.verbose {
                ProgressBar::hidden()
            } else {
                let pb = ProgressBar::new(driver.target_count(records.len()) as u64);
                if let Ok(style) = ProgressStyle::default_bar().template("  {bar:40} {pos}/{len}") {
                    pb.set_style(style);
                }
                pb
            };
            let driver = driver.with_progress(progress);

            // Ctrl-Cで処理中のレコードを中断
            let cancel = CancellationToken::new();
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_token.cancel();
                }
            });

            let mut sink = match &out {
                Some(path) => {
                    println!("  出力先: {}", path.display());
                    Some(CsvSink::create(path)?)
                }
                None => None,
            };
            let result = driver
                .run(&records, sink.as_mut().map(|s| s as &mut dyn RecordSink), &cancel)
                .await?;
            let summary = &result.summary;
            println!("✔ 照合完了\n");

            // 3. 結果
            println!("[3/3] 結果");
            println!("  処理件数: {}", summary.processed);
            println!("  AUTO-FILL: {}", summary.auto_filled);
            println!("  REVIEW: {}", summary.review);
            println!("  NO-MATCH: {}", summary.no_match);
            println!("  未解決: {}", summary.unresolved);
            if out.is_none() {
                println!("  (--out 未指定のためCSVは出力していません)");
            }

            if let Some(path) = transcript {
                let json = serde_json::to_string_pretty(&result.reports)?;
                std::fs::write(&path, json)?;
                println!("✔ 会話記録を保存: {}", path.display());
            }

            if summary.cancelled {
                println!("\n⚠ 中断されました");
            } else {
                println!("\n✅ 完了");
            }
        }

        Commands::Catalog { reference, output } => {
            println!("📚 density-ai - リファレンス検証\n");

            let catalog = data::load_catalog(&reference)?;
            println!("✔ {}件を読み込み", catalog.len());

            let unassigned = catalog.iter().filter(|e| e.id.is_none()).count();
            if unassigned > 0 {
                println!("  未採番: {}件", unassigned);
            }

            if let Some(path) = output {
                data::save_catalog(&path, &catalog)?;
                println!("✔ 正規化したリファレンスを保存: {}", path.display());
            }
        }

        Commands::Config { set_api_key, show } => {
            // 設定ファイルが壊れていてもAPIキーの再設定はできるようにする
            let mut config = if set_api_key.is_some() {
                Config::load_for_update()?
            } else {
                Config::load()?
            };

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  APIエンドポイント: {}", config.api_base_url);
                println!("  最大出力トークン: {}", config.max_tokens);
                println!("  temperature: {}", config.temperature);
                if !cli.ai_provider.honors_generation_params() {
                    println!("  ({}では最大出力トークンとtemperatureは適用されません)", cli.ai_provider);
                }
                println!("  最大試行回数: {}", config.max_attempts);
                println!("  同時処理数: {}", config.concurrency);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  プロバイダ: {}", cli.ai_provider);
                if cli.ai_provider.requires_api_key() {
                    println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
                }
            }
        }
    }

    Ok(())
}
