use clap::Parser;
use endo_lens::{analyzer, cli, config, detection, error, export, scanner};
use cli::{Cli, Commands};
use config::Config;
use endo_lens_common::{normalize_detections, ANALYSIS_FAILED_MESSAGE};
use error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = Config::load()?;

    match cli.command {
        Commands::Analyze { path, output, overlay_dir, report_dir, use_cache } => {
            println!("🦷 endo-lens - X線解析\n");

            let client = analyzer::GeminiClient::from_config(&config);
            if !client.has_api_key() {
                log::warn!("Gemini APIキーが未設定です (GEMINI_API_KEY / endo-lens config --set-api-key)");
            }

            // 1. 画像スキャン
            println!("[1/3] 画像をスキャン中...");
            let images = scanner::scan_path(&path)?;
            if images.is_empty() {
                return Err(error::EndoLensError::NoImagesFound(path.display().to_string()));
            }
            println!("✔ {}枚の画像を検出\n", images.len());

            // 2. 解析
            println!("[2/3] AI解析中...{}", if use_cache { " (キャッシュ有効)" } else { "" });
            let cache_dir = base_dir(&path);
            let mut cache = if use_cache {
                analyzer::CacheFile::load(&cache_dir)
            } else {
                analyzer::CacheFile::default()
            };

            let local = Arc::new(detection::LocalDetector::new(
                detection::LocalDetectorSettings::from_config(&config),
            ));
            let pipeline = detection::FallbackPipeline::from_config(&config, local);
            let session = analyzer::new_session();

            let progress = ProgressBar::new(images.len() as u64);
            let style = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            progress.set_style(style);

            let mut outcomes = Vec::new();
            let mut failed = 0usize;
            for info in &images {
                progress.set_message(info.file_name.clone());

                let image = match scanner::LoadedImage::load(&info.path) {
                    Ok(image) => image,
                    Err(e) => {
                        progress.println(format!("✖ {}: {}", info.file_name, e));
                        failed += 1;
                        progress.inc(1);
                        continue;
                    }
                };

                let hash = analyzer::compute_file_hash(&image.bytes);
                let cached = if use_cache { cache.get(&hash).cloned() } else { None };

                let outcome = match cached {
                    Some(outcome) => {
                        log::info!("{}: cache hit", info.file_name);
                        outcome
                    }
                    None => match analyzer::run_analysis(&session, &pipeline, &client, &image, &info.path).await {
                        Ok(outcome) => {
                            cache.insert(hash, image.bytes.len() as u64, outcome.clone());
                            outcome
                        }
                        Err(e) => {
                            log::debug!("{}: {}", info.file_name, e);
                            let message = analyzer::last_error(&session)
                                .unwrap_or_else(|| ANALYSIS_FAILED_MESSAGE.to_string());
                            progress.println(format!("✖ {}: {}", info.file_name, message));
                            failed += 1;
                            progress.inc(1);
                            continue;
                        }
                    },
                };

                if let Some(dir) = &overlay_dir {
                    if let Err(e) = export::write_overlay(&image.image, &image.file_name, &outcome.findings, dir) {
                        progress.println(format!("✖ {}: {}", info.file_name, e));
                    }
                }
                if let Some(dir) = &report_dir {
                    if let Err(e) = export::write_markdown_report(&outcome, dir) {
                        progress.println(format!("✖ {}: {}", info.file_name, e));
                    }
                }

                outcomes.push(outcome);
                progress.inc(1);
            }
            progress.finish_and_clear();
            println!("✔ 解析完了: 成功 {}枚 / 失敗 {}枚\n", outcomes.len(), failed);

            // 3. 結果保存
            println!("[3/3] 結果を保存中...");
            let output = output.unwrap_or_else(|| cli::default_output_path(&path));
            export::write_results(&outcomes, &output)?;
            println!("✔ 結果を保存: {}", output.display());

            if use_cache {
                cache.save_or_warn(&cache_dir);
            }

            println!("\n✅ 解析完了");
        }

        Commands::Detect { image } => {
            let loaded = scanner::LoadedImage::load(&image)?;
            let local = Arc::new(detection::LocalDetector::new(
                detection::LocalDetectorSettings::from_config(&config),
            ));
            let pipeline = detection::FallbackPipeline::from_config(&config, local);

            let result = pipeline.detect(&loaded).await;
            println!("検出元: {}", result.source);
            if let Some(backend) = result.compute_backend {
                println!("バックエンド: {}", backend);
            }

            let normalized = normalize_detections(&result.detections, loaded.size());
            for (raw, norm) in result.detections.iter().zip(&normalized) {
                println!(
                    "  {} {:.1}% [{:.0}, {:.0}, {:.0}, {:.0}] → ({:.3}, {:.3}, {:.3}, {:.3})",
                    raw.class_name,
                    raw.score * 100.0,
                    raw.bbox[0],
                    raw.bbox[1],
                    raw.bbox[2],
                    raw.bbox[3],
                    norm.bbox.x,
                    norm.bbox.y,
                    norm.bbox.width,
                    norm.bbox.height
                );
            }
            if result.detections.is_empty() {
                println!("  (検出なし)");
            }
        }

        Commands::Report { input } => {
            let outcomes = export::read_results(&input)?;
            for outcome in &outcomes {
                println!("━━ {} ({}件) ━━", outcome.file_name, outcome.findings.len());
                print!("{}", export::render_terminal(&outcome.description));
                println!();
            }
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  APIベースURL: {}", config.api_base_url);
                println!("  検出エンドポイント: {}", config.detect_endpoint);
                println!(
                    "  ローカルモデル: {}",
                    config
                        .local_model_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "未設定".to_string())
                );
                println!("  入力サイズ: {}px", config.local_input_size);
                println!("  しきい値: score {} / IoU {}", config.score_threshold, config.iou_threshold);
                println!("  APIキー: {}", if config.resolve_api_key().is_some() { "設定済み" } else { "未設定" });
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = analyzer::CacheFile::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = analyzer::CacheFile::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match analyzer::CacheFile::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// 入力がファイルなら親フォルダ、フォルダならそのまま
fn base_dir(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
