use bid_sniper::config::{AppConfig, load_config};
use bid_sniper::normalizer::Normalizer;
use bid_sniper::pipeline::{Pipeline, SourceStamps};
use bid_sniper::report::ReportWriter;
use std::collections::HashMap;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: AppConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    let pipeline = Pipeline::new(Normalizer::default(), ReportWriter::new(&config.output_dir));
    // Sources already analyzed, keyed by dataset name. A fresh upload changes the stamps.
    let mut analyzed: HashMap<String, SourceStamps> = HashMap::new();

    loop {
        info!("Datasets to process: {}", config.datasets.len());

        for dataset_cfg in &config.datasets {
            let stamps = match pipeline.source_stamps(dataset_cfg).await {
                Ok(stamps) => stamps,
                Err(e) => {
                    warn!("Source check failed for {}: {}", dataset_cfg.name, e);
                    continue;
                }
            };
            if analyzed.get(&dataset_cfg.name) == Some(&stamps) {
                info!("No changes in {}, skipping.", dataset_cfg.name);
                continue;
            }

            match pipeline.run(dataset_cfg).await {
                Ok(_) => {
                    analyzed.insert(dataset_cfg.name.clone(), stamps);
                }
                Err(e) => warn!("Analysis of {} failed: {}", dataset_cfg.name, e),
            }
        }

        if !config.watch {
            break;
        }

        info!(
            "Waiting for timer ({}s) or Ctrl-C...",
            config.check_interval_seconds
        );
        tokio::select! {
            _ = sleep(Duration::from_secs(config.check_interval_seconds)) => {
                info!("Timer triggered.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested.");
                break;
            }
        }
    }
}
