use clap::Parser;
use points_etl::domain::ports::ConfigProvider;
use points_etl::utils::{logger, validation::Validate};
use points_etl::{CliConfig, EtlEngine, HttpRecordFetcher, LocalStorage, PointsError, PointsPipeline};
use std::time::Duration;

fn report_failure(stage: &str, e: &PointsError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    std::process::exit(e.exit_code().max(1));
}

// 逐一等待每個請求，不需要多執行緒
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting points-etl");

    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(e) => report_failure("Configuration", &e),
    };
    if cli.verbose {
        tracing::debug!("Resolved settings: {:?}", settings);
    }

    // 驗證配置
    if let Err(e) = settings.validate() {
        report_failure("Configuration validation", &e);
    }

    if settings.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let fetcher = match HttpRecordFetcher::with_timeout(
        settings.api_endpoint().to_string(),
        settings.request_timeout_secs().map(Duration::from_secs),
    ) {
        Ok(fetcher) => fetcher,
        Err(e) => report_failure("HTTP client setup", &e),
    };

    // 快取與輸出分別存放
    let storage = LocalStorage::new(settings.data_dir.clone());
    let output = LocalStorage::new(settings.output_path.clone());
    let monitor_enabled = settings.monitor;
    let pipeline = PointsPipeline::new(storage, output, settings, fetcher);

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Harvest completed successfully!");
            println!("✅ Harvest completed successfully!");
            println!("📁 Output saved to: {}", output_path);
            Ok(())
        }
        Err(e) => report_failure("Harvest", &e),
    }
}
