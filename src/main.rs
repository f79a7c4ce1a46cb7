use clap::Parser;
use dax_optimizer::core::engine::{preview_measures, render_preview};
use dax_optimizer::utils::{logger, validation::Validate};
use dax_optimizer::{run_optimizer, CliConfig, OptimizerError};

fn exit_with(e: &OptimizerError) -> ! {
    tracing::error!("❌ {} (Category: {:?})", e, e.category());
    tracing::debug!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("\n❌ {}", e.user_friendly_message());
    eprintln!("💡 {}\n", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(cli.verbose, cli.log_json);

    tracing::info!("Starting dax-optimizer");
    tracing::debug!("CLI config: {:?}", cli);

    // 合併設定檔並驗證
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no requests will be sent");
        match preview_measures(&config).await {
            Ok(measures) => println!("{}", render_preview(&measures, &config.output_path)),
            Err(e) => exit_with(&e),
        }
        return;
    }

    match run_optimizer(config, cli.monitor).await {
        Ok(summary) => {
            println!("\n✅ Complete!");
            println!("   📄 Output file: {}", summary.output_path);
            println!(
                "   📊 Processed: {} expression(s), {} optimized, {} failed\n",
                summary.total, summary.optimized, summary.failed
            );
        }
        Err(e) => exit_with(&e),
    }
}
