use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("dax_optimizer=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dax_optimizer=info"))
    }
}

/// `json` 為 true 時輸出 JSON，方便批次執行時收集；否則為精簡的終端格式
pub fn build_subscriber<W>(verbose: bool, json: bool, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(default_filter(verbose));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(!json)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        Box::new(registry.with(layer.json()))
    } else {
        Box::new(registry.with(layer.compact()))
    }
}

pub fn init_logger(verbose: bool, json: bool) {
    build_subscriber(verbose, json, std::io::stdout).init();
}
