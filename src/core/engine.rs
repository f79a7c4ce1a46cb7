use crate::adapters::http::ChatCompletionClient;
use crate::config::cli::LocalStorage;
use crate::config::{read_api_token, OptimizerConfig};
use crate::core::pipeline::{read_measures, DaxPipeline};
use crate::core::{MeasureRecord, Pipeline, RunSummary};
use crate::utils::error::Result;
use crate::utils::monitor::ProcessMonitor;

pub struct OptimizerEngine<P: Pipeline> {
    pipeline: P,
    monitor: ProcessMonitor,
}

impl<P: Pipeline> OptimizerEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: ProcessMonitor::new(monitor_enabled),
        }
    }

    pub fn monitor(&self) -> &ProcessMonitor {
        &self.monitor
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting DAX optimization");
        if self.monitor.is_enabled() {
            tracing::info!("🔍 System monitoring enabled");
        }

        let measures = self.pipeline.extract().await?;
        self.monitor.record_phase("Extract", measures.len());

        let results = self.pipeline.transform(measures).await?;
        self.monitor.record_phase("Optimize", results.len());

        let summary = self.pipeline.load(results).await?;
        self.monitor.record_phase("Report", summary.total);
        self.monitor.log_final_stats();

        tracing::info!(
            "✅ Complete! Processed {} expression(s): {} optimized, {} failed",
            summary.total,
            summary.optimized,
            summary.failed
        );
        Ok(summary)
    }
}

/// 建立 API 用戶端；憑證必須在任何網路請求之前確認
pub fn build_client(config: &OptimizerConfig) -> Result<ChatCompletionClient> {
    let token = read_api_token(&config.token_env)?;

    let client = ChatCompletionClient::new(token)
        .with_base_url(&config.endpoint)
        .with_model(&config.model);

    match config.timeout {
        Some(timeout) => client.with_timeout(timeout),
        None => Ok(client),
    }
}

/// 以本機檔案系統執行完整流程
pub async fn run_optimizer(config: OptimizerConfig, monitor_enabled: bool) -> Result<RunSummary> {
    let client = build_client(&config)?;
    tracing::debug!("Using model {} at {}", client.model(), client.completions_url());

    let pipeline = DaxPipeline::new(LocalStorage::current_dir(), config, client);
    OptimizerEngine::new_with_monitoring(pipeline, monitor_enabled)
        .run()
        .await
}

/// `--dry-run`：只切分輸入檔，不需要憑證也不發送任何請求
pub async fn preview_measures(config: &OptimizerConfig) -> Result<Vec<MeasureRecord>> {
    read_measures(&LocalStorage::current_dir(), &config.input_path).await
}

/// dry run 的輸出內容
pub fn render_preview(measures: &[MeasureRecord], output_path: &str) -> String {
    let mut out = String::new();
    for measure in measures {
        out.push_str(&format!(
            "{:>3}. {} ({} line(s))\n",
            measure.number,
            measure.name,
            measure.expression.lines().count()
        ));
    }
    out.push_str(&format!("\n✅ Found {} DAX expression(s)\n", measures.len()));
    out.push_str(&format!("📄 Report would be written to: {}", output_path));
    out
}
