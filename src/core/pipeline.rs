use crate::core::prompt::build_request;
use crate::core::reply::parse_reply;
use crate::core::report::render_report;
use crate::core::splitter::split_measures;
use crate::core::{
    CompletionClient, CompletionRequest, ConfigProvider, MeasureRecord, OptimizationOutcome,
    OptimizedMeasure, Pipeline, RunSummary, Storage,
};
use crate::utils::error::{OptimizerError, Result};
use chrono::Local;
use std::io::ErrorKind;
use std::time::Duration;

const NAME_DISPLAY_WIDTH: usize = 50;

/// 讀取輸入檔並切出 measure；找不到任何 measure 視為錯誤
pub async fn read_measures<S: Storage>(storage: &S, path: &str) -> Result<Vec<MeasureRecord>> {
    tracing::info!("📖 Reading: {}", path);

    let bytes = storage.read_file(path).await.map_err(|e| match e {
        OptimizerError::IoError(io) if io.kind() == ErrorKind::NotFound => {
            OptimizerError::InputNotFoundError {
                path: path.to_string(),
            }
        }
        OptimizerError::IoError(io) => OptimizerError::InputUnreadableError {
            path: path.to_string(),
            source: io,
        },
        other => other,
    })?;

    let content = String::from_utf8(bytes).map_err(|e| OptimizerError::InputUnreadableError {
        path: path.to_string(),
        source: std::io::Error::new(ErrorKind::InvalidData, e),
    })?;

    tracing::info!("🔍 Parsing DAX expressions...");
    let measures = split_measures(content.trim_start_matches('\u{feff}'));
    if measures.is_empty() {
        return Err(OptimizerError::NoMeasuresFoundError {
            path: path.to_string(),
        });
    }

    tracing::info!("✅ Found {} DAX expression(s)", measures.len());
    Ok(measures)
}

fn display_name(name: &str) -> String {
    if name.chars().count() > NAME_DISPLAY_WIDTH {
        let short: String = name.chars().take(NAME_DISPLAY_WIDTH).collect();
        format!("{}...", short)
    } else {
        name.to_string()
    }
}

/// 各請求之間的總暫停時間（最後一筆之後不暫停）
fn total_pause(delay: Duration, total: usize) -> Duration {
    let gaps = u32::try_from(total.saturating_sub(1)).unwrap_or(u32::MAX);
    delay.saturating_mul(gaps)
}

pub struct DaxPipeline<S: Storage, C: ConfigProvider, L: CompletionClient> {
    storage: S,
    config: C,
    client: L,
}

impl<S: Storage, C: ConfigProvider, L: CompletionClient> DaxPipeline<S, C, L> {
    pub fn new(storage: S, config: C, client: L) -> Self {
        Self {
            storage,
            config,
            client,
        }
    }

    /// 失敗時以固定間隔重試，不做退避
    async fn complete_with_retry(&self, request: &CompletionRequest) -> Result<String> {
        let max_retries = self.config.retry_attempts();
        let mut attempt = 0;

        loop {
            match self.client.complete(request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Request failed: {} - retrying in {:?} ({}/{})",
                        e,
                        self.config.retry_delay(),
                        attempt,
                        max_retries
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 單一 measure 只呼叫一次遠端服務（含重試）；失敗不中斷整體流程
    pub async fn optimize_measure(&self, measure: MeasureRecord) -> OptimizedMeasure {
        let request = build_request(self.config.prompt_style(), &measure);

        let outcome = match self.complete_with_retry(&request).await {
            Ok(reply) => OptimizationOutcome::Optimized(parse_reply(&reply)),
            Err(e) => {
                tracing::error!("❌ {} failed: {}", measure.name, e);
                OptimizationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        OptimizedMeasure { measure, outcome }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, L: CompletionClient> Pipeline for DaxPipeline<S, C, L> {
    async fn extract(&self) -> Result<Vec<MeasureRecord>> {
        read_measures(&self.storage, self.config.input_path()).await
    }

    async fn transform(&self, measures: Vec<MeasureRecord>) -> Result<Vec<OptimizedMeasure>> {
        let total = measures.len();
        let delay = self.config.request_delay();
        let mut results = Vec::with_capacity(total);

        tracing::info!(
            "⏱️  Estimated time: ~{:?} of pauses between {} request(s)",
            total_pause(delay, total),
            total
        );

        for (index, measure) in measures.into_iter().enumerate() {
            let position = index + 1;
            let name = display_name(&measure.name);

            let result = self.optimize_measure(measure).await;
            match &result.outcome {
                OptimizationOutcome::Optimized(sections) if sections.is_structured() => {
                    tracing::info!("[{}/{}] {} ✓", position, total, name);
                }
                OptimizationOutcome::Optimized(_) => {
                    tracing::warn!(
                        "[{}/{}] {} ✓ (reply had no recognizable sections)",
                        position,
                        total,
                        name
                    );
                }
                OptimizationOutcome::Failed { .. } => {
                    tracing::warn!("[{}/{}] {} ❌", position, total, name);
                }
            }
            results.push(result);

            // 最後一筆之後不需等待
            if position < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(results)
    }

    async fn load(&self, results: Vec<OptimizedMeasure>) -> Result<RunSummary> {
        let output_path = self.config.output_path();
        tracing::info!("💾 Writing output to: {}", output_path);

        let report = render_report(
            &results,
            self.config.report_format(),
            Local::now().naive_local(),
        );
        tracing::debug!("Report size: {} bytes", report.len());
        self.storage.write_file(output_path, report.as_bytes()).await?;

        let failed = results
            .iter()
            .filter(|r| r.failure_reason().is_some())
            .count();
        let optimized = results.iter().filter(|r| r.has_optimized_dax()).count();

        Ok(RunSummary {
            output_path: output_path.to_string(),
            total: results.len(),
            optimized,
            failed,
        })
    }
}
