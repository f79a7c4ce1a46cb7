pub mod cli;
pub mod toml_config;

use crate::adapters::http::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::domain::model::{PromptStyle, ReportFormat};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{OptimizerError, Result};
use crate::utils::validation::{
    validate_env_var_name, validate_non_empty_string, validate_path, validate_range, validate_url,
    Validate,
};
use std::path::Path;
use std::time::Duration;
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
/// 請求間隔與重試間隔的上限（10 分鐘）
pub const MAX_DELAY_MS: u64 = 600_000;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "dax-optimizer")]
#[command(about = "Review DAX measures with a remote language model and write a report")]
pub struct CliConfig {
    /// Text file containing DAX measure definitions
    pub input_file: String,

    /// Report file (defaults to <input>_optimized.md next to the input)
    pub output_file: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    #[arg(long, value_enum)]
    pub prompt_style: Option<PromptStyle>,

    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the chat completion API
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Environment variable holding the bearer token
    #[arg(long)]
    pub token_env: Option<String>,

    /// Pause between requests in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    #[arg(long)]
    pub retries: Option<u32>,

    /// Split the input and list the measures without calling the API
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, help = "Log process CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 合併優先順序：命令列 > 設定檔 > 預設值
    pub fn resolve(&self) -> Result<OptimizerConfig> {
        let file = match &self.config {
            Some(path) => {
                let file = TomlConfig::from_file(path)?;
                file.validate()?;
                file
            }
            None => TomlConfig::default(),
        };

        let mut config = OptimizerConfig::from_file_config(
            &self.input_file,
            self.output_file.as_deref(),
            self.format,
            &file,
        );

        if let Some(style) = self.prompt_style {
            config.prompt_style = style;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(token_env) = &self.token_env {
            config.token_env = token_env.clone();
        }
        if let Some(delay) = self.delay_ms {
            config.request_delay = Duration::from_millis(delay);
        }
        if let Some(retries) = self.retries {
            config.retry_attempts = retries;
        }

        Ok(config)
    }
}

/// 合併後的執行設定
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub input_path: String,
    pub output_path: String,
    pub format: ReportFormat,
    pub prompt_style: PromptStyle,
    pub endpoint: String,
    pub model: String,
    pub token_env: String,
    pub timeout: Option<Duration>,
    pub request_delay: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl OptimizerConfig {
    pub fn new(input_path: &str, output_path: Option<&str>) -> Self {
        Self::from_file_config(input_path, output_path, None, &TomlConfig::default())
    }

    pub fn from_file_config(
        input_path: &str,
        output_path: Option<&str>,
        format: Option<ReportFormat>,
        file: &TomlConfig,
    ) -> Self {
        let (output_path, format) =
            resolve_output_path(input_path, output_path, format.or(file.run.format));

        Self {
            input_path: input_path.to_string(),
            output_path,
            format,
            prompt_style: file.run.prompt_style.unwrap_or(PromptStyle::Detailed),
            endpoint: file
                .api
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: file
                .api
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            token_env: file
                .api
                .token_env
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
            timeout: file.api.timeout_seconds.map(Duration::from_secs),
            request_delay: Duration::from_millis(
                file.run.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS),
            ),
            retry_attempts: file.run.retry_attempts.unwrap_or(0),
            retry_delay: Duration::from_millis(
                file.run.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
        }
    }
}

impl Validate for OptimizerConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input_file", &self.input_path)?;
        validate_path("output_file", &self.output_path)?;
        validate_url("endpoint", &self.endpoint)?;
        validate_non_empty_string("model", &self.model)?;
        validate_env_var_name("token_env", &self.token_env)?;
        validate_range("retries", self.retry_attempts, 0, 5)?;
        validate_range("delay_ms", duration_ms(self.request_delay), 0, MAX_DELAY_MS)?;
        validate_range("retry_delay_ms", duration_ms(self.retry_delay), 0, MAX_DELAY_MS)?;
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl ConfigProvider for OptimizerConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn report_format(&self) -> ReportFormat {
        self.format
    }

    fn prompt_style(&self) -> PromptStyle {
        self.prompt_style
    }

    fn request_delay(&self) -> Duration {
        self.request_delay
    }

    fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

/// 決定報告路徑與格式。
///
/// 格式依序取自明確指定、輸出檔副檔名，最後預設 Markdown；
/// 輸出檔副檔名與格式不符時會補上對應副檔名。
pub fn resolve_output_path(
    input_path: &str,
    output_path: Option<&str>,
    format: Option<ReportFormat>,
) -> (String, ReportFormat) {
    let output_format = output_path.and_then(|path| {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ReportFormat::from_extension)
    });
    let format = format.or(output_format).unwrap_or(ReportFormat::Markdown);

    let path = match output_path {
        Some(path) if output_format == Some(format) => path.to_string(),
        Some(path) => format!("{}.{}", path, format.extension()),
        None => {
            let input = Path::new(input_path);
            let stem = input
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("dax_measures");
            input
                .with_file_name(format!("{}_optimized.{}", stem, format.extension()))
                .to_string_lossy()
                .into_owned()
        }
    };

    (path, format)
}

/// 讀取憑證；空字串視同未設定
pub fn read_api_token(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(OptimizerError::MissingCredentialError {
            var: var_name.to_string(),
        }),
    }
}

pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 14 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
