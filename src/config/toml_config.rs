use super::MAX_DELAY_MS;
use crate::domain::model::{PromptStyle, ReportFormat};
use crate::utils::error::{OptimizerError, Result};
use crate::utils::validation::{
    validate_env_var_name, validate_non_empty_string, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern"));

/// 選用的 TOML 設定檔，所有欄位皆可省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub token_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub format: Option<ReportFormat>,
    pub prompt_style: Option<PromptStyle>,
    pub request_delay_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| OptimizerError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| OptimizerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MODEL_ENDPOINT})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_REFERENCE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.api.endpoint {
            validate_url("api.endpoint", endpoint)?;
        }
        if let Some(model) = &self.api.model {
            validate_non_empty_string("api.model", model)?;
        }
        if let Some(token_env) = &self.api.token_env {
            validate_env_var_name("api.token_env", token_env)?;
        }
        if let Some(timeout) = self.api.timeout_seconds {
            validate_range("api.timeout_seconds", timeout, 1, 600)?;
        }
        if let Some(attempts) = self.run.retry_attempts {
            validate_range("run.retry_attempts", attempts, 0, 5)?;
        }
        if let Some(delay) = self.run.request_delay_ms {
            validate_range("run.request_delay_ms", delay, 0, MAX_DELAY_MS)?;
        }
        if let Some(delay) = self.run.retry_delay_ms {
            validate_range("run.retry_delay_ms", delay, 0, MAX_DELAY_MS)?;
        }
        Ok(())
    }
}
