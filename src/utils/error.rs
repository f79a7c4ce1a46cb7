use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {body}")]
    ApiStatusError { status: u16, body: String },

    #[error("API returned no completion content")]
    EmptyCompletionError,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("API returned a malformed response: {0}")]
    MalformedResponseError(#[from] serde_json::Error),

    #[error("Environment variable {var} is not set")]
    MissingCredentialError { var: String },

    #[error("Input file not found: {path}")]
    InputNotFoundError { path: String },

    #[error("Cannot read input file {path}: {source}")]
    InputUnreadableError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No DAX measures found in {path}")]
    NoMeasuresFoundError { path: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Credential,
    Input,
    Output,
    Configuration,
}

impl OptimizerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            OptimizerError::ApiError(_)
            | OptimizerError::ApiStatusError { .. }
            | OptimizerError::EmptyCompletionError
            | OptimizerError::MalformedResponseError(_) => ErrorCategory::Network,
            OptimizerError::MissingCredentialError { .. } => ErrorCategory::Credential,
            OptimizerError::InputNotFoundError { .. }
            | OptimizerError::InputUnreadableError { .. }
            | OptimizerError::NoMeasuresFoundError { .. } => ErrorCategory::Input,
            OptimizerError::IoError(_) => ErrorCategory::Output,
            OptimizerError::ConfigError { .. } | OptimizerError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    /// 程式結束碼：2 代表輸入檔問題，3 代表缺少憑證
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Input => 2,
            ErrorCategory::Credential => 3,
            _ => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            OptimizerError::MissingCredentialError { var } => {
                format!("Error: {} environment variable not set!", var)
            }
            OptimizerError::InputNotFoundError { path } => {
                format!("Error: File '{}' not found!", path)
            }
            OptimizerError::InputUnreadableError { path, source } => {
                format!("Error reading file '{}': {}", path, source)
            }
            OptimizerError::NoMeasuresFoundError { path } => {
                format!("No DAX expressions found in '{}'", path)
            }
            OptimizerError::ApiStatusError { status, .. } => {
                format!("The completion endpoint rejected the request (HTTP {})", status)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            OptimizerError::MissingCredentialError { var } => format!(
                "Set your GitHub Personal Access Token: export {}='your_token_here' \
                 (create one at https://github.com/settings/tokens)",
                var
            ),
            OptimizerError::InputNotFoundError { .. }
            | OptimizerError::InputUnreadableError { .. } => {
                "Check the input path and that the file is readable UTF-8 text".to_string()
            }
            OptimizerError::NoMeasuresFoundError { .. } => {
                "Expected format: a '[Measure].[Name]' line, the DAX code below it, \
                 and a line of dashes ('----------') between measures"
                    .to_string()
            }
            OptimizerError::ApiError(_)
            | OptimizerError::ApiStatusError { .. }
            | OptimizerError::EmptyCompletionError
            | OptimizerError::MalformedResponseError(_) => {
                "Run test-connection to check the token and network access to the endpoint"
                    .to_string()
            }
            OptimizerError::IoError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            OptimizerError::ConfigError { .. } | OptimizerError::InvalidConfigValueError { .. } => {
                "Review the command-line flags and the TOML configuration file".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        let missing = OptimizerError::MissingCredentialError {
            var: "GITHUB_TOKEN".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Credential);
        assert_eq!(missing.exit_code(), 3);

        let not_found = OptimizerError::InputNotFoundError {
            path: "measures.txt".to_string(),
        };
        assert_eq!(not_found.exit_code(), 2);

        let config = OptimizerError::ConfigError {
            message: "bad".to_string(),
        };
        assert_eq!(config.exit_code(), 1);
    }

    #[test]
    fn test_missing_credential_message_names_variable() {
        let err = OptimizerError::MissingCredentialError {
            var: "MY_TOKEN".to_string(),
        };
        assert!(err.user_friendly_message().contains("MY_TOKEN"));
        assert!(err.recovery_suggestion().contains("export MY_TOKEN"));
    }

    #[test]
    fn test_malformed_response_is_a_network_failure() {
        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err = OptimizerError::from(source);

        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("API returned a malformed response"));
    }
}
