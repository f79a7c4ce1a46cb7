use serde::{Deserialize, Serialize};

/// 從輸入檔切出的單一 measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRecord {
    /// 在輸入檔中的位置，從 1 開始
    pub number: usize,
    pub name: String,
    pub expression: String,
}

/// 模型回覆依標題拆出的各段落
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationSections {
    pub optimized_dax: String,
    pub improvements: Vec<String>,
    pub edge_cases: Vec<String>,
    pub performance_notes: Vec<String>,
    pub raw_reply: String,
}

impl OptimizationSections {
    /// 回覆中至少找到一個已知標題
    pub fn is_structured(&self) -> bool {
        !self.optimized_dax.is_empty()
            || !self.improvements.is_empty()
            || !self.edge_cases.is_empty()
            || !self.performance_notes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizationOutcome {
    Optimized(OptimizationSections),
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizedMeasure {
    pub measure: MeasureRecord,
    pub outcome: OptimizationOutcome,
}

impl OptimizedMeasure {
    pub fn sections(&self) -> Option<&OptimizationSections> {
        match &self.outcome {
            OptimizationOutcome::Optimized(sections) => Some(sections),
            OptimizationOutcome::Failed { .. } => None,
        }
    }

    /// 報告中是否有可用的最佳化 DAX
    pub fn has_optimized_dax(&self) -> bool {
        self.sections()
            .map(|s| !s.optimized_dax.is_empty())
            .unwrap_or(false)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            OptimizationOutcome::Failed { reason } => Some(reason),
            OptimizationOutcome::Optimized(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: String,
    pub total: usize,
    pub optimized: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ReportFormat {
    Markdown,
    Text,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Text => "txt",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(ReportFormat::Markdown),
            "txt" | "text" => Some(ReportFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PromptStyle {
    /// 完整需求清單，要求固定格式的四個段落
    Detailed,
    Concise,
}

/// 重新解析報告得到的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedMeasure {
    pub number: usize,
    pub name: String,
    pub optimized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure() -> MeasureRecord {
        MeasureRecord {
            number: 1,
            name: "[Measure].[Total Sales]".to_string(),
            expression: "SUM(Sales[Amount])".to_string(),
        }
    }

    #[test]
    fn test_failed_outcome_has_no_optimized_dax() {
        let result = OptimizedMeasure {
            measure: measure(),
            outcome: OptimizationOutcome::Failed {
                reason: "timeout".to_string(),
            },
        };
        assert!(!result.has_optimized_dax());
        assert_eq!(result.failure_reason(), Some("timeout"));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = OptimizationOutcome::Failed {
            reason: "HTTP 500".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "HTTP 500");
    }

    #[test]
    fn test_report_format_from_extension() {
        assert_eq!(ReportFormat::from_extension("MD"), Some(ReportFormat::Markdown));
        assert_eq!(ReportFormat::from_extension("txt"), Some(ReportFormat::Text));
        assert_eq!(ReportFormat::from_extension("json"), None);
    }
}
