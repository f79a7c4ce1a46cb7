use dax_optimizer::core::engine::{preview_measures, render_preview};
use dax_optimizer::core::report::parse_report;
use dax_optimizer::{run_optimizer, OptimizerConfig, OptimizerError, ReportFormat};
use httpmock::prelude::*;
use std::time::Duration;
use tempfile::TempDir;

const MEASURES: &str = "\
DAX MEASURES - Folder1
--------------------------------------------------
[Measure].[A]

SUM(T[A])
--------------------------------------------------
[Measure].[B]

SUM(T[B])
--------------------------------------------------
[Measure].[C]

SUM(T[C])
--------------------------------------------------
";

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

const STRUCTURED_REPLY: &str = "\
OPTIMIZED DAX:
```dax
// 加總
SUM(T[X])
```

IMPROVEMENTS MADE:
- Simplified aggregation

EDGE CASES HANDLED:
- Empty table returns BLANK()

PERFORMANCE NOTES:
- Single storage engine scan
";

/// 建立暫存輸入檔與指向 mock server 的設定
fn setup(temp_dir: &TempDir, server: &MockServer, output: &str, token_env: &str) -> OptimizerConfig {
    let input_path = temp_dir.path().join("measures.txt");
    std::fs::write(&input_path, MEASURES).unwrap();
    let output_path = temp_dir.path().join(output);

    let mut config = OptimizerConfig::new(
        input_path.to_str().unwrap(),
        Some(output_path.to_str().unwrap()),
    );
    config.endpoint = server.base_url();
    config.token_env = token_env.to_string();
    config.request_delay = Duration::ZERO;
    config
}

#[tokio::test]
async fn test_end_to_end_markdown_report() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("Authorization", "Bearer e2e-token");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion(STRUCTURED_REPLY));
    });

    std::env::set_var("DAX_OPTIMIZER_E2E_TOKEN", "e2e-token");
    let config = setup(&temp_dir, &server, "report.md", "DAX_OPTIMIZER_E2E_TOKEN");
    let output_path = config.output_path.clone();

    let summary = run_optimizer(config, false).await.unwrap();

    api_mock.assert_hits(3);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.optimized, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.output_path, output_path);

    let report = std::fs::read_to_string(&output_path).unwrap();
    assert!(report.starts_with("# DAX Optimization Report"));
    assert!(report.contains("## 2. [Measure].[B]"));
    assert!(report.contains("```dax\n// 加總\nSUM(T[X])\n```"));
    assert!(report.contains("### 🛡️ Edge Cases Handled\n\n- Empty table returns BLANK()"));

    let reported = parse_report(&report, ReportFormat::Markdown);
    assert_eq!(reported.len(), 3);
    assert!(reported.iter().all(|r| r.optimized));

    std::env::remove_var("DAX_OPTIMIZER_E2E_TOKEN");
}

#[tokio::test]
async fn test_failed_request_is_flagged_and_processing_continues() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let ok_a = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_contains("[Measure].[A]");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion(STRUCTURED_REPLY));
    });
    let failing_b = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_contains("[Measure].[B]");
        then.status(500).body("upstream error");
    });
    let ok_c = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_contains("[Measure].[C]");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion(STRUCTURED_REPLY));
    });

    std::env::set_var("DAX_OPTIMIZER_PARTIAL_TOKEN", "partial-token");
    let config = setup(&temp_dir, &server, "report.md", "DAX_OPTIMIZER_PARTIAL_TOKEN");
    let output_path = config.output_path.clone();

    let summary = run_optimizer(config, false).await.unwrap();

    ok_a.assert_hits(1);
    failing_b.assert_hits(1);
    ok_c.assert_hits(1);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.optimized, 2);
    assert_eq!(summary.failed, 1);

    let report = std::fs::read_to_string(&output_path).unwrap();
    assert!(report.contains("*No optimization provided*"));
    assert!(report.contains("> ⚠️ Optimization request failed: API returned HTTP 500"));

    let reported = parse_report(&report, ReportFormat::Markdown);
    assert_eq!(reported.len(), 3);
    assert!(reported[0].optimized);
    assert!(!reported[1].optimized);
    assert!(reported[2].optimized);

    std::env::remove_var("DAX_OPTIMIZER_PARTIAL_TOKEN");
}

#[tokio::test]
async fn test_missing_credential_fails_before_any_request() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion(STRUCTURED_REPLY));
    });

    std::env::remove_var("DAX_OPTIMIZER_NEVER_SET_TOKEN");
    let config = setup(&temp_dir, &server, "report.md", "DAX_OPTIMIZER_NEVER_SET_TOKEN");
    let output_path = config.output_path.clone();

    let err = run_optimizer(config, false).await.unwrap_err();

    api_mock.assert_hits(0);
    assert!(matches!(err, OptimizerError::MissingCredentialError { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(!std::path::Path::new(&output_path).exists());
}

#[tokio::test]
async fn test_missing_input_file_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200);
    });

    std::env::set_var("DAX_OPTIMIZER_MISSING_INPUT_TOKEN", "token");
    let mut config = setup(&temp_dir, &server, "report.md", "DAX_OPTIMIZER_MISSING_INPUT_TOKEN");
    config.input_path = temp_dir
        .path()
        .join("does_not_exist.txt")
        .to_string_lossy()
        .into_owned();

    let err = run_optimizer(config, false).await.unwrap_err();

    api_mock.assert_hits(0);
    assert!(matches!(err, OptimizerError::InputNotFoundError { .. }));
    assert_eq!(err.exit_code(), 2);

    std::env::remove_var("DAX_OPTIMIZER_MISSING_INPUT_TOKEN");
}

#[tokio::test]
async fn test_end_to_end_text_report_with_unstructured_reply() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion("This measure is already optimal."));
    });

    std::env::set_var("DAX_OPTIMIZER_TEXT_TOKEN", "text-token");
    let mut config = setup(&temp_dir, &server, "report.txt", "DAX_OPTIMIZER_TEXT_TOKEN");
    config.format = ReportFormat::Text;
    let output_path = config.output_path.clone();

    let summary = run_optimizer(config, false).await.unwrap();

    api_mock.assert_hits(3);
    assert_eq!(summary.optimized, 0);
    assert_eq!(summary.failed, 0);

    let report = std::fs::read_to_string(&output_path).unwrap();
    assert!(report.contains("MODEL RESPONSE:\n    This measure is already optimal."));
    assert_eq!(parse_report(&report, ReportFormat::Text).len(), 3);

    std::env::remove_var("DAX_OPTIMIZER_TEXT_TOKEN");
}

#[tokio::test]
async fn test_dry_run_lists_measures_without_credential_or_network() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion(STRUCTURED_REPLY));
    });

    std::env::remove_var("DAX_OPTIMIZER_DRY_RUN_UNSET_TOKEN");
    let config = setup(&temp_dir, &server, "report.md", "DAX_OPTIMIZER_DRY_RUN_UNSET_TOKEN");

    let measures = preview_measures(&config).await.unwrap();
    let preview = render_preview(&measures, &config.output_path);

    api_mock.assert_hits(0);
    assert_eq!(measures.len(), 3);
    assert_eq!(measures[2].name, "[Measure].[C]");
    assert!(preview.contains("  2. [Measure].[B] (1 line(s))"));
    assert!(preview.contains("✅ Found 3 DAX expression(s)"));
    assert!(!std::path::Path::new(&config.output_path).exists());
}

#[tokio::test]
async fn test_dry_run_reports_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let mut config = setup(&temp_dir, &server, "report.md", "DAX_OPTIMIZER_DRY_RUN_UNSET_TOKEN");
    config.input_path = temp_dir
        .path()
        .join("absent.txt")
        .to_string_lossy()
        .into_owned();

    let err = preview_measures(&config).await.unwrap_err();
    assert!(matches!(err, OptimizerError::InputNotFoundError { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_resolves_toml_config_file() {
    use clap::Parser;
    use dax_optimizer::CliConfig;
    use dax_optimizer::PromptStyle;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("optimizer.toml");
    std::fs::write(
        &config_path,
        "[api]\nmodel = \"gpt-4o-mini\"\n\n[run]\nprompt_style = \"concise\"\nrequest_delay_ms = 10\n",
    )
    .unwrap();

    let cli = CliConfig::parse_from([
        "dax-optimizer",
        "measures.txt",
        "--config",
        config_path.to_str().unwrap(),
        "--delay-ms",
        "0",
    ]);
    let config = cli.resolve().unwrap();

    assert_eq!(config.model, "gpt-4o-mini");
    assert_eq!(config.prompt_style, PromptStyle::Concise);
    assert_eq!(config.request_delay, Duration::ZERO);
    assert_eq!(config.output_path, "measures_optimized.md");
}
