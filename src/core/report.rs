use crate::domain::model::{OptimizedMeasure, ReportFormat, ReportedMeasure};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

pub const NO_OPTIMIZATION: &str = "No optimization provided";

const MD_ORIGINAL_HEADING: &str = "### 📋 Original DAX";
const TEXT_ORIGINAL_HEADING: &str = "ORIGINAL DAX:";
const TEXT_RULE_WIDTH: usize = 80;

static MD_RECORD_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^## (\d+)\. (.+)$").expect("markdown heading pattern"));

static TEXT_RECORD_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(\d+) (.+)$").expect("text heading pattern"));

fn optimized_count(results: &[OptimizedMeasure]) -> usize {
    results.iter().filter(|r| r.has_optimized_dax()).count()
}

fn failed_count(results: &[OptimizedMeasure]) -> usize {
    results.iter().filter(|r| r.failure_reason().is_some()).count()
}

pub fn render_report(
    results: &[OptimizedMeasure],
    format: ReportFormat,
    generated_at: NaiveDateTime,
) -> String {
    match format {
        ReportFormat::Markdown => render_markdown(results, generated_at),
        ReportFormat::Text => render_text(results, generated_at),
    }
}

/// 目錄連結用的錨點
pub fn anchor_for(number: usize, name: &str) -> String {
    let safe = name.replace(['[', ']'], "").replace('.', "-");
    format!("{}-{}", number, safe.to_lowercase().replace(' ', "-"))
}

fn render_markdown(results: &[OptimizedMeasure], generated_at: NaiveDateTime) -> String {
    let mut out = String::new();

    out.push_str("# DAX Optimization Report\n\n");
    out.push_str(&format!(
        "**Generated:** {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!(
        "**Total Expressions:** {} | **Optimized:** {} | **Failed:** {}\n\n",
        results.len(),
        optimized_count(results),
        failed_count(results)
    ));
    out.push_str("---\n\n");

    out.push_str("## Table of Contents\n\n");
    for result in results {
        let measure = &result.measure;
        out.push_str(&format!(
            "{}. [{}](#{})\n",
            measure.number,
            measure.name,
            anchor_for(measure.number, &measure.name)
        ));
    }
    out.push_str("\n---\n\n");

    for result in results {
        let measure = &result.measure;
        out.push_str(&format!("## {}. {}\n\n", measure.number, measure.name));

        out.push_str(MD_ORIGINAL_HEADING);
        out.push_str("\n\n```dax\n");
        out.push_str(&measure.expression);
        out.push_str("\n```\n\n");

        out.push_str("### ✨ Optimized DAX\n\n");
        match result.sections() {
            Some(sections) if !sections.optimized_dax.is_empty() => {
                out.push_str("```dax\n");
                out.push_str(&sections.optimized_dax);
                out.push_str("\n```\n\n");
            }
            _ => out.push_str(&format!("*{}*\n\n", NO_OPTIMIZATION)),
        }

        if let Some(reason) = result.failure_reason() {
            out.push_str(&format!(
                "> ⚠️ Optimization request failed: {}\n\n",
                single_line(reason)
            ));
        }

        if let Some(sections) = result.sections() {
            if !sections.is_structured() && !sections.raw_reply.is_empty() {
                out.push_str("### 💬 Model Response\n\n");
                for line in sections.raw_reply.lines() {
                    if line.trim().is_empty() {
                        out.push_str(">\n");
                    } else {
                        out.push_str(&format!("> {}\n", line));
                    }
                }
                out.push('\n');
            }

            push_markdown_list(&mut out, "### 🔧 Improvements Made", &sections.improvements);
            push_markdown_list(&mut out, "### 🛡️ Edge Cases Handled", &sections.edge_cases);
            push_markdown_list(&mut out, "### ⚡ Performance Notes", &sections.performance_notes);
        }

        out.push_str("---\n\n");
    }

    out
}

fn push_markdown_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(heading);
    out.push_str("\n\n");
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

fn render_text(results: &[OptimizedMeasure], generated_at: NaiveDateTime) -> String {
    let heavy_rule = "=".repeat(TEXT_RULE_WIDTH);
    let light_rule = "-".repeat(TEXT_RULE_WIDTH);
    let mut out = String::new();

    out.push_str("DAX OPTIMIZATION REPORT\n");
    out.push_str(&format!(
        "Generated: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!(
        "Total Expressions: {} | Optimized: {} | Failed: {}\n",
        results.len(),
        optimized_count(results),
        failed_count(results)
    ));
    out.push_str(&heavy_rule);
    out.push_str("\n\n");

    for result in results {
        let measure = &result.measure;
        out.push_str(&format!("#{} {}\n", measure.number, measure.name));
        out.push_str(&light_rule);
        out.push('\n');

        out.push_str(TEXT_ORIGINAL_HEADING);
        out.push('\n');
        push_indented(&mut out, &measure.expression);
        out.push('\n');

        match result.sections() {
            Some(sections) if !sections.optimized_dax.is_empty() => {
                out.push_str("OPTIMIZED DAX:\n");
                push_indented(&mut out, &sections.optimized_dax);
                out.push('\n');
            }
            _ => {
                out.push_str(NO_OPTIMIZATION);
                out.push('\n');
            }
        }

        if let Some(reason) = result.failure_reason() {
            out.push_str(&format!("FAILED: {}\n", single_line(reason)));
        }

        if let Some(sections) = result.sections() {
            if !sections.is_structured() && !sections.raw_reply.is_empty() {
                out.push_str("MODEL RESPONSE:\n");
                push_indented(&mut out, &sections.raw_reply);
                out.push('\n');
            }

            push_text_list(&mut out, "IMPROVEMENTS MADE:", &sections.improvements);
            push_text_list(&mut out, "EDGE CASES HANDLED:", &sections.edge_cases);
            push_text_list(&mut out, "PERFORMANCE NOTES:", &sections.performance_notes);
        }

        out.push('\n');
        out.push_str(&heavy_rule);
        out.push_str("\n\n");
    }

    out
}

fn push_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
}

fn push_text_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(heading);
    out.push('\n');
    for item in items {
        out.push_str(&format!("  - {}\n", item));
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 從已輸出的報告讀回每個 measure 的編號、名稱與是否有最佳化結果
pub fn parse_report(content: &str, format: ReportFormat) -> Vec<ReportedMeasure> {
    let lines: Vec<&str> = content.lines().collect();
    let mut reported: Vec<ReportedMeasure> = Vec::new();
    let mut in_fence = false;

    let heading: &Regex = match format {
        ReportFormat::Markdown => &*MD_RECORD_HEADING,
        ReportFormat::Text => &*TEXT_RECORD_HEADING,
    };
    let no_optimization_line = match format {
        ReportFormat::Markdown => format!("*{}*", NO_OPTIMIZATION),
        ReportFormat::Text => NO_OPTIMIZATION.to_string(),
    };

    for (index, line) in lines.iter().enumerate() {
        if format == ReportFormat::Markdown && line.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some(caps) = heading.captures(line) {
            let number: usize = caps[1].parse().unwrap_or(0);
            if number == reported.len() + 1 && confirms_record(format, &lines, index) {
                reported.push(ReportedMeasure {
                    number,
                    name: caps[2].to_string(),
                    optimized: true,
                });
                continue;
            }
        }

        if *line == no_optimization_line {
            if let Some(last) = reported.last_mut() {
                last.optimized = false;
            }
        }
    }

    reported
}

fn confirms_record(format: ReportFormat, lines: &[&str], heading_index: usize) -> bool {
    match format {
        ReportFormat::Markdown => confirms_markdown_record(lines, heading_index),
        ReportFormat::Text => confirms_text_record(lines, heading_index),
    }
}

fn confirms_markdown_record(lines: &[&str], heading_index: usize) -> bool {
    lines[heading_index + 1..]
        .iter()
        .find(|line| !line.trim().is_empty())
        .map(|line| *line == MD_ORIGINAL_HEADING)
        .unwrap_or(false)
}

fn confirms_text_record(lines: &[&str], heading_index: usize) -> bool {
    let underline = lines.get(heading_index + 1);
    let original = lines.get(heading_index + 2);
    matches!(
        (underline, original),
        (Some(rule), Some(heading))
            if rule.len() == TEXT_RULE_WIDTH
                && rule.chars().all(|c| c == '-')
                && *heading == TEXT_ORIGINAL_HEADING
    )
}
