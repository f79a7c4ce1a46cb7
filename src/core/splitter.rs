//! 將輸入檔切成個別的 DAX measure。
//!
//! 預設格式：
//!
//! ```text
//! DAX MEASURES - Folder1
//! ------------------------------
//! [Measure].[Patient State]
//!
//! IF(ISFILTERED(Patient[State]), SELECTEDVALUE(Patient[State]), "All")
//! ------------------------------
//! ```
//!
//! 若整個檔案找不到 measure 名稱行，改以空白行分段。

use crate::domain::model::MeasureRecord;
use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-=]{10,}$").expect("separator pattern"));

static MEASURE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[^\[\]]+\](?:\.\[[^\[\]]+\])*$").expect("measure name pattern")
});

static NAMED_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][^=:<>()\[\]]*?)\s*:?=\s*(.*)$").expect("definition pattern")
});

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?i:DAX MEASURES)\b|Folder\d*\b)").expect("section header pattern")
});

const DAX_KEYWORDS: [&str; 5] = ["VAR", "RETURN", "EVALUATE", "DEFINE", "MEASURE"];

pub fn is_separator(trimmed: &str) -> bool {
    SEPARATOR.is_match(trimmed)
}

/// 匯出清單的分組標題，例如 `DAX MEASURES - Folder1` 或 `Folder: Finance`
pub fn is_section_header(trimmed: &str) -> bool {
    SECTION_HEADER.is_match(trimmed)
}

/// measure 內容中只有 `DAX MEASURES` 開頭的行會結束目前的 measure
fn is_listing_banner(trimmed: &str) -> bool {
    trimmed
        .get(..12)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("DAX MEASURES"))
}

pub fn is_measure_name(trimmed: &str) -> bool {
    MEASURE_NAME.is_match(trimmed)
}

/// 依出現順序回傳 measure，編號從 1 開始
pub fn split_measures(content: &str) -> Vec<MeasureRecord> {
    let mut blocks = split_by_markers(content);
    if blocks.is_empty() {
        tracing::debug!("No measure name markers found, falling back to blank-line blocks");
        blocks = split_by_blank_lines(content);
    }

    blocks
        .into_iter()
        .enumerate()
        .map(|(index, (name, expression))| MeasureRecord {
            number: index + 1,
            name,
            expression,
        })
        .collect()
}

struct PendingMeasure<'a> {
    name: String,
    lines: Vec<&'a str>,
}

fn flush(pending: Option<PendingMeasure<'_>>, blocks: &mut Vec<(String, String)>) {
    if let Some(pending) = pending {
        let expression = normalize_expression(&pending.lines);
        if expression.is_empty() {
            tracing::debug!("Skipping measure without expression: {}", pending.name);
        } else {
            blocks.push((pending.name, expression));
        }
    }
}

fn split_by_markers(content: &str) -> Vec<(String, String)> {
    let mut blocks = Vec::new();
    let mut current: Option<PendingMeasure> = None;

    for line in content.lines() {
        let trimmed = line.trim();

        if is_separator(trimmed) {
            flush(current.take(), &mut blocks);
        } else if is_section_header(trimmed) && (current.is_none() || is_listing_banner(trimmed)) {
            flush(current.take(), &mut blocks);
        } else if is_measure_name(trimmed) {
            flush(current.take(), &mut blocks);
            current = Some(PendingMeasure {
                name: trimmed.to_string(),
                lines: Vec::new(),
            });
        } else if let Some(pending) = current.as_mut() {
            pending.lines.push(line);
        }
    }
    flush(current, &mut blocks);

    blocks
}

fn split_by_blank_lines(content: &str) -> Vec<(String, String)> {
    let mut raw_blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_separator(trimmed) {
            if !current.is_empty() {
                raw_blocks.push(std::mem::take(&mut current));
            }
        } else if !(current.is_empty() && is_section_header(trimmed)) {
            current.push(line);
        }
    }
    if !current.is_empty() {
        raw_blocks.push(current);
    }

    let mut blocks = Vec::new();
    for lines in raw_blocks {
        let first = lines[0].trim();
        let definition = NAMED_DEFINITION
            .captures(first)
            .filter(|caps| !is_dax_keyword(&caps[1]));

        match definition {
            Some(caps) => {
                let name = caps[1].trim().to_string();
                let mut body: Vec<&str> = Vec::with_capacity(lines.len());
                let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                if !rest.trim().is_empty() {
                    body.push(rest);
                }
                body.extend_from_slice(&lines[1..]);
                let expression = normalize_expression(&body);
                if !expression.is_empty() {
                    blocks.push((name, expression));
                }
            }
            None => {
                let name = format!("Measure {}", blocks.len() + 1);
                blocks.push((name, normalize_expression(&lines)));
            }
        }
    }

    blocks
}

fn is_dax_keyword(candidate: &str) -> bool {
    let first_word = candidate.split_whitespace().next().unwrap_or("");
    DAX_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(first_word))
}

/// 去掉行尾空白、前後空行以及共同縮排
fn normalize_expression(lines: &[&str]) -> String {
    let lines: Vec<&str> = lines.iter().map(|line| line.trim_end()).collect();

    let (Some(start), Some(end)) = (
        lines.iter().position(|line| !line.is_empty()),
        lines.iter().rposition(|line| !line.is_empty()),
    ) else {
        return String::new();
    };
    let body = &lines[start..=end];

    let indent = body
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    body.iter()
        .map(|line| {
            if line.is_empty() {
                ""
            } else {
                line.get(indent..).unwrap_or_else(|| line.trim_start())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
