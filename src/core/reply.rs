//! 解析模型回覆。模型不一定照格式回答，這裡只做盡力而為的拆段。

use crate::core::prompt::{
    EDGE_CASES_HEADER, IMPROVEMENTS_HEADER, OPTIMIZED_DAX_HEADER, PERFORMANCE_HEADER,
};
use crate::domain::model::OptimizationSections;
use regex::Regex;
use std::sync::LazyLock;

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").expect("numbered item pattern"));

/// 標題前後只允許 markdown 裝飾（`#`、`*`、`_`、`>`），內容從原始行取出
static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    let labels = HEADERS
        .iter()
        .map(|(label, _)| regex::escape(label.trim_end_matches(':')))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?i)^[\s#>*_]*(?:\d+[.)]\s*)?[*_]*({})[*_]*\s*:[*_]*\s*(.*)$",
        labels
    ))
    .expect("header line pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Optimized,
    Improvements,
    EdgeCases,
    Performance,
}

const HEADERS: [(&str, Section); 4] = [
    (OPTIMIZED_DAX_HEADER, Section::Optimized),
    (IMPROVEMENTS_HEADER, Section::Improvements),
    (EDGE_CASES_HEADER, Section::EdgeCases),
    (PERFORMANCE_HEADER, Section::Performance),
];

/// 判斷是否為段落標題，回傳段落與標題後同一行的文字
fn match_header(line: &str) -> Option<(Section, String)> {
    let caps = HEADER_LINE.captures(line)?;
    let label = caps[1].to_ascii_uppercase();
    let rest = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();

    HEADERS
        .iter()
        .find(|(header, _)| header.trim_end_matches(':') == label)
        .map(|(_, section)| (*section, rest))
}

pub fn parse_reply(reply: &str) -> OptimizationSections {
    let mut buffers: [Vec<String>; 4] = Default::default();
    let mut current: Option<Section> = None;

    for line in reply.lines() {
        if let Some((section, rest)) = match_header(line) {
            current = Some(section);
            if !rest.is_empty() {
                buffers[section as usize].push(rest);
            }
        } else if let Some(section) = current {
            buffers[section as usize].push(line.trim_end().to_string());
        }
    }

    let [optimized, improvements, edge_cases, performance] = buffers;

    OptimizationSections {
        optimized_dax: extract_code(&optimized.join("\n")),
        improvements: parse_list_items(&improvements.join("\n")),
        edge_cases: parse_list_items(&edge_cases.join("\n")),
        performance_notes: parse_list_items(&performance.join("\n")),
        raw_reply: reply.trim().to_string(),
    }
}

/// 有 code fence 時只取第一個區塊的內容
fn extract_code(text: &str) -> String {
    let mut inside = false;
    let mut fenced = Vec::new();
    let mut found_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            if inside {
                break;
            }
            inside = true;
            found_fence = true;
            continue;
        }
        if inside {
            fenced.push(line);
        }
    }

    if found_fence {
        fenced.join("\n").trim_matches('\n').trim_end().to_string()
    } else {
        text.trim().to_string()
    }
}

/// 以項目符號切分清單；沒有符號的行接在前一項後面
pub fn parse_list_items(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let bullet = ["- ", "* ", "• "]
            .iter()
            .find_map(|marker| trimmed.strip_prefix(marker))
            .map(str::to_string)
            .or_else(|| {
                NUMBERED_ITEM
                    .find(trimmed)
                    .map(|m| trimmed[m.end()..].to_string())
            });

        if let Some(item) = bullet {
            items.push(item.trim().to_string());
        } else if let Some(last) = items.last_mut() {
            last.push(' ');
            last.push_str(trimmed);
        } else {
            items.push(trimmed.to_string());
        }
    }

    items.retain(|item| !item.is_empty());
    items
}
