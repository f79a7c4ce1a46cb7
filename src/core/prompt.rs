use crate::domain::model::{MeasureRecord, PromptStyle};
use crate::domain::ports::{ChatMessage, CompletionRequest};

pub const OPTIMIZED_DAX_HEADER: &str = "OPTIMIZED DAX:";
pub const IMPROVEMENTS_HEADER: &str = "IMPROVEMENTS MADE:";
pub const EDGE_CASES_HEADER: &str = "EDGE CASES HANDLED:";
pub const PERFORMANCE_HEADER: &str = "PERFORMANCE NOTES:";

const DETAILED_SYSTEM_PROMPT: &str = "You are an expert DAX optimization specialist with deep \
knowledge of Power BI semantic models, performance optimization, and best practices. You focus \
on creating efficient, maintainable, and robust DAX expressions.";

const CONCISE_SYSTEM_PROMPT: &str =
    "You are a DAX expert. Optimize DAX expressions for performance and maintainability.";

const DETAILED_INSTRUCTION: &str = "Please review and optimize the following DAX expression.

Requirements:
1. The expression must be **efficient** and suitable for use in large semantic models with many visuals.
2. It must return a **scalar value** (text or numeric), not a table or mixed types.
3. If the logic involves filters:
   - Use `ISFILTERED` to detect whether a column is filtered.
   - Use `HASONEVALUE` or `SELECTEDVALUE` to detect single selections.
   - Use `CONCATENATEX` to return multiple selected values as a comma-separated string.
4. Avoid using `VALUES` directly in conditional logic unless wrapped in a scalar function.
5. Ensure compatibility with visuals such as cards, tables, matrix, and tooltips.
6. Add inline comments for clarity and maintainability.
7. Suggest performance improvements if applicable, especially for large datasets or complex filter contexts.

This expression is part of a broader model with 100+ DAX measures and visualizations, so the solution must be **generalizable**, **robust**, and aligned with best practices.";

impl PromptStyle {
    pub fn temperature(&self) -> f32 {
        match self {
            PromptStyle::Detailed => 0.2,
            PromptStyle::Concise => 0.3,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            PromptStyle::Detailed => 1500,
            PromptStyle::Concise => 1000,
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            PromptStyle::Detailed => DETAILED_SYSTEM_PROMPT,
            PromptStyle::Concise => CONCISE_SYSTEM_PROMPT,
        }
    }
}

fn response_format() -> String {
    format!(
        "{}\n[Your optimized DAX code with inline comments]\n\n\
         {}\n[Bullet points of specific changes]\n\n\
         {}\n[Bullet points of edge cases addressed]\n\n\
         {}\n[Any performance considerations or warnings]",
        OPTIMIZED_DAX_HEADER, IMPROVEMENTS_HEADER, EDGE_CASES_HEADER, PERFORMANCE_HEADER
    )
}

pub fn build_user_prompt(style: PromptStyle, measure: &MeasureRecord) -> String {
    match style {
        PromptStyle::Detailed => format!(
            "{}\n\nMeasure Name: {}\n\nDAX Expression:\n{}\n\n\
             Provide your response in this exact format:\n\n{}\n",
            DETAILED_INSTRUCTION,
            measure.name,
            measure.expression,
            response_format()
        ),
        PromptStyle::Concise => format!(
            "Optimize this DAX expression:\n\n{}\n\n{}\n\n\
             Provide:\n1. Optimized version with comments\n2. What you improved\n\
             3. Edge cases handled\n\nUse these section headers:\n\n{}\n",
            measure.name,
            measure.expression,
            response_format()
        ),
    }
}

pub fn build_request(style: PromptStyle, measure: &MeasureRecord) -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            ChatMessage::system(style.system_prompt()),
            ChatMessage::user(build_user_prompt(style, measure)),
        ],
        temperature: style.temperature(),
        max_tokens: style.max_tokens(),
    }
}
