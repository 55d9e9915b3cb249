//! Prompt construction and response coercion for model-backed planning.

use crate::types::{Plan, ToolDescriptor};
use serde_json::Value;

pub const PLAN_SYSTEM_PROMPT: &str = "You route user requests to tools. \
Choose the single most relevant tool from the list and produce its arguments. \
Reply with strict JSON only, exactly {\"name\": string|null, \"args\": object}, and nothing else. \
You may infer a missing argument when a safe default is obvious. \
If no tool fits the request, reply {\"name\": null, \"args\": {}} instead of guessing.";

/// Render the catalog and the request as the user half of the prompt.
pub fn build_plan_prompt(tools: &[ToolDescriptor], utterance: &str) -> String {
    let mut out = String::from("Tools:\n");
    if tools.is_empty() {
        out.push_str("(none)\n");
    }
    for tool in tools {
        out.push_str(&format!("- {}", tool.name));
        if !tool.description.is_empty() {
            out.push_str(&format!(": {}", tool.description));
        }
        out.push('\n');
        if !tool.input_schema.is_null() {
            out.push_str(&format!("  input schema: {}\n", tool.input_schema));
        }
    }
    out.push_str("\nUser request: ");
    out.push_str(utterance);
    out
}

/// Coerce model output into a plan.
///
/// Tries the whole text as JSON first, then the span from the first `{` to
/// the last `}`. `None` means the plan failed, which is not the same as a
/// plan naming no tool.
pub fn parse_plan_text(text: &str) -> Option<Plan> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(plan) = Plan::from_value(&value) {
            return Some(plan);
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    let value = serde_json::from_str::<Value>(&trimmed[start..=end]).ok()?;
    Plan::from_value(&value)
}
