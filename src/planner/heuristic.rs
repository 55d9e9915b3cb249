//! Deterministic keyword planning, used when no model plan is available.

use crate::types::{Plan, ToolArgs, ToolDescriptor};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).expect("static regex"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\b\d+(?:\.\d+)?\b").expect("static regex"));
static ADD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:add|sum|plus)\b").expect("static regex"));
static ECHO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:echo|repeat|say)\b[\s:]*(.+)$").expect("static regex"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:what time|current time|time now|date today|today's date)\b").expect("static regex"));
static PING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bping\b").expect("static regex"));

const TITLE_TOOL: &str = "http.getTitle";
const ADD_TOOL: &str = "math.add";
const ECHO_TOOL: &str = "echo";
const TIME_TOOL: &str = "time.now";
const PING_TOOL: &str = "ping";

/// Map an utterance to a plan by keywords. Never fails; anything that
/// matches no rule plans no tool.
///
/// With a non-empty catalog a rule only fires when its tool is listed.
pub fn heuristic_plan(tools: &[ToolDescriptor], utterance: &str) -> Plan {
    let lower = utterance.to_lowercase();
    let available = |name: &str| tools.is_empty() || tools.iter().any(|t| t.name == name);

    if lower.contains("title") && available(TITLE_TOOL) {
        if let Some(url) = URL_RE.find(utterance).map(|m| clean_url(m.as_str())) {
            let mut args = ToolArgs::new();
            args.insert("url".into(), Value::String(url));
            return Plan::call(TITLE_TOOL, args);
        }
    }

    if ADD_RE.is_match(&lower) && available(ADD_TOOL) {
        let numbers: Vec<Number> = NUMBER_RE
            .find_iter(&lower)
            .filter_map(|m| to_number(m.as_str()))
            .take(2)
            .collect();
        if let [a, b] = numbers.as_slice() {
            let mut args = ToolArgs::new();
            args.insert("a".into(), Value::Number(a.clone()));
            args.insert("b".into(), Value::Number(b.clone()));
            return Plan::call(ADD_TOOL, args);
        }
    }

    if available(ECHO_TOOL) {
        if let Some(caps) = ECHO_RE.captures(utterance) {
            let mut args = ToolArgs::new();
            args.insert("message".into(), Value::String(caps[1].trim().to_string()));
            return Plan::call(ECHO_TOOL, args);
        }
    }

    if TIME_RE.is_match(&lower) && available(TIME_TOOL) {
        return Plan::call(TIME_TOOL, ToolArgs::new());
    }

    if PING_RE.is_match(&lower) && available(PING_TOOL) {
        return Plan::call(PING_TOOL, ToolArgs::new());
    }

    Plan::no_tool()
}

fn clean_url(raw: &str) -> String {
    raw.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']'))
        .to_string()
}

fn to_number(token: &str) -> Option<Number> {
    if let Ok(i) = token.parse::<i64>() {
        return Some(Number::from(i));
    }
    token.parse::<f64>().ok().and_then(Number::from_f64)
}
