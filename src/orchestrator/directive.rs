//! Explicit `/tool <name> <json>` directives.

use crate::types::{Invocation, ToolArgs};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*/tool\s+(\S+)(?:\s+([\s\S]*))?$").expect("static regex"));

/// A parsed directive. `raw_args` keeps the text after the name so callers
/// can show what was typed even when it did not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub args: ToolArgs,
    pub raw_args: String,
    /// False when a non-empty remainder was not a JSON object.
    pub args_parsed: bool,
}

impl Directive {
    pub fn into_invocation(self) -> Invocation {
        Invocation::new(self.name, self.args)
    }
}

/// Parse `/tool <name> [<json-object>]`.
///
/// A remainder that is not a JSON object yields empty arguments rather than
/// an error; the remote tool rejects the call if it needed them.
pub fn parse_directive(text: &str) -> Option<Directive> {
    let caps = DIRECTIVE_RE.captures(text)?;
    let name = caps.get(1)?.as_str().to_string();
    let raw_args = caps
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let (args, args_parsed) = if raw_args.is_empty() {
        (ToolArgs::new(), true)
    } else {
        match serde_json::from_str::<Value>(&raw_args) {
            Ok(Value::Object(map)) => (map, true),
            _ => (ToolArgs::new(), false),
        }
    };

    Some(Directive {
        name,
        args,
        raw_args,
        args_parsed,
    })
}
