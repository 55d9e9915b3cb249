//! Tool catalog, invocation and plan types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Argument object passed to a tool. Opaque to the client; only the remote
/// tool validates it.
pub type ToolArgs = Map<String, Value>;

/// A tool as received from the endpoint's `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique within a server, dotted namespaces by convention (`math.add`).
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema describing the tool's input.
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({ "type": "object" }),
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// A request to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub name: String,
    pub args: ToolArgs,
}

impl Invocation {
    pub fn new(name: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Planner output. `name == None` means "no suitable tool", which is a
/// normal outcome and distinct from a failed plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub name: Option<String>,
    #[serde(default)]
    pub args: ToolArgs,
}

impl Plan {
    pub fn call(name: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            name: Some(name.into()),
            args,
        }
    }

    pub fn no_tool() -> Self {
        Self {
            name: None,
            args: ToolArgs::new(),
        }
    }

    pub fn is_no_tool(&self) -> bool {
        self.name.is_none()
    }

    /// Coerce a JSON value into a plan.
    ///
    /// The `name` key must be present (string or null); a missing key is a
    /// failed plan, not "no tool". `args` may be absent or null, otherwise it
    /// must be an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = match obj.get("name")? {
            Value::Null => None,
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => return None,
        };
        let args = match obj.get("args") {
            None | Some(Value::Null) => ToolArgs::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return None,
        };
        Some(Self { name, args })
    }

    pub fn into_invocation(self) -> Option<Invocation> {
        let name = self.name?;
        Some(Invocation::new(name, self.args))
    }
}
