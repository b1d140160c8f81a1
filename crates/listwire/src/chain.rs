//! # Error Chain Codec
//!
//! Converts arbitrary failure values into a transmissible, order-preserving
//! cause chain and reconstructs them on the receiving side.
//!
//! ## Invariants
//!
//! - A chain is never empty; every constructor guarantees at least one node.
//! - Node order is outermost-first: the first node is the short, user-facing
//!   message, the last is the root cause.
//! - Only message text, chain structure, and the optional diagnostic trace
//!   survive serialization. The original failure's type does not.

use serde::{Deserialize, Serialize};

/// One link in a cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNode {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorNode {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }
}

/// An ordered sequence of cause messages, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorChain {
    nodes: Vec<ErrorNode>,
}

impl ErrorChain {
    /// A single-node chain: a leaf error with no further cause.
    pub fn leaf(message: impl Into<String>) -> Self {
        Self {
            nodes: vec![ErrorNode::new(message)],
        }
    }

    /// Flattens a standard error and its `source()` chain, outermost first.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut nodes = vec![ErrorNode::new(err.to_string())];
        let mut cause = err.source();
        while let Some(inner) = cause {
            nodes.push(ErrorNode::new(inner.to_string()));
            cause = inner.source();
        }
        Self { nodes }
    }

    /// Flattens an `anyhow` error: one node per context layer down to the
    /// root cause.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let nodes = err.chain().map(|e| ErrorNode::new(e.to_string())).collect();
        Self { nodes }
    }

    /// Normalizes a loose value that is not already error-shaped.
    ///
    /// Precedence:
    /// 1. an object carrying `msg`/`message` (optionally `stack` and a nested
    ///    `source`) is flattened into message + cause nodes;
    /// 2. a generic object's scalar fields are joined into a readable summary;
    /// 3. the value's display form, unless that would be useless, in which
    ///    case a placeholder naming the value's type is substituted.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut nodes = Vec::new();
        collect_value_nodes(value, &mut nodes);
        if nodes.is_empty() {
            nodes.push(ErrorNode::new(placeholder(value)));
        }
        Self { nodes }
    }

    /// The outermost node: the short, user-facing message.
    pub fn first(&self) -> &ErrorNode {
        // non-empty by construction
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[ErrorNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; chains hold at least one node by construction.
    pub fn is_empty(&self) -> bool {
        debug_assert!(!self.nodes.is_empty());
        false
    }
}

/// Walks a `{msg, source}` tree, falling back to summary/display forms.
fn collect_value_nodes(value: &serde_json::Value, nodes: &mut Vec<ErrorNode>) {
    match value {
        serde_json::Value::Object(map) => {
            let message = map
                .get("msg")
                .or_else(|| map.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_owned);

            match message {
                Some(message) => {
                    let stack = map.get("stack").and_then(|s| s.as_str()).map(str::to_owned);
                    nodes.push(ErrorNode { message, stack });
                    if let Some(source) = map.get("source").or_else(|| map.get("cause")) {
                        collect_value_nodes(source, nodes);
                    }
                }
                None => {
                    let summary = summarize_object(map);
                    if !summary.is_empty() {
                        nodes.push(ErrorNode::new(summary));
                    }
                }
            }
        }
        serde_json::Value::String(s) if !s.is_empty() => nodes.push(ErrorNode::new(s.clone())),
        serde_json::Value::String(_) | serde_json::Value::Null => {}
        other => nodes.push(ErrorNode::new(other.to_string())),
    }
}

/// Joins an object's scalar fields into `key: value` pairs.
///
/// Nested collections are skipped; they rarely read as a message and the
/// interesting detail is almost always in the flat fields.
fn summarize_object(map: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut parts = Vec::new();
    for (key, value) in map {
        match value {
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => continue,
            serde_json::Value::String(s) => parts.push(format!("{}: {}", key, s)),
            other => parts.push(format!("{}: {}", key, other)),
        }
    }
    parts.join(", ")
}

/// A diagnostic stand-in naming the value's type, for values whose display
/// form carries no information.
fn placeholder(value: &serde_json::Value) -> String {
    let kind = match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    };
    format!("non-error failure value of type {}", kind)
}

/// A failure received from the other side of the boundary.
///
/// `Display` is the first chain entry only, suitable for inline user-facing
/// display. [`RemoteError::detail`] renders the full ordered chain for
/// diagnostic logs; callers should never show that text to end users raw.
#[derive(Debug, Clone)]
pub struct RemoteError {
    chain: ErrorChain,
}

impl RemoteError {
    pub fn new(chain: ErrorChain) -> Self {
        Self { chain }
    }

    /// The short, user-facing message.
    pub fn message(&self) -> &str {
        &self.chain.first().message
    }

    /// The full ordered cause chain.
    pub fn chain(&self) -> &ErrorChain {
        &self.chain
    }

    /// Renders the whole chain for diagnostic logging.
    pub fn detail(&self) -> String {
        let mut out = String::new();
        for (depth, node) in self.chain.nodes().iter().enumerate() {
            if depth == 0 {
                out.push_str(&node.message);
            } else {
                out.push_str("\n  caused by: ");
                out.push_str(&node.message);
            }
            if let Some(stack) = &node.stack {
                out.push('\n');
                out.push_str(stack);
            }
        }
        out
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for RemoteError {}
