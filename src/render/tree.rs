//! Render instruction types
//!
//! The backend streams [`ForwardMsg`]s. Each `delta` carries one [`Node`]
//! addressed by a path of child indices from the root block.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-node layout hints
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Requested width in pixels, capped at the space available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Column weight inside a horizontal block (default 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Direction a block lays out its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockLayout {
    #[default]
    Vertical,
    /// Children are columns sharing the block's width
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub layout: BlockLayout,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Block(Block),
    /// A leaf, decoded lazily so one bad leaf cannot reject the whole delta
    Element(Value),
}

/// One node of a render instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub metadata: NodeMetadata,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn element(raw: Value) -> Self {
        Self {
            metadata: NodeMetadata::default(),
            kind: NodeKind::Element(raw),
        }
    }

    pub fn block(layout: BlockLayout, children: Vec<Node>) -> Self {
        Self {
            metadata: NodeMetadata::default(),
            kind: NodeKind::Block(Block { layout, children }),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.metadata.weight = Some(weight);
        self
    }
}

/// A node to place at `path`, produced by run `run_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderInstruction {
    pub run_id: String,
    #[serde(default)]
    pub path: Vec<usize>,
    pub node: Node,
}

/// How a script run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptFinishedStatus {
    /// Ran to completion; elements it did not produce are removed
    Success,
    /// Failed before producing output; the previous tree stays
    CompileError,
    /// Interrupted by a rerun; the next run will replace the tree
    EarlyForRerun,
}

/// Messages from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForwardMsg {
    ScriptStarted {
        run_id: String,
    },
    Delta(RenderInstruction),
    ScriptFinished {
        status: ScriptFinishedStatus,
    },
    /// Declare a custom component by name
    RegisterComponent {
        name: String,
        #[serde(default)]
        path: Option<std::path::PathBuf>,
        #[serde(default)]
        url: Option<String>,
    },
}
