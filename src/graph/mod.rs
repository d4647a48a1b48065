//! A minimal append-only computation graph and its in-process executor.
//!
//! Graphs are arenas of [`Node`]s addressed by [`Output`] handles. A node can
//! only consume outputs of nodes appended before it, so arena order is always
//! a valid evaluation order. Nodes are never removed or mutated.

mod builder;
mod ops;
mod session;
mod tensor;

use std::collections::HashMap;
use std::fmt;

pub use builder::{ConstValue, GraphBuilder};
pub use session::{Runner, Session};
pub use tensor::{DataType, Element, Tensor};

use crate::error::{Error, Result};

/// Operation performed by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    Const,
    Placeholder,
    Cast,
    ExpandDims,
    ResizeBilinear,
    Sub,
    Div,
    Identity,
}

impl OpType {
    /// Default node name for operations appended without an explicit name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Const => "Const",
            Self::Placeholder => "Placeholder",
            Self::Cast => "Cast",
            Self::ExpandDims => "ExpandDims",
            Self::ResizeBilinear => "ResizeBilinear",
            Self::Sub => "Sub",
            Self::Div => "Div",
            Self::Identity => "Identity",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Node attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Type(DataType),
    Shape(Vec<usize>),
    Tensor(Tensor),
}

/// Handle to the sole output of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Output(usize);

impl Output {
    /// Position of the producing node in its graph.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Name of the producing node.
    ///
    /// # Panics
    ///
    /// Panics if the handle belongs to a different, smaller graph.
    #[must_use]
    pub fn name(self, graph: &Graph) -> &str {
        &graph.nodes[self.0].name
    }
}

/// A single operation in a [`Graph`].
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    op: OpType,
    inputs: Vec<Output>,
    attributes: HashMap<String, Attribute>,
}

impl Node {
    /// Unique name of the node in its graph.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operation the node performs.
    #[must_use]
    pub const fn op(&self) -> OpType {
        self.op
    }

    /// Outputs consumed by the node, in operand order.
    #[must_use]
    pub fn inputs(&self) -> &[Output] {
        &self.inputs
    }

    /// Attribute stored under `key`, if any.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    fn tensor_attr(&self, key: &str) -> Result<&Tensor> {
        match self.attributes.get(key) {
            Some(Attribute::Tensor(t)) => Ok(t),
            _ => Err(Error::execution(format!(
                "node {:?} has no tensor attribute {key:?}",
                self.name
            ))),
        }
    }

    fn type_attr(&self, key: &str) -> Result<DataType> {
        match self.attributes.get(key) {
            Some(Attribute::Type(t)) => Ok(*t),
            _ => Err(Error::execution(format!(
                "node {:?} has no type attribute {key:?}",
                self.name
            ))),
        }
    }

    fn shape_attr(&self, key: &str) -> Option<&[usize]> {
        match self.attributes.get(key) {
            Some(Attribute::Shape(s)) => Some(s),
            _ => None,
        }
    }
}

/// Append-only arena of nodes.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
}

impl Graph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by name.
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<Output> {
        self.by_name.get(name).copied().map(Output)
    }

    /// Node producing `output`, or `None` for a handle from another graph.
    #[must_use]
    pub fn node(&self, output: Output) -> Option<&Node> {
        self.nodes.get(output.0)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Smallest free name of the form `base`, `base_1`, `base_2`, ...
    fn unique_name(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}_{i}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn push(
        &mut self,
        name: String,
        op: OpType,
        inputs: Vec<Output>,
        attributes: HashMap<String, Attribute>,
    ) -> Result<Output> {
        if self.contains(&name) {
            return Err(Error::DuplicateNode { name });
        }
        if let Some(bad) = inputs.iter().find(|input| input.0 >= self.nodes.len()) {
            return Err(Error::execution(format!(
                "input handle {} does not belong to this graph",
                bad.0
            )));
        }

        let id = self.nodes.len();
        tracing::trace!("graph: appending {op} node {name:?} as #{id}");
        self.by_name.insert(name.clone(), id);
        self.nodes.push(Node {
            name,
            op,
            inputs,
            attributes,
        });
        Ok(Output(id))
    }
}
