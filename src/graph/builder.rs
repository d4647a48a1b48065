//! Builder that appends typed operations to a [`Graph`].

use std::collections::HashMap;

use super::{Attribute, DataType, Element, Graph, OpType, Output, Tensor};
use crate::error::Result;

/// Appends one node per call to the graph it borrows.
///
/// The builder only describes the computation. Values are produced by a
/// [`Session`](super::Session).
///
/// Only explicitly named nodes (constants and placeholders) can collide:
/// reusing one of those names fails with
/// [`Error::DuplicateNode`](crate::Error::DuplicateNode). Operation nodes are
/// named after their op type and take the first free `Sub`, `Sub_1`, `Sub_2`
/// style name, so appending the same operation twice never fails.
pub struct GraphBuilder<'g> {
    graph: &'g mut Graph,
}

impl<'g> GraphBuilder<'g> {
    /// Start appending nodes to `graph`.
    pub fn new(graph: &'g mut Graph) -> Self {
        Self { graph }
    }

    /// Wrap a materialized tensor as a constant node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateNode`](crate::Error::DuplicateNode) if `name`
    /// is already taken.
    pub fn constant_tensor(&mut self, name: &str, tensor: Tensor) -> Result<Output> {
        let attributes = HashMap::from([
            ("dtype".to_string(), Attribute::Type(tensor.data_type())),
            ("value".to_string(), Attribute::Tensor(tensor)),
        ]);
        self.graph
            .push(name.to_string(), OpType::Const, Vec::new(), attributes)
    }

    /// Add a scalar or vector constant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateNode`](crate::Error::DuplicateNode) if `name`
    /// is already taken.
    pub fn constant(&mut self, name: &str, value: impl Into<ConstValue>) -> Result<Output> {
        self.constant_tensor(name, value.into().0)
    }

    /// Add a named input that has to be fed at run time.
    ///
    /// A `None` shape accepts any shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateNode`](crate::Error::DuplicateNode) if `name`
    /// is already taken.
    pub fn placeholder(
        &mut self,
        name: &str,
        dtype: DataType,
        shape: Option<&[usize]>,
    ) -> Result<Output> {
        let mut attributes = HashMap::from([("dtype".to_string(), Attribute::Type(dtype))]);
        if let Some(shape) = shape {
            attributes.insert("shape".to_string(), Attribute::Shape(shape.to_vec()));
        }
        self.graph
            .push(name.to_string(), OpType::Placeholder, Vec::new(), attributes)
    }

    /// # Errors
    ///
    /// Fails only if `value` belongs to another graph.
    pub fn cast(&mut self, value: Output, dtype: DataType) -> Result<Output> {
        let attributes = HashMap::from([("DstT".to_string(), Attribute::Type(dtype))]);
        self.op(OpType::Cast, vec![value], attributes)
    }

    /// Insert a dimension of size one at position `dim`.
    ///
    /// # Errors
    ///
    /// Fails only if an input belongs to another graph.
    pub fn expand_dims(&mut self, input: Output, dim: Output) -> Result<Output> {
        self.binary_op(OpType::ExpandDims, input, dim)
    }

    /// Resample `[N, H, W, C]` images to `size = [height, width]`.
    ///
    /// # Errors
    ///
    /// Fails only if an input belongs to another graph.
    pub fn resize_bilinear(&mut self, images: Output, size: Output) -> Result<Output> {
        self.binary_op(OpType::ResizeBilinear, images, size)
    }

    /// # Errors
    ///
    /// Fails only if an input belongs to another graph.
    pub fn sub(&mut self, x: Output, y: Output) -> Result<Output> {
        self.binary_op(OpType::Sub, x, y)
    }

    /// # Errors
    ///
    /// Fails only if an input belongs to another graph.
    pub fn div(&mut self, x: Output, y: Output) -> Result<Output> {
        self.binary_op(OpType::Div, x, y)
    }

    /// # Errors
    ///
    /// Fails only if `input` belongs to another graph.
    pub fn identity(&mut self, input: Output) -> Result<Output> {
        self.op(OpType::Identity, vec![input], HashMap::new())
    }

    fn binary_op(&mut self, op: OpType, in1: Output, in2: Output) -> Result<Output> {
        self.op(op, vec![in1, in2], HashMap::new())
    }

    fn op(
        &mut self,
        op: OpType,
        inputs: Vec<Output>,
        attributes: HashMap<String, Attribute>,
    ) -> Result<Output> {
        let name = self.graph.unique_name(op.name());
        self.graph.push(name, op, inputs, attributes)
    }
}

/// Value accepted by [`GraphBuilder::constant`].
pub struct ConstValue(Tensor);

macro_rules! scalar_const {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ConstValue {
                fn from(value: $ty) -> Self {
                    Self(Tensor::scalar(value))
                }
            }
        )*
    };
}

scalar_const!(u8, f32, i32);

impl<T: Element> From<&[T]> for ConstValue {
    fn from(values: &[T]) -> Self {
        Self(Tensor::vector(values))
    }
}

impl<T: Element, const N: usize> From<[T; N]> for ConstValue {
    fn from(values: [T; N]) -> Self {
        Self(Tensor::vector(&values))
    }
}
