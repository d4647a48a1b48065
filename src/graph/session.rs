//! Graph execution.

use std::collections::HashMap;

use super::ops::{self, Binary};
use super::{DataType, Graph, Node, OpType, Output, Tensor};
use crate::error::{Error, Result};

/// Executes a borrowed [`Graph`].
///
/// Only the nodes needed for the requested fetches are evaluated. Returned
/// tensors are owned by the caller.
pub struct Session<'g> {
    graph: &'g Graph,
}

impl<'g> Session<'g> {
    /// Create a session over `graph`.
    #[must_use]
    pub const fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// Start a fluent feed/fetch request.
    #[must_use]
    pub fn runner(&self) -> Runner<'_, 'g> {
        Runner {
            session: self,
            feeds: HashMap::new(),
            fetches: Vec::new(),
        }
    }

    /// Evaluate `fetches`, overriding the value of every node named in `feeds`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphExecution`] if a fetch or feed name is unknown, a
    /// feed does not match the node it replaces, a placeholder is left unfed,
    /// or a kernel rejects its inputs.
    pub fn run(&self, feeds: &HashMap<String, Tensor>, fetches: &[&str]) -> Result<Vec<Tensor>> {
        let targets = fetches
            .iter()
            .map(|name| {
                self.graph
                    .node_by_name(name)
                    .ok_or_else(|| Error::execution(format!("fetch {name:?} is not in the graph")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut fed = HashMap::with_capacity(feeds.len());
        for (name, tensor) in feeds {
            let id = self
                .graph
                .node_by_name(name)
                .ok_or_else(|| Error::execution(format!("feed {name:?} is not in the graph")))?;
            check_feed(&self.graph.nodes[id.index()], tensor)?;
            fed.insert(id.index(), tensor);
        }

        let needed = self.needed(&targets, &fed);
        let mut values: Vec<Option<Tensor>> = vec![None; self.graph.len()];

        for (id, node) in self.graph.nodes.iter().enumerate() {
            if !needed[id] {
                continue;
            }
            let value = match fed.get(&id) {
                Some(tensor) => (*tensor).clone(),
                None => evaluate(node, &values)?,
            };
            values[id] = Some(value);
        }

        targets
            .iter()
            .map(|target| {
                values[target.index()]
                    .clone()
                    .ok_or_else(|| Error::execution("fetch was not evaluated"))
            })
            .collect()
    }

    /// Nodes reachable backwards from `targets`, stopping at fed nodes.
    fn needed(&self, targets: &[Output], fed: &HashMap<usize, &Tensor>) -> Vec<bool> {
        let mut needed = vec![false; self.graph.len()];
        let mut stack: Vec<usize> = targets.iter().map(|t| t.index()).collect();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut needed[id], true) || fed.contains_key(&id) {
                continue;
            }
            stack.extend(self.graph.nodes[id].inputs.iter().map(|i| i.index()));
        }
        needed
    }
}

/// Fluent builder for a single [`Session::run`] call.
pub struct Runner<'s, 'g> {
    session: &'s Session<'g>,
    feeds: HashMap<String, Tensor>,
    fetches: Vec<String>,
}

impl Runner<'_, '_> {
    /// Replace the value of node `name` with `tensor` for this run.
    #[must_use]
    pub fn feed(mut self, name: &str, tensor: Tensor) -> Self {
        self.feeds.insert(name.to_string(), tensor);
        self
    }

    /// Request the value of node `name`.
    #[must_use]
    pub fn fetch(mut self, name: &str) -> Self {
        self.fetches.push(name.to_string());
        self
    }

    /// # Errors
    ///
    /// See [`Session::run`].
    pub fn run(self) -> Result<Vec<Tensor>> {
        let fetches: Vec<&str> = self.fetches.iter().map(String::as_str).collect();
        self.session.run(&self.feeds, &fetches)
    }
}

/// Reject feeds that contradict what the replaced node declares.
fn check_feed(node: &Node, tensor: &Tensor) -> Result<()> {
    let declared = match node.op {
        OpType::Const | OpType::Placeholder => Some(node.type_attr("dtype")?),
        OpType::Cast => Some(node.type_attr("DstT")?),
        OpType::ResizeBilinear => Some(DataType::Float),
        _ => None,
    };
    if let Some(dtype) = declared {
        if dtype != tensor.data_type() {
            return Err(Error::execution(format!(
                "feed for {:?} has type {}, node produces {dtype}",
                node.name,
                tensor.data_type()
            )));
        }
    }

    let shape = match node.op {
        OpType::Const => Some(node.tensor_attr("value")?.shape()),
        OpType::Placeholder => node.shape_attr("shape"),
        _ => None,
    };
    if let Some(shape) = shape {
        if shape != tensor.shape() {
            return Err(Error::execution(format!(
                "feed for {:?} has shape {:?}, node expects {shape:?}",
                node.name,
                tensor.shape()
            )));
        }
    }

    Ok(())
}

fn evaluate(node: &Node, values: &[Option<Tensor>]) -> Result<Tensor> {
    let input = |i: usize| -> Result<&Tensor> {
        node.inputs
            .get(i)
            .and_then(|output| values[output.index()].as_ref())
            .ok_or_else(|| {
                Error::execution(format!("{} node {:?} is missing input {i}", node.op, node.name))
            })
    };

    let result = match node.op {
        OpType::Const => Ok(node.tensor_attr("value")?.clone()),
        OpType::Placeholder => Err(Error::execution(format!(
            "placeholder {:?} must be fed",
            node.name
        ))),
        OpType::Cast => Ok(ops::cast(input(0)?, node.type_attr("DstT")?)),
        OpType::ExpandDims => ops::expand_dims(input(0)?, input(1)?),
        OpType::ResizeBilinear => ops::resize_bilinear(input(0)?, input(1)?),
        OpType::Sub => ops::binary(Binary::Sub, input(0)?, input(1)?),
        OpType::Div => ops::binary(Binary::Div, input(0)?, input(1)?),
        OpType::Identity => Ok(input(0)?.clone()),
    };

    result.map_err(|err| match err {
        Error::GraphExecution { reason } => {
            Error::execution(format!("{} ({}): {reason}", node.name, node.op))
        }
        Error::ShapeMismatch { expected, actual } => Error::execution(format!(
            "{} ({}): expected {expected}, got {actual}",
            node.name, node.op
        )),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn values(t: &Tensor) -> Vec<f32> {
        t.as_f32().unwrap().iter().copied().collect()
    }

    #[test]
    fn test_fetch_constant() {
        let mut graph = Graph::new();
        GraphBuilder::new(&mut graph)
            .constant("answer", 42i32)
            .unwrap();

        let out = Session::new(&graph).runner().fetch("answer").run().unwrap();
        assert_eq!(out, vec![Tensor::scalar(42i32)]);
    }

    #[test]
    fn test_unknown_fetch() {
        let graph = Graph::new();
        let err = Session::new(&graph).run(&HashMap::new(), &["output"]).unwrap_err();
        assert!(matches!(err, Error::GraphExecution { .. }));
    }

    #[test]
    fn test_unknown_feed() {
        let mut graph = Graph::new();
        GraphBuilder::new(&mut graph).constant("x", 1.0f32).unwrap();
        let err = Session::new(&graph)
            .runner()
            .feed("y", Tensor::scalar(1.0f32))
            .fetch("x")
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::GraphExecution { .. }));
    }

    #[test]
    fn test_placeholder_feed() {
        let mut graph = Graph::new();
        let mut b = GraphBuilder::new(&mut graph);
        let x = b.placeholder("x", DataType::Float, Some(&[2])).unwrap();
        let two = b.constant("two", 2.0f32).unwrap();
        let half = b.div(x, two).unwrap();
        let name = half.name(&graph).to_string();

        let session = Session::new(&graph);
        let out = session
            .runner()
            .feed("x", Tensor::vector(&[4.0f32, 8.0]))
            .fetch(&name)
            .run()
            .unwrap();
        assert_eq!(values(&out[0]), vec![2.0, 4.0]);

        let out = session
            .runner()
            .feed("x", Tensor::vector(&[1.0f32, 3.0]))
            .fetch(&name)
            .run()
            .unwrap();
        assert_eq!(values(&out[0]), vec![0.5, 1.5]);
    }

    #[test]
    fn test_unfed_placeholder() {
        let mut graph = Graph::new();
        let mut b = GraphBuilder::new(&mut graph);
        let x = b.placeholder("x", DataType::Float, None).unwrap();
        b.identity(x).unwrap();

        let err = Session::new(&graph)
            .runner()
            .fetch("Identity")
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("must be fed"), "{err}");
    }

    #[test]
    fn test_feed_type_mismatch() {
        let mut graph = Graph::new();
        GraphBuilder::new(&mut graph)
            .placeholder("x", DataType::Float, None)
            .unwrap();

        let err = Session::new(&graph)
            .runner()
            .feed("x", Tensor::scalar(1i32))
            .fetch("x")
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::GraphExecution { .. }));
    }

    #[test]
    fn test_feed_shape_mismatch() {
        let mut graph = Graph::new();
        GraphBuilder::new(&mut graph)
            .placeholder("x", DataType::Float, Some(&[1, 3]))
            .unwrap();

        let err = Session::new(&graph)
            .runner()
            .feed("x", Tensor::vector(&[1.0f32, 2.0, 3.0]))
            .fetch("x")
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::GraphExecution { .. }));
    }

    #[test]
    fn test_feed_short_circuits_upstream() {
        let mut graph = Graph::new();
        let mut b = GraphBuilder::new(&mut graph);
        let unfed = b.placeholder("unfed", DataType::Float, None).unwrap();
        let cast = b.cast(unfed, DataType::Float).unwrap();
        b.identity(cast).unwrap();

        let out = Session::new(&graph)
            .runner()
            .feed("Cast", Tensor::scalar(3.0f32))
            .fetch("Identity")
            .run()
            .unwrap();
        assert_eq!(out, vec![Tensor::scalar(3.0f32)]);
    }

    #[test]
    fn test_kernel_error_names_node() {
        let mut graph = Graph::new();
        let mut b = GraphBuilder::new(&mut graph);
        let x = b.constant("x", [1.0f32, 2.0, 3.0]).unwrap();
        let y = b.constant("y", [1.0f32, 2.0]).unwrap();
        b.sub(x, y).unwrap();

        let err = Session::new(&graph).runner().fetch("Sub").run().unwrap_err();
        assert!(matches!(err, Error::GraphExecution { ref reason } if reason.starts_with("Sub")));
    }

    #[test]
    fn test_identity_round_trip_between_graphs() {
        let mut first = Graph::new();
        let mut b = GraphBuilder::new(&mut first);
        let x = b.constant("x", [1.5f32, -2.25, 1e-3]).unwrap();
        let scale = b.constant("scale", 4.0f32).unwrap();
        let scaled = b.div(x, scale).unwrap();
        let name = scaled.name(&first).to_string();
        let produced = Session::new(&first)
            .runner()
            .fetch(&name)
            .run()
            .unwrap()
            .remove(0);

        let mut second = Graph::new();
        let mut b = GraphBuilder::new(&mut second);
        let input = b.constant_tensor("input", produced.clone()).unwrap();
        b.identity(input).unwrap();
        let echoed = Session::new(&second)
            .runner()
            .fetch("Identity")
            .run()
            .unwrap()
            .remove(0);

        assert_eq!(echoed.shape(), produced.shape());
        for (a, b) in values(&echoed).iter().zip(values(&produced)) {
            assert!((a - b).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_multiple_fetches_keep_order() {
        let mut graph = Graph::new();
        let mut b = GraphBuilder::new(&mut graph);
        b.constant("a", 1i32).unwrap();
        b.constant("b", 2i32).unwrap();

        let out = Session::new(&graph)
            .run(&HashMap::new(), &["b", "a", "b"])
            .unwrap();
        assert_eq!(
            out,
            vec![Tensor::scalar(2i32), Tensor::scalar(1i32), Tensor::scalar(2i32)]
        );
    }
}
