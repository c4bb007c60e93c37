// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reversible graph edits.
//!
//! Each command captures what it needs to invert itself. Commands are run
//! through [`crate::history::History`], which keeps them in a linear stack.

use crate::connection::ConnectionError;
use crate::graph::{ShaderGraph, Stage};
use crate::node::{NodeId, NodeKind};
use crate::persistence::{self, BlobReader, BlobWriter, PersistenceError};
use crate::registry;
use crate::value_type::PinDirection;
use std::any::Any;
use std::fmt;

/// A graph edit that can be undone and redone
pub trait GraphCommand: fmt::Debug {
    /// Get a description of this command
    fn description(&self) -> &str;

    /// Apply the edit
    fn execute(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError>;

    /// Revert the edit
    fn undo(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError>;

    /// Absorb a newer command into this one; `true` when absorbed
    fn merge(&mut self, _other: &dyn GraphCommand) -> bool {
        false
    }

    /// Downcast support for [`GraphCommand::merge`]
    fn as_any(&self) -> &dyn Any;
}

/// Error type for command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Connection rejected
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Node snapshot could not be written or read
    #[error("Encoding error: {0}")]
    Encoding(#[from] PersistenceError),
}

/// Move a node in the graph UI
#[derive(Debug, Clone)]
pub struct MoveNodeCommand {
    node_id: NodeId,
    old_position: [f32; 2],
    new_position: [f32; 2],
}

impl MoveNodeCommand {
    /// Capture the current position of `node_id` as the undo target
    pub fn new(node_id: NodeId, new_position: [f32; 2], graph: &ShaderGraph) -> Result<Self, CommandError> {
        let node = graph.node(node_id).ok_or(CommandError::NodeNotFound(node_id))?;
        Ok(Self {
            node_id,
            old_position: node.position,
            new_position,
        })
    }

    fn set_position(&self, graph: &mut ShaderGraph, position: [f32; 2]) -> Result<(), CommandError> {
        let node = graph
            .node_mut(self.node_id)
            .ok_or(CommandError::NodeNotFound(self.node_id))?;
        node.position = position;
        Ok(())
    }
}

impl GraphCommand for MoveNodeCommand {
    fn description(&self) -> &str {
        "Move node"
    }

    fn execute(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError> {
        self.set_position(graph, self.new_position)
    }

    fn undo(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError> {
        self.set_position(graph, self.old_position)
    }

    fn merge(&mut self, other: &dyn GraphCommand) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) if other.node_id == self.node_id => {
                self.new_position = other.new_position;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Connect an output pin to an input pin
#[derive(Debug, Clone)]
pub struct CreateConnectionCommand {
    from_node: NodeId,
    from_pin: usize,
    to_node: NodeId,
    to_pin: usize,
    /// Former peer of the output pin
    replaced_target: Option<(NodeId, usize)>,
    /// Former peer of the input pin
    replaced_source: Option<(NodeId, usize)>,
}

impl CreateConnectionCommand {
    /// Validate the link and capture what it will displace
    pub fn new(
        from_node: NodeId,
        from_pin: usize,
        to_node: NodeId,
        to_pin: usize,
        graph: &ShaderGraph,
    ) -> Result<Self, CommandError> {
        graph.validate_connection(from_node, from_pin, to_node, to_pin)?;
        Ok(Self {
            from_node,
            from_pin,
            to_node,
            to_pin,
            replaced_target: graph.peer(from_node, from_pin, PinDirection::Output),
            replaced_source: graph.peer(to_node, to_pin, PinDirection::Input),
        })
    }
}

impl GraphCommand for CreateConnectionCommand {
    fn description(&self) -> &str {
        "Connect pins"
    }

    fn execute(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError> {
        graph.connect(self.from_node, self.from_pin, self.to_node, self.to_pin)?;
        Ok(())
    }

    fn undo(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError> {
        for node_id in [self.from_node, self.to_node] {
            if !graph.contains(node_id) {
                return Err(CommandError::NodeNotFound(node_id));
            }
        }

        graph.disconnect(self.from_node, self.from_pin, PinDirection::Output);
        if let Some((target, target_pin)) = self.replaced_target {
            graph.attach(self.from_node, self.from_pin, target, target_pin);
        }
        if let Some((source, source_pin)) = self.replaced_source {
            graph.attach(source, source_pin, self.to_node, self.to_pin);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Create a node; redo recreates it under the same id
#[derive(Debug, Clone)]
pub struct CreateNodeCommand {
    kind: NodeKind,
    stage: Stage,
    position: [f32; 2],
    node_id: Option<NodeId>,
}

impl CreateNodeCommand {
    /// Create a new node command
    pub fn new(kind: NodeKind, stage: Stage, position: [f32; 2]) -> Self {
        Self {
            kind,
            stage,
            position,
            node_id: None,
        }
    }

    /// Id of the created node, once executed
    pub fn node_id(&self) -> Option<NodeId> {
        self.node_id
    }
}

impl GraphCommand for CreateNodeCommand {
    fn description(&self) -> &str {
        "Create node"
    }

    fn execute(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError> {
        match self.node_id {
            Some(node_id) => {
                let mut node = registry::create_node(self.kind, node_id);
                node.position = self.position;
                graph.insert_node(node, self.stage);
            }
            None => {
                self.node_id = Some(graph.add_node(self.kind, self.stage, self.position));
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError> {
        let Some(node_id) = self.node_id else {
            return Ok(());
        };
        graph
            .destroy_node(node_id)
            .map(|_| ())
            .ok_or(CommandError::NodeNotFound(node_id))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove a node; undo restores it with its id, payload and links
#[derive(Debug, Clone)]
pub struct RemoveNodeCommand {
    node_id: NodeId,
    stage: Option<Stage>,
    snapshot: Vec<u8>,
}

impl RemoveNodeCommand {
    /// Create a new remove command
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            stage: None,
            snapshot: Vec::new(),
        }
    }
}

impl GraphCommand for RemoveNodeCommand {
    fn description(&self) -> &str {
        "Remove node"
    }

    fn execute(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError> {
        let stage = graph
            .stage_of(self.node_id)
            .ok_or(CommandError::NodeNotFound(self.node_id))?;
        let node = graph
            .node(self.node_id)
            .ok_or(CommandError::NodeNotFound(self.node_id))?;

        let mut blob = BlobWriter::new(Vec::new());
        persistence::save_node(&mut blob, node)?;
        persistence::save_node_connections(&mut blob, graph, self.node_id)?;
        self.snapshot = blob.into_inner();
        self.stage = Some(stage);

        graph.destroy_node(self.node_id);
        Ok(())
    }

    fn undo(&mut self, graph: &mut ShaderGraph) -> Result<(), CommandError> {
        let Some(stage) = self.stage else {
            return Ok(());
        };

        let mut blob = BlobReader::new(self.snapshot.as_slice());
        let node_id = persistence::load_node(&mut blob, graph, stage)?;
        persistence::load_node_connections(&mut blob, graph, node_id)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeData;

    #[test]
    fn test_move_merge_keeps_first_origin() {
        let mut graph = ShaderGraph::new();
        let mut first = MoveNodeCommand::new(NodeId(1), [10.0, 10.0], &graph).unwrap();
        first.execute(&mut graph).unwrap();
        let second = MoveNodeCommand::new(NodeId(1), [20.0, 30.0], &graph).unwrap();

        assert!(first.merge(&second));
        first.execute(&mut graph).unwrap();
        assert_eq!(graph.node(NodeId(1)).unwrap().position, [20.0, 30.0]);

        first.undo(&mut graph).unwrap();
        assert_eq!(graph.node(NodeId(1)).unwrap().position, [50.0, 50.0]);

        let other_node = MoveNodeCommand::new(NodeId(2), [0.0, 0.0], &graph).unwrap();
        assert!(!first.merge(&other_node));
        assert!(!first.merge(&CreateNodeCommand::new(NodeKind::Mix, Stage::Fragment, [0.0, 0.0])));
    }

    #[test]
    fn test_connection_undo_restores_displaced_links() {
        let mut graph = ShaderGraph::new();
        let a = graph.add_node(NodeKind::ColorConst, Stage::Fragment, [0.0, 0.0]);
        let b = graph.add_node(NodeKind::ColorConst, Stage::Fragment, [0.0, 0.0]);
        let multiply = graph.add_node(NodeKind::Multiply, Stage::Fragment, [0.0, 0.0]);
        graph.connect(a, 0, multiply, 0).unwrap();
        graph.connect(b, 0, NodeId(1), 0).unwrap();

        let mut command = CreateConnectionCommand::new(a, 0, NodeId(1), 0, &graph).unwrap();
        command.execute(&mut graph).unwrap();
        assert_eq!(graph.node(NodeId(1)).unwrap().input(0), Some(a));
        assert_eq!(graph.node(multiply).unwrap().input(0), None);
        assert_eq!(graph.node(b).unwrap().output(0), None);

        command.undo(&mut graph).unwrap();
        assert_eq!(graph.peer(multiply, 0, PinDirection::Input), Some((a, 0)));
        assert_eq!(graph.peer(NodeId(1), 0, PinDirection::Input), Some((b, 0)));
        assert!(graph.is_symmetric());
    }

    #[test]
    fn test_invalid_connection_is_rejected_up_front() {
        let graph = ShaderGraph::new();
        let result = CreateConnectionCommand::new(NodeId(2), 0, NodeId(1), 0, &graph);
        assert!(matches!(
            result,
            Err(CommandError::Connection(ConnectionError::PinOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_create_node_redo_reuses_id() {
        let mut graph = ShaderGraph::new();
        let mut command = CreateNodeCommand::new(NodeKind::Sample, Stage::Fragment, [5.0, 6.0]);
        command.execute(&mut graph).unwrap();
        let node_id = command.node_id().unwrap();

        command.undo(&mut graph).unwrap();
        assert!(!graph.contains(node_id));

        command.execute(&mut graph).unwrap();
        assert_eq!(command.node_id(), Some(node_id));
        let node = graph.node(node_id).unwrap();
        assert_eq!(node.kind(), NodeKind::Sample);
        assert_eq!(node.position, [5.0, 6.0]);
    }

    #[test]
    fn test_remove_node_undo_restores_payload_and_links() {
        let mut graph = ShaderGraph::new();
        let a = graph.add_node(NodeKind::FloatConst, Stage::Fragment, [0.0, 0.0]);
        let b = graph.add_node(NodeKind::FloatConst, Stage::Fragment, [0.0, 0.0]);
        let multiply = graph.add_node(NodeKind::Multiply, Stage::Fragment, [7.0, 8.0]);
        graph.connect(a, 0, multiply, 0).unwrap();
        graph.connect(b, 0, multiply, 1).unwrap();
        graph
            .node_mut(a)
            .unwrap()
            .set_data(NodeData::FloatConst { value: 3.5 })
            .unwrap();

        let mut remove_multiply = RemoveNodeCommand::new(multiply);
        remove_multiply.execute(&mut graph).unwrap();
        assert!(!graph.contains(multiply));
        assert!(!graph.node(a).unwrap().is_connected());

        remove_multiply.undo(&mut graph).unwrap();
        assert_eq!(graph.peer(multiply, 0, PinDirection::Input), Some((a, 0)));
        assert_eq!(graph.peer(multiply, 1, PinDirection::Input), Some((b, 0)));
        assert_eq!(graph.node(multiply).unwrap().position, [7.0, 8.0]);
        assert_eq!(graph.stage_of(multiply), Some(Stage::Fragment));

        let mut remove_constant = RemoveNodeCommand::new(a);
        remove_constant.execute(&mut graph).unwrap();
        remove_constant.undo(&mut graph).unwrap();
        assert_eq!(graph.node(a).unwrap().data(), &NodeData::FloatConst { value: 3.5 });
        assert!(graph.is_symmetric());
    }

    #[test]
    fn test_missing_node_reports_error() {
        let mut graph = ShaderGraph::new();
        assert!(matches!(
            MoveNodeCommand::new(NodeId(42), [0.0, 0.0], &graph),
            Err(CommandError::NodeNotFound(NodeId(42)))
        ));
        assert!(matches!(
            RemoveNodeCommand::new(NodeId(42)).execute(&mut graph),
            Err(CommandError::NodeNotFound(NodeId(42)))
        ));
    }
}
