// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection model: single-edge pins with symmetric back-references.
//!
//! A pin stores only the id of its peer node. The peer's pin index is
//! recovered by scanning the peer's opposite-direction pins for a reference
//! back to this node, so both sides must always be updated together.

use crate::graph::ShaderGraph;
use crate::node::NodeId;
use crate::value_type::PinDirection;
use std::collections::HashSet;

impl ShaderGraph {
    /// Check that a connection can be made, without mutating anything
    pub fn validate_connection(
        &self,
        from_node: NodeId,
        from_pin: usize,
        to_node: NodeId,
        to_pin: usize,
    ) -> Result<(), ConnectionError> {
        let source = self
            .node(from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target = self
            .node(to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        if from_pin >= source.outputs().len() {
            return Err(ConnectionError::PinOutOfRange {
                node: from_node,
                pin: from_pin,
                direction: PinDirection::Output,
            });
        }
        if to_pin >= target.inputs().len() {
            return Err(ConnectionError::PinOutOfRange {
                node: to_node,
                pin: to_pin,
                direction: PinDirection::Input,
            });
        }

        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        if self.stage_of(from_node) != self.stage_of(to_node) {
            return Err(ConnectionError::StageMismatch(from_node, to_node));
        }

        if self.is_downstream(to_node, from_node) {
            return Err(ConnectionError::CycleDetected(from_node, to_node));
        }

        Ok(())
    }

    /// Link an output pin to an input pin, replacing whatever either held
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_pin: usize,
        to_node: NodeId,
        to_pin: usize,
    ) -> Result<(), ConnectionError> {
        self.validate_connection(from_node, from_pin, to_node, to_pin)?;

        self.disconnect(from_node, from_pin, PinDirection::Output);
        self.disconnect(to_node, to_pin, PinDirection::Input);
        self.attach(from_node, from_pin, to_node, to_pin);
        Ok(())
    }

    /// Clear a pin and the matching pin on its peer; empty pins are a no-op
    ///
    /// Returns the former peer and the peer's pin index.
    pub fn disconnect(
        &mut self,
        node_id: NodeId,
        pin: usize,
        direction: PinDirection,
    ) -> Option<(NodeId, usize)> {
        let (peer_id, peer_pin) = self.peer(node_id, pin, direction)?;

        if let Some(peer) = self.node_mut(peer_id) {
            peer.pins_mut(direction.opposite())[peer_pin] = None;
        }
        if let Some(node) = self.node_mut(node_id) {
            node.pins_mut(direction)[pin] = None;
        }
        Some((peer_id, peer_pin))
    }

    /// Peer of a pin and the index of the matching pin on the peer
    ///
    /// # Panics
    ///
    /// Panics if the peer holds no back-reference, which means the
    /// symmetry invariant has already been broken.
    pub fn peer(
        &self,
        node_id: NodeId,
        pin: usize,
        direction: PinDirection,
    ) -> Option<(NodeId, usize)> {
        let peer_id = self.node(node_id)?.pins(direction).get(pin).copied().flatten()?;
        let peer = self
            .node(peer_id)
            .unwrap_or_else(|| panic!("node {node_id} references missing peer {peer_id}"));
        let peer_pin = peer
            .pins(direction.opposite())
            .iter()
            .position(|slot| *slot == Some(node_id))
            .unwrap_or_else(|| panic!("peer {peer_id} holds no back-reference to node {node_id}"));
        Some((peer_id, peer_pin))
    }

    /// Set both sides of a link without clearing previous occupants
    pub(crate) fn attach(&mut self, from_node: NodeId, from_pin: usize, to_node: NodeId, to_pin: usize) {
        if let Some(source) = self.node_mut(from_node) {
            source.outputs[from_pin] = Some(to_node);
        }
        if let Some(target) = self.node_mut(to_node) {
            target.inputs[to_pin] = Some(from_node);
        }
    }

    /// Whether `target` is `start` or can be reached from it along output pins
    pub fn is_downstream(&self, start: NodeId, target: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![start];

        while let Some(node_id) = pending.pop() {
            if node_id == target {
                return true;
            }
            if !visited.insert(node_id) {
                continue;
            }
            if let Some(node) = self.node(node_id) {
                pending.extend(node.outputs().iter().flatten().copied());
            }
        }
        false
    }

    /// Whether every reference has exactly one matching back-reference on its peer
    pub fn is_symmetric(&self) -> bool {
        self.nodes().all(|node| {
            [PinDirection::Input, PinDirection::Output]
                .into_iter()
                .all(|direction| {
                    node.pins(direction).iter().flatten().all(|peer_id| {
                        self.node(*peer_id).is_some_and(|peer| {
                            peer.pins(direction.opposite())
                                .iter()
                                .filter(|slot| **slot == Some(node.id))
                                .count()
                                == 1
                        })
                    })
                })
        })
    }

    /// All links as `(from, from_pin, to, to_pin)`, in node order
    pub fn connections(&self) -> Vec<(NodeId, usize, NodeId, usize)> {
        let mut links = Vec::new();
        for node in self.nodes() {
            for pin in 0..node.outputs().len() {
                if let Some((peer, peer_pin)) = self.peer(node.id, pin, PinDirection::Output) {
                    links.push((node.id, pin, peer, peer_pin));
                }
            }
        }
        links
    }
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Pin index beyond the node's pin count
    #[error("Node {node} has no {direction:?} pin {pin}")]
    PinOutOfRange {
        /// Node addressed
        node: NodeId,
        /// Requested pin
        pin: usize,
        /// Requested direction
        direction: PinDirection,
    },

    /// Nodes live in different stage graphs
    #[error("Nodes {0} and {1} belong to different stages")]
    StageMismatch(NodeId, NodeId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Link would close a cycle
    #[error("Connecting {0} to {1} would create a cycle")]
    CycleDetected(NodeId, NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Stage;
    use crate::node::NodeKind;
    use crate::value_type::ValueType;

    fn fragment_graph() -> (ShaderGraph, NodeId, NodeId, NodeId) {
        let mut graph = ShaderGraph::new();
        let a = graph.add_node(NodeKind::FloatConst, Stage::Fragment, [0.0, 0.0]);
        let b = graph.add_node(NodeKind::FloatConst, Stage::Fragment, [0.0, 0.0]);
        let multiply = graph.add_node(NodeKind::Multiply, Stage::Fragment, [0.0, 0.0]);
        (graph, a, b, multiply)
    }

    #[test]
    fn test_connect_sets_both_sides() {
        let (mut graph, a, _, multiply) = fragment_graph();
        graph.connect(a, 0, multiply, 1).unwrap();

        assert_eq!(graph.node(a).unwrap().output(0), Some(multiply));
        assert_eq!(graph.node(multiply).unwrap().input(1), Some(a));
        assert_eq!(graph.peer(multiply, 1, PinDirection::Input), Some((a, 0)));
        assert!(graph.is_symmetric());
    }

    #[test]
    fn test_connect_replaces_existing_edges() {
        let (mut graph, a, b, multiply) = fragment_graph();
        graph.connect(a, 0, multiply, 0).unwrap();

        // Moving the single output edge of `a` detaches input 0.
        graph.connect(a, 0, multiply, 1).unwrap();
        assert_eq!(graph.node(multiply).unwrap().input(0), None);
        assert_eq!(graph.node(multiply).unwrap().input(1), Some(a));

        // A new source on an occupied input evicts the old source.
        graph.connect(b, 0, multiply, 1).unwrap();
        assert_eq!(graph.node(a).unwrap().output(0), None);
        assert_eq!(graph.node(multiply).unwrap().input(1), Some(b));
        assert!(graph.is_symmetric());
    }

    #[test]
    fn test_disconnect_empty_pin_is_noop() {
        let (mut graph, a, _, multiply) = fragment_graph();
        assert_eq!(graph.disconnect(multiply, 0, PinDirection::Input), None);

        graph.connect(a, 0, multiply, 0).unwrap();
        assert_eq!(graph.disconnect(multiply, 0, PinDirection::Input), Some((a, 0)));
        assert!(!graph.node(a).unwrap().is_connected());
        assert!(!graph.node(multiply).unwrap().is_connected());
    }

    #[test]
    fn test_invalid_connections_rejected() {
        let (mut graph, a, _, multiply) = fragment_graph();
        assert!(matches!(
            graph.connect(a, 1, multiply, 0),
            Err(ConnectionError::PinOutOfRange { .. })
        ));
        assert!(matches!(
            graph.connect(a, 0, multiply, 2),
            Err(ConnectionError::PinOutOfRange { .. })
        ));
        assert!(matches!(
            graph.connect(multiply, 0, multiply, 0),
            Err(ConnectionError::SelfLoop)
        ));
        assert!(matches!(
            graph.connect(a, 0, NodeId(2), 0),
            Err(ConnectionError::StageMismatch(..))
        ));
        assert!(matches!(
            graph.connect(NodeId(99), 0, multiply, 0),
            Err(ConnectionError::NodeNotFound(NodeId(99)))
        ));
        assert!(!graph.node(a).unwrap().is_connected());
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = ShaderGraph::new();
        let mix = graph.add_node(NodeKind::Mix, Stage::Fragment, [0.0, 0.0]);
        let multiply = graph.add_node(NodeKind::Multiply, Stage::Fragment, [0.0, 0.0]);
        let merge = graph.add_node(NodeKind::Vec4Merge, Stage::Fragment, [0.0, 0.0]);
        graph.connect(mix, 0, multiply, 1).unwrap();
        graph.connect(multiply, 0, merge, 0).unwrap();

        assert!(matches!(
            graph.connect(multiply, 0, mix, 1),
            Err(ConnectionError::CycleDetected(..))
        ));
        assert!(matches!(
            graph.connect(merge, 0, mix, 0),
            Err(ConnectionError::CycleDetected(..))
        ));
        assert_eq!(graph.node(merge).unwrap().output(0), None);
        assert_eq!(graph.peer(multiply, 0, PinDirection::Output), Some((merge, 0)));
        assert_eq!(graph.output_type(mix, 0), ValueType::None);
        assert!(graph.is_downstream(mix, merge));
        assert!(!graph.is_downstream(merge, mix));

        // Rewiring the tail of the chain elsewhere is not a cycle.
        graph.connect(multiply, 0, NodeId(1), 0).unwrap();
        assert!(graph.is_symmetric());
    }

    #[test]
    fn test_double_back_reference_is_not_symmetric() {
        let (mut graph, a, _, multiply) = fragment_graph();
        graph.connect(a, 0, multiply, 0).unwrap();
        graph.node_mut(multiply).unwrap().inputs[1] = Some(a);
        assert!(!graph.is_symmetric());
    }

    #[test]
    #[should_panic(expected = "back-reference")]
    fn test_asymmetric_reference_panics() {
        let (mut graph, a, _, multiply) = fragment_graph();
        graph.node_mut(multiply).unwrap().inputs[0] = Some(a);
        graph.peer(multiply, 0, PinDirection::Input);
    }

    #[test]
    fn test_connections_listing() {
        let (mut graph, a, b, multiply) = fragment_graph();
        graph.connect(a, 0, multiply, 0).unwrap();
        graph.connect(b, 0, multiply, 1).unwrap();
        graph.connect(multiply, 0, NodeId(1), 0).unwrap();

        let links = graph.connections();
        assert_eq!(links.len(), 3);
        assert!(links.contains(&(b, 0, multiply, 1)));
        assert!(links.contains(&(multiply, 0, NodeId(1), 0)));
    }
}
