// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph store: the vertex and fragment node collections.

use crate::node::{Node, NodeData, NodeId, NodeKind};
use crate::registry;
use crate::value_type::{PinDirection, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Position of the terminal nodes of a new graph
const DEFAULT_TERMINAL_POSITION: [f32; 2] = [50.0, 50.0];

/// Shader stage a graph compiles to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl Stage {
    /// Both stages, in persisted order
    pub const ALL: [Stage; 2] = [Self::Vertex, Self::Fragment];

    /// Suffix of the generated source file
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::Vertex => "_vs.sc",
            Self::Fragment => "_fs.sc",
        }
    }
}

/// Nodes of one stage, in insertion order
#[derive(Debug, Clone)]
pub struct Graph {
    stage: Stage,
    nodes: IndexMap<NodeId, Node>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            nodes: IndexMap::new(),
        }
    }

    /// Stage of this graph
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Whether the graph holds the node
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Terminal nodes, the roots of generation
    pub fn terminals(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| node.kind().is_terminal())
    }

    fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    fn take(&mut self, node_id: NodeId) -> Option<Node> {
        self.nodes.shift_remove(&node_id)
    }

    fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Both stage graphs plus the id allocator they share
#[derive(Debug, Clone)]
pub struct ShaderGraph {
    vertex: Graph,
    fragment: Graph,
    last_node_id: i32,
}

impl ShaderGraph {
    /// Create a store with no nodes
    pub fn empty() -> Self {
        Self {
            vertex: Graph::new(Stage::Vertex),
            fragment: Graph::new(Stage::Fragment),
            last_node_id: 0,
        }
    }

    /// Create the default graph: a fragment output and a position output
    pub fn new() -> Self {
        let mut graph = Self::empty();
        graph.reset();
        graph
    }

    /// Drop every node and reset the allocator
    pub fn clear(&mut self) {
        self.vertex.clear();
        self.fragment.clear();
        self.last_node_id = 0;
    }

    /// Clear, then add the two always-present terminal nodes
    pub fn reset(&mut self) {
        self.clear();
        let [x, y] = DEFAULT_TERMINAL_POSITION;
        self.add_node(NodeKind::FragmentOutput, Stage::Fragment, [x, y]);
        self.add_node(NodeKind::PositionOutput, Stage::Vertex, [x, y]);
    }

    /// Graph of a stage
    pub fn graph(&self, stage: Stage) -> &Graph {
        match stage {
            Stage::Vertex => &self.vertex,
            Stage::Fragment => &self.fragment,
        }
    }

    fn graph_mut(&mut self, stage: Stage) -> &mut Graph {
        match stage {
            Stage::Vertex => &mut self.vertex,
            Stage::Fragment => &mut self.fragment,
        }
    }

    /// Last id handed out
    pub fn last_node_id(&self) -> NodeId {
        NodeId(self.last_node_id)
    }

    /// Stage owning a node
    pub fn stage_of(&self, node_id: NodeId) -> Option<Stage> {
        Stage::ALL
            .into_iter()
            .find(|stage| self.graph(*stage).contains(node_id))
    }

    /// Get a node by ID from either stage
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.fragment
            .node(node_id)
            .or_else(|| self.vertex.node(node_id))
    }

    /// Get a mutable node by ID from either stage
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        if self.fragment.contains(node_id) {
            self.fragment.node_mut(node_id)
        } else {
            self.vertex.node_mut(node_id)
        }
    }

    /// Whether either stage holds the node
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.stage_of(node_id).is_some()
    }

    /// All nodes of both stages, vertex first
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.vertex.nodes().chain(self.fragment.nodes())
    }

    /// Total node count
    pub fn node_count(&self) -> usize {
        self.vertex.node_count() + self.fragment.node_count()
    }

    fn allocate_id(&mut self) -> NodeId {
        self.last_node_id += 1;
        NodeId(self.last_node_id)
    }

    /// Make sure future allocations never hand out `node_id`
    pub fn reserve_id(&mut self, node_id: NodeId) {
        self.last_node_id = self.last_node_id.max(node_id.0);
    }

    /// Create a node with a fresh id and append it to a stage
    pub fn add_node(&mut self, kind: NodeKind, stage: Stage, position: [f32; 2]) -> NodeId {
        let id = self.allocate_id();
        let mut node = registry::create_node(kind, id);
        node.position = position;
        self.graph_mut(stage).insert(node);
        id
    }

    /// Append a node that already carries its id
    pub fn insert_node(&mut self, node: Node, stage: Stage) {
        assert!(
            !self.contains(node.id),
            "node id {} is already in use",
            node.id
        );
        self.reserve_id(node.id);
        self.graph_mut(stage).insert(node);
    }

    /// Remove a node, clearing the peer side of each of its connections
    pub fn destroy_node(&mut self, node_id: NodeId) -> Option<Node> {
        let stage = self.stage_of(node_id)?;
        let node = self.graph_mut(stage).take(node_id)?;

        for direction in [PinDirection::Input, PinDirection::Output] {
            for peer_id in node.pins(direction).iter().flatten() {
                let peer = self
                    .node_mut(*peer_id)
                    .unwrap_or_else(|| panic!("node {node_id} references missing peer {peer_id}"));
                let slot = peer
                    .pins(direction.opposite())
                    .iter()
                    .position(|pin| *pin == Some(node_id))
                    .unwrap_or_else(|| {
                        panic!("peer {peer_id} holds no back-reference to node {node_id}")
                    });
                peer.pins_mut(direction.opposite())[slot] = None;
            }
        }

        Some(node)
    }

    /// Type produced by an output pin; never fails
    pub fn output_type(&self, node_id: NodeId, _pin: usize) -> ValueType {
        let Some(node) = self.node(node_id) else {
            return ValueType::None;
        };
        match node.data() {
            NodeData::VertexInput { input } => input.value_type(),
            NodeData::Uniform { value_type, .. } => *value_type,
            NodeData::BuiltinUniform { uniform } => uniform.value_type(),
            NodeData::FloatConst { .. } => ValueType::Float,
            NodeData::FragmentInput { .. }
            | NodeData::ColorConst { .. }
            | NodeData::Sample { .. }
            | NodeData::Vec4Merge => ValueType::Vec4,
            NodeData::Mix | NodeData::Multiply => {
                self.input_type(node_id, 1)
            }
            NodeData::VertexOutput { .. }
            | NodeData::PositionOutput
            | NodeData::FragmentOutput => ValueType::None,
        }
    }

    /// Type arriving at an input pin, `None` when unconnected
    pub fn input_type(&self, node_id: NodeId, pin: usize) -> ValueType {
        match self.peer(node_id, pin, PinDirection::Input) {
            Some((peer, peer_pin)) => self.output_type(peer, peer_pin),
            None => ValueType::None,
        }
    }
}

impl Default for ShaderGraph {
    fn default() -> Self {
        Self::new()
    }
}
