// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of node kinds the user can place in each stage.

use crate::graph::Stage;
use crate::node::{Node, NodeId, NodeKind};

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    /// Stage inputs, constants and uniforms
    Input,
    /// Stage outputs
    Output,
    /// Math operations
    Math,
    /// Texture operations
    Texture,
}

/// Entry of the "Add" menu
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeInfo {
    /// Display name
    pub name: &'static str,
    /// Kind created
    pub kind: NodeKind,
    /// Category
    pub category: NodeCategory,
    /// Legal in the fragment graph
    pub fragment: bool,
    /// Legal in the vertex graph
    pub vertex: bool,
}

impl NodeTypeInfo {
    /// Whether the kind may be created in `stage`
    pub fn allowed_in(&self, stage: Stage) -> bool {
        match stage {
            Stage::Fragment => self.fragment,
            Stage::Vertex => self.vertex,
        }
    }
}

const fn entry(
    name: &'static str,
    kind: NodeKind,
    category: NodeCategory,
    fragment: bool,
    vertex: bool,
) -> NodeTypeInfo {
    NodeTypeInfo {
        name,
        kind,
        category,
        fragment,
        vertex,
    }
}

// Position output is only ever created by a new graph.
static NODE_TYPES: [NodeTypeInfo; 12] = [
    entry("Mix", NodeKind::Mix, NodeCategory::Math, true, true),
    entry("Sample", NodeKind::Sample, NodeCategory::Texture, true, true),
    entry("Input", NodeKind::VertexInput, NodeCategory::Input, false, true),
    entry("Output", NodeKind::VertexOutput, NodeCategory::Output, false, true),
    entry("Input", NodeKind::FragmentInput, NodeCategory::Input, true, false),
    entry("Output", NodeKind::FragmentOutput, NodeCategory::Output, true, false),
    entry("Color constant", NodeKind::ColorConst, NodeCategory::Input, true, true),
    entry("Float Const", NodeKind::FloatConst, NodeCategory::Input, true, true),
    entry("Uniform", NodeKind::Uniform, NodeCategory::Input, true, true),
    entry("Vec4 merge", NodeKind::Vec4Merge, NodeCategory::Math, true, true),
    entry("Multiply", NodeKind::Multiply, NodeCategory::Math, true, true),
    entry("Builtin uniforms", NodeKind::BuiltinUniform, NodeCategory::Input, true, true),
];

/// All user-creatable node types
pub fn node_types() -> &'static [NodeTypeInfo] {
    &NODE_TYPES
}

/// Node types offered for a stage, in menu order
pub fn types_for_stage(stage: Stage) -> impl Iterator<Item = &'static NodeTypeInfo> {
    NODE_TYPES.iter().filter(move |info| info.allowed_in(stage))
}

/// Node types in a category
pub fn types_in_category(category: NodeCategory) -> impl Iterator<Item = &'static NodeTypeInfo> {
    NODE_TYPES.iter().filter(move |info| info.category == category)
}

/// Look up the menu entry of a kind
pub fn info(kind: NodeKind) -> Option<&'static NodeTypeInfo> {
    NODE_TYPES.iter().find(|info| info.kind == kind)
}

/// Whether the user may create `kind` in `stage`
pub fn is_allowed(kind: NodeKind, stage: Stage) -> bool {
    info(kind).is_some_and(|info| info.allowed_in(stage))
}

/// Construct a default-initialised node of `kind`
pub fn create_node(kind: NodeKind, id: NodeId) -> Node {
    Node::new(id, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_legality() {
        assert!(is_allowed(NodeKind::VertexInput, Stage::Vertex));
        assert!(!is_allowed(NodeKind::VertexInput, Stage::Fragment));
        assert!(is_allowed(NodeKind::FragmentOutput, Stage::Fragment));
        assert!(!is_allowed(NodeKind::FragmentOutput, Stage::Vertex));
        assert!(is_allowed(NodeKind::Multiply, Stage::Vertex));
        assert!(is_allowed(NodeKind::Multiply, Stage::Fragment));
        assert!(!is_allowed(NodeKind::PositionOutput, Stage::Vertex));
    }

    #[test]
    fn test_menu_per_stage() {
        let fragment: Vec<_> = types_for_stage(Stage::Fragment).map(|info| info.kind).collect();
        assert_eq!(fragment.len(), 10);
        assert!(fragment.contains(&NodeKind::FragmentInput));
        assert!(!fragment.contains(&NodeKind::VertexOutput));

        let vertex = types_for_stage(Stage::Vertex).count();
        assert_eq!(vertex, 10);
    }

    #[test]
    fn test_create_node_from_kind() {
        let node = create_node(NodeKind::Mix, NodeId(7));
        assert_eq!(node.id, NodeId(7));
        assert_eq!(node.kind(), NodeKind::Mix);
        assert_eq!(node.inputs().len(), 3);
        assert_eq!(types_in_category(NodeCategory::Output).count(), 2);
    }
}
