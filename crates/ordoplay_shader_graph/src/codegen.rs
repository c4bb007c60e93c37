// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader source generation.
//!
//! Generation starts at the terminal nodes of a stage and walks backward
//! through input connections. Every node appends its statements to a single
//! text buffer right before the statement of its consumer, so the emitted
//! order is a valid dependency order. Nothing is memoized: a node reached
//! through several paths is emitted once per path.

use crate::graph::{ShaderGraph, Stage};
use crate::interface::ShaderInterface;
use crate::node::{NodeData, NodeId};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Include directive target used when none is configured
pub const DEFAULT_INCLUDE_FILE: &str = "common.sh";

/// Extension of the shader descriptor
pub const DESCRIPTOR_EXTENSION: &str = "shd";

const FALLBACK_SAMPLE: &str = "vec4(1, 0, 1, 0)";
const FALLBACK_FRAG_COLOR: &str = "vec4(1, 0, 1, 1)";
const FALLBACK_POSITION: &str = "vec4(1, 0, 1, 1)";
const FALLBACK_VERTEX_OUTPUT: &str = "vec4(1.0, 0.0, 1.0, 0.0)";

/// Swizzles written by the inputs of a vec4 merge node
const MERGE_SWIZZLES: [&str; 5] = ["xyz", "x", "y", "z", "w"];

/// Writes shader source for one graph store
pub struct ShaderGenerator<'a> {
    graph: &'a ShaderGraph,
    interface: &'a ShaderInterface,
    include_file: &'a str,
}

impl<'a> ShaderGenerator<'a> {
    /// Create a generator over a graph and its interface
    pub fn new(graph: &'a ShaderGraph, interface: &'a ShaderInterface) -> Self {
        Self {
            graph,
            interface,
            include_file: DEFAULT_INCLUDE_FILE,
        }
    }

    /// Use a different include directive target
    pub fn with_include_file(mut self, include_file: &'a str) -> Self {
        self.include_file = include_file;
        self
    }

    /// Full program text for a stage
    pub fn generate(&self, stage: Stage) -> String {
        let mut out = String::with_capacity(4096);

        match stage {
            Stage::Fragment => {
                self.write_varyings(&mut out, "$input");
            }
            Stage::Vertex => {
                let inputs: Vec<_> = self
                    .interface
                    .enabled_vertex_inputs()
                    .map(|input| input.attribute_name())
                    .collect();
                let _ = writeln!(out, "$input {}", inputs.join(", "));
                self.write_varyings(&mut out, "$output");
            }
        }

        let _ = writeln!(out, "#include \"{}\"", self.include_file);

        for (slot, name) in self.interface.active_textures() {
            let _ = writeln!(out, "SAMPLER2D({name}, {slot});");
        }

        let graph = self.graph.graph(stage);
        for node_id in graph.node_ids() {
            self.emit_preamble(node_id, &mut out);
        }

        out.push_str("void main() {\n");
        for node in graph.terminals() {
            self.emit(node.id, &mut out);
        }
        out.push_str("}\n");

        out
    }

    fn write_varyings(&self, out: &mut String, directive: &str) {
        let names: Vec<_> = self
            .interface
            .active_vertex_outputs()
            .map(|(_, name)| name)
            .collect();
        let _ = writeln!(out, "{directive} {}", names.join(", "));
    }

    /// File-scope declarations of a node
    pub fn emit_preamble(&self, node_id: NodeId, out: &mut String) {
        let Some(node) = self.graph.node(node_id) else {
            return;
        };
        if let NodeData::Uniform { name, value_type } = node.data() {
            let _ = writeln!(out, "uniform {} {name};", value_type.declaration_name());
        }
    }

    /// Expression a consumer uses to refer to the node's result
    pub fn emit_reference(&self, node_id: NodeId, out: &mut String) {
        let Some(node) = self.graph.node(node_id) else {
            return;
        };
        match node.data() {
            NodeData::VertexInput { input } => out.push_str(input.attribute_name()),
            NodeData::FragmentInput { attribute } => {
                out.push_str(self.interface.vertex_output_name(*attribute));
            }
            NodeData::Uniform { name, .. } => out.push_str(name),
            NodeData::BuiltinUniform { uniform } => out.push_str(uniform.symbol()),
            _ => push_temporary(out, node_id),
        }
    }

    /// Statements computing the node's result, preceded by its dependencies
    pub fn emit(&self, node_id: NodeId, out: &mut String) {
        let Some(node) = self.graph.node(node_id) else {
            return;
        };

        match node.data() {
            NodeData::VertexInput { .. }
            | NodeData::FragmentInput { .. }
            | NodeData::Uniform { .. }
            | NodeData::BuiltinUniform { .. } => {}

            NodeData::FloatConst { value } => {
                let _ = writeln!(out, "\tconst float v{node_id} = {};", float_literal(*value));
            }

            NodeData::ColorConst { color } => {
                let [r, g, b, a] = color.map(float_literal);
                let _ = writeln!(out, "\tconst vec4 v{node_id} = vec4({r}, {g}, {b}, {a});");
            }

            NodeData::Sample { texture } => match node.input(0) {
                None => {
                    let _ = writeln!(out, "\tvec4 v{node_id} = {FALLBACK_SAMPLE};");
                }
                Some(uv) => {
                    self.emit(uv, out);
                    let _ = write!(
                        out,
                        "\tvec4 v{node_id} = texture2D({}, ",
                        self.interface.texture_name(*texture)
                    );
                    self.emit_reference(uv, out);
                    out.push_str(");\n");
                }
            },

            NodeData::Mix => {
                let inputs: Vec<_> = node.inputs().iter().flatten().copied().collect();
                for input in &inputs {
                    self.emit(*input, out);
                }
                let type_name = self.graph.output_type(node_id, 0).declaration_name();
                if inputs.len() < node.inputs().len() {
                    let _ = writeln!(out, "\t{type_name} v{node_id};");
                } else {
                    let _ = write!(out, "\t{type_name} v{node_id} = mix(");
                    self.write_arguments(&inputs, out);
                    out.push_str(");\n");
                }
            }

            NodeData::Vec4Merge => {
                let _ = writeln!(out, "\tvec4 v{node_id};");
                for (swizzle, input) in MERGE_SWIZZLES.iter().zip(node.inputs()) {
                    let Some(input) = *input else {
                        continue;
                    };
                    self.emit(input, out);
                    let _ = write!(out, "\tv{node_id}.{swizzle} = ");
                    self.emit_reference(input, out);
                    out.push_str(";\n");
                }
            }

            NodeData::Multiply => {
                let type_name = self.graph.input_type(node_id, 1).declaration_name();
                let (Some(lhs), Some(rhs)) = (node.input(0), node.input(1)) else {
                    let _ = writeln!(out, "\t{type_name} v{node_id};");
                    return;
                };
                self.emit(lhs, out);
                self.emit(rhs, out);

                let is_matrix = self.graph.input_type(node_id, 0).is_matrix();
                let _ = write!(out, "\t{type_name} v{node_id} = ");
                if is_matrix {
                    out.push_str("mul(");
                    self.write_arguments(&[lhs, rhs], out);
                    out.push_str(");\n");
                } else {
                    self.emit_reference(lhs, out);
                    out.push_str(" * ");
                    self.emit_reference(rhs, out);
                    out.push_str(";\n");
                }
            }

            NodeData::FragmentOutput => {
                self.emit_assignment("gl_FragColor", node.input(0), FALLBACK_FRAG_COLOR, out);
            }

            NodeData::PositionOutput => {
                self.emit_assignment("gl_Position", node.input(0), FALLBACK_POSITION, out);
            }

            NodeData::VertexOutput { slot } => {
                let target = self.interface.vertex_output_name(*slot);
                self.emit_assignment(target, node.input(0), FALLBACK_VERTEX_OUTPUT, out);
            }
        }
    }

    fn emit_assignment(&self, target: &str, source: Option<NodeId>, fallback: &str, out: &mut String) {
        match source {
            None => {
                let _ = writeln!(out, "\t{target} = {fallback};");
            }
            Some(source) => {
                self.emit(source, out);
                let _ = write!(out, "\t{target} = ");
                self.emit_reference(source, out);
                out.push_str(";\n");
            }
        }
    }

    fn write_arguments(&self, inputs: &[NodeId], out: &mut String) {
        for (index, input) in inputs.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            self.emit_reference(*input, out);
        }
    }
}

fn push_temporary(out: &mut String, node_id: NodeId) {
    let _ = write!(out, "v{node_id}");
}

/// GLSL float literal; always carries a decimal point or exponent
fn float_literal(value: f32) -> String {
    debug_assert!(value.is_finite(), "non-finite constant {value}");
    format!("{value:?}")
}

/// Metadata descriptor listing passes and texture slots
pub fn generate_descriptor(interface: &ShaderInterface, passes: &[String]) -> String {
    let mut out = String::new();
    let passes: Vec<_> = passes.iter().map(|pass| format!("\"{pass}\"")).collect();
    let _ = writeln!(out, "passes = {{{}}}", passes.join(", "));
    out.push_str("vs_combinations = {\"\"}\n");
    out.push_str("fs_combinations = {\"\"}\n");
    out.push_str("texture_slots = {\n");

    let slots: Vec<_> = interface
        .active_textures()
        .map(|(_, name)| format!("{{ name = \"{name}\", uniform = \"{name}\" }}"))
        .collect();
    out.push_str(&slots.join(", "));
    out.push_str("}\n");
    out
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let basename = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{basename}{suffix}"))
}

/// `<dir>/<basename>_vs.sc` or `<dir>/<basename>_fs.sc`
pub fn stage_source_path(path: &Path, stage: Stage) -> PathBuf {
    sibling_path(path, stage.file_suffix())
}

/// `<dir>/<basename>.shd`
pub fn descriptor_path(path: &Path) -> PathBuf {
    sibling_path(path, &format!(".{DESCRIPTOR_EXTENSION}"))
}
