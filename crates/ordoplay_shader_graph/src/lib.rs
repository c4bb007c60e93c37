// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader node graph for `OrdoPlay` Editor.
//!
//! This crate holds the headless core of the shader graph editor:
//! - Vertex and fragment node graphs with single-edge pins
//! - Code generation of `.sc` shader sources and the `.shd` descriptor
//! - Command-based undo/redo
//! - Binary session files
//!
//! ## Architecture
//!
//! Nodes live in per-stage ordered tables and refer to each other by id.
//! Every edit that changes structure goes through a command recorded in
//! the [`History`]; [`ShaderEditor`] bundles the graph, interface, history
//! and settings of one editing session.

pub mod value_type;
pub mod node;
pub mod registry;
pub mod graph;
pub mod connection;
pub mod interface;
pub mod codegen;
pub mod persistence;
pub mod commands;
pub mod history;
pub mod settings;
pub mod error;
pub mod editor;

/// Log target shared by the shader editor crates
pub const LOG_TARGET: &str = "shader_editor";

pub use value_type::{PinDirection, ValueType};
pub use node::{BuiltinUniform, Node, NodeData, NodeId, NodeKind, PayloadError, VertexInput};
pub use graph::{Graph, ShaderGraph, Stage};
pub use connection::ConnectionError;
pub use interface::ShaderInterface;
pub use codegen::ShaderGenerator;
pub use commands::{CommandError, GraphCommand};
pub use history::History;
pub use settings::ShaderEditorSettings;
pub use error::{EditorError, Result};
pub use editor::ShaderEditor;
