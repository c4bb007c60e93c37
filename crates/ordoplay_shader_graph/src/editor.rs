// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader editor session.
//!
//! [`ShaderEditor`] is the entry point for callers: it owns the graph store,
//! the shader interface, the undo history and the current document path.
//! Structural edits go through commands so they can be undone.

use crate::codegen::{self, ShaderGenerator};
use crate::commands::{
    CreateConnectionCommand, CreateNodeCommand, GraphCommand, MoveNodeCommand, RemoveNodeCommand,
};
use crate::error::{EditorError, Result};
use crate::graph::{ShaderGraph, Stage};
use crate::history::History;
use crate::interface::ShaderInterface;
use crate::node::{NodeData, NodeId, NodeKind};
use crate::persistence;
use crate::registry;
use crate::settings::ShaderEditorSettings;
use crate::LOG_TARGET;
use std::path::{Path, PathBuf};

/// An editing session over one shader
#[derive(Debug)]
pub struct ShaderEditor {
    settings: ShaderEditorSettings,
    interface: ShaderInterface,
    graph: ShaderGraph,
    history: History,
    path: Option<PathBuf>,
}

impl ShaderEditor {
    /// Create a session holding the default graph
    pub fn new(settings: ShaderEditorSettings) -> Self {
        let history = History::with_max_depth(settings.history_limit);
        Self {
            settings,
            interface: ShaderInterface::new(),
            graph: ShaderGraph::new(),
            history,
            path: None,
        }
    }

    /// Replace the document with the default graph
    pub fn new_graph(&mut self) {
        self.clear();
        self.graph.reset();
        self.path = None;
        tracing::debug!(target: LOG_TARGET, "New shader graph");
    }

    /// Drop every node, the interface and the history
    pub fn clear(&mut self) {
        self.graph.clear();
        self.interface.reset();
        self.history.clear();
    }

    /// Session settings
    pub fn settings(&self) -> &ShaderEditorSettings {
        &self.settings
    }

    /// Graph store
    pub fn graph(&self) -> &ShaderGraph {
        &self.graph
    }

    /// Shader interface
    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }

    /// Mutable shader interface; edits are not recorded in the history
    pub fn interface_mut(&mut self) -> &mut ShaderInterface {
        &mut self.interface
    }

    /// Undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Path of the current document
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a command through the history
    pub fn execute(&mut self, command: Box<dyn GraphCommand>) -> Result<()> {
        self.history.execute(&mut self.graph, command)?;
        Ok(())
    }

    /// Undo the last command; `false` when there was nothing to undo
    pub fn undo(&mut self) -> Result<bool> {
        Ok(self.history.undo(&mut self.graph)?)
    }

    /// Redo the last undone command; `false` when there was nothing to redo
    pub fn redo(&mut self) -> Result<bool> {
        Ok(self.history.redo(&mut self.graph)?)
    }

    /// Create a node of a kind the stage allows
    pub fn create_node(&mut self, kind: NodeKind, stage: Stage, position: [f32; 2]) -> Result<NodeId> {
        if !registry::is_allowed(kind, stage) {
            return Err(EditorError::KindNotAllowed { kind, stage });
        }
        self.execute(Box::new(CreateNodeCommand::new(kind, stage, position)))?;
        Ok(self.graph.last_node_id())
    }

    /// Connect an output pin to an input pin
    pub fn connect(&mut self, from_node: NodeId, from_pin: usize, to_node: NodeId, to_pin: usize) -> Result<()> {
        let command = CreateConnectionCommand::new(from_node, from_pin, to_node, to_pin, &self.graph)?;
        self.execute(Box::new(command))
    }

    /// Move a node; consecutive moves of one node collapse into one step
    pub fn move_node(&mut self, node_id: NodeId, position: [f32; 2]) -> Result<()> {
        let command = MoveNodeCommand::new(node_id, position, &self.graph)?;
        self.execute(Box::new(command))
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<()> {
        self.execute(Box::new(RemoveNodeCommand::new(node_id)))
    }

    /// Replace a node's payload; not recorded in the history
    pub fn set_node_data(&mut self, node_id: NodeId, data: NodeData) -> Result<()> {
        let node = self
            .graph
            .node_mut(node_id)
            .ok_or(EditorError::NodeNotFound(node_id))?;
        node.set_data(data)?;
        Ok(())
    }

    /// Write the session file and make `path` the current document
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let data = persistence::save_session(&self.interface, &self.graph).map_err(|e| {
            tracing::error!(target: LOG_TARGET, "Could not encode session: {}", e);
            e
        })?;
        std::fs::write(path, data).map_err(|e| {
            tracing::error!(target: LOG_TARGET, "Could not save {:?}: {}", path, e);
            e
        })?;

        self.path = Some(path.to_path_buf());
        tracing::info!(target: LOG_TARGET, "Saved shader graph to {:?}", path);
        Ok(())
    }

    /// Replace the session with the contents of a session file
    ///
    /// On failure the session is left cleared, with no nodes.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.clear();
        self.path = None;

        let data = std::fs::read(path).map_err(|e| {
            tracing::error!(target: LOG_TARGET, "Could not open {:?}: {}", path, e);
            e
        })?;
        if let Err(e) = persistence::load_session(&data, &mut self.interface, &mut self.graph) {
            tracing::error!(target: LOG_TARGET, "Could not read {:?}: {}", path, e);
            self.clear();
            return Err(e.into());
        }

        self.path = Some(path.to_path_buf());
        tracing::info!(
            target: LOG_TARGET,
            "Loaded shader graph from {:?} ({} nodes)",
            path,
            self.graph.node_count()
        );
        Ok(())
    }

    /// Program text for a stage
    pub fn generate_source(&self, stage: Stage) -> String {
        ShaderGenerator::new(&self.graph, &self.interface)
            .with_include_file(&self.settings.include_file)
            .generate(stage)
    }

    /// Shader descriptor text
    pub fn generate_descriptor(&self) -> String {
        codegen::generate_descriptor(&self.interface, &self.settings.passes)
    }

    /// Write one stage's program next to `path`
    pub fn generate(&self, path: &Path, stage: Stage) -> Result<()> {
        let target = codegen::stage_source_path(path, stage);
        write_output(&target, &self.generate_source(stage))
    }

    /// Write the shader descriptor next to `path`
    pub fn generate_main(&self, path: &Path) -> Result<()> {
        write_output(&codegen::descriptor_path(path), &self.generate_descriptor())
    }

    /// Write both programs and the descriptor next to `path`
    pub fn generate_all(&self, path: &Path) -> Result<()> {
        for stage in Stage::ALL {
            self.generate(path, stage)?;
        }
        self.generate_main(path)
    }
}

impl Default for ShaderEditor {
    fn default() -> Self {
        Self::new(ShaderEditorSettings::default())
    }
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| {
        tracing::error!(target: LOG_TARGET, "Could not write {:?}: {}", path, e);
        EditorError::Io(e)
    })?;
    tracing::debug!(target: LOG_TARGET, "Wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandError;
    use crate::connection::ConnectionError;
    use crate::node::PayloadError;
    use crate::value_type::{PinDirection, ValueType};

    fn temp_path(extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("shader_{}.{extension}", uuid::Uuid::new_v4()))
    }

    fn multiply_scenario() -> (ShaderEditor, NodeId, NodeId, NodeId) {
        let mut editor = ShaderEditor::default();
        let a = editor.create_node(NodeKind::FloatConst, Stage::Fragment, [0.0, 0.0]).unwrap();
        let b = editor.create_node(NodeKind::FloatConst, Stage::Fragment, [0.0, 80.0]).unwrap();
        let multiply = editor.create_node(NodeKind::Multiply, Stage::Fragment, [150.0, 40.0]).unwrap();
        editor.set_node_data(a, NodeData::FloatConst { value: 1.0 }).unwrap();
        editor.set_node_data(b, NodeData::FloatConst { value: 2.0 }).unwrap();
        editor.connect(a, 0, multiply, 0).unwrap();
        editor.connect(b, 0, multiply, 1).unwrap();
        editor.connect(multiply, 0, NodeId(1), 0).unwrap();
        (editor, a, b, multiply)
    }

    #[test]
    fn test_two_constants_multiplied() {
        let (editor, a, b, multiply) = multiply_scenario();
        let source = editor.generate_source(Stage::Fragment);

        assert_eq!(source.matches("const float").count(), 2);
        assert!(source.contains(&format!("\tconst float v{a} = 1.0;\n")));
        assert!(source.contains(&format!("\tconst float v{b} = 2.0;\n")));
        assert!(source.contains(&format!("\tfloat v{multiply} = v{a} * v{b};\n")));
        assert!(source.contains(&format!("\tgl_FragColor = v{multiply};\n")));
    }

    #[test]
    fn test_remove_and_undo_restores_links() {
        let (mut editor, a, b, multiply) = multiply_scenario();
        editor.remove_node(multiply).unwrap();
        assert!(!editor.graph().contains(multiply));
        assert_eq!(editor.graph().node(NodeId(1)).unwrap().input(0), None);

        assert!(editor.undo().unwrap());
        let graph = editor.graph();
        assert_eq!(graph.peer(multiply, 0, PinDirection::Input), Some((a, 0)));
        assert_eq!(graph.peer(multiply, 1, PinDirection::Input), Some((b, 0)));
        assert_eq!(graph.peer(multiply, 0, PinDirection::Output), Some((NodeId(1), 0)));
        assert!(graph.is_symmetric());
    }

    #[test]
    fn test_kind_legality() {
        let mut editor = ShaderEditor::default();
        assert!(matches!(
            editor.create_node(NodeKind::VertexInput, Stage::Fragment, [0.0, 0.0]),
            Err(EditorError::KindNotAllowed { .. })
        ));
        assert!(matches!(
            editor.create_node(NodeKind::PositionOutput, Stage::Vertex, [0.0, 0.0]),
            Err(EditorError::KindNotAllowed { .. })
        ));
        assert!(editor.create_node(NodeKind::VertexInput, Stage::Vertex, [0.0, 0.0]).is_ok());
        assert!(!editor.history().can_redo());
        assert_eq!(editor.history().undo_depth(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let (mut editor, _, _, multiply) = multiply_scenario();
        editor.interface_mut().set_texture_name(0, "u_albedo").unwrap();
        editor.move_node(multiply, [300.0, 10.0]).unwrap();
        let source = editor.generate_source(Stage::Fragment);

        let path = temp_path("sed");
        editor.save(&path).unwrap();
        assert_eq!(editor.path(), Some(path.as_path()));

        let mut loaded = ShaderEditor::default();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.interface(), editor.interface());
        assert_eq!(loaded.graph().node(multiply), editor.graph().node(multiply));
        assert_eq!(loaded.generate_source(Stage::Fragment), source);
        assert!(!loaded.history().can_undo());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_failed_load_leaves_empty_graph() {
        let mut editor = ShaderEditor::default();
        assert!(matches!(editor.load(&temp_path("sed")), Err(EditorError::Io(_))));
        assert_eq!(editor.graph().node_count(), 0);

        let path = temp_path("sed");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        assert!(matches!(editor.load(&path), Err(EditorError::Encoding(_))));
        assert_eq!(editor.graph().node_count(), 0);
        assert_eq!(editor.path(), None);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_generate_all_writes_three_files() {
        let (mut editor, _, _, _) = multiply_scenario();
        editor.interface_mut().set_texture_name(0, "s_tex").unwrap();
        let session = temp_path("sed");
        editor.generate_all(&session).unwrap();

        let fragment = std::fs::read_to_string(codegen::stage_source_path(&session, Stage::Fragment)).unwrap();
        assert_eq!(fragment, editor.generate_source(Stage::Fragment));
        let vertex = std::fs::read_to_string(codegen::stage_source_path(&session, Stage::Vertex)).unwrap();
        assert!(vertex.contains("gl_Position"));
        let descriptor = std::fs::read_to_string(codegen::descriptor_path(&session)).unwrap();
        assert!(descriptor.starts_with("passes = {\"MAIN\"}\n"));
        assert!(descriptor.contains("{ name = \"s_tex\", uniform = \"s_tex\" }"));

        for stage in Stage::ALL {
            let _ = std::fs::remove_file(codegen::stage_source_path(&session, stage));
        }
        let _ = std::fs::remove_file(codegen::descriptor_path(&session));
    }

    #[test]
    fn test_settings_drive_generation() {
        let settings = ShaderEditorSettings {
            include_file: "bgfx_shader.sh".to_string(),
            passes: vec!["MAIN".to_string(), "DEPTH".to_string()],
            history_limit: Some(1),
            ..Default::default()
        };
        let mut editor = ShaderEditor::new(settings);
        assert!(editor.generate_source(Stage::Vertex).contains("#include \"bgfx_shader.sh\"\n"));
        assert!(editor.generate_descriptor().starts_with("passes = {\"MAIN\", \"DEPTH\"}\n"));

        editor.create_node(NodeKind::Mix, Stage::Fragment, [0.0, 0.0]).unwrap();
        editor.create_node(NodeKind::Mix, Stage::Fragment, [0.0, 0.0]).unwrap();
        assert_eq!(editor.history().undo_depth(), 1);
    }

    #[test]
    fn test_new_graph_resets_session() {
        let (mut editor, _, _, _) = multiply_scenario();
        editor.new_graph();
        assert_eq!(editor.graph().node_count(), 2);
        assert!(!editor.history().can_undo());
        assert_eq!(editor.graph().last_node_id(), NodeId(2));
    }

    #[test]
    fn test_rejected_edits_leave_graph_untouched() {
        let (mut editor, a, _, multiply) = multiply_scenario();
        let mix = editor.create_node(NodeKind::Mix, Stage::Fragment, [0.0, 160.0]).unwrap();
        editor.connect(multiply, 0, mix, 1).unwrap();
        editor.connect(mix, 0, NodeId(1), 0).unwrap();
        let depth = editor.history().undo_depth();

        assert!(matches!(
            editor.connect(mix, 0, multiply, 1),
            Err(EditorError::Command(CommandError::Connection(ConnectionError::CycleDetected(..))))
        ));
        assert!(matches!(
            editor.set_node_data(a, NodeData::FloatConst { value: f32::NAN }),
            Err(EditorError::Payload(PayloadError::NonFinite(_)))
        ));
        assert!(matches!(
            editor.set_node_data(a, NodeData::Mix),
            Err(EditorError::Payload(PayloadError::KindMismatch { .. }))
        ));
        assert!(matches!(
            editor.set_node_data(NodeId(99), NodeData::Mix),
            Err(EditorError::NodeNotFound(NodeId(99)))
        ));

        assert_eq!(editor.history().undo_depth(), depth);
        assert_eq!(editor.graph().output_type(mix, 0), ValueType::Float);
        let source = editor.generate_source(Stage::Fragment);
        assert!(source.contains("const float v3 = 1.0;"));
        assert!(!source.contains("NaN"));
    }
}
