// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line parsing and command execution.

use ordoplay_shader_graph::{EditorError, ShaderEditor, ShaderEditorSettings, Stage};
use std::path::{Path, PathBuf};

/// Usage line printed on parse errors
pub const USAGE: &str = "usage: ordoplay_shader_editor [--settings <file.ron>] <new|info|generate> <session>";

/// Action requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write a fresh two-terminal session
    New,
    /// Log a summary of a session
    Info,
    /// Write the stage sources and descriptor next to a session
    Generate,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    /// Requested action
    pub action: Action,
    /// Session file the action applies to
    pub session: PathBuf,
    /// Optional settings file
    pub settings: Option<PathBuf>,
}

/// Command line errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Argument not understood
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    /// Option given without its value
    #[error("Missing value for {0}")]
    MissingValue(&'static str),

    /// No action given
    #[error("Missing command")]
    MissingCommand,

    /// No session path given
    #[error("Missing session path")]
    MissingSession,

    /// Session operation failed
    #[error(transparent)]
    Editor(#[from] EditorError),
}

impl Cli {
    /// Parse arguments, excluding the program name
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let mut action = None;
        let mut session = None;
        let mut settings = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => {
                    let path = args.next().ok_or(CliError::MissingValue("--settings"))?;
                    settings = Some(PathBuf::from(path));
                }
                "new" if action.is_none() => action = Some(Action::New),
                "info" if action.is_none() => action = Some(Action::Info),
                "generate" if action.is_none() => action = Some(Action::Generate),
                _ if action.is_some() && session.is_none() && !arg.starts_with("--") => {
                    session = Some(PathBuf::from(arg));
                }
                _ => return Err(CliError::UnknownArgument(arg)),
            }
        }

        Ok(Self {
            action: action.ok_or(CliError::MissingCommand)?,
            session: session.ok_or(CliError::MissingSession)?,
            settings,
        })
    }

    /// Run the parsed command
    pub fn run(&self) -> Result<(), CliError> {
        let settings = match &self.settings {
            Some(path) => ShaderEditorSettings::load(path).map_err(EditorError::from)?,
            None => ShaderEditorSettings::default(),
        };
        let session = session_path(&self.session, &settings.session_extension);
        let mut editor = ShaderEditor::new(settings);

        match self.action {
            Action::New => {
                editor.new_graph();
                editor.save(&session)?;
            }
            Action::Info => {
                editor.load(&session)?;
                log_summary(&editor, &session);
            }
            Action::Generate => {
                editor.load(&session)?;
                editor.generate_all(&session)?;
                tracing::info!("Generated shaders for {:?}", session);
            }
        }
        Ok(())
    }
}

/// Session path with the configured extension appended when it has none
fn session_path(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(extension)
    }
}

fn log_summary(editor: &ShaderEditor, session: &Path) {
    let graph = editor.graph();
    let interface = editor.interface();
    tracing::info!(
        "{:?}: {} vertex nodes, {} fragment nodes, {} connections",
        session,
        graph.graph(Stage::Vertex).node_count(),
        graph.graph(Stage::Fragment).node_count(),
        graph.connections().len()
    );

    let textures: Vec<_> = interface.active_textures().map(|(_, name)| name).collect();
    let outputs: Vec<_> = interface.active_vertex_outputs().map(|(_, name)| name).collect();
    let inputs: Vec<_> = interface
        .enabled_vertex_inputs()
        .map(|input| input.attribute_name())
        .collect();
    tracing::info!("Textures: [{}]", textures.join(", "));
    tracing::info!("Vertex outputs: [{}]", outputs.join(", "));
    tracing::info!("Vertex inputs: [{}]", inputs.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_shader_graph::codegen;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse(args(&["generate", "water.sed"])).unwrap();
        assert_eq!(cli.action, Action::Generate);
        assert_eq!(cli.session, PathBuf::from("water.sed"));
        assert_eq!(cli.settings, None);

        let cli = Cli::parse(args(&["--settings", "editor.ron", "info", "water.sed"])).unwrap();
        assert_eq!(cli.action, Action::Info);
        assert_eq!(cli.settings, Some(PathBuf::from("editor.ron")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Cli::parse(args(&[])), Err(CliError::MissingCommand)));
        assert!(matches!(Cli::parse(args(&["new"])), Err(CliError::MissingSession)));
        assert!(matches!(
            Cli::parse(args(&["info", "--settings"])),
            Err(CliError::MissingValue("--settings"))
        ));
        assert!(matches!(
            Cli::parse(args(&["build", "water.sed"])),
            Err(CliError::UnknownArgument(_))
        ));
        assert!(matches!(
            Cli::parse(args(&["new", "a.sed", "b.sed"])),
            Err(CliError::UnknownArgument(_))
        ));
    }

    #[test]
    fn test_new_then_generate() {
        let session = std::env::temp_dir().join(format!("{}.sed", uuid::Uuid::new_v4()));
        let path = session.to_string_lossy().into_owned();

        Cli::parse(args(&["new", &path])).unwrap().run().unwrap();
        Cli::parse(args(&["info", &path])).unwrap().run().unwrap();
        Cli::parse(args(&["generate", &path])).unwrap().run().unwrap();

        let fragment = std::fs::read_to_string(codegen::stage_source_path(&session, Stage::Fragment)).unwrap();
        assert!(fragment.contains("\tgl_FragColor = vec4(1, 0, 1, 1);\n"));
        assert!(codegen::descriptor_path(&session).exists());

        let _ = std::fs::remove_file(codegen::stage_source_path(&session, Stage::Vertex));
        let _ = std::fs::remove_file(codegen::stage_source_path(&session, Stage::Fragment));
        let _ = std::fs::remove_file(codegen::descriptor_path(&session));
        let _ = std::fs::remove_file(&session);
    }

    #[test]
    fn test_session_extension_default() {
        assert_eq!(session_path(Path::new("shaders/water"), "sed"), PathBuf::from("shaders/water.sed"));
        assert_eq!(session_path(Path::new("water.graph"), "sed"), PathBuf::from("water.graph"));
    }

    #[test]
    fn test_missing_session_fails() {
        let session = std::env::temp_dir().join(format!("{}.sed", uuid::Uuid::new_v4()));
        let cli = Cli {
            action: Action::Info,
            session,
            settings: None,
        };
        assert!(matches!(cli.run(), Err(CliError::Editor(EditorError::Io(_)))));
    }
}
