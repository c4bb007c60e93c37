// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session-level error type.

use crate::commands::CommandError;
use crate::connection::ConnectionError;
use crate::graph::Stage;
use crate::interface::InterfaceError;
use crate::node::{NodeId, NodeKind, PayloadError};
use crate::persistence::PersistenceError;
use crate::settings::SettingsError;

/// Result type for editor session operations
pub type Result<T> = std::result::Result<T, EditorError>;

/// Editor session errors
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session file could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(#[from] PersistenceError),

    /// Settings could not be read
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Command failed
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Connection rejected
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Shader interface edit rejected
    #[error("Interface error: {0}")]
    Interface(#[from] InterfaceError),

    /// Payload rejected by the node
    #[error("{0}")]
    Payload(#[from] PayloadError),

    /// Node kind not allowed in the stage
    #[error("{kind:?} nodes cannot be created in the {stage:?} stage")]
    KindNotAllowed {
        /// Requested kind
        kind: NodeKind,
        /// Target stage
        stage: Stage,
    },

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}
