// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linear undo/redo stack of graph commands.

use crate::commands::{CommandError, GraphCommand};
use crate::graph::ShaderGraph;

/// Undo/redo history manager
///
/// Commands at `..applied` are applied; the rest form the redo branch,
/// which is discarded by the next [`History::execute`].
#[derive(Debug, Default)]
pub struct History {
    commands: Vec<Box<dyn GraphCommand>>,
    applied: usize,
    max_depth: Option<usize>,
}

impl History {
    /// Create an unbounded history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that forgets the oldest commands past `max_depth`
    pub fn with_max_depth(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Run a command and record it, merging into the last one when possible
    pub fn execute(
        &mut self,
        graph: &mut ShaderGraph,
        mut command: Box<dyn GraphCommand>,
    ) -> Result<(), CommandError> {
        self.commands.truncate(self.applied);

        if let Some(top) = self.commands.last_mut() {
            if top.merge(command.as_ref()) {
                tracing::trace!(target: crate::LOG_TARGET, "Merged {:?}", top.description());
                top.execute(graph)?;
                debug_assert!(graph.is_symmetric());
                return Ok(());
            }
        }

        command.execute(graph)?;
        debug_assert!(graph.is_symmetric());
        self.commands.push(command);
        self.applied = self.commands.len();

        if let Some(max_depth) = self.max_depth {
            if self.commands.len() > max_depth {
                let excess = self.commands.len() - max_depth;
                self.commands.drain(..excess);
                self.applied -= excess;
            }
        }
        Ok(())
    }

    /// Undo the last applied command; `false` when there is none
    pub fn undo(&mut self, graph: &mut ShaderGraph) -> Result<bool, CommandError> {
        let Some(index) = self.applied.checked_sub(1) else {
            return Ok(false);
        };
        self.commands[index].undo(graph)?;
        debug_assert!(graph.is_symmetric());
        self.applied = index;
        Ok(true)
    }

    /// Re-apply the next undone command; `false` at the end of the stack
    pub fn redo(&mut self, graph: &mut ShaderGraph) -> Result<bool, CommandError> {
        let Some(command) = self.commands.get_mut(self.applied) else {
            return Ok(false);
        };
        command.execute(graph)?;
        debug_assert!(graph.is_symmetric());
        self.applied += 1;
        Ok(true)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.applied < self.commands.len()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.applied
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.commands.len() - self.applied
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        let index = self.applied.checked_sub(1)?;
        self.commands.get(index).map(|command| command.description())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.commands.get(self.applied).map(|command| command.description())
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.commands.clear();
        self.applied = 0;
    }
}
