// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader interface: texture slots, varyings and enabled vertex attributes.

use crate::node::VertexInput;

/// Number of texture slots
pub const MAX_TEXTURES_COUNT: usize = 16;

/// Number of vertex-output (varying) slots
pub const MAX_VERTEX_OUTPUTS_COUNT: usize = 10;

/// Size of a persisted name field, including the terminating zero
pub const NAME_FIELD_SIZE: usize = 50;

/// Names and flags shared by both stages of a shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInterface {
    textures: [String; MAX_TEXTURES_COUNT],
    vertex_outputs: [String; MAX_VERTEX_OUTPUTS_COUNT],
    vertex_inputs: [bool; VertexInput::COUNT],
}

impl ShaderInterface {
    /// Create an interface with every slot empty
    pub fn new() -> Self {
        Self {
            textures: Default::default(),
            vertex_outputs: Default::default(),
            vertex_inputs: [false; VertexInput::COUNT],
        }
    }

    /// Empty every slot and disable every vertex input
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Name of a texture slot; empty when unused or out of range
    pub fn texture_name(&self, slot: usize) -> &str {
        self.textures.get(slot).map_or("", String::as_str)
    }

    /// Name a texture slot
    pub fn set_texture_name(&mut self, slot: usize, name: impl Into<String>) -> Result<(), InterfaceError> {
        let name = checked_name(name.into())?;
        let entry = self
            .textures
            .get_mut(slot)
            .ok_or(InterfaceError::SlotOutOfRange { slot, count: MAX_TEXTURES_COUNT })?;
        *entry = name;
        Ok(())
    }

    /// All texture slots, including empty ones
    pub fn textures(&self) -> &[String] {
        &self.textures
    }

    /// Non-empty texture slots with their index
    pub fn active_textures(&self) -> impl Iterator<Item = (usize, &str)> {
        active(&self.textures)
    }

    /// Name of a vertex-output slot; empty when unused or out of range
    pub fn vertex_output_name(&self, slot: usize) -> &str {
        self.vertex_outputs.get(slot).map_or("", String::as_str)
    }

    /// Name a vertex-output slot
    pub fn set_vertex_output_name(
        &mut self,
        slot: usize,
        name: impl Into<String>,
    ) -> Result<(), InterfaceError> {
        let name = checked_name(name.into())?;
        let entry = self
            .vertex_outputs
            .get_mut(slot)
            .ok_or(InterfaceError::SlotOutOfRange { slot, count: MAX_VERTEX_OUTPUTS_COUNT })?;
        *entry = name;
        Ok(())
    }

    /// All vertex-output slots, including empty ones
    pub fn vertex_outputs(&self) -> &[String] {
        &self.vertex_outputs
    }

    /// Non-empty vertex-output slots with their index
    pub fn active_vertex_outputs(&self) -> impl Iterator<Item = (usize, &str)> {
        active(&self.vertex_outputs)
    }

    /// Whether a vertex attribute is declared as a vertex-stage input
    pub fn is_vertex_input_enabled(&self, input: VertexInput) -> bool {
        self.vertex_inputs[input.index()]
    }

    /// Enable or disable a vertex attribute
    pub fn set_vertex_input_enabled(&mut self, input: VertexInput, enabled: bool) {
        self.vertex_inputs[input.index()] = enabled;
    }

    /// Enabled vertex attributes in declaration order
    pub fn enabled_vertex_inputs(&self) -> impl Iterator<Item = VertexInput> + '_ {
        VertexInput::ALL
            .into_iter()
            .filter(|input| self.is_vertex_input_enabled(*input))
    }

    /// Raw enable flags in declaration order
    pub fn vertex_input_flags(&self) -> &[bool; VertexInput::COUNT] {
        &self.vertex_inputs
    }

    pub(crate) fn set_vertex_input_flags(&mut self, flags: [bool; VertexInput::COUNT]) {
        self.vertex_inputs = flags;
    }
}

impl Default for ShaderInterface {
    fn default() -> Self {
        Self::new()
    }
}

fn active(names: &[String]) -> impl Iterator<Item = (usize, &str)> {
    names
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(slot, name)| (slot, name.as_str()))
}

fn checked_name(name: String) -> Result<String, InterfaceError> {
    if name.len() >= NAME_FIELD_SIZE {
        return Err(InterfaceError::NameTooLong(name));
    }
    if name.contains('\0') {
        return Err(InterfaceError::InvalidName(name));
    }
    Ok(name)
}

/// Error when editing the shader interface
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    /// Slot index beyond the slot count
    #[error("Slot {slot} out of range (0..{count})")]
    SlotOutOfRange {
        /// Requested slot
        slot: usize,
        /// Number of slots
        count: usize,
    },

    /// Name does not fit the persisted field
    #[error("Name too long: {0:?}")]
    NameTooLong(String),

    /// Name contains a zero byte
    #[error("Invalid name: {0:?}")]
    InvalidName(String),
}
