// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the shader graph.

use crate::interface::NAME_FIELD_SIZE;
use crate::value_type::{PinDirection, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node, shared by both stage graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub i32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Vertex attribute read
    VertexInput,
    /// Write to a varying
    VertexOutput,
    /// Write to `gl_Position`
    PositionOutput,
    /// Varying read in the fragment stage
    FragmentInput,
    /// Write to `gl_FragColor`
    FragmentOutput,
    /// Scalar constant
    FloatConst,
    /// RGBA constant
    ColorConst,
    /// Texture lookup
    Sample,
    /// Linear interpolation
    Mix,
    /// User uniform declaration
    Uniform,
    /// Vector assembly from components
    Vec4Merge,
    /// Product of two values
    Multiply,
    /// Engine-provided uniform
    BuiltinUniform,
}

impl NodeKind {
    /// All kinds in persisted tag order
    pub const ALL: [NodeKind; 13] = [
        Self::VertexInput,
        Self::VertexOutput,
        Self::PositionOutput,
        Self::FragmentInput,
        Self::FragmentOutput,
        Self::FloatConst,
        Self::ColorConst,
        Self::Sample,
        Self::Mix,
        Self::Uniform,
        Self::Vec4Merge,
        Self::Multiply,
        Self::BuiltinUniform,
    ];

    /// Persisted integer tag
    pub fn to_raw(self) -> i32 {
        Self::ALL
            .iter()
            .position(|kind| *kind == self)
            .map_or(-1, |index| index as i32)
    }

    /// Decode a persisted integer tag
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|index| Self::ALL.get(index).copied())
    }

    /// Number of input pins
    pub fn input_count(self) -> usize {
        match self {
            Self::VertexOutput | Self::PositionOutput | Self::FragmentOutput | Self::Sample => 1,
            Self::Multiply => 2,
            Self::Mix => 3,
            Self::Vec4Merge => 5,
            Self::VertexInput
            | Self::FragmentInput
            | Self::FloatConst
            | Self::ColorConst
            | Self::Uniform
            | Self::BuiltinUniform => 0,
        }
    }

    /// Number of output pins
    pub fn output_count(self) -> usize {
        if self.is_terminal() {
            0
        } else {
            1
        }
    }

    /// Terminal nodes are the roots of code generation
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::VertexOutput | Self::PositionOutput | Self::FragmentOutput
        )
    }
}

/// Vertex attributes a vertex shader can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VertexInput {
    /// Object-space position
    #[default]
    Position,
    /// Normal vector
    Normal,
    /// Vertex color
    Color,
    /// Tangent vector
    Tangent,
    /// First texture coordinate set
    TexCoord0,
    /// Instance data row 0
    InstanceData0,
    /// Instance data row 1
    InstanceData1,
    /// Instance data row 2
    InstanceData2,
    /// Instance data row 3
    InstanceData3,
}

impl VertexInput {
    /// Number of vertex inputs
    pub const COUNT: usize = 9;

    /// All vertex inputs in declaration order
    pub const ALL: [VertexInput; Self::COUNT] = [
        Self::Position,
        Self::Normal,
        Self::Color,
        Self::Tangent,
        Self::TexCoord0,
        Self::InstanceData0,
        Self::InstanceData1,
        Self::InstanceData2,
        Self::InstanceData3,
    ];

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::Position => "Position",
            Self::Normal => "Normal",
            Self::Color => "Color",
            Self::Tangent => "Tangent",
            Self::TexCoord0 => "Texture coord 0",
            Self::InstanceData0 => "Instance data 0",
            Self::InstanceData1 => "Instance data 1",
            Self::InstanceData2 => "Instance data 2",
            Self::InstanceData3 => "Instance data 3",
        }
    }

    /// Attribute name in generated source
    pub fn attribute_name(self) -> &'static str {
        match self {
            Self::Position => "a_position",
            Self::Normal => "a_normal",
            Self::Color => "a_color",
            Self::Tangent => "a_tangent",
            Self::TexCoord0 => "a_texcoord0",
            Self::InstanceData0 => "i_data0",
            Self::InstanceData1 => "i_data1",
            Self::InstanceData2 => "i_data2",
            Self::InstanceData3 => "i_data3",
        }
    }

    /// Attribute type
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Normal | Self::Tangent => ValueType::Vec3,
            _ => ValueType::Vec4,
        }
    }

    /// Index into [`Self::ALL`]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|input| *input == self).unwrap_or(0)
    }

    /// Decode a persisted index
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|index| Self::ALL.get(index).copied())
    }
}

/// Uniforms supplied by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuiltinUniform {
    /// Model matrix
    #[default]
    ModelMatrix,
    /// Combined view and projection matrix
    ViewProjection,
}

impl BuiltinUniform {
    /// All builtin uniforms
    pub const ALL: [BuiltinUniform; 2] = [Self::ModelMatrix, Self::ViewProjection];

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::ModelMatrix => "Model",
            Self::ViewProjection => "View & Projection",
        }
    }

    /// Symbol name in generated source
    pub fn symbol(self) -> &'static str {
        match self {
            Self::ModelMatrix => "u_model[0]",
            Self::ViewProjection => "u_viewProj",
        }
    }

    /// Uniform type
    pub fn value_type(self) -> ValueType {
        ValueType::Mat4
    }

    /// Persisted integer tag
    pub fn to_raw(self) -> i32 {
        match self {
            Self::ModelMatrix => 0,
            Self::ViewProjection => 1,
        }
    }

    /// Decode a persisted integer tag
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|index| Self::ALL.get(index).copied())
    }
}

/// Kind-specific payload of a node; the variant determines the kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    /// Reads a vertex attribute
    VertexInput {
        /// Attribute read
        input: VertexInput,
    },
    /// Writes a varying
    VertexOutput {
        /// Vertex-output slot written
        slot: usize,
    },
    /// Writes `gl_Position`
    PositionOutput,
    /// Reads a varying
    FragmentInput {
        /// Vertex-output slot read
        attribute: usize,
    },
    /// Writes `gl_FragColor`
    FragmentOutput,
    /// Scalar constant
    FloatConst {
        /// Constant value
        value: f32,
    },
    /// RGBA constant
    ColorConst {
        /// Constant color
        color: [f32; 4],
    },
    /// Samples a texture slot
    Sample {
        /// Texture slot sampled
        texture: usize,
    },
    /// `mix(a, b, weight)`
    Mix,
    /// Declares a uniform
    Uniform {
        /// Uniform name
        name: String,
        /// Declared type
        value_type: ValueType,
    },
    /// Assembles a `vec4`
    Vec4Merge,
    /// `a * b` or `mul(a, b)`
    Multiply,
    /// Engine uniform reference
    BuiltinUniform {
        /// Referenced uniform
        uniform: BuiltinUniform,
    },
}

impl NodeData {
    /// Default payload for a kind
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::VertexInput => Self::VertexInput {
                input: VertexInput::default(),
            },
            NodeKind::VertexOutput => Self::VertexOutput { slot: 0 },
            NodeKind::PositionOutput => Self::PositionOutput,
            NodeKind::FragmentInput => Self::FragmentInput { attribute: 0 },
            NodeKind::FragmentOutput => Self::FragmentOutput,
            NodeKind::FloatConst => Self::FloatConst { value: 0.0 },
            NodeKind::ColorConst => Self::ColorConst { color: [0.0; 4] },
            NodeKind::Sample => Self::Sample { texture: 0 },
            NodeKind::Mix => Self::Mix,
            NodeKind::Uniform => Self::Uniform {
                name: String::new(),
                value_type: ValueType::Vec4,
            },
            NodeKind::Vec4Merge => Self::Vec4Merge,
            NodeKind::Multiply => Self::Multiply,
            NodeKind::BuiltinUniform => Self::BuiltinUniform {
                uniform: BuiltinUniform::default(),
            },
        }
    }

    /// Kind this payload belongs to
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::VertexInput { .. } => NodeKind::VertexInput,
            Self::VertexOutput { .. } => NodeKind::VertexOutput,
            Self::PositionOutput => NodeKind::PositionOutput,
            Self::FragmentInput { .. } => NodeKind::FragmentInput,
            Self::FragmentOutput => NodeKind::FragmentOutput,
            Self::FloatConst { .. } => NodeKind::FloatConst,
            Self::ColorConst { .. } => NodeKind::ColorConst,
            Self::Sample { .. } => NodeKind::Sample,
            Self::Mix => NodeKind::Mix,
            Self::Uniform { .. } => NodeKind::Uniform,
            Self::Vec4Merge => NodeKind::Vec4Merge,
            Self::Multiply => NodeKind::Multiply,
            Self::BuiltinUniform { .. } => NodeKind::BuiltinUniform,
        }
    }

    /// Check that constants are finite and uniform names fit a name field
    pub fn validate(&self) -> Result<(), PayloadError> {
        match self {
            Self::FloatConst { value } if !value.is_finite() => Err(PayloadError::NonFinite(*value)),
            Self::ColorConst { color } => match color.iter().find(|c| !c.is_finite()) {
                Some(channel) => Err(PayloadError::NonFinite(*channel)),
                None => Ok(()),
            },
            Self::Uniform { name, .. } if name.len() >= NAME_FIELD_SIZE || name.contains('\0') => {
                Err(PayloadError::InvalidName(name.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// A node instance in one of the stage graphs
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Position in the graph UI
    pub position: [f32; 2],
    data: NodeData,
    pub(crate) inputs: Vec<Option<NodeId>>,
    pub(crate) outputs: Vec<Option<NodeId>>,
}

impl Node {
    /// Create an unconnected node with the default payload for `kind`
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            position: [0.0, 0.0],
            data: NodeData::default_for(kind),
            inputs: vec![None; kind.input_count()],
            outputs: vec![None; kind.output_count()],
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Node kind
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    /// Kind-specific payload
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Replace the payload, keeping the kind (and so the pin layout) fixed
    pub fn set_data(&mut self, data: NodeData) -> Result<(), PayloadError> {
        if data.kind() != self.kind() {
            return Err(PayloadError::KindMismatch {
                expected: self.kind(),
                found: data.kind(),
            });
        }
        data.validate()?;
        self.data = data;
        Ok(())
    }

    pub(crate) fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    /// Peer connected to an input pin
    pub fn input(&self, index: usize) -> Option<NodeId> {
        self.inputs.get(index).copied().flatten()
    }

    /// Peer connected to an output pin
    pub fn output(&self, index: usize) -> Option<NodeId> {
        self.outputs.get(index).copied().flatten()
    }

    /// Input pin slots
    pub fn inputs(&self) -> &[Option<NodeId>] {
        &self.inputs
    }

    /// Output pin slots
    pub fn outputs(&self) -> &[Option<NodeId>] {
        &self.outputs
    }

    /// Pin slots in one direction
    pub fn pins(&self, direction: PinDirection) -> &[Option<NodeId>] {
        match direction {
            PinDirection::Input => &self.inputs,
            PinDirection::Output => &self.outputs,
        }
    }

    pub(crate) fn pins_mut(&mut self, direction: PinDirection) -> &mut [Option<NodeId>] {
        match direction {
            PinDirection::Input => &mut self.inputs,
            PinDirection::Output => &mut self.outputs,
        }
    }

    /// Whether any pin is connected
    pub fn is_connected(&self) -> bool {
        self.inputs.iter().chain(self.outputs.iter()).any(Option::is_some)
    }
}

/// Payload rejected by a node
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Payload of another kind
    #[error("Cannot store {found:?} payload in a {expected:?} node")]
    KindMismatch {
        /// Kind of the node
        expected: NodeKind,
        /// Kind of the rejected payload
        found: NodeKind,
    },

    /// NaN or infinite constant
    #[error("Constant {0} is not finite")]
    NonFinite(f32),

    /// Uniform name too long for its field or containing a NUL byte
    #[error("Invalid uniform name: {0:?}")]
    InvalidName(String),
}
