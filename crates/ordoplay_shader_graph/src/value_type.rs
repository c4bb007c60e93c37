// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value types carried by pins and pin directions.

use serde::{Deserialize, Serialize};

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

impl PinDirection {
    /// The direction of the matching pin on the peer node
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Data type that flows out of a node output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueType {
    /// Unknown, e.g. forwarded from an unconnected input
    #[default]
    None,
    /// Scalar float
    Float,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
    /// 4D vector / color
    Vec4,
    /// 3x3 matrix
    Mat3,
    /// 4x4 matrix
    Mat4,
}

impl ValueType {
    /// Types a uniform can be declared with
    pub const DECLARABLE: [ValueType; 6] = [
        Self::Float,
        Self::Vec2,
        Self::Vec3,
        Self::Vec4,
        Self::Mat3,
        Self::Mat4,
    ];

    /// GLSL spelling of the type, `None` has none
    pub fn glsl_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Float => Some("float"),
            Self::Vec2 => Some("vec2"),
            Self::Vec3 => Some("vec3"),
            Self::Vec4 => Some("vec4"),
            Self::Mat3 => Some("mat3"),
            Self::Mat4 => Some("mat4"),
        }
    }

    /// Type name used when a declaration has to be written regardless
    pub fn declaration_name(self) -> &'static str {
        self.glsl_name().unwrap_or("float")
    }

    /// Whether multiplication by this type needs the `mul` call form
    pub fn is_matrix(self) -> bool {
        matches!(self, Self::Mat3 | Self::Mat4)
    }

    /// Persisted integer tag
    pub fn to_raw(self) -> i32 {
        match self {
            Self::None => -1,
            Self::Float => 0,
            Self::Vec2 => 1,
            Self::Vec3 => 2,
            Self::Vec4 => 3,
            Self::Mat3 => 4,
            Self::Mat4 => 5,
        }
    }

    /// Decode a persisted integer tag
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            -1 => Some(Self::None),
            0 => Some(Self::Float),
            1 => Some(Self::Vec2),
            2 => Some(Self::Vec3),
            3 => Some(Self::Vec4),
            4 => Some(Self::Mat3),
            5 => Some(Self::Mat4),
            _ => None,
        }
    }
}
