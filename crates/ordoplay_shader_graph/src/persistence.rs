// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary session format.
//!
//! Fields are written one by one in a fixed order with `bincode`'s
//! fixed-width little-endian encoding; names occupy zero-padded fields of
//! [`NAME_FIELD_SIZE`] bytes. The layout is:
//!
//! 1. texture slot names
//! 2. vertex-output names
//! 3. one byte per vertex input, enabled flag
//! 4. vertex node count, then each node (id, kind, position, payload)
//! 5. connections of each vertex node, in the same order
//! 6. steps 4 and 5 for the fragment graph

use crate::graph::{ShaderGraph, Stage};
use crate::interface::{ShaderInterface, NAME_FIELD_SIZE};
use crate::node::{BuiltinUniform, Node, NodeData, NodeId, NodeKind, PayloadError, VertexInput};
use crate::registry;
use crate::value_type::{PinDirection, ValueType};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Sentinel for an empty pin on disk
const NO_CONNECTION: i32 = -1;

/// Writes session fields to a byte stream
pub struct BlobWriter<W: Write> {
    writer: W,
}

impl<W: Write> BlobWriter<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write<T: Serialize>(&mut self, value: &T) -> Result<(), PersistenceError> {
        bincode::serialize_into(&mut self.writer, value)?;
        Ok(())
    }

    /// Write a 32-bit integer
    pub fn write_i32(&mut self, value: i32) -> Result<(), PersistenceError> {
        self.write(&value)
    }

    /// Write a 32-bit float
    pub fn write_f32(&mut self, value: f32) -> Result<(), PersistenceError> {
        self.write(&value)
    }

    /// Write a one-byte boolean
    pub fn write_bool(&mut self, value: bool) -> Result<(), PersistenceError> {
        self.write(&value)
    }

    /// Write an index as a 32-bit integer
    pub fn write_index(&mut self, value: usize) -> Result<(), PersistenceError> {
        let value = i32::try_from(value).map_err(|_| PersistenceError::IndexOverflow(value))?;
        self.write_i32(value)
    }

    /// Write a name into a zero-padded fixed-size field
    pub fn write_name(&mut self, name: &str) -> Result<(), PersistenceError> {
        let bytes = name.as_bytes();
        if bytes.len() >= NAME_FIELD_SIZE {
            return Err(PersistenceError::NameTooLong(name.to_string()));
        }
        let mut field = [0u8; NAME_FIELD_SIZE];
        field[..bytes.len()].copy_from_slice(bytes);
        self.writer.write_all(&field)?;
        Ok(())
    }
}

/// Reads session fields from a byte stream
pub struct BlobReader<R: Read> {
    reader: R,
}

impl<R: Read> BlobReader<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    fn read<T: DeserializeOwned>(&mut self) -> Result<T, PersistenceError> {
        Ok(bincode::deserialize_from(&mut self.reader)?)
    }

    /// Read a 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32, PersistenceError> {
        self.read()
    }

    /// Read a 32-bit float
    pub fn read_f32(&mut self) -> Result<f32, PersistenceError> {
        self.read()
    }

    /// Read a one-byte boolean
    pub fn read_bool(&mut self) -> Result<bool, PersistenceError> {
        self.read()
    }

    /// Read a non-negative 32-bit integer as an index
    pub fn read_index(&mut self) -> Result<usize, PersistenceError> {
        let raw = self.read_i32()?;
        usize::try_from(raw).map_err(|_| PersistenceError::NegativeIndex(raw))
    }

    /// Read a zero-padded fixed-size name field
    pub fn read_name(&mut self) -> Result<String, PersistenceError> {
        let mut field = [0u8; NAME_FIELD_SIZE];
        self.reader.read_exact(&mut field)?;
        let end = field.iter().position(|byte| *byte == 0).unwrap_or(NAME_FIELD_SIZE);
        String::from_utf8(field[..end].to_vec()).map_err(|_| PersistenceError::InvalidName)
    }
}

impl NodeData {
    /// Write the kind-specific payload; payload-less kinds write nothing
    pub fn save<W: Write>(&self, blob: &mut BlobWriter<W>) -> Result<(), PersistenceError> {
        match self {
            Self::VertexInput { input } => blob.write_index(input.index()),
            Self::VertexOutput { slot } => blob.write_index(*slot),
            Self::FragmentInput { attribute } => blob.write_index(*attribute),
            Self::FloatConst { value } => blob.write_f32(*value),
            Self::ColorConst { color } => color.iter().try_for_each(|c| blob.write_f32(*c)),
            Self::Sample { texture } => blob.write_index(*texture),
            Self::Uniform { name, value_type } => {
                blob.write_i32(value_type.to_raw())?;
                blob.write_name(name)
            }
            Self::BuiltinUniform { uniform } => blob.write_i32(uniform.to_raw()),
            Self::PositionOutput
            | Self::FragmentOutput
            | Self::Mix
            | Self::Vec4Merge
            | Self::Multiply => Ok(()),
        }
    }

    /// Read the payload written by [`NodeData::save`] into this variant
    pub fn load<R: Read>(&mut self, blob: &mut BlobReader<R>) -> Result<(), PersistenceError> {
        match self {
            Self::VertexInput { input } => {
                let raw = blob.read_i32()?;
                *input = VertexInput::from_raw(raw).ok_or(PersistenceError::UnknownVertexInput(raw))?;
            }
            Self::VertexOutput { slot } => *slot = blob.read_index()?,
            Self::FragmentInput { attribute } => *attribute = blob.read_index()?,
            Self::FloatConst { value } => *value = blob.read_f32()?,
            Self::ColorConst { color } => {
                for channel in color.iter_mut() {
                    *channel = blob.read_f32()?;
                }
            }
            Self::Sample { texture } => *texture = blob.read_index()?,
            Self::Uniform { name, value_type } => {
                let raw = blob.read_i32()?;
                *value_type = ValueType::from_raw(raw).ok_or(PersistenceError::UnknownValueType(raw))?;
                *name = blob.read_name()?;
            }
            Self::BuiltinUniform { uniform } => {
                let raw = blob.read_i32()?;
                *uniform =
                    BuiltinUniform::from_raw(raw).ok_or(PersistenceError::UnknownBuiltinUniform(raw))?;
            }
            Self::PositionOutput
            | Self::FragmentOutput
            | Self::Mix
            | Self::Vec4Merge
            | Self::Multiply => {}
        }
        Ok(())
    }
}

/// Write a node's id, kind, position and payload
pub fn save_node<W: Write>(blob: &mut BlobWriter<W>, node: &Node) -> Result<(), PersistenceError> {
    blob.write_i32(node.id.0)?;
    blob.write_i32(node.kind().to_raw())?;
    blob.write_f32(node.position[0])?;
    blob.write_f32(node.position[1])?;
    node.data().save(blob)
}

/// Write a node's pin table: per pin the peer id and the peer's pin index
pub fn save_node_connections<W: Write>(
    blob: &mut BlobWriter<W>,
    graph: &ShaderGraph,
    node_id: NodeId,
) -> Result<(), PersistenceError> {
    let node = graph.node(node_id).ok_or(PersistenceError::MissingNode(node_id))?;

    for direction in [PinDirection::Input, PinDirection::Output] {
        let count = node.pins(direction).len();
        blob.write_index(count)?;
        for pin in 0..count {
            match graph.peer(node_id, pin, direction) {
                Some((peer, peer_pin)) => {
                    blob.write_i32(peer.0)?;
                    blob.write_index(peer_pin)?;
                }
                None => {
                    blob.write_i32(NO_CONNECTION)?;
                    blob.write_i32(NO_CONNECTION)?;
                }
            }
        }
    }
    Ok(())
}

/// Read a node written by [`save_node`] and insert it, keeping its id
pub fn load_node<R: Read>(
    blob: &mut BlobReader<R>,
    graph: &mut ShaderGraph,
    stage: Stage,
) -> Result<NodeId, PersistenceError> {
    let id = NodeId(blob.read_i32()?);
    let raw_kind = blob.read_i32()?;
    let kind = NodeKind::from_raw(raw_kind).ok_or(PersistenceError::UnknownNodeKind(raw_kind))?;
    if id.0 <= 0 {
        return Err(PersistenceError::InvalidNodeId(id));
    }
    if graph.contains(id) {
        return Err(PersistenceError::DuplicateNode(id));
    }

    let mut node = registry::create_node(kind, id);
    node.position = [blob.read_f32()?, blob.read_f32()?];
    node.data_mut().load(blob)?;
    node.data().validate()?;
    graph.insert_node(node, stage);
    Ok(id)
}

/// Read a pin table written by [`save_node_connections`] and link both sides
///
/// Every referenced peer must already be in the graph. A link already made
/// from the peer's table is accepted when both slots point at each other;
/// any other occupied slot is an error. Returns the number of connected
/// pins the table lists.
pub fn load_node_connections<R: Read>(
    blob: &mut BlobReader<R>,
    graph: &mut ShaderGraph,
    node_id: NodeId,
) -> Result<usize, PersistenceError> {
    let mut connected = 0;

    for direction in [PinDirection::Input, PinDirection::Output] {
        let count = blob.read_index()?;
        let expected = graph
            .node(node_id)
            .ok_or(PersistenceError::MissingNode(node_id))?
            .pins(direction)
            .len();
        if count != expected {
            return Err(PersistenceError::PinCountMismatch {
                node: node_id,
                expected,
                found: count,
            });
        }

        for pin in 0..count {
            let peer_id = blob.read_i32()?;
            let peer_pin = blob.read_i32()?;
            if peer_id == NO_CONNECTION {
                continue;
            }

            let peer_id = NodeId(peer_id);
            let invalid = PersistenceError::InvalidConnection {
                node: node_id,
                peer: peer_id,
                pin: peer_pin,
            };
            let peer = graph.node(peer_id).ok_or(PersistenceError::MissingNode(peer_id))?;
            let Some(peer_pin) = usize::try_from(peer_pin)
                .ok()
                .filter(|pin| *pin < peer.pins(direction.opposite()).len())
            else {
                return Err(invalid);
            };
            if peer_id == node_id || graph.stage_of(peer_id) != graph.stage_of(node_id) {
                return Err(invalid);
            }

            let peer_slot = peer.pins(direction.opposite())[peer_pin];
            let own_slot = graph
                .node(node_id)
                .ok_or(PersistenceError::MissingNode(node_id))?
                .pins(direction)[pin];
            connected += 1;

            match (own_slot, peer_slot) {
                (Some(own), Some(back)) if own == peer_id && back == node_id => continue,
                (None, None) => {}
                _ => return Err(PersistenceError::AsymmetricConnections),
            }

            let (from, from_pin, to, to_pin) = match direction {
                PinDirection::Input => (peer_id, peer_pin, node_id, pin),
                PinDirection::Output => (node_id, pin, peer_id, peer_pin),
            };
            if graph.is_downstream(to, from) {
                return Err(PersistenceError::CycleDetected { from, to });
            }
            graph.attach(from, from_pin, to, to_pin);
        }
    }
    Ok(connected)
}

/// Serialize the interface and both graphs into a session blob
pub fn save_session(interface: &ShaderInterface, graph: &ShaderGraph) -> Result<Vec<u8>, PersistenceError> {
    let mut blob = BlobWriter::new(Vec::with_capacity(4096));

    for name in interface.textures() {
        blob.write_name(name)?;
    }
    for name in interface.vertex_outputs() {
        blob.write_name(name)?;
    }
    for enabled in interface.vertex_input_flags() {
        blob.write_bool(*enabled)?;
    }

    for stage in Stage::ALL {
        let stage_graph = graph.graph(stage);
        blob.write_index(stage_graph.node_count())?;
        for node in stage_graph.nodes() {
            save_node(&mut blob, node)?;
        }
        for node_id in stage_graph.node_ids() {
            save_node_connections(&mut blob, graph, node_id)?;
        }
    }

    Ok(blob.into_inner())
}

/// Restore a session blob into an empty graph and interface
pub fn load_session(
    data: &[u8],
    interface: &mut ShaderInterface,
    graph: &mut ShaderGraph,
) -> Result<(), PersistenceError> {
    let mut blob = BlobReader::new(data);

    for slot in 0..interface.textures().len() {
        let name = blob.read_name()?;
        interface
            .set_texture_name(slot, name)
            .map_err(|_| PersistenceError::InvalidName)?;
    }
    for slot in 0..interface.vertex_outputs().len() {
        let name = blob.read_name()?;
        interface
            .set_vertex_output_name(slot, name)
            .map_err(|_| PersistenceError::InvalidName)?;
    }
    let mut flags = [false; VertexInput::COUNT];
    for flag in &mut flags {
        *flag = blob.read_bool()?;
    }
    interface.set_vertex_input_flags(flags);

    let mut connected = 0;
    for stage in Stage::ALL {
        let count = blob.read_index()?;
        let mut loaded = Vec::with_capacity(count);
        for _ in 0..count {
            loaded.push(load_node(&mut blob, graph, stage)?);
        }
        for node_id in loaded {
            connected += load_node_connections(&mut blob, graph, node_id)?;
        }
    }

    // Each link is listed once by its source and once by its target.
    if connected != 2 * graph.connections().len() || !graph.is_symmetric() {
        return Err(PersistenceError::AsymmetricConnections);
    }
    Ok(())
}

/// Error while encoding or decoding session data
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Stream error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Field encoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// Unknown node kind tag
    #[error("Unknown node kind: {0}")]
    UnknownNodeKind(i32),

    /// Unknown vertex input tag
    #[error("Unknown vertex input: {0}")]
    UnknownVertexInput(i32),

    /// Unknown value type tag
    #[error("Unknown value type: {0}")]
    UnknownValueType(i32),

    /// Unknown builtin uniform tag
    #[error("Unknown builtin uniform: {0}")]
    UnknownBuiltinUniform(i32),

    /// Negative value where an index was expected
    #[error("Negative index: {0}")]
    NegativeIndex(i32),

    /// Index too large for the on-disk field
    #[error("Index does not fit the file format: {0}")]
    IndexOverflow(usize),

    /// Name does not fit its field
    #[error("Name too long: {0:?}")]
    NameTooLong(String),

    /// Name field is not valid
    #[error("Invalid name field")]
    InvalidName,

    /// Node id referenced but not present
    #[error("Node not found: {0}")]
    MissingNode(NodeId),

    /// Node id read twice
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// Node id outside the allocator's range
    #[error("Invalid node id: {0}")]
    InvalidNodeId(NodeId),

    /// Payload values the editor would refuse
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    /// Link would close a cycle
    #[error("Link from {from} to {to} closes a cycle")]
    CycleDetected {
        /// Source node
        from: NodeId,
        /// Target node
        to: NodeId,
    },

    /// Pin table does not match the node kind
    #[error("Node {node} has {expected} pins, file lists {found}")]
    PinCountMismatch {
        /// Node being restored
        node: NodeId,
        /// Pins of the node kind
        expected: usize,
        /// Pins in the file
        found: usize,
    },

    /// Pin tables disagree about who is linked to whom
    #[error("Connection tables are not symmetric")]
    AsymmetricConnections,

    /// Connection to a pin the peer does not have
    #[error("Invalid connection from node {node} to pin {pin} of node {peer}")]
    InvalidConnection {
        /// Node being restored
        node: NodeId,
        /// Peer node
        peer: NodeId,
        /// Peer pin index
        pin: i32,
    },
}
