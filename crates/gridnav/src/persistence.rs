//! Reading and writing the binary node file.
//!
//! The layout is little-endian:
//!
//! ```text
//! int32   node_count
//! repeat node_count times:
//!   float64 x
//!   float64 y
//!   float64 z
//!   float64 cost
//! ```
//!
//! Passability is not stored; loaded nodes are always passable.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use bincode::config::{Configuration, Fixint, LittleEndian};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::Node;

/// The file name used for the nodes of the navmesh with the given ID.
pub fn node_file_name(id: i32) -> String {
    format!("{id}_nodes.nav")
}

fn file_config() -> Configuration<LittleEndian, Fixint> {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// One persisted node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// x-coordinate of the node position
    pub x: f64,
    /// y-coordinate of the node position
    pub y: f64,
    /// z-coordinate of the node position
    pub z: f64,
    /// The cost of the node
    pub cost: f64,
}

impl NodeRecord {
    /// The position stored in this record.
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            x: node.position.x as f64,
            y: node.position.y as f64,
            z: node.position.z as f64,
            cost: node.cost as f64,
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Node::new(record.position(), record.cost as f32)
    }
}

/// An owned copy of a navmesh's nodes, detached from the live graph so it can be written
/// from another thread while the graph keeps changing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeSnapshot {
    /// Where the snapshot will be written
    pub path: PathBuf,
    /// The nodes at the time the snapshot was taken
    pub records: Vec<NodeRecord>,
}

impl NodeSnapshot {
    /// Writes the snapshot to [`NodeSnapshot::path`].
    pub fn save(&self) -> Result<(), PersistenceError> {
        write_node_file(&self.path, &self.records)
    }
}

/// Writes `records` to `path`, creating the parent directory if needed.
pub fn write_node_file(path: &Path, records: &[NodeRecord]) -> Result<(), PersistenceError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    encode_nodes(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

/// Reads the node file at `path`.
/// Returns `Ok(None)` if there is no such file.
pub fn read_node_file(path: &Path) -> Result<Option<Vec<NodeRecord>>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = BufReader::new(File::open(path)?);
    decode_nodes(&mut reader).map(Some)
}

/// Encodes `records` in the node file layout.
pub fn encode_nodes(writer: &mut impl Write, records: &[NodeRecord]) -> Result<(), PersistenceError> {
    let count =
        i32::try_from(records.len()).map_err(|_| PersistenceError::TooManyNodes(records.len()))?;
    bincode::serde::encode_into_std_write(count, writer, file_config())?;
    for record in records {
        bincode::serde::encode_into_std_write(record, writer, file_config())?;
    }
    Ok(())
}

const MAX_PREALLOCATED_RECORDS: usize = 4096;

/// Decodes records in the node file layout.
pub fn decode_nodes(reader: &mut impl Read) -> Result<Vec<NodeRecord>, PersistenceError> {
    let count: i32 = bincode::serde::decode_from_std_read(reader, file_config())?;
    let count =
        usize::try_from(count).map_err(|_| PersistenceError::InvalidNodeCount(count))?;
    // The count comes from the file, so it only bounds the reads, not the allocation.
    let mut records = Vec::with_capacity(count.min(MAX_PREALLOCATED_RECORDS));
    for _ in 0..count {
        records.push(bincode::serde::decode_from_std_read(reader, file_config())?);
    }
    Ok(records)
}

/// Errors that can occur while persisting nodes.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The node file could not be accessed.
    #[error("Failed to access node file: {0}")]
    Io(#[from] std::io::Error),
    /// The nodes could not be encoded.
    #[error("Failed to encode nodes: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// The node file is truncated or malformed.
    #[error("Failed to decode nodes: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// The node file declares a negative node count.
    #[error("Invalid node count in node file: {0}")]
    InvalidNodeCount(i32),
    /// The node count does not fit the file's 32-bit counter.
    #[error("Too many nodes to persist: {0}")]
    TooManyNodes(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<NodeRecord> {
        vec![
            NodeRecord {
                x: 1.0,
                y: 2.5,
                z: -3.0,
                cost: 100.0,
            },
            NodeRecord {
                x: 0.0,
                y: 0.0,
                z: 7.0,
                cost: 1.0,
            },
        ]
    }

    #[test]
    fn layout_is_little_endian_fixed_width() {
        let mut bytes = Vec::new();
        encode_nodes(&mut bytes, &records()).unwrap();
        assert_eq!(bytes.len(), 4 + 2 * 4 * 8);
        assert_eq!(&bytes[..4], &2_i32.to_le_bytes());
        assert_eq!(&bytes[4..12], &1.0_f64.to_le_bytes());
        assert_eq!(&bytes[12..20], &2.5_f64.to_le_bytes());
        assert_eq!(&bytes[28..36], &100.0_f64.to_le_bytes());
    }

    #[test]
    fn decodes_handwritten_file() {
        let mut bytes = 1_i32.to_le_bytes().to_vec();
        for value in [4.0_f64, 0.5, 6.0, 42.0] {
            bytes.extend(value.to_le_bytes());
        }
        let decoded = decode_nodes(&mut bytes.as_slice()).unwrap();
        assert_eq!(
            decoded,
            vec![NodeRecord {
                x: 4.0,
                y: 0.5,
                z: 6.0,
                cost: 42.0
            }]
        );
    }

    #[test]
    fn rejects_negative_count() {
        let bytes = (-1_i32).to_le_bytes();
        let result = decode_nodes(&mut bytes.as_slice());
        assert!(matches!(result, Err(PersistenceError::InvalidNodeCount(-1))));
    }

    #[test]
    fn rejects_truncated_file() {
        let mut bytes = 2_i32.to_le_bytes().to_vec();
        bytes.extend(1.0_f64.to_le_bytes());
        assert!(decode_nodes(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn huge_count_in_short_file_is_a_decode_error() {
        let mut bytes = i32::MAX.to_le_bytes().to_vec();
        bytes.extend(1.0_f64.to_le_bytes());
        let result = decode_nodes(&mut bytes.as_slice());
        assert!(matches!(result, Err(PersistenceError::Decode(_))));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let path = std::env::temp_dir().join("gridnav_missing_dir/does_not_exist_nodes.nav");
        assert!(read_node_file(&path).unwrap().is_none());
    }

    #[test]
    fn file_name_follows_id() {
        assert_eq!(node_file_name(7), "7_nodes.nav");
        assert_eq!(node_file_name(-2), "-2_nodes.nav");
    }
}
