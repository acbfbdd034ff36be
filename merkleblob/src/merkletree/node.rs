//! Node records and their binary encoding.
//!
//! This is the only module that knows the slot wire layout described in
//! [`crate::def`]. Everything else works with [`RawNode`] values and the
//! 2-byte [`NodeMetadata`].
//!
//! The `index` field of a decoded node is not part of the encoding; it is
//! filled in from the slot position the bytes were read from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::def::{
    DATA_SIZE, INTERNAL_HASH_RANGE, KEY_RANGE, LEAF_HASH_RANGE, LEFT_RANGE, METADATA_SIZE,
    NULL_PARENT, PARENT_RANGE, RIGHT_RANGE, VALUE_RANGE,
};
use crate::error::{MerkleBlobError, Result};
use crate::utils::codec::{decode_be_u32, decode_be_u64, decode_hash, encode_be_u32, encode_be_u64};
use crate::utils::hasher::Hash32;

/// Address of a slot in the blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeIndex(pub u32);

impl TreeIndex {
    /// The "no parent" sentinel. Never addresses a slot.
    pub const NULL: TreeIndex = TreeIndex(NULL_PARENT);

    pub fn is_null(&self) -> bool {
        self.0 == NULL_PARENT
    }

    pub(crate) fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TreeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for TreeIndex {
    type Error = MerkleBlobError;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map(TreeIndex)
            .map_err(|_| MerkleBlobError::InvalidIndex(value))
    }
}

/// Opaque identifier of a key or a value in the outer store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KvId(pub u64);

impl fmt::Display for KvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which child of its parent a node is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    Internal = 0,
    Leaf = 1,
}

impl TryFrom<u8> for NodeType {
    type Error = MerkleBlobError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(NodeType::Internal),
            1 => Ok(NodeType::Leaf),
            other => Err(MerkleBlobError::UnknownNodeType(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeMetadata {
    pub node_type: NodeType,
    pub dirty: bool,
}

impl NodeMetadata {
    pub fn leaf() -> Self {
        Self {
            node_type: NodeType::Leaf,
            dirty: false,
        }
    }

    pub fn dirty_internal() -> Self {
        Self {
            node_type: NodeType::Internal,
            dirty: true,
        }
    }

    pub fn pack(&self) -> [u8; METADATA_SIZE] {
        [self.node_type as u8, self.dirty as u8]
    }

    pub fn unpack(blob: &[u8]) -> Result<Self> {
        if blob.len() < METADATA_SIZE {
            return Err(MerkleBlobError::ShortBuffer {
                expected: METADATA_SIZE,
                actual: blob.len(),
            });
        }
        let node_type = NodeType::try_from(blob[0])?;
        let dirty = match blob[1] {
            0 => false,
            1 => true,
            other => return Err(MerkleBlobError::UnknownDirtyValue(other)),
        };
        Ok(Self { node_type, dirty })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLeafNode {
    pub parent: TreeIndex,
    pub key: KvId,
    pub value: KvId,
    pub hash: Hash32,
    pub index: TreeIndex,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawInternalNode {
    pub parent: TreeIndex,
    pub left: TreeIndex,
    pub right: TreeIndex,
    pub hash: Hash32,
    pub index: TreeIndex,
}

impl RawInternalNode {
    /// Index of the child on `side`.
    pub fn child(&self, side: Side) -> TreeIndex {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Side `child` occupies under this node.
    pub fn side_of(&self, child: TreeIndex) -> Result<Side> {
        if child == self.left {
            Ok(Side::Left)
        } else if child == self.right {
            Ok(Side::Right)
        } else {
            Err(MerkleBlobError::IndexIsNotAChild {
                parent: self.index,
                child,
            })
        }
    }

    /// The child of this node that is not `child`.
    pub fn sibling_of(&self, child: TreeIndex) -> Result<TreeIndex> {
        Ok(self.child(self.side_of(child)?.other()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawNode {
    Internal(RawInternalNode),
    Leaf(RawLeafNode),
}

impl RawNode {
    pub fn parent(&self) -> TreeIndex {
        match self {
            RawNode::Internal(node) => node.parent,
            RawNode::Leaf(node) => node.parent,
        }
    }

    pub fn set_parent(&mut self, parent: TreeIndex) {
        match self {
            RawNode::Internal(node) => node.parent = parent,
            RawNode::Leaf(node) => node.parent = parent,
        }
    }

    pub fn hash(&self) -> Hash32 {
        match self {
            RawNode::Internal(node) => node.hash,
            RawNode::Leaf(node) => node.hash,
        }
    }

    pub fn index(&self) -> TreeIndex {
        match self {
            RawNode::Internal(node) => node.index,
            RawNode::Leaf(node) => node.index,
        }
    }

    pub fn set_index(&mut self, index: TreeIndex) {
        match self {
            RawNode::Internal(node) => node.index = index,
            RawNode::Leaf(node) => node.index = index,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            RawNode::Internal(_) => NodeType::Internal,
            RawNode::Leaf(_) => NodeType::Leaf,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, RawNode::Leaf(_))
    }

    pub fn into_leaf(self) -> Result<RawLeafNode> {
        match self {
            RawNode::Leaf(leaf) => Ok(leaf),
            RawNode::Internal(node) => Err(MerkleBlobError::NodeNotALeaf(node.index)),
        }
    }

    pub fn into_internal(self) -> Result<RawInternalNode> {
        match self {
            RawNode::Internal(node) => Ok(node),
            RawNode::Leaf(leaf) => Err(MerkleBlobError::NodeNotInternal(leaf.index)),
        }
    }
}

/// Encodes the payload of a node. The transient `index` is not written.
pub fn pack_raw_node(node: &RawNode) -> [u8; DATA_SIZE] {
    let mut blob = [0u8; DATA_SIZE];
    match node {
        RawNode::Internal(node) => {
            encode_be_u32(&mut blob[PARENT_RANGE], node.parent.0);
            encode_be_u32(&mut blob[LEFT_RANGE], node.left.0);
            encode_be_u32(&mut blob[RIGHT_RANGE], node.right.0);
            blob[INTERNAL_HASH_RANGE].copy_from_slice(&node.hash);
        }
        RawNode::Leaf(node) => {
            encode_be_u32(&mut blob[PARENT_RANGE], node.parent.0);
            encode_be_u64(&mut blob[KEY_RANGE], node.key.0);
            encode_be_u64(&mut blob[VALUE_RANGE], node.value.0);
            blob[LEAF_HASH_RANGE].copy_from_slice(&node.hash);
        }
    }
    blob
}

/// Decodes a payload read from slot `index`.
///
/// # Arguments
/// * `index` - Slot the payload came from, recorded in the result
/// * `metadata` - Metadata of the same slot, selects the variant
/// * `blob` - At least `DATA_SIZE` bytes; extra bytes are ignored
///
/// # Errors
/// `ShortBuffer` if `blob` is shorter than a payload
pub fn unpack_raw_node(index: TreeIndex, metadata: &NodeMetadata, blob: &[u8]) -> Result<RawNode> {
    if blob.len() < DATA_SIZE {
        return Err(MerkleBlobError::ShortBuffer {
            expected: DATA_SIZE,
            actual: blob.len(),
        });
    }
    let parent = TreeIndex(decode_be_u32(&blob[PARENT_RANGE]));
    let node = match metadata.node_type {
        NodeType::Internal => RawNode::Internal(RawInternalNode {
            parent,
            left: TreeIndex(decode_be_u32(&blob[LEFT_RANGE])),
            right: TreeIndex(decode_be_u32(&blob[RIGHT_RANGE])),
            hash: decode_hash(&blob[INTERNAL_HASH_RANGE]),
            index,
        }),
        NodeType::Leaf => RawNode::Leaf(RawLeafNode {
            parent,
            key: KvId(decode_be_u64(&blob[KEY_RANGE])),
            value: KvId(decode_be_u64(&blob[VALUE_RANGE])),
            hash: decode_hash(&blob[LEAF_HASH_RANGE]),
            index,
        }),
    };
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_bytes(range: std::ops::Range<u8>) -> Vec<u8> {
        range.collect()
    }

    fn hash_from(range: std::ops::Range<u8>) -> Hash32 {
        let mut h = [0u8; 32];
        h.copy_from_slice(&counting_bytes(range));
        h
    }

    #[test]
    fn test_internal_node_reference_encoding() {
        let node = RawNode::Internal(RawInternalNode {
            parent: TreeIndex(0x00010203),
            left: TreeIndex(0x04050607),
            right: TreeIndex(0x08090a0b),
            hash: hash_from(12..44),
            index: TreeIndex(0),
        });
        let packed = pack_raw_node(&node);
        let mut expected = counting_bytes(0..44);
        expected.extend_from_slice(&[0u8; 8]);
        assert_eq!(packed.to_vec(), expected);

        let metadata = NodeMetadata::dirty_internal();
        assert_eq!(unpack_raw_node(TreeIndex(0), &metadata, &packed).unwrap(), node);
    }

    #[test]
    fn test_leaf_node_reference_encoding() {
        let node = RawNode::Leaf(RawLeafNode {
            parent: TreeIndex(0x00010203),
            key: KvId(0x0405060708090a0b),
            value: KvId(0x0c0d0e0f10111213),
            hash: hash_from(20..52),
            index: TreeIndex(7),
        });
        let packed = pack_raw_node(&node);
        assert_eq!(packed.to_vec(), counting_bytes(0..52));
        assert_eq!(
            unpack_raw_node(TreeIndex(7), &NodeMetadata::leaf(), &packed).unwrap(),
            node
        );
    }

    #[test]
    fn test_zero_nodes() {
        let metadata = NodeMetadata::leaf();
        let zeros = [0u8; DATA_SIZE];
        let leaf = unpack_raw_node(TreeIndex(3), &metadata, &zeros).unwrap();
        assert_eq!(leaf.parent(), TreeIndex(0));
        assert_eq!(leaf.index(), TreeIndex(3));
        assert_eq!(pack_raw_node(&leaf), zeros);
    }

    #[test]
    fn test_reserved_bytes_ignored_on_read() {
        let mut packed = [0u8; DATA_SIZE];
        packed[44..].copy_from_slice(&[0xff; 8]);
        let node =
            unpack_raw_node(TreeIndex(0), &NodeMetadata::dirty_internal(), &packed).unwrap();
        assert_eq!(pack_raw_node(&node), [0u8; DATA_SIZE]);
    }

    #[test]
    fn test_short_buffer() {
        let err = unpack_raw_node(TreeIndex(0), &NodeMetadata::leaf(), &[0u8; 51]).unwrap_err();
        assert_eq!(
            err,
            MerkleBlobError::ShortBuffer {
                expected: 52,
                actual: 51
            }
        );
    }

    #[test]
    fn test_metadata() {
        for node_type in [NodeType::Internal, NodeType::Leaf] {
            for dirty in [false, true] {
                let metadata = NodeMetadata { node_type, dirty };
                assert_eq!(NodeMetadata::unpack(&metadata.pack()).unwrap(), metadata);
            }
        }
        assert_eq!(
            NodeMetadata::unpack(&[2, 0]).unwrap_err(),
            MerkleBlobError::UnknownNodeType(2)
        );
        assert_eq!(
            NodeMetadata::unpack(&[0, 2]).unwrap_err(),
            MerkleBlobError::UnknownDirtyValue(2)
        );
    }

    #[test]
    fn test_tree_index_from_i64() {
        assert_eq!(TreeIndex::try_from(-1i64).unwrap_err(), MerkleBlobError::InvalidIndex(-1));
        assert_eq!(TreeIndex::try_from(5i64).unwrap(), TreeIndex(5));
        assert!(TreeIndex::try_from(u32::MAX as i64).unwrap().is_null());
        assert!(TreeIndex::try_from(u32::MAX as i64 + 1).is_err());
    }

    #[test]
    fn test_sibling_of() {
        let node = RawInternalNode {
            parent: TreeIndex::NULL,
            left: TreeIndex(1),
            right: TreeIndex(2),
            hash: [0u8; 32],
            index: TreeIndex(0),
        };
        assert_eq!(node.sibling_of(TreeIndex(1)).unwrap(), TreeIndex(2));
        assert_eq!(node.sibling_of(TreeIndex(2)).unwrap(), TreeIndex(1));
        assert!(node.sibling_of(TreeIndex(3)).is_err());
    }
}
