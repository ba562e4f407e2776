//! Hashing utilities for registry nodes.
//!
//! Node identifiers follow the ENS namehash scheme so that nodes computed
//! here match the ones emitted by the registry contracts.

use alloy_primitives::{keccak256 as alloy_keccak256, B256};

use crate::types::Node;

/// Compute keccak256 hash of input data.
///
/// # Example
///
/// ```
/// use credgov_core::hashing::keccak256;
///
/// let hash = keccak256(b"hello");
/// assert_ne!(hash, alloy_primitives::B256::ZERO);
/// ```
pub fn keccak256(data: &[u8]) -> B256 {
    alloy_keccak256(data)
}

/// Hash of a single label, as stored in `NewOwner` events.
pub fn labelhash(label: &str) -> B256 {
    keccak256(label.as_bytes())
}

/// Node of a child: `keccak256(parentNode || labelhash)`.
///
/// The registry only records the label hash, so this is the only way to
/// get from a `NewOwner` event back to the child's node.
pub fn child_node(parent: &Node, label_hash: &B256) -> Node {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(parent.as_bytes());
    data[32..].copy_from_slice(label_hash.as_slice());

    Node::from(keccak256(&data))
}

/// Compute the namehash of a dot-separated name.
///
/// The empty name hashes to the zero node.
///
/// # Example
///
/// ```
/// use credgov_core::hashing::namehash;
///
/// let node = namehash("eth");
/// assert_eq!(
///     node.to_string(),
///     "0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
/// );
/// ```
pub fn namehash(name: &str) -> Node {
    if name.is_empty() {
        return Node::ROOT;
    }

    name.rsplit('.')
        .fold(Node::ROOT, |node, label| child_node(&node, &labelhash(label)))
}
