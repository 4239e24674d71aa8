//! Merkle commitment over transaction proof digests
//!
//! Leaves and inner nodes are hex digests. An odd level always duplicates its
//! last element; existing chain data depends on that tie-break.

use super::hash::sha256_hex;

/// Calculate the merkle root from a list of hex-encoded leaf digests
///
/// Returns an empty string when there are no leaves.
pub fn calculate_merkle_root(leaves: &[String]) -> String {
    if leaves.is_empty() {
        return String::new();
    }

    let mut current_level: Vec<String> = leaves.to_vec();

    while current_level.len() > 1 {
        if current_level.len() % 2 == 1 {
            if let Some(last) = current_level.last().cloned() {
                current_level.push(last);
            }
        }

        current_level = current_level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }

    current_level.remove(0)
}

fn hash_pair(left: &str, right: &str) -> String {
    let mut data = String::with_capacity(left.len() + right.len());
    data.push_str(left);
    data.push_str(right);
    sha256_hex(data.as_bytes())
}
