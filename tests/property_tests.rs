//! Property-based tests for the asset ledger
//!
//! These tests verify invariants hold under random inputs.

use asset_ledger::core::Transaction;
use asset_ledger::crypto::{calculate_merkle_root, meets_difficulty};
use asset_ledger::mining::ProofOfWork;
use asset_ledger::network::BloomFilter;
use proptest::prelude::*;

// ============================================================================
// MERKLE COMMITMENT
// ============================================================================

proptest! {
    /// Same leaves, same root
    #[test]
    fn prop_merkle_root_deterministic(leaves in prop::collection::vec("[a-f0-9]{64}", 1..20)) {
        let a = calculate_merkle_root(&leaves);
        let b = calculate_merkle_root(&leaves);
        prop_assert_eq!(a.len(), 64);
        prop_assert_eq!(a, b);
    }

    /// Swapping two distinct leaves changes the root
    #[test]
    fn prop_merkle_root_order_sensitive(
        leaves in prop::collection::vec("[a-f0-9]{64}", 2..12),
        i in 0usize..12,
        j in 0usize..12,
    ) {
        let (i, j) = (i % leaves.len(), j % leaves.len());
        prop_assume!(leaves[i] != leaves[j]);

        let mut swapped = leaves.clone();
        swapped.swap(i, j);
        prop_assert_ne!(calculate_merkle_root(&leaves), calculate_merkle_root(&swapped));
    }
}

// ============================================================================
// BLOOM FILTER
// ============================================================================

proptest! {
    /// Everything added is reported as present
    #[test]
    fn prop_bloom_no_false_negatives(
        items in prop::collection::vec("[a-zA-Z0-9]{1,24}", 1..200),
        size in 64usize..4096,
        hash_count in 1u32..8,
    ) {
        let mut filter = BloomFilter::new(size, hash_count);
        for item in &items {
            filter.add(item);
        }
        for item in &items {
            prop_assert!(filter.check(item));
        }
    }
}

// ============================================================================
// PROOF OF WORK
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A found nonce produces a hash with the required prefix and verifies
    #[test]
    fn prop_pow_meets_difficulty(
        data in "[a-z0-9]{0,32}",
        prev in "[a-f0-9]{64}",
        cursor in 0u64..1_000,
        difficulty in 0usize..=2,
    ) {
        let pow = ProofOfWork::new(difficulty);
        let (nonce, hash) = pow.mine(cursor, &data, &prev);

        prop_assert!(nonce > cursor);
        prop_assert!(meets_difficulty(&hash, difficulty));
        prop_assert_eq!(&hash, &ProofOfWork::hash(&data, &prev, nonce));
        prop_assert!(pow.verify(&data, &prev, nonce, &hash));
    }
}

// ============================================================================
// TRANSACTION LINES
// ============================================================================

proptest! {
    /// A transfer either survives the line form exactly or is rejected up front
    #[test]
    fn prop_transfer_line_round_trip(
        asset in "\\PC{0,10}",
        from in "\\PC{0,10}",
        to in "\\PC{0,10}",
        meta in "\\PC{0,16}",
    ) {
        let tx = Transaction::transfer(asset, from, to, meta);
        match tx.check_fields() {
            Ok(()) => {
                let parsed: Transaction = tx.to_string().parse().unwrap();
                prop_assert_eq!(parsed, tx);
            }
            Err(_) => {
                prop_assert!(tx.to_string().parse::<Transaction>().map_or(true, |p| p != tx));
            }
        }
    }

    /// Separators inside fields never produce a silently different event
    #[test]
    fn prop_separators_never_reload_differently(
        asset in "[A-Z0-9]{1,6}",
        left in "[a-z]{1,6}",
        right in "[a-z]{1,6}",
        sep in prop::sample::select(vec![" | ", " -> ", "|", "->"]),
    ) {
        let to = format!("{}{}{}", left, sep, right);
        let tx = Transaction::transfer(asset, "Alice", to, "");
        prop_assert!(tx.check_fields().is_err());
        if let Ok(parsed) = tx.to_string().parse::<Transaction>() {
            prop_assert_ne!(parsed, tx);
        }
    }

    /// Changing any field changes the proof digest
    #[test]
    fn prop_proof_binds_fields(
        asset in "[A-Z0-9]{1,10}",
        owner in "[A-Za-z]{1,10}",
        suffix in "[a-z]{1,4}",
    ) {
        let tx = Transaction::create(asset.clone(), owner.clone(), "");
        let renamed = Transaction::create(format!("{}{}", asset, suffix), owner.clone(), "");
        let reowned = Transaction::create(asset, format!("{}{}", owner, suffix), "");

        prop_assert_ne!(tx.calculate_proof(), renamed.calculate_proof());
        prop_assert_ne!(tx.calculate_proof(), reowned.calculate_proof());
    }
}
