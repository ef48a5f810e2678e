//! A compact, append-only Merkle accumulator. Internally this keeps the
//! "frozen subtree roots" — one interior hash per set bit of the leaf
//! count — the same representation the source codebase's in-memory
//! accumulator uses, generalized here into a single concrete
//! implementation over raw 32-byte leaves rather than a hasher-generic
//! one, since this crate only ever accumulates leaf hashes.
//!
//! Proof generation additionally needs the full leaf history (the
//! frozen roots alone cannot reconstruct the internal structure of a
//! multi-leaf peak), so `MerkleAccumulator` retains every leaf appended
//! to it; callers that only need `root()` may discard old leaves by
//! serializing just the frozen roots via `snapshot()` and restoring with
//! [`MerkleAccumulator::from_snapshot_and_leaves`].

use anyhow::{ensure, Result};
use node_crypto::HashValue;
use serde::{Deserialize, Serialize};

/// A single step of an inclusion proof: the sibling hash and whether
/// that sibling sits to the left of the accumulated hash at this level.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: HashValue,
    pub sibling_is_left: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub steps: Vec<ProofStep>,
}

impl InclusionProof {
    /// Recomputes the root implied by `leaf` and this proof.
    pub fn verify(&self, leaf: HashValue, expected_root: HashValue) -> bool {
        let mut acc = leaf;
        for step in &self.steps {
            acc = if step.sibling_is_left {
                HashValue::combine(&step.sibling, &acc)
            } else {
                HashValue::combine(&acc, &step.sibling)
            };
        }
        acc == expected_root
    }
}

/// One frozen interior root, paired with the power-of-two size of the
/// perfect subtree it roots.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
struct Peak {
    level: u32,
    hash: HashValue,
}

#[derive(Clone, Debug, Default)]
pub struct MerkleAccumulator {
    leaves: Vec<HashValue>,
    peaks: Vec<Peak>,
}

/// The serializable compact state: leaf count plus frozen subtree roots.
/// This is what gets persisted as the accumulator snapshot; the raw
/// leaves are persisted separately in an append-only leaf store.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub num_leaves: u64,
    pub frozen_subtree_roots: Vec<HashValue>,
}

impl MerkleAccumulator {
    pub fn new() -> Self {
        Self {
            leaves: Vec::new(),
            peaks: Vec::new(),
        }
    }

    pub fn num_leaves(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn append(&mut self, leaf: HashValue) {
        self.leaves.push(leaf);
        Self::merge_in(&mut self.peaks, Peak { level: 0, hash: leaf });
    }

    fn merge_in(peaks: &mut Vec<Peak>, mut new_peak: Peak) {
        while let Some(top) = peaks.last() {
            if top.level == new_peak.level {
                let top = peaks.pop().expect("checked non-empty");
                new_peak = Peak {
                    level: top.level + 1,
                    hash: HashValue::combine(&top.hash, &new_peak.hash),
                };
            } else {
                break;
            }
        }
        peaks.push(new_peak);
    }

    /// The root of the current accumulator. Folds the peaks right to
    /// left: the rightmost (smallest) peak seeds the accumulator and
    /// each earlier (larger) peak becomes its left sibling.
    pub fn root(&self) -> HashValue {
        Self::fold_peaks(&self.peaks)
    }

    fn fold_peaks(peaks: &[Peak]) -> HashValue {
        match peaks.split_last() {
            None => HashValue::zero(),
            Some((last, rest)) => {
                let mut acc = last.hash;
                for peak in rest.iter().rev() {
                    acc = HashValue::combine(&peak.hash, &acc);
                }
                acc
            }
        }
    }

    /// Pure variant of `append` + `root`: does not mutate `self`.
    pub fn root_with_new_leaf(&self, leaf: HashValue) -> HashValue {
        let mut peaks = self.peaks.clone();
        Self::merge_in(&mut peaks, Peak { level: 0, hash: leaf });
        Self::fold_peaks(&peaks)
    }

    /// The full raw leaf history, for persisting the append-only leaf
    /// store alongside the compact snapshot.
    pub fn leaves_snapshot(&self) -> Vec<HashValue> {
        self.leaves.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            num_leaves: self.num_leaves(),
            frozen_subtree_roots: self.peaks.iter().map(|p| p.hash).collect(),
        }
    }

    /// Rebuilds an accumulator from a persisted snapshot and the raw
    /// leaf store, verifying the two agree (see `InconsistentMerkle` in
    /// the error taxonomy this guards against).
    pub fn from_snapshot_and_leaves(snapshot: &Snapshot, leaves: Vec<HashValue>) -> Result<Self> {
        ensure!(
            leaves.len() as u64 == snapshot.num_leaves,
            "leaf store has {} leaves but snapshot expects {}",
            leaves.len(),
            snapshot.num_leaves
        );
        let mut acc = Self::new();
        for leaf in &leaves {
            acc.append(*leaf);
        }
        let rebuilt: Vec<HashValue> = acc.peaks.iter().map(|p| p.hash).collect();
        ensure!(
            rebuilt == snapshot.frozen_subtree_roots,
            "frozen subtree roots do not match replayed leaves"
        );
        Ok(acc)
    }

    /// The inclusion proof for the leaf at `leaf_index` against the
    /// accumulator's state when it had `root_height` leaves.
    /// `root_height` must be strictly greater than `leaf_index` and at
    /// most the number of leaves this accumulator currently holds.
    pub fn inclusion_proof(&self, leaf_index: u64, root_height: u64) -> Result<InclusionProof> {
        ensure!(
            leaf_index < root_height,
            "leaf_index {} must be less than root_height {}",
            leaf_index,
            root_height
        );
        ensure!(
            root_height <= self.num_leaves(),
            "root_height {} exceeds accumulator size {}",
            root_height,
            self.num_leaves()
        );
        let leaves = &self.leaves[..root_height as usize];
        let mut steps = Vec::new();
        Self::build_proof(leaves, leaf_index as usize, &mut steps);
        Ok(InclusionProof { steps })
    }

    fn subtree_hash(leaves: &[HashValue]) -> HashValue {
        match leaves.len() {
            0 => HashValue::zero(),
            1 => leaves[0],
            n => {
                let k = largest_power_of_two_less_than(n);
                let left = Self::subtree_hash(&leaves[..k]);
                let right = Self::subtree_hash(&leaves[k..]);
                HashValue::combine(&left, &right)
            }
        }
    }

    /// Builds the proof bottom-up: recurse first, then push this
    /// level's sibling, so `steps` ends up ordered leaf-to-root.
    fn build_proof(leaves: &[HashValue], index: usize, steps: &mut Vec<ProofStep>) {
        let n = leaves.len();
        if n <= 1 {
            return;
        }
        let k = largest_power_of_two_less_than(n);
        if index < k {
            Self::build_proof(&leaves[..k], index, steps);
            steps.push(ProofStep {
                sibling: Self::subtree_hash(&leaves[k..]),
                sibling_is_left: false,
            });
        } else {
            Self::build_proof(&leaves[k..], index - k, steps);
            steps.push(ProofStep {
                sibling: Self::subtree_hash(&leaves[..k]),
                sibling_is_left: true,
            });
        }
    }
}

/// The largest power of two strictly less than `n` (n must be >= 2).
fn largest_power_of_two_less_than(n: usize) -> usize {
    debug_assert!(n >= 2);
    let mut k = 1usize;
    while k * 2 < n {
        k *= 2;
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(b: u8) -> HashValue {
        HashValue::sha256(&[b])
    }

    #[test]
    fn three_leaf_root_matches_hand_computed_value() {
        let mut acc = MerkleAccumulator::new();
        acc.append(leaf(1));
        assert_eq!(acc.num_leaves(), 1);
        acc.append(leaf(2));
        assert_eq!(acc.num_leaves(), 2);
        acc.append(leaf(3));
        assert_eq!(acc.num_leaves(), 3);

        let expected = HashValue::combine(&HashValue::combine(&leaf(1), &leaf(2)), &leaf(3));
        assert_eq!(acc.root(), expected);
    }

    #[test]
    fn root_with_new_leaf_does_not_mutate() {
        let mut acc = MerkleAccumulator::new();
        acc.append(leaf(1));
        acc.append(leaf(2));
        let before = acc.num_leaves();
        let pure_root = acc.root_with_new_leaf(leaf(3));
        assert_eq!(acc.num_leaves(), before);
        acc.append(leaf(3));
        assert_eq!(acc.root(), pure_root);
    }

    #[test]
    fn inclusion_proof_rejects_proof_height_equal_to_root_height() {
        let mut acc = MerkleAccumulator::new();
        acc.append(leaf(1));
        assert!(acc.inclusion_proof(0, 0).is_err());
    }

    #[test]
    fn single_element_proof_equals_sibling() {
        let mut acc = MerkleAccumulator::new();
        acc.append(leaf(1));
        acc.append(leaf(2));
        let proof = acc.inclusion_proof(0, 2).unwrap();
        assert_eq!(proof.steps.len(), 1);
        assert_eq!(proof.steps[0].sibling, leaf(2));
        assert!(proof.verify(leaf(1), acc.root()));
    }

    #[test]
    fn proofs_verify_for_every_leaf_in_an_odd_sized_tree() {
        let mut acc = MerkleAccumulator::new();
        for i in 0..7u8 {
            acc.append(leaf(i));
        }
        let root = acc.root();
        for i in 0..7u64 {
            let proof = acc.inclusion_proof(i, 7).unwrap();
            assert!(proof.verify(leaf(i as u8), root), "leaf {} failed", i);
        }
    }

    #[test]
    fn snapshot_round_trip_rebuilds_identical_accumulator() {
        let mut acc = MerkleAccumulator::new();
        for i in 0..5u8 {
            acc.append(leaf(i));
        }
        let snapshot = acc.snapshot();
        let leaves: Vec<HashValue> = (0..5u8).map(leaf).collect();
        let rebuilt = MerkleAccumulator::from_snapshot_and_leaves(&snapshot, leaves).unwrap();
        assert_eq!(rebuilt.root(), acc.root());
        assert_eq!(rebuilt.root_with_new_leaf(leaf(9)), acc.root_with_new_leaf(leaf(9)));
    }

    #[test]
    fn snapshot_mismatch_is_rejected() {
        let mut acc = MerkleAccumulator::new();
        acc.append(leaf(1));
        let snapshot = acc.snapshot();
        let wrong_leaves = vec![leaf(2)];
        assert!(MerkleAccumulator::from_snapshot_and_leaves(&snapshot, wrong_leaves).is_err());
    }

    proptest::proptest! {
        #[test]
        fn root_is_insensitive_to_how_it_was_built(n in 1usize..40) {
            let leaves: Vec<HashValue> = (0..n).map(|i| leaf(i as u8)).collect();
            let mut acc = MerkleAccumulator::new();
            for l in &leaves {
                acc.append(*l);
            }
            let direct = MerkleAccumulator::subtree_hash(&leaves);
            proptest::prop_assert_eq!(acc.root(), direct);
        }
    }
}
