//! Union-Find clustering and duplicate cluster resolution.
//!
//! Candidate pairs from LSH are verified against exact shingle-set Jaccard
//! similarity; verified pairs are unioned, and each connected component
//! becomes one duplicate cluster with exactly one retained representative.

use crate::lsh::DocId;
use crate::shingle::ShingleSet;
use rayon::prelude::*;
use std::collections::HashMap;

/// Union-Find (Disjoint Set Union) data structure.
///
/// Flat, index-backed: element `i` is the document at input position `i`.
/// Path compression plus union-by-size keep operations near-constant time.
#[derive(Clone, Debug)]
pub struct UnionFind {
    /// Parent pointers. parent[i] = j means i's parent is j.
    parent: Vec<usize>,
    /// Set size, valid only at roots.
    size: Vec<usize>,
}

impl UnionFind {
    /// Create a new Union-Find structure with n singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Find the root of the set containing x, compressing the path.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Union the sets containing x and y.
    ///
    /// The smaller set is attached under the root of the larger one.
    /// Returns true if x and y were in different sets (and are now merged).
    pub fn union(&mut self, x: usize, y: usize) -> bool {
        let rx = self.find(x);
        let ry = self.find(y);

        if rx == ry {
            return false;
        }

        let (big, small) = if self.size[rx] >= self.size[ry] {
            (rx, ry)
        } else {
            (ry, rx)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];

        true
    }

    /// Check if x and y are in the same set.
    pub fn connected(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }

    /// Get all clusters as a map from root -> members (ascending).
    #[must_use]
    pub fn clusters(&mut self) -> HashMap<usize, Vec<usize>> {
        let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..self.parent.len() {
            let root = self.find(i);
            clusters.entry(root).or_default().push(i);
        }
        clusters
    }

    /// Get clusters with more than one element (actual duplicate groups).
    #[must_use]
    pub fn duplicate_clusters(&mut self) -> HashMap<usize, Vec<usize>> {
        self.clusters()
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .collect()
    }

    /// Get the number of distinct sets.
    pub fn num_sets(&mut self) -> usize {
        (0..self.parent.len()).filter(|&i| self.find(i) == i).count()
    }

    /// Get the size of the set containing x.
    pub fn set_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }

    /// Get the total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Check if the structure is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Outcome of resolving candidate pairs into duplicate clusters.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Retained document positions, ascending (input order).
    pub keep: Vec<DocId>,
    /// Removed documents paired with the representative they collapsed into.
    pub removed: Vec<(DocId, DocId)>,
    /// Duplicate clusters keyed by representative; members ascending.
    pub clusters: HashMap<DocId, Vec<DocId>>,
    /// Candidate pairs examined.
    pub candidate_pairs: usize,
    /// Candidate pairs whose Jaccard similarity met the threshold.
    pub verified_pairs: usize,
}

/// Verify candidate pairs and resolve duplicate clusters.
///
/// `rank` orders the members of a cluster; the member with the lowest rank
/// is the representative. Pairs are verified in parallel, unions are applied
/// sequentially in pair order so the result is deterministic.
pub fn resolve<K, F>(
    candidate_pairs: &[(DocId, DocId)],
    shingle_sets: &[ShingleSet],
    jaccard_threshold: f64,
    rank: F,
) -> Resolution
where
    K: Ord,
    F: Fn(DocId) -> K,
{
    let verified: Vec<(DocId, DocId)> = candidate_pairs
        .par_iter()
        .copied()
        .filter(|&(a, b)| shingle_sets[a].jaccard(&shingle_sets[b]) >= jaccard_threshold)
        .collect();

    let mut uf = UnionFind::new(shingle_sets.len());
    for &(a, b) in &verified {
        uf.union(a, b);
    }

    let mut keep = Vec::with_capacity(shingle_sets.len());
    let mut removed = Vec::new();
    let mut clusters = HashMap::new();

    for (_, members) in uf.clusters() {
        let representative = members
            .iter()
            .copied()
            .min_by_key(|&m| rank(m))
            .unwrap_or(members[0]);

        keep.push(representative);
        if members.len() > 1 {
            removed.extend(
                members
                    .iter()
                    .filter(|&&m| m != representative)
                    .map(|&m| (m, representative)),
            );
            clusters.insert(representative, members);
        }
    }

    keep.sort_unstable();
    removed.sort_unstable();

    Resolution {
        keep,
        removed,
        clusters,
        candidate_pairs: candidate_pairs.len(),
        verified_pairs: verified.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shingle::shingles;

    #[test]
    fn test_find_initial() {
        let mut uf = UnionFind::new(5);
        for i in 0..5 {
            assert_eq!(uf.find(i), i);
        }
        assert_eq!(uf.len(), 5);
    }

    #[test]
    fn test_union_basic() {
        let mut uf = UnionFind::new(5);

        assert!(uf.union(0, 1));
        assert!(uf.connected(0, 1));
        assert!(!uf.union(1, 0));
    }

    #[test]
    fn test_union_chain() {
        let mut uf = UnionFind::new(5);

        uf.union(0, 1);
        uf.union(1, 2);

        assert!(uf.connected(0, 2));
        assert!(!uf.connected(0, 3));
        assert!(!uf.connected(0, 4));
    }

    #[test]
    fn test_num_sets_and_sizes() {
        let mut uf = UnionFind::new(5);
        assert_eq!(uf.num_sets(), 5);

        uf.union(0, 1);
        uf.union(2, 3);
        assert_eq!(uf.num_sets(), 3);

        uf.union(0, 2);
        assert_eq!(uf.num_sets(), 2);
        assert_eq!(uf.set_size(3), 4);
        assert_eq!(uf.set_size(4), 1);
    }

    #[test]
    fn test_duplicate_clusters() {
        let mut uf = UnionFind::new(6);

        uf.union(0, 1);
        uf.union(0, 2);
        uf.union(3, 4);

        assert_eq!(uf.clusters().len(), 3);

        let dup_clusters = uf.duplicate_clusters();
        assert_eq!(dup_clusters.len(), 2);
        for members in dup_clusters.values() {
            assert!(members.len() > 1);
        }
    }

    #[test]
    fn test_path_compression() {
        let mut uf = UnionFind::new(10);
        for i in 0..9 {
            uf.union(i, i + 1);
        }

        let root = uf.find(9);
        for i in 0..10 {
            uf.find(i);
            assert_eq!(uf.parent[i], root);
        }
    }

    #[test]
    fn test_empty_union_find() {
        let mut uf = UnionFind::new(0);
        assert!(uf.is_empty());
        assert_eq!(uf.num_sets(), 0);
        assert!(uf.clusters().is_empty());
    }

    #[test]
    fn test_large_union_find() {
        let n = 10_000;
        let mut uf = UnionFind::new(n);

        for i in (0..n - 2).step_by(2) {
            uf.union(i, i + 2);
        }
        for i in (1..n - 2).step_by(2) {
            uf.union(i, i + 2);
        }

        assert_eq!(uf.num_sets(), 2);
        assert!(uf.connected(0, 100));
        assert!(uf.connected(1, 101));
        assert!(!uf.connected(0, 1));
    }

    #[test]
    fn test_resolve_verifies_and_picks_lowest_rank() {
        let sets = vec![
            shingles("the quick brown fox jumps over the lazy dog", 3),
            shingles("completely unrelated sentence about rust compilers", 3),
            shingles("the quick brown fox jumps over the lazy dog", 3),
        ];
        let names = ["b.txt", "c.txt", "a.txt"];

        // (0, 1) is a false-positive candidate and must be rejected.
        let resolution = resolve(&[(0, 1), (0, 2)], &sets, 0.8, |i| names[i]);

        assert_eq!(resolution.candidate_pairs, 2);
        assert_eq!(resolution.verified_pairs, 1);
        // "a.txt" (position 2) is the lowest identifier in the cluster.
        assert_eq!(resolution.keep, vec![1, 2]);
        assert_eq!(resolution.removed, vec![(0, 2)]);
        assert_eq!(resolution.clusters[&2], vec![0, 2]);
    }

    #[test]
    fn test_resolve_transitive_cluster() {
        let sets: Vec<ShingleSet> = vec![
            (0u64..10).collect(),
            (1u64..11).collect(),
            (2u64..12).collect(),
        ];
        // sim(0,1) = sim(1,2) = 9/11, sim(0,2) = 8/12; chaining joins all three.
        let resolution = resolve(&[(0, 1), (1, 2)], &sets, 0.8, |i| i);

        assert_eq!(resolution.keep, vec![0]);
        assert_eq!(resolution.removed, vec![(1, 0), (2, 0)]);
        assert_eq!(resolution.clusters.len(), 1);
    }

    #[test]
    fn test_resolve_no_candidates_keeps_everything() {
        let sets = vec![ShingleSet::new(), shingles("alpha beta", 2)];
        let resolution = resolve(&[], &sets, 0.5, |i| i);
        assert_eq!(resolution.keep, vec![0, 1]);
        assert!(resolution.removed.is_empty());
        assert!(resolution.clusters.is_empty());
    }
}
