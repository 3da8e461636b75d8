//! Agglomerative clustering with Lance-Williams distance updates.

use clap::ValueEnum;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Rule for the distance between a merged cluster and the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkageMethod {
    /// Mean pairwise distance (UPGMA).
    #[default]
    Average,
    /// Farthest pair.
    Complete,
    /// Nearest pair.
    Single,
    /// Mean of the two merged clusters' distances (WPGMA).
    Weighted,
    /// Distance between centroids (UPGMC).
    Centroid,
    /// Distance between medians (WPGMC).
    Median,
    /// Minimum variance increase.
    Ward,
}

impl LinkageMethod {
    /// Centroid, median and Ward updates are only meaningful on Euclidean
    /// distances.
    pub fn requires_euclidean(&self) -> bool {
        matches!(
            self,
            LinkageMethod::Centroid | LinkageMethod::Median | LinkageMethod::Ward
        )
    }

    /// Distance from the cluster formed by merging `x` and `y` to cluster `i`.
    fn update(&self, d_xi: f64, d_yi: f64, d_xy: f64, n_x: f64, n_y: f64, n_i: f64) -> f64 {
        match self {
            LinkageMethod::Single => d_xi.min(d_yi),
            LinkageMethod::Complete => d_xi.max(d_yi),
            LinkageMethod::Average => (n_x * d_xi + n_y * d_yi) / (n_x + n_y),
            LinkageMethod::Weighted => (d_xi + d_yi) / 2.0,
            LinkageMethod::Centroid => {
                let n = n_x + n_y;
                let sq = (n_x * d_xi * d_xi + n_y * d_yi * d_yi) / n - n_x * n_y * d_xy * d_xy / (n * n);
                sq.max(0.0).sqrt()
            }
            LinkageMethod::Median => {
                let sq = d_xi * d_xi / 2.0 + d_yi * d_yi / 2.0 - d_xy * d_xy / 4.0;
                sq.max(0.0).sqrt()
            }
            LinkageMethod::Ward => {
                let t = n_x + n_y + n_i;
                let sq = ((n_i + n_x) * d_xi * d_xi + (n_i + n_y) * d_yi * d_yi - n_i * d_xy * d_xy) / t;
                sq.max(0.0).sqrt()
            }
        }
    }
}

/// One agglomeration step.
///
/// Cluster ids below the number of leaves are observations; the cluster
/// created by step `k` has id `n_leaves + k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Full merge history of `n_leaves` observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    n_leaves: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Observation indices in left-to-right leaf order.
    pub fn leaves(&self) -> Vec<usize> {
        if self.n_leaves == 0 {
            return Vec::new();
        }
        let root = self.n_leaves + self.merges.len() - 1;
        let mut order = Vec::with_capacity(self.n_leaves);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id < self.n_leaves {
                order.push(id);
            } else {
                let merge = &self.merges[id - self.n_leaves];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        order
    }
}

/// Clusters observations given their square distance matrix.
///
/// Each step merges the closest pair of active clusters; equal distances
/// resolve to the pair found first in row-major order, so the result is
/// deterministic. Distances must be finite.
pub fn linkage(dist: &Array2<f64>, method: LinkageMethod) -> Dendrogram {
    let n = dist.nrows();
    let mut d = dist.clone();
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes: Vec<f64> = vec![1.0; n];
    let mut active: Vec<bool> = vec![true; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut best = (usize::MAX, usize::MAX, f64::INFINITY);
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                if d[[i, j]] < best.2 || best.0 == usize::MAX {
                    best = (i, j, d[[i, j]]);
                }
            }
        }
        let (x, y, d_xy) = best;

        for i in (0..n).filter(|&i| active[i] && i != x && i != y) {
            let updated = method.update(d[[x, i]], d[[y, i]], d_xy, sizes[x], sizes[y], sizes[i]);
            d[[x, i]] = updated;
            d[[i, x]] = updated;
        }

        let size = sizes[x] + sizes[y];
        merges.push(Merge {
            left: ids[x].min(ids[y]),
            right: ids[x].max(ids[y]),
            distance: d_xy,
            size: size as usize,
        });
        ids[x] = n + step;
        sizes[x] = size;
        active[y] = false;
    }

    Dendrogram {
        n_leaves: n,
        merges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::distance::{pairwise_distances, DistanceMetric};
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn points() -> Array2<f64> {
        // Two tight pairs far apart: {0, 2} near the origin, {1, 3} near 10.
        arr2(&[[0.0, 0.0], [10.0, 10.0], [0.0, 1.0], [10.0, 12.0]])
    }

    #[test]
    fn test_single_linkage_merge_history() {
        let dist = pairwise_distances(points().view(), DistanceMetric::Euclidean);
        let tree = linkage(&dist, LinkageMethod::Single);

        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.merges().len(), 3);
        assert_eq!((tree.merges()[0].left, tree.merges()[0].right), (0, 2));
        assert_relative_eq!(tree.merges()[0].distance, 1.0);
        assert_eq!((tree.merges()[1].left, tree.merges()[1].right), (1, 3));
        assert_relative_eq!(tree.merges()[1].distance, 2.0);
        assert_eq!((tree.merges()[2].left, tree.merges()[2].right), (4, 5));
        assert_eq!(tree.merges()[2].size, 4);
    }

    #[test]
    fn test_leaf_order_groups_neighbours() {
        let dist = pairwise_distances(points().view(), DistanceMetric::Euclidean);
        for method in [
            LinkageMethod::Average,
            LinkageMethod::Complete,
            LinkageMethod::Single,
            LinkageMethod::Weighted,
            LinkageMethod::Centroid,
            LinkageMethod::Median,
            LinkageMethod::Ward,
        ] {
            let leaves = linkage(&dist, method).leaves();
            assert_eq!(leaves, vec![0, 2, 1, 3], "{:?}", method);
        }
    }

    #[test]
    fn test_ward_merge_height() {
        // Ward on 1-D points 0, 1, 5: merge (0, 1) at 1, then with 5 at
        // sqrt(((1+1)*25 + (1+1)*16 - 1*1) / 3) = sqrt(27).
        let data = arr2(&[[0.0], [1.0], [5.0]]);
        let dist = pairwise_distances(data.view(), DistanceMetric::Euclidean);
        let tree = linkage(&dist, LinkageMethod::Ward);
        assert_relative_eq!(tree.merges()[1].distance, 27f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_trivial_inputs() {
        let empty = linkage(&Array2::zeros((0, 0)), LinkageMethod::Average);
        assert!(empty.leaves().is_empty());

        let single = linkage(&Array2::zeros((1, 1)), LinkageMethod::Average);
        assert_eq!(single.leaves(), vec![0]);
        assert!(single.merges().is_empty());
    }
}
