//! Hierarchical clustering used to order heatmap rows and columns.
//!
//! [`leaf_order`] computes pairwise distances between the rows of a matrix,
//! agglomerates them with the chosen linkage, and returns the dendrogram's
//! leaf order as a permutation of the row indices.

pub mod distance;
pub mod linkage;

pub use distance::{pairwise_distances, DistanceMetric};
pub use linkage::{linkage, Dendrogram, LinkageMethod, Merge};

use ndarray::ArrayView2;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ClusterError {
    #[error("Method '{method:?}' requires the euclidean metric, got '{metric:?}'")]
    RequiresEuclidean {
        method: LinkageMethod,
        metric: DistanceMetric,
    },

    #[error("Distance between observations {0} and {1} is not finite under '{2:?}'")]
    NonFiniteDistance(usize, usize, DistanceMetric),
}

/// Dendrogram of the rows of `data`.
///
/// Method/metric pairs are not second-guessed beyond two rules: centroid,
/// median and Ward linkage need Euclidean distances, and every pairwise
/// distance must be finite.
pub fn cluster_rows(
    data: ArrayView2<f64>,
    method: LinkageMethod,
    metric: DistanceMetric,
) -> Result<Dendrogram, ClusterError> {
    if method.requires_euclidean() && !metric.is_euclidean() {
        return Err(ClusterError::RequiresEuclidean { method, metric });
    }

    let dist = pairwise_distances(data, metric);
    if let Some(((i, j), _)) = dist.indexed_iter().find(|(_, d)| !d.is_finite()) {
        return Err(ClusterError::NonFiniteDistance(i, j, metric));
    }
    Ok(linkage(&dist, method))
}

/// Row permutation that places similar rows of `data` next to each other.
///
/// Zero or one rows need no clustering and come back in their original order.
pub fn leaf_order(
    data: ArrayView2<f64>,
    method: LinkageMethod,
    metric: DistanceMetric,
) -> Result<Vec<usize>, ClusterError> {
    if data.nrows() < 2 {
        return Ok((0..data.nrows()).collect());
    }
    let order = cluster_rows(data, method, metric)?.leaves();
    log::debug!(
        "Clustered {} observations ({:?}/{:?}): {:?}",
        data.nrows(),
        method,
        metric,
        order
    );
    Ok(order)
}
