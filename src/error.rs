use thiserror::Error;

/// Error enumerates over all possible errors that this package
/// shall return.
#[derive(Debug, Error, PartialEq)]
pub enum Error<T> {
    /// Returned by erase() when no element compares equal to the
    /// requested value. The tree is left untouched.
    #[error("element does not exist in tree: {0:?}")]
    NotFound(T),
    /// Returned by select() when index is not within `0..size`.
    #[error("index {index} out of range for tree of size {size}")]
    OutOfRange { index: usize, size: usize },
    /// Fatal case, values are not in sort-order.
    #[error("values out of order: {0:?} placed before {1:?}")]
    SortError(T, T),
    /// Fatal case, left and right heights differ by more than one.
    /// The String component can be used for debugging.
    #[error("unbalanced node, {0}")]
    UnbalancedNode(String),
    /// Fatal case, cached subtree count is stale.
    #[error("count mismatch, {0}")]
    CountMismatch(String),
    /// Fatal case, cached subtree height is stale.
    #[error("height mismatch, {0}")]
    HeightMismatch(String),
    /// Fatal case, entry counter disagrees with the number of nodes.
    #[error("size mismatch, expected {expected} found {found}")]
    SizeMismatch { expected: usize, found: usize },
}
