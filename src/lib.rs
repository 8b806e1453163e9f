mod depth;
mod error;
mod tree;

pub use crate::depth::Depth;
pub use crate::error::Error;
pub use crate::tree::{Iter, OrderedTree, Stats};
