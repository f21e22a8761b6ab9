pub mod differ;

pub use differ::{diff, AttributeDiff, Difference, IdentityConfig, NodeInfo};
