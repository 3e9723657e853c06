mod document;
mod interval;

pub use document::{DocumentError, UsageDocument};
pub use interval::{IntervalKey, LeafInterval, walk};
