pub mod duration;
pub mod layout;

pub use duration::SegmentDuration;
pub use layout::{SegmentLayout, SegmentSpan};
