pub mod merge;
pub mod polling;
pub mod reconciler;
