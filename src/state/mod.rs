//! State module for the per-request page state machine
//!
//! # Components
//!
//! - `Label`: tags a request as a listing page or an item detail page
//! - `PageStep`: the named steps a request walks through, with the legal
//!   successor of each step for a given label

mod label;
mod page_step;

// Re-export main types
pub use label::Label;
pub use page_step::PageStep;
