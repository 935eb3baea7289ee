//! URL handling module for Listing-Harvester
//!
//! This module provides the canonical form used for frontier identities and
//! resolution of link targets found on rendered pages.

mod normalize;

// Re-export main functions
pub use normalize::{canonicalize_url, resolve_link};
