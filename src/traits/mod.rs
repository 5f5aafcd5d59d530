//! Trait definitions for extensible components
//!
//! These traits allow users to swap the backing key-value store or the
//! whole session repository for their own implementations.

pub mod backend;
pub mod session;
