//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod handles;
pub mod posts;
pub mod slug;
