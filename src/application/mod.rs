//! Application services layer.

pub mod authoring;
pub mod directory;
pub mod error;
pub mod follows;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod sessions;
pub mod viewer;
