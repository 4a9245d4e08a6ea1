//! Yatube: a small blogging service with groups, comments, follows and a
//! personal feed.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
