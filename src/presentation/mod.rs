//! HTML rendering: askama templates and the view models that feed them.

pub mod views;
