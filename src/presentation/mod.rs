//! View models and HTML templates.

pub mod views;
