//! depviz - transitive dependency graph resolver and visualizer
//!
//! This crate resolves the dependency graph of a package from a live
//! repository index or a local fixture file, down to a bounded depth, and
//! renders it as a Graphviz image or an ASCII tree.

pub mod app;
pub mod config;
pub mod export;
pub mod graph;
pub mod logging;
pub mod render;
pub mod source;
