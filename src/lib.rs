//! Assetflow - frontend asset pipeline
//!
//! This library provides the tasks behind the `assetflow` command:
//! - Compile SCSS, add vendor prefixes and minify, with source maps
//! - Concatenate, transpile and minify scripts, with source maps
//! - Compress GIF, JPEG, PNG and SVG images into the release tree
//! - Serve the working tree with live reload and rebuild on change
//! - Assemble a clean release tree
//!
//! Tasks run against a [`build::TaskContext`] and are composed by
//! [`build::TaskRunner`].

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod images;
pub mod libs;
pub mod output;
pub mod release;
pub mod reload;
pub mod scripts;
pub mod server;
pub mod styles;
pub mod watch;
