//! APK deep extractor library.
//!
//! This crate unpacks an Android package twice, once through apktool and
//! once as a plain zip archive, and then inspects the result: the manifest,
//! native shared objects, asset files and smali sources. Findings are
//! appended to a plain-text log. It is used by the `apk-deep-extractor` CLI
//! binary and can be driven programmatically through
//! [`pipeline::run_pipeline`].
//!
//! # Modules
//!
//! - [`assets`] - Asset decoding and keyword search
//! - [`bytecode`] - Smali keyword search
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - External command execution abstraction
//! - [`config`] - Run configuration and defaults
//! - [`decompiler`] - apktool invocation
//! - [`error`] - Fatal error types
//! - [`extraction`] - Raw zip extraction and archive digest
//! - [`findings`] - Findings log and offsets file
//! - [`manifest`] - Manifest presence check
//! - [`native`] - Native library parsing
//! - [`output`] - Summary and message formatting
//! - [`pipeline`] - Stage orchestration
//! - [`progress`] - Background spinner
//! - [`text`] - Text decoding and keyword matching
//! - [`workspace`] - Output workspace reset

pub mod assets;
pub mod bytecode;
pub mod cli;
pub mod command;
pub mod config;
pub mod decompiler;
pub mod error;
pub mod extraction;
pub mod findings;
pub mod manifest;
pub mod native;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod text;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
