//! taskmaster - Task List Library
//!
//! This library provides the core functionality for the tm CLI tool: a flat
//! list of timestamped tasks persisted as one JSON blob, with completion
//! tracking and an interactive terminal view.
//!
//! # Core Concepts
//!
//! - **Store**: Load/save of the whole list under the `todos` slot
//! - **Repository**: In-memory list that saves first, then reloads
//! - **Controller**: Creating/editing state machine driven by user intents
//! - **View**: Pure projections (progress, due labels, row styles)
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `controller`: Form mode, submit, delete confirmation, toggling
//! - `error`: Error types and result aliases
//! - `input`: Parsing of typed due dates and task references
//! - `lock`: File locking and atomic writes for the store document
//! - `notify`: Success/failure messages and confirmations
//! - `output`: Human and JSON output for commands
//! - `repository`: Task list operations over a store
//! - `schema`: Decoding and normalizing stored blobs
//! - `storage`: Slot backends and the `Store` trait
//! - `task`: Task record, ids, and due timestamps
//! - `ui`: Terminal user interface using ratatui
//! - `view`: Display projection of the task list

#![deny(rustdoc::broken_intra_doc_links)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod input;
pub mod lock;
pub mod notify;
pub mod output;
pub mod repository;
pub mod schema;
pub mod storage;
pub mod task;
pub mod ui;
pub mod view;

pub use error::{Error, Result};
