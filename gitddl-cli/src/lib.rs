//! gitddl CLI - Command-line interface for git-tracked schema deployment.
//!
//! This crate provides the `gitddl` tool for deploying a schema file to a
//! database, checking whether the database matches git history, and
//! upgrading it through an external diff engine.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
