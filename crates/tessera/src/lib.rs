/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Command-line front end for the tessera row template engine.
//!
//! The binary lives in `main.rs`; the commands, configuration loading and
//! built-in collaborators are exposed here so they can be tested directly.

pub mod collaborators;
pub mod commands;
pub mod config;
