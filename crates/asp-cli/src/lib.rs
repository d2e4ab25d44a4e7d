// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-cli
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Library-level command implementations so they can be tested without
//! spawning the binary.

/// Shared command implementations.
pub mod commands;
/// User-level CLI configuration.
pub mod config;
/// Human-readable rendering of reports.
pub mod format;
