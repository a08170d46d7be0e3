// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.
//!
//! All functions accept `&Database` and run through the single writer.

pub mod audit;
pub mod auth;
pub mod members;
pub mod reports;
pub mod sessions;
pub mod transcripts;
