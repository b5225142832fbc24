// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Shared utilities for code generation.
//!
//! # Submodules
//!
//! - [`marker`] - Generated code markers
//! - [`sql`] - Named parameter binding and statement classification
//! - [`naming`] - Identifier and type parsing with emission errors

pub mod marker;
pub mod naming;
pub mod sql;
