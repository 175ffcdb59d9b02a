// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generate Allure-style test reports in Rust.
//!
//! The main types here are [`Suite`], [`Test`] and [`Step`], which form the
//! report tree, and [`ReportWriter`], which writes one JSON document per
//! suite into an output directory.

mod errors;
mod report;
mod serialize;
mod writer;

pub use errors::*;
pub use report::*;
pub use writer::*;
