// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Event-driven Allure report generation for WebDriver-style test runners.
//!
//! Runner callbacks and remote-command traffic become [`ReporterEvent`]s;
//! the [`AllureReporter`] folds them into per-context suite trees and
//! writes the report through [`quick_allure`] when the run finishes.
//! Instrumented test code in worker processes uses the [`runtime`] module
//! to demarcate its own steps and add attachments.
//!
//! The interesting part is step closure. Remote commands complete out of
//! order with respect to the nesting of user-defined steps, so a close
//! request may target a step buried under live ones; the reporter defers
//! such closes and reconciles them once the steps above have had their own
//! closes accounted for.
//!
//! [`ReporterEvent`]: crate::reporter::ReporterEvent
//! [`AllureReporter`]: crate::reporter::AllureReporter

pub mod config;
pub mod errors;
pub mod reporter;
pub mod runtime;
