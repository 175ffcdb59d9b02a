// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report building from test-runner events.
//!
//! The reporter is an [`EventDispatcher`] wired up with a handler per
//! [`EventKind`]; handlers mutate per-context [`ReportState`] and, for
//! step-end style events, feed the close-or-defer reconciler.

mod dispatcher;
mod events;
mod handlers;
mod imp;
mod reconcile;
mod state;

pub use dispatcher::*;
pub use events::*;
pub use imp::*;
pub use state::*;
