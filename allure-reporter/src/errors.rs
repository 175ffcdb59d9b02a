// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while handling reporter events.

use crate::reporter::Cid;
use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while handling a reporter event.
///
/// Report state updates are infallible; only handlers that touch the
/// filesystem produce these.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// Reading a file to be attached failed.
    #[error("error reading attachment `{path}`")]
    Fs {
        /// The file being attached.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Writing a context's finished suites to disk failed.
    #[error("error writing report for context `{cid}`")]
    Report {
        /// The execution context whose report was being written.
        cid: Cid,

        /// The underlying error.
        #[source]
        error: quick_allure::WriteError,
    },
}
