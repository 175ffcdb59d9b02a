// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while writing reports.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while writing report artifacts to disk.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteError {
    /// A filesystem operation failed.
    #[error("error writing to `{path}`")]
    Fs {
        /// The path being written.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Serializing a report document failed.
    #[error("error serializing report to `{path}`")]
    Json {
        /// The path being written.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}
