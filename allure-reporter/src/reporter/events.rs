// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events understood by the reporter.
//!
//! Test runners translate their lifecycle callbacks and remote-command
//! traffic into [`ReporterEvent`]s and feed them to the dispatcher. Every
//! event other than [`ReporterEvent::RunFinished`] names the execution
//! context it belongs to through a [`Cid`].

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::fmt;

/// Identifier for a single execution context (one worker session).
///
/// Report state is kept per context, so events carrying different cids
/// never interleave within one suite tree.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Cid(SmolStr);

impl Cid {
    /// Creates a new `Cid`.
    pub fn new(cid: impl Into<SmolStr>) -> Self {
        Self(cid.into())
    }

    /// Returns the cid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cid {
    fn from(cid: &str) -> Self {
        Self(cid.into())
    }
}

/// The error that caused a test to fail.
///
/// The kind is decided by the boundary that produced the event, not by the
/// reporter core.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct TestError {
    /// What sort of failure this was.
    pub kind: TestErrorKind,

    /// The failure message.
    pub message: String,
}

impl TestError {
    /// Creates a new `TestError`.
    pub fn new(kind: TestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The kind of error that caused a test to fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestErrorKind {
    /// A failed assertion: the test ran to a checkpoint and the checkpoint
    /// didn't hold.
    Assertion,

    /// Anything else: crashes, timeouts, infrastructure trouble.
    Other,
}

impl TestErrorKind {
    /// The report status recorded for tests and steps closed by this kind
    /// of error.
    pub fn status(self) -> quick_allure::Status {
        match self {
            TestErrorKind::Assertion => quick_allure::Status::Failed,
            TestErrorKind::Other => quick_allure::Status::Broken,
        }
    }
}

/// An event in a test run.
#[derive(Clone, Debug)]
pub enum ReporterEvent {
    /// A suite began in this context.
    SuiteStarted {
        /// The execution context.
        cid: Cid,

        /// The suite's own title, not yet prefixed with its ancestors'.
        title: String,
    },

    /// The innermost open suite in this context finished.
    SuiteFinished {
        /// The execution context.
        cid: Cid,
    },

    /// A test began in this context.
    TestStarted {
        /// The execution context.
        cid: Cid,

        /// The test title.
        title: String,

        /// The remote session's capabilities, recorded as a test parameter.
        capabilities: Value,

        /// The spec files the test was loaded from.
        specs: Vec<String>,
    },

    /// The current test passed.
    TestPassed {
        /// The execution context.
        cid: Cid,
    },

    /// The current test failed.
    TestFailed {
        /// The execution context.
        cid: Cid,

        /// The failing test's title.
        title: String,

        /// The error that failed it.
        error: TestError,
    },

    /// A test was skipped without running.
    TestPending {
        /// The execution context.
        cid: Cid,

        /// The pending test's title.
        title: String,
    },

    /// A runner hook began.
    HookStarted {
        /// The execution context.
        cid: Cid,

        /// The hook title, e.g. `"before all" hook`.
        title: String,
    },

    /// A runner hook finished.
    HookFinished {
        /// The execution context.
        cid: Cid,

        /// The hook title.
        title: String,
    },

    /// A remote command was issued.
    CommandStarted {
        /// The execution context.
        cid: Cid,

        /// The HTTP method.
        method: String,

        /// The command path.
        path: String,

        /// The request payload, if any.
        data: Option<Value>,
    },

    /// A remote command produced a result.
    CommandFinished {
        /// The execution context.
        cid: Cid,

        /// The HTTP method, defaulting to `GET` when absent.
        method: Option<String>,

        /// The command path.
        path: String,

        /// The response body.
        body: Value,
    },

    /// Test code attached a file to the report.
    FileAttached {
        /// The execution context.
        cid: Cid,

        /// Path of the file to attach.
        path: Utf8PathBuf,

        /// Display name, defaulting to the file name.
        name: Option<String>,

        /// MIME type, defaulting to `text/plain`.
        mime_type: Option<String>,
    },

    /// Test code attached inline data to the report.
    DataAttached {
        /// The execution context.
        cid: Cid,

        /// Display name.
        name: String,

        /// The data, attached as a JSON document.
        data: Value,
    },

    /// Test code tagged the current test with features.
    FeatureTagged {
        /// The execution context.
        cid: Cid,

        /// Feature names, recorded as `feature` labels.
        features: Vec<String>,
    },

    /// Test code opened a named step.
    StepStarted {
        /// The execution context.
        cid: Cid,

        /// The step label.
        label: String,
    },

    /// Test code closed a named step.
    StepFinished {
        /// The execution context.
        cid: Cid,

        /// The step label.
        label: String,

        /// Whether the demarcated block completed without error.
        passed: bool,
    },

    /// The whole run finished. Flushes every context's report to disk.
    RunFinished,
}

impl ReporterEvent {
    /// Returns the context this event belongs to, if any.
    pub fn cid(&self) -> Option<&Cid> {
        match self {
            ReporterEvent::SuiteStarted { cid, .. }
            | ReporterEvent::SuiteFinished { cid }
            | ReporterEvent::TestStarted { cid, .. }
            | ReporterEvent::TestPassed { cid }
            | ReporterEvent::TestFailed { cid, .. }
            | ReporterEvent::TestPending { cid, .. }
            | ReporterEvent::HookStarted { cid, .. }
            | ReporterEvent::HookFinished { cid, .. }
            | ReporterEvent::CommandStarted { cid, .. }
            | ReporterEvent::CommandFinished { cid, .. }
            | ReporterEvent::FileAttached { cid, .. }
            | ReporterEvent::DataAttached { cid, .. }
            | ReporterEvent::FeatureTagged { cid, .. }
            | ReporterEvent::StepStarted { cid, .. }
            | ReporterEvent::StepFinished { cid, .. } => Some(cid),
            ReporterEvent::RunFinished => None,
        }
    }

    /// Returns the fieldless kind of this event, used as the dispatch key.
    pub fn kind(&self) -> EventKind {
        match self {
            ReporterEvent::SuiteStarted { .. } => EventKind::SuiteStart,
            ReporterEvent::SuiteFinished { .. } => EventKind::SuiteEnd,
            ReporterEvent::TestStarted { .. } => EventKind::TestStart,
            ReporterEvent::TestPassed { .. } => EventKind::TestPass,
            ReporterEvent::TestFailed { .. } => EventKind::TestFail,
            ReporterEvent::TestPending { .. } => EventKind::TestPending,
            ReporterEvent::HookStarted { .. } => EventKind::HookStart,
            ReporterEvent::HookFinished { .. } => EventKind::HookEnd,
            ReporterEvent::CommandStarted { .. } => EventKind::CommandStart,
            ReporterEvent::CommandFinished { .. } => EventKind::CommandEnd,
            ReporterEvent::FileAttached { .. } => EventKind::FileAttach,
            ReporterEvent::DataAttached { .. } => EventKind::DataAttach,
            ReporterEvent::FeatureTagged { .. } => EventKind::FeatureTag,
            ReporterEvent::StepStarted { .. } => EventKind::StepStart,
            ReporterEvent::StepFinished { .. } => EventKind::StepEnd,
            ReporterEvent::RunFinished => EventKind::RunEnd,
        }
    }
}

/// The kind of a [`ReporterEvent`], with all payloads stripped.
///
/// Dispatch keys: one handler is registered per kind.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EventKind {
    /// [`ReporterEvent::SuiteStarted`].
    SuiteStart,
    /// [`ReporterEvent::SuiteFinished`].
    SuiteEnd,
    /// [`ReporterEvent::TestStarted`].
    TestStart,
    /// [`ReporterEvent::TestPassed`].
    TestPass,
    /// [`ReporterEvent::TestFailed`].
    TestFail,
    /// [`ReporterEvent::TestPending`].
    TestPending,
    /// [`ReporterEvent::HookStarted`].
    HookStart,
    /// [`ReporterEvent::HookFinished`].
    HookEnd,
    /// [`ReporterEvent::CommandStarted`].
    CommandStart,
    /// [`ReporterEvent::CommandFinished`].
    CommandEnd,
    /// [`ReporterEvent::FileAttached`].
    FileAttach,
    /// [`ReporterEvent::DataAttached`].
    DataAttach,
    /// [`ReporterEvent::FeatureTagged`].
    FeatureTag,
    /// [`ReporterEvent::StepStarted`].
    StepStart,
    /// [`ReporterEvent::StepFinished`].
    StepEnd,
    /// [`ReporterEvent::RunFinished`].
    RunEnd,
}
