// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use std::fmt;

/// The completion status of a [`Test`] or [`Step`].
///
/// An open unit of work has no status yet; its status is set exactly once,
/// when it is closed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// The unit of work completed successfully.
    Passed,

    /// The unit of work failed an assertion.
    Failed,

    /// The unit of work raised an unexpected error.
    Broken,

    /// The unit of work never ran, or never closed.
    Pending,
}

impl Status {
    /// Returns the lowercase string used in serialized reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Broken => "broken",
            Status::Pending => "pending",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suite of test cases.
///
/// Nested suites are flattened: a child suite's name carries its parent's
/// name as a prefix.
#[derive(Clone, Debug)]
pub struct Suite {
    /// The name of this suite.
    pub name: String,

    /// The time at which the suite was opened.
    pub start: Option<DateTime<FixedOffset>>,

    /// The time at which the suite was closed.
    pub stop: Option<DateTime<FixedOffset>>,

    /// The test cases recorded in this suite, in completion order.
    pub tests: Vec<Test>,
}

impl Suite {
    /// Creates a new `Suite` with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            stop: None,
            tests: vec![],
        }
    }

    /// Sets the start timestamp for the suite.
    pub fn set_start(&mut self, start: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.start = Some(start.into());
        self
    }

    /// Sets the stop timestamp for the suite.
    pub fn set_stop(&mut self, stop: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.stop = Some(stop.into());
        self
    }

    /// Adds a completed test case to this suite.
    pub fn add_test(&mut self, test: Test) -> &mut Self {
        self.tests.push(test);
        self
    }
}

/// A single test case.
#[derive(Clone, Debug)]
pub struct Test {
    /// The name of the test case.
    pub name: String,

    /// The status of the test case. `None` while the test is still open.
    pub status: Option<Status>,

    /// The time at which the test was opened.
    pub start: Option<DateTime<FixedOffset>>,

    /// The time at which the test was closed.
    pub stop: Option<DateTime<FixedOffset>>,

    /// Parameters recorded for this test, keyed by name in insertion order.
    pub parameters: IndexMap<String, Parameter>,

    /// Labels attached to this test, e.g. feature tags.
    pub labels: Vec<Label>,

    /// The top-level steps of this test, in completion order.
    pub steps: Vec<Step>,

    /// Attachments recorded directly on the test.
    pub attachments: Vec<Attachment>,

    /// The error that closed this test, if it did not pass.
    pub failure: Option<TestFailure>,
}

impl Test {
    /// Creates a new open `Test` with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: None,
            start: None,
            stop: None,
            parameters: IndexMap::new(),
            labels: vec![],
            steps: vec![],
            attachments: vec![],
            failure: None,
        }
    }

    /// Renames the test. Used when a failure reports a more precise title
    /// than the one the test was opened with.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Sets the start timestamp for the test.
    pub fn set_start(&mut self, start: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.start = Some(start.into());
        self
    }

    /// Sets the stop timestamp for the test.
    pub fn set_stop(&mut self, stop: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.stop = Some(stop.into());
        self
    }

    /// Records a parameter. A later parameter with the same name replaces
    /// the earlier one.
    pub fn add_parameter(
        &mut self,
        kind: ParameterKind,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.parameters.insert(
            name.into(),
            Parameter {
                kind,
                value: value.into(),
            },
        );
        self
    }

    /// Attaches a label to this test.
    pub fn add_label(&mut self, label: Label) -> &mut Self {
        self.labels.push(label);
        self
    }

    /// Adds a completed step to this test.
    pub fn add_step(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Adds an attachment directly to this test.
    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    /// Records the failure that closed this test.
    pub fn set_failure(&mut self, failure: TestFailure) -> &mut Self {
        self.failure = Some(failure);
        self
    }

    /// Closes the test with the given status. The first close wins; a
    /// closed test is never reopened or restatused.
    pub fn close(&mut self, status: Status) -> &mut Self {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self
    }
}

/// One unit of work inside a test case.
///
/// Steps form a tree rooted at a [`Test`]: a closed step is owned by its
/// enclosing step, or by the test itself at the top level.
#[derive(Clone, Debug)]
pub struct Step {
    /// The name of the step.
    pub name: String,

    /// The status of the step. `None` while the step is still open.
    pub status: Option<Status>,

    /// The time at which the step was opened.
    pub start: Option<DateTime<FixedOffset>>,

    /// The time at which the step was closed.
    pub stop: Option<DateTime<FixedOffset>>,

    /// Closed child steps, in completion order.
    pub steps: Vec<Step>,

    /// Attachments recorded on this step.
    pub attachments: Vec<Attachment>,
}

impl Step {
    /// Creates a new open `Step` with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: None,
            start: None,
            stop: None,
            steps: vec![],
            attachments: vec![],
        }
    }

    /// Sets the start timestamp for the step.
    pub fn set_start(&mut self, start: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.start = Some(start.into());
        self
    }

    /// Sets the stop timestamp for the step.
    pub fn set_stop(&mut self, stop: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.stop = Some(stop.into());
        self
    }

    /// Adds a completed child step.
    pub fn add_step(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Adds an attachment to this step.
    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    /// Returns true if the step has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.status.is_none()
    }

    /// Closes the step with the given status. The first close wins.
    pub fn close(&mut self, status: Status) -> &mut Self {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self
    }
}

/// The category of a recorded [`Parameter`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParameterKind {
    /// A property of the execution environment, e.g. browser capabilities.
    EnvironmentVariable,

    /// An argument passed to the test itself.
    Argument,
}

impl ParameterKind {
    /// Returns the string used in serialized reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKind::EnvironmentVariable => "environment-variable",
            ParameterKind::Argument => "argument",
        }
    }
}

/// A parameter recorded on a test, e.g. an environment variable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    /// The category of the parameter.
    pub kind: ParameterKind,

    /// The value of the parameter.
    pub value: String,
}

/// A label attached to a test, e.g. a feature tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Label {
    /// The name of the label.
    pub name: String,

    /// The value of the label.
    pub value: String,
}

impl Label {
    /// Creates a new `Label`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates a `feature` label.
    pub fn feature(value: impl Into<String>) -> Self {
        Self::new("feature", value)
    }
}

/// The error recorded on a test that did not pass.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestFailure {
    /// The failure message.
    pub message: Option<String>,

    /// The "type" of failure that occurred.
    pub ty: Option<String>,
}

impl TestFailure {
    /// Creates a new, empty `TestFailure`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure message.
    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the failure type.
    pub fn set_type(&mut self, ty: impl Into<String>) -> &mut Self {
        self.ty = Some(ty.into());
        self
    }
}

/// A file or data blob attached to a test or step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attachment {
    /// The display name of the attachment.
    pub name: String,

    /// The attachment payload.
    pub body: AttachmentBody,

    /// The MIME type of the payload.
    pub mime_type: String,
}

impl Attachment {
    /// Creates a text attachment.
    pub fn text(
        name: impl Into<String>,
        body: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            body: AttachmentBody::Text(body.into()),
            mime_type: mime_type.into(),
        }
    }

    /// Creates a binary attachment.
    pub fn bytes(
        name: impl Into<String>,
        body: impl Into<Vec<u8>>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            body: AttachmentBody::Bytes(body.into()),
            mime_type: mime_type.into(),
        }
    }
}

/// The payload of an [`Attachment`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttachmentBody {
    /// A UTF-8 payload, e.g. a JSON document.
    Text(String),

    /// A raw binary payload, e.g. a screenshot.
    Bytes(Vec<u8>),
}

impl AttachmentBody {
    /// Returns the payload as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttachmentBody::Text(text) => text.as_bytes(),
            AttachmentBody::Bytes(bytes) => bytes,
        }
    }
}
