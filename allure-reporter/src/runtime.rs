// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker-side instrumentation.
//!
//! Test code runs in a worker process and cannot touch report state
//! directly; it sends [`RuntimeMessage`]s over a channel instead. The
//! reporter side decodes each `(cid, message)` envelope into a
//! [`ReporterEvent`] and feeds it to the dispatcher like any other event.

use crate::reporter::{Cid, ReporterEvent};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::mem;
use tokio::sync::mpsc;
use tracing::warn;

/// A message sent from instrumented test code to the reporter.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RuntimeMessage {
    /// Attach a file on disk to the current step or test.
    #[serde(rename_all = "kebab-case")]
    AttachFile {
        /// Path of the file to attach.
        path: Utf8PathBuf,

        /// Display name, defaulting to the file name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,

        /// MIME type, defaulting to `text/plain`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },

    /// Attach inline data to the current step or test.
    #[serde(rename_all = "kebab-case")]
    AttachData {
        /// Display name.
        name: String,

        /// The data, attached as a JSON document.
        data: Value,
    },

    /// Tag the current test with feature labels.
    #[serde(rename_all = "kebab-case")]
    SetFeatureTags {
        /// Feature names.
        features: Vec<String>,
    },

    /// Open a named step.
    #[serde(rename_all = "kebab-case")]
    StartStep {
        /// The step label.
        label: String,
    },

    /// Close a named step.
    #[serde(rename_all = "kebab-case")]
    EndStep {
        /// The step label.
        label: String,

        /// Whether the demarcated block completed without error.
        passed: bool,
    },
}

/// Where the runtime sends its messages.
///
/// Sends are fire-and-forget: instrumented test code never blocks on the
/// reporter and never observes delivery failures.
pub trait MessageSink {
    /// Delivers one message.
    fn send(&self, message: RuntimeMessage);
}

/// A [`MessageSink`] over an unbounded channel to the reporter process.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<RuntimeMessage>,
}

impl ChannelSink {
    /// Creates a sink sending into the given channel.
    pub fn new(sender: mpsc::UnboundedSender<RuntimeMessage>) -> Self {
        Self { sender }
    }
}

impl MessageSink for ChannelSink {
    fn send(&self, message: RuntimeMessage) {
        if self.sender.send(message).is_err() {
            warn!("reporter channel closed, dropping runtime message");
        }
    }
}

/// Step demarcation and attachment primitives for instrumented test code.
pub struct StepRuntime<S> {
    sink: S,
}

impl<S: MessageSink> StepRuntime<S> {
    /// Creates a runtime sending through the given sink.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Runs `body` inside a named step.
    ///
    /// The end-step message is sent exactly once: passed when the body
    /// returns `Ok`, not passed when it returns `Err` or unwinds. The
    /// body's result is returned untouched.
    pub fn run_step<T, E>(
        &self,
        label: &str,
        body: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        self.sink.send(RuntimeMessage::StartStep {
            label: label.to_owned(),
        });
        let mut guard = EndStepGuard::new(&self.sink, label);
        let result = body();
        guard.finish(result.is_ok());
        result
    }

    /// Runs an async `body` inside a named step.
    ///
    /// Same contract as [`run_step`](Self::run_step), across an `.await`.
    /// The end-step message is also sent when the future is dropped before
    /// completion.
    pub async fn run_async_step<T, E, Fut>(
        &self,
        label: &str,
        body: impl FnOnce() -> Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        self.sink.send(RuntimeMessage::StartStep {
            label: label.to_owned(),
        });
        let mut guard = EndStepGuard::new(&self.sink, label);
        let result = body().await;
        guard.finish(result.is_ok());
        result
    }

    /// Attaches a file on disk to the current step or test.
    pub fn attach_file(
        &self,
        path: impl Into<Utf8PathBuf>,
        name: Option<String>,
        mime_type: Option<String>,
    ) {
        self.sink.send(RuntimeMessage::AttachFile {
            path: path.into(),
            name,
            mime_type,
        });
    }

    /// Attaches inline data to the current step or test.
    pub fn attach_data(&self, name: impl Into<String>, data: Value) {
        self.sink.send(RuntimeMessage::AttachData {
            name: name.into(),
            data,
        });
    }

    /// Tags the current test with feature labels.
    pub fn feature(&self, features: impl IntoIterator<Item = impl Into<String>>) {
        self.sink.send(RuntimeMessage::SetFeatureTags {
            features: features.into_iter().map(Into::into).collect(),
        });
    }
}

/// Sends the end-step message on drop unless it was already sent.
///
/// Covers unwinds and cancelled futures without a catch site.
struct EndStepGuard<'a, S: MessageSink> {
    sink: &'a S,
    label: String,
    sent: bool,
}

impl<'a, S: MessageSink> EndStepGuard<'a, S> {
    fn new(sink: &'a S, label: &str) -> Self {
        Self {
            sink,
            label: label.to_owned(),
            sent: false,
        }
    }

    fn finish(&mut self, passed: bool) {
        self.sent = true;
        self.sink.send(RuntimeMessage::EndStep {
            label: mem::take(&mut self.label),
            passed,
        });
    }
}

impl<S: MessageSink> Drop for EndStepGuard<'_, S> {
    fn drop(&mut self) {
        if !self.sent {
            self.sink.send(RuntimeMessage::EndStep {
                label: mem::take(&mut self.label),
                passed: false,
            });
        }
    }
}

/// Decodes a worker message envelope into a reporter event.
pub fn decode_runtime_message(cid: Cid, message: RuntimeMessage) -> ReporterEvent {
    match message {
        RuntimeMessage::AttachFile {
            path,
            name,
            mime_type,
        } => ReporterEvent::FileAttached {
            cid,
            path,
            name,
            mime_type,
        },
        RuntimeMessage::AttachData { name, data } => ReporterEvent::DataAttached { cid, name, data },
        RuntimeMessage::SetFeatureTags { features } => {
            ReporterEvent::FeatureTagged { cid, features }
        }
        RuntimeMessage::StartStep { label } => ReporterEvent::StepStarted { cid, label },
        RuntimeMessage::EndStep { label, passed } => {
            ReporterEvent::StepFinished { cid, label, passed }
        }
    }
}
