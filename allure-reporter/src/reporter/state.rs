// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-context report state.

use crate::reporter::events::Cid;
use chrono::{DateTime, FixedOffset, Local};
use indexmap::IndexMap;
use quick_allure::{Attachment, Status, Step, Suite, Test, TestFailure};
use tracing::debug;

/// The report under construction for one execution context.
///
/// Suites nest, so open suites form a stack; the current test and the open
/// steps under it are tracked separately. Steps are owned by the stack while
/// open and transferred to their parent (the next step down, or the test)
/// only when they close or the test ends.
#[derive(Debug, Default)]
pub struct ReportState {
    pub(crate) suite_stack: Vec<Suite>,
    pub(crate) finished_suites: Vec<Suite>,
    pub(crate) current_test: Option<Test>,
    pub(crate) step_stack: Vec<Step>,
    pub(crate) postponed_steps: Vec<String>,
}

impl ReportState {
    /// Opens a new suite nested under the currently open one.
    ///
    /// Nesting is recorded in the name: a child suite is reported as
    /// `"{parent} {title}"`.
    pub fn start_suite(&mut self, title: &str) {
        let name = match self.suite_stack.last() {
            Some(parent) => format!("{} {title}", parent.name),
            None => title.to_owned(),
        };
        let mut suite = Suite::new(name);
        suite.set_start(now());
        self.suite_stack.push(suite);
    }

    /// Closes the innermost open suite and queues it for writing.
    pub fn end_suite(&mut self) {
        let Some(mut suite) = self.suite_stack.pop() else {
            debug!("suite end with no open suite, ignoring");
            return;
        };
        suite.set_stop(now());
        self.finished_suites.push(suite);
    }

    /// Opens a new test under the current suite.
    pub fn start_test(&mut self, title: &str) -> &mut Test {
        let mut test = Test::new(title);
        test.set_start(now());
        self.current_test.insert(test)
    }

    /// Closes the current test and attaches it to the innermost open suite.
    ///
    /// Steps still open are handed to the tree unclosed; they are reported
    /// as pending. Returns whether a test was actually running.
    pub fn end_test(&mut self, status: Status, failure: Option<TestFailure>) -> bool {
        self.flatten_steps();
        let Some(mut test) = self.current_test.take() else {
            return false;
        };
        if let Some(failure) = failure {
            test.set_failure(failure);
        }
        test.set_stop(now());
        test.close(status);
        match self.suite_stack.last_mut() {
            Some(suite) => {
                suite.add_test(test);
            }
            None => debug!(name = %test.name, "test ended outside any suite, dropping"),
        }
        true
    }

    /// Records a skipped test: closed as pending, no steps, no duration.
    pub fn record_pending_test(&mut self, title: &str) {
        let Some(suite) = self.suite_stack.last_mut() else {
            debug!(title, "pending test outside any suite, ignoring");
            return;
        };
        let mut test = Test::new(title);
        let timestamp = now();
        test.set_start(timestamp);
        test.set_stop(timestamp);
        test.close(Status::Pending);
        suite.add_test(test);
    }

    /// Opens a new step nested under the deepest open step.
    pub fn open_step(&mut self, name: &str) {
        let mut step = Step::new(name);
        step.set_start(now());
        self.step_stack.push(step);
    }

    /// Attaches to the deepest open step, falling back to the current test.
    pub fn attach(&mut self, attachment: Attachment) {
        if let Some(step) = self.step_stack.last_mut() {
            step.add_attachment(attachment);
        } else if let Some(test) = self.current_test.as_mut() {
            test.add_attachment(attachment);
        } else {
            debug!(name = %attachment.name, "attachment with no open step or test, dropping");
        }
    }

    /// Closes the deepest open step and hands it to its parent.
    pub fn pop_step_closed(&mut self, status: Status) {
        let Some(mut step) = self.step_stack.pop() else {
            return;
        };
        step.set_stop(now());
        step.close(status);
        match self.step_stack.last_mut() {
            Some(parent) => {
                parent.add_step(step);
            }
            None => {
                if let Some(test) = self.current_test.as_mut() {
                    test.add_step(step);
                } else {
                    debug!(name = %step.name, "step closed with no current test, dropping");
                }
            }
        }
    }

    /// Force-closes every open step, deepest first.
    pub fn close_all_steps(&mut self, status: Status) {
        while !self.step_stack.is_empty() {
            self.pop_step_closed(status);
        }
    }

    /// Hands every open step to its parent without closing it.
    fn flatten_steps(&mut self) {
        while let Some(step) = self.step_stack.pop() {
            match self.step_stack.last_mut() {
                Some(parent) => {
                    parent.add_step(step);
                }
                None => {
                    if let Some(test) = self.current_test.as_mut() {
                        test.add_step(step);
                    } else {
                        debug!(name = %step.name, "open step with no current test, dropping");
                    }
                }
            }
        }
    }

    /// Whether this context has both an open suite and a running test.
    ///
    /// Command, result, step and attachment events are only meaningful in
    /// that situation.
    pub fn is_any_test_running(&self) -> bool {
        !self.suite_stack.is_empty() && self.current_test.is_some()
    }
}

/// The report states of every execution context seen so far.
#[derive(Debug, Default)]
pub struct ReportStateStore {
    states: IndexMap<Cid, ReportState>,
}

impl ReportStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `cid`, creating it on first use.
    pub fn state_mut(&mut self, cid: &Cid) -> &mut ReportState {
        self.states.entry(cid.clone()).or_default()
    }

    /// Returns the state for `cid` if that context has been seen.
    pub fn state(&self, cid: &Cid) -> Option<&ReportState> {
        self.states.get(cid)
    }

    /// Iterates over every context's state, in first-seen order.
    pub fn states_mut(&mut self) -> impl Iterator<Item = (&Cid, &mut ReportState)> {
        self.states.iter_mut()
    }
}

fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
