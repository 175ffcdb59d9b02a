// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The public reporter surface.

use crate::{
    config::ReporterConfig,
    errors::WriteEventError,
    reporter::{
        dispatcher::EventDispatcher,
        events::{EventKind, ReporterEvent},
        handlers,
        state::ReportStateStore,
    },
};
use quick_allure::ReportWriter;
use tracing::debug;

/// Turns a stream of [`ReporterEvent`]s into Allure report documents.
///
/// Holds all per-context report state internally; feed it events with
/// [`report_event`](Self::report_event) and call [`finish`](Self::finish)
/// once when the run ends to flush the report to disk.
pub struct AllureReporter {
    dispatcher: EventDispatcher,
}

impl AllureReporter {
    /// Creates a reporter with the default handlers wired up.
    pub fn new(config: ReporterConfig) -> Self {
        let writer = ReportWriter::new(config.output_dir);
        debug!(output_dir = %writer.output_dir(), "created reporter");

        let mut dispatcher = EventDispatcher::new();
        dispatcher.on(EventKind::SuiteStart, Box::new(handlers::on_suite_start));
        dispatcher.on(EventKind::SuiteEnd, Box::new(handlers::on_suite_end));
        dispatcher.on(EventKind::TestStart, Box::new(handlers::on_test_start));
        dispatcher.on(EventKind::TestPass, Box::new(handlers::on_test_pass));
        dispatcher.on(EventKind::TestFail, Box::new(handlers::on_test_fail));
        dispatcher.on(EventKind::TestPending, Box::new(handlers::on_test_pending));
        dispatcher.on(EventKind::HookStart, Box::new(handlers::on_hook_start));
        dispatcher.on(EventKind::HookEnd, Box::new(handlers::on_hook_end));
        dispatcher.on(EventKind::CommandStart, Box::new(handlers::on_command_start));
        dispatcher.on(EventKind::CommandEnd, Box::new(handlers::on_command_end));
        dispatcher.on(EventKind::FileAttach, Box::new(handlers::on_file_attach));
        dispatcher.on(EventKind::DataAttach, Box::new(handlers::on_data_attach));
        dispatcher.on(EventKind::FeatureTag, Box::new(handlers::on_feature_tag));
        dispatcher.on(EventKind::StepStart, Box::new(handlers::on_step_start));
        dispatcher.on(EventKind::StepEnd, Box::new(handlers::on_step_end));
        dispatcher.on(
            EventKind::RunEnd,
            Box::new(move |store, _event| handlers::on_run_end(store, &writer)),
        );

        Self { dispatcher }
    }

    /// Feeds one event to the reporter.
    ///
    /// The event is fully handled before this returns.
    pub fn report_event(&mut self, event: &ReporterEvent) -> Result<(), WriteEventError> {
        self.dispatcher.dispatch(event)
    }

    /// Finalizes the run: closes everything still open and writes every
    /// context's suites to the output directory.
    pub fn finish(&mut self) -> Result<(), WriteEventError> {
        self.report_event(&ReporterEvent::RunFinished)
    }

    /// Returns the report state accumulated so far.
    pub fn store(&self) -> &ReportStateStore {
        self.dispatcher.store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::events::{Cid, TestError, TestErrorKind};
    use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
    use pretty_assertions::assert_eq;
    use quick_allure::{AttachmentBody, Status};
    use serde_json::json;

    fn cid() -> Cid {
        Cid::from("0-0")
    }

    fn reporter() -> AllureReporter {
        AllureReporter::new(ReporterConfig::default())
    }

    fn report_all(reporter: &mut AllureReporter, events: &[ReporterEvent]) {
        for event in events {
            reporter.report_event(event).expect("event handled");
        }
    }

    fn start_suite_and_test() -> Vec<ReporterEvent> {
        vec![
            ReporterEvent::SuiteStarted {
                cid: cid(),
                title: "login flow".to_owned(),
            },
            ReporterEvent::TestStarted {
                cid: cid(),
                title: "logs in".to_owned(),
                capabilities: json!({"browserName": "chrome"}),
                specs: vec!["login.js".to_owned()],
            },
        ]
    }

    fn step_started(label: &str) -> ReporterEvent {
        ReporterEvent::StepStarted {
            cid: cid(),
            label: label.to_owned(),
        }
    }

    fn step_finished(label: &str, passed: bool) -> ReporterEvent {
        ReporterEvent::StepFinished {
            cid: cid(),
            label: label.to_owned(),
            passed,
        }
    }

    #[test]
    fn nested_suites_are_name_prefixed() {
        let mut reporter = reporter();
        report_all(
            &mut reporter,
            &[
                ReporterEvent::SuiteStarted {
                    cid: cid(),
                    title: "login".to_owned(),
                },
                ReporterEvent::SuiteStarted {
                    cid: cid(),
                    title: "bad password".to_owned(),
                },
            ],
        );

        let state = reporter.store().state(&cid()).expect("state created");
        assert_eq!(state.suite_stack[1].name, "login bad password");
    }

    #[test]
    fn test_start_records_environment_parameters() {
        let mut reporter = reporter();
        report_all(&mut reporter, &start_suite_and_test());

        let state = reporter.store().state(&cid()).expect("state created");
        let test = state.current_test.as_ref().expect("test open");
        assert_eq!(
            test.parameters["capabilities"].value,
            r#"{"browserName":"chrome"}"#
        );
        assert_eq!(test.parameters["spec files"].value, r#"["login.js"]"#);
    }

    #[test]
    fn failure_flush_closes_every_open_step() {
        let mut reporter = reporter();
        let mut events = start_suite_and_test();
        events.extend([
            step_started("A"),
            step_started("B"),
            step_started("C"),
            // Deferred: closing B now would cut C short.
            step_finished("B", true),
            ReporterEvent::TestFailed {
                cid: cid(),
                title: "logs in (failed)".to_owned(),
                error: TestError::new(TestErrorKind::Assertion, "expected the dashboard"),
            },
        ]);
        report_all(&mut reporter, &events);

        let state = reporter.store().state(&cid()).expect("state created");
        assert!(state.current_test.is_none());
        assert!(state.step_stack.is_empty());
        assert_eq!(state.postponed_steps, Vec::<String>::new());

        let test = state.suite_stack[0].tests.last().expect("test recorded");
        assert_eq!(test.name, "logs in (failed)");
        assert_eq!(test.status, Some(Status::Failed));
        let failure = test.failure.as_ref().expect("failure recorded");
        assert_eq!(failure.message.as_deref(), Some("expected the dashboard"));
        assert_eq!(failure.ty.as_deref(), Some("assertion"));

        let a = test.steps.last().expect("A attached");
        assert_eq!(a.status, Some(Status::Failed));
        assert_eq!(a.steps[0].status, Some(Status::Failed));
        assert_eq!(a.steps[0].steps[0].status, Some(Status::Failed));
    }

    #[test]
    fn failure_with_no_open_test_creates_one() {
        let mut reporter = reporter();
        report_all(
            &mut reporter,
            &[
                ReporterEvent::SuiteStarted {
                    cid: cid(),
                    title: "login flow".to_owned(),
                },
                ReporterEvent::TestFailed {
                    cid: cid(),
                    title: "hook blew up".to_owned(),
                    error: TestError::new(TestErrorKind::Other, "session not created"),
                },
            ],
        );

        let state = reporter.store().state(&cid()).expect("state created");
        let test = state.suite_stack[0].tests.last().expect("test recorded");
        assert_eq!(test.name, "hook blew up");
        assert_eq!(test.status, Some(Status::Broken));
    }

    #[test]
    fn empty_hook_test_leaves_no_trace() {
        let hook = "\"before all\" hook";
        let mut reporter = reporter();
        report_all(
            &mut reporter,
            &[
                ReporterEvent::SuiteStarted {
                    cid: cid(),
                    title: "login flow".to_owned(),
                },
                ReporterEvent::HookStarted {
                    cid: cid(),
                    title: hook.to_owned(),
                },
                ReporterEvent::HookFinished {
                    cid: cid(),
                    title: hook.to_owned(),
                },
            ],
        );

        let state = reporter.store().state(&cid()).expect("state created");
        assert_eq!(state.suite_stack[0].tests.len(), 0);
    }

    #[test]
    fn hook_test_with_steps_survives() {
        let hook = "\"after all\" hook";
        let mut reporter = reporter();
        report_all(
            &mut reporter,
            &[
                ReporterEvent::SuiteStarted {
                    cid: cid(),
                    title: "login flow".to_owned(),
                },
                ReporterEvent::HookStarted {
                    cid: cid(),
                    title: hook.to_owned(),
                },
                step_started("clean up session"),
                step_finished("clean up session", true),
                ReporterEvent::HookFinished {
                    cid: cid(),
                    title: hook.to_owned(),
                },
            ],
        );

        let state = reporter.store().state(&cid()).expect("state created");
        let test = state.suite_stack[0].tests.last().expect("hook test kept");
        assert_eq!(test.name, hook);
        assert_eq!(test.status, Some(Status::Passed));
        assert_eq!(test.steps.len(), 1);
    }

    #[test]
    fn non_logging_hooks_are_ignored() {
        let mut reporter = reporter();
        report_all(
            &mut reporter,
            &[
                ReporterEvent::SuiteStarted {
                    cid: cid(),
                    title: "login flow".to_owned(),
                },
                ReporterEvent::HookStarted {
                    cid: cid(),
                    title: "\"before each\" hook".to_owned(),
                },
            ],
        );

        let state = reporter.store().state(&cid()).expect("state created");
        assert!(state.current_test.is_none());
    }

    #[test]
    fn command_events_outside_a_test_are_ignored() {
        let mut reporter = reporter();
        report_all(
            &mut reporter,
            &[
                ReporterEvent::SuiteStarted {
                    cid: cid(),
                    title: "login flow".to_owned(),
                },
                ReporterEvent::CommandStarted {
                    cid: cid(),
                    method: "GET".to_owned(),
                    path: "/status".to_owned(),
                    data: None,
                },
            ],
        );

        let state = reporter.store().state(&cid()).expect("state created");
        assert!(state.step_stack.is_empty());
    }

    #[test]
    fn pending_tests_are_recorded_closed() {
        let mut reporter = reporter();
        report_all(
            &mut reporter,
            &[
                ReporterEvent::SuiteStarted {
                    cid: cid(),
                    title: "login flow".to_owned(),
                },
                ReporterEvent::TestPending {
                    cid: cid(),
                    title: "remembers the session".to_owned(),
                },
            ],
        );

        let state = reporter.store().state(&cid()).expect("state created");
        let test = state.suite_stack[0].tests.last().expect("test recorded");
        assert_eq!(test.status, Some(Status::Pending));
        assert!(test.steps.is_empty());
    }

    #[test]
    fn passing_test_keeps_unclosed_steps_open() {
        let mut reporter = reporter();
        let mut events = start_suite_and_test();
        events.extend([
            step_started("never closed"),
            ReporterEvent::TestPassed { cid: cid() },
        ]);
        report_all(&mut reporter, &events);

        let state = reporter.store().state(&cid()).expect("state created");
        let test = state.suite_stack[0].tests.last().expect("test recorded");
        assert_eq!(test.status, Some(Status::Passed));
        assert!(test.steps[0].is_open());
    }

    #[test]
    fn screenshot_results_attach_binary_data() {
        let path = "/session/abc/screenshot";
        let mut reporter = reporter();
        let mut events = start_suite_and_test();
        events.extend([
            ReporterEvent::CommandStarted {
                cid: cid(),
                method: "GET".to_owned(),
                path: path.to_owned(),
                data: None,
            },
            ReporterEvent::CommandFinished {
                cid: cid(),
                method: Some("GET".to_owned()),
                path: path.to_owned(),
                body: json!({"value": BASE64.encode([0x89, 0x50, 0x4e, 0x47])}),
            },
        ]);
        report_all(&mut reporter, &events);

        let state = reporter.store().state(&cid()).expect("state created");
        let test = state.current_test.as_ref().expect("test still open");
        let step = test.steps.last().expect("screenshot step closed");
        assert_eq!(step.name, "GET /session/abc/screenshot");
        assert_eq!(step.status, Some(Status::Passed));

        let attachment = step.attachments.last().expect("screenshot attached");
        assert_eq!(attachment.name, "Screenshot");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(
            attachment.body,
            AttachmentBody::Bytes(vec![0x89, 0x50, 0x4e, 0x47])
        );
    }

    #[test]
    fn command_results_default_to_get() {
        let mut reporter = reporter();
        let mut events = start_suite_and_test();
        events.extend([
            ReporterEvent::CommandStarted {
                cid: cid(),
                method: "GET".to_owned(),
                path: "/session/abc/title".to_owned(),
                data: None,
            },
            ReporterEvent::CommandFinished {
                cid: cid(),
                method: None,
                path: "/session/abc/title".to_owned(),
                body: json!({"value": "Dashboard"}),
            },
        ]);
        report_all(&mut reporter, &events);

        let state = reporter.store().state(&cid()).expect("state created");
        let test = state.current_test.as_ref().expect("test still open");
        let step = test.steps.last().expect("step closed");
        assert_eq!(step.status, Some(Status::Passed));
        assert_eq!(step.attachments.last().expect("response attached").name, "Response");
    }

    #[test]
    fn feature_tags_become_labels() {
        let mut reporter = reporter();
        let mut events = start_suite_and_test();
        events.push(ReporterEvent::FeatureTagged {
            cid: cid(),
            features: vec!["authentication".to_owned()],
        });
        report_all(&mut reporter, &events);

        let state = reporter.store().state(&cid()).expect("state created");
        let test = state.current_test.as_ref().expect("test open");
        assert_eq!(test.labels[0].name, "feature");
        assert_eq!(test.labels[0].value, "authentication");
    }

    #[test]
    fn contexts_do_not_interleave() {
        let other = Cid::from("0-1");
        let mut reporter = reporter();
        let mut events = start_suite_and_test();
        events.extend([
            ReporterEvent::SuiteStarted {
                cid: other.clone(),
                title: "checkout flow".to_owned(),
            },
            step_started("only in 0-0"),
        ]);
        report_all(&mut reporter, &events);

        let state = reporter.store().state(&cid()).expect("state created");
        assert_eq!(state.step_stack.len(), 1);
        let other_state = reporter.store().state(&other).expect("state created");
        assert!(other_state.step_stack.is_empty());
        assert_eq!(other_state.suite_stack[0].name, "checkout flow");
    }
}
