// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The default event handlers.
//!
//! Each handler mutates the report state for the event's context. Only the
//! file-attach and run-end handlers can fail; everything else is pure state
//! bookkeeping.

use crate::{
    errors::WriteEventError,
    reporter::{
        events::{ReporterEvent, TestErrorKind},
        reconcile::reconcile,
        state::{ReportState, ReportStateStore},
    },
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use quick_allure::{Attachment, Label, ParameterKind, ReportWriter, Status, TestFailure};
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, ser::PrettyFormatter};
use std::{fs, sync::LazyLock};
use tracing::{debug, warn};

/// Hook titles that get a synthetic test case of their own, so that output
/// produced outside any test still lands in the report.
const LOGGING_HOOKS: [&str; 2] = ["\"before all\" hook", "\"after all\" hook"];

/// Matches command paths that return a screenshot.
static SCREENSHOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("/session/[^/]*/screenshot$").expect("screenshot regex is valid"));

pub(crate) fn on_suite_start(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::SuiteStarted { cid, title } = event else {
        return Ok(());
    };
    store.state_mut(cid).start_suite(title);
    Ok(())
}

pub(crate) fn on_suite_end(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::SuiteFinished { cid } = event else {
        return Ok(());
    };
    store.state_mut(cid).end_suite();
    Ok(())
}

pub(crate) fn on_test_start(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::TestStarted {
        cid,
        title,
        capabilities,
        specs,
    } = event
    else {
        return Ok(());
    };
    let test = store.state_mut(cid).start_test(title);
    test.add_parameter(
        ParameterKind::EnvironmentVariable,
        "capabilities",
        capabilities.to_string(),
    );
    test.add_parameter(
        ParameterKind::EnvironmentVariable,
        "spec files",
        Value::from(specs.clone()).to_string(),
    );
    Ok(())
}

pub(crate) fn on_test_pass(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::TestPassed { cid } = event else {
        return Ok(());
    };
    store.state_mut(cid).end_test(Status::Passed, None);
    Ok(())
}

pub(crate) fn on_test_fail(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::TestFailed { cid, title, error } = event else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    let status = error.kind.status();

    // A failure can arrive before the test-start event, e.g. when a
    // "before each" hook throws. The failing title always wins.
    match state.current_test.as_mut() {
        Some(test) => {
            test.set_name(title);
        }
        None => {
            state.start_test(title);
        }
    }

    state.close_all_steps(status);
    state.postponed_steps.clear();

    let mut failure = TestFailure::new();
    failure.set_message(&error.message).set_type(match error.kind {
        TestErrorKind::Assertion => "assertion",
        TestErrorKind::Other => "error",
    });
    state.end_test(status, Some(failure));
    Ok(())
}

pub(crate) fn on_test_pending(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::TestPending { cid, title } = event else {
        return Ok(());
    };
    store.state_mut(cid).record_pending_test(title);
    Ok(())
}

pub(crate) fn on_hook_start(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::HookStarted { cid, title } = event else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    if state.suite_stack.is_empty() || !LOGGING_HOOKS.contains(&title.as_str()) {
        return Ok(());
    }
    state.start_test(title);
    Ok(())
}

pub(crate) fn on_hook_end(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::HookFinished { cid, title } = event else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    if state.suite_stack.is_empty() || !LOGGING_HOOKS.contains(&title.as_str()) {
        return Ok(());
    }

    // A hook that produced no steps leaves no trace in the report.
    if state.end_test(Status::Passed, None) {
        if let Some(suite) = state.suite_stack.last_mut() {
            if suite.tests.last().is_some_and(|test| test.steps.is_empty()) {
                suite.tests.pop();
            }
        }
    }
    state.postponed_steps.clear();
    Ok(())
}

pub(crate) fn on_command_start(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::CommandStarted {
        cid,
        method,
        path,
        data,
    } = event
    else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    if !state.is_any_test_running() {
        debug!(%cid, path, "command outside any test, ignoring");
        return Ok(());
    }

    state.open_step(&format!("{method} {path}"));
    if let Some(data) = data {
        if !is_empty_payload(data) {
            state.attach(dump_json("Request", data));
        }
    }
    Ok(())
}

pub(crate) fn on_command_end(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::CommandFinished {
        cid,
        method,
        path,
        body,
    } = event
    else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    if !state.is_any_test_running() {
        debug!(%cid, path, "command result outside any test, ignoring");
        return Ok(());
    }

    if SCREENSHOT_RE.is_match(path) {
        attach_screenshot(state, body);
    } else {
        state.attach(dump_json("Response", body));
    }

    let step_name = format!("{} {path}", method.as_deref().unwrap_or("GET"));
    reconcile(state, &step_name, Status::Passed);
    Ok(())
}

pub(crate) fn on_file_attach(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::FileAttached {
        cid,
        path,
        name,
        mime_type,
    } = event
    else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    if !state.is_any_test_running() {
        debug!(%cid, %path, "file attachment outside any test, ignoring");
        return Ok(());
    }

    let body = fs::read(path).map_err(|error| WriteEventError::Fs {
        path: path.clone(),
        error,
    })?;
    let name = name
        .clone()
        .or_else(|| path.file_name().map(str::to_owned))
        .unwrap_or_else(|| path.to_string());
    let mime_type = mime_type.as_deref().unwrap_or("text/plain");
    state.attach(Attachment::bytes(name, body, mime_type));
    Ok(())
}

pub(crate) fn on_data_attach(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::DataAttached { cid, name, data } = event else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    if !state.is_any_test_running() {
        debug!(%cid, name, "data attachment outside any test, ignoring");
        return Ok(());
    }
    state.attach(dump_json(name, data));
    Ok(())
}

pub(crate) fn on_feature_tag(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::FeatureTagged { cid, features } = event else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    let Some(test) = state.current_test.as_mut() else {
        debug!(%cid, "feature tags outside any test, ignoring");
        return Ok(());
    };
    for feature in features {
        test.add_label(Label::feature(feature));
    }
    Ok(())
}

pub(crate) fn on_step_start(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::StepStarted { cid, label } = event else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    if !state.is_any_test_running() {
        debug!(%cid, label, "step outside any test, ignoring");
        return Ok(());
    }
    state.open_step(label);
    Ok(())
}

pub(crate) fn on_step_end(
    store: &mut ReportStateStore,
    event: &ReporterEvent,
) -> Result<(), WriteEventError> {
    let ReporterEvent::StepFinished { cid, label, passed } = event else {
        return Ok(());
    };
    let state = store.state_mut(cid);
    if !state.is_any_test_running() {
        debug!(%cid, label, "step end outside any test, ignoring");
        return Ok(());
    }
    let status = if *passed {
        Status::Passed
    } else {
        Status::Broken
    };
    reconcile(state, label, status);
    Ok(())
}

/// Finalizes every context and writes its suites to disk.
///
/// Anything still open at run end did not finish cleanly and is closed as
/// broken.
pub(crate) fn on_run_end(
    store: &mut ReportStateStore,
    writer: &ReportWriter,
) -> Result<(), WriteEventError> {
    for (cid, state) in store.states_mut() {
        state.close_all_steps(Status::Broken);
        state.end_test(Status::Broken, None);
        while !state.suite_stack.is_empty() {
            state.end_suite();
        }
        state.postponed_steps.clear();

        let suites = std::mem::take(&mut state.finished_suites);
        debug!(%cid, suites = suites.len(), "writing report");
        for suite in &suites {
            writer
                .write_suite(suite)
                .map_err(|error| WriteEventError::Report {
                    cid: cid.clone(),
                    error,
                })?;
        }
    }
    Ok(())
}

fn attach_screenshot(state: &mut ReportState, body: &Value) {
    let Some(encoded) = body.get("value").and_then(Value::as_str) else {
        warn!("screenshot result carries no base64 value, skipping attachment");
        return;
    };
    match BASE64.decode(encoded) {
        Ok(bytes) => state.attach(Attachment::bytes("Screenshot", bytes, "image/png")),
        Err(error) => warn!(%error, "screenshot payload is not valid base64, skipping attachment"),
    }
}

/// Serializes a JSON value into a pretty-printed attachment.
fn dump_json(name: &str, value: &Value) -> Attachment {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .expect("serializing a JSON value to memory succeeds");
    let body = String::from_utf8(buf).expect("serde_json output is UTF-8");
    Attachment::text(name, body, "application/json")
}

/// Whether a request payload is worth attaching. Mirrors the convention
/// that an absent body, `null`, or an empty object carries no information.
fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(null), true; "null")]
    #[test_case(json!({}), true; "empty object")]
    #[test_case(json!([]), true; "empty array")]
    #[test_case(json!(""), true; "empty string")]
    #[test_case(json!({"using": "css"}), false; "object with keys")]
    #[test_case(json!(0), false; "number")]
    fn empty_payloads(value: Value, empty: bool) {
        assert_eq!(is_empty_payload(&value), empty);
    }

    #[test_case("/session/abc123/screenshot", true; "plain session id")]
    #[test_case("/wd/hub/session/abc123/screenshot", true; "hub prefix")]
    #[test_case("/session//screenshot", true; "empty session id")]
    #[test_case("/session/abc123/element", false; "other command")]
    #[test_case("/session/abc123/screenshot/extra", false; "trailing segment")]
    fn screenshot_paths(path: &str, matches: bool) {
        assert_eq!(SCREENSHOT_RE.is_match(path), matches);
    }

    #[test]
    fn dump_json_pretty_prints_with_four_spaces() {
        let attachment = dump_json("Request", &json!({"using": "css", "value": "#login"}));
        assert_eq!(attachment.mime_type, "application/json");
        assert_eq!(
            std::str::from_utf8(attachment.body.as_bytes()).expect("text attachment"),
            "{\n    \"using\": \"css\",\n    \"value\": \"#login\"\n}"
        );
    }
}
