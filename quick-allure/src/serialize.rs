// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a [`Suite`] into a JSON document.
//!
//! Attachment payloads are not embedded in the document; each one is handed
//! to a store callback which persists it and returns a `source` reference.

use crate::{Attachment, Label, Parameter, Status, Step, Suite, Test, TestFailure, WriteError};
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value, json};

static NAME_KEY: &str = "name";
static STATUS_KEY: &str = "status";
static START_KEY: &str = "start";
static STOP_KEY: &str = "stop";
static TEST_CASES_KEY: &str = "testCases";
static PARAMETERS_KEY: &str = "parameters";
static LABELS_KEY: &str = "labels";
static STEPS_KEY: &str = "steps";
static ATTACHMENTS_KEY: &str = "attachments";
static FAILURE_KEY: &str = "failure";

/// Persists an attachment payload and returns its `source` reference.
pub(crate) type AttachmentStore<'a> = dyn FnMut(&Attachment) -> Result<String, WriteError> + 'a;

pub(crate) fn serialize_suite(
    suite: &Suite,
    store: &mut AttachmentStore<'_>,
) -> Result<Value, WriteError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let Suite {
        name,
        start,
        stop,
        tests,
    } = suite;

    let mut map = Map::new();
    map.insert(NAME_KEY.into(), json!(name));
    insert_timestamp(&mut map, START_KEY, *start);
    insert_timestamp(&mut map, STOP_KEY, *stop);

    let tests = tests
        .iter()
        .map(|test| serialize_test(test, store))
        .collect::<Result<Vec<_>, _>>()?;
    map.insert(TEST_CASES_KEY.into(), Value::Array(tests));

    Ok(Value::Object(map))
}

fn serialize_test(test: &Test, store: &mut AttachmentStore<'_>) -> Result<Value, WriteError> {
    let Test {
        name,
        status,
        start,
        stop,
        parameters,
        labels,
        steps,
        attachments,
        failure,
    } = test;

    let mut map = Map::new();
    map.insert(NAME_KEY.into(), json!(name));
    map.insert(STATUS_KEY.into(), serialize_status(*status));
    insert_timestamp(&mut map, START_KEY, *start);
    insert_timestamp(&mut map, STOP_KEY, *stop);

    let parameters = parameters
        .iter()
        .map(|(name, parameter)| {
            let Parameter { kind, value } = parameter;
            json!({
                "kind": kind.as_str(),
                "name": name,
                "value": value,
            })
        })
        .collect();
    map.insert(PARAMETERS_KEY.into(), Value::Array(parameters));

    let labels = labels
        .iter()
        .map(|label| {
            let Label { name, value } = label;
            json!({ "name": name, "value": value })
        })
        .collect();
    map.insert(LABELS_KEY.into(), Value::Array(labels));

    if let Some(failure) = failure {
        let TestFailure { message, ty } = failure;
        map.insert(
            FAILURE_KEY.into(),
            json!({ "message": message, "type": ty }),
        );
    }

    let steps = steps
        .iter()
        .map(|step| serialize_step(step, store))
        .collect::<Result<Vec<_>, _>>()?;
    map.insert(STEPS_KEY.into(), Value::Array(steps));

    map.insert(
        ATTACHMENTS_KEY.into(),
        serialize_attachments(attachments, store)?,
    );

    Ok(Value::Object(map))
}

fn serialize_step(step: &Step, store: &mut AttachmentStore<'_>) -> Result<Value, WriteError> {
    let Step {
        name,
        status,
        start,
        stop,
        steps,
        attachments,
    } = step;

    let mut map = Map::new();
    map.insert(NAME_KEY.into(), json!(name));
    map.insert(STATUS_KEY.into(), serialize_status(*status));
    insert_timestamp(&mut map, START_KEY, *start);
    insert_timestamp(&mut map, STOP_KEY, *stop);

    let steps = steps
        .iter()
        .map(|step| serialize_step(step, store))
        .collect::<Result<Vec<_>, _>>()?;
    map.insert(STEPS_KEY.into(), Value::Array(steps));

    map.insert(
        ATTACHMENTS_KEY.into(),
        serialize_attachments(attachments, store)?,
    );

    Ok(Value::Object(map))
}

fn serialize_attachments(
    attachments: &[Attachment],
    store: &mut AttachmentStore<'_>,
) -> Result<Value, WriteError> {
    let attachments = attachments
        .iter()
        .map(|attachment| {
            let source = store(attachment)?;
            Ok(json!({
                "name": attachment.name,
                "source": source,
                "type": attachment.mime_type,
            }))
        })
        .collect::<Result<Vec<_>, WriteError>>()?;
    Ok(Value::Array(attachments))
}

fn serialize_status(status: Option<Status>) -> Value {
    json!(status.unwrap_or(Status::Pending).as_str())
}

fn insert_timestamp(map: &mut Map<String, Value>, key: &str, ts: Option<DateTime<FixedOffset>>) {
    if let Some(ts) = ts {
        map.insert(key.into(), json!(ts.timestamp_millis()));
    }
}
