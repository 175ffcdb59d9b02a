// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use chrono::DateTime;
use pretty_assertions::assert_eq;
use quick_allure::{
    Attachment, Label, ParameterKind, ReportWriter, Status, Step, Suite, Test, TestFailure,
};
use serde_json::{Value, json};
use std::fs;

fn ts(millis: i64) -> chrono::DateTime<chrono::FixedOffset> {
    DateTime::from_timestamp_millis(millis)
        .expect("timestamp in range")
        .fixed_offset()
}

fn sample_suite() -> Suite {
    let mut suite = Suite::new("login flow");
    suite.set_start(ts(1_000)).set_stop(ts(9_000));

    let mut test = Test::new("logs in with valid credentials");
    test.set_start(ts(1_500)).set_stop(ts(8_000));
    test.add_parameter(ParameterKind::EnvironmentVariable, "capabilities", "{}");
    test.add_label(Label::feature("authentication"));

    let mut outer = Step::new("POST /session/abc/element");
    outer.set_start(ts(2_000)).set_stop(ts(4_000));
    outer.close(Status::Passed);
    outer.add_attachment(Attachment::text(
        "Request",
        "{\n    \"using\": \"css\"\n}",
        "application/json",
    ));

    let mut inner = Step::new("GET /session/abc/screenshot");
    inner.set_start(ts(2_500)).set_stop(ts(3_000));
    inner.close(Status::Passed);
    inner.add_attachment(Attachment::bytes("Screenshot", vec![0x89, 0x50], "image/png"));
    outer.add_step(inner);

    test.add_step(outer);
    test.close(Status::Passed);
    suite.add_test(test);

    let mut failing = Test::new("rejects a bad password");
    failing.set_start(ts(8_100)).set_stop(ts(8_900));
    failing.set_failure({
        let mut failure = TestFailure::new();
        failure
            .set_message("expected error banner")
            .set_type("assertion");
        failure
    });
    failing.close(Status::Failed);
    suite.add_test(failing);

    suite
}

#[test]
fn write_suite_document_and_attachments() {
    let dir = camino_tempfile::tempdir().expect("creating tempdir succeeds");
    let writer = ReportWriter::new(dir.path());

    let path = writer
        .write_suite(&sample_suite())
        .expect("writing the suite succeeds");
    assert!(
        path.as_str().ends_with("-suite.json"),
        "unexpected suite path: {path}"
    );

    let doc: Value = serde_json::from_str(&fs::read_to_string(&path).expect("suite file readable"))
        .expect("suite file is valid JSON");

    let request_source = doc["testCases"][0]["steps"][0]["attachments"][0]["source"]
        .as_str()
        .expect("request attachment has a source")
        .to_owned();
    let screenshot_source = doc["testCases"][0]["steps"][0]["steps"][0]["attachments"][0]["source"]
        .as_str()
        .expect("screenshot attachment has a source")
        .to_owned();
    assert!(request_source.ends_with(".json"), "{request_source}");
    assert!(screenshot_source.ends_with(".png"), "{screenshot_source}");

    let expected = json!({
        "name": "login flow",
        "start": 1_000,
        "stop": 9_000,
        "testCases": [
            {
                "name": "logs in with valid credentials",
                "status": "passed",
                "start": 1_500,
                "stop": 8_000,
                "parameters": [
                    {
                        "kind": "environment-variable",
                        "name": "capabilities",
                        "value": "{}",
                    },
                ],
                "labels": [
                    { "name": "feature", "value": "authentication" },
                ],
                "steps": [
                    {
                        "name": "POST /session/abc/element",
                        "status": "passed",
                        "start": 2_000,
                        "stop": 4_000,
                        "steps": [
                            {
                                "name": "GET /session/abc/screenshot",
                                "status": "passed",
                                "start": 2_500,
                                "stop": 3_000,
                                "steps": [],
                                "attachments": [
                                    {
                                        "name": "Screenshot",
                                        "source": screenshot_source,
                                        "type": "image/png",
                                    },
                                ],
                            },
                        ],
                        "attachments": [
                            {
                                "name": "Request",
                                "source": request_source,
                                "type": "application/json",
                            },
                        ],
                    },
                ],
                "attachments": [],
            },
            {
                "name": "rejects a bad password",
                "status": "failed",
                "start": 8_100,
                "stop": 8_900,
                "parameters": [],
                "labels": [],
                "failure": {
                    "message": "expected error banner",
                    "type": "assertion",
                },
                "steps": [],
                "attachments": [],
            },
        ],
    });
    assert_eq!(doc, expected);

    let request_path = Utf8PathBuf::from(dir.path()).join(&request_source);
    assert_eq!(
        fs::read_to_string(request_path).expect("request attachment readable"),
        "{\n    \"using\": \"css\"\n}"
    );
    let screenshot_path = Utf8PathBuf::from(dir.path()).join(&screenshot_source);
    assert_eq!(
        fs::read(screenshot_path).expect("screenshot attachment readable"),
        vec![0x89, 0x50]
    );
}

#[test]
fn close_is_idempotent() {
    let mut step = Step::new("GET /status");
    assert!(step.is_open());
    step.close(Status::Passed);
    step.close(Status::Broken);
    assert_eq!(step.status, Some(Status::Passed));

    let mut test = Test::new("only the first close counts");
    test.close(Status::Broken);
    test.close(Status::Passed);
    assert_eq!(test.status, Some(Status::Broken));
}

#[test]
fn open_units_serialize_as_pending() {
    let dir = camino_tempfile::tempdir().expect("creating tempdir succeeds");
    let writer = ReportWriter::new(dir.path());

    let mut suite = Suite::new("dangling");
    let mut test = Test::new("never closed");
    test.add_step(Step::new("never closed either"));
    suite.add_test(test);

    let path = writer.write_suite(&suite).expect("writing succeeds");
    let doc: Value = serde_json::from_str(&fs::read_to_string(path).expect("readable"))
        .expect("valid JSON");
    assert_eq!(doc["testCases"][0]["status"], json!("pending"));
    assert_eq!(doc["testCases"][0]["steps"][0]["status"], json!("pending"));
}
