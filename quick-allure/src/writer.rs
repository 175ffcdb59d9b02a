// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write suites out as Allure-style result directories.

use crate::{Attachment, Suite, WriteError, serialize::serialize_suite};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use uuid::Uuid;

/// Writes suites into an output directory.
///
/// Each suite becomes a `<uuid>-suite.json` document; attachment payloads
/// are spilled into sibling `<uuid>-attachment.<ext>` files and referenced
/// by name from the document.
#[derive(Clone, Debug)]
pub struct ReportWriter {
    output_dir: Utf8PathBuf,
}

impl ReportWriter {
    /// Creates a new `ReportWriter` targeting the given directory.
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the directory this writer targets.
    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    /// Writes a suite document and its attachments, returning the path of
    /// the suite document.
    pub fn write_suite(&self, suite: &Suite) -> Result<Utf8PathBuf, WriteError> {
        fs::create_dir_all(&self.output_dir).map_err(|error| WriteError::Fs {
            path: self.output_dir.clone(),
            error,
        })?;

        let mut store = |attachment: &Attachment| self.store_attachment(attachment);
        let document = serialize_suite(suite, &mut store)?;

        let path = self
            .output_dir
            .join(format!("{}-suite.json", Uuid::new_v4()));
        let file = File::create(&path).map_err(|error| WriteError::Fs {
            path: path.clone(),
            error,
        })?;

        let mut serializer =
            serde_json::Serializer::with_formatter(file, PrettyFormatter::with_indent(b"    "));
        document
            .serialize(&mut serializer)
            .map_err(|error| WriteError::Json {
                path: path.clone(),
                error,
            })?;

        Ok(path)
    }

    fn store_attachment(&self, attachment: &Attachment) -> Result<String, WriteError> {
        let file_name = format!(
            "{}-attachment.{}",
            Uuid::new_v4(),
            extension_for(&attachment.mime_type)
        );
        let path = self.output_dir.join(&file_name);
        fs::write(&path, attachment.body.as_bytes())
            .map_err(|error| WriteError::Fs { path, error })?;
        Ok(file_name)
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "application/json" => "json",
        "image/png" => "png",
        _ if mime_type.starts_with("text/") => "txt",
        _ => "bin",
    }
}
