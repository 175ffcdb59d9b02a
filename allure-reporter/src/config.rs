// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporter configuration.

use camino::Utf8PathBuf;
use serde::Deserialize;

/// The directory reports are written to unless configured otherwise.
pub const DEFAULT_OUTPUT_DIR: &str = "allure-results";

/// Configuration for the reporter.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ReporterConfig {
    /// The directory suite documents and attachments are written to.
    pub output_dir: Utf8PathBuf,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_dir_defaults_when_absent() {
        let config: ReporterConfig = serde_json::from_str("{}").expect("empty config is valid");
        assert_eq!(config.output_dir, Utf8PathBuf::from("allure-results"));

        let config: ReporterConfig = serde_json::from_str(r#"{"output-dir": "reports/allure"}"#)
            .expect("config with output dir is valid");
        assert_eq!(config.output_dir, Utf8PathBuf::from("reports/allure"));
    }
}
