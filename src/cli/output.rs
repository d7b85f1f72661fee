//! Output formatting for detection results
//!
//! Results go to stdout in one of three formats. The TOML format mirrors the
//! `group.toml` and `plan.toml` documents written for the build phase.
//!
//! # Example
//!
//! ```no_run
//! use buildpack_detect::cli::output::{OutputFormat, OutputFormatter};
//! use buildpack_detect::detect::DetectResult;
//!
//! let result = DetectResult::default();
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format(&result).unwrap());
//! ```

use anyhow::{Context, Result};
use serde_json;

use crate::config::DetectorConfig;
use crate::detect::{DetectResult, FailureReport};
use crate::output::{GroupFile, PlanFile};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// The group and plan documents
    Toml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, result: &DetectResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(result).context("Failed to serialize detection result to JSON")
            }
            OutputFormat::Toml => self.format_toml(result),
            OutputFormat::Human => Ok(self.format_human(result)),
        }
    }

    /// Formats the attempts of a resolve call in which no group passed.
    pub fn format_failure(&self, report: &FailureReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).context("Failed to serialize failure report to JSON")
            }
            OutputFormat::Toml => toml::to_string(report).context("Failed to serialize failure report to TOML"),
            OutputFormat::Human => {
                let mut output = String::new();
                output.push_str("\u{2717} No buildpack group passed detection\n");
                output.push_str(RULE);
                output.push_str("\n\n");
                output.push_str(&report.to_string());
                Ok(output)
            }
        }
    }

    pub fn format_config(&self, config: &DetectorConfig) -> String {
        config.to_string()
    }

    fn format_toml(&self, result: &DetectResult) -> Result<String> {
        let group = GroupFile::from(&result.group)
            .to_toml()
            .context("Failed to serialize group to TOML")?;
        let plan = PlanFile::from(&result.plan)
            .to_toml()
            .context("Failed to serialize plan to TOML")?;
        Ok(format!("# group.toml\n{group}\n# plan.toml\n{plan}"))
    }

    fn format_human(&self, result: &DetectResult) -> String {
        let mut output = String::new();

        output.push_str("\u{2713} Detected Group\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str("Buildpacks:\n");
        push_tree(&mut output, result.group.group.iter().map(|r| r.to_string()));

        if !result.group.group_extensions.is_empty() {
            output.push_str("\nExtensions:\n");
            push_tree(&mut output, result.group.group_extensions.iter().map(|r| r.to_string()));
        }

        output.push_str("\nBuild Plan:\n");
        if result.plan.is_empty() {
            output.push_str("\u{2514}\u{2500} (empty)\n");
        } else {
            push_tree(
                &mut output,
                result.plan.entries.iter().map(|entry| {
                    let providers: Vec<String> = entry.providers.iter().map(|p| p.to_string()).collect();
                    format!("{} \u{2190} {}", entry.name, providers.join(", "))
                }),
            );
        }

        output
    }
}

fn push_tree(output: &mut String, lines: impl ExactSizeIterator<Item = String>) {
    let len = lines.len();
    for (i, line) in lines.enumerate() {
        let connector = if i + 1 == len { "\u{2514}" } else { "\u{251C}" };
        output.push_str(&format!("{}\u{2500} {}\n", connector, line));
    }
}
