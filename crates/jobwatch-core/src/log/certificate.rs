//! Job certificate: a shared text record with one status line per dataset.
//!
//! Layout of the raw text:
//!
//! ```text
//! JOB CERTIFICATE
//! ...
//! ================
//! DATANAME: grp/inputs/a.bam | STATUS: RUNNING | TIME: ... | LAST COMMAND: ... | CPU_USAGE: ...
//! <empty slot>
//! ================
//! ...
//! ```
//!
//! Only the lines strictly between the two dividers are ever rewritten.
//! Everything else is carried through byte for byte.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::LogDocument;
use crate::config::JobwatchConfig;
use crate::domain::{NOT_AVAILABLE, StatusRecord, format_timestamp};
use crate::error::{JobwatchError, Result};

pub const DIVIDER: &str = "================";

/// Name given to writable lines that do not carry a dataset yet.
pub const UNASSIGNED: &str = "__unassigned__";

static DATANAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^DATANAME: ([^|]*?) \|").unwrap());

const TEMPLATE: &str = include_str!("../../templates/certificate.txt");

/// Partial update for one certificate line. Unset fields are written as `N/A`.
///
/// Deserializes from the short-key mapping `{"n": .., "s": .., "t": .., "r": .., "u": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub last_command: Option<String>,

    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<String>,
}

impl InstanceInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn last_command(mut self, command: impl Into<String>) -> Self {
        self.last_command = Some(command.into());
        self
    }

    pub fn cpu_usage(mut self, usage: impl Into<String>) -> Self {
        self.cpu_usage = Some(usage.into());
        self
    }

    /// One-line summary of a status record, stamped with `now`.
    pub fn from_record(record: &StatusRecord, now: DateTime<Utc>) -> Self {
        Self::named(record.input.as_str())
            .status(record.status.as_str())
            .time(format_timestamp(now))
            .last_command(record.command.as_str())
            .cpu_usage(record.cpu_usage.as_str())
    }

    /// Dataset name this update addresses, trimmed (`N/A` when unset).
    ///
    /// This is both the name-index key and the text written after `DATANAME:`,
    /// so a line reads back under the same key it was written with.
    pub fn dataset(&self) -> &str {
        self.name.as_deref().map(str::trim).unwrap_or(NOT_AVAILABLE)
    }

    pub fn format_line(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        format!(
            "DATANAME: {} | STATUS: {} | TIME: {} | LAST COMMAND: {} | CPU_USAGE: {}",
            self.dataset(),
            field(&self.status),
            field(&self.time),
            field(&self.last_command),
            field(&self.cpu_usage),
        )
    }

    /// Inverse of [`InstanceInfo::format_line`]. Assumes no field contains ` | `.
    pub fn split_fields(line: &str) -> Option<Self> {
        let mut parts = line.split(" | ");
        let mut next = |label: &str| -> Option<String> {
            parts
                .next()?
                .strip_prefix(label)
                .map(|v| v.trim().to_string())
        };
        let info = Self {
            name: Some(next("DATANAME:")?),
            status: Some(next("STATUS:")?),
            time: Some(next("TIME:")?),
            last_command: Some(next("LAST COMMAND:")?),
            cpu_usage: Some(next("CPU_USAGE:")?),
        };
        Some(info)
    }
}

/// Line-indexed certificate.
///
/// `lines` holds every line of the raw text, `names` maps a dataset to the
/// writable line that carries it. The two-divider invariant is checked once,
/// in [`Certificate::process_rawcert`].
#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    lines: BTreeMap<usize, String>,
    names: HashMap<String, usize>,
    region: Range<usize>,
}

impl Certificate {
    pub fn process_rawcert(raw: &str) -> Result<Self> {
        let lines: BTreeMap<usize, String> = raw
            .split('\n')
            .enumerate()
            .map(|(i, line)| (i, line.to_string()))
            .collect();

        let dividers: Vec<usize> = lines
            .iter()
            .filter(|(_, line)| line.trim() == DIVIDER)
            .map(|(i, _)| *i)
            .collect();
        let &[open, close] = dividers.as_slice() else {
            return Err(JobwatchError::Format(format!(
                "certificate must contain exactly two divider lines, found {}",
                dividers.len()
            )));
        };
        let region = open + 1..close;

        let mut names = HashMap::new();
        for idx in region.clone() {
            let name = DATANAME
                .captures(&lines[&idx])
                .map(|caps| caps[1].trim().to_string())
                .unwrap_or_else(|| UNASSIGNED.to_string());
            names.entry(name).or_insert(idx);
        }

        Ok(Self {
            lines,
            names,
            region,
        })
    }

    /// Write one status line and return its line index.
    ///
    /// The line is the one already carrying the dataset when there is one;
    /// otherwise it is the `loc`-th writable line. A name match always wins
    /// over `loc`. Fails with `IndexOutOfRange`, without touching anything,
    /// when `loc` falls outside the writable region.
    pub fn update_instance_info(&mut self, update: &InstanceInfo, loc: usize) -> Result<usize> {
        let dataset = update.dataset();
        let target = match self.names.get(dataset) {
            Some(&idx) => idx,
            None => {
                if loc >= self.region.len() {
                    return Err(JobwatchError::IndexOutOfRange {
                        loc,
                        size: self.region.len(),
                    });
                }
                self.region.start + loc
            }
        };

        self.lines.insert(target, update.format_line());
        self.names.retain(|_, idx| *idx != target);
        self.names.insert(dataset.to_string(), target);
        Ok(target)
    }

    /// The whole certificate as text, lines in index order.
    pub fn render(&self) -> String {
        self.lines
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Line indices that may be rewritten.
    pub fn region(&self) -> Range<usize> {
        self.region.clone()
    }

    pub fn line(&self, idx: usize) -> Option<&str> {
        self.lines.get(&idx).map(String::as_str)
    }

    pub fn writable_lines(&self) -> Vec<&str> {
        self.region
            .clone()
            .filter_map(|idx| self.line(idx))
            .collect()
    }

    pub fn line_of(&self, dataset: &str) -> Option<usize> {
        self.names.get(dataset).copied()
    }

    /// Current status fields of `dataset`, if it has a line.
    pub fn entry(&self, dataset: &str) -> Option<InstanceInfo> {
        self.line_of(dataset)
            .and_then(|idx| self.line(idx))
            .and_then(InstanceInfo::split_fields)
    }
}

impl LogDocument for Certificate {
    const KIND: &'static str = "certificate";

    fn default_template() -> &'static str {
        TEMPLATE
    }

    fn parse(raw: &str) -> Result<Self> {
        Self::process_rawcert(raw)
    }

    fn serialize(&self) -> Result<String> {
        Ok(self.render())
    }

    fn fallback_path(config: &JobwatchConfig) -> PathBuf {
        config.certificate_fallback()
    }
}
