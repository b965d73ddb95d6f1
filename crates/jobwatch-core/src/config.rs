//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object `{}` is a valid config file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobwatchConfig {
    /// Directory that receives log objects whose remote source was unavailable.
    pub fallback_dir: PathBuf,

    /// How many trailing output lines a status record keeps. `None` keeps everything.
    pub stdout_window: Option<usize>,

    /// The only URI scheme accepted for remote log objects.
    pub remote_scheme: String,

    /// Folder under each group prefix that holds per-instance usage records.
    pub usage_log_dir: String,
}

impl Default for JobwatchConfig {
    fn default() -> Self {
        Self {
            fallback_dir: PathBuf::from("logs"),
            stdout_window: Some(20),
            remote_scheme: "s3".to_string(),
            usage_log_dir: "logs".to_string(),
        }
    }
}

impl JobwatchConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Local destination for a certificate that could not be read remotely.
    pub fn certificate_fallback(&self) -> PathBuf {
        self.fallback_dir.join("certificate.txt")
    }

    /// Local destination for a status record that could not be read remotely.
    pub fn status_fallback(&self) -> PathBuf {
        self.fallback_dir.join("status.json")
    }
}
