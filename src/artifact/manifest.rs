//! Build manifest: metadata the matcher uses to validate an artifact set.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub tokenizer: String,
    pub num_patterns: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salience_threshold: Option<f32>,
    pub built_at: String,
    pub separator_id: u32,
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

impl Manifest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let file = File::open(path)?;
        let manifest: Manifest = serde_json::from_reader(BufReader::new(file))?;

        if manifest.separator_id == 0 {
            return Err(ManifestError::Invalid(
                "separator_id must be non-zero".to_string(),
            ));
        }

        Ok(manifest)
    }

    /// Check that another build can replace this one without re-encoding
    /// clients: same tokenizer contract, same separator.
    pub fn validate_compatible(&self, other: &Manifest) -> Result<(), ManifestError> {
        if self.tokenizer != other.tokenizer {
            return Err(ManifestError::Invalid(format!(
                "tokenizer mismatch: expected {}, got {}",
                self.tokenizer, other.tokenizer
            )));
        }

        if self.separator_id != other.separator_id {
            return Err(ManifestError::Invalid(format!(
                "separator_id mismatch: expected {}, got {}",
                self.separator_id, other.separator_id
            )));
        }

        Ok(())
    }
}
