//! Operator credential file
//!
//! `VI_APPLICATION_CREDENTIALS` names a JSON file identifying the project and
//! the record database the chunker writes to. A relative `database_path` is
//! resolved against the credential file's directory.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ChunkerError, Result};

pub const CREDENTIALS_ENV: &str = "VI_APPLICATION_CREDENTIALS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub project_id: String,
    pub database_path: PathBuf,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let path = env::var_os(CREDENTIALS_ENV).ok_or_else(|| {
            ChunkerError::Credentials(format!(
                "set {CREDENTIALS_ENV} to the path of your credential file"
            ))
        })?;
        Self::load(Path::new(&path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChunkerError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut credentials: Credentials = serde_json::from_str(&content).map_err(|e| {
            ChunkerError::Credentials(format!("malformed {}: {e}", path.display()))
        })?;

        if credentials.project_id.trim().is_empty() {
            return Err(ChunkerError::Credentials(format!(
                "{} has an empty project_id",
                path.display()
            )));
        }
        if credentials.database_path.is_relative() {
            if let Some(dir) = path.parent() {
                credentials.database_path = dir.join(&credentials.database_path);
            }
        }
        Ok(credentials)
    }
}
