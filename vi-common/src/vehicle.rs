//! Org and vehicle identity
//!
//! Every object and record in the system is scoped by an org (tenant) and a
//! vehicle key. The vehicle key is a composite `make/model/year/trim` that is
//! used verbatim as a storage path prefix and, with `/` replaced by `__`, as a
//! record id in the database.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::RESERVED_FOLDER;
use crate::{Error, Result};

/// Separator substituted for `/` when a vehicle key is used as a record id
pub const DOC_ID_SEPARATOR: &str = "__";

/// Number of path segments in a vehicle key uploaded by the media pipeline
pub const VEHICLE_KEY_SEGMENTS: usize = 4;

/// Top-level tenant identity, the first segment of every object path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrgId(String);

impl OrgId {
    /// Validate and wrap an org identity.
    ///
    /// Must be a single non-empty path segment, and not the bucket's
    /// reserved bookkeeping folder.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(Error::InvalidInput("orgId must not be empty".to_string()));
        }
        if value.contains('/') {
            return Err(Error::InvalidInput(format!("orgId {value:?}: must be one path segment")));
        }
        validate_segment(value)
            .map_err(|reason| Error::InvalidInput(format!("orgId {value:?}: {reason}")))?;
        if value == RESERVED_FOLDER {
            return Err(Error::InvalidInput(format!("orgId {value:?} is reserved")));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrgId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<OrgId> for String {
    fn from(value: OrgId) -> Self {
        value.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite vehicle identity, conceptually `make/model/year/trim`
///
/// Any number of segments is accepted; the key only has to be non-empty and
/// made of clean path segments so it can be joined into object paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VehicleKey(String);

impl VehicleKey {
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim().trim_matches('/');
        if value.is_empty() {
            return Err(Error::InvalidInput("vehicleKey must not be empty".to_string()));
        }
        for segment in value.split('/') {
            validate_segment(segment)
                .map_err(|reason| Error::InvalidInput(format!("vehicleKey {value:?}: {reason}")))?;
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Record id for this vehicle (`honda/cr-v/2020/ex` → `honda__cr-v__2020__ex`)
    pub fn doc_id(&self) -> String {
        self.0.replace('/', DOC_ID_SEPARATOR)
    }
}

impl TryFrom<String> for VehicleKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VehicleKey> for String {
    fn from(value: VehicleKey) -> Self {
        value.0
    }
}

impl fmt::Display for VehicleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Object path prefix for everything stored for a vehicle
pub fn vehicle_root(org: &OrgId, vehicle: &VehicleKey) -> String {
    format!("{org}/{vehicle}")
}

fn validate_segment(segment: &str) -> std::result::Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty path segment");
    }
    if segment == "." || segment == ".." {
        return Err("relative path segment");
    }
    if segment.contains('\\') {
        return Err("backslash in path segment");
    }
    if segment.chars().any(char::is_control) {
        return Err("control character in path segment");
    }
    Ok(())
}

/// Media folder directly below a vehicle root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFolder {
    Videos,
    Captions,
}

impl MediaFolder {
    /// Case-insensitive folder name match
    pub fn from_segment(segment: &str) -> Option<Self> {
        if segment.eq_ignore_ascii_case("videos") {
            Some(Self::Videos)
        } else if segment.eq_ignore_ascii_case("captions") {
            Some(Self::Captions)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Captions => "captions",
        }
    }
}

/// Why an uploaded object path does not fit the media layout
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadPathError {
    #[error("expected {expected} segments before the media folder, found {found}")]
    TooShallow { expected: usize, found: usize },

    #[error("segment {index} is {found:?}, expected videos or captions")]
    NotMediaFolder { index: usize, found: String },

    #[error("no file name after the media folder")]
    MissingFileName,

    #[error("invalid identity: {0}")]
    Identity(String),
}

/// An uploaded media object path, parsed against the fixed layout
///
/// `{org}/{make}/{model}/{year}/{trim}/{videos|captions}/{file...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPath {
    pub org: OrgId,
    pub make: String,
    pub model: String,
    pub year: String,
    pub trim: String,
    pub folder: MediaFolder,
    /// Remainder below the media folder (may contain `/`)
    pub file: String,
}

impl UploadPath {
    pub fn parse(name: &str) -> std::result::Result<Self, UploadPathError> {
        let segments: Vec<&str> = name.split('/').collect();
        let folder_index = 1 + VEHICLE_KEY_SEGMENTS;

        if segments.len() <= folder_index {
            return Err(UploadPathError::TooShallow {
                expected: folder_index,
                found: segments.len().saturating_sub(1),
            });
        }

        let folder = MediaFolder::from_segment(segments[folder_index]).ok_or_else(|| {
            UploadPathError::NotMediaFolder {
                index: folder_index,
                found: segments[folder_index].to_string(),
            }
        })?;

        let file = segments[folder_index + 1..].join("/");
        if file.is_empty() {
            return Err(UploadPathError::MissingFileName);
        }

        let org = OrgId::parse(segments[0])
            .map_err(|e| UploadPathError::Identity(e.to_string()))?;
        for segment in &segments[1..folder_index] {
            validate_segment(segment)
                .map_err(|reason| UploadPathError::Identity(reason.to_string()))?;
        }

        Ok(Self {
            org,
            make: segments[1].to_string(),
            model: segments[2].to_string(),
            year: segments[3].to_string(),
            trim: segments[4].to_string(),
            folder,
            file,
        })
    }

    pub fn vehicle_key(&self) -> VehicleKey {
        // Segments were validated in parse()
        VehicleKey(format!(
            "{}/{}/{}/{}",
            self.make, self.model, self.year, self.trim
        ))
    }
}
