//! File-based stream types

use crate::cursor::format_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record field holding the uri of the file a record came from
pub const FILE_URL_FIELD: &str = "_ab_source_file_url";

/// A file visible to a file-based stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Identity of the file (path relative to the source root)
    pub uri: String,
    /// Last modification time
    pub last_modified: DateTime<Utc>,
}

impl RemoteFile {
    /// Create a new remote file
    pub fn new(uri: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            uri: uri.into(),
            last_modified,
        }
    }

    /// Last modification time in persisted-state format
    pub fn last_modified_string(&self) -> String {
        format_timestamp(&self.last_modified)
    }
}
