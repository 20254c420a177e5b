//! File metadata owned by the file-service.

use serde::{Deserialize, Serialize};

/// Whether a file-service entry is a regular file or a directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    /// Regular file (`"FILE"`).
    File,
    /// Directory (`"DIR"`), metadata only.
    Dir,
    /// Any other type string.
    Unknown(String),
}

impl FileType {
    /// Returns the wire string for this file type.
    pub fn as_str(&self) -> &str {
        match self {
            FileType::File => "FILE",
            FileType::Dir => "DIR",
            FileType::Unknown(raw) => raw,
        }
    }
}

impl From<String> for FileType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "FILE" => FileType::File,
            "DIR" => FileType::Dir,
            _ => FileType::Unknown(raw),
        }
    }
}

impl From<FileType> for String {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Metadata of a file as reported by the file-service.
///
/// Every field is optional on the wire. The follower only reads this record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileInfo {
    /// File name.
    pub name: Option<String>,
    /// File-service uuid.
    pub uuid: Option<String>,
    /// Size in bytes.
    pub size_in_bytes: Option<i64>,
    /// Whether the file-service has marked the file deleted.
    pub is_deleted: Option<bool>,
    /// Uploader id.
    pub uploader_id: Option<i64>,
    /// Uploader name.
    pub uploader_name: Option<String>,
    /// User group.
    pub user_group: Option<i64>,
    /// File or directory.
    pub file_type: Option<FileType>,
    /// Key of the parent directory.
    pub parent_file: Option<String>,
}

impl FileInfo {
    /// Creates metadata for a regular file.
    pub fn file(name: impl Into<String>, size_in_bytes: i64) -> Self {
        Self {
            name: Some(name.into()),
            size_in_bytes: Some(size_in_bytes),
            is_deleted: Some(false),
            file_type: Some(FileType::File),
            ..Self::default()
        }
    }

    /// Creates metadata for a directory.
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_deleted: Some(false),
            file_type: Some(FileType::Dir),
            ..Self::default()
        }
    }

    /// Returns the effective file type. A missing type means a regular file.
    pub fn effective_type(&self) -> FileType {
        self.file_type.clone().unwrap_or(FileType::File)
    }
}
