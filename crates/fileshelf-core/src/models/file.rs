use std::fmt;
use std::str::FromStr;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::constants::THUMBNAIL_WIDTHS;
use crate::error::{AppError, ParentError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Folder,
    File,
    Image,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::File => "file",
            FileType::Image => "image",
        }
    }

    /// Folders are the only nodes without stored content.
    pub fn has_content(&self) -> bool {
        !matches!(self, FileType::Folder)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "folder" => Ok(FileType::Folder),
            "file" => Ok(FileType::File),
            "image" => Ok(FileType::Image),
            _ => Err(AppError::MissingField("type")),
        }
    }
}

/// Where a node sits in its owner's tree. The root serializes as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParentRef {
    #[default]
    Root,
    Folder(Uuid),
}

impl ParentRef {
    /// Interpret a client-supplied `parentId` body value.
    ///
    /// `null`, `0` and `"0"` mean the root. Anything that is not a file id
    /// cannot name an existing folder.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ParentError> {
        match value {
            serde_json::Value::Null => Ok(ParentRef::Root),
            serde_json::Value::Number(n) if n.as_u64() == Some(0) => Ok(ParentRef::Root),
            serde_json::Value::String(s) => Self::from_query(s).ok_or(ParentError::NotFound),
            _ => Err(ParentError::NotFound),
        }
    }

    /// Interpret a `parentId` query value. `None` means the value names no node.
    pub fn from_query(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "0" {
            return Some(ParentRef::Root);
        }
        Uuid::parse_str(raw).ok().map(ParentRef::Folder)
    }

    pub fn folder_id(&self) -> Option<Uuid> {
        match self {
            ParentRef::Root => None,
            ParentRef::Folder(id) => Some(*id),
        }
    }
}

impl From<Option<Uuid>> for ParentRef {
    fn from(id: Option<Uuid>) -> Self {
        id.map_or(ParentRef::Root, ParentRef::Folder)
    }
}

impl Serialize for ParentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParentRef::Root => serializer.serialize_u8(0),
            ParentRef::Folder(id) => id.serialize(serializer),
        }
    }
}

/// A folder, file or image record in the metadata tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub is_public: bool,
    pub parent_id: ParentRef,
    /// Set exactly once for non-folders; never exposed to clients.
    #[serde(skip)]
    pub storage_key: Option<String>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /files` as sent by the client.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<serde_json::Value>,
    #[serde(default)]
    pub is_public: Option<bool>,
    /// Base64 content; required unless `type` is `folder`.
    #[serde(default)]
    pub data: Option<String>,
}

/// An upload that passed field validation. The parent has not been
/// resolved against the tree yet.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub name: String,
    pub file_type: FileType,
    pub parent: ParentRef,
    pub is_public: bool,
    /// Decoded bytes, present iff `file_type` has content.
    pub content: Option<Vec<u8>>,
}

impl UploadRequest {
    /// Checks run in order: name, type, data, parent id shape, data encoding.
    pub fn validate(self) -> Result<NewUpload, AppError> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or(AppError::MissingField("name"))?;

        let file_type: FileType = self
            .file_type
            .as_deref()
            .ok_or(AppError::MissingField("type"))?
            .parse()?;

        let data = match file_type {
            FileType::Folder => None,
            _ => Some(
                self.data
                    .filter(|d| !d.is_empty())
                    .ok_or(AppError::MissingField("data"))?,
            ),
        };

        let parent = match &self.parent_id {
            Some(value) => ParentRef::from_json(value)?,
            None => ParentRef::Root,
        };

        let content = match data {
            Some(encoded) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|_| AppError::InvalidInput("Invalid data".to_string()))?,
            ),
            None => None,
        };

        Ok(NewUpload {
            name,
            file_type,
            parent,
            is_public: self.is_public.unwrap_or(false),
            content,
        })
    }
}

/// One of the fixed thumbnail widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailWidth(u32);

impl ThumbnailWidth {
    pub fn all() -> impl Iterator<Item = ThumbnailWidth> {
        THUMBNAIL_WIDTHS.into_iter().map(ThumbnailWidth)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ThumbnailWidth {
    type Error = AppError;

    fn try_from(width: u32) -> Result<Self, Self::Error> {
        if THUMBNAIL_WIDTHS.contains(&width) {
            Ok(ThumbnailWidth(width))
        } else {
            Err(AppError::InvalidInput("Invalid size".to_string()))
        }
    }
}

impl FromStr for ThumbnailWidth {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let width: u32 = s
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidInput("Invalid size".to_string()))?;
        ThumbnailWidth::try_from(width)
    }
}

impl fmt::Display for ThumbnailWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> UploadRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_root_parent_serializes_as_zero() {
        let node = FileNode {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "docs".into(),
            file_type: FileType::Folder,
            is_public: false,
            parent_id: ParentRef::Root,
            storage_key: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["parentId"], json!(0));
        assert_eq!(value["type"], json!("folder"));
        assert_eq!(value["isPublic"], json!(false));
        assert!(value.get("storageKey").is_none());
        assert!(value.get("createdAt").is_none());
    }

    #[test]
    fn test_parent_ref_accepts_root_spellings() {
        assert_eq!(ParentRef::from_json(&json!(0)), Ok(ParentRef::Root));
        assert_eq!(ParentRef::from_json(&json!("0")), Ok(ParentRef::Root));
        assert_eq!(ParentRef::from_json(&json!(null)), Ok(ParentRef::Root));
        let id = Uuid::new_v4();
        assert_eq!(
            ParentRef::from_json(&json!(id.to_string())),
            Ok(ParentRef::Folder(id))
        );
        assert_eq!(
            ParentRef::from_json(&json!("not-an-id")),
            Err(ParentError::NotFound)
        );
        assert_eq!(ParentRef::from_json(&json!(7)), Err(ParentError::NotFound));
    }

    #[test]
    fn test_upload_validation_order() {
        let err = request(json!({})).validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing name");

        let err = request(json!({"name": "a"})).validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing type");

        let err = request(json!({"name": "a", "type": "video"}))
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing type");

        let err = request(json!({"name": "a", "type": "file", "parentId": "bogus"}))
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing data");

        let err = request(json!({"name": "a", "type": "file", "data": "aGk=", "parentId": "bogus"}))
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Parent not found");

        let err = request(json!({"name": "a", "type": "file", "data": "!!!"}))
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid data");
    }

    #[test]
    fn test_folder_upload_ignores_data() {
        let upload = request(json!({"name": "docs", "type": "folder", "data": "aGk="}))
            .validate()
            .unwrap();
        assert!(upload.content.is_none());
        assert_eq!(upload.parent, ParentRef::Root);
        assert!(!upload.is_public);
    }

    #[test]
    fn test_file_upload_decodes_content() {
        let upload = request(json!({"name": "hi.txt", "type": "file", "data": "aGVsbG8=", "isPublic": true}))
            .validate()
            .unwrap();
        assert_eq!(upload.content.as_deref(), Some(&b"hello"[..]));
        assert!(upload.is_public);
    }

    #[test]
    fn test_thumbnail_width_parsing() {
        assert_eq!("250".parse::<ThumbnailWidth>().unwrap().get(), 250);
        assert!("300".parse::<ThumbnailWidth>().is_err());
        assert!("abc".parse::<ThumbnailWidth>().is_err());
        let widths: Vec<u32> = ThumbnailWidth::all().map(|w| w.get()).collect();
        assert_eq!(widths, vec![500, 250, 100]);
    }
}
