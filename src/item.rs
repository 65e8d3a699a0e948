//! Normalized item shared by every connector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record from an external service, in the shape the host application
/// renders regardless of which connector produced it.
///
/// Only `id`, `type` and `visibility` are always present; connectors fill
/// whatever else their source can provide.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationItem {
    pub id: String,

    #[serde(rename = "type")]
    pub item_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<DateTime<Utc>>,

    pub visibility: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path_or_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,
}

impl IntegrationItem {
    /// A visible item with only identity set.
    pub fn new(id: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type: item_type.into(),
            name: None,
            url: None,
            creation_time: None,
            last_modified_time: None,
            visibility: true,
            directory: None,
            parent_path_or_name: None,
            parent_id: None,
            children: None,
            mime_type: None,
            delta: None,
            drive_id: None,
        }
    }
}
