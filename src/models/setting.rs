use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// Application-wide key/value setting managed from the admin panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub updated_by: Option<UserSummary>,
    pub updated_at: DateTime<Utc>,
}

/// Accepts any JSON scalar; it is stored as text
#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl UpdateSettingRequest {
    /// The value as stored, or `None` when missing or null
    pub fn as_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
