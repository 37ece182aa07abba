use crate::error::{DiaryError, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One diary entry as stored in the remote document.
///
/// The wire names are `description` for the body and `date` for the timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub title: String,
    #[serde(rename = "description")]
    pub body: String,
    #[serde(rename = "date")]
    pub timestamp: String,
}

impl DiaryEntry {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::with_timestamp(title, body, now_timestamp())
    }

    pub fn with_timestamp(
        title: impl Into<String>,
        body: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        DiaryEntry {
            title: title.into(),
            body: body.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Sets the timestamp to the current local time.
    pub fn touch(&mut self) {
        self.timestamp = now_timestamp();
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "title": self.title,
            "description": self.body,
            "date": self.timestamp,
        })
    }

    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| DiaryError::MalformedEntry(e.to_string()))
    }
}

pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
