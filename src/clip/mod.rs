use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::{ClipSyncError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipType {
    Text,
    Image,
}

impl ClipType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClipType::Text => "text",
            ClipType::Image => "image",
        }
    }

    pub fn default_mime(self) -> &'static str {
        match self {
            ClipType::Text => "text/plain",
            ClipType::Image => "image/png",
        }
    }
}

impl fmt::Display for ClipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClipType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(ClipType::Text),
            "image" => Ok(ClipType::Image),
            _ => Err("type must be 'text' or 'image'".to_string()),
        }
    }
}

/// Device a clip originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Phone,
    #[serde(alias = "desktop")]
    Pc,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Phone => "phone",
            Source::Pc => "pc",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "phone" => Ok(Source::Phone),
            "pc" | "desktop" => Ok(Source::Pc),
            _ => Err("source must be 'phone' or 'pc'".to_string()),
        }
    }
}

/// The payload part of a clip: what actually sits on a clipboard.
///
/// For images `data` is base64-encoded PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipContent {
    pub clip_type: ClipType,
    pub data: String,
}

impl ClipContent {
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            clip_type: ClipType::Text,
            data: data.into(),
        }
    }

    pub fn image(base64_png: impl Into<String>) -> Self {
        Self {
            clip_type: ClipType::Image,
            data: base64_png.into(),
        }
    }

    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.clip_type.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(self.data.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A stored clip. Never mutated after it is accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    #[serde(rename = "type")]
    pub clip_type: ClipType,
    pub data: String,
    pub mime: String,
    pub source: Source,
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

impl Clip {
    pub fn content(&self) -> ClipContent {
        ClipContent {
            clip_type: self.clip_type,
            data: self.data.clone(),
        }
    }

    pub fn fingerprint(&self) -> String {
        self.content().fingerprint()
    }
}

/// Body of `POST /clip` as it arrives on the wire.
///
/// Every field is optional here so a missing field surfaces as a
/// validation message rather than a generic parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipSubmission {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub clip_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ClipSubmission {
    pub fn new(content: ClipContent, source: Source) -> Self {
        Self {
            clip_type: Some(content.clip_type.as_str().to_string()),
            mime: Some(content.clip_type.default_mime().to_string()),
            data: Some(content.data),
            source: Some(source.as_str().to_string()),
        }
    }

    /// Checks the structural shape and builds the clip to store.
    pub fn into_clip(self, created_at: i64) -> Result<Clip> {
        let clip_type = match self.clip_type.as_deref() {
            Some(t) => t.parse::<ClipType>().map_err(ClipSyncError::MalformedRequest)?,
            None => {
                return Err(ClipSyncError::MalformedRequest(
                    "type must be 'text' or 'image'".to_string(),
                ))
            }
        };

        let data = self
            .data
            .ok_or_else(|| ClipSyncError::MalformedRequest("data is required".to_string()))?;

        let source = match self.source.as_deref() {
            Some(s) => s.parse::<Source>().map_err(ClipSyncError::MalformedRequest)?,
            None => Source::Pc,
        };

        let mime = self
            .mime
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| clip_type.default_mime().to_string());

        Ok(Clip {
            clip_type,
            data,
            mime,
            source,
            created_at,
        })
    }
}
