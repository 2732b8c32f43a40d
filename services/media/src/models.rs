//! Domain models for video ingestion

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Tolerance used when matching a ratio against 16:9 and 9:16
pub const ASPECT_TOLERANCE: f64 = 0.01;

/// Number of random bytes behind every object key and asset name
pub const TOKEN_BYTES: usize = 32;

/// Metadata record for a user-owned video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a draft video record
#[derive(Debug, Clone, Deserialize)]
pub struct NewVideo {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
}

/// Pixel geometry of the first video stream in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn aspect_class(&self) -> AspectClass {
        AspectClass::from_ratio(f64::from(self.width) / f64::from(self.height))
    }
}

/// Coarse orientation of a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Classify a width/height ratio. Total over all inputs, including NaN.
    pub fn from_ratio(ratio: f64) -> Self {
        if (ratio - 16.0 / 9.0).abs() < ASPECT_TOLERANCE {
            AspectClass::Landscape
        } else if (ratio - 9.0 / 16.0).abs() < ASPECT_TOLERANCE {
            AspectClass::Portrait
        } else {
            AspectClass::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 32 bytes from the OS CSPRNG, URL-safe base64 without padding
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Remote object key, rendered as `{orientation}/{token}.{extension}`
///
/// Keys are never checked for collisions. A put to an existing key
/// replaces the stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    orientation: AspectClass,
    token: String,
    extension: String,
}

impl ObjectKey {
    /// Derive a key with a fresh random token
    pub fn generate(orientation: AspectClass, extension: &str) -> Self {
        Self {
            orientation,
            token: random_token(),
            extension: extension.to_string(),
        }
    }

    pub fn orientation(&self) -> AspectClass {
        self.orientation
    }

    /// Public URL of the object under a distribution root
    pub fn public_url(&self, distribution_root: &str) -> String {
        format!("{}/{}", distribution_root.trim_end_matches('/'), self)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.orientation, self.token, self.extension)
    }
}

/// Recover the object key from a URL produced by [`ObjectKey::public_url`]
pub fn key_from_public_url<'a>(distribution_root: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(distribution_root.trim_end_matches('/'))?
        .strip_prefix('/')
        .filter(|key| !key.is_empty())
}

/// A parsed `type/subtype` media type with parameters dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    split: usize,
}

impl MediaType {
    /// Parse a Content-Type header value. Returns `None` when it is not
    /// a well-formed `type/subtype[; params]` value.
    pub fn parse(value: &str) -> Option<Self> {
        let essence = value.split(';').next()?.trim().to_ascii_lowercase();
        let split = essence.find('/')?;
        let (kind, subtype) = (&essence[..split], &essence[split + 1..]);

        let is_token = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
        };
        if !is_token(kind) || !is_token(subtype) {
            return None;
        }

        Some(Self { essence, split })
    }

    /// `type/subtype` in lowercase
    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn subtype(&self) -> &str {
        &self.essence[self.split + 1..]
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)
    }
}
