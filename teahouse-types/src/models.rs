use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::enums::ImageSlot;

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339_opts(SecondsFormat::Micros, true);
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if let Ok(date) = s.parse::<DateTime<Utc>>() {
            return Ok(date);
        }
        // `timestamp` columns come back without an offset; they are UTC
        s.parse::<NaiveDateTime>()
            .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// The store keeps counters nullable; a missing count is zero.
fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Identity issued by the auth collaborator. Read-only for this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl Profile {
    /// Stored image URL for the given slot, if any
    pub fn image(&self, slot: ImageSlot) -> Option<&str> {
        match slot {
            ImageSlot::Avatar => self.avatar_url.as_deref(),
            ImageSlot::Cover => self.cover_url.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: Uuid,
    /// Author name as it was when the post was created
    pub author_name: String,
    pub image_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub likes_count: i64,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_owned_by(&self, user: Option<&User>) -> bool {
        user.map(|u| u.id == self.user_id).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: Uuid,
    pub author_name: String,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

// Insert and patch shapes sent to the record store

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub user_id: Uuid,
    pub author_name: String,
    pub image_url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: Uuid,
    pub author_name: String,
    pub content: String,
}

/// Partial profile update. Image fields use `Some(None)` to clear the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<Option<String>>,
}

impl ProfileUpdate {
    /// Name and bio edit. A blank bio clears the column.
    pub fn details(full_name: impl Into<String>, bio: &str) -> Self {
        let bio = bio.trim();
        Self {
            full_name: Some(full_name.into()),
            bio: Some(if bio.is_empty() { None } else { Some(bio.to_string()) }),
            ..Default::default()
        }
    }

    /// Set or clear one image column
    pub fn image(slot: ImageSlot, url: Option<String>) -> Self {
        match slot {
            ImageSlot::Avatar => Self {
                avatar_url: Some(url),
                ..Default::default()
            },
            ImageSlot::Cover => Self {
                cover_url: Some(url),
                ..Default::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
