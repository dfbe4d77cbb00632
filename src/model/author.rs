//! Author profile records

use serde::{Deserialize, Serialize};

use super::Vulnerability;

/// Data extracted from one contributor profile page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorProfile {
    /// Author id; usually equal to the display name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Display name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Country name; `Unknown` when the profile carries the `XX` placeholder
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country: String,

    /// Two-letter country code, uppercased
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country_code: String,

    /// Number of reports attributed to the author
    #[serde(skip_serializing_if = "u32_is_zero")]
    pub reported_count: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub twitter: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub website: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub zone_h: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Reports on this profile page, deduplicated by derived id
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Vulnerability>,

    pub current_page: u32,

    pub total_pages: u32,
}

fn u32_is_zero(v: &u32) -> bool {
    *v == 0
}
