//! Wire types of the third-party APIs
//!
//! Fields are lenient: missing optional fields default instead of failing
//! the whole response.

use serde::Deserialize;

/// `GET /search/ytsearch?q=` response
#[derive(Debug, Deserialize)]
pub struct VideoSearchResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: Vec<VideoSearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSearchItem {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub views: Option<NumberOrText>,
}

/// One entry of the `GET /search/searchtrack?q=` array response
#[derive(Debug, Deserialize)]
pub struct TrackSearchItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub duration: Option<DurationLabel>,
}

#[derive(Debug, Deserialize)]
pub struct DurationLabel {
    #[serde(default)]
    pub label: String,
}

/// `GET /download/audio?url=...&mode=Url` response
#[derive(Debug, Deserialize)]
pub struct StreamResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// `GET /api/ytmp3?url=` response
#[derive(Debug, Deserialize)]
pub struct ConversionResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub data: Vec<ConversionItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionItem {
    #[serde(default)]
    pub quality: Option<NumberOrText>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// A value some endpoints send as a number and others as text
/// (`320`, `"320kbps"`, `"1,234"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    /// Leading integer of the value, ignoring thousands separators.
    pub fn leading_integer(&self) -> Option<u64> {
        match self {
            NumberOrText::Number(n) if n.is_finite() && *n >= 0.0 => Some(n.trunc() as u64),
            NumberOrText::Number(_) => None,
            NumberOrText::Text(text) => {
                let digits: String = text
                    .trim()
                    .chars()
                    .filter(|c| *c != ',')
                    .take_while(char::is_ascii_digit)
                    .collect();
                digits.parse().ok()
            }
        }
    }
}
