/*!
 * Wire models for the generation backend.
 *
 * The backend is loose about shapes: ids arrive as numbers or strings, list
 * endpoints may or may not wrap results in an envelope, and a few fields have
 * two historical names. Everything is normalized here so the rest of the
 * crate sees one shape.
 */

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::BackendError;

/// Accept `12` or `"12"` for identifiers
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(text)) => Some(text),
        Some(RawId::Number(number)) => Some(number.to_string()),
        None => None,
    })
}

/// Normalize a list response: a bare array, a `{results: [...]}` envelope,
/// or anything else (treated as empty)
pub fn normalize_list<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, BackendError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => return Ok(Vec::new()),
        },
        _ => return Ok(Vec::new()),
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| BackendError::ParseError(e.to_string())))
        .collect()
}

/// A research keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub keyword: String,

    /// Search-intent analysis; present once the keyword has been analyzed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_intent: Option<Value>,
}

impl Keyword {
    /// Only analyzed keywords can be used for generation
    pub fn is_analyzed(&self) -> bool {
        match &self.main_intent {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_f64().map_or(true, |v| v != 0.0),
            Some(Value::String(text)) => !text.is_empty(),
            Some(_) => true,
        }
    }
}

/// Subtopic entry, sent either as plain text or as `{title}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subtopic {
    Title(String),
    Object { title: String },
}

impl Subtopic {
    pub fn title(&self) -> &str {
        match self {
            Subtopic::Title(title) | Subtopic::Object { title } => title,
        }
    }
}

/// Keyword with its analyzed subtopics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDetail {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub keyword: String,

    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

/// One generated blog article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Keyword id or an embedded keyword object, depending on the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<Value>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,
}

impl ContentSummary {
    /// Parsed `created_at`, if present and RFC 3339
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        self.created_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    }

    /// Keyword text when the keyword object is embedded
    pub fn keyword_text(&self) -> Option<&str> {
        match &self.keyword {
            Some(Value::Object(map)) => map.get("keyword").and_then(Value::as_str),
            Some(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("(untitled)")
    }
}

/// Counts of collected research sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchStats {
    #[serde(default)]
    pub news_count: u32,
    #[serde(default)]
    pub academic_count: u32,
    #[serde(default)]
    pub general_count: u32,
    #[serde(default)]
    pub statistics_count: u32,
}

impl ResearchStats {
    pub fn total(&self) -> u32 {
        self.news_count
            .saturating_add(self.academic_count)
            .saturating_add(self.general_count)
            .saturating_add(self.statistics_count)
    }
}

/// Business profile sent with content requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub name: String,
    pub expertise: String,
}

/// Body of `POST /content`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub keyword_id: String,

    /// Always sent as an empty object
    #[serde(default)]
    pub target_audience: serde_json::Map<String, Value>,

    pub business_info: BusinessInfo,

    #[serde(default)]
    pub custom_morphemes: Vec<String>,
}

impl ContentRequest {
    pub fn new(keyword_id: impl Into<String>, business_info: BusinessInfo, custom_morphemes: Vec<String>) -> Self {
        Self {
            keyword_id: keyword_id.into(),
            target_audience: serde_json::Map::new(),
            business_info,
            custom_morphemes,
        }
    }

    /// Split a space-separated morpheme list
    pub fn split_morphemes(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }
}

/// A suggested title; older backends use `title` instead of `suggestion`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleSuggestion {
    pub suggestion: String,
}

impl<'de> Deserialize<'de> for TitleSuggestion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawSuggestion {
            Text(String),
            Suggestion { suggestion: String },
            Title { title: String },
        }

        Ok(match RawSuggestion::deserialize(deserializer)? {
            RawSuggestion::Text(suggestion)
            | RawSuggestion::Suggestion { suggestion }
            | RawSuggestion::Title { title: suggestion } => TitleSuggestion { suggestion },
        })
    }
}

/// Title type tag (e.g. "question", "list") to ordered suggestions
pub type TitleSet = BTreeMap<String, Vec<TitleSuggestion>>;

/// Response of `POST /titles/generate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleGenerationAck {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    /// Present when titles were generated synchronously
    #[serde(default)]
    pub data: Option<Value>,

    #[serde(default)]
    pub error: Option<String>,
}

impl TitleGenerationAck {
    /// Whether generation continues in the background
    pub fn needs_polling(&self) -> bool {
        self.status.as_deref() == Some("processing")
            || self
                .message
                .as_deref()
                .is_some_and(|m| m.contains("백그라운드") || m.to_lowercase().contains("background"))
    }
}

/// Parse a completed title payload
pub fn parse_title_set(data: Value) -> Result<TitleSet, BackendError> {
    serde_json::from_value(data).map_err(|e| BackendError::ParseError(e.to_string()))
}

/// A title the user kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTitle {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub content_id: Option<String>,

    pub title: String,
}

/// A generated image or infographic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Older responses put the location here instead of `url`
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub subtopic: Option<String>,

    #[serde(default)]
    pub alt_text: Option<String>,

    #[serde(default)]
    pub is_infographic: Option<bool>,
}

impl ImageRecord {
    /// Location of the image file
    pub fn source(&self) -> Option<&str> {
        self.url.as_deref().or(self.image.as_deref())
    }

    pub fn is_infographic(&self) -> bool {
        self.is_infographic.unwrap_or(false)
    }
}

/// Drop images whose `image` or `url` repeats an earlier record's
pub fn dedupe_images(images: Vec<ImageRecord>) -> Vec<ImageRecord> {
    let keep: Vec<bool> = images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            images
                .iter()
                .position(|other| {
                    (image.image.is_some() && other.image == image.image)
                        || (image.url.is_some() && other.url == image.url)
                })
                .is_none_or(|first| first == index)
        })
        .collect();

    images
        .into_iter()
        .zip(keep)
        .filter_map(|(image, keep)| keep.then_some(image))
        .collect()
}

/// Body of the image generation endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageGenerationRequest {
    pub content_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtopic_index: Option<usize>,
}
