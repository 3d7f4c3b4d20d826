//! The records that move between the local cache, the remote service and the UI.
//! Field names are camelCase on the wire and in the local cache.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Languages the UI has translations for.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "hi", "ur", "fr"];
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    #[default]
    High,
    Medium,
    Low,
}

/// User preferences. Deserializing any record (current, partial or legacy) goes
/// through [`Settings::upgrade`], so a loaded record is always complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub image_quality: ImageQuality,
    pub save_history: bool,
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_quality: ImageQuality::High,
            save_history: true,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Settings {
    /// Overlay every field of `record` we understand onto the default record.
    /// Unknown fields (`theme`, `anonymousMode`, ...) are dropped, and a field
    /// with the wrong type keeps its default.
    pub fn upgrade(record: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut settings = Settings::default();

        if let Some(quality) = record
            .get("imageQuality")
            .and_then(|v| ImageQuality::deserialize(v).ok())
        {
            settings.image_quality = quality;
        }
        if let Some(save_history) = record.get("saveHistory").and_then(|v| v.as_bool()) {
            settings.save_history = save_history;
        }
        if let Some(language) = record
            .get("language")
            .and_then(|v| v.as_str())
            .and_then(language_code)
        {
            settings.language = language;
        }

        settings
    }

    /// Applies the same rules as [`Settings::upgrade`] to a record built in code:
    /// the language is cut down to its two letter code, or reset if it has none.
    pub fn normalised(mut self) -> Self {
        self.language =
            language_code(&self.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        self
    }

    /// Defaults, with the language replaced by `detected` when we have a translation for it.
    pub fn defaults_for_locale(detected: Option<&str>) -> Self {
        let language = detected
            .and_then(language_code)
            .filter(|code| SUPPORTED_LANGUAGES.contains(&code.as_str()))
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        Self {
            language,
            ..Settings::default()
        }
    }
}

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Object(record) => Ok(Settings::upgrade(&record)),
            other => Err(D::Error::custom(format!(
                "expected a settings object, got `{other}`"
            ))),
        }
    }
}

/// Normalizes a locale tag like `fr-CA` to its two letter language code.
fn language_code(tag: &str) -> Option<String> {
    let code: String = tag.chars().take(2).collect::<String>().to_ascii_lowercase();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())).then_some(code)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub name: String,
    pub breed: String,
    #[serde(default)]
    pub birthday: Option<String>,
    pub image: String,
    #[serde(default)]
    pub added_on: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: Vec<Note>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub category: NoteCategory,
    pub date: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteCategory {
    Health,
    Vaccination,
    Treats,
    DailyLife,
    Milestone,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown note category `{0}`")]
pub struct UnknownCategory(pub String);

/// Strict parsing for categories chosen by the user. Reading the service's
/// records goes through serde instead, which falls back to `Other`.
impl std::str::FromStr for NoteCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            NoteCategory::Health,
            NoteCategory::Vaccination,
            NoteCategory::Treats,
            NoteCategory::DailyLife,
            NoteCategory::Milestone,
            NoteCategory::Other,
        ]
        .into_iter()
        .find(|category| category.as_str() == s)
        .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl NoteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteCategory::Health => "health",
            NoteCategory::Vaccination => "vaccination",
            NoteCategory::Treats => "treats",
            NoteCategory::DailyLife => "dailyLife",
            NoteCategory::Milestone => "milestone",
            NoteCategory::Other => "other",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub breed: String,
    pub confidence: String,
    pub image: String,
    pub searched_on: NaiveDate,
}

/// The body of `POST /api/history`. The service takes snake_case here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identification {
    pub breed: String,
    pub confidence: String,
    pub image_url: String,
}

/// The multipart payload of `POST /api/pets`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPet {
    pub name: String,
    pub breed: String,
    pub birthday: Option<String>,
    pub image: ImageUpload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The last identification result, kept in a single local cache slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionCacheEntry {
    pub breed: String,
    pub id: Option<String>,
    pub preview_url: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
