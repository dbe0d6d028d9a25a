//! Content identification metadata
//!
//! Sent by the studio's identification tool together with the final
//! original/proxy pair of a unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Artifact type of the main rendering of a unit
pub const ARTIFACT_MAIN: &str = "main";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CITMetadata {
    /// Content type name (content_types registry)
    pub content_type: String,
    pub capture_date: NaiveDate,
    /// Sabbath date, present for weekend lessons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_name: Option<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub has_translation: bool,
    #[serde(default)]
    pub lecturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    /// Explicit owning collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_uid: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CITMetadata {
    /// Date the content was filmed: the week date when given, else the capture date
    pub fn film_date(&self) -> NaiveDate {
        self.week_date.unwrap_or(self.capture_date)
    }

    /// Main renderings take part in lineage and collection membership
    pub fn is_main_artifact(&self) -> bool {
        match self.artifact_type.as_deref() {
            None => true,
            Some(t) => t == ARTIFACT_MAIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_film_date_prefers_week_date() {
        let mut m: CITMetadata = serde_json::from_value(json!({
            "content_type": "LESSON_PART",
            "capture_date": "2017-03-01"
        }))
        .unwrap();
        assert_eq!(m.film_date(), NaiveDate::from_ymd_opt(2017, 3, 1).unwrap());

        m.week_date = NaiveDate::from_ymd_opt(2017, 3, 4);
        assert_eq!(m.film_date(), NaiveDate::from_ymd_opt(2017, 3, 4).unwrap());
    }

    #[test]
    fn test_main_artifact() {
        let mut m = CITMetadata::default();
        assert!(m.is_main_artifact());
        m.artifact_type = Some("main".into());
        assert!(m.is_main_artifact());
        m.artifact_type = Some("kitei_makor".into());
        assert!(!m.is_main_artifact());
    }
}
