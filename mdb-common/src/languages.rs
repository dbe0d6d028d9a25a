//! Language code tables
//!
//! Catalog languages are 2-letter codes. The studio workflow reports
//! 3-letter codes which are translated through a fixed mapping.

use std::collections::{HashMap, HashSet};

/// Sentinel for a language that could not be determined
pub const LANG_UNKNOWN: &str = "xx";

/// Sentinel for content carrying several languages (translated lessons)
pub const LANG_MULTI: &str = "zz";

const KNOWN_LANGS: &[&str] = &[
    "en", "he", "ru", "es", "it", "de", "nl", "fr", "pt", "tr", "pl", "ar", "hu", "fi", "lt",
    "ja", "bg", "ka", "no", "sv", "hr", "zh", "fa", "ro", "hi", "ua", "mk", "sl", "lv", "sk",
    "cs", "am", "ko",
];

const CODE3_TO_CODE2: &[(&str, &str)] = &[
    ("ENG", "en"),
    ("HEB", "he"),
    ("RUS", "ru"),
    ("SPA", "es"),
    ("ITA", "it"),
    ("GER", "de"),
    ("DUT", "nl"),
    ("FRE", "fr"),
    ("POR", "pt"),
    ("TRK", "tr"),
    ("POL", "pl"),
    ("ARB", "ar"),
    ("HUN", "hu"),
    ("FIN", "fi"),
    ("LIT", "lt"),
    ("JPN", "ja"),
    ("BUL", "bg"),
    ("GEO", "ka"),
    ("NOR", "no"),
    ("SWE", "sv"),
    ("HRV", "hr"),
    ("CHN", "zh"),
    ("FAR", "fa"),
    ("RON", "ro"),
    ("HIN", "hi"),
    ("UKR", "ua"),
    ("MKD", "mk"),
    ("SLV", "sl"),
    ("LAV", "lv"),
    ("SLK", "sk"),
    ("CZE", "cs"),
    ("AMH", "am"),
    ("KOR", "ko"),
    ("MLT", LANG_MULTI),
    ("UNK", LANG_UNKNOWN),
];

/// Immutable language lookup table
#[derive(Debug, Clone)]
pub struct LanguageTable {
    known: HashSet<&'static str>,
    code3: HashMap<&'static str, &'static str>,
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self {
            known: KNOWN_LANGS.iter().copied().collect(),
            code3: CODE3_TO_CODE2.iter().copied().collect(),
        }
    }
}

impl LanguageTable {
    /// Return the standard 2-letter code for `lang`, or [`LANG_UNKNOWN`]
    ///
    /// 2-letter input is checked case-insensitively against the known set;
    /// 3-letter input is translated through the workflow mapping. Any other
    /// length is unknown.
    pub fn std_lang(&self, lang: &str) -> &'static str {
        match lang.len() {
            2 => {
                let lower = lang.to_ascii_lowercase();
                self.known
                    .get(lower.as_str())
                    .copied()
                    .unwrap_or(LANG_UNKNOWN)
            }
            3 => self
                .code3
                .get(lang.to_ascii_uppercase().as_str())
                .copied()
                .unwrap_or(LANG_UNKNOWN),
            _ => LANG_UNKNOWN,
        }
    }

    pub fn is_known(&self, code: &str) -> bool {
        self.known.contains(code)
    }
}
