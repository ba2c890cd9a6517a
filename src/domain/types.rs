use std::fmt;

use serde::{Deserialize, Serialize};

/// Content language. Spreadsheet rows carry the upper-case sheet codes
/// (`EN` / `SP`); the HTTP surface and the preference store use the
/// lower-case forms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub const fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// The language cell value used by spreadsheet rows.
    pub const fn sheet_code(self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Es => "SP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    pub fn from_sheet_code(code: &str) -> Option<Self> {
        match code.trim() {
            "EN" => Some(Language::En),
            "SP" => Some(Language::Es),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted presentation preference; the service only stores the flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trips_through_sheet_codes() {
        assert_eq!(Language::from_sheet_code("EN"), Some(Language::En));
        assert_eq!(Language::from_sheet_code(" SP "), Some(Language::Es));
        assert_eq!(Language::from_sheet_code("FR"), None);
        assert_eq!(Language::Es.sheet_code(), "SP");
    }

    #[test]
    fn theme_parses_known_flags_only() {
        assert_eq!(Theme::parse("dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("sepia"), None);
    }
}
