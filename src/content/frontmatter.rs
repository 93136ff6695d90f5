//! Front-matter parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Opening and closing marker of a YAML header
const MARKER: &str = "---";
/// YAML document-end marker, also accepted as a closing marker
const DOCUMENT_END: &str = "...";

/// Front-matter errors
#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("missing front-matter: the first line must be `---`")]
    Missing,

    #[error("front-matter opened at line {line} is never closed")]
    Unterminated { line: usize },

    #[error("invalid front-matter: {0}")]
    Invalid(#[from] serde_yaml::Error),

    #[error("front-matter must be a mapping of keys to values")]
    NotAMapping,
}

impl FrontMatterError {
    /// Line in the source file the error points at (1-based)
    pub fn line(&self) -> Option<usize> {
        match self {
            FrontMatterError::Missing => Some(1),
            FrontMatterError::Unterminated { line } => Some(*line),
            // The YAML document starts on the line after the opening marker
            FrontMatterError::Invalid(e) => e.location().map(|loc| loc.line() + 1),
            FrontMatterError::NotAMapping => Some(2),
        }
    }
}

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            // Jekyll splits space separated tags
            Ok(value.split_whitespace().map(str::to_string).collect())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<serde_yaml::Value>()? {
                if let Some(s) = scalar_to_string(&item) {
                    vec.push(s);
                }
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Deserialize any YAML scalar (string, number, bool) as an optional string
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(v) => scalar_to_string(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a plain value")),
    }
}

/// Render a YAML scalar as a string; collections have no string form
pub(crate) fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

/// Front-matter data from a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(deserialize_with = "scalar")]
    pub layout: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub title: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub date: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub categories: Vec<String>,
    /// Posts are published unless they opt out
    pub published: bool,

    /// Additional custom fields, in header order
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Default for FrontMatter {
    fn default() -> Self {
        Self {
            layout: None,
            title: None,
            date: None,
            tags: Vec::new(),
            categories: Vec::new(),
            published: true,
            extra: IndexMap::new(),
        }
    }
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, body)
    pub fn parse(content: &str) -> Result<(Self, &str), FrontMatterError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut lines = content.split_inclusive('\n');

        let header_start = match lines.next() {
            Some(first) if first.trim_end() == MARKER => first.len(),
            _ => return Err(FrontMatterError::Missing),
        };

        let mut offset = header_start;
        for line in lines {
            let marker = line.trim_end();
            if marker == MARKER || marker == DOCUMENT_END {
                let yaml = &content[header_start..offset];
                let body = &content[offset + line.len()..];
                return Ok((Self::from_yaml(yaml)?, body));
            }
            offset += line.len();
        }

        Err(FrontMatterError::Unterminated { line: 1 })
    }

    fn from_yaml(yaml: &str) -> Result<Self, FrontMatterError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        match value {
            // A header holding only comments
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::Mapping(_) => Ok(serde_yaml::from_value(value)?),
            _ => Err(FrontMatterError::NotAMapping),
        }
    }

    /// Look up a header value as a string
    ///
    /// Known fields are consulted first, then the custom ones. List values
    /// are joined with `, `; nested mappings have no string form.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "layout" => self.layout.clone(),
            "title" => self.title.clone(),
            "date" => self.date.clone(),
            "tags" if !self.tags.is_empty() => Some(self.tags.join(", ")),
            "categories" if !self.categories.is_empty() => Some(self.categories.join(", ")),
            "tags" | "categories" => None,
            "published" => Some(self.published.to_string()),
            _ => match self.extra.get(key)? {
                serde_yaml::Value::Sequence(items) => {
                    let items: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
                    Some(items.join(", "))
                }
                other => scalar_to_string(other),
            },
        }
    }

    /// Like [`FrontMatter::get`], but blank values count as absent
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Parse the `date` header into a local date-time
    pub fn parse_date(&self) -> Option<NaiveDateTime> {
        self.date.as_deref().and_then(parse_date_string)
    }
}

/// Number of source lines consumed by the header, given the full file
/// content and the body slice returned from [`FrontMatter::parse`]
pub(crate) fn header_line_count(content: &str, body: &str) -> usize {
    content
        .len()
        .checked_sub(body.len())
        .and_then(|end| content.get(..end))
        .map_or(0, |header| header.matches('\n').count())
}

/// Parse a date string in the formats Jekyll accepts
pub fn parse_date_string(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    // RFC 3339 / ISO 8601 with an offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    // Offsets keep the author's wall-clock time
    for fmt in ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M %z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
layout: post
title: Building a Clojure(script) game with websockets and Reagent
tags:
  - clojure
  - clojurescript
---

The game state ticks on the server.
"#;

        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.layout.as_deref(), Some("post"));
        assert_eq!(
            fm.title.as_deref(),
            Some("Building a Clojure(script) game with websockets and Reagent")
        );
        assert_eq!(fm.tags, vec!["clojure", "clojurescript"]);
        assert_eq!(body, "\nThe game state ticks on the server.\n");
    }

    #[test]
    fn test_missing_header() {
        let err = FrontMatter::parse("# Just a heading\n\nNo header here.\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::Missing));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_header_must_start_on_first_line() {
        let err = FrontMatter::parse("\n---\ntitle: Late\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::Missing));
    }

    #[test]
    fn test_unterminated_header() {
        let content = "---\nlayout: post\ntitle: Oops\n\nBody without a closing marker.\n";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, FrontMatterError::Unterminated { line: 1 }));
    }

    #[test]
    fn test_document_end_marker_and_crlf() {
        let content = "---\r\nlayout: post\r\ntitle: Windows\r\n...\r\nBody\r\n";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Windows"));
        assert_eq!(body, "Body\r\n");
    }

    #[test]
    fn test_bom_is_tolerated() {
        let content = "\u{feff}---\ntitle: Bom\n---\n";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Bom"));
        assert_eq!(body, "");
    }

    #[test]
    fn test_empty_header_is_default() {
        let (fm, body) = FrontMatter::parse("---\n---\nText\n").unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, "Text\n");
    }

    #[test]
    fn test_not_a_mapping() {
        let err = FrontMatter::parse("---\n- one\n- two\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::NotAMapping));
    }

    #[test]
    fn test_invalid_yaml_reports_line() {
        let err = FrontMatter::parse("---\ntitle: ok\nlayout: [post\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::Invalid(_)));
        assert!(err.line().map_or(true, |line| line >= 2));
    }

    #[test]
    fn test_scalar_values_become_strings() {
        let (fm, _) = FrontMatter::parse("---\ntitle: 1984\nlayout: post\n---\n").unwrap();
        assert_eq!(fm.title.as_deref(), Some("1984"));
    }

    #[test]
    fn test_extra_keys_keep_order() {
        let content = "---\nlayout: post\ntitle: T\nzeta: 1\nalpha: two\ncomments: true\n---\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        let keys: Vec<&str> = fm.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "comments"]);
        assert_eq!(fm.get("alpha").as_deref(), Some("two"));
        assert_eq!(fm.get("comments").as_deref(), Some("true"));
        assert_eq!(fm.get("missing"), None);
    }

    #[test]
    fn test_single_string_tags() {
        let (fm, _) = FrontMatter::parse("---\ntags: haskell quickcheck\ncategories: notes\n---\n")
            .unwrap();
        assert_eq!(fm.tags, vec!["haskell", "quickcheck"]);
        assert_eq!(fm.categories, vec!["notes"]);
        assert_eq!(fm.get("tags").as_deref(), Some("haskell, quickcheck"));
    }

    #[test]
    fn test_blank_values_are_not_present() {
        let (fm, _) = FrontMatter::parse("---\nlayout: post\ntitle: '   '\n---\n").unwrap();
        assert_eq!(fm.get_non_empty("layout").as_deref(), Some("post"));
        assert_eq!(fm.get_non_empty("title"), None);
    }

    #[test]
    fn test_header_line_count() {
        let content = "---\nlayout: post\ntitle: T\n---\nfirst body line\n";
        let (_, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(header_line_count(content, body), 4);
    }

    #[test]
    fn test_header_line_count_foreign_body() {
        let content = "---\nlayout: post\n---\n";
        assert_eq!(header_line_count(content, "a body longer than the whole file"), 0);
    }

    #[test]
    fn test_numeric_scalar_terms() {
        let (fm, _) = FrontMatter::parse(
            "---\nlayout: post\ntitle: Archive\ncategories: 2016\ntags: true\n---\n",
        )
        .unwrap();
        assert_eq!(fm.categories, vec!["2016"]);
        assert_eq!(fm.tags, vec!["true"]);
    }

    #[test]
    fn test_parse_date() {
        let fm = FrontMatter {
            date: Some("2016-11-26 10:30:00 +0100".to_string()),
            ..Default::default()
        };
        let dt = fm.parse_date().unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2016-11-26 10:30");

        assert!(parse_date_string("2016-12-11").is_some());
        assert!(parse_date_string("2016-12-11T08:00:00Z").is_some());
        assert!(parse_date_string("last tuesday").is_none());
    }
}
