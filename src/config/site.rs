//! Site configuration (_config.yml)

use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use regex::{Captures, Regex};
use thiserror::Error;

/// Characters escaped in permalink segments
lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r":([a-z_]+)").unwrap();
}

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%');

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown timezone `{0}`")]
    Timezone(String),

    #[error("invalid exclude pattern `{pattern}`: {source}")]
    Exclude {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,
    pub permalink: String,

    // Directory
    pub posts_dir: String,
    pub drafts_dir: String,
    pub layouts_dir: String,
    #[serde(default)]
    pub exclude: Vec<String>,

    // Writing
    pub default_layout: String,
    pub required_fields: Vec<String>,
    pub markdown_ext: Vec<String>,
    pub future: bool,
    pub show_drafts: bool,
    pub strict: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),
            permalink: "date".to_string(),

            posts_dir: "_posts".to_string(),
            drafts_dir: "_drafts".to_string(),
            layouts_dir: "_layouts".to_string(),
            exclude: Vec::new(),

            default_layout: "post".to_string(),
            required_fields: vec!["layout".to_string(), "title".to_string()],
            markdown_ext: vec!["md".to_string(), "markdown".to_string()],
            future: true,
            show_drafts: false,
            strict: false,
            highlight: HighlightConfig::default(),

            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file; `.toml` files are read as TOML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: SiteConfig = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            toml::from_str(&content)?
        } else if content.trim().is_empty() {
            SiteConfig::default()
        } else {
            serde_yaml::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load `_config.yml`, falling back to `_config.toml`, then defaults
    pub fn discover<P: AsRef<Path>>(base_dir: P) -> Result<Self, ConfigError> {
        let base_dir = base_dir.as_ref();
        for name in ["_config.yml", "_config.yaml", "_config.toml"] {
            let path = base_dir.join(name);
            if path.exists() {
                tracing::debug!("Loading config from {:?}", path);
                return Self::load(&path);
            }
        }
        tracing::debug!("No config file in {:?}, using defaults", base_dir);
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        self.exclude_patterns()?;
        Ok(())
    }

    /// The configured IANA timezone, if any
    pub fn timezone(&self) -> Result<Option<chrono_tz::Tz>, ConfigError> {
        let name = self.timezone.trim();
        if name.is_empty() {
            return Ok(None);
        }
        name.parse::<chrono_tz::Tz>()
            .map(Some)
            .map_err(|_| ConfigError::Timezone(name.to_string()))
    }

    /// Current wall-clock time in the site timezone
    pub fn now(&self) -> NaiveDateTime {
        match self.timezone() {
            Ok(Some(tz)) => Utc::now().with_timezone(&tz).naive_local(),
            _ => Local::now().naive_local(),
        }
    }

    /// Today's date in the site timezone
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Compiled exclude patterns
    pub fn exclude_patterns(&self) -> Result<Vec<glob::Pattern>, ConfigError> {
        self.exclude
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|source| ConfigError::Exclude {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Whether a file extension is treated as markdown
    pub fn is_markdown_ext(&self, ext: &str) -> bool {
        self.markdown_ext
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Expand a named permalink style into its pattern
    pub fn permalink_pattern(&self) -> &str {
        match self.permalink.as_str() {
            "date" => "/:categories/:year/:month/:day/:title:output_ext",
            "pretty" => "/:categories/:year/:month/:day/:title/",
            "ordinal" => "/:categories/:year/:y_day/:title:output_ext",
            "none" => "/:categories/:title:output_ext",
            other => other,
        }
    }

    /// Resolve the URL path of a post from its date, slug and categories
    pub fn permalink_path(&self, date: NaiveDate, slug: &str, categories: &[String]) -> String {
        let categories = categories
            .iter()
            .map(|c| encode_segment(&slug::slugify(c)))
            .collect::<Vec<_>>()
            .join("/");

        let title = encode_segment(slug);
        let result = PLACEHOLDER.replace_all(self.permalink_pattern(), |caps: &Captures| {
            match &caps[1] {
                "categories" => categories.clone(),
                "year" => date.format("%Y").to_string(),
                "month" => date.format("%m").to_string(),
                "day" => date.format("%d").to_string(),
                "i_month" => date.format("%-m").to_string(),
                "i_day" => date.format("%-d").to_string(),
                "y_day" => date.format("%j").to_string(),
                "title" | "slug" => title.clone(),
                "output_ext" => ".html".to_string(),
                _ => caps[0].to_string(),
            }
        });

        // Empty placeholders leave doubled separators behind
        let mut path = String::with_capacity(result.len() + 1);
        for segment in result.split('/').filter(|s| !s.is_empty()) {
            path.push('/');
            path.push_str(segment);
        }
        if result.ends_with('/') || path.is_empty() {
            path.push('/');
        }

        format!("{}{}", self.root.trim_end_matches('/'), path)
    }

    /// Absolute URL for a path produced by [`SiteConfig::permalink_path`]
    pub fn full_url(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Syntax highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.posts_dir, "_posts");
        assert_eq!(config.required_fields, vec!["layout", "title"]);
        assert!(config.is_markdown_ext("md"));
        assert!(config.is_markdown_ext("MARKDOWN"));
        assert!(!config.is_markdown_ext("html"));
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
title: Learning in public
url: https://blog.example.org
permalink: pretty
required_fields: [layout, title, date]
exclude:
  - "*.wip.md"
disqus_shortname: someone
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "Learning in public");
        assert_eq!(config.required_fields.len(), 3);
        assert_eq!(config.posts_dir, "_posts");
        assert!(config.extra.contains_key("disqus_shortname"));
        assert_eq!(config.exclude_patterns().unwrap().len(), 1);
    }

    #[test]
    fn test_load_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.toml");
        fs::write(&path, "title = \"Toml Blog\"\ntimezone = \"Europe/London\"\n").unwrap();

        let config = SiteConfig::discover(dir.path()).unwrap();
        assert_eq!(config.title, "Toml Blog");
        assert_eq!(config.timezone().unwrap(), Some(chrono_tz::Europe::London));
    }

    #[test]
    fn test_invalid_timezone_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_config.yml"), "timezone: Mars/Olympus\n").unwrap();
        assert!(matches!(
            SiteConfig::discover(dir.path()),
            Err(ConfigError::Timezone(_))
        ));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiteConfig::discover(dir.path()).unwrap();
        assert_eq!(config.title, "My Blog");
    }

    #[test]
    fn test_date_permalink() {
        let config = SiteConfig::default();
        assert_eq!(
            config.permalink_path(date(2016, 11, 26), "reagent-game", &[]),
            "/2016/11/26/reagent-game.html"
        );
        assert_eq!(
            config.permalink_path(date(2016, 11, 26), "reagent-game", &["Clojure".to_string()]),
            "/clojure/2016/11/26/reagent-game.html"
        );
    }

    #[test]
    fn test_pretty_and_custom_permalinks() {
        let mut config = SiteConfig {
            permalink: "pretty".to_string(),
            root: "/blog/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.permalink_path(date(2016, 12, 11), "quickcheck", &[]),
            "/blog/2016/12/11/quickcheck/"
        );

        config.permalink = "/:year/:i_month/:slug".to_string();
        assert_eq!(
            config.permalink_path(date(2016, 2, 3), "closure", &[]),
            "/blog/2016/2/closure"
        );
    }

    #[test]
    fn test_ordinal_and_none_permalinks() {
        let mut config = SiteConfig {
            permalink: "ordinal".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.permalink_path(date(2016, 2, 3), "closure", &[]),
            "/2016/034/closure.html"
        );

        config.permalink = "none".to_string();
        assert_eq!(
            config.permalink_path(date(2016, 2, 3), "closure", &["Notes".to_string()]),
            "/notes/closure.html"
        );
    }

    #[test]
    fn test_placeholders_expand_once() {
        let config = SiteConfig {
            permalink: "/:title/:slug".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.permalink_path(date(2016, 1, 1), "a:slug", &[]),
            "/a:slug/a:slug"
        );
    }

    #[test]
    fn test_permalink_escapes_slug() {
        let config = SiteConfig::default();
        assert_eq!(
            config.permalink_path(date(2016, 1, 1), "what?", &[]),
            "/2016/01/01/what%3F.html"
        );
        assert_eq!(
            config.full_url("/2016/01/01/a.html"),
            "http://example.com/2016/01/01/a.html"
        );
    }
}
