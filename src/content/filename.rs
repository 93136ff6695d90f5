//! Post file names (`YYYY-MM-DD-slug.md`)

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

lazy_static! {
    static ref POST_NAME: Regex =
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})-(.*)\.([A-Za-z0-9]+)$").unwrap();
}

/// File name errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FileNameError {
    #[error("`{0}` does not match YYYY-MM-DD-slug.ext")]
    Pattern(String),

    #[error("`{year:04}-{month:02}-{day:02}` is not a calendar date")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("post slug is empty")]
    EmptySlug,

    #[error("post slug `{0}` contains whitespace or a path separator")]
    InvalidSlug(String),
}

/// The date and slug encoded in a post's file name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PostName {
    pub date: NaiveDate,
    pub slug: String,
    pub ext: String,
}

impl PostName {
    /// Parse a file name such as `2016-11-26-clojurescript-websocket-reagent-game.md`
    pub fn parse(file_name: &str) -> Result<Self, FileNameError> {
        let caps = POST_NAME
            .captures(file_name)
            .ok_or_else(|| FileNameError::Pattern(file_name.to_string()))?;

        // The regex only admits ASCII digits, so these cannot overflow
        let year: i32 = caps[1].parse().unwrap_or_default();
        let month: u32 = caps[2].parse().unwrap_or_default();
        let day: u32 = caps[3].parse().unwrap_or_default();
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(FileNameError::InvalidDate { year, month, day })?;

        let slug = &caps[4];
        if slug.is_empty() {
            return Err(FileNameError::EmptySlug);
        }
        if slug
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(FileNameError::InvalidSlug(slug.to_string()));
        }

        Ok(Self {
            date,
            slug: slug.to_string(),
            ext: caps[5].to_string(),
        })
    }

    /// Build the name of a new post from its title
    pub fn for_title(date: NaiveDate, title: &str, ext: &str) -> Self {
        let slug = slug::slugify(title);
        Self {
            date,
            slug: if slug.is_empty() {
                "untitled".to_string()
            } else {
                slug
            },
            ext: ext.trim_start_matches('.').to_string(),
        }
    }

    /// Canonical file name
    pub fn file_name(&self) -> String {
        self.to_string()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

impl fmt::Display for PostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}.{}",
            self.date.format("%Y-%m-%d"),
            self.slug,
            self.ext
        )
    }
}

impl Ord for PostName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.slug.cmp(&other.slug))
            .then_with(|| self.ext.cmp(&other.ext))
    }
}

impl PartialOrd for PostName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
