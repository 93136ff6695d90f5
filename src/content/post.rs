//! Post model

use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use super::filename::{FileNameError, PostName};
use super::frontmatter::{FrontMatter, FrontMatterError};
use super::markdown::{self, CodeBlock};

/// Reasons a file cannot be loaded as a post
#[derive(Error, Debug)]
pub enum PostError {
    #[error("failed to read post: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    FileName(#[from] FileNameError),

    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),

    #[error("missing required front-matter field `{0}`")]
    MissingField(String),
}

impl PostError {
    /// Source line the error points at, when known
    pub fn line(&self) -> Option<usize> {
        match self {
            PostError::FrontMatter(e) => e.line(),
            _ => None,
        }
    }
}

/// A blog post
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Date and slug from the file name
    pub name: PostName,

    /// Display title
    pub title: String,

    /// Layout template the site generator applies
    pub layout: String,

    /// Parsed front-matter
    pub front_matter: FrontMatter,

    /// Markdown body after the front-matter
    #[serde(skip)]
    pub body: String,

    /// Line of the file the body starts on (1-based)
    #[serde(skip)]
    pub body_line: usize,

    /// Source file path (relative to the site)
    pub source: String,

    /// Full source file path
    #[serde(skip)]
    pub full_source: PathBuf,

    /// URL path (with root)
    pub path: String,

    /// Full permalink URL
    pub permalink: String,

    /// Loaded from the drafts directory
    pub draft: bool,
}

impl Post {
    /// Publication date encoded in the file name
    pub fn date(&self) -> NaiveDate {
        self.name.date
    }

    pub fn slug(&self) -> &str {
        &self.name.slug
    }

    pub fn tags(&self) -> &[String] {
        &self.front_matter.tags
    }

    pub fn categories(&self) -> &[String] {
        &self.front_matter.categories
    }

    /// Fenced code samples in the body
    pub fn code_blocks(&self) -> Vec<CodeBlock> {
        markdown::code_blocks(&self.body)
    }

    /// Number of whitespace separated words in the body
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }

    /// Excerpt of the body, in markdown
    pub fn excerpt(&self) -> String {
        markdown::split_excerpt(&self.body).0
    }

    /// Get the previous (newer) post in a newest-first list
    pub fn prev<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.source == self.source)?;
        if pos > 0 {
            Some(&posts[pos - 1])
        } else {
            None
        }
    }

    /// Get the next (older) post in a newest-first list
    pub fn next<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.source == self.source)?;
        posts.get(pos + 1)
    }
}
