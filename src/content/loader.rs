//! Content loader - loads posts and drafts from the site directory

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::filename::{FileNameError, PostName};
use super::frontmatter::{header_line_count, FrontMatter};
use super::post::{Post, PostError};
use super::order;
use crate::config::ConfigError;
use crate::Site;

/// A file that could not be loaded as a post
#[derive(Debug)]
pub struct Rejected {
    /// Source path (relative to the site)
    pub source: String,
    pub path: PathBuf,
    pub error: PostError,
}

/// Posts loaded from a directory, newest first, plus the files that failed
#[derive(Debug, Default)]
pub struct LoadReport {
    pub posts: Vec<Post>,
    pub rejected: Vec<Rejected>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Loads posts from the site directories
pub struct PostLoader<'a> {
    site: &'a Site,
    exclude: Vec<glob::Pattern>,
}

impl<'a> PostLoader<'a> {
    /// Create a new post loader
    pub fn new(site: &'a Site) -> Result<Self, ConfigError> {
        Ok(Self {
            site,
            exclude: site.config.exclude_patterns()?,
        })
    }

    /// Markdown files under `dir`, siblings in file name order
    ///
    /// Hidden entries and entries starting with `_`, `#` or `~` (editor
    /// backups) are skipped below the root, as are excluded paths.
    pub fn discover(&self, dir: &Path) -> Vec<PathBuf> {
        if !dir.exists() {
            return Vec::new();
        }

        WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_ignored(e))
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(DirEntry::into_path)
            .filter(|path| self.is_markdown(path) && !self.is_excluded(path))
            .collect()
    }

    fn is_markdown(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.site.config.is_markdown_ext(e))
            .unwrap_or(false)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let relative = self.site.relative(path);
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        self.exclude
            .iter()
            .any(|p| p.matches(&relative) || p.matches(file_name))
    }

    /// Load all posts from the posts directory
    pub fn load_posts(&self) -> LoadReport {
        let paths = self.discover(&self.site.posts_dir);
        self.collect(paths, |path| self.load_post(path))
    }

    /// Load all drafts from the drafts directory
    pub fn load_drafts(&self) -> LoadReport {
        let paths = self.discover(&self.site.drafts_dir);
        self.collect(paths, |path| self.load_draft(path))
    }

    fn collect<F>(&self, paths: Vec<PathBuf>, load: F) -> LoadReport
    where
        F: Fn(&Path) -> Result<Post, PostError>,
    {
        let today = self.site.config.today();
        let mut report = LoadReport::default();

        for path in paths {
            match load(&path) {
                Ok(post) => match self.skip_reason(&post, today) {
                    Some(reason) => tracing::debug!("Skipping {} post {}", reason, post.source),
                    None => report.posts.push(post),
                },
                Err(error) => {
                    let source = self.site.relative(&path);
                    match error.line() {
                        Some(line) => tracing::warn!("Failed to load post {}:{}: {}", source, line, error),
                        None => tracing::warn!("Failed to load post {}: {}", source, error),
                    }
                    report.rejected.push(Rejected {
                        source,
                        path,
                        error,
                    });
                }
            }
        }

        order::sort_newest_first(&mut report.posts);
        report
    }

    /// Why a loaded post is left out of the site (unpublished or future), if it is
    pub fn skip_reason(&self, post: &Post, today: NaiveDate) -> Option<&'static str> {
        let config = &self.site.config;
        if !post.front_matter.published && !config.show_drafts {
            Some("unpublished")
        } else if !config.future && post.date() > today {
            Some("future")
        } else {
            None
        }
    }

    /// Load a single post; its file name must carry the publication date
    pub fn load_post(&self, path: &Path) -> Result<Post, PostError> {
        let content = fs::read_to_string(path)?;
        self.parse_post(path, &content)
    }

    /// Build a post from content already read from `path`
    pub fn parse_post(&self, path: &Path, content: &str) -> Result<Post, PostError> {
        let name = PostName::parse(file_name(path)?)?;
        let (fm, body) = FrontMatter::parse(content)?;
        let body_line = header_line_count(content, body) + 1;
        self.build(path, name, fm, body, body_line, false)
    }

    /// Load a single draft; a missing file-name date falls back to the
    /// `date` header, then to today
    pub fn load_draft(&self, path: &Path) -> Result<Post, PostError> {
        let content = fs::read_to_string(path)?;
        self.parse_draft(path, &content)
    }

    /// Build a draft from content already read from `path`
    pub fn parse_draft(&self, path: &Path, content: &str) -> Result<Post, PostError> {
        let (fm, body) = FrontMatter::parse(content)?;
        let body_line = header_line_count(content, body) + 1;

        let name = match PostName::parse(file_name(path)?) {
            Ok(name) => name,
            Err(_) => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("untitled");
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("md");
                let date = fm
                    .parse_date()
                    .map(|dt| dt.date())
                    .unwrap_or_else(|| self.site.config.today());
                PostName::for_title(date, stem, ext)
            }
        };

        self.build(path, name, fm, body, body_line, true)
    }

    fn build(
        &self,
        path: &Path,
        name: PostName,
        fm: FrontMatter,
        body: &str,
        body_line: usize,
        draft: bool,
    ) -> Result<Post, PostError> {
        let config = &self.site.config;

        for field in &config.required_fields {
            if fm.get_non_empty(field).is_none() {
                return Err(PostError::MissingField(field.clone()));
            }
        }

        let layout = fm
            .get_non_empty("layout")
            .unwrap_or_else(|| config.default_layout.clone());
        let title = fm
            .get_non_empty("title")
            .unwrap_or_else(|| titleize(&name.slug));

        // A `permalink` header overrides the configured pattern
        let url_path = match fm.get_non_empty("permalink") {
            Some(custom) => format!(
                "{}/{}",
                config.root.trim_end_matches('/'),
                custom.trim_start_matches('/')
            ),
            None => config.permalink_path(name.date, &name.slug, &fm.categories),
        };

        Ok(Post {
            title,
            layout,
            body: body.to_string(),
            body_line,
            source: self.site.relative(path),
            full_source: path.to_path_buf(),
            permalink: config.full_url(&url_path),
            path: url_path,
            draft,
            front_matter: fm,
            name,
        })
    }
}

fn file_name(path: &Path) -> Result<&str, FileNameError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FileNameError::Pattern(path.to_string_lossy().to_string()))
}

/// Jekyll ignores these in content directories
fn is_ignored(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| {
            name.starts_with('.') || name.starts_with('_') || name.starts_with('#') || name.ends_with('~')
        })
        .unwrap_or(false)
}

/// Title derived from a slug: `reagent-game` -> `Reagent Game`
fn titleize(slug: &str) -> String {
    slug.split(|c| c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
