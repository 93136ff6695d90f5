//! posts-rs: load, check and index Jekyll-style blog posts
//!
//! A post is a markdown file named `YYYY-MM-DD-slug.md` that starts with a
//! YAML front-matter header. This crate reads a site's posts the way a static
//! site generator would, reports files that such a generator would choke on,
//! and lists posts newest first. Rendering the site is left to the generator.

pub mod check;
pub mod commands;
pub mod config;
pub mod content;

use anyhow::Result;
use std::path::{Path, PathBuf};

use check::{CheckOptions, CheckReport, Checker};
use content::{LoadReport, PostLoader};

/// A blog site rooted at a directory
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Published posts directory
    pub posts_dir: PathBuf,
    /// Drafts directory
    pub drafts_dir: PathBuf,
    /// Layout templates directory
    pub layouts_dir: PathBuf,
}

impl Site {
    /// Create a new site from a directory, reading its config file if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config = config::SiteConfig::discover(base_dir)?;
        Ok(Self::with_config(base_dir, config))
    }

    /// Create a site with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let posts_dir = base_dir.join(&config.posts_dir);
        let drafts_dir = base_dir.join(&config.drafts_dir);
        let layouts_dir = base_dir.join(&config.layouts_dir);

        Self {
            config,
            base_dir,
            posts_dir,
            drafts_dir,
            layouts_dir,
        }
    }

    /// Path relative to the base directory, with `/` separators
    pub fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.base_dir).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Load published posts, newest first
    pub fn load_posts(&self) -> Result<LoadReport> {
        Ok(PostLoader::new(self)?.load_posts())
    }

    /// Load drafts, newest first
    pub fn load_drafts(&self) -> Result<LoadReport> {
        Ok(PostLoader::new(self)?.load_drafts())
    }

    /// Run the structural checks
    pub fn check(&self, options: CheckOptions) -> Result<CheckReport> {
        Ok(Checker::new(self)?.run(options))
    }

    /// Initialize a new site
    pub fn init(&self) -> Result<()> {
        commands::init::init_site(&self.base_dir)
    }

    /// Create a new post
    pub fn new_post(&self, title: &str, layout: Option<&str>) -> Result<PathBuf> {
        commands::new::run(self, title, layout)
    }
}
