//! Create a new post or draft

use anyhow::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::content::PostName;
use crate::Site;

const DEFAULT_SCAFFOLD: &str = r#"---
layout: {{ layout }}
title: "{{ title }}"
date: {{ date }}
---
"#;

/// Options for a new post
#[derive(Debug, Clone, Default)]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub layout: Option<&'a str>,
    /// Publication date; today when absent
    pub date: Option<NaiveDate>,
    /// Write to the drafts directory, without a date in the file name
    pub draft: bool,
}

/// Create a new post/draft and return its path
pub fn create_post(site: &Site, options: &NewPost) -> Result<PathBuf> {
    let config = &site.config;
    let layout = options.layout.unwrap_or(&config.default_layout);
    // Used both as a header value and as a scaffold file name
    if layout.is_empty()
        || !layout
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!("Invalid layout name: {:?}", layout);
    }
    let ext = config
        .markdown_ext
        .first()
        .map(|e| e.trim_start_matches('.'))
        .unwrap_or("md");

    let (date, date_header) = match options.date {
        Some(date) => (date, date.format("%Y-%m-%d").to_string()),
        None => {
            let now = config.now();
            (now.date(), now.format("%Y-%m-%d %H:%M:%S").to_string())
        }
    };

    let name = PostName::for_title(date, options.title, ext);
    let file_path = if options.draft {
        site.drafts_dir.join(format!("{}.{}", name.slug, name.ext))
    } else {
        site.posts_dir.join(name.file_name())
    };

    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    // Load scaffold template
    let scaffold_path = site
        .base_dir
        .join("scaffolds")
        .join(format!("{}.md", layout));
    let scaffold = if scaffold_path.exists() {
        fs::read_to_string(&scaffold_path)?
    } else {
        DEFAULT_SCAFFOLD.to_string()
    };

    // Replace template variables
    let content = scaffold
        .replace("{{ layout }}", layout)
        .replace("{{ title }}", &yaml_quoted(options.title))
        .replace("{{ date }}", &date_header);

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    tracing::info!("Created {}", site.relative(&file_path));

    Ok(file_path)
}

/// Run the new command with the configured default layout
pub fn run(site: &Site, title: &str, layout: Option<&str>) -> Result<PathBuf> {
    create_post(
        site,
        &NewPost {
            title,
            layout,
            ..Default::default()
        },
    )
}

/// Escape a title for use inside a double-quoted YAML string
fn yaml_quoted(title: &str) -> String {
    title.replace('\\', "\\\\").replace('"', "\\\"")
}
