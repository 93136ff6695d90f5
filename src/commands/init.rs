//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::content::PostName;
use crate::Site;

const CONFIG: &str = r#"# Site
title: My Blog
timezone: ''

# URL
url: http://example.com
root: /
# date, pretty, ordinal, none, or a pattern such as /:year/:month/:title/
permalink: date

# Directory
posts_dir: _posts
drafts_dir: _drafts
layouts_dir: _layouts
exclude: []

# Writing
default_layout: post
required_fields:
  - layout
  - title
markdown_ext:
  - md
  - markdown
future: true
show_drafts: false
strict: false
highlight:
  theme: base16-ocean.dark
  line_number: false
"#;

const POST_SCAFFOLD: &str = r#"---
layout: {{ layout }}
title: "{{ title }}"
date: {{ date }}
tags:
---
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("Site already initialized: {:?} exists", config_path);
    }

    // Create directory structure
    fs::create_dir_all(target_dir.join("_posts"))?;
    fs::create_dir_all(target_dir.join("_drafts"))?;
    fs::create_dir_all(target_dir.join("scaffolds"))?;

    fs::write(&config_path, CONFIG)?;
    fs::write(target_dir.join("scaffolds/post.md"), POST_SCAFFOLD)?;

    // Create a sample post
    let site = Site::new(target_dir)?;
    let now = site.config.now();
    let name = PostName::for_title(now.date(), "Hello World", "md");
    let sample_post = format!(
        r#"---
layout: post
title: Hello World
date: {}
---

This is your first post. Its file name carries the publication date and its
header names the layout and title the site generator needs.

## Checking posts

```bash
$ posts-rs check
```

## Writing a new post

```bash
$ posts-rs new "My New Post"
```
"#,
        now.format("%Y-%m-%d %H:%M:%S")
    );

    fs::write(site.posts_dir.join(name.file_name()), sample_post)?;
    tracing::debug!("Initialized site in {:?}", target_dir);

    Ok(())
}
