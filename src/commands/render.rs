//! Render a single post to an HTML fragment (preview)

use anyhow::Result;
use std::path::Path;

use crate::content::{fence, MarkdownRenderer, PostLoader};
use crate::Site;

/// Render the body of the post at `path`
pub fn render_post(site: &Site, path: &Path) -> Result<String> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        site.base_dir.join(path)
    };

    let loader = PostLoader::new(site)?;
    let post = if path.starts_with(&site.drafts_dir) {
        loader.load_draft(&path)?
    } else {
        loader.load_post(&path)?
    };

    if let Some(open) = fence::first_unterminated(&post.body) {
        tracing::warn!(
            "{}:{}: code block is never closed, the rest of the post renders as code",
            post.source,
            post.body_line + open.open_line - 1
        );
    }

    let highlight = &site.config.highlight;
    let renderer = MarkdownRenderer::with_options(&highlight.theme, highlight.line_number);
    Ok(renderer.render(&post.body))
}

/// Run the render command
pub fn run(site: &Site, path: &Path) -> Result<()> {
    let html = render_post(site, path)?;
    print!("{}", html);
    Ok(())
}
