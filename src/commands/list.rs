//! List site content

use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};

use super::OutputFormat;
use crate::content::{order, LoadReport, Post};
use crate::Site;

/// A post as shown in listings
#[derive(Debug, Serialize)]
struct PostSummary<'a> {
    date: String,
    title: &'a str,
    layout: &'a str,
    source: &'a str,
    path: &'a str,
    permalink: &'a str,
    tags: &'a [String],
    categories: &'a [String],
}

impl<'a> From<&'a Post> for PostSummary<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            date: post.date().format("%Y-%m-%d").to_string(),
            title: &post.title,
            layout: &post.layout,
            source: &post.source,
            path: &post.path,
            permalink: &post.permalink,
            tags: post.tags(),
            categories: post.categories(),
        }
    }
}

#[derive(Debug, Serialize)]
struct YearSummary<'a> {
    year: i32,
    posts: Vec<PostSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct TermCount {
    name: String,
    count: usize,
}

/// List site content by type
pub fn run(site: &Site, content_type: &str, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_list(site, content_type, format, &mut out)
}

/// Write a listing of `content_type` to `out`
pub fn write_list<W: Write>(
    site: &Site,
    content_type: &str,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let report = match content_type {
        "draft" | "drafts" => site.load_drafts()?,
        "post" | "posts" | "archive" | "archives" | "tag" | "tags" | "category"
        | "categories" => site.load_posts()?,
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, draft, archive, tag, category",
                content_type
            );
        }
    };
    warn_rejected(&report);
    let posts = &report.posts;

    match content_type {
        "archive" | "archives" => {
            let years = order::group_by_year(posts);
            match format {
                OutputFormat::Json => {
                    let years: Vec<YearSummary> = years
                        .into_iter()
                        .map(|(year, posts)| YearSummary {
                            year,
                            posts: posts.into_iter().map(PostSummary::from).collect(),
                        })
                        .collect();
                    writeln!(out, "{}", serde_json::to_string_pretty(&years)?)?;
                }
                OutputFormat::Text => {
                    for (year, posts) in years {
                        writeln!(out, "{} ({}):", year, posts.len())?;
                        for post in posts {
                            writeln!(
                                out,
                                "  {} - {}",
                                post.date().format("%m-%d"),
                                post.title
                            )?;
                        }
                    }
                }
            }
        }
        "tag" | "tags" | "category" | "categories" => {
            let is_tags = content_type.starts_with("tag");
            let counts = if is_tags {
                order::count_terms(posts, |p| p.tags())
            } else {
                order::count_terms(posts, |p| p.categories())
            };
            match format {
                OutputFormat::Json => {
                    let counts: Vec<TermCount> = counts
                        .into_iter()
                        .map(|(name, count)| TermCount { name, count })
                        .collect();
                    writeln!(out, "{}", serde_json::to_string_pretty(&counts)?)?;
                }
                OutputFormat::Text => {
                    let label = if is_tags { "Tags" } else { "Categories" };
                    writeln!(out, "{} ({}):", label, counts.len())?;
                    for (name, count) in counts {
                        writeln!(out, "  {} ({})", name, count)?;
                    }
                }
            }
        }
        _ => match format {
            OutputFormat::Json => {
                let posts: Vec<PostSummary> = posts.iter().map(PostSummary::from).collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&posts)?)?;
            }
            OutputFormat::Text => {
                let label = if content_type.starts_with("draft") {
                    "Drafts"
                } else {
                    "Posts"
                };
                writeln!(out, "{} ({}):", label, posts.len())?;
                for post in posts {
                    writeln!(
                        out,
                        "  {} - {} [{}]",
                        post.date().format("%Y-%m-%d"),
                        post.title,
                        post.source
                    )?;
                }
            }
        },
    }

    Ok(())
}

fn warn_rejected(report: &LoadReport) {
    if !report.rejected.is_empty() {
        tracing::warn!(
            "{} file(s) skipped, run `posts-rs check` for details",
            report.rejected.len()
        );
    }
}
