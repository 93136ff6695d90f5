//! Structural checks over post files
//!
//! Every post file is checked on its own: header present and closed, required
//! fields filled in, a dated file name, balanced code fences. Posts that load
//! are then compared with each other for URL collisions.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::content::{fence, FileNameError, FrontMatter, FrontMatterError, PostLoader, PostName};
use crate::Site;

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// What a check found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    Unreadable,
    MissingHeader,
    UnterminatedHeader,
    InvalidHeader,
    MissingField,
    FileName,
    InvalidDate,
    UnterminatedFence,
    DateMismatch,
    UnknownLayout,
    DuplicatePermalink,
}

impl IssueKind {
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::Unreadable => "unreadable",
            IssueKind::MissingHeader => "missing-header",
            IssueKind::UnterminatedHeader => "unterminated-header",
            IssueKind::InvalidHeader => "invalid-header",
            IssueKind::MissingField => "missing-field",
            IssueKind::FileName => "file-name",
            IssueKind::InvalidDate => "invalid-date",
            IssueKind::UnterminatedFence => "unterminated-fence",
            IssueKind::DateMismatch => "date-mismatch",
            IssueKind::UnknownLayout => "unknown-layout",
            IssueKind::DuplicatePermalink => "duplicate-permalink",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::DateMismatch | IssueKind::UnknownLayout => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A problem found in one file
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    /// Source path (relative to the site)
    pub source: String,
    /// Line in the file (1-based), when the issue has one
    pub line: Option<usize>,
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    fn new(source: &str, line: Option<usize>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            line,
            severity: kind.severity(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: ", self.source, line)?,
            None => write!(f, "{}: ", self.source)?,
        }
        write!(f, "{}[{}] {}", self.severity, self.kind, self.message)
    }
}

/// Result of checking a site
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    /// Number of files checked
    pub checked: usize,
    /// Warnings count as errors
    pub strict: bool,
    pub issues: Vec<Issue>,
}

impl CheckReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Whether the check failed
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0 || (self.strict && self.count(Severity::Warning) > 0)
    }

    /// Number of distinct files with at least one issue
    pub fn files_with_issues(&self) -> usize {
        self.issues
            .iter()
            .map(|i| i.source.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// One-line summary, e.g. "Checked 12 files: 2 errors, 1 warning"
    pub fn summary(&self) -> String {
        let errors = self.count(Severity::Error);
        let warnings = self.count(Severity::Warning);
        format!(
            "Checked {} file{}: {} error{}, {} warning{}",
            self.checked,
            plural(self.checked),
            errors,
            plural(errors),
            warnings,
            plural(warnings)
        )
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Check options
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Also check the drafts directory
    pub drafts: bool,
    /// Treat warnings as errors
    pub strict: bool,
}

/// Runs the structural checks over a site
pub struct Checker<'a> {
    site: &'a Site,
    loader: PostLoader<'a>,
    /// Layout names available in the layouts directory, when it exists
    layouts: Option<HashSet<String>>,
}

impl<'a> Checker<'a> {
    pub fn new(site: &'a Site) -> Result<Self, ConfigError> {
        Ok(Self {
            site,
            loader: PostLoader::new(site)?,
            layouts: read_layouts(&site.layouts_dir),
        })
    }

    /// Check every post (and, optionally, every draft)
    pub fn run(&self, options: CheckOptions) -> CheckReport {
        let mut files: Vec<(PathBuf, bool)> = self
            .loader
            .discover(&self.site.posts_dir)
            .into_iter()
            .map(|p| (p, false))
            .collect();
        if options.drafts {
            files.extend(
                self.loader
                    .discover(&self.site.drafts_dir)
                    .into_iter()
                    .map(|p| (p, true)),
            );
        }

        let mut report = CheckReport {
            checked: files.len(),
            strict: options.strict || self.site.config.strict,
            issues: Vec::new(),
        };
        let mut permalinks: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (path, draft) in &files {
            let checked = self.check_file(path, *draft);
            if let Some(url_path) = checked.permalink {
                permalinks
                    .entry(url_path)
                    .or_default()
                    .push(checked.source.clone());
            }
            report.issues.extend(checked.issues);
        }

        for (url_path, sources) in permalinks.iter().filter(|(_, s)| s.len() > 1) {
            for source in sources {
                let others: Vec<&str> = sources
                    .iter()
                    .filter(|s| *s != source)
                    .map(String::as_str)
                    .collect();
                report.issues.push(Issue::new(
                    source,
                    None,
                    IssueKind::DuplicatePermalink,
                    format!("permalink `{}` is also used by {}", url_path, others.join(", ")),
                ));
            }
        }

        report
            .issues
            .sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.line.cmp(&b.line)));

        tracing::debug!(
            "Checked {} files, {} issues",
            report.checked,
            report.issues.len()
        );
        report
    }

    /// Check a single file
    pub fn check_file(&self, path: &Path, draft: bool) -> CheckedFile {
        let source = self.site.relative(path);
        let mut checked = CheckedFile {
            source: source.clone(),
            issues: Vec::new(),
            permalink: None,
        };

        let name = if draft {
            None
        } else {
            match path.file_name().and_then(|n| n.to_str()).map(PostName::parse) {
                Some(Ok(name)) => Some(name),
                Some(Err(e)) => {
                    checked.issues.push(file_name_issue(&source, &e));
                    None
                }
                None => {
                    checked.issues.push(Issue::new(
                        &source,
                        None,
                        IssueKind::FileName,
                        "file name is not valid UTF-8",
                    ));
                    None
                }
            }
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                checked
                    .issues
                    .push(Issue::new(&source, None, IssueKind::Unreadable, e.to_string()));
                return checked;
            }
        };

        match FrontMatter::parse(&content) {
            Ok((fm, body)) => {
                let header_lines = crate::content::header_line_count(&content, body);
                self.check_header(&source, &content, &fm, name.as_ref(), &mut checked.issues);
                check_fences(&source, body, header_lines, &mut checked.issues);
            }
            Err(e) => {
                checked.issues.push(header_issue(&source, &e));
                // Without a header the whole file is body
                if matches!(e, FrontMatterError::Missing) {
                    check_fences(&source, &content, 0, &mut checked.issues);
                }
            }
        }

        if checked.issues.iter().all(|i| i.severity < Severity::Error) {
            let post = if draft {
                self.loader.parse_draft(path, &content)
            } else {
                self.loader.parse_post(path, &content)
            };
            // Only posts that will be published can collide
            let today = self.site.config.today();
            checked.permalink = post
                .ok()
                .filter(|p| self.loader.skip_reason(p, today).is_none())
                .map(|p| p.path);
        }

        checked
    }

    fn check_header(
        &self,
        source: &str,
        content: &str,
        fm: &FrontMatter,
        name: Option<&PostName>,
        issues: &mut Vec<Issue>,
    ) {
        for field in &self.site.config.required_fields {
            if fm.get_non_empty(field).is_none() {
                let message = if fm.get(field).is_some() {
                    format!("required field `{}` is blank", field)
                } else {
                    format!("required field `{}` is missing", field)
                };
                let line = key_line(content, field).or(Some(1));
                issues.push(Issue::new(source, line, IssueKind::MissingField, message));
            }
        }

        if let (Some(name), Some(raw)) = (name, fm.date.as_deref()) {
            match fm.parse_date() {
                Some(date) if date.date() != name.date => issues.push(Issue::new(
                    source,
                    key_line(content, "date"),
                    IssueKind::DateMismatch,
                    format!(
                        "header date {} does not match file name date {}",
                        date.date(),
                        name.date
                    ),
                )),
                Some(_) => {}
                None => issues.push(Issue::new(
                    source,
                    key_line(content, "date"),
                    IssueKind::DateMismatch,
                    format!("header date `{}` is not a recognized date", raw),
                )),
            }
        }

        if let (Some(layouts), Some(layout)) = (&self.layouts, fm.get_non_empty("layout")) {
            if !layouts.contains(&layout) {
                issues.push(Issue::new(
                    source,
                    key_line(content, "layout"),
                    IssueKind::UnknownLayout,
                    format!(
                        "layout `{}` not found in {}",
                        layout, self.site.config.layouts_dir
                    ),
                ));
            }
        }
    }
}

/// Issues and resolved URL of one file
#[derive(Debug)]
pub struct CheckedFile {
    pub source: String,
    pub issues: Vec<Issue>,
    /// URL path, when the file loads as a post
    pub permalink: Option<String>,
}

fn file_name_issue(source: &str, error: &FileNameError) -> Issue {
    let kind = match error {
        FileNameError::InvalidDate { .. } => IssueKind::InvalidDate,
        _ => IssueKind::FileName,
    };
    Issue::new(source, None, kind, error.to_string())
}

fn header_issue(source: &str, error: &FrontMatterError) -> Issue {
    let kind = match error {
        FrontMatterError::Missing => IssueKind::MissingHeader,
        FrontMatterError::Unterminated { .. } => IssueKind::UnterminatedHeader,
        FrontMatterError::Invalid(_) | FrontMatterError::NotAMapping => IssueKind::InvalidHeader,
    };
    Issue::new(source, error.line(), kind, error.to_string())
}

fn check_fences(source: &str, body: &str, header_lines: usize, issues: &mut Vec<Issue>) {
    if let Some(fence) = fence::first_unterminated(body) {
        let lang = if fence.info.is_empty() {
            String::new()
        } else {
            format!(" ({})", fence.info)
        };
        issues.push(Issue::new(
            source,
            Some(header_lines + fence.open_line),
            IssueKind::UnterminatedFence,
            format!(
                "code block opened with {}{} is never closed",
                fence.marker_str(),
                lang
            ),
        ));
    }
}

/// Line of a top-level `key:` inside the header
fn key_line(content: &str, key: &str) -> Option<usize> {
    let prefix = format!("{}:", key);
    content
        .lines()
        .enumerate()
        .skip(1)
        .take_while(|(_, line)| {
            let line = line.trim_end();
            line != "---" && line != "..."
        })
        .find(|(_, line)| line.starts_with(&prefix))
        .map(|(idx, _)| idx + 1)
}

/// Names of the layouts in `dir`, if it exists
fn read_layouts(dir: &Path) -> Option<HashSet<String>> {
    let entries = fs::read_dir(dir).ok()?;
    let layouts = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect();
    Some(layouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    fn site(files: &[(&str, &str)]) -> (TempDir, Site) {
        site_with(files, SiteConfig::default())
    }

    fn site_with(files: &[(&str, &str)], config: SiteConfig) -> (TempDir, Site) {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let site = Site::with_config(dir.path(), config);
        (dir, site)
    }

    fn kinds(report: &CheckReport) -> Vec<IssueKind> {
        report.issues.iter().map(|i| i.kind).collect()
    }

    const GOOD: &str = "---\nlayout: post\ntitle: Building a Clojure(script) game with websockets and Reagent\n---\n\n```clojure\n(tick state)\n```\n";

    #[test]
    fn test_clean_post_passes() {
        let (_dir, site) = site(&[("_posts/2016-11-26-clojurescript-websocket-reagent-game.md", GOOD)]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(report.checked, 1);
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_missing_closing_marker() {
        let (_dir, site) = site(&[(
            "_posts/2016-11-26-broken.md",
            "---\nlayout: post\ntitle: Broken\n\nBody\n",
        )]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(kinds(&report), vec![IssueKind::UnterminatedHeader]);
        assert_eq!(report.issues[0].line, Some(1));
        assert!(report.has_errors());
    }

    #[test]
    fn test_missing_header_still_scans_fences() {
        let (_dir, site) = site(&[("_posts/2016-11-26-bare.md", "# Title\n\n```\ncode\n")]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(
            kinds(&report),
            vec![IssueKind::MissingHeader, IssueKind::UnterminatedFence]
        );
        assert_eq!(report.issues[1].line, Some(3));
    }

    #[test]
    fn test_blank_and_missing_fields() {
        let (_dir, site) = site(&[(
            "_posts/2016-11-26-fields.md",
            "---\nlayout: ''\ncomments: true\n---\nBody\n",
        )]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(
            kinds(&report),
            vec![IssueKind::MissingField, IssueKind::MissingField]
        );
        let messages: Vec<&str> = report.issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"required field `layout` is blank"));
        assert!(messages.contains(&"required field `title` is missing"));
        let layout = report
            .issues
            .iter()
            .find(|i| i.message.contains("layout"))
            .unwrap();
        assert_eq!(layout.line, Some(2));
    }

    #[test]
    fn test_file_name_problems() {
        let (_dir, site) = site(&[
            ("_posts/reagent-game.md", GOOD),
            ("_posts/2016-02-30-leap.md", GOOD),
        ]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(report.checked, 2);
        assert_eq!(
            kinds(&report),
            vec![IssueKind::InvalidDate, IssueKind::FileName]
        );
    }

    #[test]
    fn test_unterminated_fence_line_is_absolute() {
        let (_dir, site) = site(&[(
            "_posts/2016-12-11-quickcheck.md",
            "---\nlayout: post\ntitle: QuickCheck\n---\nIntro\n\n```haskell\nquickCheck prop\n",
        )]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(kinds(&report), vec![IssueKind::UnterminatedFence]);
        assert_eq!(report.issues[0].line, Some(7));
        assert_eq!(
            report.issues[0].message,
            "code block opened with ``` (haskell) is never closed"
        );
    }

    #[test]
    fn test_date_mismatch_is_a_warning() {
        let (_dir, site) = site(&[(
            "_posts/2016-11-26-reagent.md",
            "---\nlayout: post\ntitle: Reagent\ndate: 2016-11-27 09:00:00 +0100\n---\n",
        )]);
        let mut report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(kinds(&report), vec![IssueKind::DateMismatch]);
        assert_eq!(report.issues[0].severity, Severity::Warning);
        assert_eq!(report.issues[0].line, Some(4));
        assert!(!report.has_errors());

        report.strict = true;
        assert!(report.has_errors());
    }

    #[test]
    fn test_unknown_layout() {
        let (_dir, site) = site(&[
            ("_layouts/post.html", "{{ content }}"),
            ("_posts/2016-11-26-reagent.md", GOOD),
            (
                "_posts/2016-12-11-quickcheck.md",
                "---\nlayout: article\ntitle: QuickCheck\n---\n",
            ),
        ]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(kinds(&report), vec![IssueKind::UnknownLayout]);
        assert_eq!(report.issues[0].source, "_posts/2016-12-11-quickcheck.md");
    }

    #[test]
    fn test_duplicate_permalinks() {
        let (_dir, site) = site(&[
            ("_posts/2016-11-26-reagent.md", GOOD),
            ("_posts/2016/2016-11-26-reagent.markdown", GOOD),
        ]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(
            kinds(&report),
            vec![IssueKind::DuplicatePermalink, IssueKind::DuplicatePermalink]
        );
        assert!(report.issues[0]
            .message
            .contains("/2016/11/26/reagent.html"));
    }

    #[test]
    fn test_skipped_posts_do_not_collide() {
        let (_dir, site) = site(&[
            ("_posts/2016-11-26-reagent.md", GOOD),
            (
                "_posts/old/2016-11-26-reagent.md",
                "---\nlayout: post\ntitle: Reagent\npublished: false\n---\n",
            ),
        ]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(!report.has_errors());

        let config = SiteConfig {
            future: false,
            ..SiteConfig::default()
        };
        let (_dir, site) = site_with(
            &[
                ("_posts/2999-01-01-someday.md", GOOD),
                ("_posts/later/2999-01-01-someday.md", GOOD),
            ],
            config,
        );
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn test_unreadable_file() {
        let (dir, site) = site(&[("_posts/2016-11-26-reagent.md", GOOD)]);
        fs::write(
            dir.path().join("_posts/2016-12-11-binary.md"),
            [0xffu8, 0xfe, 0x00, 0xc3],
        )
        .unwrap();
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(report.checked, 2);
        assert_eq!(kinds(&report), vec![IssueKind::Unreadable]);
        assert_eq!(report.issues[0].source, "_posts/2016-12-11-binary.md");
        assert_eq!(report.issues[0].line, None);
        assert!(report.has_errors());
    }

    #[test]
    fn test_invalid_headers() {
        let (_dir, site) = site(&[
            ("_posts/2016-11-26-list.md", "---\n- just\n- a list\n---\nBody\n"),
            (
                "_posts/2016-11-26-yaml.md",
                "---\nlayout: post\ntitle: [unclosed\n---\nBody\n",
            ),
        ]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(
            kinds(&report),
            vec![IssueKind::InvalidHeader, IssueKind::InvalidHeader]
        );
        assert_eq!(report.issues[0].source, "_posts/2016-11-26-list.md");
        assert_eq!(report.issues[0].line, Some(2));
        assert_eq!(report.issues[1].source, "_posts/2016-11-26-yaml.md");
        assert!(report.has_errors());
    }

    #[test]
    fn test_strict_from_config() {
        let config = SiteConfig {
            strict: true,
            ..SiteConfig::default()
        };
        let (_dir, site) = site_with(
            &[(
                "_posts/2016-11-26-reagent.md",
                "---\nlayout: post\ntitle: Reagent\ndate: 2016-11-27\n---\n",
            )],
            config,
        );
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(kinds(&report), vec![IssueKind::DateMismatch]);
        assert!(report.strict);
        assert!(report.has_errors());
    }

    #[test]
    fn test_unterminated_fence_in_block_quote() {
        let (_dir, site) = site(&[(
            "_posts/2016-11-26-quote.md",
            "---\nlayout: post\ntitle: Quote\n---\n> ```clojure\n> (tick state)\n\nRest of the post.\n",
        )]);
        let report = Checker::new(&site).unwrap().run(CheckOptions::default());
        assert_eq!(kinds(&report), vec![IssueKind::UnterminatedFence]);
        assert_eq!(report.issues[0].line, Some(5));
    }

    #[test]
    fn test_drafts_are_opt_in() {
        let (_dir, site) = site(&[
            ("_posts/2016-11-26-reagent.md", GOOD),
            ("_drafts/closure.md", "---\nlayout: post\n---\n"),
        ]);
        let checker = Checker::new(&site).unwrap();
        assert_eq!(checker.run(CheckOptions::default()).checked, 1);

        let report = checker.run(CheckOptions {
            drafts: true,
            strict: false,
        });
        assert_eq!(report.checked, 2);
        assert_eq!(kinds(&report), vec![IssueKind::MissingField]);
        assert_eq!(report.issues[0].source, "_drafts/closure.md");
    }

    #[test]
    fn test_issue_display_and_summary() {
        let issue = Issue::new(
            "_posts/x.md",
            Some(3),
            IssueKind::UnterminatedFence,
            "code block opened with ``` is never closed",
        );
        assert_eq!(
            issue.to_string(),
            "_posts/x.md:3: error[unterminated-fence] code block opened with ``` is never closed"
        );

        let report = CheckReport {
            checked: 1,
            strict: false,
            issues: vec![issue],
        };
        assert_eq!(report.summary(), "Checked 1 file: 1 error, 0 warnings");
        assert_eq!(report.files_with_issues(), 1);
    }
}
