//! Content module - post files, their front-matter and bodies

pub mod fence;
mod filename;
mod frontmatter;
pub mod loader;
pub mod markdown;
pub mod order;
mod post;

pub use filename::{FileNameError, PostName};
pub(crate) use frontmatter::header_line_count;
pub use frontmatter::{parse_date_string, FrontMatter, FrontMatterError};
pub use loader::{LoadReport, PostLoader, Rejected};
pub use markdown::{CodeBlock, MarkdownRenderer};
pub use post::{Post, PostError};
