//! CLI entry point for posts-rs

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use posts_rs::check::CheckOptions;
use posts_rs::commands::{self, new::NewPost, OutputFormat};

#[derive(Parser)]
#[command(name = "posts-rs")]
#[command(version)]
#[command(about = "Load, check and index Jekyll-style blog posts", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post or draft
    New {
        /// Title of the new post
        title: String,

        /// Layout to use (defaults to the configured default_layout)
        #[arg(short, long)]
        layout: Option<String>,

        /// Publication date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Create a draft instead of a post
        #[arg(long)]
        draft: bool,
    },

    /// Check posts for malformed headers, file names and code fences
    #[command(alias = "c")]
    Check {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Also check drafts
        #[arg(long)]
        drafts: bool,

        /// Watch for file changes and check again
        #[arg(short, long)]
        watch: bool,
    },

    /// List posts newest first
    #[command(alias = "ls")]
    List {
        /// Type of content to list (post, draft, archive, tag, category)
        #[arg(default_value = "post")]
        r#type: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Render a post body to HTML
    Render {
        /// Post file
        file: PathBuf,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "posts_rs=debug,info"
    } else {
        "posts_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            commands::init::init_site(&target_dir)?;
            println!("Initialized empty site in {:?}", target_dir);
        }

        Commands::New {
            title,
            layout,
            date,
            draft,
        } => {
            let site = posts_rs::Site::new(&base_dir)?;
            let path = commands::new::create_post(
                &site,
                &NewPost {
                    title: &title,
                    layout: layout.as_deref(),
                    date,
                    draft,
                },
            )?;
            println!("Created: {}", site.relative(&path));
        }

        Commands::Check {
            format,
            strict,
            drafts,
            watch,
        } => {
            let site = posts_rs::Site::new(&base_dir)?;
            let options = CheckOptions { drafts, strict };
            let report = commands::check::run(&site, options, format)?;

            if watch {
                commands::check::watch(&site, options, format).await?;
            } else if report.has_errors() {
                std::process::exit(1);
            }
        }

        Commands::List { r#type, format } => {
            let site = posts_rs::Site::new(&base_dir)?;
            commands::list::run(&site, &r#type, format)?;
        }

        Commands::Render { file } => {
            let site = posts_rs::Site::new(&base_dir)?;
            commands::render::run(&site, &file)?;
        }

        Commands::Version => {
            println!("posts-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
