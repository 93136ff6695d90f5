//! Check posts, once or on every change

use anyhow::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::io::{self, Write};
use std::time::Duration;

use super::OutputFormat;
use crate::check::{CheckOptions, CheckReport};
use crate::Site;

/// Check the site and print the report
pub fn run(site: &Site, options: CheckOptions, format: OutputFormat) -> Result<CheckReport> {
    let start = std::time::Instant::now();
    let report = site.check(options)?;

    let stdout = io::stdout();
    write_report(&report, format, &mut stdout.lock())?;

    tracing::debug!("Checked in {:.2}s", start.elapsed().as_secs_f64());
    Ok(report)
}

/// Write a report as text or JSON
pub fn write_report<W: Write>(report: &CheckReport, format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Text => {
            for issue in &report.issues {
                writeln!(out, "{}", issue)?;
            }
            writeln!(out, "{}", report.summary())?;
        }
    }
    Ok(())
}

/// Watch the site for changes and re-check (until Ctrl+C)
pub async fn watch(site: &Site, options: CheckOptions, format: OutputFormat) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let mut debouncer = new_debouncer(
        Duration::from_millis(300),
        move |res: DebounceEventResult| match res {
            Ok(events) => {
                let _ = tx.send(events.len());
            }
            Err(e) => tracing::warn!("Watch error: {:?}", e),
        },
    )?;

    let watcher = debouncer.watcher();
    for dir in [&site.posts_dir, &site.drafts_dir, &site.layouts_dir] {
        if dir.exists() {
            watcher.watch(dir, RecursiveMode::Recursive)?;
        }
    }
    for name in ["_config.yml", "_config.yaml", "_config.toml"] {
        let path = site.base_dir.join(name);
        if path.exists() {
            watcher.watch(&path, RecursiveMode::NonRecursive)?;
        }
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = rx.recv() => {
                let Some(count) = changed else {
                    break;
                };
                tracing::info!("{} file(s) changed, checking again...", count);

                // The config may be one of the changed files
                let result = Site::new(&site.base_dir).and_then(|site| run(&site, options, format));
                if let Err(e) = result {
                    tracing::error!("Check failed: {}", e);
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Stopped watching");
                break;
            }
        }
    }

    Ok(())
}
