//! Watch loop wiring: configure the watcher, consume its channels, react

use crate::runner::CommandRunner;
use crate::settings::Settings;
use anyhow::{Context, Result};
use crossbeam_channel::select;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use watcher::{Event, GitignoreHook, RegexFilterHook, WatchError, Watcher};

/// Build a watcher from resolved settings
///
/// Hooks and ignores are installed before any root is added so the initial
/// listing already honours them.
pub fn build_watcher(settings: &Settings) -> Result<Watcher> {
    let watcher = Watcher::with_config(settings.watch.clone());

    if let Some(regex) = &settings.filter {
        watcher.add_filter_hook(RegexFilterHook::new(regex.clone()).exempt_dirs(true));
    }
    if let Some(file) = &settings.ignore_file {
        let root = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let root = std::path::absolute(root)
            .with_context(|| format!("Failed to resolve {}", root.display()))?;
        let hook = GitignoreHook::from_file(&root, file)
            .with_context(|| format!("Failed to load ignore file {}", file.display()))?;
        debug!("Loaded {} patterns from {}", hook.len(), file.display());
        watcher.add_filter_hook(hook);
    }
    if !settings.ignore.is_empty() {
        watcher
            .ignore(&settings.ignore)
            .context("Failed to ignore paths")?;
    }

    for path in &settings.paths {
        let added = if settings.recursive {
            watcher.add_recursive(path)
        } else {
            watcher.add(path)
        };
        added.with_context(|| format!("Failed to watch {}", path.display()))?;
    }

    Ok(watcher)
}

/// Text printed (and piped) for an event
pub fn format_event(event: &Event, json: bool) -> Result<String> {
    if json {
        serde_json::to_string(event).context("Failed to serialize event")
    } else {
        Ok(event.to_string())
    }
}

/// Consume events and errors until the watcher closes
///
/// Deleted roots are reported and skipped; any other watcher error, or a
/// command failure without keepalive, closes the watcher and is returned.
pub fn consume(watcher: &Watcher, runner: Option<&CommandRunner>, json: bool) -> Result<()> {
    let result = consume_until_closed(watcher, runner, json);
    if result.is_err() {
        watcher.close();
    }
    result
}

fn consume_until_closed(
    watcher: &Watcher,
    runner: Option<&CommandRunner>,
    json: bool,
) -> Result<()> {
    loop {
        select! {
            recv(watcher.events()) -> event => {
                let Ok(event) = event else { return Ok(()) };
                let line = format_event(&event, json)?;
                println!("{}", line);
                if let Some(runner) = runner {
                    runner.run(&line)?;
                }
            }
            recv(watcher.errors()) -> err => {
                let Ok(err) = err else { return Ok(()) };
                if err.is_recoverable() {
                    eprintln!("{} {}", "warning:".yellow(), err);
                    continue;
                }
                return Err(err).context("Watcher failed");
            }
            recv(watcher.closed()) -> _ => return Ok(()),
        }
    }
}

/// `path: name` for every watched entry
pub fn watched_listing(watcher: &Watcher) -> Vec<String> {
    watcher
        .watched_files()
        .iter()
        .map(|(path, record)| format!("{}: {}", path.display(), record.name))
        .collect()
}

/// Run until Ctrl-C or a fatal error
pub async fn run(settings: Settings) -> Result<()> {
    let watcher = Arc::new(build_watcher(&settings)?);
    let runner = settings
        .command
        .as_ref()
        .map(CommandRunner::new)
        .transpose()?;

    if settings.list {
        for line in watched_listing(&watcher) {
            println!("{}", line);
        }
    }
    println!("Watching {} files", watcher.watched_files().len());

    // Filled before the watcher is closed, so it is visible once polling stops
    let (startup_tx, startup_failed) = crossbeam_channel::bounded(1);
    if let (Some(runner), Some(spec)) = (&runner, &settings.command) {
        if spec.on_start {
            let runner = runner.clone();
            let watcher = Arc::clone(&watcher);
            tokio::task::spawn_blocking(move || {
                if let Err(err) = runner.run("") {
                    let _ = startup_tx.send(err.context("Start command failed"));
                    watcher.close();
                }
            });
        }
    }

    let poller = {
        let watcher = Arc::clone(&watcher);
        let interval = settings.interval;
        tokio::task::spawn_blocking(move || watcher.start(interval))
    };
    let mut consumer = {
        let watcher = Arc::clone(&watcher);
        let json = settings.json;
        tokio::task::spawn_blocking(move || consume(&watcher, runner.as_ref(), json))
    };

    info!(
        "Watching {} roots every {:?}",
        settings.paths.len(),
        settings.interval
    );

    let consumed = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            watcher.close();
            consumer.await.context("Event consumer panicked")?
        }
        consumed = &mut consumer => consumed.context("Event consumer panicked")?,
    };

    let polled = poller.await.context("Poll loop panicked")?;
    match polled {
        Ok(()) | Err(WatchError::Closed) => {}
        Err(err) => warn!("Poll loop ended with error: {}", err),
    }

    println!("{}", "watcher closed".dimmed());
    consumed?;

    match startup_failed.try_recv() {
        Ok(err) => Err(err),
        Err(_) => Ok(()),
    }
}
