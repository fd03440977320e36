// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a timestamp relative to now (e.g. "5s ago", "2h ago").
pub fn format_time_ago(time: DateTime<Utc>) -> String {
    let elapsed = (Utc::now() - time).to_std().unwrap_or_default();
    format!("{} ago", wj_core::format_elapsed(elapsed))
}

/// Render rows under a header, padding every column but the last.
///
/// Widths are computed on the plain text; `style` is applied before padding
/// is appended so escape codes don't skew alignment.
pub fn render_table(
    out: &mut dyn Write,
    headers: &[&str],
    rows: &[Vec<String>],
    style: impl Fn(usize, &str) -> String,
) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let render = |cells: &mut dyn Iterator<Item = (usize, String, String)>| {
        let mut line = String::new();
        for (i, plain, styled) in cells {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(&styled);
            if i + 1 < widths.len() {
                let pad = widths[i].saturating_sub(plain.chars().count());
                line.push_str(&" ".repeat(pad));
            }
        }
        line
    };

    let header = render(&mut headers.iter().enumerate().map(|(i, h)| (i, h.to_string(), crate::color::header(h))));
    let _ = writeln!(out, "{}", header.trim_end());
    for row in rows {
        let line = render(&mut row.iter().enumerate().map(|(i, cell)| (i, cell.clone(), style(i, cell))));
        let _ = writeln!(out, "{}", line.trim_end());
    }
}

/// Render a list as a table or JSON. Handles the empty case.
pub fn handle_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    render_text: impl FnOnce(&[T], &mut dyn Write),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_msg);
            } else {
                render_text(items, &mut std::io::stdout());
            }
        }
    }
    Ok(())
}

/// Renders as JSON when `format` is `Json`, otherwise calls `text_fn`.
pub fn format_or_json<T: Serialize>(format: OutputFormat, data: &T, text_fn: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => text_fn(),
    }
    Ok(())
}

/// Print a job log file, then keep tailing it if `follow` is set.
pub async fn display_log(path: &Path, follow: bool, format: OutputFormat, label: &str) -> anyhow::Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    match format {
        OutputFormat::Text => {
            if content.is_empty() {
                eprintln!("No log entries found for {}", label);
            } else {
                print!("{}", content);
                if !content.ends_with('\n') {
                    println!();
                }
            }
            if follow {
                tail_file(path).await?;
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "log_path": path.to_string_lossy(),
                "lines": content.lines().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
            if follow {
                eprintln!("warning: --follow is not supported with --output json");
            }
        }
    }
    Ok(())
}

/// Tail a file, printing new lines as they appear, until Ctrl-C.
pub async fn tail_file(path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::File::open(path).map_err(|_| anyhow::anyhow!("Log file not found: {}", path.display()))?;
    // The current contents were already printed
    file.seek(SeekFrom::End(0))?;
    let mut reader = BufReader::new(file);

    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let mut watcher = notify::recommended_watcher(move |res: Result<NotifyEvent, _>| {
        if let Ok(event) = res {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                let _ = tx.blocking_send(());
            }
        }
    })?;
    let watch_dir = path.parent().unwrap_or(path);
    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let mut line = String::new();
        while reader.read_line(&mut line)? > 0 {
            print!("{}", line);
            line.clear();
        }
        let _ = std::io::stdout().flush();

        tokio::select! {
            _ = rx.recv() => {}
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}
