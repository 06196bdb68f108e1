//! linescope - index, search, filter and follow very large text files.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use futures::StreamExt;
use linescope::processor::Operation;
use linescope::{DocumentIndex, EngineConfig, EventKind, FilterRule, Notification, SearchRequest};
use std::io::Write;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging for development
    env_logger::init();

    let matches = Command::new("linescope")
        .version(linescope::VERSION)
        .about("Index, search and filter very large text files")
        .long_about(
            "linescope builds a line index of a file in the background, then prints \
             search hits or filtered lines. With --follow it keeps printing lines as \
             they are appended.",
        )
        .arg(
            Arg::new("file")
                .help("Path to the file to index")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("search")
                .long("search")
                .short('s')
                .value_name("PATTERN")
                .help("Print lines matching PATTERN"),
        )
        .arg(
            Arg::new("regex")
                .long("regex")
                .short('r')
                .action(ArgAction::SetTrue)
                .help("Treat patterns as regular expressions"),
        )
        .arg(
            Arg::new("ignore-case")
                .long("ignore-case")
                .short('i')
                .action(ArgAction::SetTrue)
                .help("ASCII case-insensitive literal matching"),
        )
        .arg(
            Arg::new("max")
                .long("max")
                .short('m')
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .help("Stop the search after N matches (0 = unlimited)"),
        )
        .arg(
            Arg::new("filter")
                .long("filter")
                .short('f')
                .value_name("PATTERN")
                .action(ArgAction::Append)
                .help("Only print lines matching every given PATTERN"),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .short('e')
                .value_name("NAME")
                .default_value("utf-8")
                .help("Text encoding used for matching"),
        )
        .arg(
            Arg::new("follow")
                .long("follow")
                .action(ArgAction::SetTrue)
                .help("Keep printing appended lines until interrupted"),
        )
        .get_matches();

    let file_path = PathBuf::from(
        matches
            .get_one::<String>("file")
            .context("file argument is required")?,
    );

    // Validate file exists
    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", file_path.display());
    }

    if !file_path.is_file() {
        anyhow::bail!("Path is not a regular file: {}", file_path.display());
    }

    let config = load_config()?;
    let default_max = config.default_max_occurrences;
    let mut document = DocumentIndex::new(&file_path, config)?;

    // Status messages go to stderr so stdout stays clean for line output.
    let mut notifications = document.subscribe();
    let status = tokio::spawn(async move {
        while let Some(notification) = notifications.next().await {
            if let Notification::Message { text, .. } = notification {
                eprintln!("{text}");
            }
        }
    });

    document.invalidate()?;
    finish(&mut document, Operation::CreateIndex).await?;

    let encoding = matches
        .get_one::<String>("encoding")
        .map(String::as_str)
        .unwrap_or("utf-8");
    let regex = matches.get_flag("regex");
    let ignore_case = matches.get_flag("ignore-case");
    let request = |pattern: &str| {
        if regex {
            SearchRequest::regex(pattern)
        } else if ignore_case {
            SearchRequest::literal_ignore_case(pattern)
        } else {
            SearchRequest::literal(pattern)
        }
    };

    let mut stdout = std::io::stdout().lock();

    if let Some(pattern) = matches.get_one::<String>("search") {
        let max = matches.get_one::<usize>("max").copied().unwrap_or(default_max);
        document.search(&request(pattern.as_str()), encoding, false, 0, max)?;
        finish(&mut document, Operation::Search).await?;
        for result in document.search_results() {
            writeln!(stdout, "{}:{}", result.line_number + 1, result.line_text)?;
        }
    } else if let Some(patterns) = matches.get_many::<String>("filter") {
        let rules: Vec<FilterRule> = patterns
            .map(|pattern| FilterRule::new(request(pattern.as_str()), true))
            .collect();
        document.filter(&rules, encoding, true)?;
        finish(&mut document, Operation::CreateFilter).await?;
        let count = document.logical_lines_count();
        if count > 0 {
            for line in document.logical_lines(0, count - 1)? {
                stdout.write_all(&line)?;
            }
        }
    } else {
        eprintln!(
            "{}: {} lines",
            document.file_name().unwrap_or("<file>"),
            document.source_lines_count()
        );
    }
    stdout.flush()?;

    if matches.get_flag("follow") {
        follow(&mut document, &mut stdout).await?;
    }

    status.abort();
    Ok(())
}

#[cfg(feature = "config")]
fn load_config() -> Result<EngineConfig> {
    match EngineConfig::default_path() {
        Some(path) if path.exists() => EngineConfig::load(&path)
            .with_context(|| format!("loading {}", path.display())),
        _ => Ok(EngineConfig::default()),
    }
}

#[cfg(not(feature = "config"))]
fn load_config() -> Result<EngineConfig> {
    Ok(EngineConfig::default())
}

/// Pump worker events until `operation` completes.
async fn finish(document: &mut DocumentIndex, operation: Operation) -> Result<()> {
    while let Some(kind) = document.process_next().await {
        let done = match (operation, kind) {
            (_, EventKind::Failed(failed)) if failed == operation => {
                anyhow::bail!("{operation:?} failed for {}", document.file_path().display())
            }
            (Operation::CreateIndex, EventKind::Index { completed }) => completed,
            (Operation::Search, EventKind::Search { completed }) => completed,
            (Operation::CreateFilter, EventKind::Filter { completed }) => completed,
            _ => false,
        };
        if done {
            return Ok(());
        }
    }
    anyhow::bail!("processing worker stopped unexpectedly")
}

/// Print bytes appended to the file until Ctrl-C.
async fn follow(document: &mut DocumentIndex, out: &mut impl Write) -> Result<()> {
    let mut printed_to = document
        .line_records()
        .last()
        .map_or(0, |record| record.end());
    document.set_auto_refresh(true)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            kind = document.process_next() => {
                let Some(kind) = kind else { break };
                if !matches!(kind, EventKind::Index { .. }) {
                    continue;
                }
                let end = document.line_records().last().map_or(0, |record| record.end());
                if end < printed_to {
                    printed_to = 0;
                }
                if end > printed_to {
                    let text = document.text(printed_to, end)?;
                    out.write_all(&text)?;
                    out.flush()?;
                    printed_to = end;
                }
            }
        }
    }

    document.set_auto_refresh(false)?;
    Ok(())
}
