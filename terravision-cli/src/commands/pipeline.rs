//! Pipeline command handlers
//!
//! Runs validate or graph on the server and prints the output as it
//! arrives.

use anyhow::{Context, Result, bail};
use colored::*;
use futures::{Stream, StreamExt};
use std::io::Write;
use std::path::Path;
use terravision_client::{OutputLines, TerravisionClient};
use terravision_core::domain::pipeline::{GRAPH_DONE, VALIDATE_DONE};

use super::files::upload_dir;
use super::output::save_output;
use crate::ansi::AnsiStripper;
use crate::config::Config;

/// Handle `validate [--dir]`
pub async fn handle_validate(dir: Option<&Path>, config: &Config) -> Result<()> {
    let client = TerravisionClient::new(&config.api_url);
    if let Some(dir) = dir {
        upload_dir(&client, dir).await?;
    }

    println!("{}", "Running terraform validate...".bold());
    let lines = client.validate().await.context("Failed to start validation")?;

    if !print_lines(lines, VALIDATE_DONE, config).await? {
        bail!("Validation failed");
    }
    Ok(())
}

/// Handle `graph [--dir] [--out]`
pub async fn handle_graph(dir: Option<&Path>, out: Option<&Path>, config: &Config) -> Result<()> {
    let client = TerravisionClient::new(&config.api_url);
    if let Some(dir) = dir {
        upload_dir(&client, dir).await?;
    }

    println!("{}", "Generating diagram...".bold());
    let lines = client.graph().await.context("Failed to start graph generation")?;

    // The HTTP status is 200 even when a stage failed; only a run that
    // reached its final announcement has refreshed the PNG.
    if !print_lines(lines, GRAPH_DONE, config).await? {
        bail!("Graph generation failed");
    }

    match out {
        Some(out) => save_output(&client, out).await,
        None => Ok(()),
    }
}

/// Prints every line of `lines` and reports whether `done` was among them
async fn print_lines(lines: OutputLines, done: &str, config: &Config) -> Result<bool> {
    let stripper = AnsiStripper::new()?;
    let mut stdout = std::io::stdout();
    relay_lines(lines, done, &stripper, config.raw, &mut stdout).await
}

/// Writes each line to `out`, stripped unless `raw`
///
/// The completion check always runs on the stripped text, so a coloured
/// `done` line still counts.
async fn relay_lines<S, W>(
    mut lines: S,
    done: &str,
    stripper: &AnsiStripper,
    raw: bool,
    out: &mut W,
) -> Result<bool>
where
    S: Stream<Item = terravision_client::Result<String>> + Unpin,
    W: Write,
{
    let mut finished = false;

    while let Some(line) = lines.next().await {
        let line = line.context("Output stream interrupted")?;
        let plain = stripper.strip(&line);

        if raw {
            writeln!(out, "{}", line)?;
        } else {
            writeln!(out, "{}", plain)?;
        }
        out.flush()?;

        finished |= plain.trim() == done;
    }

    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use terravision_client::ClientError;

    async fn relay(lines: &[&str], done: &str, raw: bool) -> (bool, String) {
        let items: Vec<terravision_client::Result<String>> =
            lines.iter().map(|line| Ok(line.to_string())).collect();
        let stripper = AnsiStripper::new().unwrap();
        let mut out = Vec::new();

        let finished = relay_lines(stream::iter(items), done, &stripper, raw, &mut out)
            .await
            .unwrap();
        (finished, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_completed_run_is_detected() {
        let (finished, out) = relay(
            &[
                "Initializing Terraform...",
                "Validating configuration...",
                VALIDATE_DONE,
            ],
            VALIDATE_DONE,
            false,
        )
        .await;

        assert!(finished);
        assert!(out.ends_with("Validation completed successfully!\n"));
    }

    #[tokio::test]
    async fn test_failed_run_is_detected() {
        let (finished, out) = relay(
            &[
                "Initializing Terraform...",
                "Generating graph...",
                "\x1b[31mError: \x1b[0mUnclosed configuration block",
            ],
            GRAPH_DONE,
            false,
        )
        .await;

        assert!(!finished);
        assert!(out.contains("Error: Unclosed configuration block\n"));
        assert!(!out.contains('\x1b'));
    }

    #[tokio::test]
    async fn test_coloured_done_line_still_counts() {
        let coloured = format!("\x1b[32m\x1b[1m{}\x1b[0m", GRAPH_DONE);

        let (finished, out) = relay(&["Generating graph...", coloured.as_str()], GRAPH_DONE, false).await;
        assert!(finished);
        assert!(out.ends_with("Diagram generated successfully!\n"));

        let (finished, out) = relay(&[coloured.as_str()], GRAPH_DONE, true).await;
        assert!(finished);
        assert_eq!(out, format!("{}\n", coloured));
    }

    #[tokio::test]
    async fn test_interrupted_stream_is_an_error() {
        let items: Vec<terravision_client::Result<String>> = vec![
            Ok("Initializing Terraform...".to_string()),
            Err(ClientError::ParseError("connection reset".to_string())),
        ];
        let stripper = AnsiStripper::new().unwrap();
        let mut out = Vec::new();

        let result = relay_lines(stream::iter(items), GRAPH_DONE, &stripper, false, &mut out).await;

        assert!(result.is_err());
        assert_eq!(String::from_utf8(out).unwrap(), "Initializing Terraform...\n");
    }
}
