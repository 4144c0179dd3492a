//! Pipeline executor
//!
//! Runs a [`Pipeline`] without a shell. Stages are chained with `&&`
//! semantics; within an `Exec` stage every process gets its own child and
//! the pipes between them are relayed by tasks, which is also where a teed
//! stream is copied to the run's stderr.
//!
//! Exit codes follow the shell: a chain's status is its last process's
//! status, and a program that cannot be started counts as 127.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use terravision_core::domain::pipeline::{Chain, Pipeline, Stage};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::observer::RunObserver;
use super::process::{
    LineSender, OutputSource, RunStatus, decode_line, exit_code_of, forward_lines,
};

const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Where a process's stdout ends up
enum Sink {
    /// Stdin of the next process in the chain
    Pipe(ChildStdin),
    /// A redirect target
    File(File),
    /// The run's own stdout
    Output,
}

/// Runs every stage in order, stopping at the first failure
pub(crate) async fn execute(
    pipeline: Pipeline,
    working_dir: PathBuf,
    sender: LineSender,
    observer: Arc<dyn RunObserver>,
) -> RunStatus {
    for (index, stage) in pipeline.stages.iter().enumerate() {
        observer.stage_started(pipeline.name, index, stage);
        let exit_code = run_stage(stage, &working_dir, &sender).await;
        observer.stage_finished(pipeline.name, index, exit_code);

        if exit_code != 0 {
            return RunStatus {
                exit_code,
                failed_stage: Some(index),
            };
        }
    }

    RunStatus::succeeded()
}

async fn run_stage(stage: &Stage, working_dir: &Path, sender: &LineSender) -> i32 {
    match stage {
        Stage::Announce(text) => {
            sender.send(OutputSource::Stdout, text.clone());
            0
        }
        Stage::CreateDir(path) => match tokio::fs::create_dir_all(working_dir.join(path)).await {
            Ok(()) => 0,
            Err(e) => {
                sender.send(
                    OutputSource::Stderr,
                    format!("mkdir: cannot create directory '{}': {}", path.display(), e),
                );
                1
            }
        },
        Stage::Exec(chain) => run_chain(chain, working_dir, sender).await,
    }
}

async fn run_chain(chain: &Chain, working_dir: &Path, sender: &LineSender) -> i32 {
    let count = chain.invocations.len();
    if count == 0 {
        return 0;
    }

    let mut redirect = match &chain.stdout_file {
        Some(path) => match File::create(working_dir.join(path)).await {
            Ok(file) => Some(file),
            Err(e) => {
                sender.send(OutputSource::Stderr, format!("{}: {}", path.display(), e));
                return 1;
            }
        },
        None => None,
    };

    let mut children: Vec<(String, Child, bool)> = Vec::with_capacity(count);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    let mut upstream: Option<(ChildStdout, bool)> = None;
    let mut last_failed_to_start = false;

    for (idx, invocation) in chain.invocations.iter().enumerate() {
        let is_last = idx + 1 == count;

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(working_dir)
            .stdin(if upstream.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped());

        // A plain `> file` hands the file straight to the last process;
        // anything teed still needs a relay.
        match redirect.take() {
            Some(file) if is_last && !invocation.tee_stderr => {
                command.stdout(Stdio::from(file.into_std().await));
            }
            other => {
                redirect = other;
                command.stdout(Stdio::piped());
            }
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!("Failed to start {}: {}", invocation.program, e);
                sender.send(OutputSource::Stderr, format!("{}: {}", invocation.program, e));
                // Closing the previous stdout and feeding EOF onward mirrors
                // what a shell does with a missing command mid-pipe.
                upstream = None;
                last_failed_to_start = is_last;
                continue;
            }
        };

        if let Some(stderr) = child.stderr.take() {
            tasks.push(tokio::spawn(forward_lines(
                stderr,
                OutputSource::Stderr,
                sender.clone(),
            )));
        }

        if let Some((previous, tee)) = upstream.take() {
            if let Some(stdin) = child.stdin.take() {
                tasks.push(tokio::spawn(relay(previous, Sink::Pipe(stdin), tee, sender.clone())));
            }
        }

        if let Some(stdout) = child.stdout.take() {
            if is_last {
                let sink = match redirect.take() {
                    Some(file) => Sink::File(file),
                    None => Sink::Output,
                };
                tasks.push(tokio::spawn(relay(
                    stdout,
                    sink,
                    invocation.tee_stderr,
                    sender.clone(),
                )));
            } else {
                upstream = Some((stdout, invocation.tee_stderr));
            }
        }

        children.push((invocation.program.clone(), child, is_last));
    }

    let mut exit_code = if last_failed_to_start {
        EXIT_COMMAND_NOT_FOUND
    } else {
        0
    };

    for (program, mut child, is_last) in children {
        let code = match child.wait().await {
            Ok(status) => exit_code_of(status),
            Err(e) => {
                warn!("Failed to wait for {}: {}", program, e);
                1
            }
        };
        debug!("{} exited with code {}", program, code);

        if is_last {
            exit_code = code;
        }
    }

    for task in tasks {
        if let Err(e) = task.await {
            warn!("Output relay task failed: {}", e);
        }
    }

    exit_code
}

/// Copies `source` line by line into `sink`, optionally teeing to stderr
///
/// Stops early when the downstream process closes its stdin, which closes
/// `source` and lets the upstream process see a broken pipe.
async fn relay(source: ChildStdout, mut sink: Sink, tee: bool, sender: LineSender) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read process output: {}", e);
                break;
            }
        }

        if tee {
            sender.send(OutputSource::Stderr, decode_line(&buf));
        }

        let delivered = match &mut sink {
            Sink::Pipe(stdin) => stdin.write_all(&buf).await.is_ok(),
            Sink::File(file) => file.write_all(&buf).await.is_ok(),
            Sink::Output => {
                sender.send(OutputSource::Stdout, decode_line(&buf));
                true
            }
        };

        if !delivered {
            debug!("Downstream closed, stopping relay");
            break;
        }
    }

    if let Sink::File(mut file) = sink {
        if let Err(e) = file.flush().await {
            warn!("Failed to flush redirected output: {}", e);
        }
    }
}
