//! Process streaming
//!
//! Launches a command (through a shell) or a [`Pipeline`] (as an explicit
//! process graph) and exposes its stdout and stderr as a lazy stream of
//! text lines.
//!
//! Each pipe is drained by its own task into one unbounded channel, so a
//! tool that fills its stderr buffer never stalls while stdout is being read,
//! and a consumer that stops reading never holds the processes back. The
//! consumer only decides the order lines are handed out in.
//!
//! Dropping the returned stream does not stop the run: the child processes
//! keep going and their remaining output is read and discarded.

use futures::stream::{self, Stream};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;
use std::sync::Arc;
use terravision_core::domain::pipeline::Pipeline;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::executor;
use super::observer::RunObserver;

/// Which pipe a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// One line of process output, without its line terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub source: OutputSource,
    pub text: String,
}

/// Single-pass stream of output lines
pub type LineStream = Pin<Box<dyn Stream<Item = OutputLine> + Send>>;

/// Order in which stdout and stderr lines are yielded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputOrder {
    /// Lines are yielded as they arrive from either pipe
    #[default]
    Interleaved,
    /// All stdout lines first, then all stderr lines
    Sequential,
}

impl FromStr for OutputOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interleaved" => Ok(OutputOrder::Interleaved),
            "sequential" => Ok(OutputOrder::Sequential),
            other => Err(format!(
                "unknown output order '{}' (expected 'interleaved' or 'sequential')",
                other
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("working directory {path} is not accessible: {source}")]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("child process has no {0} pipe")]
    MissingPipe(&'static str),
}

/// Final outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus {
    pub exit_code: i32,
    /// Index of the pipeline stage that stopped the run, if any
    pub failed_stage: Option<usize>,
}

impl RunStatus {
    pub fn succeeded() -> Self {
        Self {
            exit_code: 0,
            failed_stage: None,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A launched command or pipeline
pub struct ProcessRun {
    /// Output lines, produced while the run progresses
    pub lines: LineStream,
    /// Resolves once every process has exited and all output has been read
    pub finished: JoinHandle<RunStatus>,
}

/// Sending half of a run's output channel
#[derive(Clone)]
pub(crate) struct LineSender {
    tx: mpsc::UnboundedSender<OutputLine>,
}

impl LineSender {
    /// Queues a line; returns false once the consumer has gone away
    ///
    /// Never waits: lines the consumer has not read yet are buffered.
    pub(crate) fn send(&self, source: OutputSource, text: impl Into<String>) -> bool {
        self.tx
            .send(OutputLine {
                source,
                text: text.into(),
            })
            .is_ok()
    }
}

fn line_channel() -> (LineSender, mpsc::UnboundedReceiver<OutputLine>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LineSender { tx }, rx)
}

/// Strips the `\n` (or `\r\n`) terminator and decodes lossily
pub(crate) fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && buf[end - 1] == b'\r' {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Reads `reader` line by line until EOF, forwarding each line
///
/// Keeps draining after the consumer disconnects so the writer never blocks
/// on a full pipe.
pub(crate) async fn forward_lines<R>(reader: R, source: OutputSource, sender: LineSender)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut connected = true;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if connected && !sender.send(source, decode_line(&buf)) {
                    debug!("Output consumer gone, discarding remaining {:?}", source);
                    connected = false;
                }
            }
            Err(e) => {
                warn!("Failed to read {:?}: {}", source, e);
                break;
            }
        }
    }
}

/// Exit code as a shell would report it (128 + signal for killed processes)
pub(crate) fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

fn into_stream(rx: mpsc::UnboundedReceiver<OutputLine>, order: OutputOrder) -> LineStream {
    match order {
        OutputOrder::Interleaved => Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|line| (line, rx))
        })),
        OutputOrder::Sequential => Box::pin(stream::unfold(
            (rx, VecDeque::new(), false),
            |(mut rx, mut held, mut closed)| async move {
                loop {
                    if closed {
                        return held.pop_front().map(|line| (line, (rx, held, closed)));
                    }
                    match rx.recv().await {
                        Some(line) if line.source == OutputSource::Stdout => {
                            return Some((line, (rx, held, closed)));
                        }
                        Some(line) => held.push_back(line),
                        None => closed = true,
                    }
                }
            },
        )),
    }
}

async fn check_working_dir(path: &Path) -> Result<(), StreamError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| StreamError::WorkingDirectory {
            path: path.to_path_buf(),
            source,
        })?;

    if !metadata.is_dir() {
        return Err(StreamError::WorkingDirectory {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        });
    }

    Ok(())
}

/// Launches commands and pipelines, streaming their output
#[derive(Clone)]
pub struct ProcessStreamer {
    shell: String,
    order: OutputOrder,
    observer: Arc<dyn RunObserver>,
}

impl ProcessStreamer {
    /// Creates a new streamer
    ///
    /// # Arguments
    /// * `shell` - Shell used by [`ProcessStreamer::run`] (invoked as `<shell> -c <command>`)
    /// * `order` - Ordering applied to the output of every run
    /// * `observer` - Receives stage events from pipeline runs
    pub fn new(shell: impl Into<String>, order: OutputOrder, observer: Arc<dyn RunObserver>) -> Self {
        Self {
            shell: shell.into(),
            order,
            observer,
        }
    }

    /// Runs `command` through the shell in `working_dir`
    ///
    /// Pipes, redirections and `&&` in `command` are interpreted by the
    /// shell. Fails only if the process cannot be started; a non-zero exit
    /// is visible through the returned [`RunStatus`] and whatever the command
    /// wrote to stderr.
    pub async fn run(&self, command: &str, working_dir: &Path) -> Result<ProcessRun, StreamError> {
        check_working_dir(working_dir).await?;

        debug!("Running in {}: {}", working_dir.display(), command);

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| StreamError::Spawn {
                program: self.shell.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(StreamError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(StreamError::MissingPipe("stderr"))?;

        let (sender, rx) = line_channel();
        let stdout_task = tokio::spawn(forward_lines(stdout, OutputSource::Stdout, sender.clone()));
        let stderr_task = tokio::spawn(forward_lines(stderr, OutputSource::Stderr, sender));

        let finished = tokio::spawn(async move {
            let exit_code = match child.wait().await {
                Ok(status) => exit_code_of(status),
                Err(e) => {
                    warn!("Failed to wait for shell process: {}", e);
                    1
                }
            };

            for task in [stdout_task, stderr_task] {
                if let Err(e) = task.await {
                    warn!("Output reader task failed: {}", e);
                }
            }

            RunStatus {
                exit_code,
                failed_stage: None,
            }
        });

        Ok(ProcessRun {
            lines: into_stream(rx, self.order),
            finished,
        })
    }

    /// Runs `pipeline` in `working_dir` as an explicit process graph
    ///
    /// Stages run one after another and the first failing stage stops the
    /// run. Programs that cannot be started are reported inline on stderr
    /// like a shell would, so only an inaccessible working directory fails
    /// here.
    pub async fn run_pipeline(
        &self,
        pipeline: Pipeline,
        working_dir: &Path,
    ) -> Result<ProcessRun, StreamError> {
        check_working_dir(working_dir).await?;

        debug!(
            "Running pipeline '{}' ({} stages) in {}",
            pipeline.name,
            pipeline.stages.len(),
            working_dir.display()
        );

        let (sender, rx) = line_channel();
        let finished = tokio::spawn(executor::execute(
            pipeline,
            working_dir.to_path_buf(),
            sender,
            self.observer.clone(),
        ));

        Ok(ProcessRun {
            lines: into_stream(rx, self.order),
            finished,
        })
    }
}
