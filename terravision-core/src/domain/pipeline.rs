//! Pipeline domain types
//!
//! A pipeline is an ordered list of stages chained with `&&` semantics: the
//! first stage that fails stops the run. The two pipelines the service
//! exposes are built here so the server and any tooling agree on exactly
//! which commands run.

use std::fmt;
use std::path::PathBuf;

/// Directory (relative to the workspace) the diagram is rendered into
pub const OUTPUT_DIR: &str = "output";

/// File name of the rendered diagram inside [`OUTPUT_DIR`]
pub const DIAGRAM_FILE: &str = "diagram.dot.png";

/// Final line of a validate run that passed every stage
pub const VALIDATE_DONE: &str = "Validation completed successfully!";

/// Final line of a graph run that rendered the diagram
pub const GRAPH_DONE: &str = "Diagram generated successfully!";

/// Default command for the graph transform program
pub const DEFAULT_TRANSFORM_COMMAND: &str = "node ../index.js";

/// A single external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Copy this process's stdout to the run's stderr as well as to the next
    /// process in the chain (`| tee /dev/stderr |`)
    pub tee_stderr: bool,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            tee_stderr: false,
        }
    }

    /// Parses a whitespace separated command line such as `node ../index.js`
    ///
    /// Returns `None` for an empty command. No quoting rules are applied.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }

    /// Marks this invocation's output to be teed to stderr
    pub fn teed(mut self) -> Self {
        self.tee_stderr = true;
        self
    }

    fn to_shell(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(shell_quote(&self.program));
        words.extend(self.args.iter().map(|arg| shell_quote(arg)));
        words.join(" ")
    }
}

/// Processes connected stdout to stdin, like a shell pipe
///
/// The chain succeeds when its last process exits with status zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub invocations: Vec<Invocation>,
    /// Redirect the final stdout into this file (relative to the workspace)
    pub stdout_file: Option<PathBuf>,
}

impl Chain {
    pub fn single(invocation: Invocation) -> Self {
        Self {
            invocations: vec![invocation],
            stdout_file: None,
        }
    }

    pub fn piped(invocations: Vec<Invocation>) -> Self {
        Self {
            invocations,
            stdout_file: None,
        }
    }

    /// Redirects the final stdout into `path` (`> path`)
    pub fn into_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_file = Some(path.into());
        self
    }

    fn to_shell(&self) -> String {
        let mut rendered = String::new();
        for (idx, invocation) in self.invocations.iter().enumerate() {
            if idx > 0 {
                rendered.push_str(" | ");
            }
            rendered.push_str(&invocation.to_shell());
            if invocation.tee_stderr {
                rendered.push_str(" | tee /dev/stderr");
            }
        }
        if let Some(path) = &self.stdout_file {
            rendered.push_str(" > ");
            rendered.push_str(&shell_quote(&path.to_string_lossy()));
        }
        rendered
    }
}

/// One step of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Print a progress line on stdout
    Announce(String),
    /// Create a directory and its parents, relative to the workspace
    CreateDir(PathBuf),
    /// Run a chain of external processes
    Exec(Chain),
}

impl Stage {
    pub fn announce(text: impl Into<String>) -> Self {
        Stage::Announce(text.into())
    }

    pub fn exec(invocation: Invocation) -> Self {
        Stage::Exec(Chain::single(invocation))
    }

    fn to_shell(&self) -> String {
        match self {
            Stage::Announce(text) => format!("echo {}", shell_quote(text)),
            Stage::CreateDir(path) => format!("mkdir -p {}", shell_quote(&path.to_string_lossy())),
            Stage::Exec(chain) => chain.to_shell(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell())
    }
}

/// Fixed sequence of stages run against the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub name: &'static str,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// `terraform init` followed by `terraform validate`
    pub fn validate() -> Self {
        let mut stages = terraform_prelude();
        stages.push(Stage::announce(VALIDATE_DONE));

        Self {
            name: "validate",
            stages,
        }
    }

    /// Full diagram workflow: init, validate, emit the graph, transform it
    /// and render it to `output/diagram.dot.png`
    ///
    /// # Arguments
    /// * `transform` - The program rewriting the raw graph (reads DOT on
    ///   stdin, writes DOT on stdout)
    pub fn graph(transform: Invocation) -> Self {
        let mut stages = vec![Stage::CreateDir(PathBuf::from(OUTPUT_DIR))];
        stages.extend(terraform_prelude());
        stages.push(Stage::announce("Generating graph..."));
        stages.push(Stage::Exec(
            Chain::piped(vec![
                Invocation::new("terraform", ["graph"]),
                Invocation::new("sed", ["s/RL/TB/g"]),
                transform.teed(),
                Invocation::new("dot", ["-Tpng"]),
            ])
            .into_file(PathBuf::from(OUTPUT_DIR).join(DIAGRAM_FILE)),
        ));
        stages.push(Stage::announce(GRAPH_DONE));

        Self {
            name: "graph",
            stages,
        }
    }

    /// Renders the pipeline as one `&&`-chained shell command
    pub fn to_shell_command(&self) -> String {
        self.stages
            .iter()
            .map(Stage::to_shell)
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

fn terraform_prelude() -> Vec<Stage> {
    vec![
        Stage::announce("Initializing Terraform..."),
        Stage::exec(Invocation::new("terraform", ["init"])),
        Stage::announce("Validating configuration..."),
        Stage::exec(Invocation::new("terraform", ["validate"])),
    ]
}

/// Quotes a word for POSIX `sh` unless it only holds safe characters
fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));

    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
