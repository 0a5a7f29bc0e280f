#![allow(unused)]

//! # contract: seams between the pipeline and the outside world
//!
//! The pipeline never spawns a process or queries a repository directly. It talks to
//! two traits:
//!
//! - [`CommandRunner`] runs one external program to completion and reports its outcome.
//!   The production implementation is [`crate::command::SystemCommandRunner`].
//! - [`MetadataFetcher`] resolves a revision to its author and log message. The two
//!   implementations live in [`crate::metadata`].
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so tests can script command outcomes
//!   without `svn` or `latexmk` installed.

use std::path::PathBuf;

use async_trait::async_trait;
use mockall::{automock, predicate::*};

use crate::error::MetadataError;
use crate::revision::{Revision, RevisionMetadata};

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child; `None` inherits the caller's.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit code, `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs external programs to completion. No timeout: the caller waits until the child exits.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` and wait for it. `Err` only when the program could not be started.
    async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// Resolves a revision (number or alias) into [`RevisionMetadata`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Short name of the strategy, used for narration and tracing.
    fn name(&self) -> &'static str;

    async fn fetch(&self, revision: &Revision) -> Result<RevisionMetadata, MetadataError>;
}
