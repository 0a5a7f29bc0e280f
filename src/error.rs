//! Error taxonomy for the export → typeset → publish pipeline.
//!
//! Every stage owns one error type. [`PipelineError`] wraps the stage errors so the
//! orchestrator can turn any of them into the `"ERROR: <cause>"` status it records.

use std::path::PathBuf;
use thiserror::Error;

/// Revision metadata could not be queried.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("{program} could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed: {code} {output}")]
    CommandFailed {
        program: String,
        code: i32,
        output: String,
    },

    #[error("{program} returned {lines} lines of output, expected at least {expected}")]
    InsufficientOutput {
        program: String,
        lines: usize,
        expected: usize,
    },

    #[error("svn log output could not be parsed: {0}")]
    MalformedLog(String),

    #[error("svn log returned no entry for revision {0}")]
    MissingEntry(String),
}

/// The revision-pinned export failed.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to export sources. Giving up.")]
    CommandFailed,

    #[error("Failed to prepare working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The typesetting toolchain did not produce the document.
#[derive(Error, Debug)]
#[error("Build failed.")]
pub struct BuildError;

/// The finished artifact could not be moved into the publish directory.
#[derive(Error, Debug)]
#[error("Failed to publish {from} to {to}: {source}")]
pub struct PublishError {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Removing the working directory failed. Never raised, only logged.
#[derive(Error, Debug)]
#[error("Could not remove working directory {path}: {source}")]
pub struct CleanupWarning {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Error, Debug)]
pub enum RunLogError {
    #[error("Run log {0} is not writable")]
    NotWritable(PathBuf),

    #[error("Run log I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Run log {path} is not a valid document: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Run record could not be serialized: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unterminated tag starting at byte {0}")]
    Unterminated(usize),

    #[error("Unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("Unknown record field `{0}`")]
    UnknownField(String),

    #[error("Unknown loop collection `{0}`")]
    UnknownCollection(String),

    #[error("`$endfor$` without a matching `$for(...)$`")]
    UnexpectedEndFor,

    #[error("`$for({0})$` is never closed")]
    UnclosedFor(String),

    #[error("Nested `$for$` loops are not supported")]
    NestedFor,

    #[error("Template {path} could not be read: {message}")]
    Read { path: PathBuf, message: String },
}

/// Any failure that moves the orchestrator into its FAILED state.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
