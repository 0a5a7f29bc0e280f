#![doc = "svntex: export a Subversion revision, typeset its LaTeX report and publish the PDF."]

//! Every run goes through the same pipeline (see [`pipeline`]): fetch revision
//! metadata, export the revision into a scratch directory, run `latexmk`, move the PDF to
//! the publish directory. The outcome of every attempt, failed or not, is appended to a
//! YAML run log that renders to a browsable HTML page.

pub mod cli;
pub mod command;
pub mod config;
pub mod contract;
pub mod error;
pub mod export;
pub mod load_config;
pub mod metadata;
pub mod pipeline;
pub mod revision;
pub mod run_log;
pub mod template;
pub mod typeset;

pub use cli::{run, Cli, Commands};
