//! Command-line interface: argument parsing and routing to the pipeline.
//!
//! All business logic lives in the library modules; this module only loads the
//! configuration, invokes [`Pipeline`] or [`RunLog`], and prints the rendered history.
use crate::load_config::load_config;
use crate::pipeline::{Pipeline, RunRequest};
use crate::run_log::RunLog;
use crate::template::Template;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// CLI for svntex: typeset and publish a report from a Subversion revision.
#[derive(Parser)]
#[clap(
    name = "svntex",
    version,
    about = "Export a Subversion revision, build its LaTeX report and publish the PDF"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export, typeset and publish one revision, then print the full run history
    Run {
        /// Local repository path; enables svnlook for numeric revisions
        repository_path: Option<PathBuf>,
        /// Revision number or alias
        revision: Option<String>,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Print the run history without running the pipeline
    Render {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run {
            repository_path,
            revision,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let request = RunRequest::new(repository_path, revision.as_deref());
            let pipeline = Pipeline::with_system_runner(config);
            tracing::info!(command = "run", revision = %request.revision, "Starting run");

            let outcome = pipeline.run(&request).await?;
            tracing::info!(
                command = "run",
                status = %outcome.record.status,
                file = %outcome.record.file,
                "Run complete"
            );
            print_history(&outcome.log, &pipeline.config().template_path())
        }
        Commands::Render { config } => {
            let config = load_config(config.as_deref())?;
            let log = RunLog::load(config.log_path())?;
            print_history(&log, &config.template_path())
        }
    }
}

fn print_history(log: &RunLog, template_path: &Path) -> Result<()> {
    let template = Template::load_or_default(template_path)?;
    println!("{}", log.render(&template));
    Ok(())
}
