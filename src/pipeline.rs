//! Orchestration of one run: metadata → export → typeset → publish, then cleanup and logging.
//!
//! The run moves through [`Stage`]s in order. The first error ends the run in the FAILED
//! state with its stage recorded; success ends in DONE. Either way the working directory is
//! removed and exactly one [`RunRecord`] is appended to the run log.
//!
//! Only a run log failure escapes [`Pipeline::run`]; every stage error becomes an
//! `"ERROR: <cause>"` status instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::command::SystemCommandRunner;
use crate::config::Config;
use crate::contract::{CommandRunner, MetadataFetcher};
use crate::error::{PipelineError, PublishError, RunLogError};
use crate::export::SvnExporter;
use crate::metadata::{fetcher_for, select_strategy};
use crate::revision::{Revision, RevisionMetadata};
use crate::run_log::{error_status, RunLog, RunRecord, STATUS_OK};
use crate::typeset::LatexBuilder;

/// Name of the published PDF for `revision`.
pub fn artifact_name(revision: &Revision) -> String {
    format!("report-{revision}.pdf")
}

/// What the caller asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Local repository, enables the `svnlook` strategy for numeric revisions.
    pub repository_path: Option<PathBuf>,
    pub revision: Revision,
}

impl RunRequest {
    pub fn new(repository_path: Option<PathBuf>, revision: Option<&str>) -> Self {
        Self {
            repository_path,
            revision: revision.map(Revision::parse).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchingMetadata,
    Exporting,
    Building,
    Publishing,
}

#[derive(Debug)]
pub struct RunOutcome {
    /// The record that was appended for this run.
    pub record: RunRecord,
    /// Published artifact, only set when the run reached DONE.
    pub published: Option<PathBuf>,
    /// Stage that failed, `None` on success.
    pub failed_stage: Option<Stage>,
    /// The full history including this run.
    pub log: RunLog,
}

impl RunOutcome {
    pub fn is_ok(&self) -> bool {
        self.failed_stage.is_none()
    }
}

/// Mutable view of the run shared by the stages.
struct RunState {
    metadata: RevisionMetadata,
    /// Requested revision until export succeeds, the resolved one afterwards.
    revision: Revision,
}

pub struct Pipeline {
    config: Config,
    runner: Arc<dyn CommandRunner>,
}

impl Pipeline {
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn with_system_runner(config: Config) -> Self {
        Self::new(config, Arc::new(SystemCommandRunner::new()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The metadata strategy chosen for `request`.
    pub fn fetcher(&self, request: &RunRequest) -> Box<dyn MetadataFetcher> {
        let strategy = select_strategy(request.repository_path.as_deref(), &request.revision);
        debug!(?strategy, "Selected metadata strategy");
        fetcher_for(
            strategy,
            self.runner.clone(),
            &self.config.tools.svnlook,
            &self.config.tools.svn,
            &self.config.repository_url,
        )
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunLogError> {
        let fetcher = self.fetcher(request);
        self.run_with_fetcher(request, fetcher.as_ref()).await
    }

    /// Run with an explicit metadata strategy.
    pub async fn run_with_fetcher(
        &self,
        request: &RunRequest,
        fetcher: &dyn MetadataFetcher,
    ) -> Result<RunOutcome, RunLogError> {
        info!(revision = %request.revision, "[RUN] Starting pipeline");
        println!("processing revision {}", request.revision);

        let exporter = SvnExporter::new(
            self.runner.clone(),
            &self.config.tools.svn,
            &self.config.repository_url,
            self.config.workdir(),
        );
        let mut state = RunState {
            metadata: RevisionMetadata::unknown(request.revision.clone()),
            revision: request.revision.clone(),
        };

        let (status, published, failed_stage) =
            match self.execute(fetcher, &exporter, &mut state).await {
                Ok(path) => {
                    info!(path = %path.display(), "[RUN] Published artifact");
                    (STATUS_OK.to_string(), Some(path), None)
                }
                Err((stage, e)) => {
                    error!(?stage, error = %e, "[RUN][ERROR] Pipeline failed");
                    (error_status(&e), None, Some(stage))
                }
            };
        println!("{status}");

        exporter.cleanup();

        let record = RunRecord {
            revision: state.metadata.revision,
            author: state.metadata.author,
            message: state.metadata.message,
            status,
            file: artifact_name(&state.revision),
        };
        let mut log = RunLog::load(self.config.log_path())?;
        log.append(record.clone())?;

        Ok(RunOutcome {
            record,
            published,
            failed_stage,
            log,
        })
    }

    async fn execute(
        &self,
        fetcher: &dyn MetadataFetcher,
        exporter: &SvnExporter,
        state: &mut RunState,
    ) -> Result<PathBuf, (Stage, PipelineError)> {
        println!("getting info...");
        println!("using {}", fetcher.name());
        state.metadata = fetcher
            .fetch(&state.revision)
            .await
            .map_err(|e| (Stage::FetchingMetadata, PipelineError::from(e)))?;
        info!(
            revision = %state.metadata.revision,
            author = %state.metadata.author,
            "[RUN] Fetched revision metadata"
        );

        println!("exporting...");
        exporter
            .export(&state.revision)
            .await
            .map_err(|e| (Stage::Exporting, PipelineError::from(e)))?;
        // aliases such as HEAD are frozen from here on
        state.revision = state.metadata.revision.clone();

        println!("building...");
        let builder = LatexBuilder::new(
            self.runner.clone(),
            &self.config.tools.latexmk,
            self.config.document_dir(),
            &self.config.target_name,
        );
        builder
            .build()
            .await
            .map_err(|e| (Stage::Building, PipelineError::from(e)))?;
        println!("done!");

        let target = self
            .config
            .publish_dir
            .join(artifact_name(&state.revision));
        publish(&builder.output_path(), &target)
            .map_err(|e| (Stage::Publishing, PipelineError::from(e)))?;
        Ok(target)
    }
}

/// Move `from` to `to`, copying when a rename is not possible (e.g. across filesystems).
fn publish(from: &Path, to: &Path) -> Result<(), PublishError> {
    let wrap = |source: std::io::Error| PublishError {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if let Some(dir) = to.parent() {
        fs::create_dir_all(dir).map_err(wrap)?;
    }
    if let Err(e) = fs::rename(from, to) {
        warn!(error = ?e, from = %from.display(), "Rename failed, copying artifact instead");
        fs::copy(from, to).map_err(wrap)?;
        fs::remove_file(from).map_err(wrap)?;
    }
    Ok(())
}
