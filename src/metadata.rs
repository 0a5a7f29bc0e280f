//! Revision metadata lookup.
//!
//! Two interchangeable strategies implement [`MetadataFetcher`]:
//! - [`SvnLookFetcher`] runs `svnlook info` against a local repository. It needs a
//!   concrete revision number.
//! - [`SvnLogFetcher`] runs `svn log --xml` against the repository URL and lets the
//!   server resolve aliases such as `HEAD`.
//!
//! [`select_strategy`] picks one from the shape of the command-line arguments.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::contract::{CommandOutput, CommandRunner, CommandSpec, MetadataFetcher};
use crate::error::MetadataError;
use crate::revision::{Revision, RevisionMetadata};

/// `svnlook info` prints author, date, log size and then the message.
const SVNLOOK_MIN_LINES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStrategy {
    /// Query the repository on local disk.
    Local(PathBuf),
    /// Query the repository URL.
    Remote,
}

/// Local only when a repository path was supplied and the revision is a plain number.
pub fn select_strategy(repository_path: Option<&Path>, revision: &Revision) -> MetadataStrategy {
    match repository_path {
        Some(path) if revision.is_number() => MetadataStrategy::Local(path.to_path_buf()),
        _ => MetadataStrategy::Remote,
    }
}

/// Build the fetcher for `strategy`.
pub fn fetcher_for(
    strategy: MetadataStrategy,
    runner: Arc<dyn CommandRunner>,
    svnlook: &str,
    svn: &str,
    repository_url: &str,
) -> Box<dyn MetadataFetcher> {
    match strategy {
        MetadataStrategy::Local(path) => Box::new(SvnLookFetcher::new(runner, svnlook, path)),
        MetadataStrategy::Remote => Box::new(SvnLogFetcher::new(runner, svn, repository_url)),
    }
}

async fn run_query(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<CommandOutput, MetadataError> {
    let output = runner.run(spec).await.map_err(|e| MetadataError::Spawn {
        program: spec.program.clone(),
        source: e,
    })?;
    if !output.success {
        return Err(MetadataError::CommandFailed {
            program: spec.program.clone(),
            code: output.code.unwrap_or(-1),
            output: format!("{}{}", output.stdout, output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

pub struct SvnLookFetcher {
    runner: Arc<dyn CommandRunner>,
    program: String,
    repository_path: PathBuf,
}

impl SvnLookFetcher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        repository_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            repository_path: repository_path.into(),
        }
    }
}

#[async_trait]
impl MetadataFetcher for SvnLookFetcher {
    fn name(&self) -> &'static str {
        "svnlook"
    }

    async fn fetch(&self, revision: &Revision) -> Result<RevisionMetadata, MetadataError> {
        let spec = CommandSpec::new(&self.program)
            .arg("info")
            .arg("-r")
            .arg(revision.to_string())
            .arg(self.repository_path.display().to_string());
        info!(
            revision = %revision,
            repository_path = %self.repository_path.display(),
            "Querying local repository for revision info"
        );
        let output = run_query(self.runner.as_ref(), &spec).await?;
        parse_svnlook_info(&self.program, &output.stdout, revision.clone())
    }
}

fn parse_svnlook_info(
    program: &str,
    stdout: &str,
    revision: Revision,
) -> Result<RevisionMetadata, MetadataError> {
    let lines: Vec<&str> = stdout.lines().collect();
    if lines.len() < SVNLOOK_MIN_LINES {
        error!(lines = lines.len(), "svnlook info returned too little output");
        return Err(MetadataError::InsufficientOutput {
            program: program.to_string(),
            lines: lines.len(),
            expected: SVNLOOK_MIN_LINES,
        });
    }
    Ok(RevisionMetadata {
        author: lines[0].to_string(),
        revision,
        message: lines[3].to_string(),
    })
}

pub struct SvnLogFetcher {
    runner: Arc<dyn CommandRunner>,
    program: String,
    repository_url: String,
}

impl SvnLogFetcher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        repository_url: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            repository_url: repository_url.into(),
        }
    }
}

#[async_trait]
impl MetadataFetcher for SvnLogFetcher {
    fn name(&self) -> &'static str {
        "svn log"
    }

    async fn fetch(&self, revision: &Revision) -> Result<RevisionMetadata, MetadataError> {
        let spec = CommandSpec::new(&self.program)
            .arg("log")
            .arg("-r")
            .arg(revision.to_string())
            .arg("--xml")
            .arg(&self.repository_url);
        info!(
            revision = %revision,
            repository_url = %self.repository_url,
            "Querying remote log for revision info"
        );
        let output = run_query(self.runner.as_ref(), &spec).await?;
        let metadata = parse_svn_log_xml(&output.stdout, revision)?;
        debug!(?metadata, "Resolved revision metadata");
        Ok(metadata)
    }
}

#[derive(Debug, Deserialize)]
struct SvnLog {
    #[serde(rename = "logentry", default)]
    entries: Vec<SvnLogEntry>,
}

#[derive(Debug, Deserialize)]
struct SvnLogEntry {
    #[serde(rename = "@revision")]
    revision: u64,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

fn parse_svn_log_xml(xml: &str, requested: &Revision) -> Result<RevisionMetadata, MetadataError> {
    let log: SvnLog = quick_xml::de::from_str(xml).map_err(|e| {
        error!(error = ?e, "Failed to parse svn log XML");
        MetadataError::MalformedLog(e.to_string())
    })?;
    let entry = log
        .entries
        .into_iter()
        .next()
        .ok_or_else(|| MetadataError::MissingEntry(requested.to_string()))?;
    Ok(RevisionMetadata {
        author: entry.author.unwrap_or_default(),
        revision: Revision::Number(entry.revision),
        message: entry.msg.unwrap_or_default(),
    })
}
