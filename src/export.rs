use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::contract::{CommandRunner, CommandSpec};
use crate::error::{CleanupWarning, ExportError};
use crate::revision::Revision;

/// Materializes a clean `svn export` of one revision inside a scratch directory it owns.
///
/// The working directory is wiped before every export and removed again by
/// [`SvnExporter::cleanup`], which is safe to call any number of times.
pub struct SvnExporter {
    runner: Arc<dyn CommandRunner>,
    program: String,
    repository_url: String,
    workdir: PathBuf,
}

impl SvnExporter {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        repository_url: impl Into<String>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            repository_url: repository_url.into(),
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// `svn export -r <revision> <url>` into a freshly created working directory.
    pub async fn export(&self, revision: &Revision) -> Result<(), ExportError> {
        self.cleanup();

        if let Err(e) = fs::create_dir_all(&self.workdir) {
            tracing::error!(
                error = ?e,
                path = %self.workdir.display(),
                "Failed to create working directory"
            );
            return Err(ExportError::WorkDir {
                path: self.workdir.clone(),
                source: e,
            });
        }
        tracing::debug!(path = %self.workdir.display(), "Created working directory");

        let spec = CommandSpec::new(&self.program)
            .arg("export")
            .arg("-r")
            .arg(revision.to_string())
            .arg(&self.repository_url)
            .current_dir(&self.workdir);

        match self.runner.run(&spec).await {
            Ok(out) if out.success => {
                tracing::info!(
                    repository_url = %self.repository_url,
                    revision = %revision,
                    path = %self.workdir.display(),
                    "Exported sources"
                );
                Ok(())
            }
            Ok(out) => {
                tracing::error!(
                    repository_url = %self.repository_url,
                    revision = %revision,
                    path = %self.workdir.display(),
                    stderr = %out.stderr.trim_end(),
                    "svn export exited with non-zero code: {:?}", out.code
                );
                Err(ExportError::CommandFailed)
            }
            Err(e) => {
                tracing::error!(
                    error = ?e,
                    repository_url = %self.repository_url,
                    revision = %revision,
                    "Failed to launch svn export"
                );
                Err(ExportError::CommandFailed)
            }
        }
    }

    /// Remove the working directory and everything under it. Errors are logged, never raised.
    pub fn cleanup(&self) {
        match self.try_cleanup() {
            Ok(true) => tracing::info!(path = %self.workdir.display(), "cleaned up"),
            Ok(false) => tracing::debug!(path = %self.workdir.display(), "nothing to clean up"),
            Err(warning) => tracing::warn!(error = %warning, "Cleanup left the working directory behind"),
        }
    }

    /// Returns whether anything was removed.
    pub fn try_cleanup(&self) -> Result<bool, CleanupWarning> {
        match fs::remove_dir_all(&self.workdir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CleanupWarning {
                path: self.workdir.clone(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{CommandOutput, MockCommandRunner};

    fn exporter(runner: MockCommandRunner, workdir: &Path) -> SvnExporter {
        SvnExporter::new(
            Arc::new(runner),
            "svn",
            "https://svn.example.org/onspot/trunk/",
            workdir,
        )
    }

    #[test]
    fn cleanup_without_export_is_harmless() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("temp");
        let exporter = exporter(MockCommandRunner::new(), &workdir);

        exporter.cleanup();
        exporter.cleanup();
        assert!(!workdir.exists());
        assert!(!exporter.try_cleanup().unwrap());
    }

    #[tokio::test]
    async fn export_replaces_stale_contents_and_runs_in_workdir() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("temp");
        fs::create_dir_all(workdir.join("stale")).unwrap();
        fs::write(workdir.join("stale").join("old.tex"), "old").unwrap();

        let expected_dir = workdir.clone();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(move |spec: &CommandSpec| {
                spec.program == "svn"
                    && spec.args
                        == ["export", "-r", "42", "https://svn.example.org/onspot/trunk/"]
                    && spec.cwd.as_deref() == Some(expected_dir.as_path())
            })
            .times(1)
            .returning(|spec| {
                let dir = spec.cwd.clone().unwrap().join("trunk");
                fs::create_dir_all(&dir).unwrap();
                Ok(CommandOutput::ok(""))
            });

        let exporter = exporter(runner, &workdir);
        exporter.export(&Revision::Number(42)).await.unwrap();

        assert!(workdir.join("trunk").is_dir());
        assert!(!workdir.join("stale").exists());

        exporter.cleanup();
        assert!(!workdir.exists());
    }

    #[tokio::test]
    async fn failed_export_reports_and_still_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("temp");
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(CommandOutput::failed(1, "svn: E170000: URL doesn't exist")));

        let exporter = exporter(runner, &workdir);
        let err = exporter.export(&Revision::head()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to export sources. Giving up.");

        exporter.cleanup();
        assert!(!workdir.exists());
    }
}
