use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::contract::{CommandRunner, CommandSpec};
use crate::error::BuildError;

/// Runs `latexmk -pdf <target>` inside the exported document directory.
pub struct LatexBuilder {
    runner: Arc<dyn CommandRunner>,
    program: String,
    document_dir: PathBuf,
    target: String,
}

impl LatexBuilder {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        document_dir: impl Into<PathBuf>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            document_dir: document_dir.into(),
            target: target.into(),
        }
    }

    pub fn document_dir(&self) -> &Path {
        &self.document_dir
    }

    pub async fn build(&self) -> Result<(), BuildError> {
        let spec = CommandSpec::new(&self.program)
            .arg("-pdf")
            .arg(&self.target)
            .current_dir(&self.document_dir);
        info!(dir = %self.document_dir.display(), target = %self.target, "Typesetting document");

        match self.runner.run(&spec).await {
            Ok(out) if out.success => Ok(()),
            Ok(out) => {
                error!(code = ?out.code, target = %self.target, "Typesetting failed");
                Err(BuildError)
            }
            Err(e) => {
                error!(error = ?e, program = %self.program, "Failed to launch typesetter");
                Err(BuildError)
            }
        }
    }

    /// Where a successful build leaves the PDF. Computed, not looked up.
    pub fn output_path(&self) -> PathBuf {
        self.document_dir.join(format!("{}.pdf", self.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{CommandOutput, MockCommandRunner};

    #[test]
    fn output_path_is_deterministic() {
        let builder = LatexBuilder::new(
            Arc::new(MockCommandRunner::new()),
            "latexmk",
            "/tmp/svntex/temp/trunk/report",
            "report",
        );
        assert_eq!(
            builder.output_path(),
            PathBuf::from("/tmp/svntex/temp/trunk/report/report.pdf")
        );
    }

    #[tokio::test]
    async fn build_invokes_latexmk_in_document_dir() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec: &CommandSpec| {
                spec.program == "latexmk"
                    && spec.args == ["-pdf", "report"]
                    && spec.cwd.as_deref() == Some(Path::new("/work/trunk/report"))
            })
            .times(1)
            .returning(|_| Ok(CommandOutput::ok("Latexmk: All targets are up-to-date")));

        let builder = LatexBuilder::new(Arc::new(runner), "latexmk", "/work/trunk/report", "report");
        assert!(builder.build().await.is_ok());
    }

    #[tokio::test]
    async fn nonzero_exit_is_build_error() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(CommandOutput::failed(12, "! Undefined control sequence.")));

        let builder = LatexBuilder::new(Arc::new(runner), "latexmk", "/work", "report");
        let err = builder.build().await.unwrap_err();
        assert_eq!(err.to_string(), "Build failed.");
    }
}
