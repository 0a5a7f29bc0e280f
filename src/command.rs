use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::contract::{CommandOutput, CommandRunner, CommandSpec};

/// Spawns real child processes and waits for them to exit.
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }
        debug!(program = %spec.program, args = ?spec.args, cwd = ?spec.cwd, "Spawning command");

        let output = match command.output().await {
            Ok(output) => output,
            Err(e) => {
                error!(error = ?e, program = %spec.program, "Failed to launch process");
                return Err(e);
            }
        };

        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if result.success {
            info!(program = %spec.program, status = ?output.status, "Command finished");
        } else {
            error!(
                program = %spec.program,
                args = ?spec.args,
                stderr = %result.stderr.trim_end(),
                "Command exited with non-zero code: {}", output.status
            );
        }
        Ok(result)
    }
}
