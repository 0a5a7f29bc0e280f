use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_REPOSITORY_URL: &str = "https://svn.micheljansen.org/onspot/trunk/";
pub const DEFAULT_ROOT_PATH: &str = "/home/dawuss/svntex";
pub const DEFAULT_PUBLISH_DIR: &str = "/home/dawuss/public_html/onspot";

const WORKDIR_NAME: &str = "temp";
const LOG_FILE_NAME: &str = "entries_db.yaml";
const TEMPLATE_FILE_NAME: &str = "template.html";

/// Everything the pipeline needs to know about where things live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository URL exported from and queried by `svn log`.
    pub repository_url: String,
    /// Holds the scratch directory, the run log and its template.
    pub root_path: PathBuf,
    /// Where finished PDFs are published.
    pub publish_dir: PathBuf,
    /// Document directory relative to the export, e.g. `trunk/report`.
    pub document_subdir: PathBuf,
    /// LaTeX target name; the artifact is `<target_name>.pdf`.
    pub target_name: String,
    /// Presentation template; defaults to `<root_path>/template.html`.
    pub template_path: Option<PathBuf>,
    pub tools: ToolsConfig,
}

/// External program names, resolved through `PATH` unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub svn: String,
    pub svnlook: String,
    pub latexmk: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            svn: "svn".to_string(),
            svnlook: "svnlook".to_string(),
            latexmk: "latexmk".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            root_path: PathBuf::from(DEFAULT_ROOT_PATH),
            publish_dir: PathBuf::from(DEFAULT_PUBLISH_DIR),
            document_subdir: PathBuf::from("trunk").join("report"),
            target_name: "report".to_string(),
            template_path: None,
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    pub fn workdir(&self) -> PathBuf {
        self.root_path.join(WORKDIR_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root_path.join(LOG_FILE_NAME)
    }

    pub fn template_path(&self) -> PathBuf {
        self.template_path
            .clone()
            .unwrap_or_else(|| self.root_path.join(TEMPLATE_FILE_NAME))
    }

    pub fn document_dir(&self) -> PathBuf {
        self.workdir().join(&self.document_subdir)
    }

    pub fn trace_loaded(&self) {
        info!(
            repository_url = %self.repository_url,
            root_path = %self.root_path.display(),
            publish_dir = %self.publish_dir.display(),
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}
