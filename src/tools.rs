//! External annotation tools: feature normalization and structural comparison.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Error;

/// Output prefix handed to the comparison tool inside its scope directory.
const COMPARE_PREFIX: &str = "cmp";

/// Normalization and comparison capabilities the reconciliation engine needs.
pub trait ExternalTool {
    /// Rewrite `input` into canonical transcript-block form at `output`.
    fn normalize(&self, input: &Path, output: &Path) -> Result<(), Error>;

    /// Compare `query` against `reference`, writing into `scope_dir`.
    /// Returns the path of the transcript-tracking file.
    fn compare(&self, query: &Path, reference: &Path, scope_dir: &Path) -> Result<PathBuf, Error>;
}

/// `gffread` / `gffcompare` executables run as subprocesses.
#[derive(Debug, Clone)]
pub struct GffTools {
    gffread: PathBuf,
    gffcompare: PathBuf,
}

impl GffTools {
    #[must_use]
    pub fn new(gffread: &Path, gffcompare: &Path) -> Self {
        Self {
            gffread: gffread.to_path_buf(),
            gffcompare: gffcompare.to_path_buf(),
        }
    }

    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.gffread, &config.gffcompare)
    }
}

/// Run a tool to completion; a launch failure or non-zero exit becomes
/// `ExternalToolFailure` carrying the captured stderr.
fn run_tool(tool: &str, program: &Path, args: &[&OsStr]) -> Result<(), Error> {
    debug!(tool, program = %program.display(), ?args, "running external tool");
    let output = Command::new(program).args(args).output().map_err(|e| {
        let status = if e.kind() == ErrorKind::NotFound {
            "not found".to_string()
        } else {
            "could not start".to_string()
        };
        Error::ExternalToolFailure {
            tool: tool.to_string(),
            status,
            stderr: format!("{}: {e}", program.display()),
        }
    })?;

    if !output.status.success() {
        return Err(Error::ExternalToolFailure {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn require_output(tool: &str, path: &Path) -> Result<(), Error> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::ExternalToolFailure {
            tool: tool.to_string(),
            status: "no output".to_string(),
            stderr: format!("expected {}", path.display()),
        })
    }
}

impl ExternalTool for GffTools {
    fn normalize(&self, input: &Path, output: &Path) -> Result<(), Error> {
        run_tool(
            "gffread",
            &self.gffread,
            &[
                input.as_os_str(),
                OsStr::new("-T"),
                OsStr::new("-F"),
                OsStr::new("-o"),
                output.as_os_str(),
            ],
        )?;
        require_output("gffread", output)?;
        info!(input = %input.display(), "annotation normalized");
        Ok(())
    }

    fn compare(&self, query: &Path, reference: &Path, scope_dir: &Path) -> Result<PathBuf, Error> {
        let prefix = scope_dir.join(COMPARE_PREFIX);
        run_tool(
            "gffcompare",
            &self.gffcompare,
            &[
                OsStr::new("-r"),
                reference.as_os_str(),
                OsStr::new("-o"),
                prefix.as_os_str(),
                query.as_os_str(),
            ],
        )?;
        let tracking = scope_dir.join(format!("{COMPARE_PREFIX}.tracking"));
        require_output("gffcompare", &tracking)?;
        Ok(tracking)
    }
}
