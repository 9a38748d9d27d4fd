//! External tool boundary: database indexing and alignment.
//!
//! Both tools are driven as blocking subprocesses. The indexer runs to
//! completion before anything else; the aligner's stdout is consumed as a
//! sequential line stream while it runs. A non-zero exit from either tool
//! is an `ExternalToolError`. The child process is reaped on every exit
//! path: `finish()` waits and checks the status, and dropping an
//! unfinished stream (e.g. after a parse error) kills and reaps it.

use log::{debug, info};
use std::io::{self, BufReader};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

#[derive(Debug)]
pub enum ExternalToolError {
    Launch { tool: String, source: io::Error },
    NoOutput { tool: String },
    NonZeroExit { tool: String, code: Option<i32> },
}

impl std::fmt::Display for ExternalToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalToolError::Launch { tool, source } => {
                write!(f, "Failed to launch '{tool}': {source}")
            }
            ExternalToolError::NoOutput { tool } => {
                write!(f, "No stdout handle for '{tool}'")
            }
            ExternalToolError::NonZeroExit { tool, code } => match code {
                Some(code) => write!(f, "'{tool}' exited with status {code}"),
                None => write!(f, "'{tool}' was terminated by a signal"),
            },
        }
    }
}

impl std::error::Error for ExternalToolError {}

impl From<ExternalToolError> for io::Error {
    fn from(e: ExternalToolError) -> Self {
        io::Error::other(e.to_string())
    }
}

/// Build a command from a whitespace-separated template plus trailing
/// arguments, e.g. template `"blat -noHead"` with args `[db, frags]`.
fn build_command(template: &str, args: &[&str]) -> Option<(String, Command)> {
    let mut parts = template.split_whitespace();
    let program = parts.next()?;
    let mut command = Command::new(program);
    command.args(parts).args(args);
    Some((program.to_string(), command))
}

/// Run the database indexer over the assembly and wait for it.
pub fn index_assembly(indexer: &str, assembly: &str) -> Result<(), ExternalToolError> {
    let (tool, mut command) =
        build_command(indexer, &[assembly]).ok_or_else(|| ExternalToolError::Launch {
            tool: indexer.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty indexer command"),
        })?;

    info!("Indexing assembly '{assembly}' with '{tool}'");
    let status = command
        .stdout(Stdio::null())
        .status()
        .map_err(|source| ExternalToolError::Launch {
            tool: tool.clone(),
            source,
        })?;

    if !status.success() {
        return Err(ExternalToolError::NonZeroExit {
            tool,
            code: status.code(),
        });
    }
    Ok(())
}

/// A running aligner whose stdout is read as a record stream.
pub struct AlignerStream {
    tool: String,
    child: Option<Child>,
    reader: Option<BufReader<ChildStdout>>,
}

impl AlignerStream {
    /// Spawn the aligner on (assembly database, fragment file).
    pub fn spawn(
        aligner: &str,
        assembly_db: &str,
        fragments: &Path,
    ) -> Result<Self, ExternalToolError> {
        let fragments = fragments.to_string_lossy();
        let (tool, mut command) = build_command(aligner, &[assembly_db, &fragments])
            .ok_or_else(|| ExternalToolError::Launch {
                tool: aligner.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "empty aligner command"),
            })?;

        debug!("Spawning '{tool}' on {fragments}");
        let mut child = command
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| ExternalToolError::Launch {
                tool: tool.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExternalToolError::NoOutput { tool: tool.clone() })?;

        Ok(AlignerStream {
            tool,
            child: Some(child),
            reader: Some(BufReader::new(stdout)),
        })
    }

    pub fn reader(&mut self) -> &mut BufReader<ChildStdout> {
        self.reader
            .as_mut()
            .unwrap_or_else(|| unreachable!("reader taken only by finish()"))
    }

    /// Drain any remaining output, reap the child and check its status.
    pub fn finish(mut self) -> Result<(), ExternalToolError> {
        let tool = self.tool.clone();

        if let Some(mut reader) = self.reader.take() {
            let _ = io::copy(&mut reader, &mut io::sink());
        }

        let mut child = match self.child.take() {
            Some(child) => child,
            None => return Ok(()),
        };

        let status = child.wait().map_err(|source| ExternalToolError::Launch {
            tool: tool.clone(),
            source,
        })?;

        if !status.success() {
            return Err(ExternalToolError::NonZeroExit {
                tool,
                code: status.code(),
            });
        }
        Ok(())
    }
}

impl Drop for AlignerStream {
    fn drop(&mut self) {
        // abandoned stream (parse error path): kill and reap
        drop(self.reader.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
