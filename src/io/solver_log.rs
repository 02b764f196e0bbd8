//! Append-only text logs written by the drivers.
//!
//! # Convergence history (`<log_file>.conv`)
//!
//! ```text
//! 1 1
//! 2 0.8123
//! 3 0.6071
//! ```
//!
//! One `step relative_residual` line per nonlinear iteration.
//!
//! # Run summary (`<log_file>`)
//!
//! Explicit and unsteady drivers append `\tthreads\twall\tcpu`. The implicit
//! driver appends `cells threads lin_wall lin_cpu avg_lin_iters steps` in
//! fixed-width columns. Files are opened in append mode on every `solve`, so
//! repeated runs accumulate.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::timing::RunTimes;

/// Error type for solver log output.
#[derive(Debug, Error)]
pub enum LogError {
    /// I/O error while opening or writing a log
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LogError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        LogError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Path of the convergence history belonging to a run log.
pub fn convergence_log_path(log_file: &Path) -> PathBuf {
    let mut s = log_file.as_os_str().to_owned();
    s.push(".conv");
    PathBuf::from(s)
}

fn open_append(path: &Path) -> Result<File, LogError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LogError::io(path, e))
}

// =============================================================================
// Convergence history
// =============================================================================

/// Buffered writer for the per-iteration convergence history.
pub struct ConvergenceLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ConvergenceLog {
    /// Open `<log_file>.conv` for appending.
    pub fn open(log_file: &Path) -> Result<Self, LogError> {
        let path = convergence_log_path(log_file);
        let file = open_append(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Append one `step relative_residual` line.
    pub fn record(&mut self, step: usize, relative_residual: f64) -> Result<(), LogError> {
        writeln!(self.writer, "{step} {relative_residual:>10e}")
            .map_err(|e| LogError::io(&self.path, e))
    }

    /// Flush buffered lines to disk.
    pub fn finish(mut self) -> Result<(), LogError> {
        self.writer.flush().map_err(|e| LogError::io(&self.path, e))
    }
}

// =============================================================================
// Run summaries
// =============================================================================

/// Summary of one implicit solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImplicitRunSummary {
    pub n_cells: usize,
    pub threads: usize,
    pub linear: RunTimes,
    pub average_linear_iterations: f64,
    pub steps: usize,
}

/// Write the explicit/unsteady summary line.
pub fn write_timing_line<W: Write>(
    w: &mut W,
    threads: usize,
    times: RunTimes,
) -> std::io::Result<()> {
    writeln!(w, "\t{}\t{}\t{}", threads, times.wall, times.cpu)
}

/// Write the implicit summary line.
pub fn write_implicit_line<W: Write>(
    w: &mut W,
    summary: &ImplicitRunSummary,
) -> std::io::Result<()> {
    writeln!(
        w,
        "{:>10} {:>6} {:>10.4e} {:>10.4e} {:>10.4} {:>10}",
        summary.n_cells,
        summary.threads,
        summary.linear.wall,
        summary.linear.cpu,
        summary.average_linear_iterations,
        summary.steps
    )
}

/// Append an explicit/unsteady summary line to `log_file`.
pub fn append_timing_summary(
    log_file: &Path,
    threads: usize,
    times: RunTimes,
) -> Result<(), LogError> {
    let mut f = open_append(log_file)?;
    write_timing_line(&mut f, threads, times).map_err(|e| LogError::io(log_file, e))
}

/// Append an implicit summary line to `log_file`.
pub fn append_implicit_summary(
    log_file: &Path,
    summary: &ImplicitRunSummary,
) -> Result<(), LogError> {
    let mut f = open_append(log_file)?;
    write_implicit_line(&mut f, summary).map_err(|e| LogError::io(log_file, e))
}

/// Worker threads available to data-parallel loops.
pub fn thread_count() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}
