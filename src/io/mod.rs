//! Log output for the drivers.
//!
//! Console diagnostics go through the `log` facade; the files here are the
//! machine-readable convergence history and run summaries.

mod solver_log;

pub use solver_log::{
    ConvergenceLog, ImplicitRunSummary, LogError, append_implicit_summary, append_timing_summary,
    convergence_log_path, thread_count, write_implicit_line, write_timing_line,
};
