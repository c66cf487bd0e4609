//! Debugging feature flags.

pub struct LogFlags {
    /// Row counts, duplicate overwrites and axis/entity sizes from the pivot.
    pub log_pivot: bool,

    /// Per-anchor skip reasons while windowing (very chatty on big tables).
    pub log_windows: bool,

    pub log_evaluation: bool,

    /// Activate trace_time macro (for cool scope-level timing)
    pub log_performance: bool,
}

pub const LOG_FLAGS: LogFlags = LogFlags {
    log_pivot: true,
    log_windows: false,
    log_evaluation: true,
    log_performance: false,
};
