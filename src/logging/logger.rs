//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{DRY_RUN_TARGET, Log, STAGE_TARGET, TaskEntry, TaskStatus};
use super::utils::{log_file_path, terminal_columns};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// All messages are also written to a persistent log file at
/// `$XDG_CACHE_HOME/dotdeploy/<command>.log` with timestamps and ANSI codes
/// stripped, regardless of the verbose flag (see the file layer installed by
/// [`init_subscriber`](super::subscriber::init_subscriber)).
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary. The file
    /// itself is created and initialised by
    /// [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a task result for the summary.
    pub fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Whether any recorded task failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.tasks.lock().is_ok_and(|tasks| {
            tasks
                .iter()
                .any(|task| task.status == TaskStatus::Failed)
        })
    }

    /// Print the summary of all recorded tasks.
    pub fn print_summary(&self) {
        let Ok(tasks) = self.tasks.lock() else {
            return;
        };
        if tasks.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut ok = 0u32;
        let mut up_to_date = 0u32;
        let mut skipped = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        let width = terminal_columns();
        for task in tasks.iter() {
            let (icon, color) = match task.status {
                TaskStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                TaskStatus::UpToDate => {
                    up_to_date += 1;
                    ("·", "\x1b[2m")
                }
                TaskStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                TaskStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[33m")
                }
                TaskStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = match &task.message {
                Some(msg) => format!(" ({msg})"),
                None => String::new(),
            };

            let mut line = format!("{icon} {}{suffix}", task.name);
            if line.chars().count() > width {
                line = line.chars().take(width.saturating_sub(1)).collect();
                line.push('…');
            }
            self.info(&format!("{color}{line}\x1b[0m"));
        }

        let total = ok + up_to_date + skipped + dry_run + failed;
        self.info(&format!(
            "{total} tasks: \x1b[32m{ok} ok\x1b[0m, {up_to_date} up-to-date, \
             \x1b[33m{skipped} skipped\x1b[0m, {dry_run} dry-run, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.record_task(name, status, message);
    }
}
