//! Tracing subscriber setup: event classification, console format, file layer.
//!
//! Every event is classified once into an [`EventKind`] from its level and
//! target, and both output backends render from that classification: the
//! console layer with color, the file layer as plain timestamped text. This
//! keeps the two renderings of one event from drifting apart.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use super::color;
use super::types::{DRY_RUN_TARGET, STAGE_TARGET};
use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// What an event means to dotdeploy's output, independent of backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    /// Major section of a run, emitted via [`Logger::stage`](super::Logger::stage).
    Stage,
    /// Announcement of an action suppressed by `--dry-run`.
    DryRun,
    Error,
    Warn,
    Info,
    /// Debug and below; console shows these only with `--verbose`.
    Detail,
}

impl EventKind {
    fn classify(level: tracing::Level, target: &str) -> Self {
        match level {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::INFO if target == STAGE_TARGET => Self::Stage,
            tracing::Level::INFO if target == DRY_RUN_TARGET => Self::DryRun,
            tracing::Level::INFO => Self::Info,
            _ => Self::Detail,
        }
    }

    /// Colored console rendering of one event.
    fn console_line(self, msg: &str) -> String {
        match self {
            Self::Stage => format!(
                "{} {}",
                color::fmt("==>", Some("blue"), Some("bold")),
                color::fmt(msg, None, Some("bold"))
            ),
            Self::DryRun => {
                format!("  {} {msg}", color::fmt("[DRY RUN]", Some("yellow"), None))
            }
            Self::Error => format!("{} {msg}", color::fmt("ERROR", Some("red"), None)),
            Self::Warn => format!("{}  {msg}", color::fmt("WARN", Some("yellow"), None)),
            Self::Info => format!("  {msg}"),
            Self::Detail => format!("  {}", color::fmt(msg, None, Some("faint"))),
        }
    }

    /// Plain timestamped rendering for the persistent log file. `msg` must
    /// already have ANSI codes stripped.
    fn file_line(self, ts: &str, msg: &str) -> String {
        match self {
            Self::Stage => format!("[{ts}] ==> {msg}"),
            Self::DryRun => format!("[{ts}]     [dry run] {msg}"),
            Self::Error => format!("[{ts}]     [error] {msg}"),
            Self::Warn => format!("[{ts}]     [warn] {msg}"),
            Self::Info => format!("[{ts}]     {msg}"),
            Self::Detail => format!("[{ts}]     [debug] {msg}"),
        }
    }
}

/// Pull the `message` field out of a [`tracing::Event`].
fn event_message(event: &tracing::Event<'_>) -> String {
    struct MessageVisitor(Option<String>);

    impl tracing::field::Visit for MessageVisitor {
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            if field.name() == "message" {
                self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" && self.0.is_none() {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    let mut visitor = MessageVisitor(None);
    event.record(&mut visitor);
    visitor.0.unwrap_or_default()
}

/// A [`tracing_subscriber::Layer`] that appends every event to the persistent
/// log file. Captures `DEBUG` and above regardless of console verbosity, so
/// the file is the full record of a run.
#[derive(Debug)]
struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log file for `command`, write a run header, and return a
    /// layer appending to it. `None` if the cache directory or file cannot
    /// be created.
    fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("DOTDEPLOY_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "dotdeploy {version} ({command}) started {}\n\
             ------------------------------------------\n",
            format_utc_datetime(),
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let kind = EventKind::classify(*metadata.level(), metadata.target());
        let msg = strip_ansi(&event_message(event));
        let line = kind.file_line(&format_utc_time(), &msg);

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// Console event format built on [`EventKind::console_line`].
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let kind = EventKind::classify(*metadata.level(), metadata.target());
        writeln!(writer, "{}", kind.console_line(&event_message(event)))
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Log events render to stderr, keeping stdout free for command output
/// (diffs, `show` dumps, generated completions). A file layer additionally
/// writes all events, `debug` included, to
/// `$XDG_CACHE_HOME/dotdeploy/<command>.log`.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(std::io::stderr)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stage_and_dry_run_classify_by_target() {
        assert_eq!(
            EventKind::classify(tracing::Level::INFO, STAGE_TARGET),
            EventKind::Stage
        );
        assert_eq!(
            EventKind::classify(tracing::Level::INFO, DRY_RUN_TARGET),
            EventKind::DryRun
        );
        assert_eq!(
            EventKind::classify(tracing::Level::INFO, "dotdeploy::plugins"),
            EventKind::Info
        );
    }

    #[test]
    fn levels_classify_regardless_of_target() {
        assert_eq!(
            EventKind::classify(tracing::Level::ERROR, STAGE_TARGET),
            EventKind::Error
        );
        assert_eq!(
            EventKind::classify(tracing::Level::WARN, "anything"),
            EventKind::Warn
        );
        assert_eq!(
            EventKind::classify(tracing::Level::DEBUG, "anything"),
            EventKind::Detail
        );
        assert_eq!(
            EventKind::classify(tracing::Level::TRACE, "anything"),
            EventKind::Detail
        );
    }

    #[test]
    fn file_lines_are_plain_text() {
        assert_eq!(
            EventKind::Stage.file_line("12:00:00", "Applying plugins"),
            "[12:00:00] ==> Applying plugins"
        );
        assert_eq!(
            EventKind::DryRun.file_line("12:00:01", "copy .bashrc"),
            "[12:00:01]     [dry run] copy .bashrc"
        );
        assert_eq!(
            EventKind::Error.file_line("12:00:02", "boom"),
            "[12:00:02]     [error] boom"
        );
    }

    #[test]
    fn console_lines_color_stage_and_leave_info_plain() {
        let line = EventKind::Stage.console_line("Planning");
        assert!(line.contains("==>"));
        assert!(line.contains("Planning"));
        assert_eq!(strip_ansi(&line), "==> Planning");

        let plain = EventKind::Info.console_line("two files");
        assert_eq!(plain, "  two files");
    }
}
