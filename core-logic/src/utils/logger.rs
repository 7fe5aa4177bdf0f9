use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// Installs the console + rolling file subscriber.
///
/// The console level follows `RUST_LOG` (default `info`). The file under
/// `logs/` always records `info` and above. The returned guard flushes the
/// file writer on drop and must be kept alive by the caller.
pub fn setup_logger() -> Option<WorkerGuard> {
    std::fs::create_dir_all("logs").ok();

    let file_appender = tracing_appender::rolling::hourly("logs", "starry");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(tracing_subscriber::filter::LevelFilter::INFO);

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

/// Paints `Success`/`SUCCESS` green and `Failed`/`FAILED` red.
fn highlight(msg: String) -> String {
    if msg.contains("SUCCESS") || msg.contains("Success") {
        let green = Style::new().fg(Color::LightGreen).bold();
        msg.replace("SUCCESS", &green.paint("SUCCESS").to_string())
            .replace("Success", &green.paint("Success").to_string())
    } else if msg.contains("FAILED") || msg.contains("Failed") {
        let red = Style::new().fg(Color::LightRed).bold();
        msg.replace("FAILED", &red.paint("FAILED").to_string())
            .replace("Failed", &red.paint("Failed").to_string())
    } else {
        msg
    }
}

fn level_style(level: &Level) -> Style {
    match *level {
        Level::ERROR => Style::new().fg(Color::Red).bold(),
        Level::WARN => Style::new().fg(Color::Yellow),
        Level::INFO => Style::new().fg(Color::Cyan),
        _ => Style::new().dimmed(),
    }
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = event.metadata().level();
        let timestamp = Local::now().format("%H:%M:%S");

        write!(
            writer,
            "{} {} ",
            Style::new().dimmed().paint(timestamp.to_string()),
            level_style(level).paint(format!("{:<5}", level.to_string()))
        )?;
        write!(writer, "{}", highlight(event_message(event)))?;
        writeln!(writer)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let level = event.metadata().level();

        write!(writer, "{} [{}] ", timestamp, level)?;
        // Lane spans, e.g. `group{group_id=1}: `
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{}}}", fields)?;
                    }
                }
                write!(writer, ": ")?;
            }
        }
        writeln!(writer, "{}", event_message(event))
    }
}
