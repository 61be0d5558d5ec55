use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Target used for operator-facing result lines.
pub const RESULT_TARGET: &str = "mint_result";

/// Installs the global subscriber: hourly file log under `logs/` plus a
/// coloured console layer. `verbose` lowers the console threshold for the
/// sniper crate from WARN to DEBUG.
pub fn setup_logger(verbose: bool) -> Option<WorkerGuard> {
    std::fs::create_dir_all("logs").ok();

    let file_appender = tracing_appender::rolling::hourly("logs", "sniper");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File layer: INFO for results and the sniper crate, WARN for others
    let file_filter = tracing_subscriber::filter::Targets::new()
        .with_target(RESULT_TARGET, Level::INFO)
        .with_target("nft_sniper", Level::INFO)
        .with_default(Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let sniper_level = if verbose { Level::DEBUG } else { Level::WARN };
    let console_filter = tracing_subscriber::filter::Targets::new()
        .with_target(RESULT_TARGET, Level::INFO)
        .with_target("nft_sniper", sniper_level)
        .with_default(Level::ERROR);

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
        // Guard MUST be kept alive by caller
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

/// Leading `[account=...]` tag from the innermost span fields, if any.
fn span_prefix<S, N>(ctx: &FmtContext<'_, S, N>) -> String
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    let Some(span) = ctx.lookup_current() else {
        return String::new();
    };
    let extensions = span.extensions();
    match extensions.get::<tracing_subscriber::fmt::FormattedFields<N>>() {
        Some(fields) if !fields.is_empty() => format!("[{}] ", fields),
        _ => String::new(),
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
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = event_message(event);

        // Colorization for SUCCESS and FAILED
        let colored_msg = if msg.contains("SUCCESS") || msg.contains("Success") {
            let green_text = Style::new().fg(Color::LightGreen).bold();
            msg.replace("SUCCESS", &format!("{}", green_text.paint("SUCCESS")))
                .replace("Success", &format!("{}", green_text.paint("Success")))
        } else if msg.contains("FAILED") || msg.contains("Failed") {
            let red_text = Style::new().fg(Color::LightRed).bold();
            msg.replace("FAILED", &format!("{}", red_text.paint("FAILED")))
                .replace("Failed", &format!("{}", red_text.paint("Failed")))
        } else {
            msg
        };

        let level = *event.metadata().level();
        if level == Level::WARN {
            write!(writer, "{} ", Color::Yellow.bold().paint("WARN"))?;
        } else if level == Level::ERROR {
            write!(writer, "{} ", Color::Red.bold().paint("ERROR"))?;
        }

        write!(writer, "{}{}", span_prefix(ctx), colored_msg)?;
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
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let level = event.metadata().level();

        write!(writer, "{} [{}] {}", timestamp, level, span_prefix(ctx))?;
        writeln!(writer, "{}", event_message(event))
    }
}
