use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use colored::*;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber, warn};
use tracing_subscriber::filter::{Directive, EnvFilter, Targets};
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

use crate::terminal::print;
use crate::terminal::progress::ConsoleWriter;

pub struct ScliFormatter;

impl<S, N> FormatEvent<S, N> for ScliFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        if meta.target() != print::TARGET {
            let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) =
                match *meta.level() {
                    Level::TRACE => ("[ ]", |s| s.dimmed()),
                    Level::DEBUG => ("[?]", |s| s.blue()),
                    Level::INFO => ("[+]", |s| s.green().bold()),
                    Level::WARN => ("[*]", |s| s.yellow().bold()),
                    Level::ERROR => ("[-]", |s| s.red().bold()),
                };
            write!(writer, "{} ", color_func(symbol.into()))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

fn console_filter(verbosity: u8) -> EnvFilter {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // Terminal output goes through the same layer and is never filtered out.
    match format!("{}=info", print::TARGET).parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn file_filter() -> Targets {
    Targets::new()
        .with_default(LevelFilter::DEBUG)
        .with_target("hyper_util", LevelFilter::INFO)
        .with_target("rustls", LevelFilter::INFO)
        .with_target(print::TARGET, LevelFilter::OFF)
}

/// Installs the global subscriber: a symbol-prefixed console layer on stderr and a
/// plain DEBUG layer appended to `log_file`.
pub fn init_logging(verbosity: u8, log_file: &Path) {
    let console = fmt::layer()
        .event_format(ScliFormatter)
        .with_writer(|| ConsoleWriter)
        .with_filter(console_filter(verbosity));

    let (file, open_error) = match File::options().create(true).append(true).open(log_file) {
        Ok(f) => {
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(f))
                .with_filter(file_filter());
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry().with(console).with(file).init();

    if let Some(e) = open_error {
        warn!("Unable to open log file {}: {e}", log_file.display());
    }
}
