use std::io::{self, Write};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use scli_common::serial::SystemSerial;
use tracing::debug;

/// The bar currently on screen, so log lines can be printed around it.
static ACTIVE: Mutex<Option<ProgressBar>> = Mutex::new(None);

pub fn start(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.blue} [{bar:40.green/bright_black}] {pos}/{len} systems ({elapsed})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar.enable_steady_tick(std::time::Duration::from_millis(100));

    if let Ok(mut active) = ACTIVE.lock() {
        *active = Some(bar.clone());
    }
    bar
}

/// Prints the completion line on stdout without tearing the bar.
pub fn system_done(bar: &ProgressBar, serial: &SystemSerial) {
    bar.suspend(|| {
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{}: Done", serial.display_form()) {
            debug!("Unable to print completion of {serial}: {e}");
        }
    });
}

/// Advances the bar by one system, whatever its outcome.
pub fn system_finished(bar: &ProgressBar) {
    bar.inc(1);
}

pub fn finish(bar: &ProgressBar) {
    bar.finish_and_clear();
    if let Ok(mut active) = ACTIVE.lock() {
        *active = None;
    }
}

/// stderr writer for the console log layer.
pub struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let active = ACTIVE.lock().ok().and_then(|bar| bar.clone());
        match active {
            Some(bar) if !bar.is_finished() => bar.suspend(|| io::stderr().write_all(buf))?,
            _ => io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
