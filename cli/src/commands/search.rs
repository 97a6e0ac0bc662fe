use std::sync::Arc;

use anyhow::Context;
use colored::*;
use scli_common::config::Config;
use scli_common::scheduler::{Scheduler, SchedulerError};
use scli_common::serial::SystemSerial;
use scli_core::scheduler::HttpScheduler;
use tracing::warn;

use crate::terminal::{colors, print};

pub async fn search(serials: Vec<String>, cfg: &Config) -> anyhow::Result<()> {
    let scheduler: Arc<dyn Scheduler> =
        Arc::new(HttpScheduler::new(cfg).context("unable to set up the scheduler client")?);

    let found = match scheduler.search_system(&serials).await {
        Ok(found) => found,
        Err(SchedulerError::Rejected(message)) => {
            warn!("No unique match: {message}");
            None
        }
        Err(e) => return Err(e).context("component search failed"),
    };

    let Some(found) = found else {
        print::no_results("no matching system");
        return Ok(());
    };

    // Normalize the serial for display when it parses; show it verbatim otherwise.
    let serial = found
        .serial
        .parse::<SystemSerial>()
        .map(|s| s.display_form())
        .unwrap_or_else(|_| found.serial.clone());

    print::header("system found");
    print::aligned_line("Serial", serial.color(colors::SERIAL));
    print::aligned_line("System ID", found.system_id.as_str().color(colors::SYSTEM_ID));
    if let Some(message) = &found.message {
        print::aligned_line("Message", message);
    }

    println!("{serial}: {}", found.system_id);
    Ok(())
}
