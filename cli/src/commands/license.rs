use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use colored::*;
use scli_common::config::Config;
use scli_common::provisioning::BatchResult;
use scli_common::scheduler::Scheduler;
use scli_core::expander::{ExpandMode, SerialExpander};
use scli_core::orchestrator::BatchOrchestrator;
use scli_core::report;
use scli_core::scheduler::HttpScheduler;
use scli_core::workflow::WorkflowKind;
use tracing::info;

use crate::commands::LicenseArgs;
use crate::terminal::{colors, print, progress};

pub async fn license(args: LicenseArgs, cfg: &Config) -> anyhow::Result<()> {
    let mode = expand_mode(args.all, args.range.as_deref())?;
    let kind = if args.multi_node {
        WorkflowKind::MultiNode
    } else {
        WorkflowKind::Single
    };

    let scheduler: Arc<dyn Scheduler> =
        Arc::new(HttpScheduler::new(cfg).context("unable to set up the scheduler client")?);
    info!("Using scheduler at {}", cfg.endpoint);

    let start_time = Instant::now();
    let jobs = SerialExpander::new(Arc::clone(&scheduler))
        .expand(&args.serial, &mode)
        .await
        .with_context(|| format!("unable to list the systems of order {}", args.serial))?;

    if jobs.is_empty() {
        print::no_results(&format!("no systems found for {}", args.serial));
        return Ok(());
    }

    print::aligned_line("Order", args.serial.as_str().color(colors::SERIAL));
    print::aligned_line("Systems", jobs.len().to_string().color(colors::ACCENT));
    print::header("retrieving licenses");

    let bar = progress::start(jobs.len());
    let (done_bar, tick) = (bar.clone(), bar.clone());
    let orchestrator = BatchOrchestrator::new(scheduler)
        .with_kind(kind)
        .on_done(move |serial| progress::system_done(&done_bar, serial))
        .on_complete(move |_| progress::system_finished(&tick));

    let batch = orchestrator.run(jobs).await;
    progress::finish(&bar);

    licensing_ends(&batch, start_time.elapsed())
}

/// `--range` is inclusive on the command line; the expander takes a half-open range.
fn expand_mode(all: bool, range: Option<&[u32]>) -> anyhow::Result<ExpandMode> {
    match range {
        None => Ok(ExpandMode::DiscoverAll),
        Some(_) if all => bail!("--all and --range cannot be combined"),
        Some(&[start, end]) => {
            if start == 0 || start > end {
                bail!("invalid range {start}..{end}: START must be at least 1 and not above END");
            }
            let end = end.checked_add(1).context("range end is too large")?;
            Ok(ExpandMode::Range { start, end })
        }
        Some(other) => bail!("--range takes exactly two units, got {}", other.len()),
    }
}

fn licensing_ends(batch: &BatchResult, total_time: Duration) -> anyhow::Result<()> {
    if batch.is_empty() {
        print::no_results("no records retrieved");
        print_summary(batch, total_time);
        return Ok(());
    }

    print::header("provisioning report");
    {
        let mut out = io::stdout().lock();
        report::render(&mut out, batch).context("unable to write the report")?;
        out.flush().context("unable to write the report")?;
    }
    print_summary(batch, total_time);
    Ok(())
}

fn print_summary(batch: &BatchResult, total_time: Duration) {
    let records: ColoredString = format!("{} records", batch.len()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let mut output = format!("Retrieval complete: {records} in {total_time}");

    if batch.missing > 0 {
        output.push_str(&format!(", {} not found", batch.missing.to_string().yellow()));
    }
    if batch.failed > 0 {
        output.push_str(&format!(", {} failed", batch.failed.to_string().red().bold()));
    }

    print::fat_separator();
    print::centerln(&output);
}
