pub mod cli;
pub mod config;
pub mod datetime;
pub mod event;
pub mod granularity;
pub mod grid;
pub mod navigator;
pub mod partition;
pub mod render;
pub mod selection;
pub mod snapshot;
pub mod summary;
pub mod view;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::datetime::{
  Clock,
  FixedClock,
  SystemClock
};
pub use crate::event::{
  AppointmentStatus,
  DisplayFields,
  Event,
  EventId
};
pub use crate::granularity::Granularity;
pub use crate::grid::{
  GridShape,
  derive_grid
};
pub use crate::navigator::{
  Direction,
  advance
};
pub use crate::partition::{
  BucketKey,
  Partition,
  partition
};
pub use crate::selection::Selection;
pub use crate::view::{
  CalendarView,
  ViewFrame,
  ViewSettings
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli = cli::GlobalCli::parse_from(
    raw_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting agenda CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg
    .apply_overrides(cli.overrides())
    .context(
      "failed to apply --rc overrides"
    )?;

  match cli.now {
    | Some(now) => {
      debug!(%now, "using fixed clock");
      show(&cli, &cfg, FixedClock(now))
    }
    | None => {
      show(&cli, &cfg, SystemClock)
    }
  }
}

fn show<C: Clock>(
  cli: &cli::GlobalCli,
  cfg: &config::Config,
  clock: C
) -> anyhow::Result<()> {
  let settings =
    ViewSettings::from_config(cfg);
  let events_path = cli
    .events
    .clone()
    .unwrap_or_else(|| cfg.snapshot_path());
  let snapshot = snapshot::load_snapshot(
    &events_path,
    settings.timezone
  )?;

  let mut view = CalendarView::new(
    settings,
    clock,
    cli.view.unwrap_or_else(|| {
      cfg.default_view()
    })
  );

  if let Some(expr) = cli.date.as_deref()
  {
    let date = datetime::parse_date_expr(
      expr,
      view.today()
    )
    .with_context(|| {
      format!("invalid --date: {expr}")
    })?;
    view.jump_to(date);
  }
  if cli.shift != 0 {
    view.shift(cli.shift);
  }
  if let Some(day) = cli.select
    && !view.select_day(day)
  {
    anyhow::bail!(
      "--select {day} needs month view \
       and a day of the shown month"
    );
  }

  let frame = view.frame(&snapshot.events);
  info!(
    title = %frame.title,
    shown = frame.summary.total,
    excluded = frame.partition.excluded(),
    rejected = snapshot.rejected_count(),
    "rendering calendar"
  );

  let renderer =
    render::Renderer::new(cfg);
  let stdout = io::stdout();
  let mut out = stdout.lock();
  renderer.write_frame(
    &mut out,
    &frame,
    snapshot.rejected_count()
  )?;
  out.flush()?;
  Ok(())
}
