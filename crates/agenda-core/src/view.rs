//! Calendar page state: reference date,
//! granularity and day selection, plus
//! the per-render [`ViewFrame`].

use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use chrono_tz::Tz;
use tracing::{
  debug,
  warn
};

use crate::config::Config;
use crate::datetime::{
  Clock,
  civil_hour,
  default_reporting_timezone,
  resolve_reporting_timezone,
  today_in
};
use crate::event::Event;
use crate::granularity::Granularity;
use crate::grid::{
  GridShape,
  derive_grid
};
use crate::navigator::{
  Direction,
  advance,
  advance_by
};
use crate::partition::{
  BucketKey,
  Partition,
  partition
};
use crate::selection::Selection;
use crate::summary::PeriodSummary;

/// Settings fixed for the lifetime of a
/// view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
  pub timezone:     Tz,
  pub week_start:   Weekday,
  pub marker_limit: usize
}

impl ViewSettings {
  pub fn from_config(cfg: &Config) -> Self {
    Self {
      timezone:     resolve_reporting_timezone(
        cfg.timezone.as_deref()
      ),
      week_start:   cfg.week_start(),
      marker_limit: cfg.calendar.marker_limit
    }
  }
}

impl Default for ViewSettings {
  fn default() -> Self {
    Self {
      timezone:     default_reporting_timezone(),
      week_start:   Weekday::Sun,
      marker_limit: 3
    }
  }
}

/// Everything the renderer needs for one
/// pass over a snapshot.
#[derive(Debug, Clone)]
pub struct ViewFrame<'a> {
  pub reference:    NaiveDate,
  pub granularity:  Granularity,
  pub title:        String,
  pub today:        NaiveDate,
  pub current_hour: u32,
  pub timezone:     Tz,
  pub week_start:   Weekday,
  pub marker_limit: usize,
  pub grid:         GridShape,
  pub partition:    Partition<'a>,
  pub summary:      PeriodSummary,
  pub selection:    Selection
}

impl<'a> ViewFrame<'a> {
  /// Events of the selected bucket, in
  /// display order.
  pub fn selected_events(
    &self
  ) -> &[&'a Event] {
    match self.selection.key() {
      | Some(key) => self.partition.get(key),
      | None => &[]
    }
  }

  /// Civil date of the selected month
  /// day, if it exists in the shown
  /// month.
  pub fn selected_date(
    &self
  ) -> Option<NaiveDate> {
    let (
      GridShape::Month { year, month, .. },
      Some(BucketKey::Day(day))
    ) = (&self.grid, self.selection.key())
    else {
      return None;
    };
    NaiveDate::from_ymd_opt(
      *year, *month, day
    )
  }

  /// Heading for the detail list, e.g.
  /// "Friday, 15 November 2024".
  pub fn selected_title(
    &self
  ) -> Option<String> {
    self.selected_date().map(long_date)
  }

  pub fn is_today(
    &self,
    date: NaiveDate
  ) -> bool {
    date == self.today
  }
}

pub struct CalendarView<C: Clock> {
  settings:    ViewSettings,
  clock:       C,
  reference:   NaiveDate,
  granularity: Granularity,
  selection:   Selection
}

impl<C: Clock> CalendarView<C> {
  /// Starts on today's date in the
  /// reporting timezone.
  pub fn new(
    settings: ViewSettings,
    clock: C,
    granularity: Granularity
  ) -> Self {
    let reference = today_in(
      settings.timezone,
      clock.now()
    );
    debug!(
      %reference,
      %granularity,
      timezone = %settings.timezone,
      "created calendar view"
    );
    Self {
      settings,
      clock,
      reference,
      granularity,
      selection: Selection::default()
    }
  }

  pub fn reference(&self) -> NaiveDate {
    self.reference
  }

  pub fn granularity(
    &self
  ) -> Granularity {
    self.granularity
  }

  pub fn selection(&self) -> Selection {
    self.selection
  }

  pub fn today(&self) -> NaiveDate {
    today_in(
      self.settings.timezone,
      self.clock.now()
    )
  }

  pub fn next(&mut self) {
    self.step(Direction::Forward);
  }

  pub fn previous(&mut self) {
    self.step(Direction::Backward);
  }

  pub fn step(
    &mut self,
    direction: Direction
  ) {
    self.reference = advance(
      self.reference,
      self.granularity,
      direction
    );
    debug!(reference = %self.reference, ?direction, "navigated");
  }

  /// Moves `steps` pages; negative goes
  /// back.
  pub fn shift(&mut self, steps: i32) {
    self.reference = advance_by(
      self.reference,
      self.granularity,
      steps
    );
    debug!(reference = %self.reference, steps, "shifted");
  }

  pub fn go_to_today(&mut self) {
    self.reference = self.today();
  }

  pub fn jump_to(
    &mut self,
    date: NaiveDate
  ) {
    self.reference = date;
  }

  pub fn set_granularity(
    &mut self,
    granularity: Granularity
  ) {
    self.selection = self
      .selection
      .on_granularity_change(granularity);
    self.granularity = granularity;
  }

  /// Opens the detail list for a day of
  /// the shown month. Ignored outside
  /// Month view or for days the month
  /// does not have.
  pub fn select_day(
    &mut self,
    day: u32
  ) -> bool {
    if self.granularity
      != Granularity::Month
    {
      warn!(
        day,
        granularity = %self.granularity,
        "day selection only applies to month view"
      );
      return false;
    }

    let month_len =
      crate::datetime::days_in_month(
        self.reference.year(),
        self.reference.month()
      );
    if !(1..=month_len).contains(&day) {
      warn!(
        day,
        month_len,
        "selected day outside month"
      );
      return false;
    }

    self.selection =
      Selection::select(BucketKey::Day(day));
    true
  }

  pub fn clear_selection(&mut self) {
    self.selection = Selection::clear();
  }

  pub fn grid(&self) -> GridShape {
    derive_grid(
      self.reference,
      self.granularity,
      self.settings.week_start
    )
  }

  pub fn title(&self) -> String {
    title_for(
      self.granularity,
      self.reference,
      self.settings.week_start
    )
  }

  /// Derives grid, buckets and summary for
  /// `events`.
  #[tracing::instrument(skip_all, fields(reference = %self.reference, granularity = %self.granularity))]
  pub fn frame<'a>(
    &self,
    events: &'a [Event]
  ) -> ViewFrame<'a> {
    let grid = self.grid();
    let partition = partition(
      events,
      &grid,
      self.settings.timezone
    );
    let summary =
      partition.events().collect();
    let now = self.clock.now();

    ViewFrame {
      reference: self.reference,
      granularity: self.granularity,
      title: self.title(),
      today: today_in(
        self.settings.timezone,
        now
      ),
      current_hour: civil_hour(
        now,
        self.settings.timezone
      ),
      timezone: self.settings.timezone,
      week_start: self
        .settings
        .week_start,
      marker_limit: self
        .settings
        .marker_limit,
      grid,
      partition,
      summary,
      selection: self.selection
    }
  }
}

pub fn title_for(
  granularity: Granularity,
  reference: NaiveDate,
  week_start: Weekday
) -> String {
  match granularity {
    | Granularity::Month => {
      reference
        .format("%B %Y")
        .to_string()
    }
    | Granularity::Week => {
      let start =
        crate::datetime::start_of_week(
          reference, week_start
        );
      let end =
        crate::datetime::add_days(start, 6);
      if start.month() == end.month()
        && start.year() == end.year()
      {
        format!(
          "{} - {}",
          start.day(),
          end.format("%-d %B %Y")
        )
      } else if start.year() == end.year()
      {
        format!(
          "{} - {}",
          start.format("%-d %B"),
          end.format("%-d %B %Y")
        )
      } else {
        format!(
          "{} - {}",
          start.format("%-d %B %Y"),
          end.format("%-d %B %Y")
        )
      }
    }
    | Granularity::Day => {
      long_date(reference)
    }
  }
}

fn long_date(date: NaiveDate) -> String {
  date
    .format("%A, %-d %B %Y")
    .to_string()
}
