use std::collections::BTreeMap;

use chrono::{
  Datelike,
  Timelike
};
use chrono_tz::Tz;

use crate::event::Event;
use crate::grid::GridShape;

/// Grid cell an event lands in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
pub enum BucketKey {
  /// Day of month, 1..=31.
  Day(u32),
  /// Week column (0 = week start) and
  /// hour row.
  Slot { column: u32, hour: u32 },
  /// Hour row of a single day.
  Hour(u32)
}

/// Events grouped by bucket for one
/// render pass. Borrows the snapshot.
#[derive(Debug, Clone, Default)]
pub struct Partition<'a> {
  buckets:  BTreeMap<BucketKey, Vec<&'a Event>>,
  excluded: usize
}

/// First `limit` events of a bucket and
/// how many more there are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPreview<'p, 'a> {
  pub shown:    &'p [&'a Event],
  pub overflow: usize
}

impl<'a> Partition<'a> {
  pub fn get(
    &self,
    key: BucketKey
  ) -> &[&'a Event] {
    self
      .buckets
      .get(&key)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn buckets(
    &self
  ) -> impl Iterator<Item = (BucketKey, &[&'a Event])>
  {
    self
      .buckets
      .iter()
      .map(|(key, events)| {
        (*key, events.as_slice())
      })
  }

  /// Placed events in bucket order.
  pub fn events(
    &self
  ) -> impl Iterator<Item = &'a Event> + '_
  {
    self
      .buckets
      .values()
      .flat_map(|events| {
        events.iter().copied()
      })
  }

  /// Number of events placed across all
  /// buckets.
  pub fn len(&self) -> usize {
    self.buckets.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.buckets.is_empty()
  }

  /// Events outside the displayed range.
  pub fn excluded(&self) -> usize {
    self.excluded
  }

  pub fn preview(
    &self,
    key: BucketKey,
    limit: usize
  ) -> BucketPreview<'_, 'a> {
    let events = self.get(key);
    let shown_len = events.len().min(limit);
    BucketPreview {
      shown:    &events[..shown_len],
      overflow: events.len() - shown_len
    }
  }
}

/// Bucket for `event` under `grid`, or
/// `None` when it falls on another page.
pub fn bucket_key(
  event: &Event,
  grid: &GridShape,
  tz: Tz
) -> Option<BucketKey> {
  let civil = event.civil_start(tz);
  let date = civil.date();

  match grid {
    | GridShape::Month {
      year,
      month,
      ..
    } => {
      (date.year() == *year
        && date.month() == *month)
        .then(|| BucketKey::Day(date.day()))
    }
    | GridShape::Week { dates } => {
      let column = (date - dates[0])
        .num_days();
      if !(0..7).contains(&column) {
        return None;
      }
      Some(BucketKey::Slot {
        column: column as u32,
        hour:   civil.hour()
      })
    }
    | GridShape::Day { date: shown, .. } => {
      (date == *shown)
        .then(|| BucketKey::Hour(civil.hour()))
    }
  }
}

/// Groups `events` into the buckets of
/// `grid`. Each bucket is ordered by
/// start time; equal starts keep input
/// order.
pub fn partition<'a>(
  events: &'a [Event],
  grid: &GridShape,
  tz: Tz
) -> Partition<'a> {
  let mut out = Partition::default();

  for event in events {
    match bucket_key(event, grid, tz) {
      | Some(key) => {
        out
          .buckets
          .entry(key)
          .or_default()
          .push(event);
      }
      | None => {
        out.excluded += 1;
      }
    }
  }

  for bucket in out.buckets.values_mut() {
    bucket.sort_by_key(|event| event.start);
  }

  tracing::debug!(
    granularity = %grid.granularity(),
    total = events.len(),
    placed = out.len(),
    excluded = out.excluded,
    buckets = out.buckets.len(),
    "partitioned events"
  );
  out
}
