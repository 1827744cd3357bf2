use std::fmt;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  Utc
};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use tracing::{
  debug,
  warn
};

use crate::datetime::{
  civil_datetime,
  local_to_utc,
  parse_clock_time
};

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
pub struct EventId(pub String);

impl fmt::Display for EventId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for EventId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
)]
pub enum AppointmentStatus {
  Confirmed,
  #[default]
  Pending,
  Completed,
  Cancelled
}

impl AppointmentStatus {
  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "confirmed" => {
        Some(Self::Confirmed)
      }
      | "pending" => Some(Self::Pending),
      | "completed" => {
        Some(Self::Completed)
      }
      | "cancelled" | "canceled" => {
        Some(Self::Cancelled)
      }
      | _ => None
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Confirmed => "Confirmed",
      | Self::Pending => "Pending",
      | Self::Completed => "Completed",
      | Self::Cancelled => "Cancelled"
    }
  }
}

/// Payload carried through to the view
/// untouched.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct DisplayFields {
  pub subject:  String,
  pub category: String,
  pub status:   AppointmentStatus,
  pub notes:    Option<String>
}

/// Canonical scheduled event. Bucket
/// placement only ever looks at `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
  pub id:      EventId,
  pub start:   DateTime<Utc>,
  pub end:     Option<DateTime<Utc>>,
  pub display: DisplayFields
}

impl Event {
  pub fn new(
    id: impl Into<EventId>,
    start: DateTime<Utc>,
    display: DisplayFields
  ) -> Self {
    Self {
      id: id.into(),
      start,
      end: None,
      display
    }
  }

  /// Attaches an end time. An end before
  /// the start is dropped.
  #[must_use]
  pub fn with_end(
    mut self,
    end: DateTime<Utc>
  ) -> Self {
    if end < self.start {
      warn!(
        id = %self.id,
        start = %self.start,
        end = %end,
        "end precedes start; dropping end"
      );
      self.end = None;
    } else {
      self.end = Some(end);
    }
    self
  }

  pub fn civil_start(
    &self,
    tz: Tz
  ) -> NaiveDateTime {
    civil_datetime(self.start, tz)
  }

  pub fn civil_date(
    &self,
    tz: Tz
  ) -> NaiveDate {
    self.civil_start(tz).date()
  }
}

/// Row shape of the `appointments`
/// table as the backend hands it out.
/// Fields stay untyped so one odd value
/// never costs the whole record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAppointment {
  #[serde(default)]
  pub id:             Option<Value>,
  #[serde(default)]
  pub date:           Option<Value>,
  #[serde(default)]
  pub time:           Option<Value>,
  #[serde(default)]
  pub start_datetime: Option<Value>,
  #[serde(default)]
  pub end_datetime:   Option<Value>,
  #[serde(default)]
  pub patient_name:   Option<Value>,
  #[serde(default, rename = "type")]
  pub kind:           Option<Value>,
  #[serde(default)]
  pub status:         Option<Value>,
  #[serde(default)]
  pub notes:          Option<Value>,
  #[serde(default)]
  pub observations:   Option<Value>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
  pub index:  usize,
  pub id:     Option<String>,
  pub reason: String
}

/// Result of normalizing one snapshot.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
  pub events:   Vec<Event>,
  pub rejected: Vec<RejectedRecord>
}

impl Normalized {
  pub fn rejected_count(&self) -> usize {
    self.rejected.len()
  }
}

#[tracing::instrument(skip(records), fields(count = records.len()))]
pub fn normalize_records(
  records: Vec<Value>,
  tz: Tz
) -> Normalized {
  let mut out = Normalized::default();

  for (index, value) in
    records.into_iter().enumerate()
  {
    let id = value
      .get("id")
      .and_then(id_to_string);
    let raw = match serde_json::from_value::<
      RawAppointment,
    >(value)
    {
      | Ok(raw) => raw,
      | Err(err) => {
        reject(
          &mut out,
          index,
          id,
          format!(
            "record is not an \
             appointment: {err}"
          )
        );
        continue;
      }
    };

    match normalize_record(&raw, tz) {
      | Ok(event) => out.events.push(event),
      | Err(err) => {
        reject(
          &mut out,
          index,
          id,
          format!("{err:#}")
        )
      }
    }
  }

  debug!(
    events = out.events.len(),
    rejected = out.rejected.len(),
    "normalized snapshot"
  );
  out
}

fn reject(
  out: &mut Normalized,
  index: usize,
  id: Option<String>,
  reason: String
) {
  warn!(
    index,
    id = ?id,
    reason = %reason,
    "excluding malformed appointment"
  );
  out.rejected.push(RejectedRecord {
    index,
    id,
    reason
  });
}

/// Maps one raw row onto [`Event`].
/// `start_datetime` wins; `date` plus
/// `time` in the reporting timezone is
/// the fallback.
pub fn normalize_record(
  raw: &RawAppointment,
  tz: Tz
) -> anyhow::Result<Event> {
  let id = raw
    .id
    .as_ref()
    .and_then(id_to_string)
    .ok_or_else(|| {
      anyhow!("missing appointment id")
    })?;

  let start = resolve_start(raw, tz)
    .with_context(|| {
      format!(
        "appointment {id} has no usable \
         start"
      )
    })?;

  let status = match field_text(
    raw.status.as_ref()
  ) {
    | None => AppointmentStatus::default(),
    | Some(key) => {
      AppointmentStatus::from_key(&key)
        .unwrap_or_else(|| {
          warn!(
            id = %id,
            status = %key,
            "unknown appointment status; \
             treating as pending"
          );
          AppointmentStatus::Pending
        })
    }
  };

  let display = DisplayFields {
    subject: field_text(
      raw.patient_name.as_ref()
    )
    .unwrap_or_default(),
    category: field_text(
      raw.kind.as_ref()
    )
    .unwrap_or_default(),
    status,
    notes: field_text(raw.notes.as_ref())
      .or_else(|| {
        field_text(
          raw.observations.as_ref()
        )
      })
  };

  let mut event = Event::new(
    EventId(id),
    start,
    display
  );

  if let Some(raw_end) =
    field_text(raw.end_datetime.as_ref())
  {
    match parse_timestamp(&raw_end, tz) {
      | Ok(end) => {
        event = event.with_end(end);
      }
      | Err(err) => {
        warn!(
          id = %event.id,
          error = %err,
          "ignoring unparseable end_datetime"
        );
      }
    }
  }

  Ok(event)
}

fn resolve_start(
  raw: &RawAppointment,
  tz: Tz
) -> anyhow::Result<DateTime<Utc>> {
  let date = field_text(raw.date.as_ref());

  if let Some(start) = field_text(
    raw.start_datetime.as_ref()
  ) {
    match parse_timestamp(&start, tz) {
      | Ok(dt) => return Ok(dt),
      | Err(err) if date.is_some() => {
        warn!(
          start_datetime = %start,
          error = %err,
          "unparseable start_datetime; \
           falling back to date/time"
        );
      }
      | Err(err) => return Err(err)
    }
  }

  let date = date.ok_or_else(|| {
    anyhow!("missing start timestamp")
  })?;
  let day = NaiveDate::parse_from_str(
    &date, "%Y-%m-%d"
  )
  .with_context(|| {
    format!("invalid date {date:?}")
  })?;
  let time = field_text(
    raw.time.as_ref()
  )
  .ok_or_else(|| {
    anyhow!("missing start time for {day}")
  })?;
  let (hour, minute, second) =
    parse_clock_time(&time).ok_or_else(
      || anyhow!("invalid time {time:?}")
    )?;
  let local = day
    .and_hms_opt(hour, minute, second)
    .ok_or_else(|| {
      anyhow!("invalid time {time:?}")
    })?;

  local_to_utc(local, tz, "date+time")
}

/// Accepts RFC 3339, the Postgres text
/// form with a short offset, and naive
/// ISO timestamps (read in `tz`).
pub fn parse_timestamp(
  raw: &str,
  tz: Tz
) -> anyhow::Result<DateTime<Utc>> {
  let token = raw.trim();

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  for fmt in [
    "%Y-%m-%d %H:%M:%S%#z",
    "%Y-%m-%dT%H:%M:%S%#z"
  ] {
    if let Ok(dt) =
      DateTime::parse_from_str(token, fmt)
    {
      return Ok(dt.with_timezone(&Utc));
    }
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(naive) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return local_to_utc(naive, tz, fmt);
    }
  }

  Err(anyhow!(
    "unparseable timestamp {token:?}"
  ))
}

fn id_to_string(
  value: &Value
) -> Option<String> {
  match value {
    | Value::String(s)
      if !s.trim().is_empty() =>
    {
      Some(s.trim().to_string())
    }
    | Value::Number(n) => {
      Some(n.to_string())
    }
    | _ => None
  }
}

/// Text of a scalar field. Numbers and
/// booleans are stringified; arrays and
/// objects are dropped with a warning.
fn field_text(
  value: Option<&Value>
) -> Option<String> {
  match value? {
    | Value::String(s) => {
      let s = s.trim();
      (!s.is_empty())
        .then(|| s.to_string())
    }
    | Value::Number(n) => {
      Some(n.to_string())
    }
    | Value::Bool(b) => Some(b.to_string()),
    | Value::Null => None,
    | other => {
      warn!(
        value = %other,
        "ignoring non-scalar appointment \
         field"
      );
      None
    }
  }
}
