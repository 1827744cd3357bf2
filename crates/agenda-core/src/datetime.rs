use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Timelike,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const TIMEZONE_ENV_VAR: &str =
  "AGENDA_TIMEZONE";
pub const DEFAULT_REPORTING_TIMEZONE:
  &str = "America/Sao_Paulo";

/// Source of "now" for anything that
/// needs to know what today is.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(
  pub DateTime<Utc>
);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }
}

/// Picks the reporting timezone:
/// `AGENDA_TIMEZONE`, then the
/// configured id, then the built-in
/// default, then UTC.
pub fn resolve_reporting_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  default_reporting_timezone()
}

/// [`DEFAULT_REPORTING_TIMEZONE`] as a
/// `Tz`, or UTC if it fails to parse.
pub fn default_reporting_timezone() -> Tz {
  parse_timezone(
    DEFAULT_REPORTING_TIMEZONE,
    "DEFAULT_REPORTING_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved reporting timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(
  tz: Tz,
  now: DateTime<Utc>
) -> NaiveDate {
  now.with_timezone(&tz).date_naive()
}

#[must_use]
pub fn civil_datetime(
  dt: DateTime<Utc>,
  tz: Tz
) -> NaiveDateTime {
  dt.with_timezone(&tz).naive_local()
}

#[must_use]
pub fn civil_hour(
  dt: DateTime<Utc>,
  tz: Tz
) -> u32 {
  civil_datetime(dt, tz).hour()
}

/// Interprets a wall-clock time in
/// `tz`. Folded times take the earlier
/// instant; times inside a gap fail.
pub fn local_to_utc(
  local_naive: NaiveDateTime,
  tz: Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz.from_local_datetime(
    &local_naive
  ) {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime {local_naive} \
         does not exist in {tz}: \
         {context}"
      ))
    }
  }
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn is_leap_year(year: i32) -> bool {
  (year % 4 == 0 && year % 100 != 0)
    || year % 400 == 0
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  match month {
    | 2 if is_leap_year(year) => 29,
    | 2 => 28,
    | 4 | 6 | 9 | 11 => 30,
    | _ => 31
  }
}

/// Shifts by whole days, staying put
/// at the edge of the representable
/// range.
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Column of `day` in a week that
/// begins on `week_start` (0..=6).
pub fn weekday_offset(
  day: NaiveDate,
  week_start: Weekday
) -> u32 {
  let day_idx = day
    .weekday()
    .num_days_from_monday();
  let start_idx =
    week_start.num_days_from_monday();
  (7 + day_idx - start_idx) % 7
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    day,
    -i64::from(weekday_offset(
      day, week_start
    ))
  )
}

pub fn parse_week_start(
  raw: &str
) -> Option<Weekday> {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | _ => None
  }
}

/// Resolves a `--date` style expression
/// against `today` (a civil date in the
/// reporting timezone).
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative number"
      )?;
    let days = match &caps["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    return Ok(
      if &caps["sign"] == "-" {
        add_days(today, -days)
      } else {
        add_days(today, days)
      }
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Some((year, month)) =
    token.split_once('-')
    && year.len() == 4
    && let (Ok(year), Ok(month)) = (
      year.parse::<i32>(),
      month.parse::<u32>()
    )
    && (1..=12).contains(&month)
  {
    return Ok(first_day_of_month(
      year, month
    ));
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd/+Nw/-Nw, YYYY-MM-DD, \
     YYYY-MM"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

/// Parses `HH:MM`, `HH:MM:SS` and
/// `h:mm am/pm` into (hour, minute,
/// second).
pub fn parse_clock_time(
  token: &str
) -> Option<(u32, u32, u32)> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let second = match captures
    .name("second")
  {
    | Some(m) => {
      m.as_str().parse::<u32>().ok()?
    }
    | None => 0
  };
  if minute > 59 || second > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    let pm = ampm_match
      .as_str()
      .eq_ignore_ascii_case("pm");
    match (pm, raw_hour) {
      | (false, 12) => 0,
      | (true, 12) => 12,
      | (true, h) => h + 12,
      | (false, h) => h
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute, second))
}
