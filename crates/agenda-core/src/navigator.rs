use chrono::{
  Datelike,
  NaiveDate
};

use crate::datetime::{
  add_days,
  days_in_month
};
use crate::granularity::Granularity;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Direction {
  Forward,
  Backward
}

impl Direction {
  fn sign(self) -> i32 {
    match self {
      | Self::Forward => 1,
      | Self::Backward => -1
    }
  }

  pub fn reversed(self) -> Self {
    match self {
      | Self::Forward => Self::Backward,
      | Self::Backward => Self::Forward
    }
  }
}

/// Moves the reference date one page in
/// `direction`.
///
/// Month steps keep the day-of-month when
/// the target month has it and otherwise
/// land on the 1st of the target month,
/// so 2024-01-31 goes to 2024-02-01.
pub fn advance(
  reference: NaiveDate,
  granularity: Granularity,
  direction: Direction
) -> NaiveDate {
  let step = direction.sign();
  match granularity {
    | Granularity::Day => {
      add_days(reference, i64::from(step))
    }
    | Granularity::Week => {
      add_days(
        reference,
        i64::from(step) * 7
      )
    }
    | Granularity::Month => {
      shift_months(
        reference,
        i64::from(step)
      )
    }
  }
}

/// Moves `steps` pages at once; negative
/// counts go backward. A month jump
/// clamps against the target month only,
/// so 2024-01-31 plus 2 months is
/// 2024-03-31.
pub fn advance_by(
  reference: NaiveDate,
  granularity: Granularity,
  steps: i32
) -> NaiveDate {
  let steps = i64::from(steps);
  match granularity {
    | Granularity::Day => {
      add_days(reference, steps)
    }
    | Granularity::Week => {
      add_days(reference, steps * 7)
    }
    | Granularity::Month => {
      shift_months(reference, steps)
    }
  }
}

fn shift_months(
  date: NaiveDate,
  months: i64
) -> NaiveDate {
  let total = i64::from(date.year()) * 12
    + i64::from(date.month0())
    + months;
  let Ok(year) =
    i32::try_from(total.div_euclid(12))
  else {
    return date;
  };
  let month =
    total.rem_euclid(12) as u32 + 1;
  let Some(first) =
    NaiveDate::from_ymd_opt(year, month, 1)
  else {
    return date;
  };

  if date.day() > days_in_month(year, month)
  {
    return first;
  }

  first
    .with_day(date.day())
    .unwrap_or(first)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    Direction,
    advance,
    advance_by
  };
  use crate::granularity::Granularity;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn day_and_week_roll_over_year() {
    assert_eq!(
      advance(
        date(2024, 12, 31),
        Granularity::Day,
        Direction::Forward
      ),
      date(2025, 1, 1)
    );
    assert_eq!(
      advance(
        date(2024, 3, 1),
        Granularity::Day,
        Direction::Backward
      ),
      date(2024, 2, 29)
    );
    assert_eq!(
      advance(
        date(2024, 12, 28),
        Granularity::Week,
        Direction::Forward
      ),
      date(2025, 1, 4)
    );
  }

  #[test]
  fn month_overflow_lands_on_first() {
    assert_eq!(
      advance(
        date(2024, 1, 31),
        Granularity::Month,
        Direction::Forward
      ),
      date(2024, 2, 1)
    );
    assert_eq!(
      advance(
        date(2024, 3, 31),
        Granularity::Month,
        Direction::Backward
      ),
      date(2024, 2, 1)
    );
    assert_eq!(
      advance(
        date(2024, 5, 31),
        Granularity::Month,
        Direction::Forward
      ),
      date(2024, 6, 1)
    );
  }

  #[test]
  fn month_keeps_day_when_it_exists() {
    assert_eq!(
      advance(
        date(2024, 1, 15),
        Granularity::Month,
        Direction::Forward
      ),
      date(2024, 2, 15)
    );
    assert_eq!(
      advance(
        date(2024, 1, 29),
        Granularity::Month,
        Direction::Backward
      ),
      date(2023, 12, 29)
    );
    assert_eq!(
      advance(
        date(2024, 12, 10),
        Granularity::Month,
        Direction::Forward
      ),
      date(2025, 1, 10)
    );
  }

  #[test]
  fn advance_by_counts_steps() {
    assert_eq!(
      advance_by(
        date(2024, 11, 15),
        Granularity::Week,
        -2
      ),
      date(2024, 11, 1)
    );
    assert_eq!(
      advance_by(
        date(2024, 11, 15),
        Granularity::Month,
        0
      ),
      date(2024, 11, 15)
    );
    assert_eq!(
      advance_by(
        date(2024, 11, 15),
        Granularity::Month,
        3
      ),
      date(2025, 2, 15)
    );
    assert_eq!(
      advance_by(
        date(2024, 1, 31),
        Granularity::Month,
        1
      ),
      advance(
        date(2024, 1, 31),
        Granularity::Month,
        Direction::Forward
      )
    );
    assert_eq!(
      advance_by(
        date(2024, 1, 31),
        Granularity::Month,
        2
      ),
      date(2024, 3, 31)
    );
    assert_eq!(
      advance_by(
        date(2024, 11, 15),
        Granularity::Day,
        -15
      ),
      date(2024, 10, 31)
    );
  }

  #[test]
  fn huge_shifts_saturate_quickly() {
    let start = date(2024, 11, 15);
    for granularity in Granularity::all() {
      assert_eq!(
        advance_by(
          start,
          granularity,
          i32::MAX
        ),
        start,
        "{granularity}"
      );
    }
  }

  #[test]
  fn reversed_flips_direction() {
    assert_eq!(
      Direction::Forward.reversed(),
      Direction::Backward
    );
  }
}
