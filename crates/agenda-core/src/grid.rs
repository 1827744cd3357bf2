use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};

use crate::datetime::{
  add_days,
  days_in_month,
  first_day_of_month,
  start_of_week,
  weekday_offset
};
use crate::granularity::Granularity;

pub const HOURS_PER_DAY: u32 = 24;

/// Cells the view has to draw for one
/// reference date and granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridShape {
  Month {
    year:           i32,
    month:          u32,
    leading_blanks: u32,
    day_count:      u32
  },
  Week {
    dates: [NaiveDate; 7]
  },
  Day {
    date:  NaiveDate,
    hours: [u32; HOURS_PER_DAY as usize]
  }
}

impl GridShape {
  pub fn granularity(&self) -> Granularity {
    match self {
      | Self::Month { .. } => {
        Granularity::Month
      }
      | Self::Week { .. } => {
        Granularity::Week
      }
      | Self::Day { .. } => {
        Granularity::Day
      }
    }
  }

  /// First and last civil date covered.
  pub fn date_range(
    &self
  ) -> (NaiveDate, NaiveDate) {
    match self {
      | Self::Month {
        year,
        month,
        day_count,
        ..
      } => {
        let first = first_day_of_month(
          *year, *month
        );
        (
          first,
          add_days(
            first,
            i64::from(*day_count) - 1
          )
        )
      }
      | Self::Week { dates } => {
        (dates[0], dates[6])
      }
      | Self::Day { date, .. } => {
        (*date, *date)
      }
    }
  }

  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    let (start, end) = self.date_range();
    date >= start && date <= end
  }

  /// Number of 7-column rows a month
  /// grid needs (4..=6).
  pub fn month_rows(&self) -> Option<u32> {
    match self {
      | Self::Month {
        leading_blanks,
        day_count,
        ..
      } => {
        Some(
          (leading_blanks + day_count)
            .div_ceil(7)
        )
      }
      | _ => None
    }
  }
}

pub fn derive_grid(
  reference: NaiveDate,
  granularity: Granularity,
  week_start: Weekday
) -> GridShape {
  match granularity {
    | Granularity::Month => {
      let year = reference.year();
      let month = reference.month();
      let first =
        first_day_of_month(year, month);
      GridShape::Month {
        year,
        month,
        leading_blanks: weekday_offset(
          first, week_start
        ),
        day_count: days_in_month(
          year, month
        )
      }
    }
    | Granularity::Week => {
      let start = start_of_week(
        reference, week_start
      );
      GridShape::Week {
        dates: std::array::from_fn(
          |i| add_days(start, i as i64)
        )
      }
    }
    | Granularity::Day => {
      GridShape::Day {
        date:  reference,
        hours: std::array::from_fn(
          |i| i as u32
        )
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    Weekday
  };

  use super::{
    GridShape,
    derive_grid
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
  fn month_grid_for_november_2024() {
    let grid = derive_grid(
      date(2024, 11, 15),
      Granularity::Month,
      Weekday::Sun
    );
    assert_eq!(
      grid,
      GridShape::Month {
        year:           2024,
        month:          11,
        leading_blanks: 5,
        day_count:      30
      }
    );
    assert_eq!(grid.month_rows(), Some(5));
    assert_eq!(
      grid.date_range(),
      (date(2024, 11, 1), date(2024, 11, 30))
    );
  }

  #[test]
  fn monday_start_shifts_blanks() {
    let grid = derive_grid(
      date(2024, 11, 15),
      Granularity::Month,
      Weekday::Mon
    );
    let GridShape::Month {
      leading_blanks,
      ..
    } = grid
    else {
      panic!("expected month grid");
    };
    assert_eq!(leading_blanks, 4);
  }

  #[test]
  fn week_grid_crosses_month_boundary() {
    let grid = derive_grid(
      date(2024, 10, 31),
      Granularity::Week,
      Weekday::Sun
    );
    let GridShape::Week { dates } = grid
    else {
      panic!("expected week grid");
    };
    assert_eq!(dates[0], date(2024, 10, 27));
    assert_eq!(dates[6], date(2024, 11, 2));
    assert_eq!(
      dates[0].weekday(),
      Weekday::Sun
    );
  }

  #[test]
  fn day_grid_has_24_hours() {
    let grid = derive_grid(
      date(2024, 11, 15),
      Granularity::Day,
      Weekday::Sun
    );
    let GridShape::Day { date: d, hours } =
      &grid
    else {
      panic!("expected day grid");
    };
    assert_eq!(*d, date(2024, 11, 15));
    assert_eq!(hours.len(), 24);
    assert_eq!(hours[0], 0);
    assert_eq!(hours[23], 23);
    assert!(grid.contains(*d));
    assert!(
      !grid.contains(date(2024, 11, 16))
    );
  }
}
