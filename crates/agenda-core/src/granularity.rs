use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
)]
pub enum Granularity {
  Day,
  Week,
  #[default]
  Month
}

impl Granularity {
  pub fn all() -> [Self; 3] {
    [Self::Day, Self::Week, Self::Month]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Day => "day",
      | Self::Week => "week",
      | Self::Month => "month"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    let key = key.trim();
    Self::all().into_iter().find(|g| {
      g.as_key()
        .eq_ignore_ascii_case(key)
    })
  }
}

impl fmt::Display for Granularity {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl FromStr for Granularity {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::from_key(s).ok_or_else(|| {
      anyhow!(
        "unknown view {s:?}; expected \
         day, week or month"
      )
    })
  }
}
