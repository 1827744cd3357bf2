use crate::granularity::Granularity;
use crate::partition::BucketKey;

/// Which bucket, if any, is open in the
/// detail list.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum Selection {
  #[default]
  Unselected,
  Selected(BucketKey)
}

impl Selection {
  #[must_use]
  pub fn select(key: BucketKey) -> Self {
    Self::Selected(key)
  }

  #[must_use]
  pub fn clear() -> Self {
    Self::Unselected
  }

  /// Selection only survives while the
  /// view stays on Month.
  #[must_use]
  pub fn on_granularity_change(
    self,
    next: Granularity
  ) -> Self {
    match next {
      | Granularity::Month => self,
      | _ => Self::Unselected
    }
  }

  pub fn key(self) -> Option<BucketKey> {
    match self {
      | Self::Selected(key) => Some(key),
      | Self::Unselected => None
    }
  }

  pub fn is_selected(self) -> bool {
    matches!(self, Self::Selected(_))
  }
}
