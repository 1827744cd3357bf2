use crate::event::{
  AppointmentStatus,
  Event
};

/// Per-status counts for the events shown
/// on the current page.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct PeriodSummary {
  pub total:     usize,
  pub confirmed: usize,
  pub pending:   usize,
  pub completed: usize,
  pub cancelled: usize
}

impl PeriodSummary {
  pub fn push(
    &mut self,
    status: AppointmentStatus
  ) {
    self.total =
      self.total.saturating_add(1);
    let slot = match status {
      | AppointmentStatus::Confirmed => {
        &mut self.confirmed
      }
      | AppointmentStatus::Pending => {
        &mut self.pending
      }
      | AppointmentStatus::Completed => {
        &mut self.completed
      }
      | AppointmentStatus::Cancelled => {
        &mut self.cancelled
      }
    };
    *slot = slot.saturating_add(1);
  }

  pub fn count(
    &self,
    status: AppointmentStatus
  ) -> usize {
    match status {
      | AppointmentStatus::Confirmed => {
        self.confirmed
      }
      | AppointmentStatus::Pending => {
        self.pending
      }
      | AppointmentStatus::Completed => {
        self.completed
      }
      | AppointmentStatus::Cancelled => {
        self.cancelled
      }
    }
  }
}

impl<'a> FromIterator<&'a Event>
  for PeriodSummary
{
  fn from_iter<I>(iter: I) -> Self
  where
    I: IntoIterator<Item = &'a Event>
  {
    let mut summary = Self::default();
    for event in iter {
      summary.push(event.display.status);
    }
    summary
  }
}
