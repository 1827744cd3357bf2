use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, Weekday};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::datetime::{add_days, first_day_of_month};
use crate::event::{AppointmentStatus, Event};
use crate::grid::GridShape;
use crate::partition::BucketKey;
use crate::view::ViewFrame;

const MONTH_CELL_WIDTH: usize = 10;
const WEEK_CELL_WIDTH: usize = 14;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(granularity = %frame.granularity))]
    pub fn write_frame<W: Write>(
        &self,
        mut out: W,
        frame: &ViewFrame<'_>,
        rejected: usize,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&frame.title, "1"))?;
        writeln!(out)?;

        match &frame.grid {
            GridShape::Month {
                year,
                month,
                leading_blanks,
                day_count,
            } => self.write_month(&mut out, frame, *year, *month, *leading_blanks, *day_count)?,
            GridShape::Week { dates } => self.write_week(&mut out, frame, dates)?,
            GridShape::Day { hours, .. } => self.write_day(&mut out, frame, hours)?,
        }

        writeln!(out)?;
        self.write_summary(&mut out, frame, rejected)?;

        if let Some(title) = frame.selected_title() {
            writeln!(out)?;
            self.write_details(&mut out, frame, &title)?;
        }

        Ok(())
    }

    fn write_month<W: Write>(
        &self,
        out: &mut W,
        frame: &ViewFrame<'_>,
        year: i32,
        month: u32,
        leading_blanks: u32,
        day_count: u32,
    ) -> anyhow::Result<()> {
        for label in weekday_labels(frame.week_start) {
            write!(out, "{}", pad(label, MONTH_CELL_WIDTH))?;
        }
        writeln!(out)?;

        let first = first_day_of_month(year, month);
        let mut column = 0;
        for _ in 0..leading_blanks {
            write!(out, "{}", pad("", MONTH_CELL_WIDTH))?;
            column += 1;
        }

        for day in 1..=day_count {
            let date = add_days(first, i64::from(day) - 1);
            let preview = frame
                .partition
                .preview(BucketKey::Day(day), frame.marker_limit);

            let mut cell = if frame.is_today(date) {
                format!("{day:>2}*")
            } else {
                format!("{day:>2} ")
            };
            for event in preview.shown {
                cell.push(status_marker(event.display.status));
            }
            if preview.overflow > 0 {
                cell.push_str(&format!("+{}", preview.overflow));
            }

            let cell = pad(&cell, MONTH_CELL_WIDTH);
            if frame.is_today(date) {
                write!(out, "{}", self.paint(&cell, "1;33"))?;
            } else {
                write!(out, "{cell}")?;
            }

            column += 1;
            if column % 7 == 0 {
                writeln!(out)?;
            }
        }
        if column % 7 != 0 {
            writeln!(out)?;
        }

        Ok(())
    }

    fn write_week<W: Write>(
        &self,
        out: &mut W,
        frame: &ViewFrame<'_>,
        dates: &[chrono::NaiveDate; 7],
    ) -> anyhow::Result<()> {
        write!(out, "{}", pad("", 7))?;
        for date in dates {
            let header = format!("{} {}", date.format("%a"), date.day());
            let header = pad(&header, WEEK_CELL_WIDTH);
            if frame.is_today(*date) {
                write!(out, "{}", self.paint(&header, "1;33"))?;
            } else {
                write!(out, "{header}")?;
            }
        }
        writeln!(out)?;

        for hour in 0..24 {
            write!(out, "{}  ", format_hour(hour))?;
            for column in 0..7u32 {
                let preview = frame.partition.preview(BucketKey::Slot { column, hour }, 1);
                let cell = match preview.shown.first() {
                    Some(event) if preview.overflow > 0 => {
                        format!("{} +{}", event.display.subject, preview.overflow)
                    }
                    Some(event) => event.display.subject.clone(),
                    None => String::new(),
                };
                write!(out, "{}", pad(&cell, WEEK_CELL_WIDTH))?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    fn write_day<W: Write>(
        &self,
        out: &mut W,
        frame: &ViewFrame<'_>,
        hours: &[u32],
    ) -> anyhow::Result<()> {
        let is_today = frame.is_today(frame.reference);
        for &hour in hours {
            let label = format_hour(hour);
            let label = if is_today && hour == frame.current_hour {
                self.paint(&label, "1;33")
            } else {
                label
            };

            let events = frame.partition.get(BucketKey::Hour(hour));
            if events.is_empty() {
                writeln!(out, "{label}")?;
                continue;
            }

            let entries = events
                .iter()
                .map(|event| event_line(event, frame))
                .collect::<Vec<_>>()
                .join("; ");
            writeln!(out, "{label}  {entries}")?;
        }
        Ok(())
    }

    fn write_summary<W: Write>(
        &self,
        out: &mut W,
        frame: &ViewFrame<'_>,
        rejected: usize,
    ) -> anyhow::Result<()> {
        let summary = &frame.summary;
        writeln!(
            out,
            "{} appointments: {} confirmed, {} pending, {} completed, {} cancelled",
            summary.total, summary.confirmed, summary.pending, summary.completed, summary.cancelled
        )?;
        if rejected > 0 {
            let note = format!("{rejected} malformed records skipped");
            writeln!(out, "{}", self.paint(&note, "31"))?;
        }
        Ok(())
    }

    fn write_details<W: Write>(
        &self,
        out: &mut W,
        frame: &ViewFrame<'_>,
        title: &str,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(title, "1"))?;

        let events = frame.selected_events();
        if events.is_empty() {
            writeln!(out, "No appointments on this day")?;
            return Ok(());
        }

        let noun = if events.len() == 1 {
            "appointment"
        } else {
            "appointments"
        };
        writeln!(out, "{} {noun}", events.len())?;

        let width = events
            .iter()
            .map(|event| UnicodeWidthStr::width(event.display.subject.as_str()))
            .max()
            .unwrap_or(0);
        for event in events {
            let time = event.civil_start(frame.timezone).format("%H:%M");
            let status = self.paint(event.display.status.label(), status_color(event.display.status));
            writeln!(
                out,
                "  {time}  {}  {}  {status}",
                pad(&event.display.subject, width),
                event.display.category,
            )?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn weekday_labels(week_start: Weekday) -> [&'static str; 7] {
    let mut labels = [""; 7];
    let mut day = week_start;
    for label in &mut labels {
        *label = match day {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        };
        day = day.succ();
    }
    labels
}

fn format_hour(hour: u32) -> String {
    format!("{hour:02}:00")
}

fn event_line(event: &Event, frame: &ViewFrame<'_>) -> String {
    let mut line = format!(
        "{} {}",
        event.civil_start(frame.timezone).format("%H:%M"),
        event.display.subject
    );
    if !event.display.category.is_empty() {
        line.push_str(&format!(" ({})", event.display.category));
    }
    line.push_str(&format!(" [{}]", event.display.status.label()));
    line
}

fn status_marker(status: AppointmentStatus) -> char {
    match status {
        AppointmentStatus::Confirmed => '●',
        AppointmentStatus::Completed => '✓',
        AppointmentStatus::Pending | AppointmentStatus::Cancelled => '○',
    }
}

fn status_color(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Confirmed => "32",
        AppointmentStatus::Pending => "33",
        AppointmentStatus::Completed => "36",
        AppointmentStatus::Cancelled => "31",
    }
}

/// Pads or truncates `text` to `width` display columns.
fn pad(text: &str, width: usize) -> String {
    let overflows = UnicodeWidthStr::width(text) > width;
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if overflows && used + w > width.saturating_sub(1) {
            out.push('…');
            used += 1;
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc, Weekday};
    use chrono_tz::America::Sao_Paulo;

    use super::{Renderer, pad, weekday_labels};
    use crate::datetime::FixedClock;
    use crate::event::{AppointmentStatus, DisplayFields, Event};
    use crate::granularity::Granularity;
    use crate::view::{CalendarView, ViewSettings};

    fn appointment(id: &str, day: u32, hour: u32, subject: &str) -> Event {
        let start = Sao_Paulo
            .with_ymd_and_hms(2024, 11, day, hour, 0, 0)
            .single()
            .expect("valid local")
            .with_timezone(&Utc);
        Event::new(
            id,
            start,
            DisplayFields {
                subject: subject.to_string(),
                category: "Consulta".to_string(),
                status: AppointmentStatus::Confirmed,
                notes: None,
            },
        )
    }

    fn view(granularity: Granularity) -> CalendarView<FixedClock> {
        let now = Utc
            .with_ymd_and_hms(2024, 11, 15, 13, 0, 0)
            .single()
            .expect("valid now");
        CalendarView::new(ViewSettings::default(), FixedClock(now), granularity)
    }

    fn render(view: &CalendarView<FixedClock>, events: &[Event], rejected: usize) -> String {
        let frame = view.frame(events);
        let mut buf = Vec::new();
        Renderer::plain()
            .write_frame(&mut buf, &frame, rejected)
            .expect("render frame");
        String::from_utf8(buf).expect("utf8 output")
    }

    #[test]
    fn month_view_shows_markers_and_details() {
        let events = vec![
            appointment("1", 15, 9, "Maria Santos"),
            appointment("2", 15, 14, "Ana Costa"),
            appointment("3", 16, 10, "João Silva"),
        ];
        let mut v = view(Granularity::Month);
        assert!(v.select_day(15));
        let text = render(&v, &events, 2);

        assert!(text.starts_with("November 2024\n"));
        assert!(text.contains("15*●●"));
        assert!(text.contains("16 ●"));
        assert!(text.contains("3 appointments: 3 confirmed"));
        assert!(text.contains("2 malformed records skipped"));
        assert!(text.contains("Friday, 15 November 2024"));
        let nine = text.find("09:00  Maria Santos").expect("maria listed");
        let two = text.find("14:00  Ana Costa").expect("ana listed");
        assert!(nine < two);
    }

    #[test]
    fn day_view_lists_hour_rows() {
        let events = vec![appointment("1", 15, 9, "Maria Santos")];
        let text = render(&view(Granularity::Day), &events, 0);
        assert!(text.contains("09:00  09:00 Maria Santos (Consulta) [Confirmed]"));
        assert!(text.contains("\n23:00\n"));
        assert_eq!(text.lines().filter(|l| l.ends_with(":00")).count(), 23);
    }

    #[test]
    fn week_view_has_seven_columns() {
        let events = vec![appointment("1", 11, 8, "Rita Mendes")];
        let text = render(&view(Granularity::Week), &events, 0);
        assert!(text.starts_with("10 - 16 November 2024\n"));
        assert!(text.contains("Sun 10"));
        assert!(text.contains("Sat 16"));
        assert!(text.contains("Rita Mendes"));
    }

    #[test]
    fn labels_follow_week_start() {
        assert_eq!(weekday_labels(Weekday::Sun)[0], "Sun");
        assert_eq!(weekday_labels(Weekday::Mon)[6], "Sun");
    }

    #[test]
    fn pad_truncates_wide_text() {
        assert_eq!(pad("abc", 5), "abc  ");
        assert_eq!(pad("abcdefgh", 5), "abcd…");
    }
}
