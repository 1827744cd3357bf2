use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{info, warn};

use crate::event::{Normalized, normalize_records};

/// Reads an appointment snapshot and normalizes it. A missing file is an
/// empty snapshot; malformed records are rejected one by one.
#[tracing::instrument(skip(tz), fields(path = %path.display()))]
pub fn load_snapshot(path: &Path, tz: Tz) -> anyhow::Result<Normalized> {
    if !path.exists() {
        warn!(path = %path.display(), "snapshot file not found; rendering empty calendar");
        return Ok(Normalized::default());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let normalized = parse_snapshot(&text, tz)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;

    info!(
        path = %path.display(),
        events = normalized.events.len(),
        rejected = normalized.rejected_count(),
        "loaded snapshot"
    );
    Ok(normalized)
}

/// Accepts a JSON array of rows, a `{ "data": [...] }` envelope, or one JSON
/// object per line.
pub fn parse_snapshot(text: &str, tz: Tz) -> anyhow::Result<Normalized> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Normalized::default());
    }

    let records = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(rows)) => rows,
        Ok(Value::Object(mut envelope)) => match envelope.remove("data") {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) | None
                if envelope.get("error").is_some_and(|err| !err.is_null()) =>
            {
                return Err(anyhow!(
                    "snapshot carries a backend error: {}",
                    envelope.get("error").cloned().unwrap_or(Value::Null)
                ));
            }
            Some(_) | None => vec![Value::Object(envelope)],
        },
        Ok(other) => {
            return Err(anyhow!(
                "expected an array of appointments, got {}",
                kind_of(&other)
            ));
        }
        Err(_) => parse_lines(trimmed)?,
    };

    Ok(normalize_records(records, tz))
}

fn parse_lines(text: &str) -> anyhow::Result<Vec<Value>> {
    let mut rows = Vec::new();
    let mut first_error = None;
    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => rows.push(value),
            Err(err) => {
                warn!(line = line_num + 1, error = %err, "skipping unparseable snapshot line");
                rows.push(Value::Null);
                first_error.get_or_insert(err);
            }
        }
    }

    if rows.iter().all(Value::is_null)
        && let Some(err) = first_error
    {
        return Err(err).context("snapshot is neither JSON nor JSON lines");
    }
    Ok(rows)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{NaiveDate, Weekday};
    use chrono_tz::America::Sao_Paulo;
    use tempfile::tempdir;

    use super::{load_snapshot, parse_snapshot};
    use crate::granularity::Granularity;
    use crate::grid::derive_grid;
    use crate::partition::{BucketKey, partition};

    #[test]
    fn reads_array_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("events.json");
        fs::write(
            &path,
            r#"[
              {"id": "1", "date": "2024-11-15", "time": "09:00", "patient_name": "Maria Santos"},
              {"id": "2", "date": "2024-11-15"}
            ]"#,
        )
        .expect("write snapshot");

        let normalized = load_snapshot(&path, Sao_Paulo).expect("load snapshot");
        assert_eq!(normalized.events.len(), 1);
        assert_eq!(normalized.rejected_count(), 1);
    }

    #[test]
    fn missing_file_is_empty() {
        let temp = tempdir().expect("tempdir");
        let normalized =
            load_snapshot(&temp.path().join("nope.json"), Sao_Paulo).expect("load snapshot");
        assert!(normalized.events.is_empty());
    }

    #[test]
    fn accepts_envelope_and_json_lines() {
        let envelope = parse_snapshot(
            r#"{"data": [{"id": 1, "start_datetime": "2024-11-15T09:00:00-03:00"}], "error": null}"#,
            Sao_Paulo,
        )
        .expect("envelope");
        assert_eq!(envelope.events.len(), 1);

        let lines = parse_snapshot(
            "{\"id\": 1, \"date\": \"2024-11-15\", \"time\": \"09:00\"}\n\
             not json\n\
             {\"id\": 2, \"date\": \"2024-11-16\", \"time\": \"10:30\"}\n",
            Sao_Paulo,
        )
        .expect("json lines");
        assert_eq!(lines.events.len(), 2);
        assert_eq!(lines.rejected_count(), 1);
        assert_eq!(lines.rejected[0].index, 1);
    }

    #[test]
    fn garbage_first_line_keeps_later_records() {
        let lines = parse_snapshot(
            "garbage line\n\
             {\"id\": 1, \"date\": \"2024-11-15\", \"time\": \"09:00\"}\n\
             {\"id\": 2, \"date\": \"2024-11-15\", \"time\": \"14:00\"}\n",
            Sao_Paulo,
        )
        .expect("json lines");
        assert_eq!(lines.events.len(), 2);
        assert_eq!(lines.rejected_count(), 1);
        assert_eq!(lines.rejected[0].index, 0);

        assert!(parse_snapshot("garbage\nmore garbage\n", Sao_Paulo).is_err());
    }

    #[test]
    fn non_text_display_values_still_land_in_buckets() {
        let normalized = parse_snapshot(
            r#"[{"id": 1, "date": "2024-11-15", "time": "09:00", "type": 3}]"#,
            Sao_Paulo,
        )
        .expect("array");
        assert_eq!(normalized.rejected_count(), 0);

        let grid = derive_grid(
            NaiveDate::from_ymd_opt(2024, 11, 15).expect("valid date"),
            Granularity::Month,
            Weekday::Sun,
        );
        let buckets = partition(&normalized.events, &grid, Sao_Paulo);
        let day = buckets.get(BucketKey::Day(15));
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].display.category, "3");
    }

    #[test]
    fn backend_error_envelope_fails() {
        assert!(
            parse_snapshot(r#"{"data": null, "error": {"message": "denied"}}"#, Sao_Paulo)
                .is_err()
        );
        assert!(parse_snapshot("42", Sao_Paulo).is_err());
    }
}
