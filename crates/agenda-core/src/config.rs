use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::parse_week_start;
use crate::granularity::Granularity;

pub const CONFIG_ENV_VAR: &str =
  "AGENDA_CONFIG";
const CONFIG_FILE_NAME: &str =
  "agenda.toml";
const DEFAULT_SNAPSHOT_FILE: &str =
  "agenda-events.json";

fn default_week_start() -> String {
  "sunday".to_string()
}

fn default_marker_limit() -> usize {
  3
}

fn default_color() -> bool {
  true
}

fn default_view() -> String {
  Granularity::default()
    .as_key()
    .to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub version:      u32,
  #[serde(default)]
  pub timezone:     Option<String>,
  #[serde(default = "default_color")]
  pub color:        bool,
  #[serde(default)]
  pub calendar:     CalendarPolicies,
  #[serde(default)]
  pub snapshot:     SnapshotSection,
  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalendarPolicies {
  #[serde(default = "default_week_start")]
  pub week_start:   String,
  #[serde(
    default = "default_marker_limit"
  )]
  pub marker_limit: usize,
  #[serde(default = "default_view")]
  pub default_view: String
}

#[derive(
  Debug, Clone, Default, PartialEq, Deserialize,
)]
pub struct SnapshotSection {
  #[serde(default)]
  pub path: Option<PathBuf>
}

impl Default for CalendarPolicies {
  fn default() -> Self {
    Self {
      week_start:   default_week_start(),
      marker_limit: default_marker_limit(),
      default_view: default_view()
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      version:      1,
      timezone:     None,
      color:        default_color(),
      calendar:     CalendarPolicies::default(),
      snapshot:     SnapshotSection::default(),
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) = resolve_config_path(
      config_override
    )?
    else {
      warn!(
        "no agenda config found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading agenda config");
    let mut cfg = Self::from_file(&path)?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  pub fn from_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    Self::from_toml(&text).with_context(
      || {
        format!(
          "failed to parse {}",
          path.display()
        )
      }
    )
  }

  pub fn from_toml(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg =
      toml::from_str::<Self>(text)?;
    cfg.sanitize();
    debug!(
      version = cfg.version,
      timezone = ?cfg.timezone,
      week_start = %cfg.calendar.week_start,
      "parsed agenda config"
    );
    Ok(cfg)
  }

  /// Applies `--rc key=value` pairs. The
  /// `rc.` prefix is optional.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      match key.as_str() {
        | "timezone" => {
          self.timezone = Some(v);
        }
        | "color" => {
          self.color = parse_bool(&v);
        }
        | "week_start"
        | "calendar.week_start" => {
          self.calendar.week_start = v;
        }
        | "marker_limit"
        | "calendar.marker_limit" => {
          self.calendar.marker_limit = v
            .trim()
            .parse()
            .with_context(|| {
              format!(
                "invalid marker_limit: {v}"
              )
            })?;
        }
        | "default_view"
        | "calendar.default_view" => {
          self.calendar.default_view = v;
        }
        | "snapshot.path" => {
          self.snapshot.path =
            Some(PathBuf::from(v));
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: {other}"
          ));
        }
      }
    }
    self.sanitize();
    Ok(())
  }

  pub fn week_start(&self) -> Weekday {
    parse_week_start(
      &self.calendar.week_start
    )
    .unwrap_or(Weekday::Sun)
  }

  pub fn default_view(
    &self
  ) -> Granularity {
    Granularity::from_key(
      &self.calendar.default_view
    )
    .unwrap_or_default()
  }

  pub fn snapshot_path(&self) -> PathBuf {
    self
      .snapshot
      .path
      .as_deref()
      .map(expand_tilde)
      .unwrap_or_else(|| {
        PathBuf::from(DEFAULT_SNAPSHOT_FILE)
      })
  }

  fn sanitize(&mut self) {
    if parse_week_start(
      &self.calendar.week_start
    )
    .is_none()
    {
      warn!(
        week_start = %self.calendar.week_start,
        "unsupported week_start; using sunday"
      );
      self.calendar.week_start =
        default_week_start();
    }

    if self.calendar.marker_limit == 0 {
      self.calendar.marker_limit =
        default_marker_limit();
    }

    if Granularity::from_key(
      &self.calendar.default_view
    )
    .is_none()
    {
      warn!(
        default_view = %self.calendar.default_view,
        "unsupported default_view; using month"
      );
      self.calendar.default_view =
        default_view();
    }

    if self
      .timezone
      .as_deref()
      .is_some_and(|tz| tz.trim().is_empty())
    {
      self.timezone = None;
    }
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = env_path.trim();
    if trimmed == "/dev/null" {
      return Ok(None);
    }
    if !trimmed.is_empty() {
      return Ok(Some(PathBuf::from(
        trimmed
      )));
    }
  }

  let Some(config_dir) = dirs::config_dir()
  else {
    debug!(
      "cannot determine config \
       directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join("agenda")
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use chrono::Weekday;

  use super::Config;
  use crate::granularity::Granularity;

  #[test]
  fn defaults_match_agenda_page() {
    let cfg = Config::default();
    assert_eq!(
      cfg.week_start(),
      Weekday::Sun
    );
    assert_eq!(
      cfg.default_view(),
      Granularity::Month
    );
    assert_eq!(
      cfg.calendar.marker_limit,
      3
    );
    assert_eq!(
      cfg.snapshot_path(),
      PathBuf::from("agenda-events.json")
    );
  }

  #[test]
  fn parses_and_sanitizes_toml() {
    let cfg = Config::from_toml(
      r#"
version = 2
timezone = "  "

[calendar]
week_start = "Monday"
marker_limit = 0
default_view = "quarter"

[snapshot]
path = "/tmp/events.json"
"#
    )
    .expect("parse config");
    assert_eq!(cfg.version, 2);
    assert_eq!(cfg.timezone, None);
    assert_eq!(
      cfg.week_start(),
      Weekday::Mon
    );
    assert_eq!(
      cfg.calendar.marker_limit,
      3
    );
    assert_eq!(
      cfg.default_view(),
      Granularity::Month
    );
    assert_eq!(
      cfg.snapshot_path(),
      PathBuf::from("/tmp/events.json")
    );
  }

  #[test]
  fn overrides_replace_values() {
    let mut cfg = Config::default();
    cfg
      .apply_overrides([
        (
          "rc.timezone".to_string(),
          "UTC".to_string()
        ),
        (
          "calendar.week_start".to_string(),
          "mon".to_string()
        ),
        (
          "marker_limit".to_string(),
          "5".to_string()
        ),
        (
          "default_view".to_string(),
          "week".to_string()
        ),
        ("color".to_string(), "off".to_string())
      ])
      .expect("apply overrides");
    assert_eq!(
      cfg.timezone.as_deref(),
      Some("UTC")
    );
    assert_eq!(
      cfg.week_start(),
      Weekday::Mon
    );
    assert_eq!(
      cfg.calendar.marker_limit,
      5
    );
    assert_eq!(
      cfg.default_view(),
      Granularity::Week
    );
    assert!(!cfg.color);

    assert!(
      cfg
        .apply_overrides([(
          "marker_limit".to_string(),
          "many".to_string()
        )])
        .is_err()
    );
    assert!(
      cfg
        .apply_overrides([(
          "colour".to_string(),
          "on".to_string()
        )])
        .is_err()
    );
  }
}
