use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::granularity::Granularity;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        let key = k.trim();
        if key.is_empty() {
            return Err(anyhow!("empty key in override: {s}"));
        }
        Ok(Self {
            key: key.to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "agenda",
    version,
    about = "Clinic agenda calendar: day, week and month views of an appointment snapshot",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Config file; defaults to $AGENDA_CONFIG or ~/.config/agenda/agenda.toml.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Appointment snapshot (JSON array, envelope or JSON lines).
    #[arg(long = "events", value_name = "FILE")]
    pub events: Option<PathBuf>,

    #[arg(
        long = "view",
        value_name = "day|week|month",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Granularity>())
    )]
    pub view: Option<Granularity>,

    /// today, tomorrow, yesterday, a weekday name, +3d, -1w, YYYY-MM-DD or YYYY-MM.
    #[arg(long = "date", value_name = "EXPR")]
    pub date: Option<String>,

    /// Pages to move from the reference date; negative goes back.
    #[arg(long = "shift", value_name = "N", allow_hyphen_values = true, default_value_t = 0)]
    pub shift: i32,

    /// Day of the shown month whose appointments are listed.
    #[arg(long = "select", value_name = "DAY")]
    pub select: Option<u32>,

    /// Pretend the current instant is this RFC 3339 timestamp.
    #[arg(
        long = "now",
        value_name = "RFC3339",
        value_parser = clap::builder::ValueParser::new(parse_now)
    )]
    pub now: Option<DateTime<Utc>>,
}

impl GlobalCli {
    pub fn overrides(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.rc_overrides
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone()))
    }
}

fn parse_now(s: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid --now timestamp: {s}"))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{GlobalCli, KeyVal};
    use crate::granularity::Granularity;

    #[test]
    fn parses_navigation_flags() {
        let cli = GlobalCli::try_parse_from([
            "agenda",
            "-vv",
            "--view",
            "Week",
            "--date",
            "2024-11-15",
            "--shift",
            "-2",
            "--rc",
            "timezone=UTC",
            "--now",
            "2024-11-15T13:20:00Z",
        ])
        .expect("parse args");

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.view, Some(Granularity::Week));
        assert_eq!(cli.date.as_deref(), Some("2024-11-15"));
        assert_eq!(cli.shift, -2);
        assert_eq!(
            cli.overrides().collect::<Vec<_>>(),
            vec![("timezone".to_string(), "UTC".to_string())]
        );
        assert_eq!(
            cli.now.map(|now| now.to_rfc3339()).as_deref(),
            Some("2024-11-15T13:20:00+00:00")
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(GlobalCli::try_parse_from(["agenda", "--view", "year"]).is_err());
        assert!(GlobalCli::try_parse_from(["agenda", "--now", "yesterday"]).is_err());
        assert!("novalue".parse::<KeyVal>().is_err());
        assert!("=x".parse::<KeyVal>().is_err());
    }
}
