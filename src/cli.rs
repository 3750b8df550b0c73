use std::path::PathBuf;

use clap::Parser;

use crate::domain::{DEFAULT_LOG_FILE, DEFAULT_SOURCE, DashConfig, DashError};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "userdash",
    version,
    about = "Terminal dashboard for user records",
    long_about = "Fetches a list of user records from a REST endpoint (or a local JSON file) and shows signup statistics and a searchable, sortable user table.\n\nExamples:\n  userdash\n  userdash --source ~/snapshots/users.json\n  RUST_LOG=debug userdash --source https://host/api/users --timeout 5"
)]
pub struct Args {
    #[arg(
        short = 's',
        long = "source",
        value_name = "URL|FILE",
        default_value = DEFAULT_SOURCE,
        help_heading = "Input",
        help = "REST endpoint or JSON file holding the user list."
    )]
    pub source: String,

    #[arg(
        short = 't',
        long = "timeout",
        value_name = "SECONDS",
        default_value_t = 15,
        help_heading = "Input",
        help = "HTTP request timeout."
    )]
    pub timeout: u64,

    #[arg(
        short = 'n',
        long = "recent",
        value_name = "COUNT",
        default_value_t = 5,
        help_heading = "Display",
        help = "Number of recently joined users on the dashboard."
    )]
    pub recent: usize,

    #[arg(
        long = "poll-ms",
        value_name = "MS",
        default_value_t = 100,
        help_heading = "Display",
        help = "How long to wait for a key press before redrawing."
    )]
    pub poll_ms: u64,

    #[arg(
        short = 'l',
        long = "log-file",
        value_name = "FILE",
        default_value = DEFAULT_LOG_FILE,
        help_heading = "Output",
        help = "File receiving the log output (filter with RUST_LOG)."
    )]
    pub log_file: String,
}

impl Args {
    pub fn dash_config(&self) -> Result<DashConfig, DashError> {
        if self.source.trim().is_empty() {
            return Err(DashError::InvalidConfig("--source must not be empty".into()));
        }
        if self.poll_ms == 0 {
            return Err(DashError::InvalidConfig("--poll-ms must be at least 1".into()));
        }
        if self.timeout == 0 {
            return Err(DashError::InvalidConfig("--timeout must be at least 1".into()));
        }
        Ok(DashConfig::default()
            .source(self.source.trim())
            .event_poll_time(self.poll_ms)
            .recent_count(self.recent)
            .request_timeout(self.timeout))
    }

    pub fn log_path(&self) -> Result<PathBuf, DashError> {
        let expanded = shellexpand::full(&self.log_file)
            .map_err(|e| DashError::InvalidConfig(format!("--log-file: {e}")))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("userdash").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_config_defaults() {
        let cfg = parse(&[]).dash_config().unwrap();
        let default = DashConfig::default();
        assert_eq!(cfg.source, default.source);
        assert_eq!(cfg.event_poll_time, default.event_poll_time);
        assert_eq!(cfg.recent_count, default.recent_count);
        assert_eq!(cfg.request_timeout, default.request_timeout);
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = parse(&["--source", "users.json", "--recent", "3", "-t", "2"])
            .dash_config()
            .unwrap();
        assert_eq!(cfg.source, "users.json");
        assert_eq!(cfg.recent_count, 3);
        assert_eq!(cfg.request_timeout, 2);
    }

    #[test]
    fn zero_poll_time_is_rejected() {
        let result = parse(&["--poll-ms", "0"]).dash_config();
        assert!(matches!(result, Err(DashError::InvalidConfig(_))));
    }

    #[test]
    fn log_path_is_expanded() {
        let path = parse(&["--log-file", "/tmp/userdash.log"]).log_path().unwrap();
        assert_eq!(path, PathBuf::from("/tmp/userdash.log"));

        let broken = parse(&["--log-file", "$USERDASH_SURELY_UNSET_VAR/x.log"]).log_path();
        assert!(matches!(broken, Err(DashError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_non_numeric_values() {
        let result = Args::try_parse_from(["userdash", "--recent", "many"]);
        assert!(result.is_err());
    }
}
