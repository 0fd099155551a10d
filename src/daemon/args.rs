use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "feedblock-daemon", version, about = "Content surface of feedblock")]
pub struct DaemonArgs {
    /// Run in the current process instead of detaching.
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Page the browser shows when the daemon starts.
    #[arg(long, default_value = "/home")]
    pub path: String,
    /// How often the stylesheet is checked against the stored state.
    #[arg(
        long = "interval-ms",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::DaemonArgs;

    #[test]
    fn zero_interval_is_rejected() {
        assert!(DaemonArgs::try_parse_from(["feedblock-daemon", "--interval-ms", "0"]).is_err());

        let args = DaemonArgs::try_parse_from(["feedblock-daemon", "--interval-ms", "250"]).unwrap();
        assert_eq!(args.interval_ms, 250);
        assert_eq!(args.path, "/home");
    }
}
