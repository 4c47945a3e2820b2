use std::path::PathBuf;

use clap::Parser;
use scanherd::backends::ZapScanType;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Targets file or directory of program exports (JSON)
    pub targets_data: PathBuf,

    /// Output directory for reports and run logs
    #[arg(short, long, default_value = "./reports")]
    pub outdir: PathBuf,

    /// Number of concurrent scan workers
    #[arg(long, default_value_t = 2)]
    pub workers: usize,

    /// ZAP scan profile (base, full or api)
    #[arg(long, default_value = "full")]
    pub scan_type: ZapScanType,

    /// ZAP time budget per target, in minutes
    #[arg(long, default_value_t = 5)]
    pub time_limit_mins: u64,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}

#[cfg(test)]
mod tests {
    use super::CliOptions;
    use clap::Parser;
    use scanherd::backends::ZapScanType;

    #[test]
    fn parses_defaults() {
        let opts = CliOptions::try_parse_from(["scanherd", "targets.json"]).expect("parse");
        assert_eq!(opts.workers, 2);
        assert_eq!(opts.scan_type, ZapScanType::Full);
        assert_eq!(opts.time_limit_mins, 5);
    }

    #[test]
    fn parses_scan_type() {
        let opts =
            CliOptions::try_parse_from(["scanherd", "targets.json", "--scan-type", "base"])
                .expect("parse");
        assert_eq!(opts.scan_type, ZapScanType::Baseline);
    }

    #[test]
    fn rejects_unknown_scan_type() {
        assert!(
            CliOptions::try_parse_from(["scanherd", "targets.json", "--scan-type", "quick"])
                .is_err()
        );
    }
}
