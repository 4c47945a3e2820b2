//! OWASP ZAP scanning backend.
//!
//! Runs one of the packaged ZAP scan scripts inside a docker container with
//! capped resources, enforces a wall-clock limit on top of ZAP's own time
//! budget, and classifies the run by whether the JSON report artifact was
//! produced. The container image is pulled at most once per process, shared
//! across all workers.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::backends::process::run_with_interrupt;
use crate::core::{
    AlertLevel, ScanError, ScanFailure, ScanOutcome, ScanReport, Scanner, ScannerKind,
};

/// Default docker image for ZAP.
pub const DEFAULT_ZAP_IMAGE: &str = "ghcr.io/zaproxy/zaproxy:stable";

/// Name of the report artifact inside the scan workdir.
const REPORT_NAME: &str = "zap-report.json";

/// Slack added on top of ZAP's own time budget before the process is
/// considered hung.
const TIMEOUT_MARGIN: Duration = Duration::from_secs(60);

/// Mapping of alert levels to ZAP risk codes.
const RISK_CODES: [(AlertLevel, &str); 4] = [
    (AlertLevel::Info, "0"),
    (AlertLevel::Low, "1"),
    (AlertLevel::Medium, "2"),
    (AlertLevel::High, "3"),
];

/// The ZAP scan profile to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZapScanType {
    /// Passive baseline scan (`zap-baseline.py`).
    Baseline,
    /// Full active scan (`zap-full-scan.py`).
    Full,
    /// API scan (`zap-api-scan.py`).
    Api,
}

impl ZapScanType {
    /// Returns the scan script packaged in the ZAP image.
    pub fn script(&self) -> &'static str {
        match self {
            Self::Baseline => "zap-baseline.py",
            Self::Full => "zap-full-scan.py",
            Self::Api => "zap-api-scan.py",
        }
    }
}

impl fmt::Display for ZapScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => write!(f, "base"),
            Self::Full => write!(f, "full"),
            Self::Api => write!(f, "api"),
        }
    }
}

impl FromStr for ZapScanType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Self::Baseline),
            "full" => Ok(Self::Full),
            "api" => Ok(Self::Api),
            other => Err(ScanError::configuration(format!(
                "unknown zap scan type '{other}' (expected base, full or api)"
            ))),
        }
    }
}

/// ZAP scanner configuration.
#[derive(Debug, Clone)]
pub struct ZapConfig {
    /// Path to the docker binary.
    pub docker_binary: PathBuf,

    /// Container image to run.
    pub image: String,

    /// Which scan script to run.
    pub scan_type: ZapScanType,

    /// Time budget handed to ZAP itself (in whole minutes).
    pub time_limit: Duration,

    /// How long to wait after the interrupt before force-killing.
    pub grace_period: Duration,

    /// Container memory cap, docker syntax.
    pub memory_limit: String,

    /// Container CPU share, docker syntax.
    pub cpus: String,

    /// Severity levels to keep in reports. Empty keeps all levels.
    pub levels: BTreeSet<AlertLevel>,
}

impl Default for ZapConfig {
    fn default() -> Self {
        Self {
            docker_binary: PathBuf::from("/usr/bin/docker"),
            image: DEFAULT_ZAP_IMAGE.to_string(),
            scan_type: ZapScanType::Full,
            time_limit: Duration::from_secs(300),
            grace_period: Duration::from_secs(30),
            memory_limit: "2g".to_string(),
            cpus: "1".to_string(),
            levels: BTreeSet::from([AlertLevel::High]),
        }
    }
}

impl ZapConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the docker binary path.
    pub fn with_docker_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.docker_binary = path.into();
        self
    }

    /// Sets the container image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Sets the scan profile.
    pub fn with_scan_type(mut self, scan_type: ZapScanType) -> Self {
        self.scan_type = scan_type;
        self
    }

    /// Sets ZAP's time budget.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Sets the post-interrupt grace period.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Sets the severity levels to keep in reports.
    pub fn with_levels(mut self, levels: BTreeSet<AlertLevel>) -> Self {
        self.levels = levels;
        self
    }

    /// Hard wall-clock limit for the whole container run.
    pub fn process_timeout(&self) -> Duration {
        self.time_limit + TIMEOUT_MARGIN
    }
}

/// OWASP ZAP scanner implementation.
///
/// # Example
///
/// ```rust,ignore
/// use scanherd::backends::zap::{ZapConfig, ZapScanner, ZapScanType};
///
/// let scanner = ZapScanner::new(
///     ZapConfig::default().with_scan_type(ZapScanType::Baseline),
/// );
/// ```
#[derive(Debug)]
pub struct ZapScanner {
    config: ZapConfig,
}

impl ZapScanner {
    /// Creates a new ZAP scanner with the given configuration.
    pub fn new(config: ZapConfig) -> Self {
        Self { config }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &ZapConfig {
        &self.config
    }

    fn command(&self, workdir: &Path, target: &str) -> Command {
        let minutes = (self.config.time_limit.as_secs() / 60).max(1);
        let mut command = Command::new(&self.config.docker_binary);
        command
            .arg("run")
            .arg("--rm")
            .arg("--volume")
            .arg(format!("{}:/zap/wrk", workdir.display()))
            .arg(format!("--memory={}", self.config.memory_limit))
            .arg(format!("--cpus={}", self.config.cpus))
            .arg(&self.config.image)
            .arg(self.config.scan_type.script())
            .arg("-m")
            .arg(minutes.to_string())
            .arg("-t")
            .arg(target)
            .arg("-J")
            .arg(REPORT_NAME);
        command
    }

    fn failure(&self, target: &str, message: impl Into<String>, output: String) -> ScanOutcome {
        ScanOutcome::Failed(ScanFailure::new(ScannerKind::Zap, target, message, output))
    }
}

#[async_trait]
impl Scanner for ZapScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Zap
    }

    async fn scan(&self, target: &str) -> Result<ScanOutcome, ScanError> {
        if target.is_empty() {
            return Err(ScanError::EmptyTarget);
        }

        ensure_image_pulled(&self.config.docker_binary, &self.config.image).await;

        let workdir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => {
                return Ok(self.failure(
                    target,
                    format!("failed to create scan workdir: {err}"),
                    String::new(),
                ))
            }
        };
        let report_path = workdir.path().join(REPORT_NAME);
        let command = self.command(workdir.path(), target);

        tracing::info!(target, "starting zap scan");
        tracing::debug!(?command, "running scan container");
        let started = Instant::now();
        let output = match run_with_interrupt(
            command,
            self.config.process_timeout(),
            self.config.grace_period,
        )
        .await
        {
            Ok(output) => output,
            Err(err) => {
                return Ok(self.failure(
                    target,
                    format!("failed to launch scan container: {err}"),
                    String::new(),
                ))
            }
        };

        if output.timed_out {
            tracing::warn!(
                target,
                timeout_secs = self.config.process_timeout().as_secs(),
                "scan had not finished in time and was interrupted"
            );
        }
        let elapsed = started.elapsed();
        tracing::info!(
            target,
            minutes = elapsed.as_secs() / 60,
            seconds = elapsed.as_secs() % 60,
            "finished zap scan"
        );

        if !report_path.exists() {
            return Ok(self.failure(
                target,
                "ZAP JSON report was not produced",
                output.combined(),
            ));
        }

        let raw_text = match tokio::fs::read_to_string(&report_path).await {
            Ok(text) => text,
            Err(err) => {
                return Ok(self.failure(
                    target,
                    format!("failed to read ZAP report: {err}"),
                    output.combined(),
                ))
            }
        };
        let raw: Value = match serde_json::from_str(&raw_text) {
            Ok(value) => value,
            Err(err) => {
                return Ok(self.failure(
                    target,
                    format!("unparsable ZAP report: {err}"),
                    output.combined(),
                ))
            }
        };

        let findings = filter_alerts(&raw, &self.config.levels);
        Ok(ScanOutcome::Report(ScanReport::new(
            ScannerKind::Zap,
            target,
            raw,
            self.config.levels.clone(),
            findings,
        )))
    }
}

/// Extracts the alerts matching `levels` from a raw ZAP report.
///
/// An empty level set keeps every alert, whatever its risk code.
fn filter_alerts(raw: &Value, levels: &BTreeSet<AlertLevel>) -> Vec<Value> {
    let codes: BTreeSet<&str> = RISK_CODES
        .iter()
        .filter(|(level, _)| levels.is_empty() || levels.contains(level))
        .map(|(_, code)| *code)
        .collect();

    let mut findings = Vec::new();
    let Some(sites) = raw.get("site").and_then(Value::as_array) else {
        return findings;
    };
    for site in sites {
        let Some(alerts) = site.get("alerts").and_then(Value::as_array) else {
            continue;
        };
        findings.extend(
            alerts
                .iter()
                .filter(|alert| {
                    alert
                        .get("riskcode")
                        .and_then(Value::as_str)
                        .is_some_and(|code| codes.contains(code))
                })
                .cloned(),
        );
    }
    findings
}

/// One pull per image per process, shared across all workers.
static PULLED_IMAGES: Lazy<Mutex<HashMap<String, Arc<OnceCell<()>>>>> =
    Lazy::new(Default::default);

async fn ensure_image_pulled(docker: &Path, image: &str) {
    let cell = {
        let mut pulled = PULLED_IMAGES
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(pulled.entry(image.to_string()).or_default())
    };
    cell.get_or_init(|| async {
        tracing::info!(image, "pulling scanner image");
        match Command::new(docker).arg("pull").arg(image).output().await {
            Ok(output) if output.status.success() => {}
            Ok(output) => tracing::warn!(
                image,
                code = ?output.status.code(),
                "image pull failed; a locally cached image may still be usable"
            ),
            Err(err) => tracing::warn!(image, error = %err, "could not invoke docker to pull image"),
        }
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> Value {
        json!({
            "site": [
                {
                    "alerts": [
                        {"riskcode": "0", "name": "server header"},
                        {"riskcode": "1", "name": "cookie flags"},
                        {"riskcode": "2", "name": "csp missing"},
                        {"riskcode": "3", "name": "sql injection"},
                    ]
                },
                {
                    "alerts": [
                        {"riskcode": "3", "name": "xss"},
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_filter_alerts_by_level() {
        let raw = sample_report();
        let high_only = filter_alerts(&raw, &BTreeSet::from([AlertLevel::High]));
        assert_eq!(high_only.len(), 2);
        assert!(high_only
            .iter()
            .all(|alert| alert["riskcode"] == "3"));

        let medium_up = filter_alerts(
            &raw,
            &BTreeSet::from([AlertLevel::Medium, AlertLevel::High]),
        );
        assert_eq!(medium_up.len(), 3);
    }

    #[test]
    fn test_empty_level_set_keeps_everything() {
        let raw = sample_report();
        let all = filter_alerts(&raw, &BTreeSet::new());
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_filter_alerts_tolerates_missing_fields() {
        let raw = json!({"unexpected": true});
        assert!(filter_alerts(&raw, &BTreeSet::new()).is_empty());

        let raw = json!({"site": [{"no_alerts_here": []}]});
        assert!(filter_alerts(&raw, &BTreeSet::from([AlertLevel::High])).is_empty());
    }

    #[test]
    fn test_scan_type_parsing_and_scripts() {
        assert_eq!("full".parse::<ZapScanType>().unwrap(), ZapScanType::Full);
        assert_eq!("base".parse::<ZapScanType>().unwrap(), ZapScanType::Baseline);
        assert_eq!("api".parse::<ZapScanType>().unwrap(), ZapScanType::Api);
        assert!("quick".parse::<ZapScanType>().is_err());

        assert_eq!(ZapScanType::Full.script(), "zap-full-scan.py");
        assert_eq!(ZapScanType::Baseline.script(), "zap-baseline.py");
        assert_eq!(ZapScanType::Api.script(), "zap-api-scan.py");
    }

    #[test]
    fn test_command_construction() {
        let scanner = ZapScanner::new(ZapConfig::default());
        let command = scanner.command(Path::new("/tmp/work"), "https://example.com");
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "run",
                "--rm",
                "--volume",
                "/tmp/work:/zap/wrk",
                "--memory=2g",
                "--cpus=1",
                DEFAULT_ZAP_IMAGE,
                "zap-full-scan.py",
                "-m",
                "5",
                "-t",
                "https://example.com",
                "-J",
                "zap-report.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_target_is_a_configuration_error() {
        let scanner = ZapScanner::new(ZapConfig::default());
        let result = scanner.scan("").await;
        assert!(matches!(result, Err(ScanError::EmptyTarget)));
    }

    #[tokio::test]
    async fn test_unlaunchable_container_folds_into_failure() {
        let config = ZapConfig::default()
            .with_docker_binary("/nonexistent/docker")
            .with_image("scanherd-test-image-never-pulled");
        let scanner = ZapScanner::new(config);
        let outcome = scanner.scan("https://example.com").await.unwrap();
        match outcome {
            ScanOutcome::Failed(failure) => {
                assert!(failure.message.contains("failed to launch"));
            }
            ScanOutcome::Report(_) => panic!("expected a failure"),
        }
    }
}
