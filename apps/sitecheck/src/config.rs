use std::{env, fmt, fs, path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::monitoring::types::{DEFAULT_MIN_CERT_DAYS, Target};

/// Object key used when `S3DATA_KEY` is unset
pub const DEFAULT_S3_KEY: &str = "sitecheck-data";

/// Region used when `S3DATA_REGION` is unset
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Twilio credentials and numbers
#[derive(Clone, PartialEq, Eq)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

/// Slack incoming webhook
#[derive(Clone, PartialEq, Eq)]
pub struct SlackConfig {
    pub webhook_url: String,
}

/// Remote snapshot location and credentials
#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub key: String,
    /// Endpoint of an S3-compatible service; AWS when unset
    pub endpoint: Option<String>,
}

// Secrets stay out of debug output
impl fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig").finish_non_exhaustive()
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("key", &self.key)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Environment-derived settings, assembled once at startup.
///
/// Each optional group is present only when every variable it needs is set
/// and non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub sms: Option<SmsConfig>,
    pub slack: Option<SlackConfig>,
    pub s3: Option<S3Config>,
    /// Local snapshot file, used when no S3 bucket is configured
    pub state_file: Option<path::PathBuf>,
}

impl Config {
    /// Read the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable lookup
    ///
    /// ```rust
    /// let cfg = sitecheck::config::Config::from_lookup(|_| None);
    /// assert!(cfg.sms.is_none());
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let sms = (|| {
            Some(SmsConfig {
                account_sid: get("TWILIO_ACCOUNT_SID")?,
                auth_token: get("TWILIO_AUTH_TOKEN")?,
                from_number: get("TWILIO_FROM_NUMBER")?,
                to_number: get("TWILIO_TO_NUMBER")?,
            })
        })();

        let slack = get("SLACK_WEBHOOK").map(|webhook_url| SlackConfig { webhook_url });

        let s3 = (|| {
            Some(S3Config {
                access_key: get("AWS_ACCESS_KEY_ID")?,
                secret_key: get("AWS_SECRET_ACCESS_KEY")?,
                bucket: get("S3DATA_BUCKET")?,
                region: get("S3DATA_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                key: get("S3DATA_KEY").unwrap_or_else(|| DEFAULT_S3_KEY.to_string()),
                endpoint: get("S3DATA_ENDPOINT"),
            })
        })();

        let state_file = get("SITECHECK_STATE_FILE").map(path::PathBuf::from);

        Self { sms, slack, s3, state_file }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let enabled = |on: bool| if on { "enabled" } else { "disabled" };

        let write_1 = write_indented(1);

        writeln!(f, "Current Configuration State:")?;
        write_1(f, "SMS", &enabled(self.sms.is_some()))?;
        write_1(f, "Slack", &enabled(self.slack.is_some()))?;
        match (&self.s3, &self.state_file) {
            (Some(s3), _) => write_1(f, "State", &format_args!("s3://{}/{}", s3.bucket, s3.key))?,
            (None, Some(path)) => write_1(f, "State", &path.display())?,
            (None, None) => write_1(f, "State", &"disabled")?,
        }

        Ok(())
    }
}

fn default_min_cert_days() -> i64 {
    DEFAULT_MIN_CERT_DAYS
}

/// The targets file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sites {
    /// Certificate threshold for targets without their own
    #[serde(default = "default_min_cert_days")]
    pub default_min_cert_days: i64,

    #[serde(default, rename = "target")]
    pub targets: Vec<Target>,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default sites path ($XDG_CONFIG_HOME/sitecheck/sites.toml or
/// $HOME/.config/...)
pub fn default_sites_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::PathUnavailable);
    };

    Ok(path.join("sitecheck/sites.toml"))
}

impl Sites {
    /// Load and validate the sites file at `optional_path`, or the default
    /// location when none is given
    pub fn from_path(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let sites_path = match optional_path {
            Some(path) => normalize_toml_path(path.as_ref()),
            None => default_sites_path()?,
        };

        let raw_string = fs::read_to_string(&sites_path)
            .map_err(|source| ConfigError::Read { path: sites_path.clone(), source })?;
        Self::from_toml_str(&raw_string)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let sites: Self = toml::from_str(raw)?;
        sites.validate()?;
        Ok(sites)
    }

    /// Reject targets the checker could never evaluate
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        for target in &self.targets {
            let url = Url::parse(&target.url).map_err(|e| ConfigError::InvalidUrl {
                url: target.url.clone(),
                reason: e.to_string(),
            })?;

            match url.scheme() {
                "http" | "https" => {}
                other => {
                    return Err(ConfigError::InvalidUrl {
                        url: target.url.clone(),
                        reason: format!("unsupported scheme {}", other),
                    });
                }
            }

            if url.host_str().is_none() {
                return Err(ConfigError::InvalidUrl {
                    url: target.url.clone(),
                    reason: "missing host".to_string(),
                });
            }

            if let Some(pattern) = &target.contents {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    url: target.url.clone(),
                    source,
                })?;
            }

            let days = target.min_cert_days.unwrap_or(self.default_min_cert_days);
            if days < 0 {
                return Err(ConfigError::InvalidThreshold { url: target.url.clone(), days });
            }
        }

        Ok(())
    }
}
