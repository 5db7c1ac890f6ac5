//! Agent configuration: collector URL plus every cadence knob the sampling
//! machinery uses. Flags take precedence over `HOSTPULSE_*` environment
//! variables, which take precedence over defaults.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("collector url is required (--url <http://host/path>)")]
    MissingUrl,
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Collector endpoint; one POST per publish tick.
    pub url: String,
    /// Sleep between publish ticks, also the outbound request timeout.
    pub publish_interval: Duration,
    /// Period of every rolling-rate sampler loop.
    pub sample_interval: Duration,
    /// Delay before a sampler takes its baseline reading.
    pub settle_delay: Duration,
    /// Entries per rolling rate window.
    pub window_capacity: usize,
    /// Public IP echo endpoint, queried at most once per `ip_lookup_cooldown`.
    pub ip_echo_url: String,
    pub ip_lookup_cooldown: Duration,
    pub login_lookup_cooldown: Duration,
    pub rss_lookup_cooldown: Duration,
    /// Skip TLS certificate verification on outbound requests.
    pub insecure_tls: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            publish_interval: Duration::from_secs(60),
            sample_interval: Duration::from_secs(60),
            settle_delay: Duration::from_secs(2),
            window_capacity: 15,
            ip_echo_url: "https://ip.flysay.com".to_string(),
            ip_lookup_cooldown: Duration::from_secs(2 * 60 * 60),
            login_lookup_cooldown: Duration::from_secs(60),
            // Just under the sampler cadence so a slow subprocess refreshes
            // often without running every tick.
            rss_lookup_cooldown: Duration::from_millis(9_323),
            insecure_tls: false,
        }
    }
}

impl AgentConfig {
    /// Build from CLI args (skipping the program name) layered over env
    /// overrides and defaults. Fails only on a missing URL or an unparsable
    /// numeric value.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, ConfigError> {
        let mut cfg = Self::from_env();
        let mut it = args.into_iter();
        let _ = it.next(); // program name
        while let Some(a) = it.next() {
            match a.as_str() {
                "--url" | "-u" => cfg.url = it.next().unwrap_or_default(),
                "--interval-secs" => {
                    let v = it
                        .next()
                        .and_then(|s| s.parse::<u64>().ok())
                        .ok_or(ConfigError::InvalidValue("--interval-secs"))?;
                    cfg.publish_interval = Duration::from_secs(v);
                }
                "--insecure-tls" => cfg.insecure_tls = true,
                _ if a.starts_with("--url=") => {
                    if let Some((_, v)) = a.split_once('=') {
                        cfg.url = v.to_string();
                    }
                }
                _ => {}
            }
        }
        if cfg.url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        Ok(cfg)
    }

    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_u64("HOSTPULSE_PUBLISH_INTERVAL_SECS") {
            cfg.publish_interval = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("HOSTPULSE_SAMPLE_INTERVAL_SECS") {
            cfg.sample_interval = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("HOSTPULSE_WINDOW_CAPACITY") {
            cfg.window_capacity = (v as usize).max(1);
        }
        if let Some(v) = env_u64("HOSTPULSE_IP_COOLDOWN_SECS") {
            cfg.ip_lookup_cooldown = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("HOSTPULSE_LOGIN_COOLDOWN_SECS") {
            cfg.login_lookup_cooldown = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("HOSTPULSE_RSS_COOLDOWN_MS") {
            cfg.rss_lookup_cooldown = Duration::from_millis(v);
        }
        if let Ok(v) = std::env::var("HOSTPULSE_IP_ECHO_URL") {
            if !v.is_empty() {
                cfg.ip_echo_url = v;
            }
        }
        // Disabling certificate verification takes an explicit opt-in; a
        // set-but-empty variable stays secure.
        if let Ok(v) = std::env::var("HOSTPULSE_INSECURE_TLS") {
            cfg.insecure_tls = matches!(v.as_str(), "1" | "true");
        }
        cfg
    }

    pub fn sample_interval_secs(&self) -> u64 {
        self.sample_interval.as_secs().max(1)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("hostpulse_agent")
            .chain(v.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn default_cadences_match_reference() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.publish_interval, Duration::from_secs(60));
        assert_eq!(cfg.sample_interval, Duration::from_secs(60));
        assert_eq!(cfg.window_capacity, 15);
        assert_eq!(cfg.ip_lookup_cooldown, Duration::from_secs(7200));
        assert_eq!(cfg.login_lookup_cooldown, Duration::from_secs(60));
        assert_eq!(cfg.rss_lookup_cooldown, Duration::from_millis(9_323));
        assert!(!cfg.insecure_tls);
    }

    #[test]
    fn missing_url_is_fatal() {
        assert!(matches!(
            AgentConfig::from_args(args(&[])),
            Err(ConfigError::MissingUrl)
        ));
    }

    #[test]
    fn url_long_short_and_assign() {
        let cfg = AgentConfig::from_args(args(&["--url", "http://c/a"])).unwrap();
        assert_eq!(cfg.url, "http://c/a");
        let cfg = AgentConfig::from_args(args(&["-u", "http://c/b"])).unwrap();
        assert_eq!(cfg.url, "http://c/b");
        let cfg = AgentConfig::from_args(args(&["--url=http://c/c"])).unwrap();
        assert_eq!(cfg.url, "http://c/c");
    }

    #[test]
    fn interval_flag_overrides_default() {
        let cfg =
            AgentConfig::from_args(args(&["--url", "http://c", "--interval-secs", "5"])).unwrap();
        assert_eq!(cfg.publish_interval, Duration::from_secs(5));
        assert!(matches!(
            AgentConfig::from_args(args(&["--url", "http://c", "--interval-secs", "x"])),
            Err(ConfigError::InvalidValue("--interval-secs"))
        ));
    }

    #[test]
    fn insecure_tls_env_requires_explicit_enable() {
        std::env::set_var("HOSTPULSE_INSECURE_TLS", "");
        assert!(!AgentConfig::from_env().insecure_tls);
        std::env::set_var("HOSTPULSE_INSECURE_TLS", "yes-ish");
        assert!(!AgentConfig::from_env().insecure_tls);
        std::env::set_var("HOSTPULSE_INSECURE_TLS", "1");
        assert!(AgentConfig::from_env().insecure_tls);
        std::env::set_var("HOSTPULSE_INSECURE_TLS", "true");
        assert!(AgentConfig::from_env().insecure_tls);
        std::env::remove_var("HOSTPULSE_INSECURE_TLS");
    }

    #[test]
    fn insecure_tls_flag() {
        let cfg = AgentConfig::from_args(args(&["--url", "http://c", "--insecure-tls"])).unwrap();
        assert!(cfg.insecure_tls);
    }
}
