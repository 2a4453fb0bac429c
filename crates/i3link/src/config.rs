//! Client configuration and its `KEY value` file format.
//!
//! ```text
//! # i3.conf
//! I3_GATEWAY_HOST     gateway.example.org
//! I3_GATEWAY_PORT     8081
//! I3_API_KEY          s3cret
//! I3_MUD_NAME         MyMUD
//! I3_ENABLE_TELL      YES
//! I3_AUTO_RECONNECT   YES
//! I3_RECONNECT_DELAY  5
//! I3_DEFAULT_CHANNEL  intermud
//! ```
//!
//! Keys are case-insensitive. Only the first whitespace-separated token of
//! a value is read. Booleans are true only for `YES` (any case). Unknown
//! keys and unparsable numbers are logged and the default is kept.

use std::path::{Path, PathBuf};
use std::time::Duration;

use i3link_protocol::DEFAULT_MAX_FRAME_BYTES;
use tracing::{debug, warn};

/// Failure to read a configuration file. Content problems never fail.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the client needs to know before it starts.
///
/// Read once at initialize; the network driver never sees changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub gateway_host: String,
    pub gateway_port: u16,
    pub api_key: String,
    /// Our own MUD name, used until the gateway assigns one.
    pub mud_name: String,

    pub enable_tell: bool,
    pub enable_channels: bool,
    pub enable_who: bool,

    pub auto_reconnect: bool,
    /// Base delay between reconnect attempts; grows linearly per attempt.
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    /// 0 means retry forever.
    pub max_reconnect_attempts: u32,

    /// Zero disables heartbeats.
    pub heartbeat_interval: Duration,
    /// Upper bound on how long the driver waits for socket data before it
    /// re-checks its queues and timers.
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub auth_timeout: Duration,
    /// How long one write may stall before the link is dropped.
    pub send_timeout: Duration,

    /// Capacity of each of the two queues.
    pub max_queue_size: usize,
    pub max_frame_bytes: usize,

    /// Joined automatically after authentication, if set.
    pub default_channel: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_host: "localhost".to_string(),
            gateway_port: 8081,
            api_key: String::new(),
            mud_name: String::new(),
            enable_tell: true,
            enable_channels: true,
            enable_who: true,
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_delay: Duration::from_secs(300),
            max_reconnect_attempts: 0,
            heartbeat_interval: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            auth_timeout: Duration::from_secs(30),
            send_timeout: Duration::from_secs(10),
            max_queue_size: 1000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            default_channel: None,
        }
    }
}

impl ClientConfig {
    /// Smallest poll interval the driver will use.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Smallest base reconnect delay.
    pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

    /// Reads `path` on top of the defaults.
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded I3 configuration");
        Ok(Self::parse(&text))
    }

    /// Like [`load`](Self::load), but a missing or unreadable file only
    /// logs a warning and yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "could not load I3 configuration, using defaults");
                Self::default()
            }
        }
    }

    /// Parses configuration text on top of the defaults.
    pub fn parse(text: &str) -> Self {
        let mut cfg = Self::default();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let (Some(key), Some(value)) = (tokens.next(), tokens.next()) else {
                debug!(line = lineno + 1, "config line without value skipped");
                continue;
            };
            cfg.apply(&key.to_ascii_uppercase(), value, lineno + 1);
        }
        cfg.validated()
    }

    fn apply(&mut self, key: &str, value: &str, line: usize) {
        match key {
            "I3_GATEWAY_HOST" => self.gateway_host = value.to_string(),
            "I3_GATEWAY_PORT" => set_number(&mut self.gateway_port, key, value, line),
            "I3_API_KEY" => self.api_key = value.to_string(),
            "I3_MUD_NAME" => self.mud_name = value.to_string(),
            "I3_ENABLE_TELL" => self.enable_tell = yes(value),
            "I3_ENABLE_CHANNELS" => self.enable_channels = yes(value),
            "I3_ENABLE_WHO" => self.enable_who = yes(value),
            "I3_AUTO_RECONNECT" => self.auto_reconnect = yes(value),
            "I3_RECONNECT_DELAY" => set_secs(&mut self.reconnect_delay, key, value, line),
            "I3_MAX_RECONNECT_DELAY" => {
                set_secs(&mut self.max_reconnect_delay, key, value, line)
            }
            "I3_MAX_RECONNECT_ATTEMPTS" => {
                set_number(&mut self.max_reconnect_attempts, key, value, line)
            }
            "I3_HEARTBEAT_INTERVAL" => {
                set_secs(&mut self.heartbeat_interval, key, value, line)
            }
            "I3_CONNECT_TIMEOUT" => set_secs(&mut self.connect_timeout, key, value, line),
            "I3_AUTH_TIMEOUT" => set_secs(&mut self.auth_timeout, key, value, line),
            "I3_SEND_TIMEOUT" => set_secs(&mut self.send_timeout, key, value, line),
            "I3_MAX_QUEUE_SIZE" => set_number(&mut self.max_queue_size, key, value, line),
            "I3_MAX_FRAME_BYTES" => set_number(&mut self.max_frame_bytes, key, value, line),
            "I3_DEFAULT_CHANNEL" => self.default_channel = Some(value.to_string()),
            _ => warn!(key, line, "unknown I3 configuration key"),
        }
    }

    /// Clamps values the driver cannot work with.
    ///
    /// - zero queue size and frame limit become 1
    /// - poll interval is at least [`Self::MIN_POLL_INTERVAL`]
    /// - reconnect delay is at least [`Self::MIN_RECONNECT_DELAY`]
    /// - `max_reconnect_delay` is at least `reconnect_delay`
    /// - send timeout is at least one poll interval
    pub fn validated(mut self) -> Self {
        if self.max_queue_size == 0 {
            warn!("I3_MAX_QUEUE_SIZE of 0 raised to 1");
            self.max_queue_size = 1;
        }
        self.max_frame_bytes = self.max_frame_bytes.max(1);
        self.poll_interval = self.poll_interval.max(Self::MIN_POLL_INTERVAL);
        if self.reconnect_delay < Self::MIN_RECONNECT_DELAY {
            warn!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "I3_RECONNECT_DELAY too small, raised"
            );
            self.reconnect_delay = Self::MIN_RECONNECT_DELAY;
        }
        self.send_timeout = self.send_timeout.max(self.poll_interval);
        if self.max_reconnect_delay < self.reconnect_delay {
            self.max_reconnect_delay = self.reconnect_delay;
        }
        if self.default_channel.as_deref() == Some("") {
            self.default_channel = None;
        }
        self
    }
}

fn yes(value: &str) -> bool {
    value.eq_ignore_ascii_case("YES")
}

fn set_number<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str, line: usize) {
    match value.parse() {
        Ok(v) => *slot = v,
        Err(_) => warn!(key, value, line, "invalid number in I3 configuration, keeping default"),
    }
}

fn set_secs(slot: &mut Duration, key: &str, value: &str, line: usize) {
    let mut secs = slot.as_secs();
    set_number(&mut secs, key, value, line);
    *slot = Duration::from_secs(secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.gateway_host, "localhost");
        assert_eq!(cfg.gateway_port, 8081);
        assert!(cfg.enable_tell && cfg.enable_channels && cfg.enable_who);
        assert!(cfg.auto_reconnect);
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(5));
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(cfg.max_queue_size, 1000);
        assert_eq!(cfg.default_channel, None);
    }

    #[test]
    fn test_parse_full_file() {
        let cfg = ClientConfig::parse(
            "# gateway\n\
             I3_GATEWAY_HOST gw.example.org\n\
             i3_gateway_port 9000\n\
             I3_API_KEY abc123\n\
             I3_MUD_NAME MyMUD\n\
             I3_ENABLE_TELL no\n\
             I3_ENABLE_CHANNELS yes\n\
             I3_AUTO_RECONNECT NO\n\
             I3_RECONNECT_DELAY 12\n\
             I3_DEFAULT_CHANNEL dchat\n",
        );
        assert_eq!(cfg.gateway_host, "gw.example.org");
        assert_eq!(cfg.gateway_port, 9000);
        assert_eq!(cfg.api_key, "abc123");
        assert_eq!(cfg.mud_name, "MyMUD");
        assert!(!cfg.enable_tell);
        assert!(cfg.enable_channels);
        assert!(!cfg.auto_reconnect);
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(12));
        assert_eq!(cfg.default_channel.as_deref(), Some("dchat"));
    }

    #[test]
    fn test_parse_uses_first_token_of_value() {
        let cfg = ClientConfig::parse("I3_MUD_NAME Two Words\n");
        assert_eq!(cfg.mud_name, "Two");
    }

    #[test]
    fn test_parse_bad_number_keeps_default() {
        let cfg = ClientConfig::parse("I3_GATEWAY_PORT eighty\nI3_RECONNECT_DELAY -3\n");
        assert_eq!(cfg.gateway_port, 8081);
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_ignores_unknown_keys_and_valueless_lines() {
        let cfg = ClientConfig::parse("SOMETHING_ELSE 1\nI3_API_KEY\n   \n");
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_validated_clamps_values() {
        let cfg = ClientConfig {
            max_queue_size: 0,
            poll_interval: Duration::ZERO,
            reconnect_delay: Duration::from_secs(10),
            max_reconnect_delay: Duration::from_secs(1),
            default_channel: Some(String::new()),
            ..ClientConfig::default()
        }
        .validated();
        assert_eq!(cfg.max_queue_size, 1);
        assert_eq!(cfg.poll_interval, ClientConfig::MIN_POLL_INTERVAL);
        assert_eq!(cfg.max_reconnect_delay, Duration::from_secs(10));
        assert_eq!(cfg.default_channel, None);
    }

    #[test]
    fn test_validated_raises_zero_reconnect_delay_and_keeps_zero_heartbeat() {
        let cfg = ClientConfig {
            reconnect_delay: Duration::ZERO,
            max_reconnect_delay: Duration::ZERO,
            heartbeat_interval: Duration::ZERO,
            send_timeout: Duration::ZERO,
            ..ClientConfig::default()
        }
        .validated();
        assert_eq!(cfg.reconnect_delay, ClientConfig::MIN_RECONNECT_DELAY);
        assert_eq!(cfg.max_reconnect_delay, ClientConfig::MIN_RECONNECT_DELAY);
        // Zero means "no heartbeats" to the driver.
        assert_eq!(cfg.heartbeat_interval, Duration::ZERO);
        assert_eq!(cfg.send_timeout, cfg.poll_interval);
    }

    #[test]
    fn test_parse_zero_timings_from_file() {
        let cfg = ClientConfig::parse(
            "I3_HEARTBEAT_INTERVAL 0\nI3_RECONNECT_DELAY 0\nI3_SEND_TIMEOUT 3\n",
        );
        assert_eq!(cfg.heartbeat_interval, Duration::ZERO);
        assert_eq!(cfg.reconnect_delay, ClientConfig::MIN_RECONNECT_DELAY);
        assert_eq!(cfg.send_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = ClientConfig::load("/definitely/not/here/i3.conf").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(
            ClientConfig::load_or_default("/definitely/not/here/i3.conf"),
            ClientConfig::default()
        );
    }
}
