use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::backoff::RetryPolicy;
use crate::error::{BridgeError, Result};
use crate::transform::KeyEncoding;

/// Connection settings for the Canal server.
#[derive(Debug, Clone)]
pub struct CanalConfig {
    /// `host:port` of the Canal server
    pub addr: String,
    pub username: String,
    pub password: String,
    /// Subscription filter; `None` keeps the server-side filter
    pub filter: Option<String>,
    /// Max entries per fetch
    pub batch_size: i32,
    /// How long the server may hold a `get` open waiting for data
    pub fetch_timeout: Duration,
    /// Socket read timeout, also sent as the session idle timeout
    pub so_timeout: Duration,
    pub connect_timeout: Duration,
}

/// Kafka producer settings.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Bootstrap servers (comma-separated)
    pub brokers: String,
    pub client_id_prefix: String,
    /// Delivery timeout for a single message
    pub message_timeout: Duration,
    pub acks: String,
    pub idempotence: bool,
    pub key_encoding: KeyEncoding,
}

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub canal: CanalConfig,
    pub kafka: KafkaConfig,
    /// Canal destinations; each one runs as an independent stream
    pub destinations: Vec<String>,
    /// Log every published payload
    pub debug: bool,
    pub restart: RetryPolicy,
    pub http_port: u16,
}

/// Everything one stream needs, owned by that stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub destination: String,
    pub canal: CanalConfig,
    pub kafka: KafkaConfig,
    pub client_id: String,
    pub log_payloads: bool,
    pub restart: RetryPolicy,
}

impl BridgeConfig {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| default.to_string())
        };

        let destinations = Self::parse_list(&var("CANAL_DESTINATIONS", "example"));
        if destinations.is_empty() {
            return Err(BridgeError::Config(
                "CANAL_DESTINATIONS must name at least one destination".into(),
            ));
        }

        let filter = var("CANAL_FILTER", "");
        let batch_size: i32 = parse(&lookup, "CANAL_BATCH_SIZE", 1000)?;
        if batch_size <= 0 {
            return Err(BridgeError::Config(
                "CANAL_BATCH_SIZE must be positive".into(),
            ));
        }

        let canal = CanalConfig {
            addr: var("CANAL_ADDR", "127.0.0.1:11111"),
            username: var("CANAL_USERNAME", ""),
            password: var("CANAL_PASSWORD", ""),
            filter: (!filter.is_empty()).then_some(filter),
            batch_size,
            fetch_timeout: Duration::from_millis(parse(&lookup, "CANAL_FETCH_TIMEOUT_MS", 1000)?),
            so_timeout: Duration::from_millis(parse(&lookup, "CANAL_SO_TIMEOUT_MS", 60_000)?),
            connect_timeout: Duration::from_millis(parse(
                &lookup,
                "CANAL_CONNECT_TIMEOUT_MS",
                10_000,
            )?),
        };

        let kafka = KafkaConfig {
            brokers: var("KAFKA_BROKERS", "localhost:9092"),
            client_id_prefix: var("KAFKA_CLIENT_ID_PREFIX", "canal"),
            message_timeout: Duration::from_millis(parse(
                &lookup,
                "KAFKA_MESSAGE_TIMEOUT_MS",
                30_000,
            )?),
            acks: Self::parse_acks(&var("KAFKA_ACKS", "all"))?,
            idempotence: parse(&lookup, "KAFKA_ENABLE_IDEMPOTENCE", false)?,
            key_encoding: var("KAFKA_KEY_ENCODING", "int32").parse()?,
        };

        let restart = RetryPolicy {
            initial_backoff: Duration::from_millis(parse(
                &lookup,
                "RESTART_INITIAL_BACKOFF_MS",
                1000,
            )?),
            max_backoff: Duration::from_millis(parse(&lookup, "RESTART_MAX_BACKOFF_MS", 60_000)?),
            ..Default::default()
        };
        if restart.initial_backoff > restart.max_backoff {
            return Err(BridgeError::Config(
                "RESTART_INITIAL_BACKOFF_MS must not exceed RESTART_MAX_BACKOFF_MS".into(),
            ));
        }

        Ok(Self {
            canal,
            kafka,
            destinations,
            debug: parse_flag(&lookup, "BRIDGE_DEBUG")?,
            restart,
            http_port: parse(&lookup, "HTTP_PORT", 8080)?,
        })
    }

    /// One stream configuration per destination.
    pub fn streams(&self) -> Vec<StreamConfig> {
        self.destinations
            .iter()
            .map(|destination| StreamConfig {
                destination: destination.clone(),
                canal: self.canal.clone(),
                kafka: self.kafka.clone(),
                client_id: format!("{}-{}-producer", self.kafka.client_id_prefix, destination),
                log_payloads: self.debug,
                restart: self.restart.clone(),
            })
            .collect()
    }

    /// A batch is acked only on delivery metadata, which `acks=0` never
    /// produces.
    fn parse_acks(value: &str) -> Result<String> {
        match value {
            "0" => Err(BridgeError::Config(
                "KAFKA_ACKS=0 gives no delivery confirmation; use 1 or all".into(),
            )),
            "1" | "all" | "-1" => Ok(value.to_string()),
            other => Err(BridgeError::Config(format!(
                "KAFKA_ACKS has invalid value '{}' (expected 1, all or -1)",
                other
            ))),
        }
    }

    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| BridgeError::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
    }
}

/// Boolean switch; accepts `true`/`false` as well as numeric levels where
/// anything above zero is on.
fn parse_flag<F>(lookup: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(false),
    };
    let value = raw.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        numeric => numeric
            .parse::<i64>()
            .map(|level| level > 0)
            .map_err(|_| BridgeError::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}
