use std::net::SocketAddr;
use std::time::Duration;

use banditlb_core::{LbError, Tier};

/// Process configuration, parsed once at startup from the environment.
/// An unknown strategy or tier fails fast here, before the server binds.
pub struct BanditConfig {
    pub strategy_name: String,
    pub config_target: Tier,
    pub session_id: Option<String>,
    pub rate_limit_cooldown: Duration,
    pub sliding_window_size: usize,
    pub block_duration: Duration,
    pub bind_addr: SocketAddr,
    pub metrics_path: String,
    pub runs_dir: String,
    pub downstream_timeout: Duration,
}

impl BanditConfig {
    pub fn from_env() -> Result<Self, LbError> {
        let strategy_name = env_var("LB_STRATEGY")
            .ok_or_else(|| LbError::Config("LB_STRATEGY is required".to_string()))?;

        let config_target = match env_var("LB_CONFIG_TARGET") {
            Some(raw) => raw.parse()?,
            None => Tier::T1,
        };

        let session_id = env_var("LB_SESSION_ID");

        let rate_limit_cooldown = Duration::from_secs_f64(env_parse("LB_RATE_LIMIT_COOLDOWN", 1.0)?);
        let sliding_window_size = env_parse::<usize>("LB_SLIDING_WINDOW_SIZE", 30)?;
        let block_duration = Duration::from_secs_f64(env_parse("LB_BLOCK_DURATION", 5.0)?);

        let bind_addr = match env_var("LB_BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|_| LbError::Config(format!("LB_BIND_ADDR is not a valid address: {raw}")))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let metrics_path = env_var("LB_METRICS_PATH").unwrap_or_else(|| "metrics.json".to_string());
        let runs_dir = env_var("LB_RUNS_DIR").unwrap_or_else(|| "runs".to_string());
        let downstream_timeout =
            Duration::from_millis(env_parse::<u64>("LB_DOWNSTREAM_TIMEOUT_MS", 5_000)?);

        Ok(Self {
            strategy_name,
            config_target,
            session_id,
            rate_limit_cooldown,
            sliding_window_size,
            block_duration,
            bind_addr,
            metrics_path,
            runs_dir,
            downstream_timeout,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, LbError> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| LbError::Config(format!("{name} is not a valid value: {raw}"))),
        None => Ok(default),
    }
}
