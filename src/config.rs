use std::env;
use std::path::PathBuf;

use crate::error::DispatchError;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub order_queue_size: usize,
    pub event_buffer_size: usize,
    pub fixture_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            order_queue_size: parse_or_default("ORDER_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            fixture_path: env::var("DISPATCH_FIXTURE").ok().map(PathBuf::from),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, DispatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| DispatchError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_or_default;

    #[test]
    fn missing_key_falls_back_to_default() {
        let value: usize = parse_or_default("CARRIER_DISPATCH_TEST_UNSET_KEY", 64).unwrap();
        assert_eq!(value, 64);
    }
}
