use log::debug;
use std::env;

/// Read an environment variable with fallback to a default value
pub fn read_env(key: &str, default: &str) -> String {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    debug!("Environment variable {} resolved to: {}", key, value);
    value
}

/// Read an environment variable with unsigned numeric conversion
///
/// Falls back to the default when the variable is unset or not a number.
pub fn read_env_u64(key: &str, default: u64) -> u64 {
    let value = read_env(key, &default.to_string());
    value.parse::<u64>().unwrap_or(default)
}
