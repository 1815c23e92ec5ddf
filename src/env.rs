use anyhow::{anyhow, Result};
use dotenv::dotenv;
use std::env;
use std::str::FromStr;

use crate::config::BrokerConfig;

pub const AMQP_URI_VAR: &str = "APP_AMQP_URI";
pub const CONNECT_TIMEOUT_VAR: &str = "APP_AMQP_CONNECT_TIMEOUT_MS";
pub const RPC_TIMEOUT_VAR: &str = "APP_RPC_TIMEOUT_MS";
pub const MANDATORY_VAR: &str = "APP_AMQP_MANDATORY";
pub const PERSISTENT_VAR: &str = "APP_AMQP_PERSISTENT";

/// Applies the process environment (and a `.env` file, if any) on top of `config`.
pub fn apply_process_env(config: &mut BrokerConfig) -> Result<()> {
    dotenv().ok();
    apply_overrides(config, |name| env::var(name).ok())
}

/// Applies overrides from `lookup`. Unset variables leave the value alone.
pub fn apply_overrides<F>(config: &mut BrokerConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(address) = lookup(AMQP_URI_VAR) {
        if address.trim().is_empty() {
            return Err(anyhow!("Environment variable {} is set but empty", AMQP_URI_VAR));
        }
        config.broker_address = Some(address);
    }
    if let Some(val) = lookup(CONNECT_TIMEOUT_VAR) {
        config.connect_timeout_ms = parse(CONNECT_TIMEOUT_VAR, &val)?;
    }
    if let Some(val) = lookup(RPC_TIMEOUT_VAR) {
        config.reply_timeout_ms = parse(RPC_TIMEOUT_VAR, &val)?;
    }
    if let Some(val) = lookup(MANDATORY_VAR) {
        config.mandatory = parse_flag(MANDATORY_VAR, &val)?;
    }
    if let Some(val) = lookup(PERSISTENT_VAR) {
        config.persistent = parse_flag(PERSISTENT_VAR, &val)?;
    }
    Ok(())
}

fn parse<T: FromStr>(name: &str, val: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    val.trim()
        .parse()
        .map_err(|e| anyhow!("Environment variable {}={:?} is invalid: {}", name, val, e))
}

fn parse_flag(name: &str, val: &str) -> Result<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("Environment variable {}={:?} is not a boolean", name, val)),
    }
}
