//! Process configuration, read from the environment.

use crate::server::auth::UpdatePolicy;
use bloglist_common::{
    snowflake::{ProcessId, WorkerId},
    token::{TokenConfig, TokenSecret},
    util::{NonPositiveDurationError, PositiveDuration},
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;
use time::Duration;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOKEN_TTL_SECONDS is invalid: {0}")]
    TokenTtl(#[from] NonPositiveDurationError),
    #[error("WORKER_ID {0} does not fit into a snowflake")]
    WorkerId(u8),
    #[error("PROCESS_ID {0} does not fit into a snowflake")]
    ProcessId(u8),
}

/// Environment variables, matched case-insensitively by name.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    pub token_secret: TokenSecret,
    pub token_ttl_seconds: Option<i64>,
    /// Without a database the server keeps everything in memory.
    pub database_url: Option<String>,
    #[serde(default)]
    pub strict_ownership_on_update: bool,
    #[serde(default)]
    pub worker_id: u8,
    #[serde(default)]
    pub process_id: u8,
}

impl Env {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    #[must_use]
    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.server_port)
    }

    pub fn token_config(&self) -> Result<TokenConfig, ConfigError> {
        let lifetime = self
            .token_ttl_seconds
            .map(|seconds| PositiveDuration::try_from(Duration::seconds(seconds)))
            .transpose()?;

        Ok(TokenConfig {
            secret: self.token_secret.clone(),
            lifetime,
        })
    }

    #[must_use]
    pub fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy {
            strict_ownership_on_update: self.strict_ownership_on_update,
        }
    }

    pub fn machine_ids(&self) -> Result<(WorkerId, ProcessId), ConfigError> {
        let worker_id = WorkerId::new(self.worker_id).ok_or(ConfigError::WorkerId(self.worker_id))?;
        let process_id =
            ProcessId::new(self.process_id).ok_or(ConfigError::ProcessId(self.process_id))?;

        Ok((worker_id, process_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigError, Env};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn vars(extra: &[(&str, &str)]) -> Vec<(String, String)> {
        [
            ("SERVER_ADDRESS", "127.0.0.1"),
            ("SERVER_PORT", "3003"),
            ("TOKEN_SECRET", "sekret"),
        ]
        .iter()
        .chain(extra)
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
    }

    #[test]
    fn minimal_environment_uses_defaults() {
        let env = Env::from_iter(vars(&[])).unwrap();

        assert_eq!(
            env.socket_address(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3003)
        );
        assert_eq!(env.database_url, None);
        assert!(!env.update_policy().strict_ownership_on_update);
        assert_eq!(env.token_config().unwrap().lifetime, None);
        let (worker_id, process_id) = env.machine_ids().unwrap();
        assert_eq!((worker_id.get(), process_id.get()), (0, 0));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let vars = vars(&[])
            .into_iter()
            .filter(|(key, _)| key != "TOKEN_SECRET");

        assert!(Env::from_iter(vars).is_err());
    }

    #[test]
    fn optional_settings_are_read() {
        let env = Env::from_iter(vars(&[
            ("TOKEN_TTL_SECONDS", "3600"),
            ("DATABASE_URL", "postgres://localhost/bloglist"),
            ("STRICT_OWNERSHIP_ON_UPDATE", "true"),
            ("WORKER_ID", "3"),
        ]))
        .unwrap();

        assert_eq!(
            env.token_config()
                .unwrap()
                .lifetime
                .unwrap()
                .whole_seconds(),
            3600
        );
        assert_eq!(
            env.database_url.as_deref(),
            Some("postgres://localhost/bloglist")
        );
        assert!(env.update_policy().strict_ownership_on_update);
        assert_eq!(env.machine_ids().unwrap().0.get(), 3);
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        let env = Env::from_iter(vars(&[("TOKEN_TTL_SECONDS", "0")])).unwrap();

        assert!(matches!(env.token_config(), Err(ConfigError::TokenTtl(_))));
    }

    #[test]
    fn oversized_worker_id_is_rejected() {
        let env = Env::from_iter(vars(&[("WORKER_ID", "200")])).unwrap();

        assert!(matches!(env.machine_ids(), Err(ConfigError::WorkerId(200))));
    }
}
