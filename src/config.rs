//! 환경 변수(및 `.env` 파일)에서 서버 설정을 읽어옵니다.
//!
//! | 변수 | 기본값 |
//! |---|---|
//! | `HOST` | `127.0.0.1` |
//! | `PORT` | `3000` |
//! | `FORUM_STORE` | `file` (`file`, `remote`, `memory`) |
//! | `DATABASE_FILE` | `database.json` |
//! | `FORUM_REMOTE_URL` | 없음 (`remote` 일 때 필수) |
//! | `REQUEST_TIMEOUT_SECS` | `20` |

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use dotenv::dotenv;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_FILE: &str = "database.json";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Where the forum snapshot lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// JSON file on local disk.
    File(PathBuf),
    /// Base URL of a key-value store speaking `GET/PUT {base}/data`.
    Remote(String),
    /// Nothing is persisted.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub backend: Backend,
    pub request_timeout: Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set when FORUM_STORE=remote")]
    Missing(&'static str),
}

impl Config {
    /// Reads the process environment after loading `.env`, if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let backend = match lookup("FORUM_STORE").as_deref().unwrap_or("file") {
            "file" => Backend::File(
                lookup("DATABASE_FILE")
                    .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_owned())
                    .into(),
            ),
            "remote" => Backend::Remote(
                lookup("FORUM_REMOTE_URL")
                    .filter(|url| !url.is_empty())
                    .ok_or(ConfigError::Missing("FORUM_REMOTE_URL"))?,
            ),
            "memory" => Backend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "FORUM_STORE",
                    value: other.to_owned(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            backend,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// 원격 저장소 HTTP 클라이언트 타임아웃
    ///
    /// Three quarters of the request timeout, so a hung store write fails with a
    /// persistence error before the request timeout cancels the handler.
    pub fn remote_timeout(&self) -> Duration {
        self.request_timeout * 3 / 4
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
