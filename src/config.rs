//! Startup configuration, read once from flags or the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::FixedOffset;
use clap::Parser;

use crate::error::Error;

pub const DEFAULT_PORT: &str = ":8080";
pub const DEFAULT_DB_PATH: &str = ".sqlite3/todo.db";
pub const DEFAULT_UTC_OFFSET: &str = "+09:00";

#[derive(Clone, Debug, Parser)]
#[command(name = "todo-stations", version, about = "TODO REST service over SQLite")]
pub struct Config {
    /// Listen address. `:8080` and `8080` bind every interface.
    #[arg(long, env = "PORT", default_value = DEFAULT_PORT)]
    pub port: String,

    /// SQLite database file. Missing parent directories are created.
    #[arg(long, env = "DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// UTC offset timestamps are rendered in, e.g. `+09:00`.
    #[arg(long, env = "UTC_OFFSET", default_value = DEFAULT_UTC_OFFSET, value_parser = parse_offset)]
    pub utc_offset: FixedOffset,
}

impl Config {
    /// Resolves `port` into a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, Error> {
        let port = self.port.trim();
        let addr = if let Some(port) = port.strip_prefix(':') {
            format!("0.0.0.0:{port}")
        } else if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            format!("0.0.0.0:{port}")
        } else {
            port.to_owned()
        };
        addr.parse().map_err(|_| Error::Addr(self.port.clone()))
    }
}

fn parse_offset(s: &str) -> Result<FixedOffset, String> {
    s.parse::<FixedOffset>().map_err(|e| format!("invalid UTC offset `{s}`: {e}"))
}
