pub mod collect;
pub mod replay;
pub mod serve;

use std::time::Duration;

use clap::Args;
use corvault_core::{Pipeline, Snapshot};
use corvault_server::{Exposition, SshConfig, SshSource};

/// Connection settings shared by the commands that talk to a live array.
#[derive(Args, Clone)]
pub struct ArrayArgs {
    /// Array management hostname or address
    #[arg(long, env = "CORVAULT_HOST")]
    pub host: String,

    /// SSH user (a monitor-only account is enough)
    #[arg(long, env = "CORVAULT_USERNAME", default_value = "monitoronly")]
    pub username: String,

    /// SSH password
    #[arg(long, env = "CORVAULT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// SSH port
    #[arg(long, default_value = "22")]
    pub ssh_port: u16,

    /// Banner lines to skip before the JSON payload
    #[arg(long, default_value_t = corvault_core::DEFAULT_HEADER_LINES)]
    pub header_lines: usize,

    /// Timeout in seconds for one collection session
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ArrayArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayArgs")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssh_port", &self.ssh_port)
            .field("header_lines", &self.header_lines)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ArrayArgs {
    pub fn source(&self) -> SshSource {
        SshSource::new(SshConfig {
            host: self.host.clone(),
            port: self.ssh_port,
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        })
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.host.clone(), self.header_lines)
    }
}

/// Print a snapshot as Prometheus text or JSON.
pub fn print_snapshot(snapshot: &Snapshot, format: &str) {
    match format {
        "json" => match serde_json::to_string_pretty(&snapshot.to_json()) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to serialize snapshot: {e}");
                std::process::exit(1);
            }
        },
        _ => {
            let rendered = Exposition::new().and_then(|exposition| exposition.render(snapshot));
            match rendered {
                Ok(text) => print!("{text}"),
                Err(e) => {
                    eprintln!("Failed to render metrics: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Build the async runtime for the commands that talk to the array.
pub fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    }
}
