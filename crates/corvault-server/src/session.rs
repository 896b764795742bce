//! Running CLI commands on the array over SSH.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use corvault_core::{CollectError, CommandOutput};
use russh::client::{self, Handle};
use russh::keys::HashAlg;
use russh::{ChannelMsg, Disconnect};

/// Anything that can run array CLI commands and hand back their raw output.
///
/// One call covers one session: every command runs on the same connection, in
/// order, and the connection is closed before returning.
pub trait CommandSource: Send + Sync + 'static {
    fn fetch(
        &self,
        commands: &[&'static str],
    ) -> impl Future<Output = Result<Vec<CommandOutput>, CollectError>> + Send;
}

/// Connection settings for the array's management interface.
#[derive(Clone)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Upper bound for connecting, authenticating and running all commands.
    pub timeout: Duration,
}

impl std::fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// [`CommandSource`] backed by a password-authenticated SSH session.
#[derive(Debug, Clone)]
pub struct SshSource {
    config: SshConfig,
}

impl SshSource {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    async fn connect(&self) -> Result<Handle<AcceptAnyHostKey>, CollectError> {
        let cfg = &self.config;
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(cfg.timeout),
            ..Default::default()
        });
        let addr = (cfg.host.as_str(), cfg.port);
        let mut handle = client::connect(ssh_config, addr, AcceptAnyHostKey)
            .await
            .map_err(|e| CollectError::transport("connect", format!("{}:{}: {e}", cfg.host, cfg.port)))?;

        let auth = handle
            .authenticate_password(cfg.username.clone(), cfg.password.clone())
            .await
            .map_err(|e| CollectError::transport("authenticate", e))?;
        if !auth.success() {
            return Err(CollectError::transport(
                "authenticate",
                format!("password rejected for user {}", cfg.username),
            ));
        }
        log::debug!("ssh session established to {}:{}", cfg.host, cfg.port);
        Ok(handle)
    }

    async fn run_all(&self, commands: &[&'static str]) -> Result<Vec<CommandOutput>, CollectError> {
        let handle = self.connect().await?;
        let mut outputs = Vec::with_capacity(commands.len());
        for &command in commands {
            outputs.push(exec(&handle, command).await?);
        }
        if let Err(e) = handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            log::debug!("ssh disconnect from {}: {e}", self.config.host);
        }
        Ok(outputs)
    }
}

impl CommandSource for SshSource {
    async fn fetch(&self, commands: &[&'static str]) -> Result<Vec<CommandOutput>, CollectError> {
        match tokio::time::timeout(self.config.timeout, self.run_all(commands)).await {
            Ok(result) => result,
            Err(_) => Err(CollectError::transport(
                commands.join("; "),
                format!("timed out after {:?}", self.config.timeout),
            )),
        }
    }
}

async fn exec(
    handle: &Handle<AcceptAnyHostKey>,
    command: &'static str,
) -> Result<CommandOutput, CollectError> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| CollectError::transport(command, e))?;
    channel
        .exec(true, command)
        .await
        .map_err(|e| CollectError::transport(command, e))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_status = None;
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
            ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr.extend_from_slice(data),
            ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
            _ => {}
        }
    }

    let Some(exit_status) = exit_status else {
        return Err(CollectError::transport(command, "channel closed without exit status"));
    };
    log::debug!(
        "`{command}` exited {exit_status} ({} stdout bytes, {} stderr bytes)",
        stdout.len(),
        stderr.len()
    );
    Ok(CommandOutput {
        exit_status,
        stdout: split_lines(&stdout),
        stderr: split_lines(&stderr),
    })
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Trusts whatever host key the array presents, like an auto-add policy with
/// no known_hosts file.
pub struct AcceptAnyHostKey;

impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        log::debug!(
            "accepting array host key {}",
            server_public_key.fingerprint(HashAlg::Sha256)
        );
        Ok(true)
    }
}
