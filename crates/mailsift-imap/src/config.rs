//! Client configuration.
//!
//! No file loading happens here: a [`ClientManager`] is built in code (or
//! by an outer configuration layer) and handed to sessions. Accounts
//! resolve against a default account; options carry the query-layer and
//! cache knobs.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::session::Session;

/// Connection encryption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encryption {
    /// No encryption (port 143).
    None,
    /// Implicit TLS from the first byte (port 993).
    Ssl,
    /// Implicit TLS from the first byte (port 993).
    #[default]
    Tls,
    /// Plaintext greeting, then upgrade via STARTTLS.
    StartTls,
    /// Explicitly unencrypted even if the server offers STARTTLS.
    NoTls,
}

impl Encryption {
    /// Returns true when TLS wraps the connection from the first byte.
    #[must_use]
    pub const fn is_implicit(self) -> bool {
        matches!(self, Self::Ssl | Self::Tls)
    }

    /// Returns the default port for this mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls | Self::NoTls => 143,
            Self::Ssl | Self::Tls => 993,
        }
    }
}

/// Authentication method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// LOGIN command.
    #[default]
    Login,
    /// AUTHENTICATE PLAIN (SASL).
    Plain,
    /// AUTHENTICATE XOAUTH2; the `password` field carries the access
    /// token.
    OAuth,
}

/// Proxy endpoint for tunnelled connections (HTTP CONNECT).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

/// Per-account connection configuration.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Encryption mode.
    pub encryption: Encryption,
    /// Verify the server certificate.
    pub validate_cert: bool,
    /// Username.
    pub username: String,
    /// Password or OAuth access token.
    pub password: String,
    /// Authentication method.
    pub authentication: AuthMethod,
    /// Optional proxy tunnel.
    pub proxy: Option<Proxy>,
    /// Bounds TCP connect + TLS + greeting.
    pub connect_timeout: Duration,
    /// Bounds any single read.
    pub stream_timeout: Duration,
    /// Extension FETCH attributes requested during population
    /// (e.g. `X-GM-THRID`).
    pub extensions: Vec<String>,
}

impl AccountConfig {
    /// Creates a configuration for the given host with implicit TLS on
    /// port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 993,
            encryption: Encryption::Tls,
            validate_cert: true,
            username: String::new(),
            password: String::new(),
            authentication: AuthMethod::Login,
            proxy: None,
            connect_timeout: Duration::from_secs(30),
            stream_timeout: Duration::from_secs(60),
            extensions: Vec::new(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the encryption mode and, when the port was untouched, its
    /// default port.
    #[must_use]
    pub fn encryption(mut self, encryption: Encryption) -> Self {
        if self.port == self.encryption.default_port() {
            self.port = encryption.default_port();
        }
        self.encryption = encryption;
        self
    }

    /// Enables or disables certificate validation.
    #[must_use]
    pub const fn validate_cert(mut self, validate: bool) -> Self {
        self.validate_cert = validate;
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub const fn authentication(mut self, method: AuthMethod) -> Self {
        self.authentication = method;
        self
    }

    /// Routes the connection through a proxy.
    #[must_use]
    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some(Proxy {
            host: host.into(),
            port,
        });
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-read stream timeout.
    #[must_use]
    pub const fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Adds an extension FETCH attribute.
    #[must_use]
    pub fn extension(mut self, attribute: impl Into<String>) -> Self {
        self.extensions.push(attribute.into());
        self
    }
}

/// Body-fetch flavour for population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchFlavour {
    /// Use BODY.PEEK so fetching does not set `\Seen`.
    #[default]
    Peek,
    /// Plain BODY sections addressed by UID.
    Uid,
    /// Plain BODY sections.
    Nil,
}

/// Order in which matched identifiers are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchOrder {
    /// Server order.
    #[default]
    Asc,
    /// Reversed before paging.
    Desc,
}

/// Which numbering scheme commands address messages by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceKind {
    /// Message sequence numbers.
    Msn,
    /// UIDs.
    #[default]
    Uid,
}

/// Key under which populated messages are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKey {
    /// UID.
    #[default]
    Uid,
    /// Message sequence number.
    Number,
    /// Position in the result list.
    List,
    /// Message-ID header.
    Id,
}

/// Library options shared by every session a manager creates.
#[derive(Debug, Clone)]
pub struct Options {
    /// Body-fetch flavour.
    pub fetch: FetchFlavour,
    /// Population order.
    pub fetch_order: FetchOrder,
    /// Numbering scheme.
    pub sequence: SequenceKind,
    /// Collection key.
    pub message_key: MessageKey,
    /// Record per-message errors instead of aborting population.
    pub soft_fail: bool,
    /// Keep the msgno→uid cache.
    pub uid_cache: bool,
    /// Default hierarchy delimiter for locally constructed folders.
    pub delimiter: char,
    /// Log command traffic at debug level.
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fetch: FetchFlavour::Peek,
            fetch_order: FetchOrder::Asc,
            sequence: SequenceKind::Uid,
            message_key: MessageKey::Uid,
            soft_fail: false,
            uid_cache: true,
            delimiter: '/',
            debug: false,
        }
    }
}

/// Named account registry plus shared options.
///
/// Replaces any notion of process-wide configuration: a manager is an
/// explicit value handed to the sessions it creates.
#[derive(Debug, Clone, Default)]
pub struct ClientManager {
    default_account: Option<String>,
    accounts: HashMap<String, AccountConfig>,
    options: Options,
}

impl ClientManager {
    /// Creates an empty manager with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the shared options.
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Registers an account. The first registered account becomes the
    /// default.
    #[must_use]
    pub fn account(mut self, name: impl Into<String>, config: AccountConfig) -> Self {
        let name = name.into();
        if self.default_account.is_none() {
            self.default_account = Some(name.clone());
        }
        self.accounts.insert(name, config);
        self
    }

    /// Sets the default account name.
    #[must_use]
    pub fn default_account(mut self, name: impl Into<String>) -> Self {
        self.default_account = Some(name.into());
        self
    }

    /// Returns the shared options.
    #[must_use]
    pub const fn get_options(&self) -> &Options {
        &self.options
    }

    /// Resolves an account configuration. `None` resolves the default
    /// account; a name missing from the registry falls back to the
    /// default account's values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when no account can be resolved.
    pub fn resolve(&self, name: Option<&str>) -> Result<AccountConfig> {
        let default_name = self
            .default_account
            .as_deref()
            .ok_or_else(|| Error::Configuration("no accounts registered".to_string()))?;

        let lookup = name.unwrap_or(default_name);
        if let Some(config) = self.accounts.get(lookup) {
            return Ok(config.clone());
        }

        self.accounts
            .get(default_name)
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("unknown account: {lookup}")))
    }

    /// Builds a disconnected session for the named account (or the
    /// default).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the account cannot be
    /// resolved.
    pub fn session(&self, name: Option<&str>) -> Result<Session> {
        let account = self.resolve(name)?;
        Ok(Session::new(account, self.options.clone()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Encryption::Tls.default_port(), 993);
        assert_eq!(Encryption::Ssl.default_port(), 993);
        assert_eq!(Encryption::StartTls.default_port(), 143);
        assert_eq!(Encryption::None.default_port(), 143);
        assert_eq!(Encryption::NoTls.default_port(), 143);
    }

    #[test]
    fn test_encryption_updates_default_port() {
        let config = AccountConfig::new("imap.example.com").encryption(Encryption::StartTls);
        assert_eq!(config.port, 143);

        // An explicit port survives an encryption change.
        let config = AccountConfig::new("imap.example.com")
            .port(1143)
            .encryption(Encryption::StartTls);
        assert_eq!(config.port, 1143);
    }

    #[test]
    fn test_builder() {
        let config = AccountConfig::new("imap.example.com")
            .credentials("user", "pass")
            .validate_cert(false)
            .proxy("proxy.local", 8080)
            .connect_timeout(Duration::from_secs(5));

        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.username, "user");
        assert!(!config.validate_cert);
        assert_eq!(config.proxy.as_ref().unwrap().port, 8080);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_manager_resolution() {
        let manager = ClientManager::new()
            .account("main", AccountConfig::new("imap.main.com"))
            .account("alt", AccountConfig::new("imap.alt.com"));

        assert_eq!(manager.resolve(None).unwrap().host, "imap.main.com");
        assert_eq!(manager.resolve(Some("alt")).unwrap().host, "imap.alt.com");
        // Unknown names fall back to the default account.
        assert_eq!(
            manager.resolve(Some("nope")).unwrap().host,
            "imap.main.com"
        );
    }

    #[test]
    fn test_empty_manager_errors() {
        let manager = ClientManager::new();
        assert!(matches!(
            manager.resolve(None),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_options_defaults() {
        let options = Options::default();
        assert_eq!(options.fetch, FetchFlavour::Peek);
        assert_eq!(options.sequence, SequenceKind::Uid);
        assert_eq!(options.message_key, MessageKey::Uid);
        assert!(options.uid_cache);
        assert!(!options.soft_fail);
        assert_eq!(options.delimiter, '/');
    }
}
