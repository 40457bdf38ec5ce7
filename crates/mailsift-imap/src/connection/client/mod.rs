//! Type-state IMAP client connection.
//!
//! The type parameter tracks the protocol state at compile time:
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after LOGIN/AUTHENTICATE
//! - `Selected`: after SELECT/EXAMINE
//!
//! Each state only exposes the commands valid in it, so a FETCH or
//! SEARCH outside a selected mailbox does not compile. At most one
//! tagged command is ever in flight: every command round-trip runs to
//! its tagged completion before the next begins.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::states::{AuthState, Authenticated, NotAuthenticated, Selected};
use super::framed::FramedStream;
use crate::command::{Command, CommandPart, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, Quota, ResponseCode, Status};
use crate::{Error, Result};

/// Response bundle for one command round-trip.
///
/// Carries what was transmitted, every untagged line the server
/// delivered before the completion, and the tagged completion itself.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    /// The transmitted command (credentials redacted, literals elided).
    pub command: String,
    /// Untagged responses attributed to this command, in server order.
    pub untagged: Vec<UntaggedResponse>,
    /// Tagged completion status.
    pub status: Status,
    /// Response code on the completion line.
    pub code: Option<ResponseCode>,
    /// Human-readable completion text.
    pub text: String,
}

impl CommandResponse {
    /// Returns the untagged data when the command completed OK; raises
    /// the server text as an error otherwise.
    pub fn validated_data(self) -> Result<Vec<UntaggedResponse>> {
        match self.status {
            Status::Ok | Status::PreAuth => Ok(self.untagged),
            Status::No => Err(Error::No(self.text)),
            Status::Bad => Err(Error::Bad(self.text)),
            Status::Bye => Err(Error::Bye(self.text)),
        }
    }

    /// Returns true when the command completed OK.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// IMAP client connection with type-state.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) state: State,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Commands valid in every state.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities as last advertised.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks for a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server supports IDLE (RFC 2177).
    #[must_use]
    pub fn supports_idle(&self) -> bool {
        self.has_capability(&Capability::Idle)
    }

    /// Returns true if the server supports MOVE (RFC 6851).
    #[must_use]
    pub fn supports_move(&self) -> bool {
        self.has_capability(&Capability::Move)
    }

    /// Returns true if the server supports QUOTA (RFC 2087).
    #[must_use]
    pub fn supports_quota(&self) -> bool {
        self.has_capability(&Capability::Quota)
    }

    /// Returns true if LOGIN is disabled (e.g. before STARTTLS).
    #[must_use]
    pub fn login_disabled(&self) -> bool {
        self.has_capability(&Capability::LoginDisabled)
    }

    /// Returns true if the server advertises the given AUTH mechanism.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| matches!(c, Capability::Auth(m) if m.eq_ignore_ascii_case(mechanism)))
    }

    /// Sends NOOP.
    pub async fn noop(&mut self) -> Result<()> {
        self.run(&Command::Noop).await?.validated_data()?;
        Ok(())
    }

    /// Sends CAPABILITY and refreshes the stored capabilities.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        let data = self.run(&Command::Capability).await?.validated_data()?;
        for item in data {
            if let UntaggedResponse::Capability(caps) = item {
                self.capabilities = caps.clone();
            }
        }
        Ok(self.capabilities.clone())
    }

    /// Sends ID (RFC 2971) and returns the server's identification.
    pub async fn id(
        &mut self,
        parameters: Option<Vec<(String, String)>>,
    ) -> Result<Option<Vec<(String, String)>>> {
        let data = self
            .run(&Command::Id { parameters })
            .await?
            .validated_data()?;
        for item in data {
            if let UntaggedResponse::Id(params) = item {
                return Ok(params);
            }
        }
        Ok(None)
    }

    /// Sends GETQUOTA for a quota root.
    pub async fn get_quota(&mut self, root: &str) -> Result<Vec<Quota>> {
        let data = self
            .run(&Command::GetQuota {
                root: root.to_string(),
            })
            .await?
            .validated_data()?;
        Ok(data
            .into_iter()
            .filter_map(|item| match item {
                UntaggedResponse::Quota(q) => Some(q),
                _ => None,
            })
            .collect())
    }

    /// Sends GETQUOTAROOT for a mailbox; returns the root names and any
    /// quota rows the server volunteered.
    pub async fn get_quota_root(&mut self, mailbox: &str) -> Result<(Vec<String>, Vec<Quota>)> {
        let data = self
            .run(&Command::GetQuotaRoot {
                mailbox: crate::types::Mailbox::new(mailbox),
            })
            .await?
            .validated_data()?;

        let mut roots = Vec::new();
        let mut quotas = Vec::new();
        for item in data {
            match item {
                UntaggedResponse::QuotaRoot { roots: r, .. } => roots.extend(r),
                UntaggedResponse::Quota(q) => quotas.push(q),
                _ => {}
            }
        }
        Ok((roots, quotas))
    }

    /// Runs one command to its tagged completion.
    ///
    /// Handles `+` continuations both for literal payloads and for SASL
    /// exchanges (an unexpected continuation is answered with an empty
    /// line so a rejecting server can deliver its tagged NO).
    pub(crate) async fn run(&mut self, command: &Command) -> Result<CommandResponse> {
        let tag = self.tag_gen.next();
        let parts = command.serialize(&tag);

        for part in &parts {
            match part {
                CommandPart::Line(data) => self.stream.write_command(data).await?,
                CommandPart::Literal(data) => {
                    self.await_continuation().await?;
                    self.stream.write_raw(data).await?;
                }
            }
        }

        let raw = self.read_until_tagged(&tag).await?;
        Self::bundle(command, &tag, raw)
    }

    /// Waits for a `+` continuation before a literal payload.
    async fn await_continuation(&mut self) -> Result<()> {
        loop {
            let response = self.stream.read_response().await?;
            if response.starts_with(b"+") {
                return Ok(());
            }
            match ResponseParser::parse(&response)? {
                Response::Tagged { status, text, .. } => {
                    return match status {
                        Status::No => Err(Error::No(text)),
                        Status::Bad => Err(Error::Bad(text)),
                        Status::Bye => Err(Error::Bye(text)),
                        _ => Err(Error::Protocol(
                            "unexpected completion while awaiting continuation".to_string(),
                        )),
                    };
                }
                // Unsolicited untagged data may arrive first; skip it.
                Response::Untagged(_) | Response::Continuation { .. } => {}
            }
        }
    }

    /// Reads responses until the tagged completion for `tag`.
    ///
    /// Untagged lines arriving before the completion belong to the
    /// in-flight command and are returned with it, in server order. A
    /// stray SASL continuation is answered with an empty line so a
    /// rejecting server can proceed to its tagged NO.
    pub(crate) async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut collected = Vec::new();
        loop {
            let response = self.stream.read_response().await?;

            if response.starts_with(b"+") {
                self.stream.write_command(b"\r\n").await?;
                continue;
            }

            // Exact-tag match: "A0011 OK" must not complete "A001".
            let is_tagged = response
                .get(..tag.len())
                .is_some_and(|prefix| prefix == tag.as_bytes())
                && response.get(tag.len()).is_some_and(|&b| b == b' ');

            collected.push(response);
            if is_tagged {
                return Ok(collected);
            }
        }
    }

    /// Builds the response bundle from raw response lines.
    fn bundle(command: &Command, tag: &str, raw: Vec<Vec<u8>>) -> Result<CommandResponse> {
        let mut untagged = Vec::new();
        let mut tagged = None;

        for line in &raw {
            match ResponseParser::parse(line) {
                Ok(Response::Untagged(data)) => untagged.push(data),
                Ok(Response::Tagged {
                    tag: resp_tag,
                    status,
                    code,
                    text,
                }) if resp_tag.as_str() == tag => {
                    tagged = Some((status, code, text));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unparseable response line");
                }
            }
        }

        let (status, code, text) = tagged
            .ok_or_else(|| Error::Protocol(format!("missing tagged response for {tag}")))?;

        Ok(CommandResponse {
            command: describe(command, tag),
            untagged,
            status,
            code,
            text,
        })
    }
}

/// Renders the transmitted command for the bundle, never including
/// credentials or literal payloads.
fn describe(command: &Command, tag: &str) -> String {
    match command {
        Command::Login { username, .. } => format!("{tag} LOGIN {username} ****"),
        Command::Authenticate { mechanism, .. } => {
            format!("{tag} AUTHENTICATE {mechanism} ****")
        }
        other => {
            let parts = other.serialize(tag);
            let mut out = String::new();
            for part in parts {
                match part {
                    CommandPart::Line(data) => {
                        out.push_str(String::from_utf8_lossy(&data).trim_end_matches("\r\n"));
                    }
                    CommandPart::Literal(data) => {
                        out.push_str(&format!("<{} bytes>", data.len()));
                    }
                }
            }
            out
        }
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
    fn test_validated_data_ok() {
        let response = CommandResponse {
            command: "A001 NOOP".to_string(),
            untagged: vec![UntaggedResponse::Exists(3)],
            status: Status::Ok,
            code: None,
            text: "done".to_string(),
        };
        let data = response.validated_data().unwrap();
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_validated_data_no_carries_server_text() {
        let response = CommandResponse {
            command: "A001 SELECT Missing".to_string(),
            untagged: Vec::new(),
            status: Status::No,
            code: None,
            text: "no such mailbox".to_string(),
        };
        match response.validated_data() {
            Err(Error::No(text)) => assert_eq!(text, "no such mailbox"),
            other => panic!("expected NO error, got {other:?}"),
        }
    }

    #[test]
    fn test_describe_redacts_credentials() {
        let described = describe(
            &Command::Login {
                username: "user".to_string(),
                password: "secret".to_string(),
            },
            "A001",
        );
        assert!(!described.contains("secret"));
        assert!(described.contains("user"));
    }

    #[test]
    fn test_describe_elides_literals() {
        let described = describe(
            &Command::Append {
                mailbox: crate::types::Mailbox::inbox(),
                flags: None,
                message: b"secret body".to_vec(),
            },
            "A001",
        );
        assert!(!described.contains("secret body"));
        assert!(described.contains("<11 bytes>"));
    }
}
