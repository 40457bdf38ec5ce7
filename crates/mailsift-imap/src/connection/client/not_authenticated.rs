//! Commands valid before authentication.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::connection::stream::ImapStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::ResponseCode;
use crate::{Error, Result};

/// SASL PLAIN initial response: `\0user\0password`, base64-encoded.
fn plain_response(username: &str, password: &str) -> String {
    STANDARD.encode(format!("\0{username}\0{password}"))
}

/// XOAUTH2 initial response per the Google/Microsoft scheme.
fn xoauth2_response(username: &str, access_token: &str) -> String {
    STANDARD.encode(format!(
        "user={username}\x01auth=Bearer {access_token}\x01\x01"
    ))
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a connected stream, reading the greeting
    /// and any capabilities it carries.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let response = ResponseParser::parse(&greeting)?;

        let mut capabilities = Vec::new();
        if let Response::Untagged(untagged) = response {
            match untagged {
                UntaggedResponse::Ok {
                    code: Some(ResponseCode::Capability(caps)),
                    ..
                }
                | UntaggedResponse::PreAuth {
                    code: Some(ResponseCode::Capability(caps)),
                    ..
                } => capabilities = caps,
                UntaggedResponse::Bye { text, .. } => return Err(Error::Bye(text)),
                _ => {}
            }
        }

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            state: NotAuthenticated,
        })
    }

    /// Authenticates with LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success.
    pub async fn login(
        self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.finish_authentication(command).await
    }

    /// Authenticates with AUTHENTICATE PLAIN (SASL initial response).
    pub async fn authenticate_plain(
        self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let command = Command::Authenticate {
            mechanism: "PLAIN".to_string(),
            initial_response: Some(plain_response(username, password)),
        };
        self.finish_authentication(command).await
    }

    /// Authenticates with AUTHENTICATE XOAUTH2; `access_token` is the
    /// bearer token.
    pub async fn authenticate_xoauth2(
        self,
        username: &str,
        access_token: &str,
    ) -> Result<Client<S, Authenticated>> {
        let command = Command::Authenticate {
            mechanism: "XOAUTH2".to_string(),
            initial_response: Some(xoauth2_response(username, access_token)),
        };
        self.finish_authentication(command).await
    }

    /// Authenticates with the SASL LOGIN mechanism: the server prompts
    /// for username and password in two continuation rounds, each
    /// answered base64-encoded.
    pub async fn authenticate_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let tag = self.tag_gen.next();
        let command = Command::Authenticate {
            mechanism: "LOGIN".to_string(),
            initial_response: None,
        };
        for part in command.serialize(&tag) {
            if let crate::command::CommandPart::Line(data) = part {
                self.stream.write_command(&data).await?;
            }
        }

        let mut responses = [username, password].into_iter();
        loop {
            let response = self.stream.read_response().await?;
            if response.starts_with(b"+") {
                let answer = responses.next().ok_or_else(|| {
                    Error::Protocol("server requested a third LOGIN round".to_string())
                })?;
                let mut line = STANDARD.encode(answer).into_bytes();
                line.extend_from_slice(b"\r\n");
                self.stream.write_command(&line).await?;
                continue;
            }

            match ResponseParser::parse(&response)? {
                Response::Tagged {
                    tag: resp_tag,
                    status,
                    text,
                    ..
                } if resp_tag.as_str() == tag => {
                    return match status {
                        crate::types::Status::Ok => Ok(Client {
                            stream: self.stream,
                            tag_gen: self.tag_gen,
                            capabilities: self.capabilities,
                            state: Authenticated,
                        }),
                        _ => Err(Error::AuthFailed(text)),
                    };
                }
                Response::Untagged(UntaggedResponse::Capability(caps)) => {
                    self.capabilities = caps;
                }
                _ => {}
            }
        }
    }

    /// Runs an authentication command and transitions state.
    ///
    /// A NO/BAD completion surfaces as [`Error::AuthFailed`] carrying the
    /// server text only, never the credentials.
    async fn finish_authentication(
        mut self,
        command: Command,
    ) -> Result<Client<S, Authenticated>> {
        let response = self.run(&command).await?;
        let untagged = response.validated_data().map_err(|e| match e {
            Error::No(text) | Error::Bad(text) => Error::AuthFailed(text),
            other => other,
        })?;

        for item in untagged {
            if let UntaggedResponse::Capability(caps) = item {
                self.capabilities = caps;
            }
        }

        Ok(Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state: Authenticated,
        })
    }

    /// Gracefully disconnects.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.tag_gen.next();
        for part in Command::Logout.serialize(&tag) {
            if let crate::command::CommandPart::Line(data) = part {
                self.stream.write_command(&data).await?;
            }
        }
        let _ = self.read_until_tagged(&tag).await;
        Ok(())
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Issues STARTTLS and upgrades the transport.
    ///
    /// Capabilities are cleared; the caller should re-issue CAPABILITY
    /// over the encrypted stream (pre-TLS advertisements are untrusted).
    pub async fn starttls(mut self, host: &str, validate_cert: bool) -> Result<Self> {
        if !self.has_capability(&crate::types::Capability::StartTls) {
            return Err(Error::ProtocolNotSupported(
                "server does not advertise STARTTLS".to_string(),
            ));
        }

        self.run(&Command::StartTls).await?.validated_data()?;

        let plain = self.stream.into_inner();
        let upgraded = plain.upgrade_to_tls(host, validate_cert).await?;

        Ok(Self {
            stream: FramedStream::new(upgraded),
            tag_gen: self.tag_gen,
            capabilities: Vec::new(),
            state: NotAuthenticated,
        })
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
    fn test_plain_response() {
        // \0user\0pass
        assert_eq!(plain_response("user", "pass"), "AHVzZXIAcGFzcw==");
    }

    #[test]
    fn test_xoauth2_response_round_trip() {
        let encoded = xoauth2_response("user@example.com", "token123");
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(
            decoded,
            b"user=user@example.com\x01auth=Bearer token123\x01\x01"
        );
    }

    #[tokio::test]
    async fn test_from_stream_reads_greeting_capabilities() {
        let mock = tokio_test::io::Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 IDLE] ready\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        assert!(client.supports_idle());
    }

    #[tokio::test]
    async fn test_from_stream_bye_greeting_fails() {
        let mock = tokio_test::io::Builder::new()
            .read(b"* BYE overloaded\r\n")
            .build();
        assert!(matches!(
            Client::from_stream(mock).await,
            Err(Error::Bye(_))
        ));
    }

    #[tokio::test]
    async fn test_login_rejection_is_auth_failed() {
        let mock = tokio_test::io::Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user secret\r\n")
            .read(b"A0000 NO [AUTHENTICATIONFAILED] bad credentials\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        match client.login("user", "secret").await {
            Err(Error::AuthFailed(text)) => assert!(!text.contains("secret")),
            other => panic!("expected AuthFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_login_two_rounds() {
        let mock = tokio_test::io::Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 AUTHENTICATE LOGIN\r\n")
            .read(b"+ VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"+ UGFzc3dvcmQ6\r\n")
            .write(b"cGFzcw==\r\n")
            .read(b"A0000 OK authenticated\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let _client = client.authenticate_login("user", "pass").await.unwrap();
    }

    #[tokio::test]
    async fn test_login_success_updates_capabilities() {
        let mock = tokio_test::io::Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user pass\r\n")
            .read(b"* CAPABILITY IMAP4rev1 MOVE\r\n")
            .read(b"A0000 OK logged in\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("user", "pass").await.unwrap();
        assert!(client.supports_move());
    }
}
