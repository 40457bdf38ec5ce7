//! IMAP IDLE support (RFC 2177).
//!
//! [`IdleHandle`] drives one IDLE command on an existing selected
//! client. [`IdleLoop`] is the long-lived variant: it owns its own
//! session built from a cloned account configuration (so the primary
//! session stays free for commands), re-issues IDLE when the keepalive
//! TTL or the stream timeout elapses, reconnects on connection loss, and
//! honours a cooperative stop signal between reads.

#![allow(clippy::missing_errors_doc)]

use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time::timeout;

use super::client::{Client, Selected};
use super::framed::FramedStream;
use crate::command::Command;
use crate::config::{AccountConfig, SequenceKind};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Flags, SeqNum, Status};
use crate::{Error, Result};

/// Event received during IDLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleEvent {
    /// New message count (EXISTS push).
    Exists(u32),
    /// Message expunged.
    Expunge(SeqNum),
    /// Flags changed on a message.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Updated flags.
        flags: Flags,
    },
    /// Recent count changed.
    Recent(u32),
    /// The wait elapsed without server traffic.
    Timeout,
}

/// Handle for an active IDLE command.
///
/// Borrows the selected client's stream; call [`IdleHandle::done`] to
/// exit IDLE and return control to the client.
pub struct IdleHandle<'a, S> {
    stream: &'a mut FramedStream<S>,
    tag: String,
}

impl<'a, S> IdleHandle<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) const fn new(stream: &'a mut FramedStream<S>, tag: String) -> Self {
        Self { stream, tag }
    }

    /// Waits for the next pushed update or the timeout.
    pub async fn wait(&mut self, duration: Duration) -> Result<IdleEvent> {
        match timeout(duration, self.stream.read_response()).await {
            Ok(Ok(response)) => self.parse_event(&response),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(IdleEvent::Timeout),
        }
    }

    fn parse_event(&self, response: &[u8]) -> Result<IdleEvent> {
        match ResponseParser::parse(response)? {
            Response::Untagged(untagged) => match untagged {
                UntaggedResponse::Exists(n) => Ok(IdleEvent::Exists(n)),
                UntaggedResponse::Recent(n) => Ok(IdleEvent::Recent(n)),
                UntaggedResponse::Expunge(seq) => Ok(IdleEvent::Expunge(seq)),
                UntaggedResponse::Fetch { seq, items } => {
                    let flags = items
                        .into_iter()
                        .find_map(|item| match item {
                            crate::parser::FetchItem::Flags(f) => Some(f),
                            _ => None,
                        })
                        .unwrap_or_default();
                    Ok(IdleEvent::Fetch { seq, flags })
                }
                UntaggedResponse::Bye { text, .. } => Err(Error::Bye(text)),
                // Other untagged rows during IDLE carry nothing we track.
                _ => Ok(IdleEvent::Timeout),
            },
            Response::Continuation { .. } => Err(Error::Protocol(
                "unexpected continuation during IDLE".to_string(),
            )),
            Response::Tagged {
                tag, status, text, ..
            } => {
                if tag.as_str() == self.tag {
                    match status {
                        // Server ended IDLE on its own; surface as a
                        // timeout so the loop renews.
                        Status::Ok => Ok(IdleEvent::Timeout),
                        Status::No => Err(Error::No(text)),
                        Status::Bad => Err(Error::Bad(text)),
                        Status::Bye => Err(Error::Bye(text)),
                        Status::PreAuth => {
                            Err(Error::Protocol("unexpected PREAUTH in IDLE".to_string()))
                        }
                    }
                } else {
                    Err(Error::Protocol(format!(
                        "unexpected tag {} during IDLE",
                        tag.as_str()
                    )))
                }
            }
        }
    }

    /// Sends DONE and drains to the tagged completion.
    pub async fn done(self) -> Result<()> {
        for part in Command::Done.serialize("") {
            if let crate::command::CommandPart::Line(data) = part {
                self.stream.write_command(&data).await?;
            }
        }

        loop {
            let response = self.stream.read_response().await?;
            if let Ok(Response::Tagged {
                tag, status, text, ..
            }) = ResponseParser::parse(&response)
            {
                if tag.as_str() == self.tag {
                    return match status {
                        Status::Ok => Ok(()),
                        Status::No => Err(Error::No(text)),
                        Status::Bad => Err(Error::Bad(text)),
                        Status::Bye => Err(Error::Bye(text)),
                        Status::PreAuth => {
                            Err(Error::Protocol("unexpected PREAUTH after DONE".to_string()))
                        }
                    };
                }
            }
            // Untagged rows racing the DONE are drained and dropped.
        }
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Enters IDLE; the returned handle delivers pushed updates until
    /// [`IdleHandle::done`].
    pub async fn idle(&mut self) -> Result<IdleHandle<'_, S>> {
        let tag = self.tag_gen.next();
        for part in Command::Idle.serialize(&tag) {
            if let crate::command::CommandPart::Line(data) = part {
                self.stream.write_command(&data).await?;
            }
        }

        let response = self.stream.read_response().await?;
        if !response.starts_with(b"+") {
            if let Response::Tagged { status, text, .. } = ResponseParser::parse(&response)? {
                return match status {
                    Status::No => Err(Error::No(text)),
                    Status::Bad => Err(Error::Bad(text)),
                    _ => Err(Error::Protocol("unexpected response to IDLE".to_string())),
                };
            }
            return Err(Error::Protocol(
                "expected continuation for IDLE".to_string(),
            ));
        }

        Ok(IdleHandle::new(&mut self.stream, tag))
    }
}

/// Stop handle for an [`IdleLoop`]; signal it from any task.
#[derive(Debug, Clone)]
pub struct IdleStopHandle {
    tx: watch::Sender<bool>,
}

impl IdleStopHandle {
    /// Requests a clean shutdown; the loop exits between two reads.
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Outcome of one IDLE wait, resolved outside the select so the handle
/// can be consumed cleanly.
enum Step {
    Deliver(u32),
    Nothing,
    Renew,
    Reconnect(Error),
    Shutdown,
    Fatal(Error),
}

/// Long-lived push-notification loop over its own cloned session.
pub struct IdleLoop<F> {
    account: AccountConfig,
    folder: String,
    sequence: SequenceKind,
    keepalive: Duration,
    callback: F,
    stop: watch::Receiver<bool>,
}

impl<F> IdleLoop<F>
where
    F: FnMut(u32, SequenceKind) + Send,
{
    /// Default keepalive TTL; RFC 2177 allows 29 minutes but most
    /// servers drop idle connections sooner.
    pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(10 * 60);

    /// Creates a loop for the folder (UTF-8 path) with its stop handle.
    ///
    /// The callback receives the message count from each `EXISTS` push
    /// together with the numbering scheme the session is configured for.
    #[must_use]
    pub fn new(
        account: AccountConfig,
        folder: impl Into<String>,
        sequence: SequenceKind,
        keepalive: Duration,
        callback: F,
    ) -> (Self, IdleStopHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                account,
                folder: folder.into(),
                sequence,
                keepalive,
                callback,
                stop: rx,
            },
            IdleStopHandle { tx },
        )
    }

    /// Runs until stopped.
    ///
    /// Stream timeouts and keepalive expiry renew the IDLE by
    /// reconnecting (some servers drop idle sessions without a word);
    /// connection loss reconnects with a short backoff. Only
    /// non-recoverable protocol errors abort the loop.
    pub async fn run(mut self) -> Result<()> {
        let stream_timeout = self.account.stream_timeout;
        let mut stop = self.stop.clone();

        while !*stop.borrow() {
            let client = match crate::session::connect_and_authenticate(&self.account).await {
                Ok(client) => client,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(error = %e, "idle connect failed, retrying");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let wire = utf7_imap::encode_utf7_imap(self.folder.clone());
            let mut client = match client.select(&wire).await {
                Ok((client, _)) => client,
                Err(e) if e.is_connection_dead() => {
                    tracing::warn!(error = %e, "idle select failed, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut handle = match client.idle().await {
                Ok(handle) => handle,
                Err(e) if e.is_connection_dead() => continue,
                Err(e) => return Err(e),
            };

            let deadline = Instant::now() + self.keepalive;
            loop {
                if *stop.borrow() {
                    let _ = handle.done().await;
                    let _ = client.logout().await;
                    return Ok(());
                }

                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    // Keepalive TTL elapsed: DONE, then a fresh session.
                    tracing::debug!(folder = %self.folder, "idle keepalive renewal");
                    let _ = handle.done().await;
                    break;
                }

                let wait = remaining.min(stream_timeout);
                let step = tokio::select! {
                    _ = stop.changed() => Step::Shutdown,
                    event = handle.wait(wait) => match event {
                        Ok(IdleEvent::Exists(n)) => Step::Deliver(n),
                        // Quiet past the stream timeout: renew.
                        Ok(IdleEvent::Timeout) => Step::Renew,
                        Ok(_) => Step::Nothing,
                        Err(e) if e.is_connection_dead() => Step::Reconnect(e),
                        Err(e) => Step::Fatal(e),
                    }
                };

                match step {
                    Step::Deliver(n) => (self.callback)(n, self.sequence),
                    Step::Nothing => {}
                    Step::Renew => {
                        let _ = handle.done().await;
                        break;
                    }
                    Step::Reconnect(e) => {
                        tracing::warn!(error = %e, "idle connection lost, reconnecting");
                        break;
                    }
                    Step::Shutdown => {
                        let _ = handle.done().await;
                        let _ = client.logout().await;
                        return Ok(());
                    }
                    Step::Fatal(e) => return Err(e),
                }
            }
        }

        Ok(())
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
    use crate::connection::client::NotAuthenticated;

    async fn selected(
        mock: tokio_test::io::Mock,
    ) -> Client<tokio_test::io::Mock, Selected> {
        let client = Client::<_, NotAuthenticated>::from_stream(mock).await.unwrap();
        let client = client.login("user", "pass").await.unwrap();
        let (client, _) = client.select("INBOX").await.unwrap();
        client
    }

    fn preamble(builder: &mut tokio_test::io::Builder) -> &mut tokio_test::io::Builder {
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user pass\r\n")
            .read(b"A0000 OK logged in\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 1 EXISTS\r\n")
            .read(b"A0001 OK [READ-WRITE] done\r\n")
    }

    #[tokio::test]
    async fn test_idle_receives_exists() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read(b"* 2 EXISTS\r\n")
            .write(b"DONE\r\n")
            .read(b"A0002 OK IDLE terminated\r\n");

        let mut client = selected(builder.build()).await;
        let mut handle = client.idle().await.unwrap();

        let event = handle.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(event, IdleEvent::Exists(2));

        handle.done().await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_timeout_is_not_an_error() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 IDLE\r\n")
            .read(b"+ idling\r\n")
            // Mock delays the next read beyond the wait below.
            .wait(Duration::from_millis(100))
            .read(b"* 3 EXISTS\r\n")
            .write(b"DONE\r\n")
            .read(b"A0002 OK done\r\n");

        let mut client = selected(builder.build()).await;
        let mut handle = client.idle().await.unwrap();

        let event = handle.wait(Duration::from_millis(10)).await.unwrap();
        assert_eq!(event, IdleEvent::Timeout);

        // Traffic after the quiet period still arrives.
        let event = handle.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(event, IdleEvent::Exists(3));

        handle.done().await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_rejected() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 IDLE\r\n")
            .read(b"A0002 BAD IDLE not supported\r\n");

        let mut client = selected(builder.build()).await;
        assert!(matches!(client.idle().await, Err(Error::Bad(_))));
    }

    #[tokio::test]
    async fn test_done_drains_racing_updates() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .write(b"DONE\r\n")
            .read(b"* 5 EXISTS\r\n")
            .read(b"A0002 OK IDLE terminated\r\n");

        let mut client = selected(builder.build()).await;
        let handle = client.idle().await.unwrap();
        handle.done().await.unwrap();
    }
}
