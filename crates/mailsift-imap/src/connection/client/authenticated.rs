//! Commands valid after authentication.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{AuthState, Authenticated, Selected};
use crate::command::{Command, StatusAttribute};
use crate::parser::{StatusItem, UntaggedResponse};
use crate::types::{ListResponse, Mailbox, MailboxStatus, ResponseCode};
use crate::Result;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox for read-write access.
    ///
    /// Consumes self and returns a selected client with the mailbox
    /// status snapshot.
    pub async fn select(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let response = self
            .run(&Command::Select {
                mailbox: Mailbox::new(mailbox),
            })
            .await?;
        let read_only = matches!(response.code, Some(ResponseCode::ReadOnly));
        let untagged = response.validated_data()?;
        let mut status = mailbox_status(&untagged);
        status.read_only = read_only;

        Ok((
            Client {
                stream: self.stream,
                tag_gen: self.tag_gen,
                capabilities: self.capabilities,
                state: Selected::new(mailbox, read_only, status.clone()),
            },
            status,
        ))
    }

    /// Examines a mailbox (read-only SELECT).
    pub async fn examine(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let response = self
            .run(&Command::Examine {
                mailbox: Mailbox::new(mailbox),
            })
            .await?;
        let untagged = response.validated_data()?;
        let mut status = mailbox_status(&untagged);
        status.read_only = true;

        Ok((
            Client {
                stream: self.stream,
                tag_gen: self.tag_gen,
                capabilities: self.capabilities,
                state: Selected::new(mailbox, true, status.clone()),
            },
            status,
        ))
    }
}

/// Mailbox management, valid with or without a selection.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
    State: AuthState,
{
    /// Lists mailboxes matching a pattern.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let data = self
            .run(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?
            .validated_data()?;

        Ok(data
            .into_iter()
            .filter_map(|item| match item {
                UntaggedResponse::List(row) => Some(row),
                _ => None,
            })
            .collect())
    }

    /// Lists subscribed mailboxes matching a pattern.
    pub async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let data = self
            .run(&Command::Lsub {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?
            .validated_data()?;

        Ok(data
            .into_iter()
            .filter_map(|item| match item {
                UntaggedResponse::Lsub(row) => Some(row),
                _ => None,
            })
            .collect())
    }

    /// Creates a mailbox.
    pub async fn create(&mut self, mailbox: &str) -> Result<()> {
        self.run(&Command::Create {
            mailbox: Mailbox::new(mailbox),
        })
        .await?
        .validated_data()?;
        Ok(())
    }

    /// Deletes a mailbox.
    pub async fn delete(&mut self, mailbox: &str) -> Result<()> {
        self.run(&Command::Delete {
            mailbox: Mailbox::new(mailbox),
        })
        .await?
        .validated_data()?;
        Ok(())
    }

    /// Renames a mailbox.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.run(&Command::Rename {
            from: Mailbox::new(from),
            to: Mailbox::new(to),
        })
        .await?
        .validated_data()?;
        Ok(())
    }

    /// Subscribes to a mailbox.
    pub async fn subscribe(&mut self, mailbox: &str) -> Result<()> {
        self.run(&Command::Subscribe {
            mailbox: Mailbox::new(mailbox),
        })
        .await?
        .validated_data()?;
        Ok(())
    }

    /// Unsubscribes from a mailbox.
    pub async fn unsubscribe(&mut self, mailbox: &str) -> Result<()> {
        self.run(&Command::Unsubscribe {
            mailbox: Mailbox::new(mailbox),
        })
        .await?
        .validated_data()?;
        Ok(())
    }

    /// Requests mailbox status without selecting it.
    pub async fn status(
        &mut self,
        mailbox: &str,
        items: Vec<StatusAttribute>,
    ) -> Result<Vec<StatusItem>> {
        let data = self
            .run(&Command::Status {
                mailbox: Mailbox::new(mailbox),
                items,
            })
            .await?
            .validated_data()?;

        let mut result = Vec::new();
        for item in data {
            if let UntaggedResponse::Status { items, .. } = item {
                result.extend(items);
            }
        }
        Ok(result)
    }

    /// Appends a complete RFC 822 message to a mailbox.
    ///
    /// Returns the UID assigned by an APPENDUID-capable server.
    pub async fn append(
        &mut self,
        mailbox: &str,
        flags: Option<Vec<crate::types::Flag>>,
        message: &[u8],
    ) -> Result<Option<crate::types::Uid>> {
        let response = self
            .run(&Command::Append {
                mailbox: Mailbox::new(mailbox),
                flags,
                message: message.to_vec(),
            })
            .await?;

        let uid = match &response.code {
            Some(ResponseCode::AppendUid { uid, .. }) => Some(*uid),
            _ => None,
        };
        response.validated_data()?;
        Ok(uid)
    }

    /// Gracefully disconnects.
    pub async fn logout(mut self) -> Result<()> {
        let _ = self.run(&Command::Logout).await;
        Ok(())
    }
}

/// Folds SELECT/EXAMINE untagged data into a status snapshot.
pub(crate) fn mailbox_status(untagged: &[UntaggedResponse]) -> MailboxStatus {
    let mut status = MailboxStatus::default();

    for item in untagged {
        match item {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
                ResponseCode::UidNext(v) => status.uid_next = Some(*v),
                ResponseCode::Unseen(v) => status.unseen = Some(*v),
                ResponseCode::PermanentFlags(flags) => {
                    status.permanent_flags = crate::types::Flags::from_vec(flags.clone());
                }
                _ => {}
            },
            _ => {}
        }
    }

    status
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

    async fn authenticated(
        mock: tokio_test::io::Mock,
    ) -> Client<tokio_test::io::Mock, Authenticated> {
        let client = Client::<_, NotAuthenticated>::from_stream(mock).await.unwrap();
        client.login("user", "pass").await.unwrap()
    }

    fn preamble(builder: &mut tokio_test::io::Builder) -> &mut tokio_test::io::Builder {
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user pass\r\n")
            .read(b"A0000 OK logged in\r\n")
    }

    #[tokio::test]
    async fn test_select_builds_status_snapshot() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 23 EXISTS\r\n")
            .read(b"* 2 RECENT\r\n")
            .read(b"* FLAGS (\\Seen \\Deleted)\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"* OK [UIDNEXT 4392] next\r\n")
            .read(b"A0001 OK [READ-WRITE] SELECT completed\r\n");

        let client = authenticated(builder.build()).await;
        let (client, status) = client.select("INBOX").await.unwrap();

        assert_eq!(status.exists, 23);
        assert_eq!(status.recent, 2);
        assert_eq!(status.uid_validity.unwrap().get(), 3857529045);
        assert_eq!(status.uid_next.unwrap().get(), 4392);
        assert!(!status.read_only);
        assert_eq!(client.mailbox(), "INBOX");
    }

    #[tokio::test]
    async fn test_list_rows() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0001 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n")
            .read(b"* LIST (\\HasChildren) \"/\" \"Work\"\r\n")
            .read(b"A0001 OK LIST completed\r\n");

        let mut client = authenticated(builder.build()).await;
        let rows = client.list("", "*").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].mailbox.as_str(), "Work");
    }

    #[tokio::test]
    async fn test_append_waits_for_continuation() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0001 APPEND INBOX (\\Seen) {14}\r\n")
            .read(b"+ Ready for literal data\r\n")
            .write(b"Subject: x\r\n\r\n")
            .write(b"\r\n")
            .read(b"A0001 OK [APPENDUID 1 42] APPEND completed\r\n");

        let mut client = authenticated(builder.build()).await;
        let uid = client
            .append(
                "INBOX",
                Some(vec![crate::types::Flag::Seen]),
                b"Subject: x\r\n\r\n",
            )
            .await
            .unwrap();
        assert_eq!(uid.unwrap().get(), 42);
    }

    #[tokio::test]
    async fn test_status_items() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0001 STATUS INBOX (MESSAGES UNSEEN)\r\n")
            .read(b"* STATUS INBOX (MESSAGES 231 UNSEEN 3)\r\n")
            .read(b"A0001 OK STATUS completed\r\n");

        let mut client = authenticated(builder.build()).await;
        let items = client
            .status("INBOX", vec![StatusAttribute::Messages, StatusAttribute::Unseen])
            .await
            .unwrap();

        assert!(items.contains(&StatusItem::Messages(231)));
        assert!(items.contains(&StatusItem::Unseen(3)));
    }
}
