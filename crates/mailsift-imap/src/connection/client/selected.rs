//! Commands valid with a mailbox selected.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::authenticated::mailbox_status;
use super::states::{Authenticated, Selected};
use crate::command::{Command, FetchItems, SearchPart, StoreAction};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{Mailbox, MailboxStatus, ResponseCode, SeqNum, SequenceSet};
use crate::Result;

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// The selected mailbox's wire name.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.state.mailbox()
    }

    /// True when the mailbox was opened via EXAMINE.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.state.is_read_only()
    }

    /// Status snapshot from when the mailbox was selected.
    #[must_use]
    pub const fn cached_status(&self) -> &MailboxStatus {
        self.state.status()
    }

    /// Closes the mailbox (implicit expunge) and returns to the
    /// authenticated state.
    pub async fn close(mut self) -> Result<Client<S, Authenticated>> {
        self.run(&Command::Close).await?.validated_data()?;
        Ok(Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state: Authenticated,
        })
    }

    /// Selects a different mailbox, replacing the current selection.
    pub async fn select(mut self, mailbox: &str) -> Result<(Self, MailboxStatus)> {
        let response = self
            .run(&Command::Select {
                mailbox: Mailbox::new(mailbox),
            })
            .await?;
        let read_only = matches!(response.code, Some(ResponseCode::ReadOnly));
        let untagged = response.validated_data()?;
        let mut status = mailbox_status(&untagged);
        status.read_only = read_only;

        self.state = Selected::new(mailbox, read_only, status.clone());
        Ok((self, status))
    }

    /// Examines a different mailbox (read-only), replacing the current
    /// selection.
    ///
    /// Issued directly, never via CLOSE: a deselect through CLOSE would
    /// expunge the old mailbox's `\Deleted` messages, which EXAMINE must
    /// not do.
    pub async fn examine(mut self, mailbox: &str) -> Result<(Self, MailboxStatus)> {
        let response = self
            .run(&Command::Examine {
                mailbox: Mailbox::new(mailbox),
            })
            .await?;
        let untagged = response.validated_data()?;
        let mut status = mailbox_status(&untagged);
        status.read_only = true;

        self.state = Selected::new(mailbox, true, status.clone());
        Ok((self, status))
    }

    /// Requests a CHECK (checkpoint).
    pub async fn check(&mut self) -> Result<()> {
        self.run(&Command::Check).await?.validated_data()?;
        Ok(())
    }

    /// Searches the mailbox; returns matched identifiers (sequence
    /// numbers, or UIDs when `uid` is set).
    pub async fn search(
        &mut self,
        charset: Option<String>,
        program: Vec<SearchPart>,
        uid: bool,
    ) -> Result<Vec<u32>> {
        let data = self
            .run(&Command::Search {
                charset,
                program,
                uid,
            })
            .await?
            .validated_data()?;

        let mut results = Vec::new();
        for item in data {
            if let UntaggedResponse::Search(ids) = item {
                results.extend(ids);
            }
        }
        Ok(results)
    }

    /// Fetches message data for a sequence set.
    ///
    /// Returns `(sequence number, items)` per message row.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
        uid: bool,
    ) -> Result<Vec<(SeqNum, Vec<FetchItem>)>> {
        let data = self
            .run(&Command::Fetch {
                sequence: sequence.clone(),
                items,
                uid,
            })
            .await?
            .validated_data()?;

        Ok(fetch_rows(data))
    }

    /// Modifies flags; returns the resulting FETCH echoes (empty for
    /// `.SILENT`).
    pub async fn store(
        &mut self,
        sequence: &SequenceSet,
        action: StoreAction,
        uid: bool,
        silent: bool,
    ) -> Result<Vec<(SeqNum, Vec<FetchItem>)>> {
        let data = self
            .run(&Command::Store {
                sequence: sequence.clone(),
                action,
                uid,
                silent,
            })
            .await?
            .validated_data()?;

        Ok(fetch_rows(data))
    }

    /// Copies messages to another mailbox.
    pub async fn copy(&mut self, sequence: &SequenceSet, mailbox: &str, uid: bool) -> Result<()> {
        self.run(&Command::Copy {
            sequence: sequence.clone(),
            mailbox: Mailbox::new(mailbox),
            uid,
        })
        .await?
        .validated_data()?;
        Ok(())
    }

    /// Moves messages to another mailbox (RFC 6851).
    pub async fn r#move(
        &mut self,
        sequence: &SequenceSet,
        mailbox: &str,
        uid: bool,
    ) -> Result<()> {
        self.run(&Command::Move {
            sequence: sequence.clone(),
            mailbox: Mailbox::new(mailbox),
            uid,
        })
        .await?
        .validated_data()?;
        Ok(())
    }

    /// Permanently removes `\Deleted` messages; returns the expunged
    /// sequence numbers.
    pub async fn expunge(&mut self) -> Result<Vec<SeqNum>> {
        let data = self.run(&Command::Expunge).await?.validated_data()?;

        Ok(data
            .into_iter()
            .filter_map(|item| match item {
                UntaggedResponse::Expunge(seq) => Some(seq),
                _ => None,
            })
            .collect())
    }

}

/// Extracts FETCH rows from untagged data.
fn fetch_rows(data: Vec<UntaggedResponse>) -> Vec<(SeqNum, Vec<FetchItem>)> {
    data.into_iter()
        .filter_map(|item| match item {
            UntaggedResponse::Fetch { seq, items } => Some((seq, items)),
            _ => None,
        })
        .collect()
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
    use crate::types::Flag;

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
    async fn test_uid_search() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 UID SEARCH UNSEEN\r\n")
            .read(b"* SEARCH 7 9 12\r\n")
            .read(b"A0002 OK SEARCH completed\r\n");

        let mut client = selected(builder.build()).await;
        let ids = client
            .search(None, vec![SearchPart::Keyword("UNSEEN".to_string())], true)
            .await
            .unwrap();
        assert_eq!(ids, vec![7, 9, 12]);
    }

    #[tokio::test]
    async fn test_fetch_rows() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 FETCH 1 (FLAGS UID)\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen) UID 7)\r\n")
            .read(b"A0002 OK FETCH completed\r\n");

        let mut client = selected(builder.build()).await;
        let rows = client
            .fetch(
                &SequenceSet::single(1).unwrap(),
                FetchItems::Items(vec![
                    crate::command::FetchAttribute::Flags,
                    crate::command::FetchAttribute::Uid,
                ]),
                false,
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.get(), 1);
    }

    #[tokio::test]
    async fn test_store_returns_echo() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 UID STORE 5 +FLAGS (\\Seen)\r\n")
            .read(b"* 1 FETCH (UID 5 FLAGS (\\Seen))\r\n")
            .read(b"A0002 OK STORE completed\r\n");

        let mut client = selected(builder.build()).await;
        let rows = client
            .store(
                &SequenceSet::single(5).unwrap(),
                StoreAction::AddFlags(vec![Flag::Seen]),
                true,
                false,
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        let flags = rows[0].1.iter().find_map(|i| match i {
            FetchItem::Flags(f) => Some(f.clone()),
            _ => None,
        });
        assert!(flags.unwrap().is_seen());
    }

    #[tokio::test]
    async fn test_expunge_sequence_numbers() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 EXPUNGE\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"A0002 OK expunged\r\n");

        let mut client = selected(builder.build()).await;
        let expunged = client.expunge().await.unwrap();
        assert_eq!(expunged.iter().map(|s| s.get()).collect::<Vec<_>>(), vec![3, 3]);
    }

    #[tokio::test]
    async fn test_examine_in_place_without_close() {
        // The mock asserts the exact byte sequence: switching to a
        // read-only mailbox must issue EXAMINE directly, with no CLOSE
        // (and therefore no implicit expunge) in between.
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 EXAMINE Archive\r\n")
            .read(b"* 4 EXISTS\r\n")
            .read(b"A0002 OK [READ-ONLY] EXAMINE completed\r\n");

        let client = selected(builder.build()).await;
        assert!(!client.is_read_only());

        let (client, status) = client.examine("Archive").await.unwrap();
        assert_eq!(client.mailbox(), "Archive");
        assert!(client.is_read_only());
        assert!(status.read_only);
        assert_eq!(status.exists, 4);
    }

    #[tokio::test]
    async fn test_close_returns_authenticated() {
        let mut builder = tokio_test::io::Builder::new();
        preamble(&mut builder)
            .write(b"A0002 CLOSE\r\n")
            .read(b"A0002 OK closed\r\n");

        let client = selected(builder.build()).await;
        let _client: Client<_, Authenticated> = client.close().await.unwrap();
    }
}
