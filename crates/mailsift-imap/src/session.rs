//! High-level IMAP session.
//!
//! Wraps the type-state [`Client`] in a runtime state machine
//! (`Disconnected → Connected → Authenticated → Selected`, with
//! `LoggedOut` after LOGOUT) so callers hold one value across
//! reconnects. Every command-issuing method re-establishes the
//! connection first when it has been lost, bounded by the account's
//! timeouts; a timeout or dead connection moves the session back to
//! `Disconnected`.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::timeout;

use crate::command::{FetchAttribute, FetchItems, SearchPart, StatusAttribute, StoreAction};
use crate::config::{AccountConfig, AuthMethod, Encryption, Options, SequenceKind};
use crate::connection::client::{Authenticated, Client, NotAuthenticated, Selected};
use crate::connection::idle::{IdleLoop, IdleStopHandle};
use crate::connection::stream::{ImapStream, connect};
use crate::events::{Event, Events};
use crate::folder::{Folder, build_tree};
use crate::parser::{FetchItem, StatusItem};
use crate::query::Query;
use crate::types::{Flag, MailboxStatus, Quota, SeqNum, SequenceSet, UidValidity};
use crate::{Error, Result};

/// Opens the transport, reads the greeting, negotiates TLS, and
/// authenticates per the account's method. Shared with the IDLE loop,
/// which builds its own session the same way.
pub(crate) async fn connect_and_authenticate(
    account: &AccountConfig,
) -> Result<Client<ImapStream, Authenticated>> {
    let client = establish(account).await?;
    authenticate_client(account, client).await
}

/// Transport + greeting + TLS + capability, bounded by the connect
/// timeout.
async fn establish(account: &AccountConfig) -> Result<Client<ImapStream, NotAuthenticated>> {
    let setup = async {
        let stream = connect(account).await?;
        let mut client = Client::from_stream(stream).await?;

        if account.encryption == Encryption::StartTls {
            client = client.starttls(&account.host, account.validate_cert).await?;
        }
        if client.capabilities().is_empty() {
            client.capability().await?;
        }
        Ok(client)
    };

    match timeout(account.connect_timeout, setup).await {
        Ok(result) => result,
        Err(_) => Err(Error::ConnectionTimedOut(account.connect_timeout)),
    }
}

/// Routes authentication per the configured method.
async fn authenticate_client(
    account: &AccountConfig,
    client: Client<ImapStream, NotAuthenticated>,
) -> Result<Client<ImapStream, Authenticated>> {
    match account.authentication {
        AuthMethod::Login => client.login(&account.username, &account.password).await,
        AuthMethod::Plain => {
            client
                .authenticate_plain(&account.username, &account.password)
                .await
        }
        AuthMethod::OAuth => {
            client
                .authenticate_xoauth2(&account.username, &account.password)
                .await
        }
    }
}

/// Runtime connection state.
enum SessionState {
    /// No transport.
    Disconnected,
    /// Greeting received, not authenticated.
    Connected(Client<ImapStream, NotAuthenticated>),
    /// Authenticated, no mailbox open.
    Authenticated(Client<ImapStream, Authenticated>),
    /// A mailbox is open.
    Selected(Client<ImapStream, Selected>),
    /// LOGOUT completed; reconnectable.
    LoggedOut,
}

/// A live IMAP session for one account.
pub struct Session {
    account: AccountConfig,
    options: Options,
    state: SessionState,
    /// UTF-8 path of the open folder.
    active_folder: Option<String>,
    /// msgno → uid, valid for `cache_validity` only.
    uid_cache: HashMap<u32, u32>,
    cache_validity: Option<UidValidity>,
    events: Events,
}

impl Session {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(account: AccountConfig, options: Options) -> Self {
        Self {
            account,
            options,
            state: SessionState::Disconnected,
            active_folder: None,
            uid_cache: HashMap::new(),
            cache_validity: None,
            events: Events::new(),
        }
    }

    /// The account configuration (read-only once constructed).
    #[must_use]
    pub const fn account(&self) -> &AccountConfig {
        &self.account
    }

    /// The session options.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// The event hook registry for this session.
    #[must_use]
    pub const fn events(&self) -> &Events {
        &self.events
    }

    /// A second session with the same configuration and an independent
    /// transport (used by IDLE so push traffic never blocks commands).
    #[must_use]
    pub fn clone_session(&self) -> Self {
        Self::new(self.account.clone(), self.options.clone())
    }

    /// Returns true while a transport is up.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(
            self.state,
            SessionState::Connected(_) | SessionState::Authenticated(_) | SessionState::Selected(_)
        )
    }

    /// Returns true once authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(
            self.state,
            SessionState::Authenticated(_) | SessionState::Selected(_)
        )
    }

    /// The UTF-8 path of the currently open folder, if any.
    #[must_use]
    pub fn selected_folder(&self) -> Option<&str> {
        self.active_folder.as_deref()
    }

    /// Opens the transport and reads greeting + capabilities. A no-op
    /// when a transport is already up.
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        tracing::debug!(host = %self.account.host, port = self.account.port, "connecting");
        let client = establish(&self.account).await?;
        self.state = SessionState::Connected(client);
        Ok(())
    }

    /// Authenticates per the configured method.
    pub async fn authenticate(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Connected(client) => {
                let bounded = timeout(
                    self.account.stream_timeout,
                    authenticate_client(&self.account, client),
                );
                match bounded.await {
                    Ok(Ok(authenticated)) => {
                        tracing::info!(user = %self.account.username, "authenticated");
                        self.state = SessionState::Authenticated(authenticated);
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(Error::ConnectionTimedOut(self.account.stream_timeout)),
                }
            }
            other @ (SessionState::Authenticated(_) | SessionState::Selected(_)) => {
                self.state = other;
                Ok(())
            }
            other => {
                self.state = other;
                Err(Error::InvalidState("connect before authenticating".into()))
            }
        }
    }

    /// Re-establishes the session if it is not live. Called before every
    /// command-issuing operation; restores the previously open folder
    /// after a reconnect.
    pub async fn check_connection(&mut self) -> Result<()> {
        match self.state {
            SessionState::Authenticated(_) | SessionState::Selected(_) => return Ok(()),
            SessionState::Connected(_) => {
                self.authenticate().await?;
            }
            SessionState::Disconnected | SessionState::LoggedOut => {
                tracing::info!("session not live, reconnecting");
                self.connect().await?;
                self.authenticate().await?;
            }
        }

        if let Some(folder) = self.active_folder.clone() {
            self.do_select(&folder, false).await?;
        }
        Ok(())
    }

    /// Disconnects, sending LOGOUT when authenticated. The active folder
    /// and UID cache are cleared.
    pub async fn disconnect(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::LoggedOut) {
            SessionState::Selected(client) => {
                let _ = timeout(self.account.stream_timeout, client.logout()).await;
            }
            SessionState::Authenticated(client) => {
                let _ = timeout(self.account.stream_timeout, client.logout()).await;
            }
            SessionState::Connected(client) => {
                let _ = timeout(self.account.stream_timeout, client.logout()).await;
            }
            SessionState::Disconnected | SessionState::LoggedOut => {}
        }
        self.active_folder = None;
        self.uid_cache.clear();
        self.cache_validity = None;
        Ok(())
    }

    /// Disconnects and reconnects, preserving configuration and
    /// restoring the open folder.
    pub async fn reconnect(&mut self) -> Result<()> {
        let folder = self.active_folder.clone();
        self.disconnect().await?;
        self.connect().await?;
        self.authenticate().await?;
        if let Some(folder) = folder {
            self.do_select(&folder, true).await?;
        }
        Ok(())
    }

    // === Folders ===

    /// Builds a folder object for a UTF-8 path without touching the
    /// server.
    #[must_use]
    pub fn folder(&self, path: &str) -> Folder {
        Folder::new(path, self.options.delimiter)
    }

    /// Enumerates folders. With `hierarchical` the flat listing is
    /// assembled into a tree via the delimiter; `parent` restricts the
    /// listing to one subtree.
    pub async fn folders(&mut self, hierarchical: bool, parent: Option<&str>) -> Result<Vec<Folder>> {
        self.check_connection().await?;

        let pattern = match parent {
            Some(p) => format!(
                "{}{}*",
                utf7_imap::encode_utf7_imap(p.to_string()),
                self.options.delimiter
            ),
            None => "*".to_string(),
        };

        let rows = {
            let bounded = self.bound();
            let result = match &mut self.state {
                SessionState::Authenticated(c) => timeout(bounded, c.list("", &pattern)).await,
                SessionState::Selected(c) => timeout(bounded, c.list("", &pattern)).await,
                _ => return Err(Error::InvalidState("not authenticated".into())),
            };
            self.settle(result)
                .map_err(|e| wrap_folder_error(&e).unwrap_or(e))?
        };

        let default_delim = self.options.delimiter;
        let folders: Vec<Folder> = rows
            .iter()
            .map(|row| Folder::from_list(row, default_delim))
            .collect();

        Ok(if hierarchical {
            build_tree(folders)
        } else {
            folders
        })
    }

    /// Enumerates subscribed folders (LSUB).
    pub async fn subscribed_folders(&mut self, pattern: &str) -> Result<Vec<Folder>> {
        self.check_connection().await?;

        let rows = {
            let bounded = self.bound();
            let result = match &mut self.state {
                SessionState::Authenticated(c) => timeout(bounded, c.lsub("", pattern)).await,
                SessionState::Selected(c) => timeout(bounded, c.lsub("", pattern)).await,
                _ => return Err(Error::InvalidState("not authenticated".into())),
            };
            self.settle(result)?
        };

        let default_delim = self.options.delimiter;
        Ok(rows
            .iter()
            .map(|row| Folder::from_list(row, default_delim))
            .collect())
    }

    /// Creates a folder and emits `folder.new`.
    pub async fn create_folder(&mut self, path: &str) -> Result<Folder> {
        self.check_connection().await?;
        let wire = utf7_imap::encode_utf7_imap(path.to_string());

        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.create(&wire)).await,
            SessionState::Selected(c) => timeout(bounded, c.create(&wire)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)?;

        let folder = self.folder(path);
        self.events.emit(
            "folder",
            "new",
            &Event::Folder {
                folder: &folder,
                destination: None,
            },
        );
        Ok(folder)
    }

    /// Deletes a folder and emits `folder.deleted`.
    pub async fn delete_folder(&mut self, path: &str) -> Result<()> {
        self.check_connection().await?;

        // Deleting the open folder invalidates the selection.
        if self.active_folder.as_deref() == Some(path) {
            self.close_folder().await?;
        }

        let wire = utf7_imap::encode_utf7_imap(path.to_string());
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.delete(&wire)).await,
            SessionState::Selected(c) => timeout(bounded, c.delete(&wire)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)?;

        let folder = self.folder(path);
        self.events.emit(
            "folder",
            "deleted",
            &Event::Folder {
                folder: &folder,
                destination: None,
            },
        );
        Ok(())
    }

    /// Renames (moves) a folder and emits `folder.moved`.
    pub async fn rename_folder(&mut self, from: &str, to: &str) -> Result<()> {
        self.check_connection().await?;

        let wire_from = utf7_imap::encode_utf7_imap(from.to_string());
        let wire_to = utf7_imap::encode_utf7_imap(to.to_string());
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.rename(&wire_from, &wire_to)).await,
            SessionState::Selected(c) => timeout(bounded, c.rename(&wire_from, &wire_to)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)?;

        if self.active_folder.as_deref() == Some(from) {
            self.active_folder = Some(to.to_string());
        }

        let folder = self.folder(from);
        self.events.emit(
            "folder",
            "moved",
            &Event::Folder {
                folder: &folder,
                destination: Some(to),
            },
        );
        Ok(())
    }

    /// Subscribes to a folder.
    pub async fn subscribe_folder(&mut self, path: &str) -> Result<()> {
        self.check_connection().await?;
        let wire = utf7_imap::encode_utf7_imap(path.to_string());
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.subscribe(&wire)).await,
            SessionState::Selected(c) => timeout(bounded, c.subscribe(&wire)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)
    }

    /// Unsubscribes from a folder.
    pub async fn unsubscribe_folder(&mut self, path: &str) -> Result<()> {
        self.check_connection().await?;
        let wire = utf7_imap::encode_utf7_imap(path.to_string());
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.unsubscribe(&wire)).await,
            SessionState::Selected(c) => timeout(bounded, c.unsubscribe(&wire)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)
    }

    /// Requests STATUS for a folder without selecting it.
    pub async fn folder_status(
        &mut self,
        path: &str,
        items: Vec<StatusAttribute>,
    ) -> Result<Vec<StatusItem>> {
        self.check_connection().await?;
        let wire = utf7_imap::encode_utf7_imap(path.to_string());
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.status(&wire, items)).await,
            SessionState::Selected(c) => timeout(bounded, c.status(&wire, items)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)
    }

    /// Opens (SELECTs) a folder.
    ///
    /// A no-op returning the cached status when the folder is already
    /// open and `force_select` is false. A UIDVALIDITY change flushes
    /// the UID cache.
    pub async fn open_folder(&mut self, path: &str, force_select: bool) -> Result<MailboxStatus> {
        self.check_connection().await?;

        if !force_select && self.active_folder.as_deref() == Some(path) {
            if let SessionState::Selected(client) = &self.state {
                return Ok(client.cached_status().clone());
            }
        }

        self.do_select(path, force_select).await
    }

    /// SELECT without the connection preamble; used by reconnect paths.
    async fn do_select(&mut self, path: &str, force: bool) -> Result<MailboxStatus> {
        if !force && self.active_folder.as_deref() == Some(path) {
            if let SessionState::Selected(client) = &self.state {
                return Ok(client.cached_status().clone());
            }
        }

        let wire = utf7_imap::encode_utf7_imap(path.to_string());
        let bounded = self.bound();

        let outcome = match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Authenticated(client) => timeout(bounded, client.select(&wire)).await,
            SessionState::Selected(client) => timeout(bounded, client.select(&wire)).await,
            other => {
                self.state = other;
                return Err(Error::InvalidState("not authenticated".into()));
            }
        };

        match outcome {
            Ok(Ok((client, status))) => {
                self.state = SessionState::Selected(client);
                self.active_folder = Some(path.to_string());
                self.refresh_uid_validity(status.uid_validity);
                Ok(status)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::ConnectionTimedOut(self.account.stream_timeout)),
        }
    }

    /// Opens a folder read-only (EXAMINE).
    ///
    /// An existing selection is replaced by issuing EXAMINE directly,
    /// never by a CLOSE first: CLOSE would expunge the old mailbox's
    /// `\Deleted` messages, a side effect a read-only open must not have.
    pub async fn examine_folder(&mut self, path: &str) -> Result<MailboxStatus> {
        self.check_connection().await?;

        let wire = utf7_imap::encode_utf7_imap(path.to_string());
        let bounded = self.bound();

        let outcome = match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Authenticated(client) => timeout(bounded, client.examine(&wire)).await,
            SessionState::Selected(client) => timeout(bounded, client.examine(&wire)).await,
            other => {
                self.state = other;
                return Err(Error::InvalidState("not authenticated".into()));
            }
        };

        match outcome {
            Ok(Ok((client, status))) => {
                self.state = SessionState::Selected(client);
                self.active_folder = Some(path.to_string());
                self.refresh_uid_validity(status.uid_validity);
                Ok(status)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::ConnectionTimedOut(self.account.stream_timeout)),
        }
    }

    /// Closes the open folder (CLOSE), returning to the authenticated
    /// state. A no-op without a selection.
    pub async fn close_folder(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Selected(client) => {
                let bounded = self.bound();
                match timeout(bounded, client.close()).await {
                    Ok(Ok(client)) => {
                        self.state = SessionState::Authenticated(client);
                        self.active_folder = None;
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(Error::ConnectionTimedOut(self.account.stream_timeout)),
                }
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    /// Expunges `\Deleted` messages in the open folder.
    pub async fn expunge(&mut self) -> Result<Vec<SeqNum>> {
        self.check_connection().await?;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Selected(c) => timeout(bounded, c.expunge()).await,
            _ => return Err(Error::InvalidState("no folder selected".into())),
        };
        self.settle(result)
    }

    /// Requests a CHECK checkpoint on the open folder.
    pub async fn check(&mut self) -> Result<()> {
        self.check_connection().await?;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Selected(c) => timeout(bounded, c.check()).await,
            _ => return Err(Error::InvalidState("no folder selected".into())),
        };
        self.settle(result)
    }

    /// Sends NOOP (also polls for unsolicited updates).
    pub async fn noop(&mut self) -> Result<()> {
        self.check_connection().await?;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.noop()).await,
            SessionState::Selected(c) => timeout(bounded, c.noop()).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)
    }

    /// Appends a complete RFC 822 message to a folder; returns the UID
    /// on APPENDUID-capable servers.
    pub async fn append(
        &mut self,
        folder: &str,
        flags: Option<Vec<Flag>>,
        message: &[u8],
    ) -> Result<Option<crate::types::Uid>> {
        self.check_connection().await?;
        let wire = utf7_imap::encode_utf7_imap(folder.to_string());
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.append(&wire, flags, message)).await,
            SessionState::Selected(c) => timeout(bounded, c.append(&wire, flags, message)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)
    }

    /// GETQUOTA for a quota root.
    pub async fn quota(&mut self, root: &str) -> Result<Vec<Quota>> {
        self.check_connection().await?;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.get_quota(root)).await,
            SessionState::Selected(c) => timeout(bounded, c.get_quota(root)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)
    }

    /// GETQUOTAROOT for a folder.
    pub async fn quota_root(&mut self, folder: &str) -> Result<(Vec<String>, Vec<Quota>)> {
        self.check_connection().await?;
        let wire = utf7_imap::encode_utf7_imap(folder.to_string());
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.get_quota_root(&wire)).await,
            SessionState::Selected(c) => timeout(bounded, c.get_quota_root(&wire)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)
    }

    /// Exchanges client/server identification (RFC 2971).
    pub async fn id(
        &mut self,
        parameters: Option<Vec<(String, String)>>,
    ) -> Result<Option<Vec<(String, String)>>> {
        self.check_connection().await?;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Authenticated(c) => timeout(bounded, c.id(parameters)).await,
            SessionState::Selected(c) => timeout(bounded, c.id(parameters)).await,
            _ => return Err(Error::InvalidState("not authenticated".into())),
        };
        self.settle(result)
    }

    // === Messages ===

    /// Starts a query against a folder.
    pub fn messages<'a>(&'a mut self, folder: &str) -> Query<'a> {
        Query::new(self, folder)
    }

    /// Builds an IDLE loop over a cloned session for the given folder.
    ///
    /// The loop owns its own transport; this session stays free for
    /// commands. Drive it with [`IdleLoop::run`], stop it with the
    /// returned handle.
    #[must_use]
    pub fn idle<F>(
        &self,
        folder: &str,
        keepalive: Duration,
        callback: F,
    ) -> (IdleLoop<F>, IdleStopHandle)
    where
        F: FnMut(u32, SequenceKind) + Send,
    {
        IdleLoop::new(
            self.account.clone(),
            folder,
            self.options.sequence,
            keepalive,
            callback,
        )
    }

    /// Runs SEARCH (or UID SEARCH per the configured numbering scheme)
    /// and returns matched identifiers.
    pub async fn search(
        &mut self,
        charset: Option<String>,
        program: Vec<SearchPart>,
    ) -> Result<Vec<u32>> {
        let uid = self.options.sequence == SequenceKind::Uid;
        self.search_ids(charset, program, uid).await
    }

    /// SEARCH with an explicit numbering scheme (query layer).
    pub(crate) async fn search_ids(
        &mut self,
        charset: Option<String>,
        program: Vec<SearchPart>,
        uid: bool,
    ) -> Result<Vec<u32>> {
        self.check_connection().await?;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Selected(c) => timeout(bounded, c.search(charset, program, uid)).await,
            _ => return Err(Error::InvalidState("no folder selected".into())),
        };
        self.settle(result)
    }

    /// Runs FETCH for the given identifiers and updates the UID cache
    /// from the response rows.
    pub(crate) async fn fetch_items(
        &mut self,
        ids: &[u32],
        attributes: Vec<FetchAttribute>,
        uid: bool,
    ) -> Result<Vec<(SeqNum, Vec<FetchItem>)>> {
        let Some(sequence) = SequenceSet::from_numbers(ids) else {
            return Ok(Vec::new());
        };
        self.check_connection().await?;

        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Selected(c) => {
                timeout(bounded, c.fetch(&sequence, FetchItems::Items(attributes), uid)).await
            }
            _ => return Err(Error::InvalidState("no folder selected".into())),
        };
        let rows = self.settle(result)?;
        self.remember_uids(&rows);
        Ok(rows)
    }

    /// Modifies flags on the given identifiers, emitting flag events.
    pub async fn store_flags(
        &mut self,
        ids: &[u32],
        action: StoreAction,
        silent: bool,
    ) -> Result<Vec<(SeqNum, Vec<FetchItem>)>> {
        let Some(sequence) = SequenceSet::from_numbers(ids) else {
            return Ok(Vec::new());
        };
        self.check_connection().await?;

        let uid = self.options.sequence == SequenceKind::Uid;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Selected(c) => {
                timeout(bounded, c.store(&sequence, action.clone(), uid, silent)).await
            }
            _ => return Err(Error::InvalidState("no folder selected".into())),
        };
        let rows = self.settle(result)?;

        let (event, flags) = match &action {
            StoreAction::AddFlags(f) | StoreAction::SetFlags(f) => ("new", f.clone()),
            StoreAction::RemoveFlags(f) => ("deleted", f.clone()),
        };
        for id in ids {
            for flag in &flags {
                self.events.emit("flag", event, &Event::Flag { id: *id, flag });
            }
        }

        Ok(rows)
    }

    /// Copies messages to another folder, emitting `message.copied`.
    pub async fn copy_messages(&mut self, ids: &[u32], destination: &str) -> Result<()> {
        let Some(sequence) = SequenceSet::from_numbers(ids) else {
            return Ok(());
        };
        self.check_connection().await?;

        let wire = utf7_imap::encode_utf7_imap(destination.to_string());
        let uid = self.options.sequence == SequenceKind::Uid;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Selected(c) => timeout(bounded, c.copy(&sequence, &wire, uid)).await,
            _ => return Err(Error::InvalidState("no folder selected".into())),
        };
        self.settle(result)?;

        let folder = self.active_folder.clone().unwrap_or_default();
        for id in ids {
            self.events.emit(
                "message",
                "copied",
                &Event::Message {
                    id: *id,
                    folder: &folder,
                    destination: Some(destination),
                },
            );
        }
        Ok(())
    }

    /// Moves messages to another folder, emitting `message.moved`.
    pub async fn move_messages(&mut self, ids: &[u32], destination: &str) -> Result<()> {
        let Some(sequence) = SequenceSet::from_numbers(ids) else {
            return Ok(());
        };
        self.check_connection().await?;

        let wire = utf7_imap::encode_utf7_imap(destination.to_string());
        let uid = self.options.sequence == SequenceKind::Uid;
        let bounded = self.bound();
        let result = match &mut self.state {
            SessionState::Selected(c) => timeout(bounded, c.r#move(&sequence, &wire, uid)).await,
            _ => return Err(Error::InvalidState("no folder selected".into())),
        };
        self.settle(result)?;

        let folder = self.active_folder.clone().unwrap_or_default();
        for id in ids {
            self.events.emit(
                "message",
                "moved",
                &Event::Message {
                    id: *id,
                    folder: &folder,
                    destination: Some(destination),
                },
            );
        }
        Ok(())
    }

    /// Marks messages `\Deleted`, emitting `message.deleted`.
    pub async fn delete_messages(&mut self, ids: &[u32]) -> Result<()> {
        self.store_flags(ids, StoreAction::AddFlags(vec![Flag::Deleted]), true)
            .await?;
        let folder = self.active_folder.clone().unwrap_or_default();
        for id in ids {
            self.events.emit(
                "message",
                "deleted",
                &Event::Message {
                    id: *id,
                    folder: &folder,
                    destination: None,
                },
            );
        }
        Ok(())
    }

    /// Removes `\Deleted`, emitting `message.restored`.
    pub async fn restore_messages(&mut self, ids: &[u32]) -> Result<()> {
        self.store_flags(ids, StoreAction::RemoveFlags(vec![Flag::Deleted]), true)
            .await?;
        let folder = self.active_folder.clone().unwrap_or_default();
        for id in ids {
            self.events.emit(
                "message",
                "restored",
                &Event::Message {
                    id: *id,
                    folder: &folder,
                    destination: None,
                },
            );
        }
        Ok(())
    }

    // === UID cache ===

    /// Looks up the UID cached for a sequence number.
    #[must_use]
    pub fn uid_for_msgno(&self, msgno: u32) -> Option<u32> {
        self.uid_cache.get(&msgno).copied()
    }

    /// Looks up the sequence number cached for a UID.
    #[must_use]
    pub fn msgno_for_uid(&self, uid: u32) -> Option<u32> {
        self.uid_cache
            .iter()
            .find_map(|(msgno, u)| (*u == uid).then_some(*msgno))
    }

    /// Records msgno→uid pairs from FETCH rows.
    fn remember_uids(&mut self, rows: &[(SeqNum, Vec<FetchItem>)]) {
        if !self.options.uid_cache {
            return;
        }
        for (seq, items) in rows {
            for item in items {
                if let FetchItem::Uid(uid) = item {
                    self.uid_cache.insert(seq.get(), uid.get());
                }
            }
        }
    }

    /// Flushes the cache when the mailbox epoch changed.
    fn refresh_uid_validity(&mut self, validity: Option<UidValidity>) {
        if self.cache_validity != validity {
            self.uid_cache.clear();
            self.cache_validity = validity;
        }
    }

    // === Internal plumbing ===

    const fn bound(&self) -> Duration {
        self.account.stream_timeout
    }

    /// Folds a timed command outcome back into the session: timeouts and
    /// dead connections drop the session to `Disconnected`.
    fn settle<T>(
        &mut self,
        outcome: std::result::Result<Result<T>, tokio::time::error::Elapsed>,
    ) -> Result<T> {
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if e.is_connection_dead() {
                    tracing::warn!(error = %e, "connection lost");
                    self.state = SessionState::Disconnected;
                }
                Err(e)
            }
            Err(_) => {
                self.state = SessionState::Disconnected;
                Err(Error::ConnectionTimedOut(self.account.stream_timeout))
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.account.host)
            .field("connected", &self.is_connected())
            .field("authenticated", &self.is_authenticated())
            .field("selected_folder", &self.selected_folder())
            .finish_non_exhaustive()
    }
}

/// Maps listing failures to the folder-level error kind.
fn wrap_folder_error(e: &Error) -> Option<Error> {
    match e {
        Error::No(text) | Error::Bad(text) => {
            Some(Error::FolderFetching(text.clone()))
        }
        _ => None,
    }
}
