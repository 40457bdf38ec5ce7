//! Search-and-fetch query layer.
//!
//! A [`Query`] is a fluent SEARCH-criteria builder bound to a session
//! and folder. It emits a valid IMAP search program, runs the matched
//! identifiers through the population pipeline (FLAGS, headers, body),
//! and materialises each into a [`Message`] collected under a uniform
//! key. Paging, chunking, and predicate filtering slice the identifier
//! list before any FETCH goes out.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::command::{FetchAttribute, SearchPart};
use crate::config::{FetchFlavour, FetchOrder, MessageKey, SequenceKind};
use crate::error::{Error, Result};
use crate::parser::FetchItem;
use crate::session::Session;
use crate::types::Flags;

/// A materialised message with its IMAP identity.
#[derive(Debug, Clone)]
pub struct Message {
    /// UID, when fetched.
    pub uid: Option<u32>,
    /// Message sequence number.
    pub msgno: u32,
    /// Flags, when fetched.
    pub flags: Flags,
    /// The parsed RFC 822 entity.
    pub mail: mailsift_mime::Message,
    /// Raw source (headers + body) as assembled from the FETCH.
    pub raw: Option<Vec<u8>>,
    /// Whether flags were requested during population.
    pub fetched_flags: bool,
    /// Whether the body was requested during population.
    pub fetched_body: bool,
}

impl Message {
    /// Decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.mail.subject()
    }

    /// Parsed Date header; `None` when absent or unparseable.
    #[must_use]
    pub fn date(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        self.mail.date()
    }

    /// From addresses.
    #[must_use]
    pub fn from(&self) -> Vec<mailsift_mime::Address> {
        self.mail.from()
    }

    /// To addresses.
    #[must_use]
    pub fn to(&self) -> Vec<mailsift_mime::Address> {
        self.mail.to()
    }

    /// The plain-text body, if any.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        self.mail.text_body()
    }

    /// The HTML body, if any.
    #[must_use]
    pub fn html_body(&self) -> Option<&str> {
        self.mail.html_body()
    }

    /// Returns true if an HTML body is present.
    #[must_use]
    pub fn has_html_body(&self) -> bool {
        self.mail.has_html_body()
    }

    /// Attachments.
    #[must_use]
    pub fn attachments(&self) -> &[mailsift_mime::Attachment] {
        &self.mail.attachments
    }

    /// Message-ID with angle brackets stripped.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        self.mail.message_id()
    }
}

/// Insertion-ordered message collection with uniform keys.
#[derive(Debug, Clone, Default)]
pub struct MessageCollection {
    entries: Vec<(String, Message)>,
}

impl MessageCollection {
    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks a message up by its key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Message> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, m)| m)
    }

    /// Iterates `(key, message)` pairs in population order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Message)> {
        self.entries.iter().map(|(k, m)| (k.as_str(), m))
    }

    /// Iterates the messages in population order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(|(_, m)| m)
    }

    /// The first message, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Message> {
        self.entries.first().map(|(_, m)| m)
    }

    fn push(&mut self, key: String, message: Message) {
        self.entries.push((key, message));
    }
}

impl IntoIterator for MessageCollection {
    type Item = (String, Message);
    type IntoIter = std::vec::IntoIter<(String, Message)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Fluent search query bound to a session and folder.
pub struct Query<'s> {
    session: &'s mut Session,
    folder: String,
    parts: Vec<SearchPart>,
    fetch_order: FetchOrder,
    sequence: SequenceKind,
    message_key: MessageKey,
    limit: Option<(usize, usize)>,
    fetch_flags: bool,
    fetch_body: bool,
    peek: bool,
    soft_fail: bool,
    errors: HashMap<u32, Error>,
}

impl<'s> Query<'s> {
    /// Creates a query against a folder (UTF-8 path), inheriting the
    /// session's options.
    pub fn new(session: &'s mut Session, folder: &str) -> Self {
        let options = session.options().clone();
        Self {
            session,
            folder: folder.to_string(),
            parts: Vec::new(),
            fetch_order: options.fetch_order,
            sequence: options.sequence,
            message_key: options.message_key,
            limit: None,
            fetch_flags: true,
            fetch_body: true,
            peek: options.fetch == FetchFlavour::Peek,
            soft_fail: options.soft_fail,
            errors: HashMap::new(),
        }
    }

    // === Criteria ===

    /// Adds a bare keyword criterion (uppercased on emission).
    #[must_use]
    pub fn criterion(mut self, keyword: &str) -> Self {
        self.parts.push(SearchPart::Keyword(keyword.to_string()));
        self
    }

    /// Adds a keyword criterion with a string argument.
    #[must_use]
    pub fn criterion_text(mut self, keyword: &str, value: &str) -> Self {
        self.parts.push(SearchPart::Keyword(keyword.to_string()));
        self.parts.push(SearchPart::Text(value.to_string()));
        self
    }

    /// Adds a keyword criterion with a date argument (`DD-Mon-YYYY`).
    #[must_use]
    pub fn criterion_date(mut self, keyword: &str, date: NaiveDate) -> Self {
        self.parts.push(SearchPart::Keyword(keyword.to_string()));
        self.parts
            .push(SearchPart::Date(date.format("%d-%b-%Y").to_string()));
        self
    }

    /// Adds a keyword criterion with a numeric argument.
    #[must_use]
    pub fn criterion_number(mut self, keyword: &str, value: u64) -> Self {
        self.parts.push(SearchPart::Keyword(keyword.to_string()));
        self.parts.push(SearchPart::Number(value));
        self
    }

    /// ALL.
    #[must_use]
    pub fn all(self) -> Self {
        self.criterion("ALL")
    }

    /// ANSWERED.
    #[must_use]
    pub fn answered(self) -> Self {
        self.criterion("ANSWERED")
    }

    /// BCC substring match.
    #[must_use]
    pub fn bcc(self, value: &str) -> Self {
        self.criterion_text("BCC", value)
    }

    /// BEFORE an internal date.
    #[must_use]
    pub fn before(self, date: NaiveDate) -> Self {
        self.criterion_date("BEFORE", date)
    }

    /// BODY substring match.
    #[must_use]
    pub fn body(self, value: &str) -> Self {
        self.criterion_text("BODY", value)
    }

    /// CC substring match.
    #[must_use]
    pub fn cc(self, value: &str) -> Self {
        self.criterion_text("CC", value)
    }

    /// DELETED.
    #[must_use]
    pub fn deleted(self) -> Self {
        self.criterion("DELETED")
    }

    /// DRAFT.
    #[must_use]
    pub fn draft(self) -> Self {
        self.criterion("DRAFT")
    }

    /// FLAGGED.
    #[must_use]
    pub fn flagged(self) -> Self {
        self.criterion("FLAGGED")
    }

    /// FROM substring match.
    #[must_use]
    pub fn from(self, value: &str) -> Self {
        self.criterion_text("FROM", value)
    }

    /// HEADER field match.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.parts.push(SearchPart::Keyword("HEADER".to_string()));
        self.parts.push(SearchPart::Text(name.to_string()));
        self.parts.push(SearchPart::Text(value.to_string()));
        self
    }

    /// KEYWORD flag match.
    #[must_use]
    pub fn keyword(self, value: &str) -> Self {
        self.criterion_text("KEYWORD", value)
    }

    /// LARGER than n octets.
    #[must_use]
    pub fn larger(self, size: u64) -> Self {
        self.criterion_number("LARGER", size)
    }

    /// NEW (recent and unseen).
    #[must_use]
    pub fn new_messages(self) -> Self {
        self.criterion("NEW")
    }

    /// NOT, applying to the criterion that follows.
    #[must_use]
    pub fn not(self) -> Self {
        self.criterion("NOT")
    }

    /// OLD.
    #[must_use]
    pub fn old(self) -> Self {
        self.criterion("OLD")
    }

    /// ON an internal date.
    #[must_use]
    pub fn on(self, date: NaiveDate) -> Self {
        self.criterion_date("ON", date)
    }

    /// OR, applying to the two criteria that follow.
    #[must_use]
    pub fn or(self) -> Self {
        self.criterion("OR")
    }

    /// RECENT.
    #[must_use]
    pub fn recent(self) -> Self {
        self.criterion("RECENT")
    }

    /// SEEN.
    #[must_use]
    pub fn seen(self) -> Self {
        self.criterion("SEEN")
    }

    /// SENTBEFORE a Date header date.
    #[must_use]
    pub fn sent_before(self, date: NaiveDate) -> Self {
        self.criterion_date("SENTBEFORE", date)
    }

    /// SENTON a Date header date.
    #[must_use]
    pub fn sent_on(self, date: NaiveDate) -> Self {
        self.criterion_date("SENTON", date)
    }

    /// SENTSINCE a Date header date.
    #[must_use]
    pub fn sent_since(self, date: NaiveDate) -> Self {
        self.criterion_date("SENTSINCE", date)
    }

    /// SINCE an internal date.
    #[must_use]
    pub fn since(self, date: NaiveDate) -> Self {
        self.criterion_date("SINCE", date)
    }

    /// SMALLER than n octets.
    #[must_use]
    pub fn smaller(self, size: u64) -> Self {
        self.criterion_number("SMALLER", size)
    }

    /// SUBJECT substring match.
    #[must_use]
    pub fn subject(self, value: &str) -> Self {
        self.criterion_text("SUBJECT", value)
    }

    /// TEXT substring match (headers and body).
    #[must_use]
    pub fn text(self, value: &str) -> Self {
        self.criterion_text("TEXT", value)
    }

    /// TO substring match.
    #[must_use]
    pub fn to(self, value: &str) -> Self {
        self.criterion_text("TO", value)
    }

    /// UID set match.
    #[must_use]
    pub fn uid(mut self, set: &str) -> Self {
        self.parts.push(SearchPart::Keyword("UID".to_string()));
        self.parts.push(SearchPart::Sequence(set.to_string()));
        self
    }

    /// UNANSWERED.
    #[must_use]
    pub fn unanswered(self) -> Self {
        self.criterion("UNANSWERED")
    }

    /// UNDELETED.
    #[must_use]
    pub fn undeleted(self) -> Self {
        self.criterion("UNDELETED")
    }

    /// UNDRAFT.
    #[must_use]
    pub fn undraft(self) -> Self {
        self.criterion("UNDRAFT")
    }

    /// UNFLAGGED.
    #[must_use]
    pub fn unflagged(self) -> Self {
        self.criterion("UNFLAGGED")
    }

    /// UNKEYWORD flag match.
    #[must_use]
    pub fn unkeyword(self, value: &str) -> Self {
        self.criterion_text("UNKEYWORD", value)
    }

    /// UNSEEN.
    #[must_use]
    pub fn unseen(self) -> Self {
        self.criterion("UNSEEN")
    }

    // === Execution modifiers ===

    /// Applies page slicing before FETCH: `per_page` identifiers from
    /// 1-based `page`.
    #[must_use]
    pub fn limit(mut self, per_page: usize, page: usize) -> Self {
        self.limit = Some((per_page, page.max(1)));
        self
    }

    /// Sets the population order; `Desc` reverses the identifier list
    /// before paging.
    #[must_use]
    pub const fn fetch_order(mut self, order: FetchOrder) -> Self {
        self.fetch_order = order;
        self
    }

    /// Overrides the numbering scheme for this query.
    #[must_use]
    pub const fn sequence(mut self, kind: SequenceKind) -> Self {
        self.sequence = kind;
        self
    }

    /// Overrides the collection key for this query.
    #[must_use]
    pub const fn message_key(mut self, key: MessageKey) -> Self {
        self.message_key = key;
        self
    }

    /// Skips body fetching (headers and flags only).
    #[must_use]
    pub const fn without_body(mut self) -> Self {
        self.fetch_body = false;
        self
    }

    /// Skips flag fetching.
    #[must_use]
    pub const fn without_flags(mut self) -> Self {
        self.fetch_flags = false;
        self
    }

    /// Records per-identifier errors instead of aborting the batch.
    #[must_use]
    pub const fn soft_fail(mut self, enabled: bool) -> Self {
        self.soft_fail = enabled;
        self
    }

    /// Per-identifier errors recorded under soft-fail.
    #[must_use]
    pub const fn errors(&self) -> &HashMap<u32, Error> {
        &self.errors
    }

    // === Emission ===

    /// Renders the search program as it will be transmitted: keywords
    /// uppercased, dates as `DD-Mon-YYYY`, strings double-quoted.
    #[must_use]
    pub fn generate_query(&self) -> String {
        let parts = self.effective_parts();
        parts
            .iter()
            .map(|part| match part {
                SearchPart::Keyword(k) => k.to_uppercase(),
                SearchPart::Number(n) => n.to_string(),
                SearchPart::Sequence(s) | SearchPart::Date(s) => s.clone(),
                SearchPart::Text(s) => {
                    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn effective_parts(&self) -> Vec<SearchPart> {
        if self.parts.is_empty() {
            vec![SearchPart::Keyword("ALL".to_string())]
        } else {
            self.parts.clone()
        }
    }

    /// Non-ASCII string arguments switch the command to CHARSET UTF-8
    /// (their payload travels as literals).
    fn charset(&self) -> Option<String> {
        let needs_utf8 = self.parts.iter().any(|part| {
            matches!(part, SearchPart::Text(s) if !s.is_ascii())
        });
        needs_utf8.then(|| "UTF-8".to_string())
    }

    // === Execution ===

    /// Runs SEARCH and returns the matched identifiers in server order
    /// (reversed for `Desc`).
    pub async fn search(&mut self) -> Result<Vec<u32>> {
        self.session.open_folder(&self.folder, false).await?;

        let uid = self.sequence == SequenceKind::Uid;
        let mut ids = self
            .session
            .search_ids(self.charset(), self.effective_parts(), uid)
            .await
            .map_err(|e| match e {
                Error::Bad(text) => Error::SearchValidation(text),
                other => other,
            })?;

        if self.fetch_order == FetchOrder::Desc {
            ids.reverse();
        }
        Ok(ids)
    }

    /// Runs the query and materialises every matched message (honouring
    /// the page limit).
    pub async fn get(&mut self) -> Result<MessageCollection> {
        let ids = self.search().await?;
        let page = apply_limit(&ids, self.limit);
        self.populate(&page).await
    }

    /// Runs the query with explicit paging.
    pub async fn paginate(&mut self, per_page: usize, page: usize) -> Result<MessageCollection> {
        self.limit = Some((per_page, page.max(1)));
        self.get().await
    }

    /// Iterates the matched identifiers in windows of `chunk_size`,
    /// invoking the callback per populated chunk (1-based chunk index,
    /// starting at `start`). No identifier is fetched twice.
    pub async fn chunked<F>(&mut self, mut callback: F, chunk_size: usize, start: usize) -> Result<()>
    where
        F: FnMut(MessageCollection, usize),
    {
        let chunk_size = chunk_size.max(1);
        let start = start.max(1);
        let ids = self.search().await?;

        for (index, chunk) in ids.chunks(chunk_size).enumerate() {
            let number = index + 1;
            if number < start {
                continue;
            }
            let messages = self.populate(chunk).await?;
            callback(messages, number);
        }
        Ok(())
    }

    /// Fetches the complete identifier set, applies the predicate, and
    /// populates only the survivors.
    pub async fn filter<P>(&mut self, predicate: P) -> Result<MessageCollection>
    where
        P: Fn(u32) -> bool,
    {
        let ids = self.search().await?;
        let selected: Vec<u32> = ids.into_iter().filter(|id| predicate(*id)).collect();
        self.populate(&selected).await
    }

    /// Population pipeline: extension attributes and FLAGS first, then
    /// headers, then the body text when requested.
    async fn populate(&mut self, ids: &[u32]) -> Result<MessageCollection> {
        let mut collection = MessageCollection::default();
        if ids.is_empty() {
            return Ok(collection);
        }

        let uid = self.sequence == SequenceKind::Uid;

        let flag_rows = if self.fetch_flags {
            let extensions = self.session.account().extensions.clone();
            let mut attrs = vec![FetchAttribute::Uid, FetchAttribute::Flags];
            attrs.extend(extensions.into_iter().map(FetchAttribute::Extension));
            self.session.fetch_items(ids, attrs, uid).await?
        } else {
            Vec::new()
        };

        let header_rows = self
            .session
            .fetch_items(
                ids,
                vec![
                    FetchAttribute::Uid,
                    FetchAttribute::Body {
                        section: Some("HEADER".to_string()),
                        peek: self.peek,
                        partial: None,
                    },
                ],
                uid,
            )
            .await?;

        let body_rows = if self.fetch_body {
            self.session
                .fetch_items(
                    ids,
                    vec![
                        FetchAttribute::Uid,
                        FetchAttribute::Body {
                            section: Some("TEXT".to_string()),
                            peek: self.peek,
                            partial: None,
                        },
                    ],
                    uid,
                )
                .await?
        } else {
            Vec::new()
        };

        let flags_by_id = index_rows(&flag_rows, uid);
        let headers_by_id = index_rows(&header_rows, uid);
        let bodies_by_id = index_rows(&body_rows, uid);

        let mut failed = 0usize;
        for (position, id) in ids.iter().enumerate() {
            match self.materialise(
                *id,
                uid,
                flags_by_id.get(id),
                headers_by_id.get(id),
                bodies_by_id.get(id),
            ) {
                Ok(message) => {
                    let key = self.key_for(&message, position);
                    collection.push(key, message);
                }
                Err(e) => {
                    failed += 1;
                    if self.soft_fail {
                        self.errors.insert(*id, e);
                    } else {
                        tracing::warn!(id, error = %e, "message population failed");
                    }
                }
            }
        }

        if failed > 0 && !self.soft_fail {
            return Err(Error::GetMessages { failed });
        }
        Ok(collection)
    }

    /// Assembles one message from its FETCH rows. A missing body section
    /// leaves that body absent; a completely absent message is an error.
    fn materialise(
        &self,
        id: u32,
        uid_mode: bool,
        flag_row: Option<&Row<'_>>,
        header_row: Option<&Row<'_>>,
        body_row: Option<&Row<'_>>,
    ) -> Result<Message> {
        if flag_row.is_none() && header_row.is_none() && body_row.is_none() {
            return Err(Error::Protocol(format!(
                "server returned no data for message {id}"
            )));
        }

        let header_bytes = header_row
            .and_then(|row| section_data(row.items, "HEADER"))
            .unwrap_or_default();
        let body_bytes = body_row.and_then(|row| section_data(row.items, "TEXT"));

        let mut raw = header_bytes.to_vec();
        if !raw.ends_with(b"\r\n\r\n") && !raw.is_empty() {
            raw.extend_from_slice(b"\r\n");
        }
        if let Some(body) = body_bytes {
            raw.extend_from_slice(body);
        }

        let mail = mailsift_mime::Message::parse(&raw);

        let any_row = header_row.or(flag_row).or(body_row);
        let msgno = any_row.map_or(id, |row| row.seq);
        let uid = if uid_mode {
            Some(id)
        } else {
            any_row.and_then(|row| row.uid)
        };

        let flags = flag_row
            .and_then(|row| {
                row.items.iter().find_map(|item| match item {
                    FetchItem::Flags(f) => Some(f.clone()),
                    _ => None,
                })
            })
            .unwrap_or_default();

        Ok(Message {
            uid,
            msgno,
            flags,
            mail,
            raw: Some(raw),
            fetched_flags: self.fetch_flags,
            fetched_body: self.fetch_body,
        })
    }

    /// Derives the collection key per the configured scheme.
    fn key_for(&self, message: &Message, position: usize) -> String {
        match self.message_key {
            MessageKey::Uid => message
                .uid
                .map_or_else(|| message.msgno.to_string(), |uid| uid.to_string()),
            MessageKey::Number => message.msgno.to_string(),
            MessageKey::List => position.to_string(),
            MessageKey::Id => message
                .message_id()
                .unwrap_or_else(|| message.msgno.to_string()),
        }
    }
}

/// One FETCH row with its identifiers extracted.
struct Row<'a> {
    seq: u32,
    uid: Option<u32>,
    items: &'a [FetchItem],
}

/// Indexes FETCH rows by the identifier scheme the request used.
fn index_rows(
    rows: &[(crate::types::SeqNum, Vec<FetchItem>)],
    uid_mode: bool,
) -> HashMap<u32, Row<'_>> {
    let mut map = HashMap::new();
    for (seq, items) in rows {
        let uid = items.iter().find_map(|item| match item {
            FetchItem::Uid(u) => Some(u.get()),
            _ => None,
        });
        let key = if uid_mode {
            match uid {
                Some(u) => u,
                None => continue,
            }
        } else {
            seq.get()
        };
        map.insert(
            key,
            Row {
                seq: seq.get(),
                uid,
                items,
            },
        );
    }
    map
}

/// Returns body data for the wanted section from a row's items.
fn section_data<'a>(items: &'a [FetchItem], wanted: &str) -> Option<&'a [u8]> {
    items
        .iter()
        .find_map(|item| item.body_section(Some(wanted)))
}

/// Applies the page limit to an identifier list.
fn apply_limit(ids: &[u32], limit: Option<(usize, usize)>) -> Vec<u32> {
    match limit {
        None => ids.to_vec(),
        Some((per_page, page)) => {
            let start = per_page.saturating_mul(page.saturating_sub(1));
            ids.iter().skip(start).take(per_page).copied().collect()
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
    use crate::config::{AccountConfig, Options};

    fn query(session: &mut Session) -> Query<'_> {
        Query::new(session, "INBOX")
    }

    fn make_session() -> Session {
        Session::new(AccountConfig::new("imap.example.com"), Options::default())
    }

    #[test]
    fn test_since_subject_emission() {
        let mut session = make_session();
        let q = query(&mut session)
            .since(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .subject("hi");
        assert_eq!(q.generate_query(), "SINCE 01-Jan-2024 SUBJECT \"hi\"");
    }

    #[test]
    fn test_strings_always_quoted() {
        let mut session = make_session();
        let q = query(&mut session).from("bare");
        assert_eq!(q.generate_query(), "FROM \"bare\"");

        let mut session = make_session();
        let q = query(&mut session).to("someone@example.com").unseen();
        assert_eq!(q.generate_query(), "TO \"someone@example.com\" UNSEEN");
    }

    #[test]
    fn test_quotes_escaped() {
        let mut session = make_session();
        let q = query(&mut session).subject("say \"hi\"");
        assert_eq!(q.generate_query(), "SUBJECT \"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_numbers_unquoted() {
        let mut session = make_session();
        let q = query(&mut session).larger(1024);
        assert_eq!(q.generate_query(), "LARGER 1024");
    }

    #[test]
    fn test_not_and_or_prefix_following_criterion() {
        let mut session = make_session();
        let q = query(&mut session).not().seen();
        assert_eq!(q.generate_query(), "NOT SEEN");

        let mut session = make_session();
        let q = query(&mut session).or().seen().flagged();
        assert_eq!(q.generate_query(), "OR SEEN FLAGGED");
    }

    #[test]
    fn test_keywords_uppercased() {
        let mut session = make_session();
        let q = query(&mut session).criterion("unseen");
        assert_eq!(q.generate_query(), "UNSEEN");
    }

    #[test]
    fn test_empty_query_is_all() {
        let mut session = make_session();
        let q = query(&mut session);
        assert_eq!(q.generate_query(), "ALL");
    }

    #[test]
    fn test_header_criterion() {
        let mut session = make_session();
        let q = query(&mut session).header("Message-ID", "<x@y>");
        assert_eq!(q.generate_query(), "HEADER \"Message-ID\" \"<x@y>\"");
    }

    #[test]
    fn test_uid_set_criterion() {
        let mut session = make_session();
        let q = query(&mut session).uid("1:5,8");
        assert_eq!(q.generate_query(), "UID 1:5,8");
    }

    #[test]
    fn test_charset_only_for_non_ascii() {
        let mut session = make_session();
        let q = query(&mut session).subject("hello");
        assert!(q.charset().is_none());

        let mut session = make_session();
        let q = query(&mut session).subject("héllo");
        assert_eq!(q.charset().as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_apply_limit_pages() {
        let ids: Vec<u32> = (1..=23).collect();
        // Page 2 of 10 per page: identifiers 11..=20.
        assert_eq!(
            apply_limit(&ids, Some((10, 2))),
            (11..=20).collect::<Vec<u32>>()
        );
        // Last partial page.
        assert_eq!(
            apply_limit(&ids, Some((10, 3))),
            (21..=23).collect::<Vec<u32>>()
        );
        // Beyond the end.
        assert!(apply_limit(&ids, Some((10, 4))).is_empty());
        // No limit.
        assert_eq!(apply_limit(&ids, None).len(), 23);
    }

    #[test]
    fn test_collection_keys_and_order() {
        let mut collection = MessageCollection::default();
        for uid in [7u32, 3, 9] {
            collection.push(
                uid.to_string(),
                Message {
                    uid: Some(uid),
                    msgno: uid,
                    flags: Flags::new(),
                    mail: mailsift_mime::Message::parse(b"Subject: x\r\n\r\n"),
                    raw: None,
                    fetched_flags: true,
                    fetched_body: true,
                },
            );
        }

        assert_eq!(collection.len(), 3);
        assert!(collection.get("3").is_some());
        let keys: Vec<&str> = collection.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["7", "3", "9"]);
    }
}
