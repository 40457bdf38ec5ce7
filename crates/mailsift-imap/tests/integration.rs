//! Integration tests against an in-process fake IMAP server.
//!
//! The fake server speaks just enough IMAP4rev1 over a real TCP socket
//! to exercise the full session stack: greeting, LOGIN, LIST, SELECT,
//! UID SEARCH/FETCH/STORE, APPEND with literal continuation, IDLE with
//! DONE, and LOGOUT. Each test gets its own listener and mailbox vault.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use mailsift_imap::{
    AccountConfig, Encryption, Flag, Options, Session, SequenceKind, StoreAction,
};

/// One stored message.
#[derive(Clone)]
struct FakeMessage {
    uid: u32,
    flags: Vec<String>,
    raw: Vec<u8>,
}

impl FakeMessage {
    fn header_section(&self) -> Vec<u8> {
        match find(&self.raw, b"\r\n\r\n") {
            Some(pos) => self.raw[..pos + 4].to_vec(),
            None => self.raw.clone(),
        }
    }

    fn text_section(&self) -> Vec<u8> {
        match find(&self.raw, b"\r\n\r\n") {
            Some(pos) => self.raw[pos + 4..].to_vec(),
            None => Vec::new(),
        }
    }
}

/// Shared mailbox state plus counters the tests observe.
struct Vault {
    messages: Mutex<Vec<FakeMessage>>,
    next_uid: AtomicUsize,
    idle_sessions: AtomicUsize,
    done_count: AtomicUsize,
    push: broadcast::Sender<String>,
}

impl Vault {
    fn new() -> Arc<Self> {
        let (push, _) = broadcast::channel(16);
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            next_uid: AtomicUsize::new(1),
            idle_sessions: AtomicUsize::new(0),
            done_count: AtomicUsize::new(0),
            push,
        })
    }

    fn seed(&self, raw: &[u8], flags: &[&str]) -> u32 {
        let uid = self.next_uid.fetch_add(1, Ordering::SeqCst) as u32;
        self.messages.lock().unwrap().push(FakeMessage {
            uid,
            flags: flags.iter().map(ToString::to_string).collect(),
            raw: raw.to_vec(),
        });
        uid
    }
}

/// Starts the fake server; returns its port.
async fn start_server(vault: Arc<Vault>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let vault = Arc::clone(&vault);
            tokio::spawn(async move {
                let _ = serve_connection(socket, vault).await;
            });
        }
    });

    port
}

async fn serve_connection(socket: TcpStream, vault: Arc<Vault>) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    writer
        .write_all(b"* OK [CAPABILITY IMAP4rev1 IDLE UIDPLUS MOVE QUOTA ID] fake server ready\r\n")
        .await?;

    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&line).trim_end().to_string();
        let mut words = text.splitn(3, ' ');
        let tag = words.next().unwrap_or("").to_string();
        let command = words.next().unwrap_or("").to_uppercase();
        let args = words.next().unwrap_or("").to_string();

        match command.as_str() {
            "CAPABILITY" => {
                writer
                    .write_all(b"* CAPABILITY IMAP4rev1 IDLE UIDPLUS MOVE QUOTA ID\r\n")
                    .await?;
                ok(&mut writer, &tag, "CAPABILITY completed").await?;
            }
            "LOGIN" => ok(&mut writer, &tag, "LOGIN completed").await?,
            "NOOP" | "CHECK" | "CLOSE" | "SUBSCRIBE" | "UNSUBSCRIBE" => {
                ok(&mut writer, &tag, "completed").await?;
            }
            "LIST" => {
                writer
                    .write_all(b"* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n")
                    .await?;
                writer
                    .write_all(b"* LIST (\\HasNoChildren) \"/\" \"Archive\"\r\n")
                    .await?;
                ok(&mut writer, &tag, "LIST completed").await?;
            }
            "SELECT" | "EXAMINE" => {
                let count = vault.messages.lock().unwrap().len();
                writer
                    .write_all(format!("* {count} EXISTS\r\n").as_bytes())
                    .await?;
                writer.write_all(b"* 0 RECENT\r\n").await?;
                writer
                    .write_all(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n")
                    .await?;
                writer
                    .write_all(b"* OK [UIDVALIDITY 1] UIDs valid\r\n")
                    .await?;
                ok(&mut writer, &tag, "[READ-WRITE] SELECT completed").await?;
            }
            "EXPUNGE" => {
                vault
                    .messages
                    .lock()
                    .unwrap()
                    .retain(|m| !m.flags.iter().any(|f| f == "\\Deleted"));
                ok(&mut writer, &tag, "EXPUNGE completed").await?;
            }
            "APPEND" => {
                let Some(size) = literal_size(&text) else {
                    bad(&mut writer, &tag, "missing literal").await?;
                    continue;
                };
                writer.write_all(b"+ Ready for literal data\r\n").await?;

                let mut raw = vec![0u8; size];
                reader.read_exact(&mut raw).await?;
                // Trailing CRLF after the literal.
                let mut tail = Vec::new();
                reader.read_until(b'\n', &mut tail).await?;

                let uid = vault.seed(&raw, &parse_append_flags(&text));
                ok(
                    &mut writer,
                    &tag,
                    &format!("[APPENDUID 1 {uid}] APPEND completed"),
                )
                .await?;
            }
            "UID" => {
                let mut sub = args.splitn(2, ' ');
                let verb = sub.next().unwrap_or("").to_uppercase();
                let rest = sub.next().unwrap_or("");
                match verb.as_str() {
                    "SEARCH" => {
                        let uids = search_uids(&vault, rest);
                        let listing = uids
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(" ");
                        if listing.is_empty() {
                            writer.write_all(b"* SEARCH\r\n").await?;
                        } else {
                            writer
                                .write_all(format!("* SEARCH {listing}\r\n").as_bytes())
                                .await?;
                        }
                        ok(&mut writer, &tag, "SEARCH completed").await?;
                    }
                    "FETCH" => {
                        respond_fetch(&mut writer, &vault, rest).await?;
                        ok(&mut writer, &tag, "FETCH completed").await?;
                    }
                    "STORE" => {
                        respond_store(&mut writer, &vault, rest).await?;
                        ok(&mut writer, &tag, "STORE completed").await?;
                    }
                    "COPY" | "MOVE" => ok(&mut writer, &tag, "completed").await?,
                    _ => bad(&mut writer, &tag, "unknown UID command").await?,
                }
            }
            "IDLE" => {
                writer.write_all(b"+ idling\r\n").await?;
                vault.idle_sessions.fetch_add(1, Ordering::SeqCst);
                let mut push_rx = vault.push.subscribe();

                loop {
                    line.clear();
                    tokio::select! {
                        read = reader.read_until(b'\n', &mut line) => {
                            if read? == 0 {
                                return Ok(());
                            }
                            if String::from_utf8_lossy(&line).trim() == "DONE" {
                                vault.done_count.fetch_add(1, Ordering::SeqCst);
                                ok(&mut writer, &tag, "IDLE terminated").await?;
                                break;
                            }
                        }
                        pushed = push_rx.recv() => {
                            if let Ok(pushed) = pushed {
                                writer.write_all(pushed.as_bytes()).await?;
                            }
                        }
                    }
                }
            }
            "LOGOUT" => {
                writer.write_all(b"* BYE fake server signing off\r\n").await?;
                ok(&mut writer, &tag, "LOGOUT completed").await?;
                return Ok(());
            }
            _ => bad(&mut writer, &tag, "unrecognised command").await?,
        }
    }
}

async fn ok(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    tag: &str,
    text: &str,
) -> std::io::Result<()> {
    writer
        .write_all(format!("{tag} OK {text}\r\n").as_bytes())
        .await
}

async fn bad(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    tag: &str,
    text: &str,
) -> std::io::Result<()> {
    writer
        .write_all(format!("{tag} BAD {text}\r\n").as_bytes())
        .await
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn literal_size(line: &str) -> Option<usize> {
    let open = line.rfind('{')?;
    let close = line.rfind('}')?;
    line.get(open + 1..close)?.trim_end_matches('+').parse().ok()
}

fn parse_append_flags(line: &str) -> Vec<&str> {
    match (line.find('('), line.find(')')) {
        (Some(open), Some(close)) if close > open => {
            line[open + 1..close].split_whitespace().collect()
        }
        _ => Vec::new(),
    }
}

fn parse_uid_set(set: &str, vault: &Vault) -> Vec<u32> {
    let max_uid = vault
        .messages
        .lock()
        .unwrap()
        .iter()
        .map(|m| m.uid)
        .max()
        .unwrap_or(0);

    let mut uids = Vec::new();
    for item in set.split(',') {
        if let Some((start, end)) = item.split_once(':') {
            let start: u32 = start.parse().unwrap_or(0);
            let end: u32 = if end == "*" {
                max_uid
            } else {
                end.parse().unwrap_or(0)
            };
            uids.extend(start..=end);
        } else if item == "*" {
            uids.push(max_uid);
        } else if let Ok(uid) = item.parse() {
            uids.push(uid);
        }
    }
    uids
}

fn search_uids(vault: &Vault, program: &str) -> Vec<u32> {
    let program = program.trim();
    if let Some(set) = program.strip_prefix("UID ") {
        let wanted = parse_uid_set(set.split_whitespace().next().unwrap_or(""), vault);
        vault
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| wanted.contains(&m.uid))
            .map(|m| m.uid)
            .collect()
    } else {
        // Everything else (ALL, UNSEEN, SINCE ...) matches the whole
        // vault; criteria emission is covered by unit tests.
        vault
            .messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.uid)
            .collect()
    }
}

async fn respond_fetch(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    vault: &Vault,
    rest: &str,
) -> std::io::Result<()> {
    let set = rest.split_whitespace().next().unwrap_or("");
    let wanted = parse_uid_set(set, vault);
    let want_flags = rest.contains("FLAGS");
    let want_header = rest.contains("[HEADER]");
    let want_text = rest.contains("[TEXT]");

    let messages = vault.messages.lock().unwrap().clone();
    for (index, message) in messages.iter().enumerate() {
        if !wanted.contains(&message.uid) {
            continue;
        }
        let msn = index + 1;
        let mut response = format!("* {msn} FETCH (UID {}", message.uid);
        if want_flags {
            response.push_str(&format!(" FLAGS ({})", message.flags.join(" ")));
        }
        let mut payload = Vec::new();
        if want_header {
            let header = message.header_section();
            response.push_str(&format!(" BODY[HEADER] {{{}}}\r\n", header.len()));
            payload = header;
        } else if want_text {
            let text = message.text_section();
            response.push_str(&format!(" BODY[TEXT] {{{}}}\r\n", text.len()));
            payload = text;
        }

        writer.write_all(response.as_bytes()).await?;
        if !payload.is_empty() || want_header || want_text {
            writer.write_all(&payload).await?;
        }
        writer.write_all(b")\r\n").await?;
    }
    Ok(())
}

async fn respond_store(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    vault: &Vault,
    rest: &str,
) -> std::io::Result<()> {
    let mut words = rest.split_whitespace();
    let set = words.next().unwrap_or("");
    let op = words.next().unwrap_or("");
    let wanted = parse_uid_set(set, vault);

    let open = rest.find('(').unwrap_or(rest.len());
    let close = rest.rfind(')').unwrap_or(rest.len());
    let flags: Vec<String> = rest
        .get(open + 1..close)
        .unwrap_or("")
        .split_whitespace()
        .map(ToString::to_string)
        .collect();

    let silent = op.contains(".SILENT");
    let mut echoes = Vec::new();
    {
        let mut messages = vault.messages.lock().unwrap();
        for (index, message) in messages.iter_mut().enumerate() {
            if !wanted.contains(&message.uid) {
                continue;
            }
            if op.starts_with("+FLAGS") {
                for flag in &flags {
                    if !message.flags.contains(flag) {
                        message.flags.push(flag.clone());
                    }
                }
            } else if op.starts_with("-FLAGS") {
                message.flags.retain(|f| !flags.contains(f));
            } else {
                message.flags = flags.clone();
            }
            echoes.push(format!(
                "* {} FETCH (UID {} FLAGS ({}))\r\n",
                index + 1,
                message.uid,
                message.flags.join(" ")
            ));
        }
    }

    if !silent {
        for echo in echoes {
            writer.write_all(echo.as_bytes()).await?;
        }
    }
    Ok(())
}

/// Builds a session against the fake server.
fn local_session(port: u16) -> Session {
    let account = AccountConfig::new("127.0.0.1")
        .port(port)
        .encryption(Encryption::None)
        .credentials("user", "pass")
        .connect_timeout(Duration::from_secs(5))
        .stream_timeout(Duration::from_secs(5));
    Session::new(account, Options::default())
}

// === Scenarios ===

#[tokio::test]
async fn plain_text_message_fetch() {
    let vault = Vault::new();
    vault.seed(
        b"Subject: Nuu\r\nFrom: from@here.com\r\nTo: to@here.com\r\n\r\nHi",
        &[],
    );
    let port = start_server(Arc::clone(&vault)).await;

    let mut session = local_session(port);
    session.connect().await.unwrap();
    session.authenticate().await.unwrap();
    let status = session.open_folder("INBOX", false).await.unwrap();
    assert_eq!(status.exists, 1);

    let messages = session.messages("INBOX").get().await.unwrap();
    assert_eq!(messages.len(), 1);

    let message = messages.first().unwrap();
    assert_eq!(message.subject().as_deref(), Some("Nuu"));
    assert_eq!(message.text_body(), Some("Hi"));
    assert!(!message.has_html_body());
    assert!(message.date().is_none());
    assert_eq!(message.from()[0].email(), "from@here.com");
    assert_eq!(message.to()[0].email(), "to@here.com");

    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn append_store_and_fetch_seen_flag() {
    let vault = Vault::new();
    let port = start_server(Arc::clone(&vault)).await;

    let mut session = local_session(port);
    session.connect().await.unwrap();
    session.authenticate().await.unwrap();
    session.open_folder("INBOX", false).await.unwrap();

    let uid = session
        .append("INBOX", None, b"Subject: flagged\r\n\r\nbody")
        .await
        .unwrap()
        .unwrap()
        .get();

    session
        .store_flags(&[uid], StoreAction::AddFlags(vec![Flag::Seen]), false)
        .await
        .unwrap();

    let messages = session
        .messages("INBOX")
        .uid(&uid.to_string())
        .without_body()
        .get()
        .await
        .unwrap();

    let message = messages.first().unwrap();
    assert_eq!(message.flags.len(), 1);
    assert!(message.flags.is_seen());

    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn paged_fetch_populates_second_page() {
    let vault = Vault::new();
    for i in 1..=23 {
        vault.seed(
            format!("Subject: msg {i}\r\n\r\nbody {i}").as_bytes(),
            &[],
        );
    }
    let port = start_server(Arc::clone(&vault)).await;

    let mut session = local_session(port);
    session.connect().await.unwrap();
    session.authenticate().await.unwrap();
    session.open_folder("INBOX", false).await.unwrap();

    let messages = session
        .messages("INBOX")
        .limit(10, 2)
        .get()
        .await
        .unwrap();

    // 23 matches, page 2 of 10: UIDs 11..=20 in server order.
    assert_eq!(messages.len(), 10);
    let uids: Vec<u32> = messages.messages().map(|m| m.uid.unwrap()).collect();
    assert_eq!(uids, (11..=20).collect::<Vec<u32>>());
    assert_eq!(
        messages.first().unwrap().subject().as_deref(),
        Some("msg 11")
    );

    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn uid_cache_round_trip() {
    let vault = Vault::new();
    for i in 1..=3 {
        vault.seed(format!("Subject: m{i}\r\n\r\nx").as_bytes(), &[]);
    }
    let port = start_server(Arc::clone(&vault)).await;

    let mut session = local_session(port);
    session.connect().await.unwrap();
    session.authenticate().await.unwrap();
    session.open_folder("INBOX", false).await.unwrap();

    let messages = session.messages("INBOX").without_body().get().await.unwrap();
    assert_eq!(messages.len(), 3);

    for message in messages.messages() {
        let uid = message.uid.unwrap();
        let msgno = message.msgno;
        assert_eq!(session.uid_for_msgno(msgno), Some(uid));
        assert_eq!(session.msgno_for_uid(uid), Some(msgno));
    }

    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn folder_listing_builds_folders() {
    let vault = Vault::new();
    let port = start_server(Arc::clone(&vault)).await;

    let mut session = local_session(port);
    session.connect().await.unwrap();
    session.authenticate().await.unwrap();

    let folders = session.folders(false, None).await.unwrap();
    let paths: Vec<&str> = folders.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["INBOX", "Archive"]);

    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn idle_keepalive_reconnects_and_delivers() {
    let vault = Vault::new();
    vault.seed(b"Subject: existing\r\n\r\nx", &[]);
    let port = start_server(Arc::clone(&vault)).await;

    let account = AccountConfig::new("127.0.0.1")
        .port(port)
        .encryption(Encryption::None)
        .credentials("user", "pass")
        .connect_timeout(Duration::from_secs(5))
        // Short stream timeout so keepalive renewal is quick.
        .stream_timeout(Duration::from_millis(150));
    let session = Session::new(account, Options::default());

    let seen = Arc::new(Mutex::new(None));
    let seen_cb = Arc::clone(&seen);
    let (idle_loop, stop) = session.idle(
        "INBOX",
        Duration::from_millis(300),
        move |count, _kind: SequenceKind| {
            *seen_cb.lock().unwrap() = Some(count);
        },
    );

    let runner = tokio::spawn(idle_loop.run());

    // Quiet period: the loop must DONE and re-issue IDLE with no error.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while vault.idle_sessions.load(Ordering::SeqCst) < 2 {
        assert!(tokio::time::Instant::now() < deadline, "no keepalive renewal");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(vault.done_count.load(Ordering::SeqCst) >= 1);

    // Push an EXISTS; retry until a live IDLE session picks it up.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while seen.lock().unwrap().is_none() {
        assert!(tokio::time::Instant::now() < deadline, "push never delivered");
        let _ = vault.push.send("* 2 EXISTS\r\n".to_string());
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    assert_eq!(*seen.lock().unwrap(), Some(2));

    stop.stop();
    let result = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("idle loop did not stop")
        .unwrap();
    assert!(result.is_ok());
}
