//! Command serialization.
//!
//! Commands serialize into a sequence of [`CommandPart`]s. Most commands
//! are a single CRLF-terminated line; arguments that cannot travel inside
//! a quoted string (CR, LF, 8-bit bytes, double quotes) become `{N}`
//! length-prefixed literals, and the connection layer waits for the
//! server's `+` continuation before sending each literal payload.

/// One transmission unit of a serialized command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPart {
    /// A line to send as-is (ends with CRLF, possibly after a `{N}`
    /// announcement).
    Line(Vec<u8>),
    /// Literal payload to send after the server's continuation.
    Literal(Vec<u8>),
}

/// Incremental writer producing [`CommandPart`]s.
#[derive(Debug)]
pub struct CommandWriter {
    parts: Vec<CommandPart>,
    line: Vec<u8>,
}

impl CommandWriter {
    /// Starts a command line with the given tag. An empty tag starts a
    /// bare line (used for DONE).
    #[must_use]
    pub fn new(tag: &str) -> Self {
        let mut line = Vec::new();
        if !tag.is_empty() {
            line.extend_from_slice(tag.as_bytes());
            line.push(b' ');
        }
        Self {
            parts: Vec::new(),
            line,
        }
    }

    /// Appends raw text to the current line.
    pub fn raw(&mut self, s: &str) {
        self.line.extend_from_slice(s.as_bytes());
    }

    /// Appends a single space.
    pub fn space(&mut self) {
        self.line.push(b' ');
    }

    /// Appends a number.
    pub fn number(&mut self, n: u64) {
        self.raw(&n.to_string());
    }

    /// Appends an astring: bare atom, quoted string, or literal as the
    /// content requires.
    pub fn astring(&mut self, s: &str) {
        if needs_literal(s) {
            self.literal(s.as_bytes());
        } else if s.is_empty() || s.bytes().any(needs_quoting) {
            self.quote_into_line(s);
        } else {
            self.line.extend_from_slice(s.as_bytes());
        }
    }

    /// Appends a string argument that must be quoted (or a literal when
    /// quoting cannot carry it).
    pub fn quoted(&mut self, s: &str) {
        if needs_literal(s) {
            self.literal(s.as_bytes());
        } else {
            self.quote_into_line(s);
        }
    }

    /// Appends a `{N}` announcement, closes the current line, and emits
    /// the payload as a literal part.
    pub fn literal(&mut self, data: &[u8]) {
        self.line
            .extend_from_slice(format!("{{{}}}\r\n", data.len()).as_bytes());
        self.parts
            .push(CommandPart::Line(std::mem::take(&mut self.line)));
        self.parts.push(CommandPart::Literal(data.to_vec()));
    }

    fn quote_into_line(&mut self, s: &str) {
        self.line.push(b'"');
        for b in s.bytes() {
            if b == b'\\' {
                self.line.push(b'\\');
            }
            self.line.push(b);
        }
        self.line.push(b'"');
    }

    /// Terminates the command with CRLF and returns the parts.
    #[must_use]
    pub fn finish(mut self) -> Vec<CommandPart> {
        self.line.extend_from_slice(b"\r\n");
        self.parts.push(CommandPart::Line(self.line));
        self.parts
    }
}

/// An argument must be a literal when it contains bytes a quoted string
/// cannot carry on the wire.
fn needs_literal(s: &str) -> bool {
    s.bytes().any(|b| b >= 0x80 || b == b'\r' || b == b'\n' || b == b'"')
}

/// Returns true if the byte forces quoting of an otherwise bare atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
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

    fn single_line(parts: Vec<CommandPart>) -> Vec<u8> {
        assert_eq!(parts.len(), 1, "expected a single line");
        match parts.into_iter().next().unwrap() {
            CommandPart::Line(data) => data,
            CommandPart::Literal(_) => panic!("expected line"),
        }
    }

    #[test]
    fn test_bare_atom() {
        let mut w = CommandWriter::new("A001");
        w.raw("LOGIN ");
        w.astring("user");
        assert_eq!(single_line(w.finish()), b"A001 LOGIN user\r\n");
    }

    #[test]
    fn test_quoted_on_space() {
        let mut w = CommandWriter::new("A001");
        w.astring("pass word");
        assert_eq!(single_line(w.finish()), b"A001 \"pass word\"\r\n");
    }

    #[test]
    fn test_empty_string_quoted() {
        let mut w = CommandWriter::new("A001");
        w.raw("LIST ");
        w.astring("");
        w.space();
        w.astring("*");
        assert_eq!(single_line(w.finish()), b"A001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn test_eight_bit_becomes_literal() {
        let mut w = CommandWriter::new("A001");
        w.raw("SELECT ");
        w.astring("böse");
        let parts = w.finish();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[0],
            CommandPart::Line(format!("A001 SELECT {{{}}}\r\n", "böse".len()).into_bytes())
        );
        assert_eq!(parts[1], CommandPart::Literal("böse".as_bytes().to_vec()));
        assert_eq!(parts[2], CommandPart::Line(b"\r\n".to_vec()));
    }

    #[test]
    fn test_double_quote_becomes_literal() {
        let mut w = CommandWriter::new("A001");
        w.quoted("say \"hi\"");
        let parts = w.finish();
        assert!(matches!(&parts[1], CommandPart::Literal(d) if d == b"say \"hi\""));
    }

    #[test]
    fn test_quoted_forces_quotes_on_atom() {
        let mut w = CommandWriter::new("A001");
        w.quoted("hi");
        assert_eq!(single_line(w.finish()), b"A001 \"hi\"\r\n");
    }

    #[test]
    fn test_backslash_escaped_in_quotes() {
        let mut w = CommandWriter::new("A001");
        w.quoted("a\\b c");
        assert_eq!(single_line(w.finish()), b"A001 \"a\\\\b c\"\r\n");
    }

    #[test]
    fn test_empty_tag_for_done() {
        let mut w = CommandWriter::new("");
        w.raw("DONE");
        assert_eq!(single_line(w.finish()), b"DONE\r\n");
    }
}
