//! Sans-I/O response parsing.
//!
//! The [`lexer`] scans bytes into tokens, [`value`] builds the typed
//! token tree, and [`ResponseParser`] dispatches complete response lines
//! into typed data. Nothing in this module does I/O; the framed stream
//! hands it complete responses with literals already spliced in.

pub mod lexer;
pub mod value;

mod response;

pub use response::{
    BodyStructure, Envelope, EnvelopeAddress, FetchItem, Response, ResponseParser, StatusItem,
    UntaggedResponse,
};
pub use value::Value;
