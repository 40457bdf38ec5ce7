//! Connection management.
//!
//! [`stream`] opens the transport (TCP, proxy tunnel, TLS), [`framed`]
//! frames it into IMAP responses, [`client`] speaks the protocol with
//! compile-time state tracking, and [`idle`] adds the RFC 2177 push
//! channel.

pub mod client;
pub mod framed;
pub mod idle;
pub mod stream;

pub use client::{AuthState, Authenticated, Client, CommandResponse, NotAuthenticated, Selected};
pub use framed::FramedStream;
pub use idle::{IdleEvent, IdleHandle, IdleLoop, IdleStopHandle};
pub use stream::{ImapStream, connect};
