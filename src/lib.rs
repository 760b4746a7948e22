//! # slirc-client
//!
//! An event-driven IRC client core built on Tokio.
//!
//! ## Features
//!
//! - Registration handshake (PASS, NICK, USER, then JOIN after the MOTD)
//! - Line reassembly over arbitrarily chunked TCP or TLS streams
//! - Dispatch of server lines into typed [`Event`]s, including multi-line
//!   NAMES aggregation and PING/PONG
//! - Imperative commands (`say`, `join`, `part`, `kick`, `names`, `quit`)
//!   that resolve once the line is flushed
//! - Sans-IO [`state`] machines usable without a network

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing IRC Lines
//!
//! ```rust
//! use slirc_client::{Message, Response};
//!
//! let msg: Message = ":irc.example.org 001 bot :Welcome".parse().unwrap();
//! assert_eq!(Response::lookup(&msg.command), Some(Response::RPL_WELCOME));
//! assert_eq!(msg.arg(0), Some("bot"));
//! ```
//!
//! ### Listening for Events
//!
//! ```rust
//! use slirc_client::{Emitter, Event};
//!
//! let events = Emitter::new();
//! let mut all = events.subscribe_all();
//! events.emit(Event::Ready);
//! assert_eq!(all.try_recv(), Some(Event::Ready));
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod line;
pub mod message;
pub mod prefix;
pub mod response;
pub mod state;
pub mod transport;

pub use self::client::Client;
pub use self::command::Command;
pub use self::config::{ClientOptions, Config};
pub use self::error::{ClientError, MessageParseError, ProtocolError, Result};
pub use self::event::{Emitter, Event, ListenerId, Subscription};
pub use self::line::{LineCodec, MAX_IRC_LINE_LEN};
pub use self::message::Message;
pub use self::prefix::extract_identity;
pub use self::response::Response;
pub use self::state::{Action, Registration, RegistrationState, Session, SessionSnapshot};
pub use self::transport::Stream;
