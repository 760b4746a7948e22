//! Sans-IO protocol state for one IRC connection.
//!
//! Nothing in this module touches the network. [`Session`] consumes parsed
//! lines and [`Registration`] steps through the connect-time handshake; both
//! answer with [`Action`]s that the connection driver performs in order.
//!
//! # Example
//!
//! ```
//! use slirc_client::state::{Action, Session};
//! use slirc_client::{Command, Message};
//!
//! let mut session = Session::new("bot");
//! let ping: Message = "PING :irc.example.org".parse().unwrap();
//!
//! assert_eq!(
//!     session.feed(&ping),
//!     vec![Action::Send(Command::PONG("irc.example.org".to_string()))]
//! );
//! ```

mod registration;
mod session;

pub use registration::{Registration, RegistrationState};
pub use session::{Session, SessionSnapshot};

use crate::command::Command;
use crate::event::Event;

/// Work produced by the state machines.
///
/// The caller performs these in order: `Send` must be written (and flushed)
/// before the next action is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Write this command to the server.
    Send(Command),
    /// Deliver this event to observers.
    Emit(Event),
}
