//! IRC command types.
//!
//! The subset of RFC 2812 commands this client emits. Anything else goes
//! through [`Command::Raw`].

/// IRC command with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    /// `PASS password`
    PASS(String),
    /// `NICK nickname`
    NICK(String),
    /// `USER username 0 * :realname`
    USER(String, String),
    /// `JOIN c1,c2,...`
    JOIN(Vec<String>),
    /// `PART c1,c2,... [:message]`
    PART(Vec<String>, Option<String>),
    /// `KICK channel nick [:message]`
    KICK(String, String, Option<String>),
    /// `PRIVMSG target :text`
    PRIVMSG(String, String),
    /// `NAMES channel`
    NAMES(String),
    /// `QUIT [:message]`
    QUIT(Option<String>),
    /// `PONG :token`
    PONG(String),
    /// A preformatted line, sent verbatim.
    Raw(String),
}

impl Command {
    /// The wire verb for this command.
    pub fn verb(&self) -> &str {
        match self {
            Command::PASS(_) => "PASS",
            Command::NICK(_) => "NICK",
            Command::USER(..) => "USER",
            Command::JOIN(_) => "JOIN",
            Command::PART(..) => "PART",
            Command::KICK(..) => "KICK",
            Command::PRIVMSG(..) => "PRIVMSG",
            Command::NAMES(_) => "NAMES",
            Command::QUIT(_) => "QUIT",
            Command::PONG(_) => "PONG",
            Command::Raw(line) => line.split(' ').next().unwrap_or(""),
        }
    }
}
