//! Owned IRC message produced from one protocol line.

mod nom_parser;

use std::str::FromStr;

use crate::error::MessageParseError;

pub use self::nom_parser::ParsedMessage;

/// One tokenized line: `{prefix, command, middle[], trailing}`.
///
/// `prefix` and `trailing` are empty strings when absent on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    /// Source of the line, `nick!user@host` or a server name.
    pub prefix: String,
    /// Command verb such as `JOIN`, or a three digit numeric.
    pub command: String,
    /// Positional parameters.
    pub middle: Vec<String>,
    /// The final `:`-prefixed parameter.
    pub trailing: String,
}

impl Message {
    /// Tokenize a single line (terminator optional).
    pub fn parse(line: &str) -> Result<Self, MessageParseError> {
        let parsed = ParsedMessage::parse(line)?;
        Ok(Message {
            prefix: parsed.prefix.unwrap_or_default().to_string(),
            command: parsed.command.to_string(),
            middle: parsed.middle.into_iter().map(String::from).collect(),
            trailing: parsed.trailing.unwrap_or_default().to_string(),
        })
    }

    /// Middle parameter at `index`, if present.
    #[inline]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.middle.get(index).map(String::as_str)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_fields_default_to_empty() {
        let msg: Message = "PING :irc.example.com".parse().unwrap();
        assert_eq!(msg.prefix, "");
        assert_eq!(msg.command, "PING");
        assert!(msg.middle.is_empty());
        assert_eq!(msg.trailing, "irc.example.com");
    }

    #[test]
    fn test_arg_lookup() {
        let msg = Message::parse(":op!o@h KICK #chan bob :spam").unwrap();
        assert_eq!(msg.arg(0), Some("#chan"));
        assert_eq!(msg.arg(1), Some("bob"));
        assert_eq!(msg.arg(2), None);
        assert_eq!(msg.trailing, "spam");
    }
}
