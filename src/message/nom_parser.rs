//! Nom-based IRC line tokenizer.
//!
//! Splits one raw line into tags, prefix, command, middle parameters and
//! the trailing parameter, borrowing from the input.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::{context, VerboseError, VerboseErrorKind},
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

const COMMAND_CONTEXT: &str = "parsing IRC command";

/// Parse IRCv3 message tags (the part after `@` and before the first space).
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRCv3 message tags",
        preceded(char('@'), take_until(" ")),
    )(input)
}

/// Parse message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c| c != ' ')),
    )(input)
}

fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(COMMAND_CONTEXT, take_while1(|c: char| c.is_ascii_alphanumeric()))(input)
}

/// Split the parameter list into middle parameters and the optional trailing one.
fn parse_params(mut rest: &str) -> (Vec<&str>, Option<&str>) {
    let mut middle = Vec::new();

    loop {
        let skipped = rest.trim_start_matches(' ');
        if skipped.len() == rest.len() || skipped.is_empty() {
            return (middle, None);
        }
        rest = skipped;

        if let Some(trailing) = rest.strip_prefix(':') {
            return (middle, Some(trailing));
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        middle.push(&rest[..end]);
        rest = &rest[end..];
    }
}

/// Parse a complete IRC line into its components.
///
/// IRC message format:
/// ```text
/// [@tags] [:prefix] <command> [middle...] [:trailing]
/// ```
pub fn parse_message(input: &str) -> ParseResult<&str, ParsedMessage<'_>> {
    let (input, tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;

    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;

    let (input, command) = parse_command(input)?;
    let (middle, trailing) = parse_params(input);

    Ok((
        "",
        ParsedMessage {
            tags,
            prefix,
            command,
            middle,
            trailing,
        },
    ))
}

/// A tokenized IRC line with borrowed string slices.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command verb or numeric.
    pub command: &'a str,
    /// Positional parameters before the trailing one.
    pub middle: Vec<&'a str>,
    /// The `:`-introduced final parameter, if present.
    pub trailing: Option<&'a str>,
}

impl<'a> ParsedMessage<'a> {
    /// Tokenize one line. Any trailing CR/LF is ignored.
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        let line = input.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        match parse_message(line) {
            Ok((_, msg)) => Ok(msg),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let mut position = line.len();
                let mut ctx = None;
                for (error_input, kind) in &e.errors {
                    position = line.len() - error_input.len();
                    if let VerboseErrorKind::Context(c) = kind {
                        ctx = Some(*c);
                    }
                }
                match ctx {
                    Some(COMMAND_CONTEXT) => Err(MessageParseError::InvalidCommand(line.to_string())),
                    Some(c) => Err(MessageParseError::ParseContext {
                        position,
                        context: c.to_string(),
                    }),
                    None => Err(MessageParseError::ParseContext {
                        position,
                        context: "unknown".to_string(),
                    }),
                }
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::ParseContext {
                position: line.len(),
                context: "incomplete input".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let msg = ParsedMessage::parse("PING").unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.tags.is_none());
        assert!(msg.prefix.is_none());
        assert!(msg.middle.is_empty());
        assert!(msg.trailing.is_none());
    }

    #[test]
    fn test_parse_with_prefix() {
        let msg = ParsedMessage::parse(":nick!user@host PRIVMSG #channel :Hello, world!").unwrap();
        assert_eq!(msg.prefix, Some("nick!user@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.middle, vec!["#channel"]);
        assert_eq!(msg.trailing, Some("Hello, world!"));
    }

    #[test]
    fn test_parse_with_tags() {
        let msg = ParsedMessage::parse("@time=2023-01-01T00:00:00Z :nick PRIVMSG #ch :Hi").unwrap();
        assert_eq!(msg.tags, Some("time=2023-01-01T00:00:00Z"));
        assert_eq!(msg.prefix, Some("nick"));
        assert_eq!(msg.middle, vec!["#ch"]);
        assert_eq!(msg.trailing, Some("Hi"));
    }

    #[test]
    fn test_parse_with_crlf() {
        let msg = ParsedMessage::parse("PING :server\r\n").unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.trailing, Some("server"));
    }

    #[test]
    fn test_parse_names_reply() {
        let msg = ParsedMessage::parse(":srv 353 me = #rust :@alice +bob  carol").unwrap();
        assert_eq!(msg.command, "353");
        assert_eq!(msg.middle, vec!["me", "=", "#rust"]);
        assert_eq!(msg.trailing, Some("@alice +bob  carol"));
    }

    #[test]
    fn test_parse_join_without_trailing() {
        let msg = ParsedMessage::parse(":nick!user@host JOIN #channel").unwrap();
        assert_eq!(msg.middle, vec!["#channel"]);
        assert!(msg.trailing.is_none());
    }

    #[test]
    fn test_parse_repeated_spaces() {
        let msg = ParsedMessage::parse(":srv KICK  #chan   bob :bye").unwrap();
        assert_eq!(msg.middle, vec!["#chan", "bob"]);
        assert_eq!(msg.trailing, Some("bye"));
    }

    #[test]
    fn test_parse_empty_trailing() {
        let msg = ParsedMessage::parse("PRIVMSG #channel :").unwrap();
        assert_eq!(msg.trailing, Some(""));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(
            ParsedMessage::parse("\r\n"),
            Err(MessageParseError::EmptyMessage)
        );
    }

    #[test]
    fn test_parse_rejects_missing_command() {
        let err = ParsedMessage::parse(":prefix.only ").unwrap_err();
        assert!(matches!(err, MessageParseError::InvalidCommand(_)));
    }
}
