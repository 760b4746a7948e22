//! Message dispatch and session bookkeeping.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace, warn};

use crate::command::Command;
use crate::event::Event;
use crate::message::Message;
use crate::prefix::extract_identity;
use crate::response::Response;

use super::Action;

/// Point-in-time copy of the session, for readers outside the driver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Our current nickname.
    pub nick: String,
    /// Channels we are in, sorted.
    pub channels: Vec<String>,
}

/// Session state plus the command dispatch table.
///
/// Single writer: only [`Session::feed`] mutates it.
#[derive(Clone, Debug, Default)]
pub struct Session {
    nick: String,
    channels: BTreeSet<String>,
    motd: String,
    names: HashMap<String, Vec<String>>,
}

impl Session {
    /// Start a session for the nickname we intend to register with.
    pub fn new(nick: impl Into<String>) -> Self {
        Session {
            nick: nick.into(),
            ..Default::default()
        }
    }

    /// Our current nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Channels the server last confirmed we are in.
    pub fn channels(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.iter().map(String::as_str)
    }

    /// Whether we are currently in `channel`.
    pub fn is_joined(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }

    /// Nicknames collected so far for a NAMES listing that has not ended.
    pub fn names_in_progress(&self, channel: &str) -> Option<&[String]> {
        self.names.get(channel).map(Vec::as_slice)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            nick: self.nick.clone(),
            channels: self.channels.iter().cloned().collect(),
        }
    }

    /// Dispatch one parsed line.
    pub fn feed(&mut self, msg: &Message) -> Vec<Action> {
        if let Some(response) = Response::lookup(&msg.command) {
            return self.handle_response(response, msg);
        }

        match msg.command.to_ascii_uppercase().as_str() {
            "NICK" => self.handle_nick(msg),
            "PING" => {
                let token: &str = if msg.trailing.is_empty() {
                    msg.arg(0).unwrap_or_default()
                } else {
                    &msg.trailing
                };
                vec![Action::Send(Command::PONG(token.to_string()))]
            }
            "JOIN" => self.handle_join(msg),
            "PART" => self.handle_part(msg),
            "KICK" => self.handle_kick(msg),
            "PRIVMSG" => vec![Action::Emit(Event::Message {
                from: extract_identity(&msg.prefix).to_string(),
                target: msg.arg(0).unwrap_or_default().to_string(),
                text: msg.trailing.clone(),
            })],
            _ => self.handle_other(&msg.command, msg),
        }
    }

    fn handle_response(&mut self, response: Response, msg: &Message) -> Vec<Action> {
        match response {
            Response::RPL_WELCOME => {
                if let Some(nick) = msg.arg(0) {
                    debug!(nick, "registered");
                    self.nick = nick.to_string();
                }
                Vec::new()
            }
            Response::RPL_MOTD => {
                self.motd.push_str(&msg.trailing);
                self.motd.push('\n');
                Vec::new()
            }
            Response::RPL_ENDOFMOTD => {
                let motd = std::mem::take(&mut self.motd);
                vec![Action::Emit(Event::Motd(Some(motd)))]
            }
            Response::ERR_NOMOTD => vec![Action::Emit(Event::Motd(None))],
            Response::RPL_NAMREPLY => {
                match msg.arg(2) {
                    Some(channel) => self
                        .names
                        .entry(channel.to_string())
                        .or_default()
                        .extend(msg.trailing.split_whitespace().map(String::from)),
                    None => trace!(line = ?msg, "NAMES reply without channel"),
                }
                Vec::new()
            }
            Response::RPL_ENDOFNAMES => {
                let Some(channel) = msg.arg(1) else {
                    return Vec::new();
                };
                match self.names.remove(channel) {
                    Some(nicks) => vec![Action::Emit(Event::Names {
                        channel: channel.to_string(),
                        nicks,
                    })],
                    None => Vec::new(),
                }
            }
            other => self.handle_other(other.name(), msg),
        }
    }

    fn handle_nick(&mut self, msg: &Message) -> Vec<Action> {
        let old = extract_identity(&msg.prefix).to_string();
        let new = if msg.trailing.is_empty() {
            msg.arg(0).unwrap_or_default().to_string()
        } else {
            msg.trailing.clone()
        };
        if old == self.nick {
            self.nick = new.clone();
        }
        vec![Action::Emit(Event::Nick { old, new })]
    }

    fn handle_join(&mut self, msg: &Message) -> Vec<Action> {
        let channel = msg.arg(0).unwrap_or(&msg.trailing).to_string();
        if extract_identity(&msg.prefix) == self.nick && !self.channels.contains(&channel) {
            self.channels.insert(channel.clone());
        }
        vec![Action::Emit(Event::Join {
            prefix: msg.prefix.clone(),
            channel,
        })]
    }

    fn handle_part(&mut self, msg: &Message) -> Vec<Action> {
        let channel = msg.arg(0).unwrap_or_default().to_string();
        if extract_identity(&msg.prefix) == self.nick {
            self.channels.remove(&channel);
        }
        vec![Action::Emit(Event::Part {
            prefix: msg.prefix.clone(),
            channel,
            message: msg.trailing.clone(),
        })]
    }

    /// Membership is dropped when *we* are the one kicked, not the kicker.
    fn handle_kick(&mut self, msg: &Message) -> Vec<Action> {
        let channel = msg.arg(0).unwrap_or_default().to_string();
        let nick = msg.arg(1).unwrap_or_default().to_string();
        if nick == self.nick {
            self.channels.remove(&channel);
        }
        vec![Action::Emit(Event::Kick {
            prefix: msg.prefix.clone(),
            channel,
            nick,
            reason: msg.trailing.clone(),
        })]
    }

    fn handle_other(&mut self, command: &str, msg: &Message) -> Vec<Action> {
        if command.is_empty() {
            warn!(line = ?msg, "dropping line without a command");
            return Vec::new();
        }
        vec![Action::Emit(Event::Other {
            name: command.to_ascii_lowercase(),
            target: msg.arg(0).map(String::from),
            trailing: msg.trailing.clone(),
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(session: &mut Session, line: &str) -> Vec<Action> {
        session.feed(&Message::parse(line).unwrap())
    }

    fn emitted(actions: Vec<Action>) -> Vec<Event> {
        actions
            .into_iter()
            .filter_map(|a| match a {
                Action::Emit(e) => Some(e),
                Action::Send(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_welcome_sets_nick() {
        let mut session = Session::new("wanted");
        let actions = feed(&mut session, ":srv 001 wanted_ :Welcome to IRC");
        assert!(actions.is_empty());
        assert_eq!(session.nick(), "wanted_");
    }

    #[test]
    fn test_ping_sends_pong_and_emits_nothing() {
        let mut session = Session::new("me");
        let actions = feed(&mut session, "PING :server123");
        assert_eq!(
            actions,
            vec![Action::Send(Command::PONG("server123".to_string()))]
        );
    }

    #[test]
    fn test_join_then_part_tracks_membership() {
        let mut session = Session::new("me");

        let events = emitted(feed(&mut session, ":me!u@h JOIN #rust"));
        assert_eq!(
            events,
            vec![Event::Join {
                prefix: "me!u@h".to_string(),
                channel: "#rust".to_string()
            }]
        );
        assert!(session.is_joined("#rust"));

        feed(&mut session, ":me!u@h JOIN :#rust");
        assert_eq!(session.channels().collect::<Vec<_>>(), vec!["#rust"]);

        let events = emitted(feed(&mut session, ":me!u@h PART #rust :bye"));
        assert_eq!(
            events,
            vec![Event::Part {
                prefix: "me!u@h".to_string(),
                channel: "#rust".to_string(),
                message: "bye".to_string(),
            }]
        );
        assert!(!session.is_joined("#rust"));
    }

    #[test]
    fn test_other_users_do_not_change_membership() {
        let mut session = Session::new("me");
        feed(&mut session, ":alice!a@h JOIN #rust");
        assert!(!session.is_joined("#rust"));

        feed(&mut session, ":me!u@h JOIN #rust");
        feed(&mut session, ":alice!a@h PART #rust");
        assert!(session.is_joined("#rust"));
    }

    #[test]
    fn test_kick_removes_only_when_we_are_kicked() {
        let mut session = Session::new("me");
        feed(&mut session, ":me!u@h JOIN #rust");

        let events = emitted(feed(&mut session, ":me!u@h KICK #rust bob :spam"));
        assert_eq!(
            events,
            vec![Event::Kick {
                prefix: "me!u@h".to_string(),
                channel: "#rust".to_string(),
                nick: "bob".to_string(),
                reason: "spam".to_string(),
            }]
        );
        assert!(session.is_joined("#rust"));

        feed(&mut session, ":op!o@h KICK #rust me :out");
        assert!(!session.is_joined("#rust"));
    }

    #[test]
    fn test_nick_change_for_self_and_others() {
        let mut session = Session::new("me");
        let events = emitted(feed(&mut session, ":alice!a@h NICK :alicia"));
        assert_eq!(
            events,
            vec![Event::Nick {
                old: "alice".to_string(),
                new: "alicia".to_string()
            }]
        );
        assert_eq!(session.nick(), "me");

        feed(&mut session, ":me!u@h NICK me2");
        assert_eq!(session.nick(), "me2");
    }

    #[test]
    fn test_motd_accumulates_until_end() {
        let mut session = Session::new("me");
        assert!(feed(&mut session, ":srv 375 me :- srv Message of the day -").len() == 1);
        assert!(feed(&mut session, ":srv 372 me :- line one").is_empty());
        assert!(feed(&mut session, ":srv 372 me :- line two").is_empty());
        let events = emitted(feed(&mut session, ":srv 376 me :End of /MOTD command."));
        assert_eq!(
            events,
            vec![Event::Motd(Some("- line one\n- line two\n".to_string()))]
        );
    }

    #[test]
    fn test_no_motd_emits_none() {
        let mut session = Session::new("me");
        let events = emitted(feed(&mut session, ":srv 422 me :MOTD File is missing"));
        assert_eq!(events, vec![Event::Motd(None)]);
    }

    #[test]
    fn test_names_aggregation() {
        let mut session = Session::new("me");
        assert!(feed(&mut session, ":srv 353 me = #rust :@alice +bob").is_empty());
        assert!(feed(&mut session, ":srv 353 me = #rust :carol  me").is_empty());
        assert_eq!(
            session.names_in_progress("#rust").map(<[String]>::len),
            Some(4)
        );

        let events = emitted(feed(&mut session, ":srv 366 me #rust :End of /NAMES list."));
        assert_eq!(
            events,
            vec![Event::Names {
                channel: "#rust".to_string(),
                nicks: vec!["@alice", "+bob", "carol", "me"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            }]
        );
        assert!(session.names_in_progress("#rust").is_none());
    }

    #[test]
    fn test_end_of_names_without_listing_is_silent() {
        let mut session = Session::new("me");
        assert!(feed(&mut session, ":srv 366 me #empty :End of /NAMES list.").is_empty());
    }

    #[test]
    fn test_privmsg_sender_identity() {
        let mut session = Session::new("me");
        let events = emitted(feed(&mut session, ":alice!a@h PRIVMSG #rust :hello there"));
        assert_eq!(
            events,
            vec![Event::Message {
                from: "alice".to_string(),
                target: "#rust".to_string(),
                text: "hello there".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_commands_use_lowercased_names() {
        let mut session = Session::new("me");
        let events = emitted(feed(&mut session, ":srv NOTICE me :*** Looking up your hostname"));
        assert_eq!(
            events,
            vec![Event::Other {
                name: "notice".to_string(),
                target: Some("me".to_string()),
                trailing: "*** Looking up your hostname".to_string(),
            }]
        );

        let events = emitted(feed(&mut session, ":srv 433 * me :Nickname is already in use"));
        assert_eq!(events[0].name(), "err_nicknameinuse");

        let events = emitted(feed(&mut session, ":srv 999 me :unassigned"));
        assert_eq!(events[0].name(), "999");
    }

    #[test]
    fn test_snapshot() {
        let mut session = Session::new("me");
        feed(&mut session, ":me!u@h JOIN #b");
        feed(&mut session, ":me!u@h JOIN #a");
        assert_eq!(
            session.snapshot(),
            SessionSnapshot {
                nick: "me".to_string(),
                channels: vec!["#a".to_string(), "#b".to_string()],
            }
        );
    }
}
