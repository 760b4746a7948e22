//! Connect-time registration handshake.

use crate::command::Command;
use crate::config::Config;
use crate::event::Event;

use super::Action;

/// Where the handshake currently stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationState {
    /// PASS not yet considered.
    #[default]
    AwaitingPass,
    /// PASS sent or skipped; NICK next.
    AwaitingNick,
    /// NICK sent or skipped; USER next.
    AwaitingUser,
    /// All local writes done; waiting for the server's MOTD (or its absence).
    AwaitingMotd,
    /// Initial channels requested and `ready` emitted.
    Ready,
}

/// Sans-IO registration sequencer: PASS, NICK, USER, then JOIN after MOTD.
///
/// Steps whose configuration is missing are skipped. The driver calls
/// [`next_command`](Self::next_command) after each write completes and
/// [`on_motd`](Self::on_motd) when the `motd` event fires.
#[derive(Clone, Debug)]
pub struct Registration {
    state: RegistrationState,
    password: Option<String>,
    nick: Option<String>,
    user: Option<(String, String)>,
    channels: Vec<String>,
}

impl Registration {
    /// Build the handshake for a connection configuration.
    pub fn new(config: &Config) -> Self {
        let user = match (&config.username, &config.real_name) {
            (Some(username), Some(real_name)) => Some((username.clone(), real_name.clone())),
            _ => None,
        };
        Registration {
            state: RegistrationState::AwaitingPass,
            password: config.password.clone(),
            nick: config.nick.clone(),
            user,
            channels: config.channels.clone(),
        }
    }

    /// Current handshake state.
    #[must_use]
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Next local write of the handshake, skipping unconfigured steps.
    ///
    /// Returns `None` once the handshake is waiting on the server.
    #[must_use]
    pub fn next_command(&mut self) -> Option<Command> {
        loop {
            match self.state {
                RegistrationState::AwaitingPass => {
                    self.state = RegistrationState::AwaitingNick;
                    if let Some(password) = self.password.take() {
                        return Some(Command::PASS(password));
                    }
                }
                RegistrationState::AwaitingNick => {
                    self.state = RegistrationState::AwaitingUser;
                    if let Some(nick) = self.nick.take() {
                        return Some(Command::NICK(nick));
                    }
                }
                RegistrationState::AwaitingUser => {
                    self.state = RegistrationState::AwaitingMotd;
                    if let Some((username, real_name)) = self.user.take() {
                        return Some(Command::USER(username, real_name));
                    }
                }
                RegistrationState::AwaitingMotd | RegistrationState::Ready => return None,
            }
        }
    }

    /// React to the `motd` event: request the initial channels, then signal ready.
    ///
    /// Only the first MOTD after the local writes counts; later ones (e.g. from
    /// a `MOTD` command) produce nothing.
    #[must_use]
    pub fn on_motd(&mut self) -> Vec<Action> {
        if self.state != RegistrationState::AwaitingMotd {
            return Vec::new();
        }
        self.state = RegistrationState::Ready;

        let mut actions = Vec::with_capacity(2);
        if !self.channels.is_empty() {
            actions.push(Action::Send(Command::JOIN(std::mem::take(
                &mut self.channels,
            ))));
        }
        actions.push(Action::Emit(Event::Ready));
        actions
    }
}
