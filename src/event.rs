//! Events emitted by the client and the emitter that delivers them.
//!
//! Every event goes to the listeners of its own name (if any) and then,
//! unconditionally, to listeners of [`DATA`]. Subscribing to `"data"` is the
//! way to tap the full stream without naming each event.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Name of the catch-all tap.
pub const DATA: &str = "data";

/// Events that the client emits to its observers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// Transport connected; registration is about to start.
    Connect,
    /// Registration finished and initial channels were requested.
    Ready,
    /// Someone (possibly us) joined a channel.
    Join { prefix: String, channel: String },
    /// Someone (possibly us) left a channel.
    Part {
        prefix: String,
        channel: String,
        message: String,
    },
    /// `nick` was kicked from `channel` by `prefix`.
    Kick {
        prefix: String,
        channel: String,
        nick: String,
        reason: String,
    },
    /// End of the MOTD. `None` when the server has no MOTD.
    Motd(Option<String>),
    /// A PRIVMSG.
    Message {
        from: String,
        target: String,
        text: String,
    },
    /// Completed NAMES listing for a channel.
    Names { channel: String, nicks: Vec<String> },
    /// A nickname change.
    Nick { old: String, new: String },
    /// Transport failure.
    Error(String),
    /// Transport closed.
    Close { had_error: bool },
    /// Any other command, named by its lower-cased verb or reply mnemonic.
    Other {
        name: String,
        target: Option<String>,
        trailing: String,
    },
}

impl Event {
    /// Listener name this event is delivered under.
    pub fn name(&self) -> &str {
        match self {
            Event::Connect => "connect",
            Event::Ready => "ready",
            Event::Join { .. } => "join",
            Event::Part { .. } => "part",
            Event::Kick { .. } => "kick",
            Event::Motd(_) => "motd",
            Event::Message { .. } => "message",
            Event::Names { .. } => "names",
            Event::Nick { .. } => "nick",
            Event::Error(_) => "error",
            Event::Close { .. } => "close",
            Event::Other { name, .. } => name,
        }
    }
}

/// Handle identifying one subscription for [`Emitter::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct Subscription {
    id: ListenerId,
    name: String,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Subscription {
    /// Identifier to pass to [`Emitter::unsubscribe`].
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Event name this subscription listens to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next event. `None` once unsubscribed or the emitter is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Take an already delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug, Default)]
struct Listeners {
    next_id: u64,
    by_name: HashMap<String, Vec<(ListenerId, mpsc::UnboundedSender<Event>)>>,
}

impl Listeners {
    fn deliver(&mut self, name: &str, event: &Event) -> usize {
        let Some(list) = self.by_name.get_mut(name) else {
            return 0;
        };
        list.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        let delivered = list.len();
        if list.is_empty() {
            self.by_name.remove(name);
        }
        delivered
    }
}

/// Subscribe/unsubscribe/emit capability owned by a connection.
///
/// Cloning yields another handle to the same listener table.
#[derive(Clone, Debug, Default)]
pub struct Emitter {
    inner: Arc<Mutex<Listeners>>,
}

impl Emitter {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for events delivered under `name`.
    pub fn subscribe(&self, name: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut listeners = self.inner.lock();
        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners
            .by_name
            .entry(name.to_string())
            .or_default()
            .push((id, tx));
        Subscription {
            id,
            name: name.to_string(),
            rx,
        }
    }

    /// Listen for every event via the [`DATA`] tap.
    pub fn subscribe_all(&self) -> Subscription {
        self.subscribe(DATA)
    }

    /// Remove a listener. Its [`Subscription`] drains what was already
    /// delivered and then yields `None`.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.lock();
        let mut removed = false;
        listeners.by_name.retain(|_, list| {
            let before = list.len();
            list.retain(|(listener, _)| *listener != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Number of live listeners for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .by_name
            .get(name)
            .map_or(0, |list| list.iter().filter(|(_, tx)| !tx.is_closed()).count())
    }

    /// Deliver `event` to its named listeners, then to the data tap.
    ///
    /// An event that is itself named `data` (a server `DATA` line) reaches
    /// the tap once. Returns whether any listener of the specific name
    /// received it.
    pub fn emit(&self, event: Event) -> bool {
        let mut listeners = self.inner.lock();
        let name = event.name();
        if name == DATA {
            return listeners.deliver(DATA, &event) > 0;
        }
        let delivered = listeners.deliver(name, &event);
        listeners.deliver(DATA, &event);
        delivered > 0
    }
}
