//! Connection driver and the public client handle.
//!
//! One spawned task per connection owns the [`Session`], the
//! [`Registration`] sequencer and the framed stream. [`Client`] is a cheap,
//! cloneable handle that submits writes to that task and waits for them to
//! be flushed.
//!
//! # Example
//!
//! ```no_run
//! use slirc_client::{Client, ClientOptions, Config, Emitter, Event};
//!
//! # async fn run() -> slirc_client::Result<()> {
//! let events = Emitter::new();
//! let mut ready = events.subscribe("ready");
//!
//! let config = Config::from(ClientOptions {
//!     host: Some("irc.example.org".to_string()),
//!     nick: Some("bot".to_string()),
//!     username: Some("bot".to_string()),
//!     real_name: Some("A bot".to_string()),
//!     channels: Some(vec!["#rust".to_string()]),
//!     ..Default::default()
//! });
//! let client = Client::connect(config, events).await?;
//!
//! while let Some(event) = ready.recv().await {
//!     if event == Event::Ready {
//!         client.say("#rust", "hello").await?;
//!         break;
//!     }
//! }
//! client.end(Some("bye")).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::io;
use std::ops::ControlFlow;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::command::Command;
use crate::config::Config;
use crate::error::{ClientError, ProtocolError, Result};
use crate::event::{Emitter, Event};
use crate::line::LineCodec;
use crate::message::Message;
use crate::state::{Action, Registration, Session, SessionSnapshot};
use crate::transport;

type Ack = oneshot::Sender<Result<()>>;
type NamesReply = oneshot::Sender<Result<Vec<String>>>;

enum Request {
    Send { command: Command, ack: Ack },
    Names { channel: String, reply: NamesReply },
    End { message: Option<String>, ack: Ack },
}

/// Handle to a running connection.
///
/// All clones talk to the same connection task. Every write method resolves
/// once the line has been flushed to the transport, or with the write error.
#[derive(Clone, Debug)]
pub struct Client {
    requests: mpsc::UnboundedSender<Request>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    events: Emitter,
}

impl Client {
    /// Open the transport described by `config` and start the connection.
    ///
    /// A connect failure is reported both as the returned error and as
    /// `error` then `close` events on `events`.
    pub async fn connect(config: Config, events: Emitter) -> Result<Client> {
        match transport::connect(&config).await {
            Ok(stream) => Self::from_stream(stream, config, events),
            Err(e) => {
                warn!(host = %config.host, port = config.port, error = %e, "connect failed");
                events.emit(Event::Error(e.to_string()));
                events.emit(Event::Close { had_error: true });
                Err(e)
            }
        }
    }

    /// Run the connection over an already established stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_stream<S>(stream: S, config: Config, events: Emitter) -> Result<Client>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let codec = LineCodec::new(&config.encoding)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(config.nick.clone().unwrap_or_default());
        let snapshot = Arc::new(RwLock::new(session.snapshot()));

        let driver = Driver {
            framed: Framed::new(stream, codec),
            registration: Registration::new(&config),
            session,
            events: events.clone(),
            snapshot: Arc::clone(&snapshot),
            requests: rx,
            pending_names: HashMap::new(),
        };
        tokio::spawn(driver.run());

        Ok(Client {
            requests: tx,
            snapshot,
            events,
        })
    }

    /// The emitter this connection delivers events to.
    pub fn events(&self) -> &Emitter {
        &self.events
    }

    /// Our current nickname as last confirmed by the server.
    pub fn nick(&self) -> String {
        self.snapshot.read().nick.clone()
    }

    /// Channels we are currently in, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.snapshot.read().channels.clone()
    }

    /// Copy of the session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().clone()
    }

    /// Whether the connection task has stopped.
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    /// Send `PASS`.
    pub async fn pass(&self, password: &str) -> Result<()> {
        self.send(Command::PASS(password.to_string())).await
    }

    /// Request a nickname change. [`nick`](Self::nick) updates once the server confirms.
    pub async fn set_nick(&self, nick: &str) -> Result<()> {
        self.send(Command::NICK(nick.to_string())).await
    }

    /// Send `USER username 0 * :real_name`.
    pub async fn set_user(&self, username: &str, real_name: &str) -> Result<()> {
        self.send(Command::USER(username.to_string(), real_name.to_string()))
            .await
    }

    /// Send a PRIVMSG to a channel or nickname.
    pub async fn say(&self, target: &str, text: &str) -> Result<()> {
        self.send(Command::PRIVMSG(target.to_string(), text.to_string()))
            .await
    }

    /// Join channels with a single combined JOIN. An empty list sends nothing.
    pub async fn join<I, S>(&self, channels: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        if channels.is_empty() {
            return Ok(());
        }
        self.send(Command::JOIN(channels)).await
    }

    /// Leave channels with a single combined PART. An empty list sends nothing.
    pub async fn part<I, S>(&self, channels: I, message: Option<&str>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        if channels.is_empty() {
            return Ok(());
        }
        self.send(Command::PART(channels, message.map(str::to_string)))
            .await
    }

    /// Alias of [`part`](Self::part).
    pub async fn leave<I, S>(&self, channels: I, message: Option<&str>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.part(channels, message).await
    }

    /// Kick `nick` from `channel`, with an optional reason.
    pub async fn kick(&self, channel: &str, nick: &str, message: Option<&str>) -> Result<()> {
        self.send(Command::KICK(
            channel.to_string(),
            nick.to_string(),
            message.map(str::to_string),
        ))
        .await
    }

    /// Ask for the member list of `channel` and wait for the complete answer.
    ///
    /// There is no timeout: this waits until the server ends the listing or
    /// the connection closes (`ClientError::ConnectionClosed`).
    pub async fn names(&self, channel: &str) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.submit(Request::Names {
            channel: channel.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| ClientError::ConnectionClosed)?
    }

    /// Send QUIT, leaving the transport for the server to close.
    pub async fn quit(&self, message: Option<&str>) -> Result<()> {
        self.send(Command::QUIT(message.map(str::to_string))).await
    }

    /// Send QUIT, then close the transport.
    pub async fn end(&self, message: Option<&str>) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.submit(Request::End {
            message: message.map(str::to_string),
            ack,
        })?;
        rx.await.map_err(|_| ClientError::ConnectionClosed)?
    }

    /// Send an arbitrary line. Anything after a CR or LF is dropped.
    pub async fn raw(&self, line: &str) -> Result<()> {
        self.send(Command::Raw(line.to_string())).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.submit(Request::Send { command, ack })?;
        rx.await.map_err(|_| ClientError::ConnectionClosed)?
    }

    fn submit(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| ClientError::ConnectionClosed)
    }
}

struct Driver<S> {
    framed: Framed<S, LineCodec>,
    registration: Registration,
    session: Session,
    events: Emitter,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    requests: mpsc::UnboundedReceiver<Request>,
    pending_names: HashMap<String, Vec<NamesReply>>,
}

impl<S> Driver<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(mut self) {
        self.events.emit(Event::Connect);

        let had_error = match self.serve().await {
            Ok(()) => false,
            Err(e) => {
                warn!(error = %e, "connection failed");
                self.events.emit(Event::Error(e.to_string()));
                true
            }
        };

        for (_, waiters) in self.pending_names.drain() {
            for waiter in waiters {
                let _ = waiter.send(Err(ClientError::ConnectionClosed));
            }
        }
        // Fail anything still queued rather than leaving callers waiting.
        self.requests.close();
        while let Ok(request) = self.requests.try_recv() {
            match request {
                Request::Send { ack, .. } | Request::End { ack, .. } => {
                    let _ = ack.send(Err(ClientError::ConnectionClosed));
                }
                Request::Names { reply, .. } => {
                    let _ = reply.send(Err(ClientError::ConnectionClosed));
                }
            }
        }

        debug!(had_error, "connection closed");
        self.events.emit(Event::Close { had_error });
    }

    async fn serve(&mut self) -> Result<()> {
        while let Some(command) = self.registration.next_command() {
            self.write(command).await?;
        }

        let mut requests_open = true;
        loop {
            tokio::select! {
                line = self.framed.next() => match line {
                    Some(Ok(line)) => self.handle_line(&line).await?,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                },
                request = self.requests.recv(), if requests_open => match request {
                    Some(request) => {
                        if self.handle_request(request).await?.is_break() {
                            return Ok(());
                        }
                    }
                    None => requests_open = false,
                },
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<()> {
        debug!("<< {}", line);
        let msg = match Message::parse(line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(line, error = %e, "dropping malformed line");
                return Ok(());
            }
        };

        let mut queue: VecDeque<Action> = self.session.feed(&msg).into();
        self.publish_snapshot();

        while let Some(action) = queue.pop_front() {
            match action {
                Action::Send(command) => self.write(command).await?,
                Action::Emit(Event::Motd(text)) => {
                    let follow_up = self.registration.on_motd();
                    self.emit(Event::Motd(text));
                    for action in follow_up.into_iter().rev() {
                        queue.push_front(action);
                    }
                }
                Action::Emit(event) => self.emit(event),
            }
        }
        Ok(())
    }

    fn publish_snapshot(&self) {
        let snapshot = self.session.snapshot();
        let mut shared = self.snapshot.write();
        if *shared != snapshot {
            *shared = snapshot;
        }
    }

    async fn handle_request(&mut self, request: Request) -> Result<ControlFlow<()>> {
        match request {
            Request::Send { command, ack } => {
                let result = self.write(command).await;
                reply(ack, &result);
                result.map(|()| ControlFlow::Continue(()))
            }
            Request::Names { channel, reply } => {
                self.pending_names
                    .entry(channel.clone())
                    .or_default()
                    .push(reply);
                if let Err(e) = self.write(Command::NAMES(channel.clone())).await {
                    if let Some(waiters) = self.pending_names.get_mut(&channel) {
                        if let Some(waiter) = waiters.pop() {
                            let _ = waiter.send(Err(copy_error(&e)));
                        }
                        if waiters.is_empty() {
                            self.pending_names.remove(&channel);
                        }
                    }
                    return Err(e);
                }
                Ok(ControlFlow::Continue(()))
            }
            Request::End { message, ack } => {
                let mut result = self.write(Command::QUIT(message)).await;
                if result.is_ok() {
                    result = SinkExt::<String>::close(&mut self.framed)
                        .await
                        .map_err(ClientError::from);
                }
                reply(ack, &result);
                result.map(|()| ControlFlow::Break(()))
            }
        }
    }

    fn emit(&mut self, event: Event) {
        if let Event::Names { channel, nicks } = &event {
            if let Some(waiters) = self.pending_names.remove(channel) {
                for waiter in waiters {
                    let _ = waiter.send(Ok(nicks.clone()));
                }
            }
        }
        self.events.emit(event);
    }

    async fn write(&mut self, command: Command) -> Result<()> {
        match &command {
            Command::PASS(_) => debug!(">> PASS <hidden>"),
            _ => debug!(">> {}", command),
        }
        self.framed.send(command.to_string()).await?;
        Ok(())
    }
}

/// Hand a write outcome to the caller that asked for it.
fn reply(ack: Ack, result: &Result<()>) {
    let outcome = match result {
        Ok(()) => Ok(()),
        Err(e) => Err(copy_error(e)),
    };
    let _ = ack.send(outcome);
}

fn copy_error(e: &ClientError) -> ClientError {
    match e {
        ClientError::Io(io) | ClientError::Protocol(ProtocolError::Io(io)) => {
            ClientError::Io(io::Error::new(io.kind(), io.to_string()))
        }
        _ => ClientError::ConnectionClosed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientOptions;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadBuf};

    /// Stream that accepts `writes_left` writes and then fails with BrokenPipe.
    struct BrokenAfter {
        inner: DuplexStream,
        writes_left: usize,
    }

    impl AsyncRead for BrokenAfter {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for BrokenAfter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.writes_left == 0 {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "boom")));
            }
            self.writes_left -= 1;
            Pin::new(&mut self.inner).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.inner).poll_flush(cx)
        }

        fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.inner).poll_shutdown(cx)
        }
    }

    /// Client whose registration NICK goes through and every later write fails.
    async fn client_with_broken_writes() -> (Client, BufReader<DuplexStream>) {
        let (local, remote) = tokio::io::duplex(1024);
        let stream = BrokenAfter {
            inner: local,
            writes_left: 1,
        };
        let client = Client::from_stream(stream, config(), Emitter::new()).unwrap();
        let mut server = BufReader::new(remote);
        assert_eq!(read_line(&mut server).await, "NICK me\r\n");
        (client, server)
    }

    fn is_broken_pipe(result: &Result<impl std::fmt::Debug>) -> bool {
        matches!(result, Err(ClientError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe)
    }

    fn config() -> Config {
        Config::from(ClientOptions {
            host: Some("irc.example.org".to_string()),
            nick: Some("me".to_string()),
            ..Default::default()
        })
    }

    async fn read_line(reader: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn test_write_resolves_after_flush() {
        let (local, remote) = tokio::io::duplex(1024);
        let client = Client::from_stream(local, config(), Emitter::new()).unwrap();
        let mut server = BufReader::new(remote);

        assert_eq!(read_line(&mut server).await, "NICK me\r\n");
        client.say("#c", "hi there").await.unwrap();
        assert_eq!(read_line(&mut server).await, "PRIVMSG #c :hi there\r\n");
    }

    #[tokio::test]
    async fn test_say_reports_write_error() {
        let (client, _server) = client_with_broken_writes().await;
        let result = client.say("#c", "lost").await;
        assert!(is_broken_pipe(&result), "got {result:?}");
    }

    #[tokio::test]
    async fn test_names_reports_write_error() {
        let (client, _server) = client_with_broken_writes().await;
        let result = client.names("#c").await;
        assert!(is_broken_pipe(&result), "got {result:?}");
    }

    #[tokio::test]
    async fn test_empty_join_sends_nothing() {
        let (local, remote) = tokio::io::duplex(1024);
        let client = Client::from_stream(local, config(), Emitter::new()).unwrap();
        let mut server = BufReader::new(remote);

        assert_eq!(read_line(&mut server).await, "NICK me\r\n");
        client.join(Vec::<String>::new()).await.unwrap();
        client.part(["#x"], None).await.unwrap();
        assert_eq!(read_line(&mut server).await, "PART #x\r\n");
    }

    #[tokio::test]
    async fn test_snapshot_tracks_nick_change() {
        let (local, remote) = tokio::io::duplex(1024);
        let events = Emitter::new();
        let mut nicks = events.subscribe("nick");
        let client = Client::from_stream(local, config(), events).unwrap();
        let mut server = BufReader::new(remote);

        assert_eq!(read_line(&mut server).await, "NICK me\r\n");
        server
            .get_mut()
            .write_all(b":me!u@h NICK :you\r\n")
            .await
            .unwrap();

        assert_eq!(
            nicks.recv().await,
            Some(Event::Nick {
                old: "me".to_string(),
                new: "you".to_string()
            })
        );
        assert_eq!(client.nick(), "you");
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let (local, remote) = tokio::io::duplex(1024);
        let events = Emitter::new();
        let mut close = events.subscribe("close");
        let client = Client::from_stream(local, config(), events).unwrap();
        drop(remote);

        assert_eq!(close.recv().await, Some(Event::Close { had_error: true }));
        assert!(client.is_closed());
        assert!(matches!(
            client.say("#c", "late").await,
            Err(ClientError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_unknown_encoding_is_rejected() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();
        let (local, _remote) = tokio::io::duplex(64);
        let config = Config::from(ClientOptions {
            host: Some("irc.example.org".to_string()),
            encoding: Some("no-such-charset".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            Client::from_stream(local, config, Emitter::new()),
            Err(ClientError::Protocol(ProtocolError::UnknownEncoding(_)))
        ));
    }
}
