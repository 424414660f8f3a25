//! Connection lifecycle: sessions, reconnects and identity rotation.
//!
//! The controller is either *Idle* (no session; waiting for startup or a
//! reconnect timer) or *Connected* (one live session). Everything that can
//! end a session arrives as a [`Signal`] on one queue that a single task
//! drains in order, so the "reconnect already scheduled" check and its set
//! happen in one step and only the first of several near-simultaneous
//! disconnect signals schedules a reconnect.

use std::sync::Arc;

use afkbot_sdk::client::{self, ClientHandle, ConnectConfig};
use afkbot_sdk::event::Event;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::behaviors;
use crate::config::Settings;
use crate::identity::IdentityCursor;
use crate::kick::KickReason;
use crate::session::Session;

/// Generation number of a session, unique for the life of the process.
pub type SessionId = u64;

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Signal {
    /// An event from the connection of session `session`.
    Event { session: SessionId, event: Event },
    /// A session-owned task failed or panicked.
    Fault { session: SessionId, error: String },
    /// The reconnect delay has elapsed.
    ReconnectDue,
}

/// Opens game connections. The seam where tests substitute an in-memory gateway.
pub trait Connector: Send + Sync {
    fn connect(&self, config: ConnectConfig) -> (ClientHandle, mpsc::Receiver<Event>);
}

/// Connects over TCP to the gateway named in the settings.
pub struct GatewayConnector;

impl Connector for GatewayConnector {
    fn connect(&self, config: ConnectConfig) -> (ClientHandle, mpsc::Receiver<Event>) {
        client::connect(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Connected,
}

pub struct Controller {
    settings: Arc<Settings>,
    connector: Box<dyn Connector>,
    identity: IdentityCursor,
    reconnect_scheduled: bool,
    reconnect_timer: Option<JoinHandle<()>>,
    session: Option<Session>,
    /// The most recently ended session, whose late kick reasons still count.
    last_ended: Option<SessionId>,
    next_session: SessionId,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
}

impl Controller {
    pub fn new(settings: Arc<Settings>, connector: Box<dyn Connector>) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let identity = IdentityCursor::new(settings.bot_account.usernames.len());
        Self {
            settings,
            connector,
            identity,
            reconnect_scheduled: false,
            reconnect_timer: None,
            session: None,
            last_ended: None,
            next_session: 1,
            signal_tx,
            signal_rx,
        }
    }

    pub fn state(&self) -> State {
        if self.session.is_some() {
            State::Connected
        } else {
            State::Idle
        }
    }

    pub fn identity(&self) -> IdentityCursor {
        self.identity
    }

    pub fn reconnect_scheduled(&self) -> bool {
        self.reconnect_scheduled
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Sender for injecting signals from outside the session, e.g. a
    /// process-level fault.
    pub fn signals(&self) -> mpsc::UnboundedSender<Signal> {
        self.signal_tx.clone()
    }

    /// Idle with nothing scheduled: auto-reconnect is off and the last
    /// session is over.
    pub fn is_halted(&self) -> bool {
        self.session.is_none() && !self.reconnect_scheduled
    }

    /// Drive sessions until the controller halts.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.start_session().await;
        while self.step().await {}
        tracing::warn!("Auto-reconnect is disabled; the bot will stay offline");
        Ok(())
    }

    /// Handle one signal. Returns false once the controller has halted.
    pub async fn step(&mut self) -> bool {
        if self.is_halted() {
            return false;
        }
        let Some(signal) = self.signal_rx.recv().await else {
            return false;
        };
        self.handle_signal(signal).await;
        !self.is_halted()
    }

    /// Open a session as the identity under the cursor.
    pub async fn start_session(&mut self) {
        self.end_session("superseded");
        self.reconnect_scheduled = false;
        self.reconnect_timer = None;

        let id = self.next_session;
        self.next_session += 1;
        let username = self.identity.current(&self.settings.bot_account.usernames).to_string();

        tracing::info!(
            session = id,
            %username,
            server = %format!("{}:{}", self.settings.server.ip, self.settings.server.port),
            "Connecting"
        );
        let (handle, events) = self.connector.connect(self.settings.connect_config(&username));
        if let Err(e) = handle.load_pathfinder().await {
            // The connection is already gone; its Disconnected event follows.
            tracing::warn!(session = id, error = %e, "Could not register pathfinder");
        }
        self.session = Some(Session::new(id, handle, events, self.signal_tx.clone()));
    }

    pub async fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::ReconnectDue => {
                if self.session.is_none() {
                    self.start_session().await;
                }
            }
            // A kick can trail the error that already ended its session. It
            // still decides who logs in next, but must not touch the guard.
            Signal::Event {
                session,
                event: Event::Kicked { reason },
            } if self.last_ended == Some(session) => {
                self.rotate_on_conflict(&reason);
            }
            Signal::Event { session, event } => {
                if !self.is_current(session) {
                    tracing::debug!(session, ?event, "Dropping event from ended session");
                    return;
                }
                self.handle_event(event);
            }
            Signal::Fault { session, error } => {
                if !self.is_current(session) {
                    tracing::debug!(session, %error, "Dropping fault from ended session");
                    return;
                }
                self.handle_fatal(&error);
            }
        }
    }

    fn is_current(&self, session: SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session)
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected => {
                tracing::debug!("Transport connected, waiting for spawn");
            }
            Event::Spawned { position } => {
                let Some(session) = self.session.as_mut() else { return };
                if session.mark_ready() {
                    tracing::info!(username = %session.username(), %position, "Bot joined to the server");
                    behaviors::start(&self.settings, session);
                } else {
                    tracing::debug!(%position, "Respawned");
                }
            }
            Event::Chat { username, message } => {
                behaviors::log_chat(&self.settings, &username, &message);
            }
            Event::Death => {
                if let Some(session) = &self.session {
                    behaviors::log_death(&session.handle);
                }
            }
            Event::Kicked { reason } => self.handle_kick(&reason),
            Event::Error { message } => {
                tracing::error!(error = %message, "Connection error");
                self.handle_disconnect("connection error");
            }
            Event::Disconnected { reason } => {
                tracing::warn!(%reason, "Bot has disconnected");
                self.handle_disconnect("disconnected");
            }
        }
    }

    /// Classify a kick, rotate identity on a conflict, then disconnect.
    pub fn handle_kick(&mut self, raw_reason: &str) {
        self.rotate_on_conflict(raw_reason);
        self.handle_disconnect("kicked");
    }

    /// Advance the identity cursor if the kick reason is an identity conflict.
    fn rotate_on_conflict(&mut self, raw_reason: &str) {
        let kick = KickReason::classify(raw_reason);
        tracing::warn!(reason = %kick.text, "Bot was kicked from the server");
        if kick.identity_conflict {
            self.identity.advance();
            tracing::info!(
                username = %self.identity.current(&self.settings.bot_account.usernames),
                "Switching to next username"
            );
        }
    }

    /// Backstop for failures inside behaviors: log and recycle the session.
    pub fn handle_fatal(&mut self, error: &str) {
        tracing::error!(%error, "Unhandled exception");
        tracing::warn!("Bot is restarting due to an uncaught exception...");
        self.handle_disconnect("fatal error");
    }

    /// End the current session and schedule exactly one reconnect.
    ///
    /// The session is always torn down. Scheduling is skipped if a reconnect
    /// is already pending or auto-reconnect is off. Returns whether this call
    /// scheduled the reconnect.
    pub fn handle_disconnect(&mut self, cause: &str) -> bool {
        self.end_session(cause);

        if self.reconnect_scheduled {
            tracing::debug!(%cause, "Reconnect already scheduled");
            return false;
        }
        if !self.settings.utils.auto_reconnect {
            tracing::debug!(%cause, "Auto-reconnect disabled, not reconnecting");
            return false;
        }

        self.reconnect_scheduled = true;
        let delay = self.settings.reconnect_delay();
        tracing::warn!("Reconnecting in {} seconds...", delay.as_secs_f64());
        let signals = self.signal_tx.clone();
        self.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(Signal::ReconnectDue);
        }));
        true
    }

    fn end_session(&mut self, cause: &str) {
        if let Some(session) = self.session.take() {
            self.last_ended = Some(session.id);
            session.end(cause);
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }
}
