//! One end-to-end streaming session: browser ↔ agent runtime, with the
//! backend's plan events bridged into the agent.
//!
//! `Connecting → Bridging → Draining → Closed`. Dial failures are reported
//! once to the browser as a 1011 close frame; nothing is retried.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use coach_observability::metrics::record_stream_session;
use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::CoachBackendClient;
use crate::bridge::{run_bridge, BridgeExit};
use crate::error::GatewayError;
use crate::upstream::UpstreamSocket;
use crate::CoachSessions;

pub const INIT_FAILED_REASON: &str = "Could not initialize the chat session";
pub const AGENT_UNREACHABLE_REASON: &str = "Could not reach the agent service";
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type ClientSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;
type AgentSink = Arc<Mutex<SplitSink<UpstreamSocket, UpstreamMessage>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Connecting,
    Bridging,
    Draining,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    ClientToAgent,
    AgentToClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegExit {
    PeerClosed,
    ReadFailed,
    WriteFailed,
    /// Did not finish within the drain grace period.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOutcome {
    pub session_id: Option<String>,
    /// Last state entered before `Closed`.
    pub reached: ProxyState,
    pub first_exit: Option<(Leg, LegExit)>,
    pub bridged: bool,
}

pub struct SessionProxy {
    directory: Arc<CoachSessions>,
    events: Option<CoachBackendClient>,
    drain_timeout: Duration,
}

impl SessionProxy {
    /// `events` is optional: without it the chat stream runs unbridged.
    pub fn new(directory: Arc<CoachSessions>, events: Option<CoachBackendClient>) -> Self {
        Self {
            directory,
            events,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub async fn run(&self, mut client: WebSocket, user: &str) -> ProxyOutcome {
        let mut state = ProxyState::Connecting;
        let failed = |session_id| ProxyOutcome {
            session_id,
            reached: ProxyState::Connecting,
            first_exit: None,
            bridged: false,
        };

        let session_id = match self.directory.resolve(user).await {
            Ok(resolved) => resolved.session_id,
            Err(e) => {
                warn!(user, error = %e, "stream session could not be resolved");
                close_with_error(&mut client, INIT_FAILED_REASON).await;
                record_stream_session("init_failed");
                return failed(None);
            }
        };

        let agent = match self.directory.runtime().connect_live(user, &session_id).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(user, session_id = %session_id, error = %e, "agent live endpoint unreachable");
                close_with_error(&mut client, AGENT_UNREACHABLE_REASON).await;
                record_stream_session("agent_unreachable");
                return failed(Some(session_id));
            }
        };
        enter(&mut state, ProxyState::Bridging, &session_id);

        let (agent_tx, agent_rx) = agent.split();
        let agent_tx: AgentSink = Arc::new(Mutex::new(agent_tx));
        let (client_tx, client_rx) = client.split();
        let client_tx: ClientSink = Arc::new(Mutex::new(client_tx));

        let cancel = CancellationToken::new();
        let bridge = self.start_bridge(user, agent_tx.clone(), cancel.clone()).await;
        let bridged = bridge.is_some();

        let mut to_agent: JoinHandle<LegExit> =
            tokio::spawn(relay_client_to_agent(client_rx, agent_tx.clone()));
        let mut to_client: JoinHandle<LegExit> =
            tokio::spawn(relay_agent_to_client(agent_rx, client_tx.clone()));

        let (leg, exit) = tokio::select! {
            r = &mut to_agent => (Leg::ClientToAgent, leg_result(r)),
            r = &mut to_client => (Leg::AgentToClient, leg_result(r)),
        };
        info!(user, session_id = %session_id, leg = ?leg, exit = ?exit, "relay finished first");
        enter(&mut state, ProxyState::Draining, &session_id);

        let remaining = match leg {
            Leg::ClientToAgent => &mut to_client,
            Leg::AgentToClient => &mut to_agent,
        };
        let drained = tokio::time::timeout(self.drain_timeout, &mut *remaining).await;
        match drained {
            Ok(r) => debug!(session_id = %session_id, exit = ?leg_result(r), "second relay finished"),
            Err(_) => {
                warn!(session_id = %session_id, "relay did not drain in time, aborting");
                remaining.abort();
            }
        }

        cancel.cancel();
        if let Some(bridge) = bridge {
            if let Ok(exit) = bridge.await {
                debug!(session_id = %session_id, exit = ?exit, "event bridge stopped");
            }
        }
        let _ = agent_tx.lock().await.close().await;
        let _ = client_tx.lock().await.close().await;

        let reached = state;
        enter(&mut state, ProxyState::Closed, &session_id);
        record_stream_session("completed");
        ProxyOutcome {
            session_id: Some(session_id),
            reached,
            first_exit: Some((leg, exit)),
            bridged,
        }
    }

    async fn start_bridge(
        &self,
        user: &str,
        agent: AgentSink,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<BridgeExit>> {
        let events = self.events.as_ref()?;
        match events.connect_events(user).await {
            Ok(mut stream) => Some(tokio::spawn(async move {
                let exit = run_bridge(&mut stream, agent, cancel).await;
                let _ = stream.close(None).await;
                exit
            })),
            Err(e) => {
                warn!(user, error = %e, "event stream unavailable, continuing without it");
                None
            }
        }
    }
}

fn enter(state: &mut ProxyState, next: ProxyState, session_id: &str) {
    debug!(session_id, from = ?*state, to = ?next, "stream state");
    *state = next;
}

fn leg_result(result: Result<LegExit, JoinError>) -> LegExit {
    result.unwrap_or(LegExit::Aborted)
}

async fn close_with_error(client: &mut WebSocket, reason: &'static str) {
    let _ = send_error_close(client, reason).await;
}

async fn send_error_close<K>(client: &mut K, reason: &'static str) -> Result<(), GatewayError>
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: Utf8Bytes::from_static(reason),
    };
    client.send(Message::Close(Some(frame))).await.map_err(|e| {
        debug!(error = %e, "client gone before close frame");
        GatewayError::ClientDisconnected
    })
}

/// Browser frames go to the agent verbatim. The agent is told to close on
/// every exit except a failed write to it.
async fn relay_client_to_agent(
    mut client: futures_util::stream::SplitStream<WebSocket>,
    agent: AgentSink,
) -> LegExit {
    let exit = loop {
        let forward = match client.next().await {
            None | Some(Ok(Message::Close(_))) => break LegExit::PeerClosed,
            Some(Err(e)) => {
                debug!(error = %e, "client read failed");
                break LegExit::ReadFailed;
            }
            Some(Ok(Message::Text(text))) => UpstreamMessage::Text(text.to_string().into()),
            Some(Ok(Message::Binary(data))) => UpstreamMessage::Binary(data),
            // Control frames are answered per hop.
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
        };
        if let Err(e) = agent.lock().await.send(forward).await {
            debug!(error = %e, "agent write failed");
            break LegExit::WriteFailed;
        }
    };
    if exit != LegExit::WriteFailed {
        let _ = agent.lock().await.send(UpstreamMessage::Close(None)).await;
    }
    exit
}

/// Agent frames go to the browser. The browser always gets a close frame
/// attempt when this leg ends, whatever the cause.
async fn relay_agent_to_client<S, E, K>(mut agent: S, client: Arc<Mutex<K>>) -> LegExit
where
    S: Stream<Item = Result<UpstreamMessage, E>> + Unpin,
    E: Display,
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    let exit = loop {
        let forward = match agent.next().await {
            None | Some(Ok(UpstreamMessage::Close(_))) => break LegExit::PeerClosed,
            Some(Err(e)) => {
                debug!(error = %e, "agent read failed");
                break LegExit::ReadFailed;
            }
            Some(Ok(UpstreamMessage::Text(text))) => Message::Text(text.to_string().into()),
            Some(Ok(UpstreamMessage::Binary(data))) => Message::Binary(data),
            Some(Ok(_)) => continue,
        };
        if let Err(e) = client.lock().await.send(forward).await {
            debug!(error = %e, "client write failed");
            break LegExit::WriteFailed;
        }
    };
    let _ = client.lock().await.send(Message::Close(None)).await;
    exit
}
