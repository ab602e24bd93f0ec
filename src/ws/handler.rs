//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use glam::DVec3;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::persist::encode_entity;
use crate::game::{BlockPos, Entity, Player, World};
use crate::game::world::Viewer;
use crate::session::{Session, SELF_RUNTIME_ID};
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound messages queued per session before state updates are dropped
const OUTBOUND_CAPACITY: usize = 256;

const SPAWN_POS: DVec3 = DVec3::new(0.5, 64.0, 0.5);

type WsSink = futures::stream::SplitSink<WebSocket, Message>;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

/// Forwards entity state changes to one connected client
struct SessionViewer {
    session_id: Uuid,
    tx: mpsc::Sender<ServerMsg>,
}

impl Viewer for SessionViewer {
    fn view_entity_state(&self, entity: &dyn Entity) {
        let data = match encode_entity(entity) {
            Ok(data) => data,
            Err(e) => {
                trace!(entity_id = %entity.id(), error = %e, "Entity state not shown");
                return;
            }
        };
        let msg = ServerMsg::EntityState {
            entity_id: entity.id().0,
            name: entity.entity_type().encode_entity().to_string(),
            data,
        };
        // Called from the tick path, so never wait on a slow client
        if self.tx.try_send(msg).is_err() {
            debug!(session_id = %self.session_id, "Outbound queue full, state update dropped");
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, session_id: Uuid, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    let world: Arc<dyn World> = state.world.clone();
    let name = format!("Player_{}", &session_id.to_string()[..8]);
    let player = Arc::new(Player::new(name, SPAWN_POS, &world));
    state.world.add_entity(player.clone());
    state.sessions.insert(session_id, player.id());

    info!(session_id = %session_id, entity_id = %player.id(), name = player.name(), "New WebSocket connection");

    let welcome = ServerMsg::Welcome {
        runtime_id: SELF_RUNTIME_ID,
        entity_id: player.id().0,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(session_id = %session_id, error = %e, "Failed to send welcome");
    } else {
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        state.world.add_viewer(
            session_id,
            Arc::new(SessionViewer {
                session_id,
                tx: out_tx.clone(),
            }),
        );

        run_session(
            session_id,
            &state,
            player.clone(),
            ws_sink,
            ws_stream,
            out_tx,
            out_rx,
        )
        .await;

        state.world.remove_viewer(&session_id);
    }

    // Cleanup on disconnect
    player.close(world.as_ref());
    state.sessions.remove(&session_id);

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session_id: Uuid,
    state: &AppState,
    player: Arc<Player>,
    mut ws_sink: WsSink,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    out_tx: mpsc::Sender<ServerMsg>,
    mut out_rx: mpsc::Receiver<ServerMsg>,
) {
    let rate_limiter = SessionRateLimiter::new(state.config.action_rate_limit);
    let mut events_rx = state.world.subscribe();
    let mut session = Session::new(player);

    // Spawn writer task: session queue and world events -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                queued = out_rx.recv() => match queued {
                    Some(msg) => msg,
                    None => break,
                },
                event = events_rx.recv() => match event {
                    Ok(event) => ServerMsg::from(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(session_id = %session_id, lagged_count = n, "Client lagged, skipping world events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(session_id = %session_id, "World event channel closed");
                        break;
                    }
                },
            };
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> dispatcher
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(ClientMsg::PlayerAction {
                    action,
                    face,
                    pos,
                    entity_runtime_id,
                }) => {
                    if !rate_limiter.check_action() {
                        warn!(session_id = %session_id, "Rate limited player action");
                        continue;
                    }
                    let result = session.handle_player_action(
                        action,
                        face,
                        BlockPos::from(pos),
                        entity_runtime_id,
                    );
                    if let Err(e) = result {
                        warn!(session_id = %session_id, action, error = %e, "Player action rejected");
                        let rejected = ServerMsg::ActionRejected {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        };
                        if out_tx.send(rejected).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(ClientMsg::Ping { t }) => {
                    let pong = ServerMsg::Pong {
                        t,
                        server_time: unix_millis(),
                    };
                    if out_tx.send(pong).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                    let reply = ServerMsg::Error {
                        code: "bad_message".to_string(),
                        message: e.to_string(),
                    };
                    if out_tx.send(reply).await.is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
