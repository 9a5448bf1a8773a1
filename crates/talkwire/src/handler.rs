//! Per-connection handler: event dispatch and disconnect teardown.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task draining its outbound queue. The flow is:
//!   1. Register the connection (Unauthenticated, no room)
//!   2. Loop: receive frames → decode → dispatch through the state machine
//!   3. On close or transport error: tear down registry + room state
//!
//! Every reply and broadcast goes through the destination's unbounded
//! channel, so all frames for one connection stay FIFO and no send ever
//! blocks on a slow peer.

use std::sync::Arc;

use talkwire_protocol::{
    decode_frame, encode_event, new_message_id, now_iso8601, ClientEvent,
    InboundFrame, RoomId, ServerEvent,
};
use talkwire_registry::{ConnectionSender, CredentialStore};
use talkwire_room::RoomError;
use talkwire_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::{RelayState, ServerState};
use crate::TalkwireError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A: CredentialStore>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A>>,
) -> Result<(), TalkwireError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    {
        let mut relay = state.relay.lock().await;
        relay.registry.register(conn_id, tx.clone())?;
    }

    // Writer task: drains the outbound queue while the reader below is
    // parked in recv(). Exits when every sender is dropped (teardown
    // removes the registry's clone, we drop ours) or a write fails.
    let conn = Arc::new(conn);
    let writer_conn = Arc::clone(&conn);
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = writer_conn.send(&frame).await {
                tracing::debug!(error = %e, "writer stopped");
                break;
            }
        }
    });

    // Read loop. Dispatch errors are remembered, not propagated, so
    // teardown always runs before the handler returns.
    let mut result = Ok(());
    loop {
        match conn.recv().await {
            Ok(Some(data)) => match decode_frame(&data) {
                Ok(InboundFrame::Event(event)) => {
                    if let Err(e) =
                        dispatch_event(conn_id, event, &tx, &state).await
                    {
                        result = Err(e);
                        break;
                    }
                }
                Ok(InboundFrame::Unknown(kind)) => {
                    tracing::debug!(%conn_id, kind, "ignoring unknown event type");
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "malformed frame");
                    send_event(
                        &tx,
                        &ServerEvent::Error {
                            message: "Invalid message format".into(),
                        },
                    )?;
                }
            },
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    teardown(conn_id, &state).await?;

    // Let the writer flush whatever was queued before teardown, then
    // close the socket.
    drop(tx);
    let _ = writer.await;
    let _ = conn.close().await;

    result
}

/// Routes one decoded client event through the protocol state machine.
///
/// Authentication and room membership are gates, not implicit side
/// effects — every mutating event re-checks both, because events can
/// arrive in any order relative to disconnects and re-joins.
async fn dispatch_event<A: CredentialStore>(
    conn_id: ConnectionId,
    event: ClientEvent,
    reply: &ConnectionSender,
    state: &Arc<ServerState<A>>,
) -> Result<(), TalkwireError> {
    match event {
        ClientEvent::Auth { token } => {
            handle_auth(conn_id, &token, reply, state).await?;
        }
        ClientEvent::Join { room_id } => {
            handle_join(conn_id, room_id, reply, state).await?;
        }
        ClientEvent::Message { text } => {
            handle_message(conn_id, text, reply, state).await?;
        }
        ClientEvent::Typing { is_typing } => {
            handle_typing(conn_id, is_typing, state).await?;
        }
        ClientEvent::Ping => {
            send_event(reply, &ServerEvent::Pong {})?;
        }
    }
    Ok(())
}

/// `auth`: verify the token against the credential store and attach the
/// identity. Failure is reported to the client, not fatal — the
/// connection stays open and may retry.
async fn handle_auth<A: CredentialStore>(
    conn_id: ConnectionId,
    token: &str,
    reply: &ConnectionSender,
    state: &Arc<ServerState<A>>,
) -> Result<(), TalkwireError> {
    // Verify outside the relay lock; the store may do I/O.
    match state.auth.verify(token).await {
        Ok(identity) => {
            let user = identity.summary();
            {
                let mut relay = state.relay.lock().await;
                if relay.registry.authenticate(conn_id, identity).is_err() {
                    // Disconnect raced the verification; nothing to do.
                    return Ok(());
                }
            }
            send_event(reply, &ServerEvent::AuthSuccess { user })?;
        }
        Err(e) => {
            tracing::info!(%conn_id, error = %e, "authentication failed");
            send_event(
                reply,
                &ServerEvent::AuthError {
                    message: e.to_string(),
                },
            )?;
        }
    }
    Ok(())
}

/// `join`: gated on authentication. If the connection is already in a
/// room it leaves that room first (with departure broadcasts), then
/// joins the new one — join itself never implicitly leaves.
async fn handle_join<A: CredentialStore>(
    conn_id: ConnectionId,
    room_id: RoomId,
    reply: &ConnectionSender,
    state: &Arc<ServerState<A>>,
) -> Result<(), TalkwireError> {
    let mut guard = state.relay.lock().await;
    let RelayState { registry, rooms } = &mut *guard;

    let Some(record) = registry.get(conn_id) else {
        return Ok(());
    };
    if !record.is_authenticated() {
        drop(guard);
        return send_event(
            reply,
            &ServerEvent::Error {
                message: "Please authenticate first".into(),
            },
        );
    }
    let Some(user) = record.user_summary() else {
        return Ok(());
    };

    if let Some(old_room) = rooms.leave(registry, conn_id) {
        let left = encode_event(&ServerEvent::UserLeft {
            user: user.clone(),
            timestamp: now_iso8601(),
        })?;
        rooms.broadcast(registry, &old_room, &left, None);
        let roster = encode_event(&ServerEvent::RoomUsers {
            users: rooms.snapshot_users(registry, &old_room),
        })?;
        rooms.broadcast(registry, &old_room, &roster, None);
    }

    if let Err(e) = rooms.join(registry, conn_id, room_id.clone()) {
        match e {
            // Only reachable if the record vanished mid-event.
            RoomError::UnknownConnection(_) => return Ok(()),
            other => return Err(other.into()),
        }
    }

    // Welcome to the joiner, the announcement to everyone else, then a
    // fresh roster to the whole room including the joiner.
    send_event(
        reply,
        &ServerEvent::Welcome {
            message: format!("Welcome to room {room_id}!"),
            room_id: room_id.clone(),
        },
    )?;
    let joined = encode_event(&ServerEvent::UserJoined {
        user,
        timestamp: now_iso8601(),
    })?;
    rooms.broadcast(registry, &room_id, &joined, Some(conn_id));
    let roster = encode_event(&ServerEvent::RoomUsers {
        users: rooms.snapshot_users(registry, &room_id),
    })?;
    rooms.broadcast(registry, &room_id, &roster, None);
    Ok(())
}

/// `message`: gated on authentication AND room membership. Stamps a
/// fresh id and server timestamp, then fans out to the whole room,
/// sender included.
async fn handle_message<A: CredentialStore>(
    conn_id: ConnectionId,
    text: String,
    reply: &ConnectionSender,
    state: &Arc<ServerState<A>>,
) -> Result<(), TalkwireError> {
    let guard = state.relay.lock().await;
    let RelayState { registry, rooms } = &*guard;

    let Some(record) = registry.get(conn_id) else {
        return Ok(());
    };
    if !record.is_authenticated() {
        drop(guard);
        return send_event(
            reply,
            &ServerEvent::Error {
                message: "Please authenticate first".into(),
            },
        );
    }
    let (Some(room_id), Some(user)) =
        (record.room.clone(), record.user_summary())
    else {
        drop(guard);
        return send_event(
            reply,
            &ServerEvent::Error {
                message: "Please join a room first".into(),
            },
        );
    };

    let frame = encode_event(&ServerEvent::Message {
        id: new_message_id(),
        text,
        user,
        timestamp: now_iso8601(),
        room_id: room_id.clone(),
    })?;
    let delivered = rooms.broadcast(registry, &room_id, &frame, None);
    tracing::debug!(%conn_id, %room_id, delivered, "message relayed");
    Ok(())
}

/// `typing`: fans the indicator out to everyone in the room but the
/// typist. Deliberately permissive — no auth check beyond needing an
/// identity to name the typist, and a connection with no room is a
/// silent no-op, not an error.
async fn handle_typing<A: CredentialStore>(
    conn_id: ConnectionId,
    is_typing: bool,
    state: &Arc<ServerState<A>>,
) -> Result<(), TalkwireError> {
    let guard = state.relay.lock().await;
    let RelayState { registry, rooms } = &*guard;

    let Some(record) = registry.get(conn_id) else {
        return Ok(());
    };
    let (Some(room_id), Some(identity)) =
        (record.room.as_ref(), record.identity.as_ref())
    else {
        return Ok(());
    };

    let frame = encode_event(&ServerEvent::Typing {
        user_id: identity.user_id.clone(),
        user_name: identity.display_name.clone(),
        is_typing,
    })?;
    rooms.broadcast(registry, room_id, &frame, Some(conn_id));
    Ok(())
}

/// Disconnect teardown: remove the registry record, evict from the room
/// found on it, and announce the departure to the survivors.
///
/// Idempotent — a second teardown for the same id finds no record and
/// does nothing. The eviction uses the room id carried on the removed
/// record, so it stays safe even though the record is already gone.
async fn teardown<A: CredentialStore>(
    conn_id: ConnectionId,
    state: &Arc<ServerState<A>>,
) -> Result<(), TalkwireError> {
    let mut guard = state.relay.lock().await;
    let RelayState { registry, rooms } = &mut *guard;

    let Some(record) = registry.remove(conn_id) else {
        return Ok(());
    };

    if let Some(ref room_id) = record.room {
        let deleted = rooms.evict(conn_id, room_id);
        if !deleted {
            if let Some(user) = record.user_summary() {
                let left = encode_event(&ServerEvent::UserLeft {
                    user,
                    timestamp: now_iso8601(),
                })?;
                rooms.broadcast(registry, room_id, &left, None);
            }
            let roster = encode_event(&ServerEvent::RoomUsers {
                users: rooms.snapshot_users(registry, room_id),
            })?;
            rooms.broadcast(registry, room_id, &roster, None);
        }
    }

    tracing::info!(%conn_id, "connection torn down");
    Ok(())
}

/// Encodes an event and queues it on one connection's outbound channel.
///
/// A closed channel means the peer's writer task is gone; its own
/// disconnect event does the cleanup, so the failed send is dropped.
fn send_event(
    sender: &ConnectionSender,
    event: &ServerEvent,
) -> Result<(), TalkwireError> {
    let frame = encode_event(event)?;
    let _ = sender.send(frame);
    Ok(())
}
