//! Integration tests for room membership and fan-out, driving the
//! broadcaster and registry together the way the relay does: both
//! structures mutated back-to-back as one unit.

use talkwire_protocol::{Identity, RoomId, UserId};
use talkwire_registry::{ConnectionRegistry, ConnectionSender};
use talkwire_room::{RoomBroadcaster, RoomError};
use talkwire_transport::ConnectionId;
use tokio::sync::mpsc::UnboundedReceiver;

// =========================================================================
// Helpers
// =========================================================================

fn cid(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

fn room(id: &str) -> RoomId {
    RoomId::new(id)
}

fn identity(user: &str) -> Identity {
    Identity {
        user_id: UserId::new(user),
        display_name: user.to_string(),
        avatar: None,
        email: format!("{user}@example.com"),
        verified: true,
    }
}

fn channel() -> (ConnectionSender, UnboundedReceiver<Vec<u8>>) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Registers and authenticates a connection, returning its outbound
/// receiver so tests can observe what it was sent.
fn connect_user(
    registry: &mut ConnectionRegistry,
    id: u64,
    user: &str,
) -> UnboundedReceiver<Vec<u8>> {
    let (tx, rx) = channel();
    registry.register(cid(id), tx).expect("register");
    registry.authenticate(cid(id), identity(user)).expect("auth");
    rx
}

fn drain(rx: &mut UnboundedReceiver<Vec<u8>>) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

// =========================================================================
// join()
// =========================================================================

#[test]
fn test_join_first_member_creates_room() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx = connect_user(&mut registry, 1, "alice");

    assert_eq!(rooms.room_count(), 0);
    rooms
        .join(&mut registry, cid(1), room("general"))
        .expect("join should succeed");

    assert_eq!(rooms.room_count(), 1);
    assert_eq!(rooms.room_size(&room("general")), 1);
    assert!(rooms.is_member(&room("general"), cid(1)));
}

#[test]
fn test_join_keeps_registry_pointer_consistent() {
    // Invariant: member-set entry iff the record points at that room.
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx = connect_user(&mut registry, 1, "alice");

    rooms.join(&mut registry, cid(1), room("general")).unwrap();

    assert_eq!(
        registry.get(cid(1)).unwrap().room,
        Some(room("general"))
    );
}

#[test]
fn test_join_while_in_room_returns_error_and_mutates_nothing() {
    // Join never implicitly leaves — the caller leaves first.
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx = connect_user(&mut registry, 1, "alice");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();

    let result = rooms.join(&mut registry, cid(1), room("random"));

    assert!(matches!(
        result,
        Err(RoomError::AlreadyInRoom(c, r)) if c == cid(1) && r == room("general")
    ));
    // Old membership is untouched, new room was never created.
    assert!(rooms.is_member(&room("general"), cid(1)));
    assert_eq!(rooms.room_count(), 1);
    assert_eq!(registry.get(cid(1)).unwrap().room, Some(room("general")));
}

#[test]
fn test_join_unknown_connection_returns_error() {
    // Disconnect raced the join — no room may be created for a ghost.
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();

    let result = rooms.join(&mut registry, cid(9), room("general"));

    assert!(matches!(result, Err(RoomError::UnknownConnection(_))));
    assert_eq!(rooms.room_count(), 0);
}

// =========================================================================
// leave()
// =========================================================================

#[test]
fn test_leave_removes_membership_and_clears_pointer() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx_a = connect_user(&mut registry, 1, "alice");
    let _rx_b = connect_user(&mut registry, 2, "bob");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    rooms.join(&mut registry, cid(2), room("general")).unwrap();

    let left = rooms.leave(&mut registry, cid(1));

    assert_eq!(left, Some(room("general")));
    assert!(!rooms.is_member(&room("general"), cid(1)));
    assert!(registry.get(cid(1)).unwrap().room.is_none());
    // The other member is unaffected.
    assert!(rooms.is_member(&room("general"), cid(2)));
    assert_eq!(rooms.room_count(), 1);
}

#[test]
fn test_leave_last_member_deletes_room() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx = connect_user(&mut registry, 1, "alice");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    assert_eq!(rooms.room_count(), 1);

    rooms.leave(&mut registry, cid(1));

    // Room exists iff its member set is non-empty.
    assert_eq!(rooms.room_count(), 0);
    assert_eq!(rooms.room_size(&room("general")), 0);
}

#[test]
fn test_leave_without_room_is_noop() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx = connect_user(&mut registry, 1, "alice");

    assert_eq!(rooms.leave(&mut registry, cid(1)), None);
}

#[test]
fn test_leave_twice_is_idempotent() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx = connect_user(&mut registry, 1, "alice");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();

    assert_eq!(rooms.leave(&mut registry, cid(1)), Some(room("general")));
    assert_eq!(rooms.leave(&mut registry, cid(1)), None);
    assert_eq!(rooms.room_count(), 0);
}

#[test]
fn test_rejoin_after_leave_succeeds() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx = connect_user(&mut registry, 1, "alice");

    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    rooms.leave(&mut registry, cid(1));
    rooms
        .join(&mut registry, cid(1), room("random"))
        .expect("rejoin should succeed");

    // At most one room per connection, and it's the new one.
    assert!(!rooms.is_member(&room("general"), cid(1)));
    assert!(rooms.is_member(&room("random"), cid(1)));
    assert_eq!(registry.get(cid(1)).unwrap().room, Some(room("random")));
}

// =========================================================================
// evict() — teardown path
// =========================================================================

#[test]
fn test_evict_after_registry_remove_is_safe() {
    // Disconnect teardown removes the record first, then evicts using
    // the room found on the removed record.
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx_a = connect_user(&mut registry, 1, "alice");
    let _rx_b = connect_user(&mut registry, 2, "bob");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    rooms.join(&mut registry, cid(2), room("general")).unwrap();

    let record = registry.remove(cid(1)).expect("should remove");
    let room_id = record.room.expect("record should carry its room");

    let deleted = rooms.evict(cid(1), &room_id);

    assert!(!deleted, "bob is still in the room");
    assert!(!rooms.is_member(&room_id, cid(1)));
    assert_eq!(rooms.room_size(&room_id), 1);
}

#[test]
fn test_evict_last_member_reports_room_deleted() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx = connect_user(&mut registry, 1, "alice");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();

    registry.remove(cid(1));
    let deleted = rooms.evict(cid(1), &room("general"));

    assert!(deleted);
    assert_eq!(rooms.room_count(), 0);
}

#[test]
fn test_evict_unknown_room_is_noop() {
    let mut rooms = RoomBroadcaster::new();
    assert!(!rooms.evict(cid(1), &room("nowhere")));
}

// =========================================================================
// broadcast()
// =========================================================================

#[test]
fn test_broadcast_delivers_to_every_member() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let mut rx_a = connect_user(&mut registry, 1, "alice");
    let mut rx_b = connect_user(&mut registry, 2, "bob");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    rooms.join(&mut registry, cid(2), room("general")).unwrap();

    let delivered =
        rooms.broadcast(&registry, &room("general"), b"hello", None);

    assert_eq!(delivered, 2);
    assert_eq!(drain(&mut rx_a), vec![b"hello".to_vec()]);
    assert_eq!(drain(&mut rx_b), vec![b"hello".to_vec()]);
}

#[test]
fn test_broadcast_exclude_skips_exactly_one_member() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let mut rx_a = connect_user(&mut registry, 1, "alice");
    let mut rx_b = connect_user(&mut registry, 2, "bob");
    let mut rx_c = connect_user(&mut registry, 3, "carol");
    for id in 1..=3 {
        rooms.join(&mut registry, cid(id), room("general")).unwrap();
    }

    let delivered =
        rooms.broadcast(&registry, &room("general"), b"typing", Some(cid(2)));

    // Exactly roomSize - 1 recipients.
    assert_eq!(delivered, rooms.room_size(&room("general")) - 1);
    assert_eq!(drain(&mut rx_a).len(), 1);
    assert_eq!(drain(&mut rx_b).len(), 0, "excluded member got a frame");
    assert_eq!(drain(&mut rx_c).len(), 1);
}

#[test]
fn test_broadcast_excluding_non_member_delivers_to_all() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx_a = connect_user(&mut registry, 1, "alice");
    let _rx_b = connect_user(&mut registry, 2, "bob");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    rooms.join(&mut registry, cid(2), room("general")).unwrap();

    let delivered =
        rooms.broadcast(&registry, &room("general"), b"x", Some(cid(99)));

    assert_eq!(delivered, 2);
}

#[test]
fn test_broadcast_skips_member_with_closed_writer() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let rx_a = connect_user(&mut registry, 1, "alice");
    let mut rx_b = connect_user(&mut registry, 2, "bob");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    rooms.join(&mut registry, cid(2), room("general")).unwrap();

    // Alice's writer task is gone, but her disconnect hasn't been
    // processed yet. The broadcast must not fail or evict her.
    drop(rx_a);

    let delivered =
        rooms.broadcast(&registry, &room("general"), b"hi", None);

    assert_eq!(delivered, 1);
    assert_eq!(drain(&mut rx_b).len(), 1);
    assert!(
        rooms.is_member(&room("general"), cid(1)),
        "broadcast must not evict a stalled member"
    );
}

#[test]
fn test_broadcast_to_unknown_room_delivers_nothing() {
    let registry = ConnectionRegistry::new();
    let rooms = RoomBroadcaster::new();
    assert_eq!(rooms.broadcast(&registry, &room("ghost"), b"x", None), 0);
}

// =========================================================================
// snapshot_users()
// =========================================================================

#[test]
fn test_snapshot_users_resolves_members_in_order() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx_a = connect_user(&mut registry, 1, "alice");
    let _rx_b = connect_user(&mut registry, 2, "bob");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    rooms.join(&mut registry, cid(2), room("general")).unwrap();

    let users = rooms.snapshot_users(&registry, &room("general"));

    let names: Vec<&str> =
        users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob"]);
}

#[test]
fn test_snapshot_users_skips_vanished_member() {
    // A member whose registry record is gone mid-teardown is skipped,
    // not an error.
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rx_a = connect_user(&mut registry, 1, "alice");
    let _rx_b = connect_user(&mut registry, 2, "bob");
    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    rooms.join(&mut registry, cid(2), room("general")).unwrap();

    registry.remove(cid(1));

    let users = rooms.snapshot_users(&registry, &room("general"));
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "bob");
}

#[test]
fn test_snapshot_users_unknown_room_is_empty() {
    let registry = ConnectionRegistry::new();
    let rooms = RoomBroadcaster::new();
    assert!(rooms.snapshot_users(&registry, &room("ghost")).is_empty());
}

// =========================================================================
// Invariant sweep over a whole join/leave sequence
// =========================================================================

#[test]
fn test_membership_invariants_hold_across_sequence() {
    let mut registry = ConnectionRegistry::new();
    let mut rooms = RoomBroadcaster::new();
    let _rxs: Vec<_> = (1..=3)
        .map(|id| connect_user(&mut registry, id, &format!("user{id}")))
        .collect();

    let check = |registry: &ConnectionRegistry,
                 rooms: &RoomBroadcaster,
                 ids: &[u64]| {
        for &id in ids {
            let record = registry.get(cid(id)).expect("record exists");
            let all_rooms = [room("general"), room("random")];
            let member_of: Vec<&RoomId> = all_rooms
                .iter()
                .filter(|r| rooms.is_member(r, cid(id)))
                .collect();
            // At most one room, and exactly the one on the record.
            assert!(member_of.len() <= 1);
            assert_eq!(record.room.as_ref(), member_of.first().copied());
        }
    };

    rooms.join(&mut registry, cid(1), room("general")).unwrap();
    check(&registry, &rooms, &[1, 2, 3]);

    rooms.join(&mut registry, cid(2), room("general")).unwrap();
    rooms.join(&mut registry, cid(3), room("random")).unwrap();
    check(&registry, &rooms, &[1, 2, 3]);

    rooms.leave(&mut registry, cid(1));
    check(&registry, &rooms, &[1, 2, 3]);

    rooms.join(&mut registry, cid(1), room("random")).unwrap();
    check(&registry, &rooms, &[1, 2, 3]);

    rooms.leave(&mut registry, cid(2));
    assert_eq!(rooms.room_count(), 1, "general emptied and was deleted");
    check(&registry, &rooms, &[1, 2, 3]);
}
