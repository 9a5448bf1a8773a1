//! Room membership and fan-out for Talkwire.
//!
//! The [`RoomBroadcaster`] is the only component that reads or writes
//! room member sets. Rooms are created implicitly on first join and
//! deleted the moment their last member leaves — a room exists if and
//! only if its member set is non-empty.
//!
//! # Key types
//!
//! - [`RoomBroadcaster`] — member sets, join/leave, broadcast fan-out
//! - [`RoomError`] — what can go wrong joining
//!
//! Membership-affecting methods take `&mut ConnectionRegistry` so the
//! member set and the record's room pointer mutate as one unit under the
//! caller's lock. The fan-out list is recomputed fresh on every call —
//! there is no cached subscriber list that can go stale.

mod broadcaster;
mod error;

pub use broadcaster::RoomBroadcaster;
pub use error::RoomError;
