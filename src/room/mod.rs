//! The room: state machine, vote subsystems, and the actor that ties them
//! together (spec §3-§5).

pub mod actor;
pub mod clock;
pub mod engine;
pub mod rules;
pub mod session;
pub mod state;
pub mod timer;
pub mod votes;

pub use actor::{Emit, Recipient, RoomActor, RoomHandle};
