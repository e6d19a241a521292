pub mod controller;
pub mod protocol;
pub mod store;
pub mod ws_store;

pub use controller::{InputEvent, MoveOutcome, SyncController};
pub use store::{MemoryStore, PropertyChange, PropertyStore, Scope, SpaceState};
pub use ws_store::WsPropertyStore;
