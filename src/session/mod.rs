//! Session management
//!
//! Sessions live in a [`SessionStore`] shared between the HTTP gateway and
//! the background reaper. Each session owns one conversation, serialized by
//! its own lock.

pub mod reaper;
pub mod session;
pub mod store;

pub use reaper::spawn_reaper;
pub use session::Session;
pub use store::SessionStore;
