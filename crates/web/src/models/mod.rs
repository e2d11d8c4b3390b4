//! Session-held types.

pub mod session;

pub use session::{Flash, FlashKind, keys as session_keys};
