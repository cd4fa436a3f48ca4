//! Exchange collaborator seams: sessions, raw payloads, normalized reads.

mod reader;
mod rest;
mod session;
mod types;

pub use reader::AccountReader;
pub use rest::RestSessionProvider;
pub use session::{
    ExchangeSession, OrderExecutor, RecordedClose, RecordingExecutor, SessionProvider,
};
pub use types::*;
