//! Game simulation modules

pub mod combat;
pub mod events;
pub mod registry;
pub mod scaling;
pub mod session;
pub mod snapshot;
pub mod units;

pub use registry::SessionRegistry;
pub use session::{GameSession, GameSettings, SessionError};
pub use snapshot::SessionSnapshot;
