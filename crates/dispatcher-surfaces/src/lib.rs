//! Normalises inbound events from any user-facing surface into a canonical
//! shape, and routes outbound sends back to the right surface adapter.

pub mod error;
pub mod inbound;
pub mod manager;
pub mod rest;
pub mod surface;
pub mod types;

pub use error::{Result, SurfaceError};
pub use inbound::normalize_user_event;
pub use manager::SurfaceManager;
pub use rest::RestUserSurface;
pub use surface::UserSurface;
pub use types::{ActionChoice, InboundUserEvent, UserEventPayload};
