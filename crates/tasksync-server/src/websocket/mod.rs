//! WebSocket gateway: per-connection sessions, snapshot request handling,
//! and the per-session feed subscription.

pub mod handler;
pub mod session;
pub mod subscription;

pub use session::run_session;
pub use subscription::Subscription;
