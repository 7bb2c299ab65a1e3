//! Real-time notifications over the backend's Phoenix WebSocket.
//!
//! [`RealtimeConnector`] and [`RealtimeChannel`] keep the socket behind a text-frame
//! interface; [`NotificationListener`] joins the release topic and re-runs the
//! update check for every `new_update` notification.

mod listener;
mod socket;

use std::future::Future;

pub use listener::{ListenSummary, NotificationListener};
pub use socket::TungsteniteConnector;

use crate::errors::AppError;

/// An open real-time connection, reduced to text frames.
pub trait RealtimeChannel {
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Next inbound text frame. `None` once the peer closed the connection.
    ///
    /// Must be cancel safe: the listener races it against the heartbeat timer.
    fn next_text(&mut self) -> impl Future<Output = Option<Result<String, AppError>>> + Send;
}

/// Opens real-time connections.
pub trait RealtimeConnector {
    type Channel: RealtimeChannel + Send;

    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Channel, AppError>> + Send;
}
