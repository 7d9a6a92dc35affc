use crate::domain::models::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "attempt", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    ConnectionError,
    Reconnecting(u32),
}

impl ConnectionStatus {
    pub fn label(&self) -> String {
        match self {
            ConnectionStatus::Connecting => "Connecting...".to_string(),
            ConnectionStatus::Connected => "Connected".to_string(),
            ConnectionStatus::Disconnected => "Disconnected".to_string(),
            ConnectionStatus::ConnectionError => "Connection Error".to_string(),
            ConnectionStatus::Reconnecting(attempt) => format!("Reconnecting ({attempt})..."),
        }
    }

    pub fn is_live(&self) -> bool {
        *self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionStatus,
    closed: bool,
}

impl ConnectionMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionStatus::Connecting,
            closed: false,
        }
    }

    pub fn state(&self) -> ConnectionStatus {
        self.state
    }

    pub fn connect(&mut self) -> Result<(), AppError> {
        self.transition(ConnectionStatus::Connected)
    }

    pub fn disconnect(&mut self) -> Result<(), AppError> {
        self.transition(ConnectionStatus::Disconnected)
    }

    pub fn connect_error(&mut self) -> Result<(), AppError> {
        self.transition(ConnectionStatus::ConnectionError)
    }

    pub fn reconnecting(&mut self, attempt: u32) -> Result<(), AppError> {
        self.transition(ConnectionStatus::Reconnecting(attempt))
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    fn transition(&mut self, next: ConnectionStatus) -> Result<(), AppError> {
        if self.closed {
            return Err(AppError::new(
                "CONNECTION_CLOSED",
                format!("tracking session closed, ignoring transition to {next}"),
                None,
            ));
        }
        self.state = next;
        Ok(())
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new()
    }
}
