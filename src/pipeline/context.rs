//! Session context.
//!
//! One passenger chat or staff console session. Supplies the actor recorded
//! in audit entries and the op id carried by every log line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::engine::{PASSENGER_ACTOR, SYSTEM_ACTOR};
use crate::logging::structured::LogContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Passenger,
    Staff,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub channel: Channel,
    pub actor: String,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(channel: Channel, actor: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: format!("sess-{}", &Uuid::new_v4().to_string()[..8]),
            channel,
            actor: actor.trim().to_string(),
            started_at,
        }
    }

    pub fn passenger(started_at: DateTime<Utc>) -> Self {
        Self::new(Channel::Passenger, PASSENGER_ACTOR, started_at)
    }

    /// Staff session for the given employee id or display name.
    pub fn staff(actor: &str, started_at: DateTime<Utc>) -> Self {
        Self::new(Channel::Staff, actor, started_at)
    }

    pub fn system(started_at: DateTime<Utc>) -> Self {
        Self::new(Channel::System, SYSTEM_ACTOR, started_at)
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.session_id)
    }
}
