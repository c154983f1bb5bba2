//! Exportable session snapshot.

use super::id::SessionId;
use super::message::Message;
use crate::analytics::Analytics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A consistent snapshot of one session: history and analytics read under
/// the same coordinator lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTranscript {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub analytics: Analytics,
    pub exported_at: DateTime<Utc>,
}
