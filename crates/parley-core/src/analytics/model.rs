//! Analytics domain model.

use crate::session::{Message, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running statistics derived from one session's ledger.
///
/// The record is updated incrementally, one appended message at a time,
/// through [`Analytics::record`]. It is never recomputed from the ledger in
/// normal operation; [`Analytics::rebuild`] exists only to repair a record
/// whose write was lost.
///
/// Invariants:
/// - `total_messages == user_messages + assistant_messages`
/// - `average_response_time` is the mean of exactly `assistant_messages`
///   samples, each taken when the assistant message was appended. An
///   assistant message without a preceding user message contributes no
///   delta and leaves the mean untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analytics {
    pub total_messages: u64,
    pub user_messages: u64,
    pub assistant_messages: u64,
    /// Running mean in milliseconds.
    pub average_response_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_message_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime<Utc>>,
}

impl Analytics {
    /// Applies one appended message.
    ///
    /// `history` is the ledger as written by the append, so it normally ends
    /// with `message` itself. That trailing copy is skipped when looking for
    /// the user message an assistant reply answers.
    pub fn record(&mut self, message: &Message, history: &[Message]) {
        match message.role {
            MessageRole::User => {
                self.total_messages += 1;
                self.user_messages += 1;
                if let Some(ts) = message.timestamp {
                    self.last_message_time = Some(ts);
                    if self.first_message_time.is_none() {
                        self.first_message_time = Some(ts);
                    }
                }
            }
            MessageRole::Assistant => {
                self.total_messages += 1;
                self.assistant_messages += 1;

                let prior = match history.split_last() {
                    Some((last, rest)) if last == message => rest,
                    _ => history,
                };
                let answered = prior.iter().rev().find(|m| m.is_user());

                if let Some(delta) = answered.and_then(|user| response_delta_ms(user, message)) {
                    let samples = self.assistant_messages as f64;
                    self.average_response_time =
                        (self.average_response_time * (samples - 1.0) + delta) / samples;
                }
            }
            // System prompts are dispatcher context, not conversation turns.
            MessageRole::System => {}
        }
    }

    /// Replays every message of `history` through [`Analytics::record`].
    ///
    /// Each step sees only the prefix that existed when that message was
    /// appended, so the result matches what incremental updates would have
    /// produced.
    pub fn rebuild(history: &[Message]) -> Self {
        let mut analytics = Self::default();
        for (index, message) in history.iter().enumerate() {
            analytics.record(message, &history[..=index]);
        }
        analytics
    }

    /// Checks the counters against the ledger they were derived from.
    pub fn is_consistent_with(&self, history: &[Message]) -> bool {
        let users = history.iter().filter(|m| m.is_user()).count() as u64;
        let assistants = history.iter().filter(|m| m.is_assistant()).count() as u64;
        self.user_messages == users
            && self.assistant_messages == assistants
            && self.total_messages == users + assistants
    }
}

fn response_delta_ms(user: &Message, assistant: &Message) -> Option<f64> {
    let asked = user.timestamp?;
    let answered = assistant.timestamp?;
    let elapsed = answered.signed_duration_since(asked);
    let micros = elapsed
        .num_microseconds()
        .unwrap_or_else(|| elapsed.num_milliseconds().saturating_mul(1000));
    Some(micros as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64, role: MessageRole) -> Message {
        Message {
            id: format!("{role}-{millis}"),
            role,
            content: format!("{role} at {millis}"),
            timestamp: Utc.timestamp_millis_opt(millis).single(),
        }
    }

    fn append(analytics: &mut Analytics, history: &mut Vec<Message>, message: Message) {
        history.push(message.clone());
        analytics.record(&message, history);
    }

    #[test]
    fn test_single_exchange_average() {
        let mut analytics = Analytics::default();
        let mut history = Vec::new();
        append(&mut analytics, &mut history, at(1000, MessageRole::User));
        append(&mut analytics, &mut history, at(1500, MessageRole::Assistant));

        assert_eq!(analytics.assistant_messages, 1);
        assert_eq!(analytics.average_response_time, 500.0);
        assert_eq!(analytics.total_messages, 2);
    }

    #[test]
    fn test_running_mean_over_two_exchanges() {
        let mut analytics = Analytics::default();
        let mut history = Vec::new();
        append(&mut analytics, &mut history, at(1000, MessageRole::User));
        append(&mut analytics, &mut history, at(1500, MessageRole::Assistant));
        append(&mut analytics, &mut history, at(2000, MessageRole::User));
        append(&mut analytics, &mut history, at(2300, MessageRole::Assistant));

        assert_eq!(analytics.average_response_time, 400.0);
        assert_eq!(analytics.user_messages, 2);
        assert_eq!(analytics.assistant_messages, 2);
    }

    #[test]
    fn test_assistant_without_user_leaves_mean_unchanged() {
        let mut analytics = Analytics::default();
        let mut history = Vec::new();
        append(&mut analytics, &mut history, at(1000, MessageRole::Assistant));

        assert_eq!(analytics.average_response_time, 0.0);
        assert_eq!(analytics.assistant_messages, 1);
        assert_eq!(analytics.total_messages, 1);
        assert!(analytics.first_message_time.is_none());
    }

    #[test]
    fn test_repeated_reply_pairs_with_latest_user_message() {
        let mut analytics = Analytics::default();
        let mut history = Vec::new();
        append(&mut analytics, &mut history, at(1000, MessageRole::User));
        append(&mut analytics, &mut history, at(1200, MessageRole::Assistant));
        append(&mut analytics, &mut history, at(1600, MessageRole::Assistant));

        // 200 and 600, both measured from the user message at 1000
        assert_eq!(analytics.average_response_time, 400.0);
    }

    #[test]
    fn test_first_message_time_is_sticky() {
        let mut analytics = Analytics::default();
        let mut history = Vec::new();
        append(&mut analytics, &mut history, at(1000, MessageRole::User));
        append(&mut analytics, &mut history, at(5000, MessageRole::User));

        assert_eq!(
            analytics.first_message_time,
            Utc.timestamp_millis_opt(1000).single()
        );
        assert_eq!(
            analytics.last_message_time,
            Utc.timestamp_millis_opt(5000).single()
        );
    }

    #[test]
    fn test_system_messages_do_not_break_totals() {
        let mut analytics = Analytics::default();
        let mut history = Vec::new();
        append(&mut analytics, &mut history, at(900, MessageRole::System));
        append(&mut analytics, &mut history, at(1000, MessageRole::User));

        assert_eq!(analytics.total_messages, 1);
        assert_eq!(
            analytics.total_messages,
            analytics.user_messages + analytics.assistant_messages
        );
    }

    #[test]
    fn test_missing_timestamps_skip_the_sample() {
        let mut analytics = Analytics::default();
        let mut history = Vec::new();
        let mut user = at(1000, MessageRole::User);
        user.timestamp = None;
        append(&mut analytics, &mut history, user);
        append(&mut analytics, &mut history, at(1500, MessageRole::Assistant));

        assert_eq!(analytics.average_response_time, 0.0);
        assert_eq!(analytics.assistant_messages, 1);
        assert!(analytics.first_message_time.is_none());
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let mut analytics = Analytics::default();
        let mut history = Vec::new();
        for (millis, role) in [
            (1000, MessageRole::User),
            (1500, MessageRole::Assistant),
            (1700, MessageRole::Assistant),
            (2000, MessageRole::User),
            (2300, MessageRole::Assistant),
        ] {
            append(&mut analytics, &mut history, at(millis, role));
        }

        assert_eq!(Analytics::rebuild(&history), analytics);
        assert!(analytics.is_consistent_with(&history));
        assert!(!Analytics::default().is_consistent_with(&history));
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(Analytics::default()).unwrap();
        assert_eq!(json["totalMessages"], 0);
        assert_eq!(json["averageResponseTime"], 0.0);
        assert!(json.get("firstMessageTime").is_none());
    }
}
