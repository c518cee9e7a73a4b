//! Client-side merge of durable history with live-pushed messages.
//!
//! A message can legitimately arrive twice: once over the realtime channel
//! and again in a history response after a reconnect or resync. Merging is
//! therefore keyed by message id; duplicates are dropped, never appended.

use super::ChatMessage;

/// Merge live-received messages into a history fetch. Keeps ascending
/// `(created_at, id)` order and at most one entry per message id.
pub fn merge_history(history: Vec<ChatMessage>, live: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut merged = history;
    for msg in live {
        if merged.iter().any(|m| m.id() == msg.id()) {
            continue;
        }
        merged.push(msg);
    }
    merged.sort_by_key(|m| (m.created_at(), m.id()));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DirectMessage, MessageId, Time, UserId};
    use std::time::Duration;

    fn msg(id: MessageId, at: Time) -> ChatMessage {
        ChatMessage::Direct(DirectMessage {
            id,
            sender_id: UserId::new(),
            receiver_id: UserId::new(),
            content: "hello".into(),
            created_at: at,
        })
    }

    #[test]
    fn live_duplicate_of_history_is_dropped() {
        let id = MessageId::new();
        let at = Time::now_utc();
        let history = vec![msg(id, at)];
        let merged = merge_history(history.clone(), vec![msg(id, at)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id(), id);
    }

    #[test]
    fn new_live_messages_land_in_chronological_order() {
        let base = Time::now_utc();
        let old = msg(MessageId::new(), base);
        let mid = msg(MessageId::new(), base + Duration::from_secs(5));
        let new = msg(MessageId::new(), base + Duration::from_secs(10));

        let merged = merge_history(vec![old.clone(), new.clone()], vec![mid.clone()]);
        let ids: Vec<_> = merged.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec![old.id(), mid.id(), new.id()]);
        assert!(merged.windows(2).all(|w| w[0].created_at() <= w[1].created_at()));
    }

    #[test]
    fn merge_is_idempotent_under_redelivery() {
        let base = Time::now_utc();
        let a = msg(MessageId::new(), base);
        let b = msg(MessageId::new(), base + Duration::from_secs(1));

        let once = merge_history(vec![a.clone()], vec![b.clone()]);
        let twice = merge_history(once.clone(), vec![a, b]);
        assert_eq!(once, twice);
    }
}
