use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::storage::types::message::Message;

/// Hex-encoded SHA-256 digest of arbitrary text.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable digest over a message set. A stored summary records this value as
/// its `source_hash`; the summary is only valid while the current message
/// set still hashes to the same digest.
pub fn source_hash_for_messages(messages: &[Message]) -> String {
    let mut serialized = String::new();
    for message in messages {
        serialized.push_str(&format!(
            "[{}] {}|{}: {}\n",
            message.created_at.to_rfc3339(),
            message.message_id,
            message.sender.as_str(),
            message.message
        ));
    }
    sha256_hex(&serialized)
}

/// Deterministic cache key for a summary request: same customer, agent and
/// time range always map to the same key.
pub fn summary_cache_key(
    customer_id: &str,
    agent_id: Option<&str>,
    range_start: Option<DateTime<Utc>>,
    range_end: Option<DateTime<Utc>>,
) -> String {
    let input = format!(
        "{}|{}|{}|{}",
        customer_id,
        agent_id.unwrap_or("-"),
        range_start.map(|t| t.to_rfc3339()).unwrap_or_default(),
        range_end.map(|t| t.to_rfc3339()).unwrap_or_default(),
    );
    format!("sum-{}", sha256_hex(&input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::message::{Message, Sender};
    use chrono::TimeZone;

    fn sample_message(id: &str, body: &str) -> Message {
        Message {
            id: 1,
            message_id: id.to_string(),
            customer_id: "cust_1".to_string(),
            agent_id: None,
            sender: Sender::Customer,
            message: body.to_string(),
            meta: serde_json::json!({}),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn source_hash_is_stable_and_content_sensitive() {
        let a = vec![sample_message("m1", "hello")];
        let b = vec![sample_message("m1", "hello")];
        let c = vec![sample_message("m1", "hello again")];

        assert_eq!(source_hash_for_messages(&a), source_hash_for_messages(&b));
        assert_ne!(source_hash_for_messages(&a), source_hash_for_messages(&c));
    }

    #[test]
    fn cache_key_distinguishes_agent_and_range() {
        let start = Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let base = summary_cache_key("cust_1", None, start, None);
        let with_agent = summary_cache_key("cust_1", Some("agent_1"), start, None);
        let no_range = summary_cache_key("cust_1", None, None, None);

        assert_ne!(base, with_agent);
        assert_ne!(base, no_range);
        assert_eq!(base, summary_cache_key("cust_1", None, start, None));
        assert!(base.starts_with("sum-"));
    }
}
