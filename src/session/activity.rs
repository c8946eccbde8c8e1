use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User interaction reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionSignal {
    PointerPress,
    KeyPress,
    Scroll,
    Touch,
    PointerMove,
}

impl InteractionSignal {
    /// Movement fires far too often to be written durably
    pub fn counts_as_activity(&self) -> bool {
        !matches!(self, Self::PointerMove)
    }
}

/// Encode an activity instant for the durable store (epoch millis)
pub(crate) fn encode_last_activity(at: DateTime<Utc>) -> Value {
    Value::from(at.timestamp_millis())
}

/// Decode a stored activity instant
///
/// Accepts a number or a numeric string, which is how older clients wrote it.
pub(crate) fn decode_last_activity(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pointer_move_is_ignored() {
        assert!(InteractionSignal::PointerPress.counts_as_activity());
        assert!(InteractionSignal::Scroll.counts_as_activity());
        assert!(!InteractionSignal::PointerMove.counts_as_activity());
    }

    #[test]
    fn test_decode_accepts_number_and_string() {
        let at = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();
        assert_eq!(decode_last_activity(&encode_last_activity(at)), Some(at));
        assert_eq!(decode_last_activity(&json!("1760000000000")), Some(at));
        assert_eq!(decode_last_activity(&json!("yesterday")), None);
        assert_eq!(decode_last_activity(&json!(true)), None);
    }
}
