use uuid::Uuid;

/// Generates a WS-Addressing message ID in the form of `urn:uuid:<UUIDv4>`.
///
/// Each discovery round must use its own ID as responses are correlated with it.
pub fn new_message_id() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}
