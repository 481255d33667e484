/// Current time in milliseconds since the Unix epoch.
///
/// Used for RPC envelope timestamps and tool-event `startedAtMillis` fields.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_millis_is_positive_and_recent() {
        let t = now_millis();
        assert!(t > 1_700_000_000_000);
    }
}
