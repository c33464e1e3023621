use uuid::Uuid;

/// 16 lowercase hex characters drawn from a random v4 uuid.
pub fn random_trace_id() -> String {
    let (high, low) = Uuid::new_v4().as_u64_pair();
    format!("{:016x}", high ^ low)
}

/// First non-loopback local address, or an empty string.
pub fn server_identity() -> String {
    local_ip_address::local_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_ids_are_sixteen_hex_chars() {
        let id = random_trace_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn trace_ids_differ_between_requests() {
        assert_ne!(random_trace_id(), random_trace_id());
    }
}
