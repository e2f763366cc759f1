use rand::Rng;
use uuid::Uuid;

/// Booking reference in the `BK-` + 12 hex form customers see on receipts.
pub fn booking_ref() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("BK-{}", &hex[..12])
}

/// External message identifier.
pub fn message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Numeric one-time code of the given length.
pub fn otp_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_ref_shape() {
        let reference = booking_ref();
        assert!(reference.starts_with("BK-"));
        assert_eq!(reference.len(), 15);
        assert!(reference[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn booking_refs_are_unique() {
        assert_ne!(booking_ref(), booking_ref());
    }

    #[test]
    fn otp_code_is_numeric_with_requested_length() {
        let code = otp_code(6);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
