use std::sync::OnceLock;

use regex::Regex;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone pattern"))
}

pub fn is_email(input: &str) -> bool {
    email_re().is_match(input)
}

/// E.164-ish: optional `+`, 7 to 15 digits.
pub fn is_phone(input: &str) -> bool {
    phone_re().is_match(input)
}
