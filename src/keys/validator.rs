//! Per-type key format rules.

use thiserror::Error;

use super::classifier::KeyType;

pub const EMAIL_MAX_LEN: usize = 92;
pub const ALIAS_MIN_LEN: usize = 3;
pub const ALIAS_MAX_LEN: usize = 20;
pub const ID_MIN_LEN: usize = 5;
pub const ID_MAX_LEN: usize = 15;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {key_type} key: {reason}")]
pub struct KeyFormatError {
    pub key_type: KeyType,
    pub reason: &'static str,
}

impl KeyFormatError {
    fn new(key_type: KeyType, reason: &'static str) -> Self {
        Self { key_type, reason }
    }
}

/// Validate `raw` against the rules of `key_type`.
pub fn validate_key_format(raw: &str, key_type: KeyType) -> Result<(), KeyFormatError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(KeyFormatError::new(key_type, "key cannot be empty"));
    }

    match key_type {
        KeyType::Mobile => validate_mobile(key),
        KeyType::Email => validate_email(key),
        KeyType::Alphanumeric => validate_alias(key),
        KeyType::IdentificationNumber => validate_identification(key),
        KeyType::CommerceCode => validate_commerce_code(key),
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn validate_mobile(key: &str) -> Result<(), KeyFormatError> {
    if !is_digits(key) {
        return Err(KeyFormatError::new(KeyType::Mobile, "must contain only digits"));
    }
    if key.len() != 10 {
        return Err(KeyFormatError::new(KeyType::Mobile, "must be 10 digits long"));
    }
    if !key.starts_with('3') {
        return Err(KeyFormatError::new(KeyType::Mobile, "must start with 3"));
    }
    Ok(())
}

fn validate_email(key: &str) -> Result<(), KeyFormatError> {
    if key.len() > EMAIL_MAX_LEN {
        return Err(KeyFormatError::new(KeyType::Email, "exceeds 92 characters"));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(KeyFormatError::new(KeyType::Email, "must not contain spaces"));
    }

    let mut parts = key.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => {
            return Err(KeyFormatError::new(
                KeyType::Email,
                "must contain exactly one @",
            ));
        }
    };

    if local.is_empty() {
        return Err(KeyFormatError::new(KeyType::Email, "local part is empty"));
    }
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..");
    if !domain_ok {
        return Err(KeyFormatError::new(KeyType::Email, "domain is not valid"));
    }
    Ok(())
}

fn validate_alias(key: &str) -> Result<(), KeyFormatError> {
    let Some(alias) = key.strip_prefix('@') else {
        return Err(KeyFormatError::new(
            KeyType::Alphanumeric,
            "must start with @",
        ));
    };
    if !(ALIAS_MIN_LEN..=ALIAS_MAX_LEN).contains(&alias.len()) {
        return Err(KeyFormatError::new(
            KeyType::Alphanumeric,
            "must have between 3 and 20 characters after @",
        ));
    }
    if !alias
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    {
        return Err(KeyFormatError::new(
            KeyType::Alphanumeric,
            "only lowercase letters and digits are allowed",
        ));
    }
    Ok(())
}

fn validate_identification(key: &str) -> Result<(), KeyFormatError> {
    if !is_digits(key) {
        return Err(KeyFormatError::new(
            KeyType::IdentificationNumber,
            "must contain only digits",
        ));
    }
    if !(ID_MIN_LEN..=ID_MAX_LEN).contains(&key.len()) {
        return Err(KeyFormatError::new(
            KeyType::IdentificationNumber,
            "must have between 5 and 15 digits",
        ));
    }
    Ok(())
}

fn validate_commerce_code(key: &str) -> Result<(), KeyFormatError> {
    if !is_digits(key) || key.len() != 10 {
        return Err(KeyFormatError::new(
            KeyType::CommerceCode,
            "must be 10 digits long",
        ));
    }
    if !key.starts_with("00") {
        return Err(KeyFormatError::new(
            KeyType::CommerceCode,
            "must start with 00",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::classify_key;

    fn check(key: &str) -> Result<(), KeyFormatError> {
        validate_key_format(key, classify_key(key))
    }

    #[test]
    fn test_valid_keys_pass() {
        assert!(check("3001234567").is_ok());
        assert!(check("ana.perez@banco.com.co").is_ok());
        assert!(check("@anaperez").is_ok());
        assert!(check("1020304050").is_ok());
        assert!(check("0012345678").is_ok());
    }

    #[test]
    fn test_mobile_rules() {
        let err = validate_key_format("300123456", KeyType::Mobile).unwrap_err();
        assert_eq!(err.reason, "must be 10 digits long");
        let err = validate_key_format("4001234567", KeyType::Mobile).unwrap_err();
        assert_eq!(err.reason, "must start with 3");
    }

    #[test]
    fn test_email_rules() {
        assert!(check("a@@b.com").is_err());
        assert!(check("ana@localhost").is_err());
        assert!(check("ana perez@banco.co").is_err());

        let long = format!("{}@banco.co", "a".repeat(90));
        let err = check(&long).unwrap_err();
        assert_eq!(err.reason, "exceeds 92 characters");
    }

    #[test]
    fn test_alias_rules() {
        let err = check("@ab").unwrap_err();
        assert_eq!(err.key_type, KeyType::Alphanumeric);
        assert!(check("@AnaPerez").is_err());
        assert!(check("plain-text").is_err());
        assert!(check(&format!("@{}", "a".repeat(21))).is_err());
    }

    #[test]
    fn test_identification_rules() {
        assert!(check("1234").is_err());
        assert!(check("1234567890123456").is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = validate_key_format("   ", KeyType::Email).unwrap_err();
        assert_eq!(err.reason, "key cannot be empty");
        assert_eq!(err.to_string(), "Invalid email key: key cannot be empty");
    }
}
