//! Key type classification by format inspection.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Semantic key type, serialized with the DIFE wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum KeyType {
    #[serde(rename = "M")]
    Mobile,
    #[serde(rename = "E")]
    Email,
    #[serde(rename = "O")]
    Alphanumeric,
    #[serde(rename = "NRIC")]
    IdentificationNumber,
    #[serde(rename = "B")]
    CommerceCode,
}

impl KeyType {
    /// DIFE wire code
    pub fn code(self) -> &'static str {
        match self {
            KeyType::Mobile => "M",
            KeyType::Email => "E",
            KeyType::Alphanumeric => "O",
            KeyType::IdentificationNumber => "NRIC",
            KeyType::CommerceCode => "B",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::Mobile => "mobile",
            KeyType::Email => "email",
            KeyType::Alphanumeric => "alphanumeric",
            KeyType::IdentificationNumber => "identification_number",
            KeyType::CommerceCode => "commerce_code",
        };
        f.write_str(name)
    }
}

/// Classify a raw key. First matching rule wins.
///
/// Keys that fit no numeric rule fall through to [`KeyType::Alphanumeric`];
/// the validator then explains what is wrong with them.
pub fn classify_key(raw: &str) -> KeyType {
    let key = raw.trim();

    if key.starts_with('@') {
        return KeyType::Alphanumeric;
    }
    if key.contains('@') {
        return KeyType::Email;
    }

    let all_digits = !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit());
    if all_digits {
        if key.len() == 10 && key.starts_with('3') {
            return KeyType::Mobile;
        }
        if key.len() == 10 && key.starts_with("00") {
            return KeyType::CommerceCode;
        }
        return KeyType::IdentificationNumber;
    }

    KeyType::Alphanumeric
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mobile() {
        assert_eq!(classify_key("3001234567"), KeyType::Mobile);
        assert_eq!(classify_key(" 3109876543 "), KeyType::Mobile);
    }

    #[test]
    fn test_classify_email() {
        assert_eq!(classify_key("ana.perez@banco.com.co"), KeyType::Email);
    }

    #[test]
    fn test_classify_alphanumeric() {
        assert_eq!(classify_key("@anaperez"), KeyType::Alphanumeric);
        assert_eq!(classify_key("not-a-key"), KeyType::Alphanumeric);
    }

    #[test]
    fn test_classify_numeric_kinds() {
        assert_eq!(classify_key("0012345678"), KeyType::CommerceCode);
        assert_eq!(classify_key("1020304050"), KeyType::IdentificationNumber);
        assert_eq!(classify_key("52345678"), KeyType::IdentificationNumber);
        // 11 digits starting with 3 is not a mobile
        assert_eq!(classify_key("30012345678"), KeyType::IdentificationNumber);
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(
            serde_json::to_string(&KeyType::IdentificationNumber).unwrap(),
            "\"NRIC\""
        );
        let parsed: KeyType = serde_json::from_str("\"M\"").unwrap();
        assert_eq!(parsed, KeyType::Mobile);
        assert_eq!(KeyType::CommerceCode.code(), "B");
    }
}
