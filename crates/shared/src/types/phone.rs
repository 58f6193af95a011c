//! E.164 phone number type.
//!
//! A validated international phone number in `+<digits>` form, with country
//! derivation by longest-prefix match against the dialing-prefix table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhoneNumberError {
    /// The number does not start with `+`.
    #[error("phone number must start with '+'")]
    MissingPlusPrefix,
    /// The number contains a non-digit character after the `+`.
    #[error("phone number must contain only digits after '+'")]
    NonNumeric,
    /// The number has fewer than 8 or more than 15 digits.
    #[error("phone number must have 8 to 15 digits")]
    InvalidLength,
    /// The number starts with a zero after the `+`.
    #[error("phone number country code cannot start with 0")]
    LeadingZero,
}

/// A validated E.164 phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber {
    e164: String,
}

/// A matched dialing prefix and its ISO 3166-1 alpha-2 country code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryMatch {
    /// ISO country code, e.g. `"NL"`.
    pub iso: &'static str,
    /// The matched dialing prefix without `+`, e.g. `"31"`.
    pub prefix: &'static str,
}

impl PhoneNumber {
    /// Parses and validates an E.164 phone number.
    ///
    /// Accepts surrounding whitespace; everything else is strict: a leading
    /// `+`, then 8 to 15 digits, the first of which is non-zero.
    pub fn parse(input: &str) -> Result<Self, PhoneNumberError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix('+')
            .ok_or(PhoneNumberError::MissingPlusPrefix)?;

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError::NonNumeric);
        }
        if digits.len() < 8 || digits.len() > 15 {
            return Err(PhoneNumberError::InvalidLength);
        }
        if digits.starts_with('0') {
            return Err(PhoneNumberError::LeadingZero);
        }

        Ok(Self {
            e164: format!("+{digits}"),
        })
    }

    /// Returns the number in E.164 form, including the leading `+`.
    #[must_use]
    pub fn as_e164(&self) -> &str {
        &self.e164
    }

    /// Returns the digits of the number with the leading `+` stripped.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.e164[1..]
    }

    /// Derives the country by longest-prefix match, trying prefixes of 4
    /// digits down to 1 against the number with its leading `+` stripped.
    #[must_use]
    pub fn country(&self) -> Option<CountryMatch> {
        let digits = self.digits();
        for len in (1..=4usize).rev() {
            if digits.len() < len {
                continue;
            }
            let candidate = &digits[..len];
            if let Some(&(prefix, iso)) = DIALING_PREFIXES.iter().find(|(p, _)| *p == candidate) {
                return Some(CountryMatch { iso, prefix });
            }
        }
        None
    }

    /// Returns the national number: the digits with the matched dialing
    /// prefix stripped, or all digits when no prefix matches.
    #[must_use]
    pub fn national_number(&self) -> &str {
        match self.country() {
            Some(m) => &self.digits()[m.prefix.len()..],
            None => self.digits(),
        }
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.e164)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.e164
    }
}

/// Dialing prefixes to ISO country codes.
///
/// Not exhaustive: covers the markets the inventory operates in plus the
/// NANP island codes that need 4-digit matching.
const DIALING_PREFIXES: &[(&str, &str)] = &[
    // 4-digit NANP area prefixes (must win over "1")
    ("1242", "BS"),
    ("1284", "VG"),
    ("1345", "KY"),
    ("1876", "JM"),
    // 3-digit
    ("351", "PT"),
    ("352", "LU"),
    ("353", "IE"),
    ("358", "FI"),
    ("359", "BG"),
    ("370", "LT"),
    ("371", "LV"),
    ("372", "EE"),
    ("380", "UA"),
    ("385", "HR"),
    ("420", "CZ"),
    ("421", "SK"),
    ("852", "HK"),
    ("886", "TW"),
    ("966", "SA"),
    ("971", "AE"),
    ("972", "IL"),
    ("974", "QA"),
    // 2-digit
    ("20", "EG"),
    ("27", "ZA"),
    ("30", "GR"),
    ("31", "NL"),
    ("32", "BE"),
    ("33", "FR"),
    ("34", "ES"),
    ("39", "IT"),
    ("40", "RO"),
    ("41", "CH"),
    ("43", "AT"),
    ("44", "GB"),
    ("45", "DK"),
    ("46", "SE"),
    ("47", "NO"),
    ("48", "PL"),
    ("49", "DE"),
    ("52", "MX"),
    ("55", "BR"),
    ("60", "MY"),
    ("61", "AU"),
    ("62", "ID"),
    ("63", "PH"),
    ("64", "NZ"),
    ("65", "SG"),
    ("66", "TH"),
    ("81", "JP"),
    ("82", "KR"),
    ("84", "VN"),
    ("86", "CN"),
    ("90", "TR"),
    ("91", "IN"),
    // 1-digit
    ("1", "US"),
    ("7", "RU"),
];
