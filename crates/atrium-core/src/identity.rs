// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation identity: canonical phone keys and (phone, channel) pairs.
//!
//! Customer numbers reach the system both with and without the mobile
//! prefix digit (e.g. `5511999990000` and `551199990000`). They are folded
//! into one [`PhoneKey`] here, once, before anything is stored or matched.

use serde::{Deserialize, Serialize};

use crate::error::AtriumError;

/// Canonical customer phone number (digits only, mobile digit removed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneKey(pub String);

impl PhoneKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a conversation: canonical phone plus channel (line) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationKey {
    pub phone_key: PhoneKey,
    pub channel: String,
}

impl ConversationKey {
    pub fn new(phone_key: PhoneKey, channel: impl Into<String>) -> Self {
        Self {
            phone_key,
            channel: channel.into(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.phone_key, self.channel)
    }
}

/// Folds raw phone numbers into canonical [`PhoneKey`]s.
///
/// Rules, applied in order:
/// 1. keep ASCII digits only;
/// 2. prefix the country code when the number has national length
///    (area code plus 8 or 9 subscriber digits);
/// 3. when the number is exactly `country + area + 9` digits long and the
///    digit after the area code is the mobile digit, drop that digit.
///
/// Rule 3 only fires on the long form, so normalizing a key again is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNormalizer {
    country_code: String,
    area_code_len: usize,
    mobile_digit: char,
}

impl Default for PhoneNormalizer {
    fn default() -> Self {
        Self::new("55", 2, '9')
    }
}

impl PhoneNormalizer {
    pub fn new(country_code: impl Into<String>, area_code_len: usize, mobile_digit: char) -> Self {
        Self {
            country_code: country_code.into(),
            area_code_len,
            mobile_digit,
        }
    }

    /// Canonicalize a raw phone number.
    pub fn normalize(&self, raw: &str) -> Result<PhoneKey, AtriumError> {
        let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(AtriumError::InvalidPhone(raw.to_string()));
        }

        // Decided by length alone: an area code may repeat the country code.
        let national = self.area_code_len + 8..=self.area_code_len + 9;
        if national.contains(&digits.len()) {
            digits.insert_str(0, &self.country_code);
        }

        let prefix_at = self.country_code.len() + self.area_code_len;
        if digits.len() == prefix_at + 9 && digits[prefix_at..].starts_with(self.mobile_digit) {
            digits.remove(prefix_at);
        }

        Ok(PhoneKey(digits))
    }

    /// Build a conversation key from a raw phone and a channel identifier.
    pub fn key(&self, raw_phone: &str, channel: &str) -> Result<ConversationKey, AtriumError> {
        Ok(ConversationKey::new(self.normalize(raw_phone)?, channel))
    }
}
