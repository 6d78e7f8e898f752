use std::fmt;
use std::str::FromStr;

use audioplug_sys::apk_uid_t;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// 128-bit class identifier.
///
/// The bytes carry no structure; a `Uid` is only ever compared, hashed and
/// printed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uid([u8; 16]);

impl Uid {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Builds an identifier from four 32-bit words, most significant first.
    pub const fn from_u32s(a: u32, b: u32, c: u32, d: u32) -> Self {
        let a = a.to_be_bytes();
        let b = b.to_be_bytes();
        let c = c.to_be_bytes();
        let d = d.to_be_bytes();
        Self([
            a[0], a[1], a[2], a[3], b[0], b[1], b[2], b[3], c[0], c[1], c[2], c[3], d[0], d[1],
            d[2], d[3],
        ])
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }

    pub fn to_raw(self) -> apk_uid_t {
        apk_uid_t { bytes: self.0 }
    }

    pub fn from_raw(raw: &apk_uid_t) -> Self {
        Self(raw.bytes)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseUidError {
    #[error("class id must contain 32 hex digits, found {0}")]
    Length(usize),
    #[error("class id contains non-hex character `{0}`")]
    Digit(char),
}

impl FromStr for Uid {
    type Err = ParseUidError;

    /// Accepts 32 hex digits, optionally grouped with `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<char> = s.chars().filter(|c| *c != '-').collect();
        if digits.len() != 32 {
            return Err(ParseUidError::Length(digits.len()));
        }
        let mut bytes = [0u8; 16];
        for (index, pair) in digits.chunks(2).enumerate() {
            let hi = pair[0].to_digit(16).ok_or(ParseUidError::Digit(pair[0]))?;
            let lo = pair[1].to_digit(16).ok_or(ParseUidError::Digit(pair[1]))?;
            bytes[index] = (hi * 16 + lo) as u8;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let uid = Uid::from_u32s(0x0102_0304, 0xA0B0_C0D0, 0, 0xFFFF_FFFF);
        let text = uid.to_string();
        assert_eq!(text, "01020304A0B0C0D000000000FFFFFFFF");
        assert_eq!(text.parse::<Uid>().unwrap(), uid);
    }

    #[test]
    fn parse_accepts_dashes_and_rejects_garbage() {
        let uid: Uid = "01020304-A0B0C0D0-00000000-FFFFFFFF".parse().unwrap();
        assert_eq!(uid, Uid::from_u32s(0x0102_0304, 0xA0B0_C0D0, 0, 0xFFFF_FFFF));
        assert_eq!("abc".parse::<Uid>(), Err(ParseUidError::Length(3)));
        assert_eq!(
            "Z1020304A0B0C0D000000000FFFFFFFF".parse::<Uid>(),
            Err(ParseUidError::Digit('Z'))
        );
    }
}
