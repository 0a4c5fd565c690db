use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ToFError;

/// A 128-bit identifier of a use case, printed in the usual GUID form.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UseCaseIdentifier([u8; 16]);

impl UseCaseIdentifier {
    /// The nil identifier.
    pub const NIL: Self = Self([0; 16]);

    /// Creates an identifier from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns `true` for the nil identifier.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for UseCaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        self.0.iter().enumerate().try_for_each(|(i, b)| {
            if matches!(i, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{:02X}", b)
        })?;
        write!(f, "}}")
    }
}

impl fmt::Debug for UseCaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for UseCaseIdentifier {
    type Err = ToFError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim_start_matches('{')
            .trim_end_matches('}')
            .chars()
            .filter(|&c| c != '-')
            .collect::<Vec<_>>();
        if hex.len() != 32 {
            return Err(ToFError::invalid_value(format!(
                "Malformed use case identifier: {}",
                s
            )));
        }
        let mut bytes = [0u8; 16];
        hex.chunks(2).zip(bytes.iter_mut()).try_for_each(|(pair, b)| {
            let hi = pair[0].to_digit(16);
            let lo = pair[1].to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => {
                    *b = (hi << 4 | lo) as u8;
                    Ok(())
                }
                _ => Err(ToFError::invalid_value(format!(
                    "Malformed use case identifier: {}",
                    s
                ))),
            }
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for UseCaseIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UseCaseIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
