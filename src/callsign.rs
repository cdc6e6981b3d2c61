//! Amateur-radio station identifiers.

use std::fmt;
use std::str::FromStr;

/// Maximum length of the textual representation (`BASE-SSID`).
pub const ADDR_MAX: usize = 10;

/// Maximum length of the base callsign.
pub const CALL_MAX: usize = 6;

/// Maximum legal SSID.
pub const SSID_MAX: u8 = 15;

/// Errors returned while validating or parsing a callsign.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CallsignError {
    /// The string is empty or the SSID suffix isn't a valid decimal integer.
    #[error("syntax error in call sign")]
    Syntax,

    /// The base (or the whole string, if there's no SSID) exceeds 6 bytes.
    #[error("call sign too long")]
    TooLong,

    /// The SSID is outside `[0, 15]`.
    #[error("SSID must be between 0 and 15")]
    SsidRange,
}

/// A station identifier: a 1-6 character base, plus an optional SSID in
/// `[0, 15]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Callsign {
    base: String,
    ssid: u8,
}

impl Callsign {
    /// Build a callsign from an already-validated base and SSID.
    ///
    /// The base is upper-cased; it is not otherwise checked for charset, so
    /// callers that already validated a wire-decoded base may pass it
    /// through unchanged.
    pub fn new(base: &str, ssid: u8) -> Result<Self, CallsignError> {
        if base.is_empty() {
            return Err(CallsignError::Syntax);
        }
        if base.len() > CALL_MAX {
            return Err(CallsignError::TooLong);
        }
        if ssid > SSID_MAX {
            return Err(CallsignError::SsidRange);
        }
        Ok(Self {
            base: base.to_ascii_uppercase(),
            ssid,
        })
    }

    /// The base callsign, without SSID.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The SSID, `0` if none was given.
    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// Validate a callsign string without constructing one, returning the
    /// specific rejection reason.
    pub fn validate(s: &str) -> Result<(), CallsignError> {
        Self::from_str(s).map(|_| ())
    }

    /// Upper-case a callsign in place.
    pub fn canonicalize(s: &mut str) {
        s.make_ascii_uppercase();
    }
}

impl FromStr for Callsign {
    type Err = CallsignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CallsignError::Syntax);
        }
        if s.len() > ADDR_MAX {
            return Err(CallsignError::TooLong);
        }
        match s.find('-') {
            Some(pos) => {
                let (base, suffix) = (&s[..pos], &s[pos + 1..]);
                if base.is_empty() || base.len() > CALL_MAX {
                    return Err(CallsignError::TooLong);
                }
                let ssid: u8 = suffix.parse().map_err(|_| CallsignError::Syntax)?;
                if ssid > SSID_MAX {
                    return Err(CallsignError::SsidRange);
                }
                Ok(Self {
                    base: base.to_ascii_uppercase(),
                    ssid,
                })
            }
            None => {
                if s.len() > CALL_MAX {
                    return Err(CallsignError::TooLong);
                }
                Ok(Self {
                    base: s.to_ascii_uppercase(),
                    ssid: 0,
                })
            }
        }
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid == 0 {
            write!(f, "{}", self.base)
        } else {
            write!(f, "{}-{}", self.base, self.ssid)
        }
    }
}
