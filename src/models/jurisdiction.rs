//! Jurisdiction codes.
//!
//! Each Australian state and territory levies its own transfer duty. The
//! engine keys every rule set, statutory concession and guarantee scheme cap
//! by one of these codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// An Australian state or territory with its own duty law.
///
/// # Example
///
/// ```
/// use stamp_duty_engine::models::Jurisdiction;
///
/// let code: Jurisdiction = "vic".parse().unwrap();
/// assert_eq!(code, Jurisdiction::Vic);
/// assert_eq!(code.to_string(), "VIC");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Jurisdiction {
    /// Australian Capital Territory.
    Act,
    /// New South Wales.
    Nsw,
    /// Northern Territory.
    Nt,
    /// Queensland.
    Qld,
    /// South Australia.
    Sa,
    /// Tasmania.
    Tas,
    /// Victoria.
    Vic,
    /// Western Australia.
    Wa,
}

impl Jurisdiction {
    /// Every supported jurisdiction, in code order.
    pub const ALL: [Jurisdiction; 8] = [
        Jurisdiction::Act,
        Jurisdiction::Nsw,
        Jurisdiction::Nt,
        Jurisdiction::Qld,
        Jurisdiction::Sa,
        Jurisdiction::Tas,
        Jurisdiction::Vic,
        Jurisdiction::Wa,
    ];

    /// Returns the upper-case code used in configuration and on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Jurisdiction::Act => "ACT",
            Jurisdiction::Nsw => "NSW",
            Jurisdiction::Nt => "NT",
            Jurisdiction::Qld => "QLD",
            Jurisdiction::Sa => "SA",
            Jurisdiction::Tas => "TAS",
            Jurisdiction::Vic => "VIC",
            Jurisdiction::Wa => "WA",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Jurisdiction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Jurisdiction::ALL
            .into_iter()
            .find(|j| j.code() == wanted)
            .ok_or_else(|| EngineError::UnsupportedJurisdiction {
                code: s.trim().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("nsw".parse::<Jurisdiction>().unwrap(), Jurisdiction::Nsw);
        assert_eq!(" Qld ".parse::<Jurisdiction>().unwrap(), Jurisdiction::Qld);
    }

    #[test]
    fn test_parse_unknown_code_is_unsupported() {
        match "XYZ".parse::<Jurisdiction>() {
            Err(EngineError::UnsupportedJurisdiction { code }) => assert_eq!(code, "XYZ"),
            other => panic!("Expected UnsupportedJurisdiction, got {:?}", other),
        }
    }

    #[test]
    fn test_serde_uses_upper_case_codes() {
        let json = serde_json::to_string(&Jurisdiction::Wa).unwrap();
        assert_eq!(json, "\"WA\"");
        let parsed: Jurisdiction = serde_json::from_str("\"TAS\"").unwrap();
        assert_eq!(parsed, Jurisdiction::Tas);
    }

    #[test]
    fn test_every_code_round_trips_through_display() {
        for j in Jurisdiction::ALL {
            assert_eq!(j.to_string().parse::<Jurisdiction>().unwrap(), j);
        }
    }
}
