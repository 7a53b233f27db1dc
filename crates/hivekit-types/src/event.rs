use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::access::NotifyFilter;
use crate::error::TypeError;

/// A kind of change a monitor can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventFlag {
    /// A child node was created or deleted.
    SubkeyChange,
    /// A value was written or deleted.
    ValueChange,
}

impl EventFlag {
    /// Every flag, in declaration order.
    pub const ALL: [EventFlag; 2] = [EventFlag::SubkeyChange, EventFlag::ValueChange];

    /// The notification filter bit this flag maps to.
    pub fn filter_bits(self) -> NotifyFilter {
        match self {
            Self::SubkeyChange => NotifyFilter::CHANGE_NAME,
            Self::ValueChange => NotifyFilter::CHANGE_LAST_SET,
        }
    }
}

impl fmt::Display for EventFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubkeyChange => write!(f, "subkey"),
            Self::ValueChange => write!(f, "value"),
        }
    }
}

impl FromStr for EventFlag {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "subkey" | "subkeys" | "name" => Ok(Self::SubkeyChange),
            "value" | "values" | "last-set" => Ok(Self::ValueChange),
            _ => Err(TypeError::UnknownEventFlag(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_distinct_filter_bits() {
        assert_eq!(EventFlag::SubkeyChange.filter_bits(), NotifyFilter::CHANGE_NAME);
        assert_eq!(EventFlag::ValueChange.filter_bits(), NotifyFilter::CHANGE_LAST_SET);
    }

    #[test]
    fn parse_round_trips_display() {
        for flag in EventFlag::ALL {
            assert_eq!(flag.to_string().parse::<EventFlag>().unwrap(), flag);
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_accepts_aliases() {
        assert_eq!("VALUE".parse::<EventFlag>().unwrap(), EventFlag::ValueChange);
        assert_eq!("Subkeys".parse::<EventFlag>().unwrap(), EventFlag::SubkeyChange);
        assert_eq!("last-set".parse::<EventFlag>().unwrap(), EventFlag::ValueChange);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(
            "security".parse::<EventFlag>(),
            Err(TypeError::UnknownEventFlag("security".into()))
        );
    }
}
