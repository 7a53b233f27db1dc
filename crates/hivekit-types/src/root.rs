use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A well-known store root.
///
/// Roots are passed explicitly to every operation; there is no ambient
/// "current root".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RootKey {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
}

impl RootKey {
    /// Every root, in declaration order.
    pub const ALL: [RootKey; 5] = [
        RootKey::ClassesRoot,
        RootKey::CurrentUser,
        RootKey::LocalMachine,
        RootKey::Users,
        RootKey::CurrentConfig,
    ];

    /// Short form, e.g. `HKCU`.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKCR",
            Self::CurrentUser => "HKCU",
            Self::LocalMachine => "HKLM",
            Self::Users => "HKU",
            Self::CurrentConfig => "HKCC",
        }
    }

    /// Long form, e.g. `HKEY_CURRENT_USER`.
    pub fn full_name(self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKEY_CLASSES_ROOT",
            Self::CurrentUser => "HKEY_CURRENT_USER",
            Self::LocalMachine => "HKEY_LOCAL_MACHINE",
            Self::Users => "HKEY_USERS",
            Self::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for RootKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RootKey::ALL
            .into_iter()
            .find(|root| {
                s.eq_ignore_ascii_case(root.abbreviation()) || s.eq_ignore_ascii_case(root.full_name())
            })
            .ok_or_else(|| TypeError::UnknownRoot(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_abbreviation_and_full_name() {
        assert_eq!("HKCU".parse::<RootKey>().unwrap(), RootKey::CurrentUser);
        assert_eq!("hklm".parse::<RootKey>().unwrap(), RootKey::LocalMachine);
        assert_eq!(
            "HKEY_CLASSES_ROOT".parse::<RootKey>().unwrap(),
            RootKey::ClassesRoot
        );
    }

    #[test]
    fn parse_unknown_root() {
        assert_eq!(
            "HKEY_DYN_DATA".parse::<RootKey>(),
            Err(TypeError::UnknownRoot("HKEY_DYN_DATA".into()))
        );
    }

    #[test]
    fn display_uses_abbreviation() {
        assert_eq!(RootKey::Users.to_string(), "HKU");
    }
}
