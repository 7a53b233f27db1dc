//! Mapping logical views to access-mask bits.

use hivekit_types::{AccessMask, View};

/// The view-selection bit for `view`, or no bits for [`View::Default`].
pub fn view_flag(view: View) -> AccessMask {
    match view {
        View::Default => AccessMask::empty(),
        View::Force32 => AccessMask::WOW64_32KEY,
        View::Force64 => AccessMask::WOW64_64KEY,
    }
}

/// The access mask for opening a node: always read access, write access if
/// requested, plus the view bit.
pub fn resolve_access_flags(write_access: bool, view: View) -> AccessMask {
    let mut access = AccessMask::READ;
    if write_access {
        access |= AccessMask::WRITE;
    }
    access | view_flag(view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_default() {
        assert_eq!(resolve_access_flags(false, View::Default), AccessMask::READ);
    }

    #[test]
    fn write_adds_write_rights() {
        let access = resolve_access_flags(true, View::Default);
        assert!(access.contains(AccessMask::READ | AccessMask::WRITE));
        assert!((access & AccessMask::VIEW_MASK).is_empty());
    }

    #[test]
    fn forced_views_add_exactly_one_bit() {
        assert_eq!(
            resolve_access_flags(false, View::Force32),
            AccessMask::READ | AccessMask::WOW64_32KEY
        );
        assert_eq!(
            resolve_access_flags(true, View::Force64) & AccessMask::VIEW_MASK,
            AccessMask::WOW64_64KEY
        );
    }

    #[test]
    fn view_flag_alone() {
        assert!(view_flag(View::Default).is_empty());
        assert_eq!(view_flag(View::Force32), AccessMask::WOW64_32KEY);
        assert_eq!(view_flag(View::Force64), AccessMask::WOW64_64KEY);
    }
}
