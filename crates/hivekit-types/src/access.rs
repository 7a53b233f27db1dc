//! Access-right and notification-filter bit sets.
//!
//! Bit values match the native store API so that masks can be logged and
//! compared against platform documentation without translation.

use bitflags::bitflags;

bitflags! {
    /// Rights requested when opening or creating a node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AccessMask: u32 {
        /// Read values.
        const QUERY_VALUE = 0x0001;
        /// Create, overwrite and delete values.
        const SET_VALUE = 0x0002;
        /// Create child nodes.
        const CREATE_SUB_KEY = 0x0004;
        /// Enumerate child nodes.
        const ENUMERATE_SUB_KEYS = 0x0008;
        /// Subscribe to change notifications.
        const NOTIFY = 0x0010;
        /// Create symbolic links (accepted, never exercised).
        const CREATE_LINK = 0x0020;
        /// Operate on the 64-bit view regardless of the caller's bitness.
        const WOW64_64KEY = 0x0100;
        /// Operate on the 32-bit view regardless of the caller's bitness.
        const WOW64_32KEY = 0x0200;
        /// Delete the node itself.
        const DELETE = 0x0001_0000;

        const READ = Self::QUERY_VALUE.bits()
            | Self::ENUMERATE_SUB_KEYS.bits()
            | Self::NOTIFY.bits();
        const WRITE = Self::SET_VALUE.bits() | Self::CREATE_SUB_KEY.bits();
        const ALL_ACCESS = Self::READ.bits()
            | Self::WRITE.bits()
            | Self::CREATE_LINK.bits()
            | Self::DELETE.bits();
        const VIEW_MASK = Self::WOW64_32KEY.bits() | Self::WOW64_64KEY.bits();
    }
}

impl AccessMask {
    /// The mask with any view-selection bits stripped.
    pub fn rights(self) -> Self {
        self.difference(Self::VIEW_MASK)
    }

    /// Returns `true` if every right in `required` is present.
    pub fn allows(self, required: AccessMask) -> bool {
        self.rights().contains(required.rights())
    }
}

bitflags! {
    /// Which kinds of change satisfy a notification subscription.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NotifyFilter: u32 {
        /// A child node was added or removed.
        const CHANGE_NAME = 0x0001;
        /// Attributes of the node changed.
        const CHANGE_ATTRIBUTES = 0x0002;
        /// A value was written or deleted.
        const CHANGE_LAST_SET = 0x0004;
        /// The node's security descriptor changed.
        const CHANGE_SECURITY = 0x0008;
    }
}
