//! Shared access signature generation.
//!
//! A SAS grants time-bounded, permission-scoped access to storage resources
//! without handing out the account key. Two scopes exist:
//!
//! - [`AccountSas`]: account level, spanning services and resource types.
//! - [`ServiceSas`]: a single container or blob.
//!
//! Both serialize their descriptors into a fixed-order, newline-joined
//! string-to-sign (the field order differs per scope), HMAC-SHA256-sign it
//! with the base64-decoded account key, and emit an ordered set of short
//! query parameters. Permission, service and resource-type sets always
//! serialize in their documented canonical order, no matter how the caller
//! assembled them, so the output token is deterministic.

mod account;
pub use account::AccountSas;
mod service;
pub use service::ServiceSas;

use std::fmt;
use std::fmt::Display;
use std::ops::BitOr;

/// Signed storage service version stamped into every token.
pub(crate) const SAS_VERSION: &str = "2018-11-09";

/// Protocol filter for a SAS: which schemes may present the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasProtocol {
    /// HTTPS only.
    Https,
    /// HTTPS or HTTP.
    HttpsHttp,
}

impl Display for SasProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SasProtocol::Https => f.write_str("https"),
            SasProtocol::HttpsHttp => f.write_str("https,http"),
        }
    }
}

/// The ordered query parameters produced by signing a SAS descriptor.
///
/// Pairs are emitted in a stable order with the signature (`sig`) last, and
/// values are raw: percent-encoding happens once, when the token is
/// composed onto a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQueryParameters(Vec<(String, String)>);

impl SignedQueryParameters {
    pub(crate) fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn push(&mut self, key: &str, value: impl Into<String>) {
        self.0.push((key.to_string(), value.into()));
    }

    /// The pairs in emission order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// Consume into the underlying pairs.
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.0
    }
}

impl IntoIterator for SignedQueryParameters {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// The flag sets below share one shape: a bit per flag, serialized strictly
// in the documented canonical order regardless of how the set was built.
macro_rules! flag_set {
    (
        $(#[$attr:meta])*
        $name:ident { $($(#[$flag_attr:meta])* $flag:ident = $ch:literal),+ $(,)? }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name {
            bits: u16,
        }

        impl $name {
            flag_set!(@flags 0; $($(#[$flag_attr])* $flag),+);

            /// The empty set.
            pub const fn empty() -> Self {
                Self { bits: 0 }
            }

            /// Whether no flag is set.
            pub const fn is_empty(self) -> bool {
                self.bits == 0
            }

            /// Whether every flag in `other` is set in `self`.
            pub const fn contains(self, other: Self) -> bool {
                self.bits & other.bits == other.bits
            }

            /// Serialize set flags in canonical order.
            pub fn canonical(self) -> String {
                let mut s = String::new();
                let mut bit = 1u16;
                for ch in [$($ch),+] {
                    if self.bits & bit != 0 {
                        s.push(ch);
                    }
                    bit <<= 1;
                }
                s
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self { bits: self.bits | rhs.bits }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.canonical())
            }
        }
    };
    (@flags $idx:expr; $(#[$flag_attr:meta])* $flag:ident) => {
        $(#[$flag_attr])*
        pub const $flag: Self = Self { bits: 1 << $idx };
    };
    (@flags $idx:expr; $(#[$flag_attr:meta])* $flag:ident, $($rest:tt)+) => {
        $(#[$flag_attr])*
        pub const $flag: Self = Self { bits: 1 << $idx };
        flag_set!(@flags $idx + 1; $($rest)+);
    };
}

flag_set! {
    /// Permissions grantable by an account-level SAS.
    ///
    /// Canonical serialization order: `rwdlacup`.
    AccountSasPermissions {
        /// Read resources.
        READ = 'r',
        /// Write resources.
        WRITE = 'w',
        /// Delete resources.
        DELETE = 'd',
        /// List resources within a container.
        LIST = 'l',
        /// Add blocks or messages.
        ADD = 'a',
        /// Create new resources.
        CREATE = 'c',
        /// Update entities or messages.
        UPDATE = 'u',
        /// Process queue messages.
        PROCESS = 'p',
    }
}

flag_set! {
    /// Permissions grantable by a container- or blob-scoped SAS.
    ///
    /// Canonical serialization order: `racwdl`.
    BlobSasPermissions {
        /// Read blob content and properties.
        READ = 'r',
        /// Add blocks to an append blob.
        ADD = 'a',
        /// Create new blobs.
        CREATE = 'c',
        /// Write blob content and properties.
        WRITE = 'w',
        /// Delete blobs.
        DELETE = 'd',
        /// List blobs in the container.
        LIST = 'l',
    }
}

flag_set! {
    /// Storage services an account SAS applies to.
    ///
    /// Canonical serialization order: `bqtf`.
    Services {
        /// Blob service.
        BLOB = 'b',
        /// Queue service.
        QUEUE = 'q',
        /// Table service.
        TABLE = 't',
        /// File service.
        FILE = 'f',
    }
}

flag_set! {
    /// Resource type scopes an account SAS applies to.
    ///
    /// Canonical serialization order: `sco`.
    ResourceTypes {
        /// Service-level APIs (list containers, service properties).
        SERVICE = 's',
        /// Container-level APIs (list blobs, container metadata).
        CONTAINER = 'c',
        /// Object-level APIs (get blob, put blob).
        OBJECT = 'o',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_is_insertion_independent() {
        let a = AccountSasPermissions::WRITE | AccountSasPermissions::READ;
        let b = AccountSasPermissions::READ | AccountSasPermissions::WRITE;
        assert_eq!(a, b);
        assert_eq!(a.canonical(), "rw");
        assert_eq!(b.canonical(), "rw");
    }

    #[test]
    fn test_account_permissions_full_order() {
        let all = AccountSasPermissions::PROCESS
            | AccountSasPermissions::UPDATE
            | AccountSasPermissions::CREATE
            | AccountSasPermissions::ADD
            | AccountSasPermissions::LIST
            | AccountSasPermissions::DELETE
            | AccountSasPermissions::WRITE
            | AccountSasPermissions::READ;
        assert_eq!(all.canonical(), "rwdlacup");
    }

    #[test]
    fn test_blob_permissions_order() {
        let set = BlobSasPermissions::LIST | BlobSasPermissions::READ | BlobSasPermissions::WRITE;
        assert_eq!(set.canonical(), "rwl");
    }

    #[test]
    fn test_services_and_resource_types() {
        let services = Services::FILE | Services::BLOB;
        assert_eq!(services.canonical(), "bf");

        let types = ResourceTypes::OBJECT | ResourceTypes::SERVICE;
        assert_eq!(types.canonical(), "so");
    }

    #[test]
    fn test_empty_and_contains() {
        assert!(AccountSasPermissions::empty().is_empty());
        let set = AccountSasPermissions::READ | AccountSasPermissions::LIST;
        assert!(set.contains(AccountSasPermissions::READ));
        assert!(!set.contains(AccountSasPermissions::WRITE));
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(SasProtocol::Https.to_string(), "https");
        assert_eq!(SasProtocol::HttpsHttp.to_string(), "https,http");
    }
}
