use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an opaque identifier newtype.
///
/// Identifiers are stable strings handed to us by the persistence layer
/// (usually UUIDs); nothing in this crate generates them.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Identity of a rally event
    RallyId
);

opaque_id!(
    /// Identity of a special stage within a rally
    StageId
);

opaque_id!(
    /// Globally stable competitor identity (crew entry)
    CompetitorId
);
