//! Branded ID newtypes for type safety.
//!
//! Stations, lines, and routes are identified by opaque non-empty strings
//! assigned by the network layout feed. Each gets its own newtype so a line
//! ID cannot be passed where a station ID is expected. Equality is string
//! equality.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the ID is the empty sentinel (e.g. the self-step of a
            /// same-station travel route).
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a station.
    StationId
}

branded_id! {
    /// Unique identifier for a line.
    LineId
}

branded_id! {
    /// Unique identifier for a route. Unique across all lines.
    RouteId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_string_equality() {
        assert_eq!(StationId::from("station_a"), StationId::from("station_a"));
        assert_ne!(StationId::from("station_a"), StationId::from("station_b"));
    }

    #[test]
    fn display_prints_inner() {
        let id = LineId::from("victoria");
        assert_eq!(id.to_string(), "victoria");
    }

    #[test]
    fn serde_is_transparent() {
        let id = RouteId::from("route-001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""route-001""#);
        let back: RouteId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn empty_sentinel() {
        assert!(RouteId::default().is_empty());
        assert!(!RouteId::from("r1").is_empty());
    }

    #[test]
    fn usable_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(StationId::from("s1"), 1);
        assert_eq!(map.get(&StationId::from("s1")), Some(&1));
    }
}
