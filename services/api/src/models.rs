//! API models for stored records and request/response payloads

use thiserror::Error;

/// Defines a lowercase string-backed enum with `as_str`, `Display` and
/// `FromStr`, serialized the same way it is stored.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Storage and wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::models::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::models::ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod application;
pub mod deal;
pub mod event;
pub mod package;
pub mod user;

pub use application::{ApplicationStatus, NewSponsorApplication, SponsorApplication};
pub use deal::{
    ChatMessage, Deal, DealStatus, DealView, NewDeal, NewNegotiation, Negotiation,
    SendMessageRequest, StatusChange, UpdateStatusRequest,
};
pub use event::{
    CreateEventRequest, Event, EventCategory, EventChanges, EventStatus, NewEvent,
    UpdateEventRequest,
};
pub use package::{
    CreatePackagesRequest, NewPackage, Package, PackageInput, PackageInterest, PackageStatus,
};
pub use user::{LoginRequest, NewUser, Role, SignupRequest, User, UserDetails, UserSummary};

/// Raised when a string does not name a known enum value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_is_case_insensitive_and_trims() {
        assert_eq!(" Sponsor ".parse::<Role>(), Ok(Role::Sponsor));
        assert_eq!("NEGOTIATING".parse::<DealStatus>(), Ok(DealStatus::Negotiating));
    }

    #[test]
    fn unknown_values_name_the_kind() {
        let err = "paused".parse::<DealStatus>().unwrap_err();
        assert_eq!(err.kind, "deal status");
        assert_eq!(err.to_string(), "invalid deal status: \"paused\"");
    }

    #[test]
    fn wire_format_matches_storage_format() {
        for status in DealStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.as_str().to_string()));
        }
    }
}
