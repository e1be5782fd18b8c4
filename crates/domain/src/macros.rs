//! Macro for implementing Display and FromStr for small domain enums
//!
//! Catalog fields and hierarchy levels travel as strings through SQL column
//! selectors, log fields and config values. This macro keeps the mapping in
//! one place and parses case-insensitively.
//!
//! # Example
//!
//! ```rust
//! use carindex_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Enumerate,
//!     Persist,
//! }
//!
//! impl_domain_status_conversions!(Phase {
//!     Enumerate => "enumerate",
//!     Persist => "persist",
//! });
//!
//! assert_eq!(Phase::Persist.to_string(), "persist");
//! assert_eq!("ENUMERATE".parse::<Phase>().unwrap(), Phase::Enumerate);
//! ```

/// Implements Display and FromStr traits for domain enums
///
/// - Display writes the mapped string
/// - FromStr parses case-insensitive strings back to variants and reports
///   the enum name on failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
