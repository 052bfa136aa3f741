//! Macro for implementing Display and FromStr for keyword enums
//!
//! Configuration values and platform event names are plain keywords. This
//! macro maps each variant to its canonical keyword, parses
//! case-insensitively and always prints the canonical spelling.
//!
//! # Example
//!
//! ```rust
//! use portal_auth_domain::impl_keyword_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Grant {
//!     AuthorizationCode,
//!     RefreshToken,
//! }
//!
//! impl_keyword_conversions!(Grant {
//!     AuthorizationCode => "authorization_code",
//!     RefreshToken => "refresh_token",
//! });
//!
//! assert_eq!("REFRESH_TOKEN".parse::<Grant>().unwrap(), Grant::RefreshToken);
//! assert_eq!(Grant::AuthorizationCode.to_string(), "authorization_code");
//! ```

/// Implements Display and FromStr for keyword enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical keyword
#[macro_export]
macro_rules! impl_keyword_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical keyword for this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestEvent {
        Install,
        Uninstall,
    }

    impl_keyword_conversions!(TestEvent {
        Install => "ONAPPINSTALL",
        Uninstall => "ONAPPUNINSTALL",
    });

    #[test]
    fn test_display_uses_canonical_keyword() {
        assert_eq!(TestEvent::Install.to_string(), "ONAPPINSTALL");
        assert_eq!(TestEvent::Uninstall.as_str(), "ONAPPUNINSTALL");
    }

    #[test]
    fn test_fromstr_any_case() {
        assert_eq!(TestEvent::from_str("onappinstall").unwrap(), TestEvent::Install);
        assert_eq!(TestEvent::from_str("OnAppUninstall").unwrap(), TestEvent::Uninstall);
        assert_eq!(TestEvent::from_str(" ONAPPINSTALL ").unwrap(), TestEvent::Install);
    }

    mod with_result_alias {
        use crate::Result;

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Mode {
            Strict,
        }

        impl_keyword_conversions!(Mode {
            Strict => "strict",
        });

        pub fn parse(raw: &str) -> Result<Mode> {
            raw.parse().map_err(crate::PortalAuthError::Config)
        }
    }

    #[test]
    fn test_expands_next_to_domain_result_alias() {
        assert_eq!(with_result_alias::parse("STRICT").unwrap(), with_result_alias::Mode::Strict);
        assert!(with_result_alias::parse("loose").is_err());
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = TestEvent::from_str("ONCRMDEALADD");
        assert!(result.unwrap_err().contains("Invalid TestEvent: ONCRMDEALADD"));
        assert!(TestEvent::from_str("").is_err());
    }
}
