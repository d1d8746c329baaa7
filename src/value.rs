//! String-backed enumerations
//!
//! The API reports statuses and categories as plain string tokens and adds
//! new ones without notice. [`string_value!`] generates a newtype over the raw
//! token with named constants for the tokens we know about. Any other token
//! still decodes, compares by its text and serializes back unchanged.

/// Declare a string-backed enumeration.
///
/// ```ignore
/// string_value! {
///     /// Power state
///     pub struct Power {
///         ON = "on",
///         OFF = "off",
///     }
/// }
/// ```
macro_rules! string_value {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$cmeta:meta])* $konst:ident = $token:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(::std::borrow::Cow<'static, str>);

        impl $name {
            $(
                $(#[$cmeta])*
                pub const $konst: $name = $name(::std::borrow::Cow::Borrowed($token));
            )*

            /// Tokens with a named constant
            pub const KNOWN: &'static [&'static str] = &[$($token),*];

            /// Wrap a raw wire token. Never fails.
            pub fn new(token: impl Into<String>) -> Self {
                let token = token.into();
                match Self::KNOWN.iter().find(|known| **known == token) {
                    Some(known) => $name(::std::borrow::Cow::Borrowed(*known)),
                    None => $name(::std::borrow::Cow::Owned(token)),
                }
            }

            /// The wire token
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether this token has a named constant
            pub fn is_known(&self) -> bool {
                Self::KNOWN.contains(&self.as_str())
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::convert::Infallible;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                Ok(Self::new(s))
            }
        }

        impl From<&str> for $name {
            fn from(token: &str) -> Self {
                Self::new(token)
            }
        }

        impl From<String> for $name {
            fn from(token: String) -> Self {
                Self::new(token)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<Self, D::Error> {
                let token = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::new(token))
            }
        }
    };
}

pub(crate) use string_value;

string_value! {
    /// Remote authorization scope an operation requires.
    ///
    /// Informational only; the server enforces it.
    pub struct Scope {
        WEBINTERFACE_GENERAL_CONTROL = "ROLE_WEBINTERFACE_GENERAL_CONTROL",
        WEBINTERFACE_FTP_CREDENTIALS_WRITE = "ROLE_WEBINTERFACE_FTP_CREDENTIALS_WRITE",
        WEBINTERFACE_MYSQL_CREDENTIALS_WRITE = "ROLE_WEBINTERFACE_MYSQL_CREDENTIALS_WRITE",
        GAMESERVER_CHANGE_GAME = "ROLE_GAMESERVER_CHANGE_GAME",
        SUPPORT_AUTHORIZATION = "ROLE_SUPPORT_AUTHORIZATION",
    }
}
