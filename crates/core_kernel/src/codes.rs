//! Code-valued enums
//!
//! Statuses, types and actions travel as upper-case codes in JSON and in
//! text columns. `code_enum!` declares such an enum once and derives the
//! serde names, `as_str`, `Display` and `FromStr` from the same table.

use thiserror::Error;

/// A stored or submitted code that does not name any variant
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind} code: {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: String,
}

#[macro_export]
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $code)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $code ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::codes::UnknownCode;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $code => Ok($name::$variant), )+
                    other => Err($crate::codes::UnknownCode {
                        kind: stringify!($name),
                        code: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    code_enum! {
        enum Light {
            Red => "RED",
            Green => "GREEN",
        }
    }

    #[test]
    fn test_round_trips_through_text() {
        for light in Light::ALL {
            assert_eq!(light.as_str().parse::<Light>().unwrap(), *light);
        }
    }

    #[test]
    fn test_unknown_code_names_kind() {
        let err = "BLUE".parse::<Light>().unwrap_err();
        assert_eq!(err.kind, "Light");
        assert_eq!(err.code, "BLUE");
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Light::Green).unwrap(), "\"GREEN\"");
    }
}
