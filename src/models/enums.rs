use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Gender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

str_enum!(EverMarried {
    Yes => "Yes",
    No => "No",
});

str_enum!(ResidenceType {
    Urban => "Urban",
    Rural => "Rural",
});

str_enum!(MirrorOp {
    Upsert => "upsert",
    Delete => "delete",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn gender_round_trip() {
        for (variant, s) in [
            (Gender::Male, "Male"),
            (Gender::Female, "Female"),
            (Gender::Other, "Other"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Gender::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn residence_type_round_trip() {
        for (variant, s) in [(ResidenceType::Urban, "Urban"), (ResidenceType::Rural, "Rural")] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ResidenceType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn serde_uses_dataset_spelling() {
        let json = serde_json::to_string(&EverMarried::Yes).unwrap();
        assert_eq!(json, "\"Yes\"");
        let parsed: Gender = serde_json::from_str("\"Female\"").unwrap();
        assert_eq!(parsed, Gender::Female);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Gender::from_str("male").is_err());
        assert!(EverMarried::from_str("").is_err());
        assert!(MirrorOp::from_str("insert").is_err());
    }
}
