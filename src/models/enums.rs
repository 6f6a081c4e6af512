use serde::{Deserialize, Serialize};

/// A string did not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: '{value}'")]
pub struct InvalidEnumValue {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serialized form is the same string `as_str` returns.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnumValue {
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
    Male => "male",
    Female => "female",
});

str_enum!(LabStatus {
    Normal => "normal",
    High => "high",
    Low => "low",
    Critical => "critical",
});

str_enum!(LabCategory {
    Blood => "blood",
    Lipid => "lipid",
    Liver => "liver",
    Kidney => "kidney",
    Metabolic => "metabolic",
});

str_enum!(TrendStatus {
    Normal => "normal",
    High => "high",
    Low => "low",
});

impl Default for LabStatus {
    fn default() -> Self {
        Self::Normal
    }
}

impl Default for LabCategory {
    fn default() -> Self {
        Self::Blood
    }
}
