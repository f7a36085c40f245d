pub mod handle;

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::account::Role;

/// Degree programmes offered.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum Degree {
    #[serde(rename = "B.Tech")]
    BTech,
    #[serde(rename = "B.Des")]
    BDes,
    #[serde(rename = "M.Tech")]
    MTech,
    #[serde(rename = "M.Des")]
    MDes,
    #[serde(rename = "PhD")]
    PhD,
}

impl Degree {
    pub const ALL: [Self; 5] = [Self::BTech, Self::BDes, Self::MTech, Self::MDes, Self::PhD];

    /// The name used in forms and in serialized data.
    pub fn name(self) -> &'static str {
        match self {
            Degree::BTech => "B.Tech",
            Degree::BDes => "B.Des",
            Degree::MTech => "M.Tech",
            Degree::MDes => "M.Des",
            Degree::PhD => "PhD",
        }
    }
}

/// Branches (specializations).
///
/// [`Branch::NotApplicable`] is used by programmes without one.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum Branch {
    #[serde(rename = "NA")]
    NotApplicable,
    #[serde(rename = "CSE")]
    Cse,
    #[serde(rename = "ECE")]
    Ece,
    #[serde(rename = "ME")]
    Me,
    #[serde(rename = "MT")]
    Mt,
    #[serde(rename = "NS")]
    Ns,
    #[serde(rename = "DS")]
    Ds,
    #[serde(rename = "SM")]
    Sm,
}

impl Branch {
    pub const ALL: [Self; 8] = [
        Self::NotApplicable,
        Self::Cse,
        Self::Ece,
        Self::Me,
        Self::Mt,
        Self::Ns,
        Self::Ds,
        Self::Sm,
    ];

    /// The name used in forms and in serialized data.
    pub fn name(self) -> &'static str {
        match self {
            Branch::NotApplicable => "NA",
            Branch::Cse => "CSE",
            Branch::Ece => "ECE",
            Branch::Me => "ME",
            Branch::Mt => "MT",
            Branch::Ns => "NS",
            Branch::Ds => "DS",
            Branch::Sm => "SM",
        }
    }
}

/// Error parsing a [`Degree`] or [`Branch`] from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

impl Display for UnknownName {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} \"{}\"", self.kind, self.name)
    }
}

impl std::error::Error for UnknownName {}

/// Implements `Display` and `FromStr` through the `name` method.
macro_rules! impl_named {
    ($($t:ty => $kind:literal),* $(,)?) => {
        $(
            impl Display for $t {
                #[inline]
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.name())
                }
            }

            impl FromStr for $t {
                type Err = UnknownName;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Self::ALL
                        .into_iter()
                        .find(|v| v.name() == s)
                        .ok_or_else(|| UnknownName {
                            kind: $kind,
                            name: s.to_owned(),
                        })
                }
            }
        )*
    };
}

impl_named! {
    Degree => "degree",
    Branch => "branch",
}

/// Public view of a profile.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProfileView {
    pub username: String,
    pub name: String,
    pub role: Role,
    pub programme: Option<Degree>,
    pub branch: Option<Branch>,
    pub year_of_admission: Option<u16>,
    pub batch: Option<u16>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub registration_number: Option<String>,
    pub verified: bool,
}
