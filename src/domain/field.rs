use {
    serde::{Deserialize, Serialize},
    strum_macros::{Display, EnumIter, EnumString},
};

/// The two price fields carried per entity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Field {
    Open,
    Close,
}

impl Field {
    pub const COUNT: usize = 2;

    /// Column offset of this field inside an entity's block of an input row.
    #[inline]
    pub fn offset(self) -> usize {
        match self {
            Self::Open => 0,
            Self::Close => 1,
        }
    }
}
