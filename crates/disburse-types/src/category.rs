//! Income categories.
//!
//! The wire representation is a small integer (`0..=4`). Out-of-range values
//! are rejected at the boundary and never reach the distribution engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TypeError;

/// Classification of an income deposit; selects its split policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Proxy = 0,
    Standard = 1,
    Extra = 2,
    Natural = 3,
    Base = 4,
}

impl Category {
    /// Every category, in batch processing order.
    pub const ALL: [Category; 5] = [
        Category::Proxy,
        Category::Standard,
        Category::Extra,
        Category::Natural,
        Category::Base,
    ];

    /// Integer discriminant.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Proxy => "proxy",
            Category::Standard => "standard",
            Category::Extra => "extra",
            Category::Natural => "natural",
            Category::Base => "base",
        }
    }
}

impl TryFrom<u8> for Category {
    type Error = TypeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Category::ALL
            .get(code as usize)
            .copied()
            .ok_or(TypeError::InvalidCategory(code))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
