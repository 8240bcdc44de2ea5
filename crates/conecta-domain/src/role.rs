//! Account roles.

use serde::{Deserialize, Serialize};

/// The role an account acts under.
///
/// One person may hold several accounts with the same email, one per role;
/// `(email, role)` is unique. Wire format is the snake_case slug; persistence
/// uses the `i16` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin = 0,
    School = 1,
    Supplier = 2,
    Guardian = 3,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::School, Role::Supplier, Role::Guardian];

    /// Convert from the `i16` column value. Returns `None` for unknown values.
    pub fn from_i16(v: i16) -> Option<Self> {
        match v {
            0 => Some(Self::Admin),
            1 => Some(Self::School),
            2 => Some(Self::Supplier),
            3 => Some(Self::Guardian),
            _ => None,
        }
    }

    /// Convert to the `i16` column value.
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    /// The snake_case wire slug.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::School => "school",
            Self::Supplier => "supplier",
            Self::Guardian => "guardian",
        }
    }

    /// Parse a wire slug. Returns `None` for unknown slugs.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "admin" => Some(Self::Admin),
            "school" => Some(Self::School),
            "supplier" => Some(Self::Supplier),
            "guardian" => Some(Self::Guardian),
            _ => None,
        }
    }

    /// Display label for the profile chooser, in the product language.
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrador",
            Self::School => "Escola",
            Self::Supplier => "Fornecedor",
            Self::Guardian => "Responsável",
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_i16().cmp(&other.as_i16())
    }
}
