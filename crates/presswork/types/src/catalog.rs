//! Master reference data
//!
//! Routine lookup data maintained by administrators. One shape covers all
//! kinds; the name is unique within a kind.

use crate::ReferenceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Material,
    Machine,
    Mold,
    Supplier,
    Knife,
    Carton,
    Core,
    RollDirection,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Material => "Material",
            ReferenceKind::Machine => "Machine",
            ReferenceKind::Mold => "Mold",
            ReferenceKind::Supplier => "Supplier",
            ReferenceKind::Knife => "Knife",
            ReferenceKind::Carton => "Carton",
            ReferenceKind::Core => "Core",
            ReferenceKind::RollDirection => "RollDirection",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Material" => Some(ReferenceKind::Material),
            "Machine" => Some(ReferenceKind::Machine),
            "Mold" => Some(ReferenceKind::Mold),
            "Supplier" => Some(ReferenceKind::Supplier),
            "Knife" => Some(ReferenceKind::Knife),
            "Carton" => Some(ReferenceKind::Carton),
            "Core" => Some(ReferenceKind::Core),
            "RollDirection" => Some(ReferenceKind::RollDirection),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One master data record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: ReferenceId,
    pub kind: ReferenceKind,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceItem {
    pub fn new(kind: ReferenceKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ReferenceId::generate(),
            kind,
            name: name.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
