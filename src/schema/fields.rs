//! Recognized top-level system fields that a query filter may reference.

use std::fmt;

/// Value type stored under a filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    /// 64-bit integer, possibly wrapped as `{"$numberLong": "..."}`
    Integer,
    Real,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Real => write!(f, "real"),
        }
    }
}

/// Filterable field definition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// Dotted document path, e.g. `controllingFaction.name`
    pub path: &'static str,
    pub field_type: FieldType,
    /// Field holds an array; a predicate matches when any element does
    pub multi: bool,
    pub description: &'static str,
}

impl FieldSchema {
    pub const fn text(path: &'static str, description: &'static str) -> Self {
        Self {
            path,
            field_type: FieldType::Text,
            multi: false,
            description,
        }
    }

    pub const fn integer(path: &'static str, description: &'static str) -> Self {
        Self {
            path,
            field_type: FieldType::Integer,
            multi: false,
            description,
        }
    }

    pub const fn real(path: &'static str, description: &'static str) -> Self {
        Self {
            path,
            field_type: FieldType::Real,
            multi: false,
            description,
        }
    }

    /// Mark the field as array-valued
    pub const fn array(self) -> Self {
        Self {
            multi: true,
            ..self
        }
    }

    /// Path split into its segments
    pub fn segments(&self) -> impl Iterator<Item = &'static str> {
        self.path.split('.')
    }
}

pub static SYSTEM_FIELDS: &[FieldSchema] = &[
    FieldSchema::integer("id64", "64-bit system address"),
    FieldSchema::text("name", "System name"),
    FieldSchema::text("allegiance", "System allegiance"),
    FieldSchema::text("government", "System government"),
    FieldSchema::text("primaryEconomy", "Primary economy"),
    FieldSchema::text("secondaryEconomy", "Secondary economy"),
    FieldSchema::text("security", "Security level"),
    FieldSchema::integer("population", "Population"),
    FieldSchema::integer("bodyCount", "Number of bodies"),
    FieldSchema::text("controllingFaction.name", "Controlling minor faction"),
    FieldSchema::text("controllingFaction.government", "Controlling faction government"),
    FieldSchema::text("controllingFaction.allegiance", "Controlling faction allegiance"),
    FieldSchema::text("factions.name", "Any present minor faction").array(),
    FieldSchema::text("controllingPower", "Power holding the system"),
    FieldSchema::text("powerState", "Powerplay control phase"),
    FieldSchema::real("powerStateControlProgress", "Control progress"),
    FieldSchema::integer("powerStateReinforcement", "Reinforcement merits"),
    FieldSchema::integer("powerStateUndermining", "Undermining merits"),
    FieldSchema::text("powers", "Any power present in the system").array(),
];

/// Look up a filterable field by its dotted path
pub fn get_field(path: &str) -> Option<&'static FieldSchema> {
    SYSTEM_FIELDS.iter().find(|f| f.path == path)
}

/// All filterable field paths, in declaration order
pub fn field_names() -> impl Iterator<Item = &'static str> {
    SYSTEM_FIELDS.iter().map(|f| f.path)
}
