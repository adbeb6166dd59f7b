use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product as seen by a document position. Only the base unit is needed to
/// derive a position's default given unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub number: String,
    pub unit: String,
}

impl Product {
    pub fn new(id: Uuid, number: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id,
            number: number.into(),
            unit: unit.into(),
        }
    }
}

/// Warehouse location a document moves stock from or to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub number: String,
}

impl Location {
    pub fn new(id: Uuid, number: impl Into<String>) -> Self {
        Self {
            id,
            number: number.into(),
        }
    }
}

/// User recorded as the author of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub login: String,
}

impl User {
    pub fn new(id: Uuid, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
        }
    }
}
