use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::{
    position::Position,
    record_errors::{ErrorMessage, RecordErrors},
    references::{Location, User},
};

/// Kind of warehouse movement a document records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
    #[sea_orm(string_value = "receipt")]
    Receipt,
    #[sea_orm(string_value = "internal_inbound")]
    InternalInbound,
    #[sea_orm(string_value = "internal_outbound")]
    InternalOutbound,
    #[sea_orm(string_value = "release")]
    Release,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "return")]
    Return,
}

impl DocumentType {
    /// Types that bring stock into `location_to`.
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            DocumentType::Receipt
                | DocumentType::InternalInbound
                | DocumentType::Return
                | DocumentType::Transfer
        )
    }

    pub fn requires_location_to(&self) -> bool {
        self.is_inbound()
    }

    pub fn requires_location_from(&self) -> bool {
        matches!(
            self,
            DocumentType::InternalOutbound | DocumentType::Release | DocumentType::Transfer
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentState {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "accepted")]
    Accepted,
}

/// A warehouse movement record with its ordered positions.
///
/// Documents are transient until a builder persists them; `id` stays `None`
/// until the store accepts the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<Uuid>,
    pub document_type: Option<DocumentType>,
    pub state: DocumentState,
    pub location_from: Option<Location>,
    pub location_to: Option<Location>,
    pub user_id: Uuid,
    pub time: DateTime<Utc>,
    /// Extra fields set by extending modules, persisted as JSON.
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    errors: RecordErrors,
}

impl Document {
    /// New draft authored by `user`, stamped with the current time.
    pub fn draft(user: &User) -> Self {
        Self {
            id: None,
            document_type: None,
            state: DocumentState::Draft,
            location_from: None,
            location_to: None,
            user_id: user.id,
            time: Utc::now(),
            attributes: Map::new(),
            positions: Vec::new(),
            errors: RecordErrors::default(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.state == DocumentState::Accepted
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_valid()
    }

    pub fn set_not_valid(&mut self) {
        self.errors.set_not_valid();
    }

    pub fn add_global_error(&mut self, message: impl Into<String>, auto_close: bool, vars: Vec<String>) {
        self.errors.add_global_error(message, auto_close, vars);
    }

    pub fn add_field_error(&mut self, field: impl Into<String>, error: ErrorMessage) {
        self.errors.add_field_error(field, error);
    }

    pub fn errors(&self) -> &RecordErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut RecordErrors {
        &mut self.errors
    }

    /// Copies every message of `errors` into this document's global errors.
    pub fn absorb_errors(&mut self, errors: &RecordErrors) {
        for error in errors.messages() {
            self.errors
                .add_global_error(error.message.clone(), error.auto_close, error.vars.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn user() -> User {
        User::new(Uuid::new_v4(), "admin")
    }

    #[test]
    fn draft_starts_empty_and_valid() {
        let author = user();
        let document = Document::draft(&author);

        assert_eq!(document.state, DocumentState::Draft);
        assert_eq!(document.document_type, None);
        assert_eq!(document.user_id, author.id);
        assert!(document.positions.is_empty());
        assert!(document.is_valid());
        assert!(document.time <= Utc::now());
    }

    #[test]
    fn absorb_errors_copies_field_messages_as_global() {
        let mut document = Document::draft(&user());
        let mut errors = RecordErrors::default();
        errors.add_field_error("quantity", ErrorMessage::new("must be positive"));
        errors.add_global_error("position rejected", false, vec!["7".into()]);

        document.absorb_errors(&errors);

        let messages: Vec<_> = document
            .errors()
            .global_errors()
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(messages, vec!["position rejected", "must be positive"]);
        assert!(!document.is_valid());
    }

    #[test]
    fn document_type_round_trips_through_strings() {
        for (text, kind) in [
            ("receipt", DocumentType::Receipt),
            ("internal_outbound", DocumentType::InternalOutbound),
            ("return", DocumentType::Return),
        ] {
            assert_eq!(DocumentType::from_str(text).unwrap(), kind);
            assert_eq!(kind.to_string(), text);
        }
    }

    #[test]
    fn location_requirements_follow_movement_direction() {
        assert!(DocumentType::Transfer.requires_location_to());
        assert!(DocumentType::Transfer.requires_location_from());
        assert!(DocumentType::Receipt.requires_location_to());
        assert!(!DocumentType::Receipt.requires_location_from());
        assert!(DocumentType::Release.requires_location_from());
        assert!(!DocumentType::Release.requires_location_to());
    }
}
