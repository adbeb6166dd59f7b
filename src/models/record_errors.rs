use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single validation message attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
    /// Whether a UI showing this message may dismiss it on its own
    #[serde(default)]
    pub auto_close: bool,
    #[serde(default)]
    pub vars: Vec<String>,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            auto_close: false,
            vars: Vec::new(),
        }
    }

    pub fn with_vars(message: impl Into<String>, vars: Vec<String>) -> Self {
        Self {
            message: message.into(),
            auto_close: false,
            vars,
        }
    }
}

/// Validation state carried by every record the store hands back.
///
/// A record is valid while it has no global or field errors and nobody
/// called [`RecordErrors::set_not_valid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordErrors {
    #[serde(default)]
    global: Vec<ErrorMessage>,
    #[serde(default)]
    fields: BTreeMap<String, ErrorMessage>,
    #[serde(default)]
    not_valid: bool,
}

impl RecordErrors {
    pub fn is_valid(&self) -> bool {
        !self.not_valid && self.global.is_empty() && self.fields.is_empty()
    }

    pub fn set_not_valid(&mut self) {
        self.not_valid = true;
    }

    pub fn add_global_error(&mut self, message: impl Into<String>, auto_close: bool, vars: Vec<String>) {
        self.global.push(ErrorMessage {
            message: message.into(),
            auto_close,
            vars,
        });
    }

    /// Records an error against a field; the first error per field is kept.
    pub fn add_field_error(&mut self, field: impl Into<String>, error: ErrorMessage) {
        self.fields.entry(field.into()).or_insert(error);
    }

    pub fn global_errors(&self) -> &[ErrorMessage] {
        &self.global
    }

    pub fn field_errors(&self) -> &BTreeMap<String, ErrorMessage> {
        &self.fields
    }

    pub fn field_error(&self, field: &str) -> Option<&ErrorMessage> {
        self.fields.get(field)
    }

    /// Every message, global ones first, then field errors in field order.
    pub fn messages(&self) -> impl Iterator<Item = &ErrorMessage> {
        self.global.iter().chain(self.fields.values())
    }

    pub fn clear(&mut self) {
        self.global.clear();
        self.fields.clear();
        self.not_valid = false;
    }
}

impl From<validator::ValidationErrors> for RecordErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut record_errors = RecordErrors::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                let vars = message_vars(error);
                if field == "__all__" {
                    record_errors.add_global_error(message, false, vars);
                } else {
                    record_errors.add_field_error(field, ErrorMessage::with_vars(message, vars));
                }
            }
        }
        record_errors
    }
}

/// Parameter values of a validation error, ordered by parameter name.
fn message_vars(error: &validator::ValidationError) -> Vec<String> {
    let mut params: Vec<_> = error.params.iter().collect();
    params.sort_by(|a, b| a.0.cmp(b.0));
    params
        .into_iter()
        .map(|(_, value)| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_errors_are_valid() {
        assert!(RecordErrors::default().is_valid());
    }

    #[test]
    fn set_not_valid_without_messages_is_invalid() {
        let mut errors = RecordErrors::default();
        errors.set_not_valid();
        assert!(!errors.is_valid());
        assert_eq!(errors.messages().count(), 0);
    }

    #[test]
    fn first_field_error_wins() {
        let mut errors = RecordErrors::default();
        errors.add_field_error("quantity", ErrorMessage::new("first"));
        errors.add_field_error("quantity", ErrorMessage::new("second"));
        assert_eq!(errors.field_error("quantity").unwrap().message, "first");
        assert!(!errors.is_valid());
    }

    #[test]
    fn messages_list_global_before_fields() {
        let mut errors = RecordErrors::default();
        errors.add_field_error("batch", ErrorMessage::new("too long"));
        errors.add_global_error("document broken", true, vec![]);
        let messages: Vec<_> = errors.messages().map(|m| m.message.as_str()).collect();
        assert_eq!(messages, vec!["document broken", "too long"]);
    }

    #[test]
    fn clear_restores_validity() {
        let mut errors = RecordErrors::default();
        errors.add_global_error("x", false, vec![]);
        errors.set_not_valid();
        errors.clear();
        assert!(errors.is_valid());
    }

    #[test]
    fn validation_params_become_message_vars() {
        let mut error = validator::ValidationError::new("length");
        error.message = Some("Batch cannot exceed 255 characters".into());
        error.add_param("max".into(), &255);
        error.add_param("value".into(), &"B-000");
        let mut errors = validator::ValidationErrors::new();
        errors.add("batch", error);

        let record_errors = RecordErrors::from(errors);

        assert_eq!(
            record_errors.field_error("batch").unwrap().vars,
            vec!["255".to_string(), "B-000".to_string()]
        );
    }
}
