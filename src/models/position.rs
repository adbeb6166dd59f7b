use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{
    record_errors::{ErrorMessage, RecordErrors},
    references::Product,
};

/// One line of a document.
///
/// `quantity` is expressed in the product's base unit; `given_quantity` and
/// `given_unit` keep what the user actually entered, related to the base
/// unit by `conversion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_position_dates"))]
pub struct Position {
    pub id: Option<Uuid>,
    /// Owning document, bound when the document is saved
    pub document_id: Option<Uuid>,
    /// 1-based order within the owning document
    pub number: Option<i32>,
    pub product: Product,
    #[validate(custom = "validate_quantity")]
    pub quantity: Decimal,
    #[validate(custom = "validate_given_quantity")]
    pub given_quantity: Option<Decimal>,
    #[validate(length(max = 255, message = "Given unit cannot exceed 255 characters"))]
    pub given_unit: Option<String>,
    #[validate(custom = "validate_conversion")]
    pub conversion: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub price: Option<Decimal>,
    #[validate(length(max = 255, message = "Batch cannot exceed 255 characters"))]
    pub batch: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub resource_id: Option<Uuid>,
    pub storage_location_id: Option<Uuid>,
    pub pallet_number_id: Option<Uuid>,
    #[validate(length(max = 255, message = "Pallet type cannot exceed 255 characters"))]
    pub type_of_pallet: Option<String>,
    pub additional_code_id: Option<Uuid>,
    #[serde(default)]
    pub waste: bool,
    #[serde(default)]
    errors: RecordErrors,
}

impl Position {
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

    /// Field and cross-field rules, plus the owning document check.
    pub fn rule_errors(&self) -> RecordErrors {
        let mut errors = match self.validate() {
            Ok(()) => RecordErrors::default(),
            Err(errors) => RecordErrors::from(errors),
        };
        if self.document_id.is_none() {
            errors.add_field_error("document_id", ErrorMessage::new("Position must belong to a document"));
        }
        errors
    }
}

fn positive(value: &Decimal, code: &'static str, message: &'static str) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new(code);
        err.message = Some(message.into());
        return Err(err);
    }
    Ok(())
}

fn validate_quantity(value: &Decimal) -> Result<(), ValidationError> {
    positive(value, "quantity_positive", "Quantity must be positive")
}

fn validate_given_quantity(value: &Decimal) -> Result<(), ValidationError> {
    positive(value, "given_quantity_positive", "Given quantity must be positive")
}

fn validate_conversion(value: &Decimal) -> Result<(), ValidationError> {
    positive(value, "conversion_positive", "Conversion must be positive")
}

fn validate_not_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("not_negative");
        err.message = Some("Value cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_position_dates(position: &Position) -> Result<(), ValidationError> {
    if let (Some(produced), Some(expires)) = (position.production_date, position.expiration_date) {
        if expires < produced {
            let mut err = ValidationError::new("expiration_before_production");
            err.message = Some("Expiration date cannot be earlier than production date".into());
            return Err(err);
        }
    }
    Ok(())
}

/// Input for a new position. Every attribute except product and quantity is
/// optional; unset attributes stay empty on the created position.
///
/// Product and quantity are optional here only so that requests coming from
/// outside (JSON, CLI) can be rejected with an argument error instead of
/// failing to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionDraft {
    pub product: Option<Product>,
    /// Quantity in the product's base unit
    pub quantity: Option<Decimal>,
    /// Quantity as entered; defaults to `quantity`
    pub given_quantity: Option<Decimal>,
    /// Unit of `given_quantity`; defaults to the product unit
    pub given_unit: Option<String>,
    /// Factor converting the given unit into the base unit
    pub conversion: Option<Decimal>,
    /// Unit price, used when resources are created from the position
    pub price: Option<Decimal>,
    pub batch: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    /// Resource to take stock from, for outbound documents on locations
    /// with a manual picking algorithm
    pub resource_id: Option<Uuid>,
    pub storage_location_id: Option<Uuid>,
    pub pallet_number_id: Option<Uuid>,
    pub type_of_pallet: Option<String>,
    pub additional_code_id: Option<Uuid>,
    /// Marks the moved stock as waste
    pub waste: bool,
}

impl PositionDraft {
    pub fn new(product: Product, quantity: Decimal) -> Self {
        Self {
            product: Some(product),
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }

    pub fn with_dates(mut self, production: Option<NaiveDate>, expiration: Option<NaiveDate>) -> Self {
        self.production_date = production;
        self.expiration_date = expiration;
        self
    }

    pub fn with_resource(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_given(mut self, quantity: Decimal, unit: impl Into<String>, conversion: Decimal) -> Self {
        self.given_quantity = Some(quantity);
        self.given_unit = Some(unit.into());
        self.conversion = Some(conversion);
        self
    }

    pub fn with_storage_location(mut self, storage_location_id: Uuid) -> Self {
        self.storage_location_id = Some(storage_location_id);
        self
    }

    pub fn with_pallet(mut self, pallet_number_id: Uuid, type_of_pallet: impl Into<String>) -> Self {
        self.pallet_number_id = Some(pallet_number_id);
        self.type_of_pallet = Some(type_of_pallet.into());
        self
    }

    pub fn with_additional_code(mut self, additional_code_id: Uuid) -> Self {
        self.additional_code_id = Some(additional_code_id);
        self
    }

    pub fn as_waste(mut self) -> Self {
        self.waste = true;
        self
    }

    /// Turns the draft into an unsaved position, applying unit defaults.
    /// Returns `None` when product or quantity is missing.
    pub fn into_position(self) -> Option<Position> {
        let product = self.product?;
        let quantity = self.quantity?;
        let given_unit = self.given_unit.or_else(|| Some(product.unit.clone()));

        Some(Position {
            id: None,
            document_id: None,
            number: None,
            given_quantity: self.given_quantity.or(Some(quantity)),
            given_unit,
            conversion: self.conversion,
            price: self.price,
            batch: self.batch,
            production_date: self.production_date,
            expiration_date: self.expiration_date,
            resource_id: self.resource_id,
            storage_location_id: self.storage_location_id,
            pallet_number_id: self.pallet_number_id,
            type_of_pallet: self.type_of_pallet,
            additional_code_id: self.additional_code_id,
            waste: self.waste,
            product,
            quantity,
            errors: RecordErrors::default(),
        })
    }
}
