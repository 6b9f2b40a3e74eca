//! Create/edit form over a single field set.
use thiserror::Error;

use crate::model::{quantity_number, Product, ProductPayload};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name and description are required.")]
    MissingText,
    #[error("Price must be a positive number.")]
    InvalidPrice,
    #[error("Quantity must be a positive integer.")]
    InvalidQuantity,
    #[error("ID must be a positive integer.")]
    InvalidId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Create,
    Editing {
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Name,
    Description,
    Price,
    Quantity,
}

impl Field {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Some(Field::Id),
            "name" => Some(Field::Name),
            "description" | "desc" => Some(Field::Description),
            "price" => Some(Field::Price),
            "quantity" | "qty" => Some(Field::Quantity),
            _ => None,
        }
    }
}

/// Raw text of the form inputs, exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: String,
}

impl Draft {
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            quantity: product.quantity.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Draft::default()
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let n = raw.trim().parse::<f64>().ok()?;
    n.is_finite().then_some(n)
}

#[derive(Debug, Default)]
pub struct Form {
    mode: FormMode,
    draft: Draft,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// The id input only exists while creating.
    pub fn id_field_visible(&self) -> bool {
        self.mode == FormMode::Create
    }

    /// Set one input. Returns false (and changes nothing) when the field is
    /// not editable in the current mode.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> bool {
        let value = value.into();
        match field {
            Field::Id if !self.id_field_visible() => return false,
            Field::Id => self.draft.id = value,
            Field::Name => self.draft.name = value,
            Field::Description => self.draft.description = value,
            Field::Price => self.draft.price = value,
            Field::Quantity => self.draft.quantity = value,
        }
        true
    }

    pub fn start_edit(&mut self, product: &Product) {
        self.draft = Draft::from_product(product);
        self.mode = FormMode::Editing { id: product.id };
    }

    /// Back to an empty create form. Used for cancel and after a successful submit.
    pub fn reset(&mut self) {
        self.draft = Draft::default();
        self.mode = FormMode::Create;
    }

    /// Check the draft and build the request body. Pure.
    pub fn validate(&self) -> Result<ProductPayload, ValidationError> {
        let d = &self.draft;
        if d.name.trim().is_empty() || d.description.trim().is_empty() {
            return Err(ValidationError::MissingText);
        }
        let price = parse_number(&d.price)
            .filter(|p| *p >= 0.0)
            .ok_or(ValidationError::InvalidPrice)?;
        let quantity = parse_number(&d.quantity)
            .filter(|q| *q >= 0.0)
            .ok_or(ValidationError::InvalidQuantity)?;

        let id = match self.mode {
            FormMode::Editing { .. } => None,
            FormMode::Create if d.id.trim().is_empty() => None,
            FormMode::Create => {
                let id = d
                    .id
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ValidationError::InvalidId)?;
                if id < 1 {
                    return Err(ValidationError::InvalidId);
                }
                Some(id)
            }
        };

        Ok(ProductPayload {
            name: d.name.clone(),
            description: d.description.clone(),
            price,
            quantity: quantity_number(quantity),
            id,
        })
    }
}
