//! The structured output unit
//!
//! Field names on the wire follow the sink contract (`telefone`, `titulo`,
//! `preco`, ...). Every text field is always present; unavailable values are
//! empty strings.

use serde::{Deserialize, Serialize};

/// Fields read from a detail page by the extraction engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: String,
    pub price: String,
    pub description: String,
    pub city: String,
    pub year: String,
    pub mileage: String,
    pub model: String,
    pub seller: String,
}

/// One item, as handed to the output sink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,

    #[serde(rename = "telefone")]
    pub phone: String,

    #[serde(rename = "titulo")]
    pub title: String,

    #[serde(rename = "preco")]
    pub price: String,

    #[serde(rename = "descricao")]
    pub description: String,

    #[serde(rename = "cidade")]
    pub city: String,

    #[serde(rename = "ano")]
    pub year: String,

    #[serde(rename = "km")]
    pub mileage: String,

    #[serde(rename = "modelo")]
    pub model: String,

    #[serde(rename = "vendedor")]
    pub seller: String,

    #[serde(rename = "particular")]
    pub is_private_seller: bool,
}

impl Record {
    /// Assembles a record from extracted fields plus the per-request values
    pub fn assemble(
        url: &str,
        phone: String,
        fields: ExtractedFields,
        is_private_seller: bool,
    ) -> Self {
        Self {
            url: url.to_string(),
            phone,
            title: fields.title,
            price: fields.price,
            description: fields.description,
            city: fields.city,
            year: fields.year,
            mileage: fields.mileage,
            model: fields.model,
            seller: fields.seller,
            is_private_seller,
        }
    }
}
