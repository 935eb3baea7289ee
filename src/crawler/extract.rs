//! Extraction engine
//!
//! Maps a rendered detail page to the text fields of a record. Extraction
//! never fails: a missing element yields an empty string, and a page whose
//! markup changed simply yields more empty fields.

use crate::accessor::{Locator, RenderedDocument};
use crate::config::{ExtractionConfig, SelectorConfig};
use crate::output::ExtractedFields;

/// Parameter labels recognized in the parameter list
const YEAR_LABEL: &str = "Ano";
const MILEAGE_LABEL: &str = "Quilómetros";
const MODEL_LABEL: &str = "Modelo";

/// Reads every record field from `document`
pub fn extract_fields(
    document: &dyn RenderedDocument,
    selectors: &SelectorConfig,
    extraction: &ExtractionConfig,
) -> ExtractedFields {
    let text = |selector: &String| safe_text(document, &Locator::from(selector));

    let mut fields = ExtractedFields {
        title: text(&selectors.title),
        price: text(&selectors.price),
        description: text(&selectors.description),
        city: city_from_location(&text(&selectors.location), extraction.location_separator),
        seller: text(&selectors.seller),
        ..Default::default()
    };

    for line in document.texts(&Locator::from(&selectors.parameters)) {
        apply_parameter_line(&mut fields, &line);
    }

    fields
}

/// Trimmed text of the first match, or an empty string
fn safe_text(document: &dyn RenderedDocument, target: &Locator) -> String {
    document
        .text(target)
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Portion of a "city - date" field before the first separator
pub fn city_from_location(location: &str, separator: char) -> String {
    location
        .split(separator)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Sets year, mileage or model from one "Label: value" line
///
/// Every label is tested on its own, so a line naming two labels sets both
/// fields. Lines naming no known label are ignored. A later line for the
/// same label overwrites an earlier one.
pub fn apply_parameter_line(fields: &mut ExtractedFields, line: &str) {
    if line.contains(YEAR_LABEL) {
        fields.year = strip_label(line, YEAR_LABEL);
    }
    if line.contains(MILEAGE_LABEL) {
        fields.mileage = strip_label(line, MILEAGE_LABEL);
    }
    if line.contains(MODEL_LABEL) {
        fields.model = strip_label(line, MODEL_LABEL);
    }
}

fn strip_label(line: &str, label: &str) -> String {
    line.replacen(&format!("{}: ", label), "", 1).trim().to_string()
}
