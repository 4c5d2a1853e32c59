//! Quantity normalization command

use anyhow::{Context, Result};
use serde::Serialize;
use snapshot_lib::quantity::as_quantity;
use tabled::Tabled;

use crate::output::{print_rows, OutputFormat};

/// Canonical form of one input quantity
#[derive(Debug, Tabled, Serialize)]
pub struct QuantityRow {
    #[tabled(rename = "Input")]
    pub input: String,
    #[tabled(rename = "Canonical")]
    pub canonical: String,
    #[tabled(rename = "Format")]
    pub format: String,
    #[tabled(rename = "Milli")]
    pub milli_value: i128,
}

/// Normalize every input, failing on the first invalid one
pub fn normalize_all(inputs: &[String]) -> Result<Vec<QuantityRow>> {
    inputs
        .iter()
        .map(|input| -> Result<QuantityRow> {
            let q = as_quantity(input).with_context(|| format!("Invalid quantity {:?}", input))?;
            Ok(QuantityRow {
                input: input.clone(),
                canonical: q.to_string(),
                format: format!("{:?}", q.format()),
                milli_value: q.milli_value(),
            })
        })
        .collect()
}

/// Print canonical forms of the given quantities
pub fn show_quantities(inputs: &[String], format: OutputFormat) -> Result<()> {
    let rows = normalize_all(inputs)?;
    print_rows(&rows, &rows, format)
}
