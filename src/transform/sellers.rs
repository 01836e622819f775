// src/transform/sellers.rs

use anyhow::{Context, Result};
use tracing::debug;

use crate::process::RawTable;

/// Geographic columns removed from the sellers export.
pub const DROPPED_COLUMNS: [&str; 2] = ["seller_city", "seller_state"];

/// Drop `seller_city` and `seller_state`. Either one missing fails the file.
pub fn drop_geographic_columns(mut table: RawTable) -> Result<RawTable> {
    table
        .drop_columns(&DROPPED_COLUMNS)
        .context("pruning seller columns")?;
    debug!(remaining = table.num_columns(), "dropped seller geography");
    Ok(table)
}
