//! Length reconciliation across variables.
//!
//! Every variable is tiled up to the longest one. A length that does not
//! evenly divide the longest is rejected; there is no cross product.

use tracing::debug;

use crate::error::{DslError, DslResult};
use crate::transform::dsl::commands::tile;
use crate::transform::dsl::table::VariableTable;

/// Command name reported in broadcast errors.
pub const BROADCAST: &str = "broadcast";

/// Tile every variable of `table` to the table's maximum length.
pub fn broadcast(mut table: VariableTable) -> DslResult<VariableTable> {
    let target = table.max_len();

    for (name, values) in table.iter() {
        if values.is_empty() {
            return Err(DslError::broadcast(name, BROADCAST, "variable has no values"));
        }
        if target % values.len() != 0 {
            return Err(DslError::broadcast(
                name,
                BROADCAST,
                format!(
                    "length {} does not evenly divide the maximum length {}",
                    values.len(),
                    target
                ),
            ));
        }
    }

    for (name, values) in table.iter_mut() {
        let times = target / values.len();
        if times > 1 {
            debug!(variable = name, times, "tiling variable");
            *values = tile(values, times);
        }
    }

    Ok(table)
}
