// src/query/builder.rs

use crate::error::{EtlError, Result};
use crate::schema::Column;
use crate::store::quote_ident;

const SOURCE_ORDINAL: &str = "__source_ordinal";
const SOURCE_ROW: &str = "__source_row";

/// Separator between the measure values collected for one group.
pub const MEASURE_SEPARATOR: char = ' ';

/// Every `D` and `M` column implied by `dimensions`, sorted as text.
///
/// The sort is lexical, so `D10` comes before `D2`. Report headers depend on
/// this order.
pub fn column_universe(dimensions: usize) -> Vec<Column> {
    let mut columns: Vec<Column> = (1..=dimensions)
        .flat_map(|i| [Column::dimension(i), Column::measure(i)])
        .collect();
    columns.sort_by_key(Column::name);
    columns
}

/// Builds the two report queries for a fixed dimension count.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dimensions: usize,
    universe: Vec<Column>,
}

impl QueryBuilder {
    /// Fails when `dimensions` is zero: there is no first dimension column
    /// to order or group by.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(EtlError::Query(
                "no dimension columns in any loaded source".into(),
            ));
        }
        Ok(Self {
            dimensions,
            universe: column_universe(dimensions),
        })
    }

    pub fn universe(&self) -> &[Column] {
        &self.universe
    }

    /// Union of every source projected onto the column universe, duplicates
    /// kept, ordered by `D1` and then by source order and row order.
    pub fn consolidated(&self, source_ids: &[&str]) -> Result<String> {
        if source_ids.is_empty() {
            return Err(EtlError::Query("no sources to consolidate".into()));
        }
        let projection = self.projection();
        let branches: Vec<String> = source_ids
            .iter()
            .enumerate()
            .map(|(ordinal, id)| {
                format!(
                    "SELECT {}, {} AS {}, rowid AS {} FROM {}",
                    projection,
                    ordinal,
                    SOURCE_ORDINAL,
                    SOURCE_ROW,
                    quote_ident(id)
                )
            })
            .collect();

        Ok(format!(
            "SELECT {} FROM ({}) ORDER BY {} ASC, {} ASC, {} ASC",
            projection,
            branches.join(" UNION ALL "),
            quote_ident(&Column::dimension(1).name()),
            SOURCE_ORDINAL,
            SOURCE_ROW
        ))
    }

    /// Group the consolidated rows by `D1..Dn` and collect each group's
    /// measure values under the alias `S<i>`, joined by
    /// [`MEASURE_SEPARATOR`]. The values are summed after execution
    /// (`report::sum_measures`) so no digit count can overflow the store.
    pub fn aggregated(&self, consolidated: &str) -> String {
        let dims: Vec<String> = (1..=self.dimensions)
            .map(|i| quote_ident(&Column::dimension(i).name()))
            .collect();
        let sums: Vec<String> = (1..=self.dimensions)
            .map(|i| {
                format!(
                    "string_agg({}, '{}') AS {}",
                    quote_ident(&Column::measure(i).name()),
                    MEASURE_SEPARATOR,
                    quote_ident(&format!("S{}", i))
                )
            })
            .collect();
        let dims = dims.join(", ");

        format!(
            "SELECT {}, {} FROM ({}) GROUP BY {} ORDER BY {}",
            dims,
            sums.join(", "),
            consolidated,
            dims,
            (1..=self.dimensions)
                .map(|i| format!("{} ASC", quote_ident(&Column::dimension(i).name())))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }

    fn projection(&self) -> String {
        self.universe
            .iter()
            .map(|c| quote_ident(&c.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
