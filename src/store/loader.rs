// src/store/loader.rs

use duckdb::params_from_iter;
use tracing::info;

use super::{quote_ident, Store};
use crate::error::{EtlError, Result};
use crate::schema::SourceTable;

/// Create a relation named after the source and insert every row as text.
///
/// Values are bound as parameters, never spliced into SQL. The create and
/// all inserts run in one transaction, so a failure leaves nothing behind.
/// A relation that already exists is a `Load` error.
#[tracing::instrument(level = "info", skip(store, table), fields(table = %table.id, rows = table.rows.len()))]
pub fn load_table(store: &mut Store, table: &SourceTable) -> Result<()> {
    let load_err = |e: duckdb::Error| EtlError::Load {
        table: table.id.clone(),
        reason: e.to_string(),
    };

    let name = quote_ident(&table.id);
    let columns: Vec<String> = table.headers.iter().map(|h| quote_ident(h)).collect();

    let create = format!(
        "CREATE TABLE {} ({})",
        name,
        columns
            .iter()
            .map(|c| format!("{} VARCHAR", c))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        name,
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let tx = store.conn_mut().transaction().map_err(load_err)?;
    tx.execute_batch(&create).map_err(load_err)?;
    {
        let mut stmt = tx.prepare(&insert).map_err(load_err)?;
        for row in &table.rows {
            stmt.execute(params_from_iter(row.values()))
                .map_err(load_err)?;
        }
    }
    tx.commit().map_err(load_err)?;

    info!(dimensions = table.dimensions, "loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawRow;
    use anyhow::Result;

    fn table(id: &str, rows: &[&[(&str, &str)]]) -> SourceTable {
        let rows: Vec<RawRow> = rows.iter().map(|r| r.iter().copied().collect()).collect();
        SourceTable {
            id: id.to_string(),
            headers: rows[0].keys().map(str::to_string).collect(),
            rows,
            dimensions: 1,
        }
    }

    #[test]
    fn loads_rows_verbatim() -> Result<()> {
        let mut store = Store::open_temp()?;
        let t = table("src", &[&[("D1", "a"), ("M1", "007")], &[("D1", "b"), ("M1", "2")]]);
        load_table(&mut store, &t)?;

        let mut stmt = store
            .conn()
            .prepare("SELECT \"D1\", \"M1\" FROM \"src\" ORDER BY rowid")?;
        let got: Vec<(String, String)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;
        assert_eq!(
            got,
            vec![
                ("a".to_string(), "007".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
        Ok(())
    }

    #[test]
    fn values_are_not_interpreted_as_sql() -> Result<()> {
        let mut store = Store::open_temp()?;
        let t = table("src", &[&[("D1", "x'); DROP TABLE src; --"), ("M1", "1")]]);
        load_table(&mut store, &t)?;
        let v: String = store
            .conn()
            .query_row("SELECT \"D1\" FROM \"src\"", [], |r| r.get(0))?;
        assert_eq!(v, "x'); DROP TABLE src; --");
        Ok(())
    }

    #[test]
    fn duplicate_relation_is_load_error() -> Result<()> {
        let mut store = Store::open_temp()?;
        let t = table("dup", &[&[("D1", "a"), ("M1", "1")]]);
        load_table(&mut store, &t)?;
        let err = load_table(&mut store, &t).unwrap_err();
        assert!(matches!(err, EtlError::Load { .. }));

        let n: i64 = store
            .conn()
            .query_row("SELECT count(*) FROM \"dup\"", [], |r| r.get(0))?;
        assert_eq!(n, 1);
        Ok(())
    }
}
