// src/report/mod.rs
//! Run a report query against the store and write it out as TSV.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use num_bigint::BigUint;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::query::builder::MEASURE_SEPARATOR;
use crate::store::Store;

/// A fully materialised query result, every cell as text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultTable {
    /// Column names in projection order.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Which report a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Consolidated,
    /// The first `dimensions` columns are group keys; the rest hold the
    /// collected measure values of each group.
    Aggregated { dimensions: usize },
}

/// A query bound to its destination file.
#[derive(Debug, Clone)]
pub struct Report {
    pub kind: ReportKind,
    pub query: String,
    pub destination: PathBuf,
}

/// Execute `query` and collect the whole result.
///
/// NULL cells become empty strings; the reports only ever project text.
#[tracing::instrument(level = "debug", skip_all)]
pub fn execute(store: &Store, query: &str) -> Result<ResultTable> {
    let query_err = |e: duckdb::Error| EtlError::Query(e.to_string());

    let mut stmt = store.conn().prepare(query).map_err(query_err)?;
    let mut rows = stmt.query([]).map_err(query_err)?;
    let columns: Vec<String> = rows
        .as_ref()
        .map(|s| s.column_names())
        .unwrap_or_default();

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(query_err)? {
        let mut cells = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let cell: Option<String> = row.get(i).map_err(query_err)?;
            cells.push(cell.unwrap_or_default());
        }
        out.push(cells);
    }

    Ok(ResultTable { columns, rows: out })
}

/// Execute a report's query and finish its cells for output.
pub fn render(store: &Store, report: &Report) -> Result<ResultTable> {
    let mut table = execute(store, &report.query)?;
    if let ReportKind::Aggregated { dimensions } = report.kind {
        sum_measures(&mut table, dimensions)?;
    }
    Ok(table)
}

/// Replace every collected measure list (columns from `dimensions` on) with
/// its exact sum.
pub fn sum_measures(table: &mut ResultTable, dimensions: usize) -> Result<()> {
    for row in &mut table.rows {
        for cell in row.iter_mut().skip(dimensions) {
            let mut total = BigUint::default();
            for value in cell.split(MEASURE_SEPARATOR).filter(|v| !v.is_empty()) {
                let n = BigUint::parse_bytes(value.as_bytes(), 10).ok_or_else(|| {
                    EtlError::Query(format!("measure value `{}` is not an integer", value))
                })?;
                total += n;
            }
            *cell = total.to_string();
        }
    }
    Ok(())
}

/// Write `table` as tab-separated lines: a header line, then one line per row.
///
/// Fields are not quoted; a value containing a tab or newline would break
/// the layout, which validated inputs cannot produce. The file is written
/// beside the destination and renamed into place.
#[tracing::instrument(level = "info", skip(table), fields(path = %destination.display(), rows = table.rows.len()))]
pub fn emit(table: &ResultTable, destination: &Path) -> Result<()> {
    let write_err = |e: std::io::Error| EtlError::Write {
        path: destination.to_path_buf(),
        source: e,
    };

    let mut tmp_name = destination.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = (|| -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(&tmp)?);
        writeln!(w, "{}", table.columns.join("\t"))?;
        for row in &table.rows {
            writeln!(w, "{}", row.join("\t"))?;
        }
        w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&tmp, destination)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e));
    }
    info!("report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn emits_header_then_rows() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.tsv");
        let table = ResultTable {
            columns: vec!["D1".into(), "M1".into()],
            rows: vec![
                vec!["a".into(), "1".into()],
                vec!["b".into(), "2".into()],
            ],
        };
        emit(&table, &path)?;
        assert_eq!(fs::read_to_string(&path)?, "D1\tM1\na\t1\nb\t2\n");
        assert!(!dir.path().join("out.tsv.tmp").exists());
        Ok(())
    }

    #[test]
    fn unwritable_destination_is_write_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("no/such/dir/out.tsv");
        let err = emit(&ResultTable::default(), &path).unwrap_err();
        assert!(matches!(err, EtlError::Write { .. }));
        Ok(())
    }

    #[test]
    fn execute_reports_projection_order() -> Result<()> {
        let store = Store::open_temp()?;
        let table = execute(&store, "SELECT 'x' AS b, NULL::VARCHAR AS a")?;
        assert_eq!(table.columns, vec!["b", "a"]);
        assert_eq!(table.rows, vec![vec!["x".to_string(), String::new()]]);
        Ok(())
    }

    #[test]
    fn sums_are_exact_beyond_128_bits() {
        let big = "9".repeat(45);
        let mut table = ResultTable {
            columns: vec!["D1".into(), "S1".into(), "S2".into()],
            rows: vec![vec!["a".into(), format!("{} 1", big), "3 004 10".into()]],
        };
        sum_measures(&mut table, 1).unwrap();
        assert_eq!(table.rows[0][0], "a");
        assert_eq!(table.rows[0][1], format!("1{}", "0".repeat(45)));
        assert_eq!(table.rows[0][2], "17");
    }

    #[test]
    fn aggregated_render_sums_groups() -> Result<()> {
        let store = Store::open_temp()?;
        store.conn().execute_batch(
            "CREATE TABLE t (\"D1\" VARCHAR, \"M1\" VARCHAR); \
             INSERT INTO t VALUES ('a', '5'), ('b', '1'), ('a', '7');",
        )?;
        let report = Report {
            kind: ReportKind::Aggregated { dimensions: 1 },
            query: "SELECT \"D1\", string_agg(\"M1\", ' ') AS \"S1\" FROM t \
                    GROUP BY \"D1\" ORDER BY \"D1\""
                .into(),
            destination: PathBuf::from("unused.tsv"),
        };
        let table = render(&store, &report)?;
        assert_eq!(table.columns, vec!["D1", "S1"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["a".to_string(), "12".to_string()],
                vec!["b".to_string(), "1".to_string()]
            ]
        );
        Ok(())
    }

    #[test]
    fn bad_query_is_query_error() -> Result<()> {
        let store = Store::open_temp()?;
        let err = execute(&store, "SELECT \"D1\" FROM \"missing\"").unwrap_err();
        assert!(matches!(err, EtlError::Query(_)));
        Ok(())
    }
}
