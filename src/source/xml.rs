// src/source/xml.rs

use roxmltree::Document;

use super::{RawRow, RowSet, RowSource};
use crate::error::{EtlError, Result};

/// Each child element of the root is one row; every `object` child inside it
/// carries a `name` attribute and a `value` element holding the text.
///
/// ```xml
/// <objects>
///   <row>
///     <object name="D1"><value>a</value></object>
///     <object name="M1"><value>1</value></object>
///   </row>
/// </objects>
/// ```
pub struct XmlSource;

impl RowSource for XmlSource {
    fn read_rows(&self, file: &str, text: &str) -> Result<RowSet> {
        let doc = Document::parse(text)
            .map_err(|e| EtlError::format(file, format!("XML parse: {}", e)))?;

        let mut rows = Vec::new();
        for (idx, record) in doc.root_element().children().filter(|n| n.is_element()).enumerate() {
            let mut row = RawRow::new();
            for object in record
                .children()
                .filter(|n| n.is_element() && n.has_tag_name("object"))
            {
                let name = object.attribute("name").ok_or_else(|| {
                    EtlError::format(file, format!("row {}: object without `name`", idx))
                })?;
                let value = object
                    .children()
                    .find(|n| n.is_element() && n.has_tag_name("value"))
                    .ok_or_else(|| {
                        EtlError::format(file, format!("row {}: `{}` has no value", idx, name))
                    })?;
                row.insert(name, value.text().unwrap_or_default());
            }
            rows.push(row);
        }

        Ok(RowSet::from_rows(rows))
    }
}
