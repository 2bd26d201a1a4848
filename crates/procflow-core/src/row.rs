//! Row ingestion and normalization.
//!
//! A raw row is a flat string-keyed map. [`RowNormalizer`] trims it against the
//! [`LevelSchema`] and turns it into the chain of level entries the hierarchy builder folds.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::model::Predecessor;
use crate::schema::{Level, LevelSchema, LevelSpec};
use indexmap::IndexMap;
use serde_json::Value;

pub type RawRow = IndexMap<String, String>;

/// Separators accepted inside predecessor and condition cells.
const LIST_SEPARATORS: &[char] = &[',', ';', '|', '\n'];

/// Converts a JSON document into rows. The document must be an array of objects; scalar cells
/// are stringified, `null` becomes blank, and arrays of scalars are kept as JSON text (so a
/// predecessor column may be given as `["P1","P2"]`).
pub fn rows_from_json(value: &Value) -> Result<Vec<RawRow>> {
    let Value::Array(items) = value else {
        return Err(Error::malformed(format!(
            "expected an array of row objects, found {}",
            json_type_name(value)
        )));
    };

    let mut rows = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(Error::malformed(format!(
                "row {idx} is {}, expected an object",
                json_type_name(item)
            )));
        };
        let mut row = RawRow::with_capacity(map.len());
        for (key, cell) in map {
            let text = match cell {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(items) if items.iter().all(is_scalar) => {
                    serde_json::to_string(cell)?
                }
                Value::Array(_) | Value::Object(_) => {
                    return Err(Error::malformed(format!(
                        "row {idx} column `{key}` holds a nested value"
                    )));
                }
            };
            row.insert(key.clone(), text);
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn rows_from_json_str(text: &str) -> Result<Vec<RawRow>> {
    let value: Value = serde_json::from_str(text)?;
    rows_from_json(&value)
}

/// Reads CSV with a header row. Short records are allowed; missing trailing cells are blank.
pub fn rows_from_csv<R: std::io::Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.is_empty()) && !headers.is_empty() {
        return Err(Error::malformed("CSV header row is blank"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn is_scalar(v: &Value) -> bool {
    !matches!(v, Value::Array(_) | Value::Object(_))
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One level of a normalized row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelEntry {
    pub level: Level,
    pub id: String,
    pub name: Option<String>,
    pub metadata: IndexMap<String, String>,
    pub predecessors: Vec<Predecessor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    /// Position of the row in the input batch.
    pub index: usize,
    /// Contiguous hierarchy entries starting at L0.
    pub hierarchy: Vec<LevelEntry>,
    /// Contiguous process entries starting at L4 (may be empty).
    pub process: Vec<LevelEntry>,
}

impl NormalizedRow {
    pub fn entries(&self) -> impl Iterator<Item = &LevelEntry> {
        self.hierarchy.iter().chain(self.process.iter())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowNormalizer<'s> {
    schema: &'s LevelSchema,
}

impl<'s> RowNormalizer<'s> {
    pub fn new(schema: &'s LevelSchema) -> Self {
        Self { schema }
    }

    /// Returns `None` when the row is rejected (no L0 identifier).
    pub fn normalize(
        &self,
        index: usize,
        row: &RawRow,
        diagnostics: &mut Diagnostics,
    ) -> Option<NormalizedRow> {
        let l0 = self.schema.spec(Level::L0);
        if cell(row, &l0.id_column).is_none() {
            diagnostics.push(Diagnostic::RowRejected {
                row: index,
                reason: format!("missing L0 identifier (column `{}`)", l0.id_column),
            });
            return None;
        }

        let hierarchy = self.read_chain(index, row, &Level::ALL[..4], diagnostics);
        let process = self.read_chain(index, row, &Level::ALL[4..], diagnostics);
        Some(NormalizedRow {
            index,
            hierarchy,
            process,
        })
    }

    /// Reads levels in order until the first blank identifier. Identifiers filled in below the
    /// gap are reported once and ignored.
    fn read_chain(
        &self,
        index: usize,
        row: &RawRow,
        levels: &[Level],
        diagnostics: &mut Diagnostics,
    ) -> Vec<LevelEntry> {
        let mut out = Vec::new();
        for (pos, &level) in levels.iter().enumerate() {
            let spec = self.schema.spec(level);
            let Some(id) = cell(row, &spec.id_column) else {
                let orphaned = levels[pos + 1..]
                    .iter()
                    .any(|&deeper| cell(row, &self.schema.spec(deeper).id_column).is_some());
                if orphaned {
                    diagnostics.push(Diagnostic::MissingIdentifier { row: index, level });
                }
                break;
            };
            out.push(self.read_entry(index, row, level, spec, id, diagnostics));
        }
        out
    }

    fn read_entry(
        &self,
        index: usize,
        row: &RawRow,
        level: Level,
        spec: &LevelSpec,
        id: &str,
        diagnostics: &mut Diagnostics,
    ) -> LevelEntry {
        let mut metadata = IndexMap::new();
        for col in &spec.metadata_columns {
            if let Some(v) = cell(row, col) {
                metadata.insert(col.clone(), v.to_string());
            }
        }

        let mut predecessors = Vec::new();
        if let Some(rel) = &spec.relationships {
            let raw_preds = cell(row, &rel.predecessor_column);
            let raw_conds = rel
                .condition_column
                .as_deref()
                .and_then(|col| cell(row, col));
            match parse_relationships(raw_preds, raw_conds) {
                Ok(list) => predecessors = list,
                Err(()) => diagnostics.push(Diagnostic::MalformedPredecessors {
                    row: index,
                    level,
                    raw: raw_preds.unwrap_or_default().to_string(),
                }),
            }
            if predecessors.iter().any(|p| p.id == id) {
                predecessors.retain(|p| p.id != id);
                diagnostics.push(Diagnostic::SelfReference { id: id.to_string() });
            }
        }

        LevelEntry {
            level,
            id: id.to_string(),
            name: cell(row, &spec.name_column).map(str::to_string),
            metadata,
            predecessors,
        }
    }
}

fn cell<'r>(row: &'r RawRow, column: &str) -> Option<&'r str> {
    row.get(column).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Parses a predecessor cell and its condition cell into positionally aligned pairs.
///
/// Blank predecessor slots are skipped together with their condition. A repeated predecessor
/// keeps its first position; a missing condition is filled from a later repeat.
pub fn parse_relationships(
    predecessors: Option<&str>,
    conditions: Option<&str>,
) -> std::result::Result<Vec<Predecessor>, ()> {
    let Some(raw) = predecessors else {
        return Ok(Vec::new());
    };
    let ids = split_list(raw)?;
    // A malformed condition cell only loses the labels, not the edges.
    let conds = conditions
        .map(|c| split_list(c).unwrap_or_default())
        .unwrap_or_default();

    let mut out: Vec<Predecessor> = Vec::new();
    for (pos, id) in ids.into_iter().enumerate() {
        let Some(id) = id else {
            continue;
        };
        let condition = conds.get(pos).cloned().flatten();
        match out.iter_mut().find(|p| p.id == id) {
            Some(existing) => {
                if existing.condition.is_none() {
                    existing.condition = condition;
                }
            }
            None => out.push(Predecessor { id, condition }),
        }
    }
    Ok(out)
}

fn split_list(raw: &str) -> std::result::Result<Vec<Option<String>>, ()> {
    let raw = raw.trim();
    if raw.starts_with('[') || raw.starts_with('{') {
        let items: Vec<Option<Value>> = serde_json::from_str(raw).map_err(|_| ())?;
        return items
            .into_iter()
            .map(|v| match v {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(non_blank(&s)),
                Some(Value::Number(n)) => Ok(Some(n.to_string())),
                Some(Value::Bool(b)) => Ok(Some(b.to_string())),
                Some(_) => Err(()),
            })
            .collect();
    }
    Ok(raw.split(LIST_SEPARATORS).map(non_blank).collect())
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
