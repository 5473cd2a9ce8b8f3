//! # Data Frames
//!
//! An ordered set of equal-length [`Series`]. Frames are immutable once
//! built: every operation returns a new frame or a plain value.

use super::cell::{Cell, DType};
use super::series::Series;
use crate::error::{Error, Result};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::str::FromStr;

/// Join flavour for [`DataFrame::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl FromStr for JoinHow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inner" => Ok(JoinHow::Inner),
            "left" => Ok(JoinHow::Left),
            "right" => Ok(JoinHow::Right),
            "outer" => Ok(JoinHow::Outer),
            other => Err(Error::invalid_argument(format!(
                "how must be one of inner, left, right, outer (got '{}')",
                other
            ))
            .with_context("how", other.to_string())),
        }
    }
}

/// Options for [`DataFrame::merge`]
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub how: JoinHow,
    /// Appended to overlapping non-key column names from the left and right
    pub suffixes: (String, String),
    /// Name of an extra column recording where each row came from
    pub indicator: Option<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            how: JoinHow::Inner,
            suffixes: ("_x".into(), "_y".into()),
            indicator: None,
        }
    }
}

impl MergeOptions {
    pub fn how(mut self, how: JoinHow) -> Self {
        self.how = how;
        self
    }

    pub fn suffixes(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.suffixes = (left.into(), right.into());
        self
    }

    pub fn indicator(mut self, name: impl Into<String>) -> Self {
        self.indicator = Some(name.into());
        self
    }
}

/// A labelled table of statistics: `index` names the rows, `columns` the
/// columns, `data` holds one row per index label.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsTable {
    pub columns: Vec<String>,
    pub index: Vec<String>,
    pub data: Vec<Vec<Cell>>,
}

impl StatsTable {
    pub fn to_json(&self) -> Value {
        let data: Vec<Value> = self
            .data
            .iter()
            .map(|row| Value::Array(row.iter().map(Cell::to_json).collect()))
            .collect();
        json!({
            "columns": self.columns,
            "index": self.index,
            "data": data,
        })
    }

    /// Swap rows and columns
    pub fn transpose(&self) -> StatsTable {
        let data = (0..self.columns.len())
            .map(|c| self.data.iter().map(|row| row[c].clone()).collect())
            .collect();
        StatsTable {
            columns: self.index.clone(),
            index: self.columns.clone(),
            data,
        }
    }

    /// Keep the given columns in the given order; absent ones become nulls
    pub fn select(&self, columns: &[&str]) -> StatsTable {
        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|name| self.columns.iter().position(|c| c == name))
            .collect();
        let data = self
            .data
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|pos| pos.map(|p| row[p].clone()).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();
        StatsTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            index: self.index.clone(),
            data,
        }
    }

    /// Right-aligned plain-text rendering
    pub fn to_text(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .data
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();

        let index_width = self.index.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                cells
                    .iter()
                    .map(|row| row[c].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        let _ = write!(out, "{:width$}", "", width = index_width);
        for (name, width) in self.columns.iter().zip(&widths) {
            let _ = write!(out, "  {:>width$}", name, width = width);
        }
        out.push('\n');

        for (label, row) in self.index.iter().zip(&cells) {
            let _ = write!(out, "{:<width$}", label, width = index_width);
            for (value, width) in row.iter().zip(&widths) {
                let _ = write!(out, "  {:>width$}", value, width = width);
            }
            out.push('\n');
        }
        out
    }
}

/// Canonical ordering of statistic labels in mixed describe output
const STAT_ORDER: &[&str] = &[
    "count", "unique", "top", "freq", "mean", "std", "min", "25%", "50%", "75%", "max",
];

/// An ordered collection of equal-length columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: Vec<Series>,
}

impl DataFrame {
    /// Build a frame. Columns must share a length and have distinct names.
    pub fn new(columns: Vec<Series>) -> Result<Self> {
        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|s| s.len() != first.len()) {
                return Err(Error::invalid_argument(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name(),
                    bad.len(),
                    first.len()
                ))
                .with_operation("frame::new"));
            }
        }

        let mut seen = HashSet::new();
        for series in &columns {
            if !seen.insert(series.name()) {
                return Err(Error::invalid_argument(format!(
                    "duplicate column name '{}'",
                    series.name()
                ))
                .with_operation("frame::new"));
            }
        }

        Ok(Self { columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Series::len).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Series::name).collect()
    }

    pub fn column(&self, name: &str) -> Result<&Series> {
        self.columns
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::column_not_found(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|s| s.name() == name)
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> DataFrame {
        DataFrame {
            columns: self.columns.iter().map(|s| s.take(n)).collect(),
        }
    }

    /// Rows as a list of `{column: value}` objects
    pub fn to_records(&self) -> Value {
        let records = (0..self.num_rows())
            .map(|row| {
                let mut record = Map::new();
                for series in &self.columns {
                    record.insert(series.name().to_string(), series.get(row).to_json());
                }
                Value::Object(record)
            })
            .collect();
        Value::Array(records)
    }

    // =========================================================================
    // Summaries
    // =========================================================================

    /// Statistics of the numeric columns, or of every column when none is
    /// numeric
    pub fn describe(&self) -> StatsTable {
        let numeric: Vec<&Series> = self.columns.iter().filter(|s| s.dtype().is_numeric()).collect();
        if numeric.is_empty() {
            self.stats_table(self.columns.iter().collect())
        } else {
            self.stats_table(numeric)
        }
    }

    /// Statistics of every column; labels that do not apply to a column are
    /// null
    pub fn describe_all(&self) -> StatsTable {
        self.stats_table(self.columns.iter().collect())
    }

    fn stats_table(&self, columns: Vec<&Series>) -> StatsTable {
        let per_column: Vec<HashMap<String, Cell>> =
            columns.iter().map(|s| s.describe().into_iter().collect()).collect();

        let index: Vec<String> = STAT_ORDER
            .iter()
            .filter(|label| per_column.iter().any(|stats| stats.contains_key(**label)))
            .map(|label| label.to_string())
            .collect();

        let data = index
            .iter()
            .map(|label| {
                per_column
                    .iter()
                    .map(|stats| stats.get(label).cloned().unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();

        StatsTable {
            columns: columns.iter().map(|s| s.name().to_string()).collect(),
            index,
            data,
        }
    }

    /// Column summary: index range, per-column non-null counts and dtypes
    pub fn info(&self) -> String {
        let rows = self.num_rows();
        let mut out = String::new();
        if rows == 0 {
            let _ = writeln!(out, "RangeIndex: 0 entries");
        } else {
            let _ = writeln!(out, "RangeIndex: {} entries, 0 to {}", rows, rows - 1);
        }
        let _ = writeln!(out, "Data columns (total {} columns):", self.num_columns());

        let name_width = self
            .columns
            .iter()
            .map(|s| s.name().chars().count())
            .chain(std::iter::once("Column".len()))
            .max()
            .unwrap_or(0);
        let counts: Vec<String> = self.columns.iter().map(|s| format!("{} non-null", s.count())).collect();
        let count_width = counts
            .iter()
            .map(String::len)
            .chain(std::iter::once("Non-Null Count".len()))
            .max()
            .unwrap_or(0);

        let _ = writeln!(
            out,
            " #   {:<nw$}  {:<cw$}  Dtype",
            "Column",
            "Non-Null Count",
            nw = name_width,
            cw = count_width
        );
        let _ = writeln!(
            out,
            "---  {}  {}  -----",
            "-".repeat(name_width),
            "-".repeat(count_width)
        );
        for (i, (series, count)) in self.columns.iter().zip(&counts).enumerate() {
            let _ = writeln!(
                out,
                " {:<3} {:<nw$}  {:<cw$}  {}",
                i,
                series.name(),
                count,
                series.dtype(),
                nw = name_width,
                cw = count_width
            );
        }

        let mut dtype_counts: Vec<(DType, usize)> = Vec::new();
        for series in &self.columns {
            match dtype_counts.iter_mut().find(|(d, _)| *d == series.dtype()) {
                Some((_, n)) => *n += 1,
                None => dtype_counts.push((series.dtype(), 1)),
            }
        }
        let dtypes: Vec<String> = dtype_counts.iter().map(|(d, n)| format!("{}({})", d, n)).collect();
        let _ = write!(out, "dtypes: {}", dtypes.join(", "));
        out
    }

    /// Per-column mean over the numeric columns
    pub fn mean(&self) -> Result<Vec<(String, Cell)>> {
        self.numeric_reduce(Series::mean)
    }

    /// Per-column sum over the numeric columns
    pub fn sum(&self) -> Result<Vec<(String, Cell)>> {
        self.numeric_reduce(Series::sum)
    }

    fn numeric_reduce(&self, f: fn(&Series) -> Result<Cell>) -> Result<Vec<(String, Cell)>> {
        self.columns
            .iter()
            .filter(|s| s.dtype().is_numeric() || s.dtype() == DType::Bool)
            .map(|s| Ok((s.name().to_string(), f(s)?)))
            .collect()
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Database-style join on a shared key column.
    ///
    /// Output column order: the left frame's columns (the key in its left
    /// position), then the right frame's non-key columns, then the indicator.
    /// Rows follow the left frame for inner/left/outer joins, with unmatched
    /// right rows appended for outer joins, and the right frame for right
    /// joins. Null keys match each other.
    pub fn merge(&self, right: &DataFrame, on: &str, options: &MergeOptions) -> Result<DataFrame> {
        let left_key = self.column(on).map_err(|e| e.with_operation("frame::merge"))?;
        let right_key = right.column(on).map_err(|e| e.with_operation("frame::merge"))?;

        let rows: Vec<(Option<usize>, Option<usize>)> = match options.how {
            JoinHow::Right => join_rows(right_key, left_key, true)
                .into_iter()
                .map(|(r, l)| (l, r))
                .collect(),
            how => join_rows(left_key, right_key, how != JoinHow::Inner)
                .into_iter()
                .chain(if how == JoinHow::Outer {
                    unmatched(right_key, left_key)
                        .into_iter()
                        .map(|r| (None, Some(r)))
                        .collect()
                } else {
                    Vec::new()
                })
                .collect(),
        };

        let (left_suffix, right_suffix) = &options.suffixes;
        let mut columns = Vec::new();

        for series in &self.columns {
            if series.name() == on {
                let cells = rows
                    .iter()
                    .map(|(l, r)| match (l, r) {
                        (Some(l), _) => left_key.get(*l).clone(),
                        (None, Some(r)) => right_key.get(*r).clone(),
                        (None, None) => Cell::Null,
                    })
                    .collect();
                columns.push(Series::new(on, cells));
                continue;
            }
            let name = if right.has_column(series.name()) {
                format!("{}{}", series.name(), left_suffix)
            } else {
                series.name().to_string()
            };
            let cells = rows
                .iter()
                .map(|(l, _)| l.map(|l| series.get(l).clone()).unwrap_or(Cell::Null))
                .collect();
            columns.push(Series::new(name, cells));
        }

        for series in right.columns.iter().filter(|s| s.name() != on) {
            let name = if self.has_column(series.name()) {
                format!("{}{}", series.name(), right_suffix)
            } else {
                series.name().to_string()
            };
            let cells = rows
                .iter()
                .map(|(_, r)| r.map(|r| series.get(r).clone()).unwrap_or(Cell::Null))
                .collect();
            columns.push(Series::new(name, cells));
        }

        if let Some(indicator) = &options.indicator {
            let cells = rows
                .iter()
                .map(|(l, r)| {
                    let tag = match (l, r) {
                        (Some(_), Some(_)) => "both",
                        (Some(_), None) => "left_only",
                        _ => "right_only",
                    };
                    Cell::Str(tag.to_string())
                })
                .collect();
            columns.push(Series::new(indicator.clone(), cells));
        }

        DataFrame::new(columns).map_err(|e| e.with_operation("frame::merge"))
    }
}

/// Pair every driving row with its matches on the other side. With
/// `keep_unmatched`, driving rows without a match pair with `None`.
fn join_rows(
    driving: &Series,
    other: &Series,
    keep_unmatched: bool,
) -> Vec<(Option<usize>, Option<usize>)> {
    let index = key_index(other);
    let mut rows = Vec::new();
    for (i, cell) in driving.values().iter().enumerate() {
        match index.get(&cell.join_key()) {
            Some(matches) => rows.extend(matches.iter().map(|&j| (Some(i), Some(j)))),
            None if keep_unmatched => rows.push((Some(i), None)),
            None => {}
        }
    }
    rows
}

/// Rows of `side` whose key never appears in `other`
fn unmatched(side: &Series, other: &Series) -> Vec<usize> {
    let index = key_index(other);
    side.values()
        .iter()
        .enumerate()
        .filter(|(_, cell)| !index.contains_key(&cell.join_key()))
        .map(|(i, _)| i)
        .collect()
}

fn key_index(series: &Series) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, cell) in series.values().iter().enumerate() {
        index.entry(cell.join_key()).or_default().push(i);
    }
    index
}

/// Render a labelled list of values as aligned text, one pair per line
pub fn render_labelled(pairs: &[(String, Cell)], value_fmt: impl Fn(&Cell) -> String) -> String {
    let rows: Vec<(String, String)> = pairs.iter().map(|(k, v)| (k.clone(), value_fmt(v))).collect();
    super::series::render_pairs(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn frame(cols: Vec<(&str, Vec<Cell>)>) -> DataFrame {
        DataFrame::new(cols.into_iter().map(|(n, v)| Series::new(n, v)).collect()).unwrap()
    }

    fn s(v: &str) -> Cell {
        Cell::Str(v.to_string())
    }

    fn prev() -> DataFrame {
        frame(vec![
            ("sbti_id", vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)]),
            ("target", vec![s("near"), s("long"), s("near")]),
        ])
    }

    fn curr() -> DataFrame {
        frame(vec![
            ("sbti_id", vec![Cell::Int(2), Cell::Int(3), Cell::Int(4)]),
            ("target", vec![s("long"), s("long"), s("near")]),
        ])
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = DataFrame::new(vec![
            Series::new("a", vec![Cell::Int(1)]),
            Series::new("b", vec![Cell::Int(1), Cell::Int(2)]),
        ]);
        assert!(result.is_err_and(|e| e.kind() == ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_shape_head_records() {
        let df = prev();
        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.column_names(), vec!["sbti_id", "target"]);

        let records = df.head(2).to_records();
        assert_eq!(records.as_array().unwrap().len(), 2);
        assert_eq!(records[0]["target"], "near");
        assert_eq!(records[1]["sbti_id"], 2);
    }

    #[test]
    fn test_missing_column() {
        let err = prev().column("scope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ColumnNotFound);
        assert_eq!(err.message(), "Column scope not found");
    }

    #[test]
    fn test_describe_numeric_only() {
        let table = prev().describe();
        assert_eq!(table.columns, vec!["sbti_id"]);
        assert_eq!(table.index[0], "count");
        assert_eq!(table.index.len(), 8);

        let json = table.to_json();
        assert_eq!(json["data"][1][0], 2.0);
    }

    #[test]
    fn test_describe_all_mixes_labels() {
        let table = prev().describe_all();
        assert_eq!(table.columns, vec!["sbti_id", "target"]);
        assert_eq!(table.index, STAT_ORDER.iter().map(|s| s.to_string()).collect::<Vec<_>>());

        let unique_row = table.index.iter().position(|l| l == "unique").unwrap();
        assert_eq!(table.data[unique_row][0], Cell::Null);
        assert_eq!(table.data[unique_row][1], Cell::Int(2));

        let transposed = table.transpose().select(&["count", "unique", "freq", "mean", "std"]);
        assert_eq!(transposed.index, vec!["sbti_id", "target"]);
        let text = transposed.to_text();
        assert!(text.contains("unique"));
        assert!(text.lines().count() == 3);
    }

    #[test]
    fn test_info() {
        let info = prev().info();
        assert!(info.starts_with("RangeIndex: 3 entries, 0 to 2"));
        assert!(info.contains("sbti_id"));
        assert!(info.contains("3 non-null"));
        assert!(info.ends_with("dtypes: int64(1), object(1)"));
    }

    #[test]
    fn test_mean_and_sum_skip_text() {
        let mean = prev().mean().unwrap();
        assert_eq!(mean, vec![("sbti_id".to_string(), Cell::Float(2.0))]);
        let sum = prev().sum().unwrap();
        assert_eq!(sum, vec![("sbti_id".to_string(), Cell::Int(6))]);
    }

    #[test]
    fn test_inner_merge_suffixes() {
        let merged = prev().merge(&curr(), "sbti_id", &MergeOptions::default()).unwrap();
        assert_eq!(merged.column_names(), vec!["sbti_id", "target_x", "target_y"]);
        assert_eq!(merged.num_rows(), 2);
        assert_eq!(merged.column("sbti_id").unwrap().dtype(), DType::Int64);
    }

    #[test]
    fn test_outer_merge_with_indicator() {
        let options = MergeOptions::default()
            .how(JoinHow::Outer)
            .suffixes("_prev", "_curr")
            .indicator("_merge");
        let merged = prev().merge(&curr(), "sbti_id", &options).unwrap();

        assert_eq!(merged.num_rows(), 4);
        assert_eq!(
            merged.column_names(),
            vec!["sbti_id", "target_prev", "target_curr", "_merge"]
        );

        let tags: Vec<_> = merged.column("_merge").unwrap().values().to_vec();
        assert_eq!(tags, vec![s("left_only"), s("both"), s("both"), s("right_only")]);

        // Key 4 only exists on the right; its key value comes from there
        assert_eq!(merged.column("sbti_id").unwrap().get(3), &Cell::Int(4));
        assert_eq!(merged.column("target_prev").unwrap().get(3), &Cell::Null);
    }

    #[test]
    fn test_left_and_right_merge() {
        let left = prev()
            .merge(&curr(), "sbti_id", &MergeOptions::default().how(JoinHow::Left))
            .unwrap();
        assert_eq!(left.num_rows(), 3);
        assert_eq!(left.column("target_y").unwrap().get(0), &Cell::Null);

        let right = prev()
            .merge(&curr(), "sbti_id", &MergeOptions::default().how(JoinHow::Right))
            .unwrap();
        assert_eq!(right.num_rows(), 3);
        assert_eq!(right.column("sbti_id").unwrap().get(2), &Cell::Int(4));
    }

    #[test]
    fn test_merge_missing_key() {
        let err = prev()
            .merge(&curr(), "company_id", &MergeOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ColumnNotFound);
    }

    #[test]
    fn test_join_how_parse() {
        assert_eq!("outer".parse::<JoinHow>().unwrap(), JoinHow::Outer);
        assert!("cross".parse::<JoinHow>().is_err());
    }
}
