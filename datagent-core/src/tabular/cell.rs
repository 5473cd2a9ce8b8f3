//! Scalar cells and column dtypes

use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;

/// A single value in a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Cell {
    /// Parse a raw CSV field. Only used once a column's dtype is known.
    pub(crate) fn parse_as(raw: &str, dtype: DType) -> Cell {
        if is_na(raw) {
            return Cell::Null;
        }
        match dtype {
            DType::Int64 => raw.trim().parse().map(Cell::Int).unwrap_or(Cell::Null),
            DType::Float64 => raw.trim().parse().map(Cell::Float).unwrap_or(Cell::Null),
            DType::Bool => parse_bool(raw).map(Cell::Bool).unwrap_or(Cell::Null),
            DType::Object => Cell::Str(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view; booleans count as 0/1
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) if !f.is_nan() => Some(*f),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Float cell, mapping NaN to null
    pub fn float(value: f64) -> Cell {
        if value.is_nan() {
            Cell::Null
        } else {
            Cell::Float(value)
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Cell::Str(s) => Value::String(s.clone()),
        }
    }

    /// Hashable identity used to match join keys. `1` and `1.0` match; nulls
    /// match each other.
    pub(crate) fn join_key(&self) -> String {
        match self {
            Cell::Null => "null".to_string(),
            Cell::Float(f) if f.is_nan() => "null".to_string(),
            Cell::Bool(b) => format!("b:{}", b),
            Cell::Int(i) => format!("n:{}", i),
            Cell::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("n:{}", *f as i64),
            Cell::Float(f) => format!("n:{}", f),
            Cell::Str(s) => format!("s:{}", s),
        }
    }

    /// Value equality where a null is never equal to anything, itself included
    pub fn same_value(&self, other: &Cell) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Ordering used by min/max/median. Nulls are filtered out before this
    /// is called.
    pub(crate) fn compare(&self, other: &Cell) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NaN"),
            Cell::Bool(true) => write!(f, "True"),
            Cell::Bool(false) => write!(f, "False"),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) if v.is_nan() => write!(f, "NaN"),
            Cell::Float(v) => write!(f, "{:.6}", v),
            Cell::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Column dtype, named the way data tools usually print them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int64,
    Float64,
    Bool,
    Object,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Int64 => "int64",
            DType::Float64 => "float64",
            DType::Bool => "bool",
            DType::Object => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DType::Int64 | DType::Float64)
    }

    /// Infer the dtype of a column of cells. Integers with missing values
    /// widen to float64; an all-null column is float64.
    pub fn infer(cells: &[Cell]) -> DType {
        let mut has_null = false;
        let mut has_int = false;
        let mut has_float = false;
        let mut has_bool = false;
        let mut has_str = false;

        for cell in cells {
            match cell {
                Cell::Null => has_null = true,
                Cell::Float(f) if f.is_nan() => has_null = true,
                Cell::Int(_) => has_int = true,
                Cell::Float(_) => has_float = true,
                Cell::Bool(_) => has_bool = true,
                Cell::Str(_) => has_str = true,
            }
        }

        if has_str || (has_bool && (has_int || has_float)) {
            DType::Object
        } else if has_bool {
            if has_null {
                DType::Object
            } else {
                DType::Bool
            }
        } else if has_float || (has_int && has_null) || !has_int {
            DType::Float64
        } else {
            DType::Int64
        }
    }

    /// Infer the dtype of raw CSV fields
    pub(crate) fn infer_raw<'a>(fields: impl Iterator<Item = &'a str>) -> DType {
        let mut all_int = true;
        let mut all_float = true;
        let mut all_bool = true;
        let mut has_null = false;
        let mut seen = false;

        for raw in fields {
            if is_na(raw) {
                has_null = true;
                continue;
            }
            seen = true;
            let trimmed = raw.trim();
            all_int &= trimmed.parse::<i64>().is_ok();
            all_float &= trimmed.parse::<f64>().is_ok();
            all_bool &= parse_bool(raw).is_some();
        }

        if !seen {
            DType::Float64
        } else if all_int {
            if has_null {
                DType::Float64
            } else {
                DType::Int64
            }
        } else if all_float {
            DType::Float64
        } else if all_bool && !has_null {
            DType::Bool
        } else {
            DType::Object
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const NA_VALUES: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "#N/A", "<NA>",
];

fn is_na(raw: &str) -> bool {
    NA_VALUES.contains(&raw.trim())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}
