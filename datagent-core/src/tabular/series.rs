//! Named, typed columns and their statistics

use super::cell::{Cell, DType};
use crate::error::{self, Result};
use std::collections::HashMap;

/// A named column of cells with an inferred dtype
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    dtype: DType,
    values: Vec<Cell>,
}

impl Series {
    /// Build a series, inferring its dtype. Integer cells of a float64 column
    /// are widened so every cell agrees with the dtype.
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        let dtype = DType::infer(&values);
        let values = if dtype == DType::Float64 {
            values
                .into_iter()
                .map(|c| match c {
                    Cell::Int(i) => Cell::Float(i as f64),
                    other => other,
                })
                .collect()
        } else {
            values
        };
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub(crate) fn with_dtype(name: impl Into<String>, dtype: DType, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> &Cell {
        self.values.get(row).unwrap_or(&Cell::Null)
    }

    /// Number of non-null cells
    pub fn count(&self) -> usize {
        self.values.iter().filter(|c| !c.is_null()).count()
    }

    pub fn take(&self, rows: usize) -> Series {
        Series::with_dtype(self.name.clone(), self.dtype, self.values.iter().take(rows).cloned().collect())
    }

    fn numeric(&self, method: &str) -> Result<Vec<f64>> {
        if !(self.dtype.is_numeric() || self.dtype == DType::Bool) {
            return Err(error::type_mismatch(&self.name, self.dtype.as_str(), method));
        }
        Ok(self.values.iter().filter_map(Cell::as_f64).collect())
    }

    fn non_null(&self) -> Vec<&Cell> {
        self.values.iter().filter(|c| !c.is_null()).collect()
    }

    // =========================================================================
    // Reductions
    // =========================================================================

    pub fn mean(&self) -> Result<Cell> {
        let xs = self.numeric("mean")?;
        if xs.is_empty() {
            return Ok(Cell::Null);
        }
        Ok(Cell::float(xs.iter().sum::<f64>() / xs.len() as f64))
    }

    /// Sum of the non-null values; integer columns stay integral
    pub fn sum(&self) -> Result<Cell> {
        let xs = self.numeric("sum")?;
        match self.dtype {
            DType::Int64 | DType::Bool => Ok(Cell::Int(xs.iter().map(|x| *x as i64).sum())),
            _ => Ok(Cell::float(xs.iter().sum())),
        }
    }

    pub fn median(&self) -> Result<Cell> {
        let xs = self.numeric("median")?;
        Ok(quantile(xs, 0.5))
    }

    /// Sample standard deviation (n - 1 denominator)
    pub fn std(&self) -> Result<Cell> {
        let xs = self.numeric("std")?;
        Ok(sample_std(&xs))
    }

    pub fn min(&self) -> Result<Cell> {
        Ok(self
            .non_null()
            .into_iter()
            .min_by(|a, b| a.compare(b))
            .cloned()
            .unwrap_or(Cell::Null))
    }

    pub fn max(&self) -> Result<Cell> {
        Ok(self
            .non_null()
            .into_iter()
            .max_by(|a, b| a.compare(b))
            .cloned()
            .unwrap_or(Cell::Null))
    }

    /// Distinct values with their counts, most frequent first. Nulls are
    /// counted as a value. With `normalize` the counts are fractions of the
    /// column length.
    pub fn value_counts(&self, normalize: bool) -> Vec<(Cell, f64)> {
        let mut order: Vec<(Cell, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for cell in &self.values {
            let key = cell.join_key();
            match index.get(&key) {
                Some(&pos) => order[pos].1 += 1,
                None => {
                    index.insert(key, order.len());
                    let cell = if cell.is_null() { Cell::Null } else { cell.clone() };
                    order.push((cell, 1));
                }
            }
        }

        // Stable sort keeps first-seen order among ties
        order.sort_by(|a, b| b.1.cmp(&a.1));

        let total = self.values.len().max(1) as f64;
        order
            .into_iter()
            .map(|(cell, n)| {
                let n = n as f64;
                (cell, if normalize { n / total } else { n })
            })
            .collect()
    }

    /// Summary statistics. Numeric columns report count, mean, std, min,
    /// quartiles and max; other columns report count, unique, top and freq.
    pub fn describe(&self) -> Vec<(String, Cell)> {
        if self.dtype.is_numeric() {
            let xs: Vec<f64> = self.values.iter().filter_map(Cell::as_f64).collect();
            let count = xs.len() as f64;
            let mean = if xs.is_empty() {
                Cell::Null
            } else {
                Cell::float(xs.iter().sum::<f64>() / count)
            };
            let min = xs.iter().cloned().fold(None, |m: Option<f64>, x| Some(m.map_or(x, |m| m.min(x))));
            let max = xs.iter().cloned().fold(None, |m: Option<f64>, x| Some(m.map_or(x, |m| m.max(x))));

            vec![
                ("count".into(), Cell::Float(count)),
                ("mean".into(), mean),
                ("std".into(), sample_std(&xs)),
                ("min".into(), min.map(Cell::Float).unwrap_or(Cell::Null)),
                ("25%".into(), quantile(xs.clone(), 0.25)),
                ("50%".into(), quantile(xs.clone(), 0.5)),
                ("75%".into(), quantile(xs, 0.75)),
                ("max".into(), max.map(Cell::Float).unwrap_or(Cell::Null)),
            ]
        } else {
            let non_null: Vec<Cell> = self.non_null().into_iter().cloned().collect();
            let counts = Series::with_dtype(self.name.clone(), self.dtype, non_null.clone()).value_counts(false);
            let (top, freq) = counts
                .first()
                .map(|(cell, n)| (cell.clone(), Cell::Int(*n as i64)))
                .unwrap_or((Cell::Null, Cell::Null));

            vec![
                ("count".into(), Cell::Int(non_null.len() as i64)),
                ("unique".into(), Cell::Int(counts.len() as i64)),
                ("top".into(), top),
                ("freq".into(), freq),
            ]
        }
    }

    /// Plain-text rendering of [`Series::describe`]
    pub fn describe_text(&self) -> String {
        let stats = self.describe();
        let rows: Vec<(String, String)> = stats.into_iter().map(|(k, v)| (k, v.to_string())).collect();
        let mut out = render_pairs(&rows);
        out.push_str(&format!("Name: {}, dtype: {}", self.name, self.dtype));
        out
    }
}

/// Render label/value pairs as two aligned columns, one per line
pub(crate) fn render_pairs(rows: &[(String, String)]) -> String {
    let label_width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let value_width = rows.iter().map(|(_, v)| v.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in rows {
        out.push_str(&format!(
            "{:<lw$}    {:>vw$}\n",
            label,
            value,
            lw = label_width,
            vw = value_width
        ));
    }
    out
}

/// Linear-interpolated quantile of the given values
fn quantile(mut xs: Vec<f64>, q: f64) -> Cell {
    if xs.is_empty() {
        return Cell::Null;
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q * (xs.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Cell::float(xs[lo] + (xs[hi] - xs[lo]) * frac)
}

fn sample_std(xs: &[f64]) -> Cell {
    if xs.len() < 2 {
        return Cell::Null;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Cell::float(var.sqrt())
}
