//! # Data Actions
//!
//! The tabular inspection actions offered to the model. Path-based actions
//! read a file per call; alias-based actions work on frames previously
//! loaded into the session's [`FrameStore`](crate::tabular::FrameStore).
//!
//! Every failure here (missing file, unknown alias, disallowed method) is an
//! ordinary error that the environment reports back to the model.

use crate::action::{Action, ActionArgs, ActionRegistry};
use crate::environment::ActionContext;
use crate::error::{self, Error, Result};
use crate::schema::{ParamType, ParameterSchema, ParameterSpec};
use crate::tabular::{read_frame, render_labelled, Cell, DataFrame, JoinHow, MergeOptions};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Methods `call_dataframe_method` may invoke
pub const FRAME_METHODS: &[&str] = &["head", "describe", "info", "shape", "columns", "mean", "sum"];

/// Methods `call_column_method` may invoke
pub const COLUMN_METHODS: &[&str] = &["mean", "sum", "median", "std", "min", "max"];

/// Default join key for column comparisons
pub const DEFAULT_JOIN_KEY: &str = "sbti_id";

const DEFAULT_HEAD_ROWS: i64 = 5;

fn path_param() -> ParameterSpec {
    ParameterSpec::required("path", ParamType::String, "The path to the dataframe to read from")
}

fn alias_param() -> ParameterSpec {
    ParameterSpec::required("alias", ParamType::String, "Alias of the dataframe to operate on")
}

// =============================================================================
// Action constructors
// =============================================================================

pub fn list_files() -> Result<Action> {
    Action::new(
        "list_files",
        "List all files in the current directory",
        ParameterSchema::new(vec![ParameterSpec::optional(
            "dir",
            ParamType::String,
            "Directory to list. Defaults to the data directory.",
        )]),
        list_files_handler,
    )
}

pub fn load_dataframe() -> Result<Action> {
    Action::new(
        "load_dataframe",
        "Load a dataframe and store under an alias.",
        ParameterSchema::new(vec![
            ParameterSpec::required("alias", ParamType::String, "The alias to assign the dataframe to."),
            ParameterSpec::required("path", ParamType::String, "The path to load the dataframe from."),
        ]),
        load_dataframe_handler,
    )
}

pub fn call_dataframe_method() -> Result<Action> {
    Action::new(
        "call_dataframe_method",
        "Call a safe method on a dataframe registered under an alias. \
         Allowed: head, describe, info, shape, columns, mean, sum.",
        ParameterSchema::new(vec![
            ParameterSpec::required("method", ParamType::String, "The name of the method to call"),
            alias_param(),
            ParameterSpec::optional("args", ParamType::Array, "Positional arguments for the method")
                .with_default(json!([])),
            ParameterSpec::optional("kwargs", ParamType::Object, "Keyword arguments for the method")
                .with_default(json!({})),
        ]),
        call_dataframe_method_handler,
    )
}

pub fn call_column_method() -> Result<Action> {
    Action::new(
        "call_column_method",
        "Apply a method such as mean, min, or max to a single dataframe column.",
        ParameterSchema::new(vec![
            alias_param(),
            ParameterSpec::required("column", ParamType::String, "The column on which to apply the method"),
            ParameterSpec::required("method", ParamType::String, "The name of the method to call"),
        ]),
        call_column_method_handler,
    )
}

pub fn merge_dataframes() -> Result<Action> {
    Action::new(
        "merge_dataframes",
        "Merge two dataframes by their alias and store result under a new alias.",
        ParameterSchema::new(vec![
            ParameterSpec::required("left", ParamType::String, "The alias of the left dataframe."),
            ParameterSpec::required("right", ParamType::String, "The alias of the right dataframe."),
            ParameterSpec::required("on", ParamType::String, "On which column merge the two dataframes"),
            ParameterSpec::optional(
                "how",
                ParamType::String,
                "How to merge the two dataframes: inner, left, right or outer",
            )
            .with_default(json!("inner")),
            ParameterSpec::optional("alias", ParamType::String, "The alias to store the result under."),
        ]),
        merge_dataframes_handler,
    )
}

pub fn list_column_names_of_dataframe() -> Result<Action> {
    Action::new(
        "list_column_names_of_dataframe",
        "List the columns of the dataframe",
        ParameterSchema::new(vec![path_param()]),
        list_column_names_handler,
    )
}

pub fn describe_dataframe() -> Result<Action> {
    Action::new(
        "describe_dataframe",
        "Describe the dataframe",
        ParameterSchema::new(vec![path_param()]),
        describe_dataframe_handler,
    )
}

pub fn show_datatype_of_column() -> Result<Action> {
    Action::new(
        "show_datatype_of_column",
        "Show the datatypes of a particular column. ",
        ParameterSchema::new(vec![
            path_param(),
            ParameterSpec::required(
                "column_name",
                ParamType::String,
                "The name of the column to show the datatype of.",
            ),
        ]),
        show_datatype_handler,
    )
}

pub fn describe_column() -> Result<Action> {
    Action::new(
        "describe_column",
        "Describe a particular column in the dataframe",
        ParameterSchema::new(vec![
            path_param(),
            ParameterSpec::required("column_name", ParamType::String, "The name of the column to describe."),
        ]),
        describe_column_handler,
    )
}

pub fn compare_similarity_column_joined_on_key() -> Result<Action> {
    Action::new(
        "compare_similarity_column_joined_on_key",
        "compare the similarity of a previous and current version of a column joined on key. ",
        ParameterSchema::new(vec![
            ParameterSpec::required("path_df_prev", ParamType::String, "The path to the previous data."),
            ParameterSpec::required("path_df_curr", ParamType::String, "The path to the current data"),
            ParameterSpec::required("column_name", ParamType::String, "The name of the column to compare."),
            ParameterSpec::optional("join_key", ParamType::String, "The key column to join on.")
                .with_default(json!(DEFAULT_JOIN_KEY)),
        ]),
        compare_similarity_handler,
    )
}

/// Every data action, in presentation order
pub fn all_actions() -> Result<Vec<Action>> {
    Ok(vec![
        list_files()?,
        load_dataframe()?,
        call_dataframe_method()?,
        call_column_method()?,
        merge_dataframes()?,
        list_column_names_of_dataframe()?,
        describe_dataframe()?,
        show_datatype_of_column()?,
        describe_column()?,
        compare_similarity_column_joined_on_key()?,
    ])
}

/// Register every data action
pub fn register_data_actions(registry: &mut ActionRegistry) -> Result<()> {
    for action in all_actions()? {
        registry.register(action)?;
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

fn list_files_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let dir = match args.opt_str("dir")? {
        Some(dir) if !dir.is_empty() => Path::new(dir).to_path_buf(),
        _ => ctx.data_dir.clone(),
    };

    let entries = std::fs::read_dir(&dir).map_err(|e| {
        let err = if e.kind() == std::io::ErrorKind::NotFound {
            error::file_not_found(dir.display().to_string())
        } else {
            Error::from(e).with_context("path", dir.display().to_string())
        };
        err.with_operation("actions::list_files")
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::from(e).with_operation("actions::list_files"))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(json!(names))
}

fn load_dataframe_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let alias = args.str("alias")?;
    let frame = load(ctx, args.str("path")?)?;
    let (rows, cols) = frame.shape();
    ctx.frames.insert(alias, frame);
    Ok(json!(format!("Dataframe '{}' loaded with shape ({}, {})", alias, rows, cols)))
}

fn call_dataframe_method_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let frame = ctx.frames.get(args.str("alias")?)?;
    let method = args.str("method")?;
    if !FRAME_METHODS.contains(&method) {
        return Err(Error::method_not_allowed(method).with_operation("actions::call_dataframe_method"));
    }

    let positional = args.array("args")?;
    let keywords = args.object("kwargs")?;

    match method {
        "head" => {
            let n = match positional.first().or_else(|| keywords.get("n")) {
                None | Some(Value::Null) => DEFAULT_HEAD_ROWS,
                Some(v) => v.as_i64().ok_or_else(|| error::argument_type("n", "an integer"))?,
            };
            let rows = if n >= 0 {
                n as usize
            } else {
                frame.num_rows().saturating_sub(n.unsigned_abs() as usize)
            };
            Ok(frame.head(rows).to_records())
        }
        "describe" => {
            let include_all = keywords.get("include").and_then(Value::as_str) == Some("all");
            let table = if include_all { frame.describe_all() } else { frame.describe() };
            Ok(table.to_json())
        }
        "info" => Ok(json!(frame.info())),
        "shape" => {
            let (rows, cols) = frame.shape();
            Ok(json!([rows, cols]))
        }
        "columns" => Ok(json!(frame.column_names())),
        "mean" => Ok(cells_to_object(frame.mean()?)),
        "sum" => Ok(cells_to_object(frame.sum()?)),
        _ => Err(Error::method_not_allowed(method)),
    }
}

fn call_column_method_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let frame = ctx.frames.get(args.str("alias")?)?;
    let series = frame.column(args.str("column")?)?;
    let method = args.str("method")?;

    let cell = match method {
        "mean" => series.mean(),
        "sum" => series.sum(),
        "median" => series.median(),
        "std" => series.std(),
        "min" => series.min(),
        "max" => series.max(),
        _ => Err(Error::method_not_allowed(method)),
    }
    .map_err(|e| e.with_operation("actions::call_column_method"))?;

    Ok(cell.to_json())
}

fn merge_dataframes_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let left = args.str("left")?;
    let right = args.str("right")?;
    let on = args.str("on")?;
    let how: JoinHow = args.opt_str("how")?.unwrap_or("inner").parse()?;

    let merged = ctx
        .frames
        .get(left)?
        .merge(ctx.frames.get(right)?, on, &MergeOptions::default().how(how))?;

    let alias = match args.opt_str("alias")? {
        Some(alias) => alias.to_string(),
        None => format!("{}_{}_merged", left, right),
    };
    let (rows, cols) = merged.shape();
    ctx.frames.insert(alias.clone(), merged);
    Ok(json!(format!(
        "Merged dataframe stored as '{}' with shape ({}, {})",
        alias, rows, cols
    )))
}

fn list_column_names_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let frame = load(ctx, args.str("path")?)?;
    Ok(json!(frame.column_names()))
}

fn describe_dataframe_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let frame = load(ctx, args.str("path")?)?;
    let table = frame
        .describe_all()
        .transpose()
        .select(&["count", "unique", "freq", "mean", "std"]);
    Ok(json!(table.to_text()))
}

fn show_datatype_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let frame = load(ctx, args.str("path")?)?;
    let series = frame.column(args.str("column_name")?)?;
    Ok(json!(series.dtype().as_str()))
}

fn describe_column_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let frame = load(ctx, args.str("path")?)?;
    let series = frame.column(args.str("column_name")?)?;

    let percentages = percentage_lines(series.value_counts(true));
    Ok(json!(format!(
        "Description of column: {} \n \n Normalized value counts: {}",
        series.describe_text(),
        percentages
    )))
}

fn compare_similarity_handler(ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
    let column = args.str("column_name")?;
    let join_key = args.opt_str("join_key")?.unwrap_or(DEFAULT_JOIN_KEY);
    let prev = load(ctx, args.str("path_df_prev")?)?;
    let curr = load(ctx, args.str("path_df_curr")?)?;

    let options = MergeOptions::default()
        .how(JoinHow::Outer)
        .suffixes("_prev", "_curr")
        .indicator("_merge");
    let joined = prev
        .merge(&curr, join_key, &options)
        .map_err(|e| e.with_operation("actions::compare_similarity_column_joined_on_key"))?;

    let merge_stats = percentage_lines(joined.column("_merge")?.value_counts(true));

    let before = joined.column(&format!("{}_prev", column))?;
    let after = joined.column(&format!("{}_curr", column))?;
    let both: Vec<usize> = joined
        .column("_merge")?
        .values()
        .iter()
        .enumerate()
        .filter(|(_, tag)| matches!(tag, Cell::Str(s) if s == "both"))
        .map(|(i, _)| i)
        .collect();

    let unequal = both
        .iter()
        .filter(|&&row| !before.get(row).same_value(after.get(row)))
        .count();
    let percent_diff = if both.is_empty() {
        "NaN%".to_string()
    } else {
        format!("{:.3}%", unequal as f64 / both.len() as f64 * 100.0)
    };

    Ok(json!(format!(
        "Analyzed similarity of column {}: The percentages of merges (both, only old, only new) are: \n {}\n. \
         The percentage of values that could be merged that are unequal is {}.",
        column, merge_stats, percent_diff
    )))
}

// =============================================================================
// Helpers
// =============================================================================

fn load(ctx: &ActionContext, path: &str) -> Result<DataFrame> {
    read_frame(&ctx.resolve(path))
}

fn cells_to_object(pairs: Vec<(String, Cell)>) -> Value {
    let map: Map<String, Value> = pairs.into_iter().map(|(k, v)| (k, v.to_json())).collect();
    Value::Object(map)
}

/// Normalized counts rendered as `value    12.345%` lines
fn percentage_lines(counts: Vec<(Cell, f64)>) -> String {
    let pairs: Vec<(String, Cell)> = counts
        .into_iter()
        .map(|(value, frac)| (value.to_string(), Cell::Float(frac * 100.0)))
        .collect();
    render_labelled(&pairs, |c| match c.as_f64() {
        Some(pct) => format!("{:.3}%", pct),
        None => "NaN%".to_string(),
    })
}
