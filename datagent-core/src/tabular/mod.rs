//! # Tabular Data
//!
//! A small typed frame model for the data actions: scalar [`Cell`]s,
//! named [`Series`] with an inferred dtype, [`DataFrame`]s built from them,
//! CSV loading, and the alias-keyed [`FrameStore`].

mod cell;
mod frame;
mod reader;
mod series;
mod store;

pub use cell::{Cell, DType};
pub use frame::{render_labelled, DataFrame, JoinHow, MergeOptions, StatsTable};
pub use reader::{read_csv, read_frame};
pub use series::Series;
pub use store::FrameStore;
