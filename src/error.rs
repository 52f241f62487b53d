use std::path::PathBuf;

use polars::error::PolarsError;
use thiserror::Error;

/// Failures while reading the dataset. Always fatal: nothing is plotted.
#[derive(Error, Debug)]
pub enum DataLoadError {
  #[error("file not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("empty dataset: {}", .0.display())]
  Empty(PathBuf),

  #[error("could not parse {}: {source}", path.display())]
  Parse {
    path:   PathBuf,
    #[source]
    source: PolarsError,
  },

  #[error("could not read {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Fatal errors of a plotting run.
#[derive(Error, Debug)]
pub enum RegressError {
  #[error(transparent)]
  Load(#[from] DataLoadError),

  #[error("column `{0}` not found in dataset")]
  MissingColumn(String),

  #[error("column `{column}` is not numeric ({dtype})")]
  NonNumericColumn { column: String, dtype: String },

  #[error(transparent)]
  Polars(#[from] PolarsError),

  #[error(transparent)]
  Render(#[from] RenderError),
}

/// Reasons a single partition produces no fit. These never abort a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
  #[error("no data for `{x}` / `{y}`")]
  EmptyPartition { x: String, y: String },

  #[error("need at least 2 points for a regression, got {0}")]
  InsufficientPoints(usize),

  #[error("all x values are identical ({0}), slope is undefined")]
  ConstantX(f64),
}

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("invalid image size {width}x{height}")]
  Size { width: u32, height: u32 },

  #[error("no suitable GPU adapter: {0}")]
  Adapter(String),

  #[error("failed to create GPU device: {0}")]
  Device(String),

  #[error("failed to create renderer: {0}")]
  Renderer(String),

  #[error("failed to read back rendered image: {0}")]
  Readback(String),

  #[error("failed to write {}: {source}", path.display())]
  Image {
    path:   PathBuf,
    #[source]
    source: image::ImageError,
  },
}

pub type Result<T, E = RegressError> = std::result::Result<T, E>;
