use std::{
  io::{self, Cursor},
  path::Path,
};

use polars::prelude::*;

use crate::error::{DataLoadError, RegressError};

/// Cell contents read as missing values, the same set pandas' `read_csv` uses.
const MISSING_TOKENS: &[&str] = &[
  "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
  "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// The table a run works on. Loaded once and never modified.
#[derive(Debug, Clone)]
pub struct Dataset {
  frame: DataFrame,
}

/// Rows sharing one value of the grouping column, or the whole table when ungrouped.
#[derive(Debug, Clone)]
pub struct Partition {
  /// Group value rendered as text. `None` for the ungrouped table.
  pub key:   Option<String>,
  pub frame: DataFrame,
}

impl Dataset {
  /// Reads a CSV file with a header row.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
      io::ErrorKind::NotFound => DataLoadError::NotFound(path.to_path_buf()),
      _ => DataLoadError::Io { path: path.to_path_buf(), source },
    })?;

    Self::parse_csv(bytes, path)
  }

  fn parse_csv(bytes: Vec<u8>, path: &Path) -> Result<Self, DataLoadError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Err(DataLoadError::Empty(path.to_path_buf()));
    }

    let null_values = NullValues::AllColumns(MISSING_TOKENS.iter().map(|&t| t.into()).collect());
    let frame = CsvReadOptions::default()
      .with_has_header(true)
      .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
      .into_reader_with_file_handle(Cursor::new(bytes))
      .finish()
      .map_err(|source| match source {
        PolarsError::NoData(_) => DataLoadError::Empty(path.to_path_buf()),
        source => DataLoadError::Parse { path: path.to_path_buf(), source },
      })?;

    if frame.width() == 0 || frame.height() == 0 {
      return Err(DataLoadError::Empty(path.to_path_buf()));
    }

    Ok(Dataset { frame })
  }

  pub fn from_frame(frame: DataFrame) -> Self { Dataset { frame } }

  pub fn frame(&self) -> &DataFrame { &self.frame }

  pub fn height(&self) -> usize { self.frame.height() }

  pub fn has_column(&self, name: &str) -> bool { self.frame.get_column_index(name).is_some() }

  /// Checks that `name` exists and holds numbers.
  pub fn require_numeric(&self, name: &str) -> Result<(), RegressError> {
    let column =
      self.frame.column(name).map_err(|_| RegressError::MissingColumn(name.to_string()))?;
    ensure_numeric(column)
  }

  /// Splits the table by the distinct values of `group`, in first-seen order.
  ///
  /// Without a grouping column, or when the column does not exist, the whole table is the only
  /// partition.
  pub fn partitions(&self, group: Option<&str>) -> PolarsResult<Vec<Partition>> {
    let Some(group) = group.filter(|g| self.has_column(g)) else {
      return Ok(vec![Partition { key: None, frame: self.frame.clone() }]);
    };

    self
      .frame
      .partition_by_stable([group], true)?
      .into_iter()
      .map(|frame| {
        let key = group_label(&frame.column(group)?.get(0)?);
        Ok(Partition { key: Some(key), frame })
      })
      .collect()
  }
}

impl Partition {
  /// The `(x, y)` pairs of this partition as `f64`. Rows missing either value are dropped.
  pub fn numeric_pairs(&self, x: &str, y: &str) -> Result<(Vec<f64>, Vec<f64>), RegressError> {
    let xs = numeric_values(&self.frame, x)?;
    let ys = numeric_values(&self.frame, y)?;

    Ok(
      xs.into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip(),
    )
  }
}

fn ensure_numeric(column: &Column) -> Result<(), RegressError> {
  match column.dtype() {
    dtype if dtype.is_primitive_numeric() || *dtype == DataType::Null => Ok(()),
    dtype => Err(RegressError::NonNumericColumn {
      column: column.name().to_string(),
      dtype:  dtype.to_string(),
    }),
  }
}

fn numeric_values(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, RegressError> {
  let column = frame.column(name).map_err(|_| RegressError::MissingColumn(name.to_string()))?;
  ensure_numeric(column)?;

  let series = column.as_materialized_series().cast(&DataType::Float64)?;
  Ok(series.f64()?.into_iter().collect())
}

fn group_label(value: &AnyValue) -> String {
  match value.get_str() {
    Some(s) => s.to_string(),
    None => value.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;

  fn iris_like() -> Dataset {
    Dataset::from_frame(
      df! {
        "x" => &[1.0, 2.0, 3.0, 4.0, 5.0],
        "y" => &[2.0, 4.0, 6.0, 8.0, 10.0],
        "species" => &["a", "a", "b", "c", "b"],
      }
      .unwrap(),
    )
  }

  #[test]
  fn ungrouped_is_one_partition() {
    let parts = iris_like().partitions(None).unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].key, None);
    assert_eq!(parts[0].frame.height(), 5);
  }

  #[test]
  fn unknown_group_column_is_one_partition() {
    let parts = iris_like().partitions(Some("colour")).unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].key, None);
  }

  #[test]
  fn partitions_follow_first_seen_order() {
    let parts = iris_like().partitions(Some("species")).unwrap();
    let keys: Vec<_> = parts.iter().map(|p| p.key.clone().unwrap()).collect();
    assert_eq!(keys, ["a", "b", "c"]);

    let (xs, ys) = parts[1].numeric_pairs("x", "y").unwrap();
    assert_eq!(xs, [3.0, 5.0]);
    assert_eq!(ys, [6.0, 10.0]);
  }

  #[test]
  fn numeric_group_values_are_labelled() {
    let dataset = Dataset::from_frame(
      df! {
        "x" => &[1.0, 2.0, 3.0],
        "y" => &[1.0, 2.0, 3.0],
        "batch" => &[7i64, 7, 9],
      }
      .unwrap(),
    );
    let keys: Vec<_> =
      dataset.partitions(Some("batch")).unwrap().into_iter().map(|p| p.key.unwrap()).collect();
    assert_eq!(keys, ["7", "9"]);
  }

  #[test]
  fn missing_values_are_dropped() {
    let dataset = Dataset::from_frame(
      df! {
        "x" => &[Some(1.0), None, Some(3.0), Some(4.0)],
        "y" => &[Some(1.0), Some(2.0), None, Some(f64::NAN)],
      }
      .unwrap(),
    );
    let parts = dataset.partitions(None).unwrap();
    let (xs, ys) = parts[0].numeric_pairs("x", "y").unwrap();
    assert_eq!(xs, [1.0]);
    assert_eq!(ys, [1.0]);
  }

  #[test]
  fn integer_columns_are_numeric() {
    let dataset = Dataset::from_frame(df! { "x" => &[1i32, 2], "y" => &[3i64, 4] }.unwrap());
    let (xs, ys) = dataset.partitions(None).unwrap()[0].numeric_pairs("x", "y").unwrap();
    assert_eq!(xs, [1.0, 2.0]);
    assert_eq!(ys, [3.0, 4.0]);
  }

  #[test]
  fn column_checks() {
    let dataset = iris_like();
    assert!(dataset.require_numeric("x").is_ok());
    assert!(matches!(
      dataset.require_numeric("petal_width"),
      Err(RegressError::MissingColumn(name)) if name == "petal_width"
    ));
    assert!(matches!(
      dataset.require_numeric("species"),
      Err(RegressError::NonNumericColumn { column, .. }) if column == "species"
    ));
  }

  #[test]
  fn parses_csv_bytes() {
    let csv = b"a,b,g\n1,2,x\n2,4,y\n3,6.5,x\n".to_vec();
    let dataset = Dataset::parse_csv(csv, Path::new("inline.csv")).unwrap();
    assert_eq!(dataset.height(), 3);
    assert!(dataset.has_column("g"));
    assert!(dataset.require_numeric("b").is_ok());
  }

  #[test]
  fn missing_value_tokens_keep_columns_numeric() {
    let csv = b"x,y\n1,2\n2,4\nNA,5\n3,N/A\n4,8\n".to_vec();
    let dataset = Dataset::parse_csv(csv, Path::new("gaps.csv")).unwrap();
    assert!(dataset.require_numeric("x").is_ok());
    assert!(dataset.require_numeric("y").is_ok());

    let (xs, ys) = dataset.partitions(None).unwrap()[0].numeric_pairs("x", "y").unwrap();
    assert_eq!(xs, [1.0, 2.0, 4.0]);
    assert_eq!(ys, [2.0, 4.0, 8.0]);
  }

  #[test]
  fn blank_input_is_empty() {
    let err = Dataset::parse_csv(b" \n\n".to_vec(), Path::new("blank.csv")).unwrap_err();
    assert!(matches!(err, DataLoadError::Empty(path) if path == PathBuf::from("blank.csv")));
  }

  #[test]
  fn header_only_is_empty() {
    let err = Dataset::parse_csv(b"x,y\n".to_vec(), Path::new("header.csv")).unwrap_err();
    assert!(matches!(err, DataLoadError::Empty(_)));
  }

  #[test]
  fn missing_file_is_not_found() {
    let path = std::env::temp_dir().join("regplot-does-not-exist.csv");
    assert!(matches!(Dataset::load(&path), Err(DataLoadError::NotFound(p)) if p == path));
  }
}
