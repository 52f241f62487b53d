use std::path::{Path, PathBuf};

use crate::render::RenderConfig;

/// Everything one plotting run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotterConfig {
  pub path:    PathBuf,
  pub x:       String,
  pub y:       String,
  pub x_label: String,
  pub y_label: String,
  /// Base name of the output images, without the `.png` extension.
  pub output:  String,
  pub group:   Option<String>,
  pub image:   RenderConfig,
}

impl Default for PlotterConfig {
  fn default() -> Self {
    PlotterConfig {
      path:    PathBuf::from("iris.csv"),
      x:       "petal_length_cm".into(),
      y:       "sepal_length_cm".into(),
      x_label: "Petal Length (cm)".into(),
      y_label: "Sepal Length (cm)".into(),
      output:  "linear_regression".into(),
      group:   None,
      image:   RenderConfig::default(),
    }
  }
}

impl PlotterConfig {
  pub fn new(path: impl AsRef<Path>, x: &str, y: &str) -> Self {
    PlotterConfig {
      path: path.as_ref().to_path_buf(),
      x: x.to_string(),
      y: y.to_string(),
      x_label: x.to_string(),
      y_label: y.to_string(),
      ..Default::default()
    }
  }

  pub fn labels(mut self, x_label: &str, y_label: &str) -> Self {
    self.x_label = x_label.to_string();
    self.y_label = y_label.to_string();
    self
  }

  pub fn output(mut self, output: &str) -> Self {
    self.output = output.to_string();
    self
  }

  pub fn group(mut self, group: &str) -> Self {
    self.group = Some(group.to_string());
    self
  }

  /// `<output>.png`, or `<output>_<group>.png` for a grouped partition.
  pub fn output_path(&self, group: Option<&str>) -> PathBuf {
    match group {
      Some(group) => PathBuf::from(format!("{}_{}.png", self.output, sanitize(group))),
      None => PathBuf::from(format!("{}.png", self.output)),
    }
  }
}

// Group values end up in file names.
fn sanitize(value: &str) -> String {
  value.chars().map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c }).collect()
}
