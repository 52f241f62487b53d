use std::{
  collections::HashSet,
  path::{Path, PathBuf},
};

use kurbo::Point;
use log::{info, warn};
use peniko::Color;

use crate::{
  Axes, Plot, Range,
  config::PlotterConfig,
  dataset::Dataset,
  error::{PartitionError, Result},
  regression::{RegressionResult, linregress},
  render::PngWriter,
  theme,
};

/// Label of the data series when the plot is not grouped.
pub const DATA_LABEL: &str = "Data points";
pub const FIT_LABEL: &str = "Fitted line";

/// Fits a line per partition of a dataset and turns each fit into a plot.
pub struct RegressionPlotter {
  config: PlotterConfig,
}

/// One image to be written: where it goes and what it shows.
#[derive(Debug)]
pub struct PlotArtifact {
  pub path:  PathBuf,
  pub group: Option<String>,
  pub plot:  Plot,
}

#[derive(Debug)]
pub struct PartitionFit {
  pub group:    Option<String>,
  pub result:   RegressionResult,
  pub artifact: PlotArtifact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPartition {
  pub group:  Option<String>,
  pub reason: PartitionError,
}

/// Outcome of a run, one entry per partition that was fitted.
#[derive(Debug, Default)]
pub struct RegressionReport {
  pub fits:    Vec<PartitionFit>,
  pub skipped: Vec<SkippedPartition>,
}

impl RegressionPlotter {
  pub fn new(config: PlotterConfig) -> Self { RegressionPlotter { config } }

  pub fn config(&self) -> &PlotterConfig { &self.config }

  /// Loads the configured dataset, fits every partition and writes one PNG per fit.
  pub fn run(&self) -> Result<RegressionReport> {
    let report = self.fit_file()?;
    self.write(&report)?;
    Ok(report)
  }

  /// Loads the configured dataset and fits it. Nothing is written.
  pub fn fit_file(&self) -> Result<RegressionReport> {
    let dataset = Dataset::load(&self.config.path)?;
    info!("reading data from {}", self.config.path.display());
    self.fit(&dataset)
  }

  /// Fits every partition of `dataset` and builds its plot.
  ///
  /// Partitions without usable data are recorded in [`RegressionReport::skipped`] and do not
  /// stop the run. Missing or non-numeric x/y columns fail before any partition is fitted.
  pub fn fit(&self, dataset: &Dataset) -> Result<RegressionReport> {
    let config = &self.config;
    dataset.require_numeric(&config.x)?;
    dataset.require_numeric(&config.y)?;

    let group = match config.group.as_deref() {
      Some(group) if !dataset.has_column(group) => {
        warn!("group `{group}` not found in dataset, plotting all data");
        None
      }
      group => group,
    };

    info!("x axis label: {}", config.x_label);
    info!("y axis label: {}", config.y_label);

    let partitions = dataset.partitions(group)?;
    let count = partitions.len();

    let mut report = RegressionReport::default();
    for (index, partition) in partitions.into_iter().enumerate() {
      let key = partition.key.as_deref();
      if let Some(key) = key {
        info!("plotting {key}");
      }

      let (xs, ys) = partition.numeric_pairs(&config.x, &config.y)?;
      let fitted = if xs.is_empty() || ys.is_empty() {
        Err(PartitionError::EmptyPartition { x: config.x.clone(), y: config.y.clone() })
      } else {
        linregress(&xs, &ys)
      };

      match fitted {
        Ok(result) => {
          info!(
            "{}: slope={:.6} intercept={:.6} r={:.6} p={:.6e} stderr={:.6}",
            key.unwrap_or("all data"),
            result.slope,
            result.intercept,
            result.r_value,
            result.p_value,
            result.stderr,
          );
          let artifact = self.render(key, &xs, &ys, &result, partition_color(index, count));
          report.fits.push(PartitionFit { group: partition.key.clone(), result, artifact });
        }
        Err(reason) => {
          warn!("skipping {}: {reason}", key.unwrap_or("all data"));
          report.skipped.push(SkippedPartition { group: partition.key.clone(), reason });
        }
      }
    }

    Ok(report)
  }

  /// Builds the scatter-plus-fit plot for one partition. Pure: no files, no GPU.
  ///
  /// Points are drawn in `color`, the fitted line in the text colour.
  pub fn render(
    &self,
    group: Option<&str>,
    xs: &[f64],
    ys: &[f64],
    result: &RegressionResult,
    color: Color,
  ) -> PlotArtifact {
    let mut plot = Plot::new();
    plot.x.title(&self.config.x_label);
    plot.y.title(&self.config.y_label);

    plot
      .scatter(xs.iter().zip(ys).map(|(&x, &y)| Point::new(x, y)))
      .color(color)
      .label(group.unwrap_or(DATA_LABEL));

    if let Some(range) = Range::from_values(xs.iter().copied()) {
      plot
        .line([
          Point::new(range.min, result.predict(range.min)),
          Point::new(range.max, result.predict(range.max)),
        ])
        .color(theme::TEXT_COLOR)
        .width(2.5)
        .label(FIT_LABEL);
    }

    PlotArtifact { path: self.config.output_path(group), group: group.map(String::from), plot }
  }

  /// Rasterizes every fitted partition to its PNG file.
  pub fn write(&self, report: &RegressionReport) -> Result<()> {
    if report.fits.is_empty() {
      warn!("no partition had enough data to plot, nothing written");
      return Ok(());
    }

    for path in report.duplicate_paths() {
      warn!("several groups are written to {}, only the last one is kept", path.display());
    }

    self.config.image.validate()?;
    let mut writer = PngWriter::new()?;
    for fit in &report.fits {
      info!("saving plot to {}", fit.artifact.path.display());
      writer.write(&fit.artifact.plot, self.config.image, &fit.artifact.path)?;
      info!("plot saved!");
    }

    info!("all plots generated!");
    Ok(())
  }
}

impl PlotArtifact {
  /// The raw `(x, y)` points shown in the scatter.
  pub fn points(&self) -> &[Point] {
    self
      .plot
      .axes()
      .iter()
      .find_map(|ax| match ax {
        Axes::Scatter(sa) => Some(sa.points()),
        _ => None,
      })
      .unwrap_or(&[])
  }

  /// End points of the fitted line.
  pub fn fitted_line(&self) -> Option<(Point, Point)> {
    self.plot.axes().iter().find_map(|ax| match ax {
      Axes::Line(la) => match la.points() {
        [first, .., last] => Some((*first, *last)),
        _ => None,
      },
      _ => None,
    })
  }
}

impl RegressionReport {
  pub fn results(&self) -> impl Iterator<Item = &RegressionResult> + '_ {
    self.fits.iter().map(|f| &f.result)
  }

  pub fn artifacts(&self) -> impl Iterator<Item = &PlotArtifact> + '_ {
    self.fits.iter().map(|f| &f.artifact)
  }

  pub fn slopes(&self) -> Vec<f64> { self.results().map(|r| r.slope).collect() }
  pub fn intercepts(&self) -> Vec<f64> { self.results().map(|r| r.intercept).collect() }
  pub fn r_values(&self) -> Vec<f64> { self.results().map(|r| r.r_value).collect() }
  pub fn p_values(&self) -> Vec<f64> { self.results().map(|r| r.p_value).collect() }
  pub fn stderrs(&self) -> Vec<f64> { self.results().map(|r| r.stderr).collect() }

  /// Output paths shared by more than one fit, e.g. groups `a/b` and `a_b`.
  pub fn duplicate_paths(&self) -> Vec<&Path> {
    let mut seen = HashSet::new();
    let mut duplicates = vec![];
    for path in self.artifacts().map(|a| a.path.as_path()) {
      if !seen.insert(path) && !duplicates.contains(&path) {
        duplicates.push(path);
      }
    }
    duplicates
  }
}

/// Spreads partitions evenly over the palette, in partition order.
fn partition_color(index: usize, count: usize) -> Color {
  if count <= 1 {
    return theme::ROCKET.sample(0.0);
  }
  theme::ROCKET.sample(index as f32 / (count - 1) as f32)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use polars::prelude::*;

  use super::*;
  use crate::{
    LegendKind, RenderConfig,
    error::{RegressError, RenderError},
  };

  fn doubling(groups: &[&str]) -> Dataset {
    Dataset::from_frame(
      df! {
        "x" => &[1.0, 2.0, 3.0],
        "y" => &[2.0, 4.0, 6.0],
        "g" => groups,
      }
      .unwrap(),
    )
  }

  fn plotter(group: Option<&str>) -> RegressionPlotter {
    let mut config = PlotterConfig::new("unused.csv", "x", "y").output("fit");
    config.group = group.map(String::from);
    RegressionPlotter::new(config)
  }

  #[test]
  fn ungrouped_fit() {
    let report = plotter(None).fit(&doubling(&["A", "A", "B"])).unwrap();

    assert_eq!(report.fits.len(), 1);
    assert!(report.skipped.is_empty());
    assert_abs_diff_eq!(report.slopes()[0], 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(report.intercepts()[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(report.r_values()[0], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(report.p_values()[0], 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.stderrs()[0], 0.0, epsilon = 1e-9);

    let artifact = &report.fits[0].artifact;
    assert_eq!(artifact.path, PathBuf::from("fit.png"));
    assert_eq!(artifact.group, None);
  }

  #[test]
  fn single_point_group_is_skipped() {
    let report = plotter(Some("g")).fit(&doubling(&["A", "A", "B"])).unwrap();

    assert_eq!(report.fits.len(), 1);
    assert_eq!(report.fits[0].group.as_deref(), Some("A"));
    assert_eq!(report.fits[0].result.n, 2);
    assert_abs_diff_eq!(report.fits[0].result.slope, 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(report.fits[0].result.intercept, 0.0, epsilon = 1e-12);
    assert_eq!(report.fits[0].artifact.path, PathBuf::from("fit_A.png"));

    assert_eq!(report.skipped, vec![SkippedPartition {
      group:  Some("B".into()),
      reason: PartitionError::InsufficientPoints(1),
    }]);
  }

  #[test]
  fn unknown_group_plots_everything() {
    let report = plotter(Some("species")).fit(&doubling(&["A", "A", "B"])).unwrap();
    assert_eq!(report.fits.len(), 1);
    assert_eq!(report.fits[0].artifact.path, PathBuf::from("fit.png"));
  }

  #[test]
  fn empty_partition_does_not_stop_others() {
    let dataset = Dataset::from_frame(
      df! {
        "x" => &[Some(1.0), Some(2.0), Some(3.0), None, None],
        "y" => &[Some(1.0), Some(3.0), Some(5.0), Some(1.0), Some(2.0)],
        "g" => &["keep", "keep", "keep", "gone", "gone"],
      }
      .unwrap(),
    );
    let report = plotter(Some("g")).fit(&dataset).unwrap();

    assert_eq!(report.fits.len(), 1);
    assert_eq!(report.fits[0].group.as_deref(), Some("keep"));
    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(report.skipped[0].reason, PartitionError::EmptyPartition { .. }));
  }

  #[test]
  fn missing_column_fails_before_fitting() {
    let mut config = PlotterConfig::new("unused.csv", "x", "petal_width");
    config.group = Some("g".into());
    let err = RegressionPlotter::new(config).fit(&doubling(&["A", "A", "B"])).unwrap_err();
    assert!(matches!(err, RegressError::MissingColumn(name) if name == "petal_width"));
  }

  #[test]
  fn artifact_holds_points_and_fitted_line() {
    let dataset = Dataset::from_frame(
      df! {
        "x" => &[3.0, 1.0, 2.0],
        "y" => &[7.0, 3.0, 5.0],
      }
      .unwrap(),
    );
    let report = plotter(None).fit(&dataset).unwrap();
    let artifact = &report.fits[0].artifact;

    assert_eq!(artifact.points().len(), 3);
    let (start, end) = artifact.fitted_line().unwrap();
    assert_eq!(start.x, 1.0);
    assert_eq!(end.x, 3.0);
    assert_abs_diff_eq!(start.y, 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(end.y, 7.0, epsilon = 1e-12);

    let legend = artifact.plot.legend_items();
    assert_eq!(legend[0].label, DATA_LABEL);
    assert_eq!(legend[0].kind, LegendKind::Marker);
    assert_eq!(legend[1].label, FIT_LABEL);
    assert_eq!(artifact.plot.x.get_title(), Some("x"));
  }

  #[test]
  fn grouped_scatter_is_labelled_by_group() {
    let dataset = Dataset::from_frame(
      df! {
        "x" => &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0],
        "y" => &[1.0, 2.0, 3.0, 3.0, 2.0, 1.0],
        "g" => &["up", "up", "up", "down", "down", "down"],
      }
      .unwrap(),
    );
    let report = plotter(Some("g")).fit(&dataset).unwrap();

    let labels: Vec<_> =
      report.artifacts().map(|a| a.plot.legend_items()[0].label.clone()).collect();
    assert_eq!(labels, ["up", "down"]);
    assert_abs_diff_eq!(report.slopes()[0], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(report.slopes()[1], -1.0, epsilon = 1e-12);
  }

  #[test]
  fn partitions_get_distinct_colours() {
    let dataset = Dataset::from_frame(
      df! {
        "x" => &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0],
        "y" => &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0],
        "g" => &["a", "a", "b", "b", "c", "c"],
      }
      .unwrap(),
    );
    let report = plotter(Some("g")).fit(&dataset).unwrap();

    let colours: Vec<_> =
      report.artifacts().map(|a| a.plot.legend_items()[0].color.to_rgba8()).collect();
    assert_eq!(colours[0], theme::ROCKET.sample(0.0).to_rgba8());
    assert_eq!(colours[2], theme::ROCKET.sample(1.0).to_rgba8());
    assert_ne!(colours[0], colours[1]);
    assert_ne!(colours[1], colours[2]);

    for artifact in report.artifacts() {
      let fit = &artifact.plot.legend_items()[1];
      assert_eq!(fit.kind, LegendKind::Line);
      assert_eq!(fit.color.to_rgba8(), theme::TEXT_COLOR.to_rgba8());
    }
  }

  #[test]
  fn colliding_group_names_are_detected() {
    let dataset = Dataset::from_frame(
      df! {
        "x" => &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0],
        "y" => &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0],
        "g" => &["a/b", "a/b", "a_b", "a_b", "c", "c"],
      }
      .unwrap(),
    );
    let report = plotter(Some("g")).fit(&dataset).unwrap();

    assert_eq!(report.fits.len(), 3);
    assert_eq!(report.duplicate_paths(), [Path::new("fit_a_b.png")]);
    assert!(plotter(None).fit(&doubling(&["A", "A", "B"])).unwrap().duplicate_paths().is_empty());
  }

  #[test]
  fn invalid_image_size_fails_before_rendering() {
    let mut plotter = plotter(None);
    plotter.config.image = RenderConfig { width: 0, height: 100 };
    let report = plotter.fit(&doubling(&["A", "A", "B"])).unwrap();

    let err = plotter.write(&report).unwrap_err();
    assert!(matches!(err, RegressError::Render(RenderError::Size { width: 0, height: 100 })));
  }

  #[test]
  fn nothing_to_write_is_not_an_error() {
    let dataset = Dataset::from_frame(df! { "x" => &[1.0], "y" => &[1.0] }.unwrap());
    let plotter = plotter(None);
    let report = plotter.fit(&dataset).unwrap();

    assert!(report.fits.is_empty());
    assert!(plotter.write(&report).is_ok());
  }
}
