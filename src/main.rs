use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use regplot::{PlotterConfig, RegressionPlotter, RenderConfig};

/// Fit a simple linear regression between two columns of a CSV file and plot it.
#[derive(Parser, Debug)]
#[command(name = "regress", version, about)]
struct Cli {
  /// Column plotted on the x axis.
  #[arg(short, long, default_value = "petal_length_cm")]
  x: String,

  /// Column plotted on the y axis.
  #[arg(short, long, default_value = "sepal_length_cm")]
  y: String,

  #[arg(long, default_value = "Petal Length (cm)")]
  x_label: String,

  #[arg(long, default_value = "Sepal Length (cm)")]
  y_label: String,

  /// Base name of the output images; grouped plots get `_<group>` appended.
  #[arg(short, long, default_value = "linear_regression")]
  output: String,

  /// Column whose distinct values each get their own fit and image.
  #[arg(short, long)]
  group: Option<String>,

  /// CSV file with a header row.
  #[arg(short, long, default_value = "iris.csv")]
  path: PathBuf,

  /// Image width in pixels.
  #[arg(long, default_value_t = 1024, value_parser = image_side())]
  width: u32,

  /// Image height in pixels.
  #[arg(long, default_value_t = 1024, value_parser = image_side())]
  height: u32,
}

fn image_side() -> clap::builder::RangedI64ValueParser<u32> {
  clap::value_parser!(u32).range(1..=i64::from(RenderConfig::MAX_SIDE))
}

impl From<Cli> for PlotterConfig {
  fn from(cli: Cli) -> Self {
    PlotterConfig {
      path:    cli.path,
      x:       cli.x,
      y:       cli.y,
      x_label: cli.x_label,
      y_label: cli.y_label,
      output:  cli.output,
      group:   cli.group,
      image:   RenderConfig { width: cli.width, height: cli.height },
    }
  }
}

fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  let plotter = RegressionPlotter::new(Cli::parse().into());
  match plotter.run() {
    Ok(_) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("Error: {e}");
      ExitCode::FAILURE
    }
  }
}
