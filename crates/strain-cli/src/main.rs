use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use plotters::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use strain_lib::{
    dataset::{Channel, Dataset},
    io::{csv as csv_io, text as text_io},
    metrics::{
        align::AlignedTrend,
        baseline::Regime,
        rate::{strain_rate_from_trends, StrainRate},
    },
    pipeline::{average_channel, calibrate_cycles, run_analysis, AnalysisConfig, CycleSummary},
    plot::{figure_from_strain_rate, figure_from_trend, Figure, Series},
};

#[derive(Parser)]
#[command(
    name = "strain",
    version,
    about = "Cycle calibration and averaging for tissue strain recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every analysis command.
#[derive(Args)]
struct AnalysisArgs {
    /// CSV recording with `Time (s)`, `RRWidth` and `RRLength` columns
    #[arg(long)]
    input: PathBuf,
    /// TOML analysis config (regime, cycles, averaging range)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Cycle bounds file (`id,start,end` per line); replaces the config's cycles
    #[arg(long)]
    cycles: Option<PathBuf>,
    /// Override the config's regime (spontaneous | pacing)
    #[arg(long)]
    regime: Option<Regime>,
}

#[derive(Subcommand)]
enum Commands {
    /// Label, normalize and baseline every cycle; print per-cycle summaries
    Calibrate {
        #[command(flatten)]
        args: AnalysisArgs,
        /// Write the augmented table here
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Average one channel across cycles on a common relative-time grid
    Average {
        #[command(flatten)]
        args: AnalysisArgs,
        #[arg(long, default_value = "width")]
        channel: Channel,
    },
    /// Smoothed strain rate of the averaged length and width trends
    StrainRate {
        #[command(flatten)]
        args: AnalysisArgs,
    },
    /// Run every stage and print the full report
    Analyze {
        #[command(flatten)]
        args: AnalysisArgs,
    },
    /// Render an averaged trend with its std band to a PNG
    PlotAverage {
        #[command(flatten)]
        args: AnalysisArgs,
        #[arg(long, default_value = "width")]
        channel: Channel,
        #[arg(long)]
        out: PathBuf,
    },
    /// Render the strain rate curves to a PNG
    PlotRate {
        #[command(flatten)]
        args: AnalysisArgs,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Calibrate { args, out } => cmd_calibrate(&args, out.as_deref())?,
        Commands::Average { args, channel } => cmd_average(&args, channel)?,
        Commands::StrainRate { args } => cmd_strain_rate(&args)?,
        Commands::Analyze { args } => cmd_analyze(&args)?,
        Commands::PlotAverage { args, channel, out } => cmd_plot_average(&args, channel, &out)?,
        Commands::PlotRate { args, out } => cmd_plot_rate(&args, &out)?,
    }
    Ok(())
}

fn load_inputs(args: &AnalysisArgs) -> Result<(Dataset, AnalysisConfig)> {
    let dataset = csv_io::read_dataset(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let mut cfg = match &args.config {
        Some(path) => AnalysisConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(path) = &args.cycles {
        cfg.cycles = text_io::read_cycle_windows(path)
            .with_context(|| format!("failed to read cycles {}", path.display()))?;
    }
    if let Some(regime) = args.regime {
        cfg.regime = regime;
    }
    info!(
        "{} samples, {} cycles, {} regime",
        dataset.len(),
        cfg.cycles.len(),
        cfg.regime
    );
    Ok((dataset, cfg))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn cmd_calibrate(args: &AnalysisArgs, out: Option<&Path>) -> Result<()> {
    let (mut dataset, cfg) = load_inputs(args)?;
    let calibration = calibrate_cycles(&mut dataset, &cfg)?;
    if let Some(path) = out {
        csv_io::write_dataset(path, &dataset)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    let summaries: &[CycleSummary] = &calibration.summaries;
    print_json(&summaries)
}

fn average(args: &AnalysisArgs, channel: Channel) -> Result<AlignedTrend> {
    let (mut dataset, cfg) = load_inputs(args)?;
    let calibration = calibrate_cycles(&mut dataset, &cfg)?;
    Ok(average_channel(&calibration, channel, &cfg)?)
}

fn strain_rate(args: &AnalysisArgs) -> Result<StrainRate> {
    let (mut dataset, cfg) = load_inputs(args)?;
    let calibration = calibrate_cycles(&mut dataset, &cfg)?;
    let length = average_channel(&calibration, Channel::Length, &cfg)?;
    let width = average_channel(&calibration, Channel::Width, &cfg)?;
    Ok(strain_rate_from_trends(&length, &width, &cfg.rate)?)
}

fn cmd_average(args: &AnalysisArgs, channel: Channel) -> Result<()> {
    print_json(&average(args, channel)?)
}

fn cmd_strain_rate(args: &AnalysisArgs) -> Result<()> {
    print_json(&strain_rate(args)?)
}

fn cmd_analyze(args: &AnalysisArgs) -> Result<()> {
    let (mut dataset, cfg) = load_inputs(args)?;
    let report = run_analysis(&mut dataset, &cfg)?;
    print_json(&report)
}

fn cmd_plot_average(args: &AnalysisArgs, channel: Channel, out: &Path) -> Result<()> {
    let trend = average(args, channel)?;
    draw_plotters_figure(out, &figure_from_trend(&trend))
}

fn cmd_plot_rate(args: &AnalysisArgs, out: &Path) -> Result<()> {
    let rate = strain_rate(args)?;
    draw_plotters_figure(out, &figure_from_strain_rate(&rate))
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let (x_min, x_max, y_min, y_max) = fig
        .bounds()
        .context("figure has no points to draw")?;
    let (x_max, y_max) = (x_max.max(x_min + 1e-9), y_max.max(y_min + 1e-9));
    let backend = BitMapBackend::new(path, (800, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    let mut mesh = chart.configure_mesh();
    if let Some(label) = &fig.x.label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &fig.y.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                let style = RGBColor(r, g, b).stroke_width(line.style.width.round().max(1.0) as u32);
                let points = line.points.iter().map(|p| (p[0], p[1]));
                match line.style.dash {
                    Some([on, off]) => {
                        chart.draw_series(DashedLineSeries::new(
                            points,
                            on.round().max(1.0) as u32,
                            off.round().max(1.0) as u32,
                            style,
                        ))?;
                    }
                    None => {
                        chart.draw_series(LineSeries::new(points, style))?;
                    }
                }
            }
        }
    }
    root.present()?;
    Ok(())
}
