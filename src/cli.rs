use crate::config::load_config;
use crate::layout::LabelEngine;
use crate::layout_dump::write_layout_dump;
use crate::render::{MarkerStore, render_svg, write_output_png, write_output_svg};
use crate::scene::parse_scene;
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use log::{LevelFilter, Log, Metadata, Record};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "vlabel",
    version,
    about = "Place coordinate labels on polygon vertices"
)]
pub struct Args {
    /// Scene file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. SVG and JSON go to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON5 file (theme, themeVariables, solver, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width in pixels, also used to pick a zoom when the scene has none
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f64,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f64,

    /// Draw the repulsion field rings
    #[arg(long = "debug-fields")]
    pub debug_fields: bool,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;

    let input = read_input(args.input.as_deref())?;
    let scene = parse_scene(&input, config.render.width)?;

    let mut engine = LabelEngine::new(scene.view, MarkerStore::new(), config.solver.clone());
    if args.debug_fields {
        engine.toggle_debug_fields(true);
    }
    engine.update_all_labels(scene.polygons);
    let summary = engine.run_to_completion();
    log::info!(
        "{} labels placed in {} iterations ({})",
        engine.labels().len(),
        summary.iterations,
        if summary.converged {
            "converged"
        } else {
            "budget exhausted"
        }
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(engine.polygons(), engine.sink(), engine.view(), &config.theme);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(engine.polygons(), engine.sink(), engine.view(), &config.theme);
            write_output_png(&svg, &output, &config.render)?;
        }
        OutputFormat::Json => {
            write_layout_dump(
                args.output.as_deref(),
                engine.sink(),
                engine.view(),
                Some(&summary),
            )?;
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level_for(verbose));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let args = Args::try_parse_from([
            "vlabel", "-i", "scene.json5", "-e", "json", "-w", "640", "-vv", "--debug-fields",
        ])
        .expect("args should parse");
        assert_eq!(args.input.as_deref(), Some(Path::new("scene.json5")));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.width, 640.0);
        assert_eq!(args.height, 800.0);
        assert_eq!(args.verbose, 2);
        assert!(args.debug_fields);
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(5), LevelFilter::Trace);
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        let path = PathBuf::from("out.png");
        assert_eq!(ensure_output(&Some(path.clone()), "png").expect("path"), path);
    }
}
