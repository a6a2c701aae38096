use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use itertools::Itertools as _;
use log::LevelFilter;

use projection_transform::ProjectionKind;
use vmap_core::ir::ObjectsData;
use vmap_core::styles::{load_styles, Styles};
use vmap_exporter::write_map_file;
use vmap_parser::parse_osm;
use vmap_transformer::{
    merge_linear_objects, normalize_polygons, simplification_pass, sort_by_phase,
    transform_coordinates,
};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ProjectionArg {
    Mercator,
    Stereographic,
    Albers,
}

impl From<ProjectionArg> for ProjectionKind {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::Mercator => ProjectionKind::Mercator,
            ProjectionArg::Stereographic => ProjectionKind::Stereographic,
            ProjectionArg::Albers => ProjectionKind::Albers,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Vector Map Compiler",
    about = "Compiles OSM XML into a renderer-ready binary map file",
    version = "0.0.1"
)]
struct Cli {
    /// Input OSM XML file.
    #[arg(value_name = "FILE")]
    input: PathBuf,

    #[arg(short, long, value_name = "FILE", default_value = "styles.json")]
    styles: PathBuf,

    /// Output map file; defaults to the styles' output_file or the input
    /// path with a .pm extension.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ProjectionArg::Albers)]
    projection: ProjectionArg,
}

fn resolve_output_path(args: &Cli, styles: &Styles) -> PathBuf {
    if let Some(output) = &args.output {
        return output.clone();
    }
    if let Some(output) = &styles.output_file {
        return output.clone();
    }
    args.input.with_extension("pm")
}

fn compile_zoom_levels(args: &Cli, styles: &Styles) -> std::io::Result<Vec<ObjectsData>> {
    let projection_kind = ProjectionKind::from(args.projection);

    log::info!("start parsing {:?}...", args.input);
    let start_local = std::time::Instant::now();
    let parse_result = parse_osm(&args.input).map_err(std::io::Error::other)?;
    log::info!("Finish parsing in {:?}", start_local.elapsed());

    let mut zoom_levels = Vec::with_capacity(styles.zoom_levels.len());
    for (zoom_level_index, zoom_level_styles) in styles.zoom_levels.iter().enumerate() {
        log::info!(
            "start compiling zoom level {} (log2 {})...",
            zoom_level_index,
            zoom_level_styles.zoom_level_log2
        );
        let start_local = std::time::Instant::now();

        let mut data = transform_coordinates(
            &parse_result,
            projection_kind,
            zoom_level_styles.zoom_level_log2,
        )
        .map_err(std::io::Error::other)?;
        merge_linear_objects(&mut data);
        simplification_pass(&mut data, zoom_level_styles.simplification_distance_units);
        normalize_polygons(&mut data);
        let data = sort_by_phase(&data, zoom_level_styles);

        log::info!(
            "Finish compiling zoom level {} in {:?}",
            zoom_level_index,
            start_local.elapsed()
        );
        zoom_levels.push(data);
    }

    Ok(zoom_levels)
}

fn main() -> std::io::Result<()> {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .init();

    let args = Cli::parse();

    let start = std::time::Instant::now();

    let styles = load_styles(&args.styles).map_err(std::io::Error::other)?;
    let output_path = resolve_output_path(&args, &styles);

    log::info!("input file: {:?}", args.input);
    log::info!("styles file: {:?}", args.styles);
    log::info!("output file: {:?}", output_path);
    log::info!("projection: {:?}", args.projection);
    log::info!(
        "zoom levels (log2): {}",
        styles
            .zoom_levels
            .iter()
            .map(|zoom_level| zoom_level.zoom_level_log2)
            .join(", ")
    );

    let zoom_levels = compile_zoom_levels(&args, &styles)?;

    log::info!("start writing {:?}...", output_path);
    let start_local = std::time::Instant::now();
    write_map_file(&zoom_levels, &styles, &output_path).map_err(std::io::Error::other)?;
    log::info!("Finish writing in {:?}", start_local.elapsed());

    log::info!("Elapsed: {:?}", start.elapsed());
    log::info!("Finish processing");

    Ok(())
}
