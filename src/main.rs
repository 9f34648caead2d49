use topoma::export::{ExportPipeline, DEFAULT_LOCATION};
use topoma::geometry::{metrics_of, summarize, Extent};
use topoma::import::load_file;
use topoma::lookup::{location_slug, HttpLocationService};
use topoma::parser::{Args, Command};
use topoma::projection::{self, forward};
use topoma::raster::{HeadlessSurface, ViewState};
use topoma::scale::{resolution_for_scale, scale_for_resolution, Scale};
use topoma::workspace::{ExportTarget, Workspace};
use topoma::{Error, Result};

use geo::Coord;

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse_cli();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let export_params = args.command.export_parameters();

    match args.command {
        Command::Reproject { from, to, x, y } => {
            let from = projection::lookup(&from)?;
            let to = projection::lookup(&to)?;
            let out = forward(Coord { x, y }, &from, &to)?;
            println!("{:.9} {:.9}", out.x, out.y);
        }
        Command::Scale {
            latitude,
            scale,
            resolution,
        } => match (scale, resolution) {
            (Some(scale), _) => {
                let res = resolution_for_scale(scale, latitude)?;
                println!("1:{scale} at {latitude}° is {res:.9} units/px");
            }
            (None, Some(res)) => {
                let scale = scale_for_resolution(res, latitude)?;
                println!("{res} units/px at {latitude}° is 1:{scale:.1}");
            }
            (None, None) => return Err(Error::InvalidScale(f64::NAN)),
        },
        Command::Inspect { in_file, import } => {
            let imported = load_file(&in_file, &import.parameters())?;
            let (format, skipped) = (imported.format, imported.skipped);
            let mut workspace = Workspace::new();
            let id = workspace.add_layer(imported.name, imported.source_crs, imported.features);
            let layer = workspace.layer(id)?;

            println!(
                "{} ({format}, source {}), {} features, {skipped} skipped",
                layer.name,
                layer.source_crs.code,
                layer.features.len(),
            );
            for feature in &layer.features {
                let metrics = metrics_of(feature)?;
                println!(
                    "  {} {} {}{}{}",
                    feature.id.map(|id| id.to_string()).unwrap_or_default(),
                    feature.geometry.kind_name(),
                    feature.label.as_deref().unwrap_or("-"),
                    metrics
                        .area_sq_meters
                        .map(|a| format!(", {a:.1} m²"))
                        .unwrap_or_default(),
                    metrics
                        .perimeter_meters
                        .map(|p| format!(", {p:.1} m"))
                        .unwrap_or_default(),
                );
            }

            if let Some(summary) = summarize(&layer.features, None)? {
                let Extent {
                    min_x,
                    min_y,
                    max_x,
                    max_y,
                } = summary.extent;
                println!("extent: {min_x:.3} {min_y:.3} {max_x:.3} {max_y:.3}");
                println!(
                    "center: {:.6} {:.6}",
                    summary.center_lon_lat.x, summary.center_lon_lat.y
                );
            }
        }
        Command::Export {
            in_file,
            import,
            scale,
            label,
            output_directory,
            offline,
            ..
        } => {
            let params = export_params.unwrap_or_default();
            let scale = match label {
                Some(label) => Scale::with_label(scale, label)?,
                None => Scale::new(scale)?,
            };

            let layer = load_file(&in_file, &import.parameters())?;
            let mut workspace = Workspace::new();
            let id = workspace.add_layer(layer.name, layer.source_crs, layer.features);

            let features = workspace.target_features(&ExportTarget::Layer(id))?;
            let summary = summarize(features.iter().copied(), None)?.ok_or(Error::EmptySelection)?;

            let location = if params.location_slug.is_some() || offline {
                DEFAULT_LOCATION.to_string()
            } else {
                location_slug(&HttpLocationService::default(), summary.center_lon_lat)
            };

            // interactive sized view, the export resizes it and restores it afterwards
            let mut surface = HeadlessSurface::new(ViewState {
                size: (800, 600),
                resolution: resolution_for_scale(scale.denominator(), summary.center_lon_lat.y)?,
                center: summary.center,
            })
            .with_overlay(features.iter().map(|f| f.geometry.clone()));

            let mut pipeline = ExportPipeline::new(params);
            pipeline.select(ExportTarget::Layer(id), scale)?;
            let date = chrono::Local::now().date_naive();
            let artifact = pipeline.run(&workspace, &mut surface, &location, date, |_| {})?;

            let path = artifact.write_to(&output_directory)?;
            let (width, height) = artifact.dimensions();
            log::info!(
                "Wrote {} ({width}x{height} px, {} bytes)",
                path.display(),
                artifact.size_bytes()
            );
        }
    }
    Ok(())
}
