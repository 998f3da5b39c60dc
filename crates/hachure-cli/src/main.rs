mod asc;
mod cli;
mod svg_export;

use clap::Parser;
use hachure::{SpacingEngine, prep, prepare_contours};

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let config = args.to_config()?;
    let dem = asc::read_asc(&args.dem)?;
    let range = dem.max_value() - dem.min_value();
    log::info!(
        "DEM {}×{} cells, elevation range {range:.2}",
        dem.extent().cols,
        dem.extent().rows
    );

    let slope = prep::slope_raster(&dem);
    let aspect = prep::aspect_raster(&dem);

    match config.validate(Some(&slope), Some(range)) {
        Ok(warnings) => {
            for warning in warnings {
                eprintln!("warning {}: {warning}", warning.code());
            }
        }
        Err(error) => {
            eprintln!("error {}: {error}", error.code());
            std::process::exit(i32::from(error.code()));
        }
    }

    let interval = config.contour_interval_for(range);
    let bands = prep::filled_bands(&dem, interval);
    let contours = prepare_contours(dem.extent(), &bands, None);

    let output = SpacingEngine::new(&config, &slope, &aspect).run(&contours);
    for warning in &output.warnings {
        eprintln!("warning {}: {warning}", warning.code());
    }

    svg_export::write_svg(&args.output, &output, dem.extent(), args.stroke_width)?;
    println!(
        "{} hachures written to {}",
        output.hachures.len(),
        args.output.display()
    );
    Ok(())
}
