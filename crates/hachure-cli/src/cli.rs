use std::path::PathBuf;

use clap::Parser;
use hachure::HachureConfig;

#[derive(Parser, Debug)]
#[command(
    name = "hachure",
    version,
    about = "Generate a vector hachure map from a digital elevation model"
)]
pub struct Args {
    /// Input DEM as an ESRI ASCII grid (.asc)
    pub dem: PathBuf,

    /// Output SVG file
    #[arg(short, long, default_value = "hachures.svg")]
    pub output: PathBuf,

    /// JSON configuration file; explicit flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Hachure spacing on the steepest ground, in map units
    #[arg(long)]
    pub min_spacing: Option<f64>,

    /// Hachure spacing on the gentlest hachured ground, in map units
    #[arg(long)]
    pub max_spacing: Option<f64>,

    /// No hachures below this slope, in degrees
    #[arg(long)]
    pub slope_min: Option<f64>,

    /// Slopes above this are treated as this steep, in degrees
    #[arg(long)]
    pub slope_max: Option<f64>,

    /// Elevation step between spacing checks (derived from the DEM range
    /// when omitted)
    #[arg(long)]
    pub contour_interval: Option<f64>,

    /// Grower integration step, in map units (3 × average pixel when
    /// omitted)
    #[arg(long)]
    pub step_distance: Option<f64>,

    /// Also emit the slope-tagged thickness layer for variable-width
    /// rendering
    #[arg(long)]
    pub thickness: bool,

    /// Base stroke width in the output SVG
    #[arg(long, default_value_t = 0.5)]
    pub stroke_width: f64,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Assemble the engine configuration: file config (if any) under the
    /// explicit flags.
    pub fn to_config(&self) -> anyhow::Result<HachureConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => HachureConfig::default(),
        };

        if let Some(v) = self.min_spacing {
            config.min_spacing = v;
        }
        if let Some(v) = self.max_spacing {
            config.max_spacing = v;
        }
        if let Some(v) = self.slope_min {
            config.slope_min = v;
        }
        if let Some(v) = self.slope_max {
            config.slope_max = v;
        }
        if let Some(v) = self.contour_interval {
            config.contour_interval = Some(v);
        }
        if let Some(v) = self.step_distance {
            config.step_distance = Some(v);
        }
        if self.thickness {
            config.generate_thickness_layer = true;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "hachure",
            "dem.asc",
            "--min-spacing",
            "3",
            "--slope-max",
            "50",
            "--thickness",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.min_spacing, 3.0);
        assert_eq!(config.max_spacing, 10.0);
        assert_eq!(config.slope_max, 50.0);
        assert!(config.generate_thickness_layer);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["hachure", "dem.asc"]);
        let config = args.to_config().unwrap();
        assert_eq!(config.min_spacing, 2.0);
        assert!(!config.generate_thickness_layer);
        assert_eq!(args.output, PathBuf::from("hachures.svg"));
    }
}
