use crate::RasterGrid;

/// Target number of contour bands when the interval is derived from the
/// elevation range.
pub const TARGET_SPACING_CHECKS: usize = 100;

/// Grower step distance as a multiple of the average pixel size, when not
/// configured explicitly.
pub const DEFAULT_STEP_PIXELS: f64 = 3.0;

/// Engine configuration. All distances are in map units, slopes in degrees.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HachureConfig {
    /// Hachure spacing on the steepest ground.
    pub min_spacing: f64,

    /// Hachure spacing on the gentlest ground still hachured.
    pub max_spacing: f64,

    /// Below this slope no hachures are drawn.
    pub slope_min: f64,

    /// Slopes above this are treated as this steep.
    pub slope_max: f64,

    /// Elevation step between spacing checks; derived from the DEM range
    /// when absent.
    pub contour_interval: Option<f64>,

    /// Grower integration step; defaults to [`DEFAULT_STEP_PIXELS`] times
    /// the average pixel size.
    pub step_distance: Option<f64>,

    /// Also produce the short slope-tagged pieces used for variable-width
    /// rendering.
    pub generate_thickness_layer: bool,
}

impl Default for HachureConfig {
    fn default() -> Self {
        Self {
            min_spacing: 2.0,
            max_spacing: 10.0,
            slope_min: 10.0,
            slope_max: 45.0,
            contour_interval: None,
            step_distance: None,
            generate_thickness_layer: false,
        }
    }
}

impl HachureConfig {
    /// The ideal distance between neighboring hachures where the local
    /// slope is `slope` degrees, or `None` below [`Self::slope_min`].
    ///
    /// Steeper ground gets tighter spacing; the slope is clamped to
    /// [`Self::slope_max`].
    #[must_use]
    pub fn ideal_spacing(&self, slope: f64) -> Option<f64> {
        if slope < self.slope_min {
            return None;
        }
        let slope = slope.min(self.slope_max);
        let pct = (slope - self.slope_min) / (self.slope_max - self.slope_min);
        Some(self.max_spacing - pct * (self.max_spacing - self.min_spacing))
    }

    /// Grower step `J` for a raster with the given average pixel size.
    #[must_use]
    pub fn step(&self, avg_pixel: f64) -> f64 {
        self.step_distance
            .unwrap_or(DEFAULT_STEP_PIXELS * avg_pixel)
    }

    /// Contour interval to use for an elevation span of `range`.
    #[must_use]
    pub fn contour_interval_for(&self, range: f64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        self.contour_interval
            .unwrap_or(range / TARGET_SPACING_CHECKS as f64)
    }

    /// Check the configuration against the slope raster. Returns the
    /// non-fatal warnings, or the first fatal error.
    pub fn validate(
        &self,
        slope: Option<&RasterGrid>,
        elev_range: Option<f64>,
    ) -> Result<Vec<ConfigWarning>, ConfigError> {
        let Some(slope) = slope else {
            return Err(ConfigError::MissingRaster);
        };
        if self.slope_min < 0.0 {
            return Err(ConfigError::NegativeSlopeMin(self.slope_min));
        }
        if self.slope_min >= self.slope_max {
            return Err(ConfigError::SlopeRangeEmpty(self.slope_min, self.slope_max));
        }
        let steepest = slope.max_value();
        if self.slope_max > steepest {
            return Err(ConfigError::SlopeMaxAboveRaster(self.slope_max, steepest));
        }
        if self.min_spacing > self.max_spacing {
            return Err(ConfigError::SpacingRangeEmpty(
                self.min_spacing,
                self.max_spacing,
            ));
        }
        if self.min_spacing <= 0.0 {
            return Err(ConfigError::NonPositiveMinSpacing(self.min_spacing));
        }
        if self.max_spacing <= 0.0 {
            return Err(ConfigError::NonPositiveMaxSpacing(self.max_spacing));
        }

        let mut warnings = Vec::new();
        if self.slope_min == 0.0 {
            warnings.push(ConfigWarning::ZeroSlopeMin);
        }
        if let Some(range) = elev_range {
            let interval = self.contour_interval_for(range);
            if interval > 0.0 && range > 0.0 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let bands = (range / interval).ceil() as usize;
                if bands < 10 {
                    warnings.push(ConfigWarning::CoarseSpacingChecks { bands });
                } else if bands > 1000 {
                    warnings.push(ConfigWarning::ExcessiveSpacingChecks { bands });
                }
            }
        }
        for w in &warnings {
            log::warn!("configuration warning {}: {w}", w.code());
        }
        Ok(warnings)
    }
}

/// Fatal configuration problems, rejected before any work. `code()` gives
/// the numeric code surfaced to hosts.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("no raster input")]
    MissingRaster,

    #[error("slope_min must not be negative (got {0})")]
    NegativeSlopeMin(f64),

    #[error("slope_min ({0}) must be below slope_max ({1})")]
    SlopeRangeEmpty(f64, f64),

    #[error("slope_max ({0}) exceeds the steepest slope in the raster ({1})")]
    SlopeMaxAboveRaster(f64, f64),

    #[error("min_spacing ({0}) must not exceed max_spacing ({1})")]
    SpacingRangeEmpty(f64, f64),

    #[error("min_spacing must be positive (got {0})")]
    NonPositiveMinSpacing(f64),

    #[error("max_spacing must be positive (got {0})")]
    NonPositiveMaxSpacing(f64),
}

impl ConfigError {
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::MissingRaster => 1,
            Self::NegativeSlopeMin(_) => 2,
            Self::SlopeRangeEmpty(..) => 3,
            Self::SlopeMaxAboveRaster(..) => 4,
            Self::SpacingRangeEmpty(..) => 5,
            Self::NonPositiveMinSpacing(_) => 6,
            Self::NonPositiveMaxSpacing(_) => 7,
        }
    }
}

/// Non-fatal configuration findings; logged and carried in the run report.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    #[error("slope_min of 0 hachures every non-flat cell")]
    ZeroSlopeMin,

    #[error("only {bands} contour bands; spacing checks will be coarse")]
    CoarseSpacingChecks { bands: usize },

    #[error("{bands} contour bands; spacing checks will dominate run time")]
    ExcessiveSpacingChecks { bands: usize },
}

impl ConfigWarning {
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::ZeroSlopeMin => 8,
            Self::CoarseSpacingChecks { .. } => 9,
            Self::ExcessiveSpacingChecks { .. } => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridExtent;
    use approx::assert_relative_eq;

    fn test_config() -> HachureConfig {
        HachureConfig {
            min_spacing: 2.0,
            max_spacing: 10.0,
            slope_min: 10.0,
            slope_max: 45.0,
            ..Default::default()
        }
    }

    fn slope_grid(max: f64) -> RasterGrid {
        let extent = GridExtent {
            x_min: 0.0,
            y_max: 4.0,
            cell_width: 1.0,
            cell_height: 1.0,
            rows: 4,
            cols: 4,
        };
        RasterGrid::constant(extent, max)
    }

    #[test]
    fn test_ideal_spacing_endpoints() {
        let cfg = test_config();
        assert_eq!(cfg.ideal_spacing(5.0), None);
        assert_relative_eq!(cfg.ideal_spacing(10.0).unwrap(), 10.0);
        assert_relative_eq!(cfg.ideal_spacing(45.0).unwrap(), 2.0);
        // clamped above slope_max
        assert_relative_eq!(cfg.ideal_spacing(80.0).unwrap(), 2.0);
    }

    #[test]
    fn test_ideal_spacing_is_linear() {
        let cfg = test_config();
        assert_relative_eq!(cfg.ideal_spacing(27.5).unwrap(), 6.0);
    }

    #[test]
    fn test_validate_ok() {
        let cfg = test_config();
        let warnings = cfg.validate(Some(&slope_grid(50.0)), Some(100.0)).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_validate_codes() {
        let cfg = test_config();
        assert_eq!(cfg.validate(None, None).unwrap_err().code(), 1);

        let mut bad = test_config();
        bad.slope_min = -1.0;
        assert_eq!(
            bad.validate(Some(&slope_grid(50.0)), None).unwrap_err().code(),
            2
        );

        let mut bad = test_config();
        bad.slope_min = 45.0;
        assert_eq!(
            bad.validate(Some(&slope_grid(50.0)), None).unwrap_err().code(),
            3
        );

        // raster tops out below slope_max
        assert_eq!(
            test_config()
                .validate(Some(&slope_grid(30.0)), None)
                .unwrap_err()
                .code(),
            4
        );

        let mut bad = test_config();
        bad.min_spacing = 20.0;
        assert_eq!(
            bad.validate(Some(&slope_grid(50.0)), None).unwrap_err().code(),
            5
        );

        let mut bad = test_config();
        bad.min_spacing = 0.0;
        assert_eq!(
            bad.validate(Some(&slope_grid(50.0)), None).unwrap_err().code(),
            6
        );
    }

    #[test]
    fn test_validate_warnings() {
        let mut cfg = test_config();
        cfg.slope_min = 0.0;
        cfg.contour_interval = Some(50.0);
        let warnings = cfg.validate(Some(&slope_grid(50.0)), Some(100.0)).unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].code(), 8);
        assert_eq!(warnings[1].code(), 9);
    }

    #[test]
    fn test_derived_interval() {
        let cfg = test_config();
        assert_relative_eq!(cfg.contour_interval_for(200.0), 2.0);
        let mut explicit = test_config();
        explicit.contour_interval = Some(5.0);
        assert_relative_eq!(explicit.contour_interval_for(200.0), 5.0);
    }
}
