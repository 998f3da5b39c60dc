use crate::{HachureConfig, HachureId, Polyline, RasterGrid};

/// A contour piece shorter than this fraction of the ideal spacing means
/// two hachures have crowded each other.
pub const HYSTERESIS_SHORT: f64 = 0.9;

/// A contour piece longer than this multiple of the ideal spacing has room
/// for a new hachure.
pub const HYSTERESIS_LONG: f64 = 2.2;

/// Classification of a contour piece against the locally ideal hachure
/// spacing. The 0.9/2.2 hysteresis band keeps segments near the ideal
/// spacing from flip-flopping between additions and cuts on consecutive
/// contours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    /// Mean slope below the hachuring threshold.
    BelowSlope,
    /// Shorter than `0.9 ×` ideal spacing.
    TooShort,
    /// Longer than `2.2 ×` ideal spacing.
    TooLong,
    Ok,
}

/// A piece of a contour ring between two consecutive hachure crossings (or
/// ring endpoints), annotated with everything the spacing engine needs.
#[derive(Debug, Clone)]
pub struct Segment {
    pub geometry: Polyline,
    pub length: f64,
    pub slope: f64,
    /// The hachures whose crossings produced the two endpoints; absent for
    /// endpoints born from ring closure or uniform subdivision.
    pub endpoint_hachures: [Option<HachureId>; 2],
    pub status: SegmentStatus,
    /// Ring this piece came from, and its start position along that ring,
    /// used for deterministic seed ordering.
    pub ring: usize,
    pub start_arc: f64,
}

impl Segment {
    #[must_use]
    pub fn new(
        geometry: Polyline,
        endpoint_hachures: [Option<HachureId>; 2],
        ring: usize,
        start_arc: f64,
        config: &HachureConfig,
        slope_raster: &RasterGrid,
    ) -> Self {
        let length = geometry.length();
        let slope = mean_slope(slope_raster, &geometry);
        let status = classify(config, slope, length);
        Self {
            geometry,
            length,
            slope,
            endpoint_hachures,
            status,
            ring,
            start_arc,
        }
    }
}

/// Mean slope along a line: densify at the average pixel size, sample the
/// slope raster at every vertex, average. Lines with no samples report 0
/// (and classify as [`SegmentStatus::BelowSlope`]).
#[must_use]
pub fn mean_slope(slope: &RasterGrid, line: &Polyline) -> f64 {
    let dense = line.densify(slope.extent().avg_pixel());
    let points = dense.points();
    if points.is_empty() {
        return 0.0;
    }
    let sum: f64 = points.iter().map(|p| slope.value_or_zero(*p)).sum();
    #[allow(clippy::cast_precision_loss)]
    {
        sum / points.len() as f64
    }
}

/// Assign a [`SegmentStatus`] from a mean slope and an arc length.
#[must_use]
pub fn classify(config: &HachureConfig, slope: f64, length: f64) -> SegmentStatus {
    let Some(spacing) = config.ideal_spacing(slope) else {
        return SegmentStatus::BelowSlope;
    };
    if length < HYSTERESIS_SHORT * spacing {
        SegmentStatus::TooShort
    } else if length > HYSTERESIS_LONG * spacing {
        SegmentStatus::TooLong
    } else {
        SegmentStatus::Ok
    }
}
