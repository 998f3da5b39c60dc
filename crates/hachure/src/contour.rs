use std::panic::{AssertUnwindSafe, catch_unwind};

use geo::algorithm::bool_ops::{BooleanOps, OpType};

use crate::{GridExtent, Point, Polyline};

/// One filled contour band: the terrain with elevation in
/// `[elev_min, elev_min + interval)`, as produced by
/// [`crate::prep::filled_bands`] or any external contouring collaborator.
#[derive(Debug, Clone)]
pub struct ContourBand {
    pub elev_min: f64,
    pub regions: geo::MultiPolygon<f64>,
}

/// Line contours supplied alongside the filled bands, used instead of the
/// polygon-derived rings when their elevation matches a level.
#[derive(Debug, Clone)]
pub struct LevelLines {
    pub elev: f64,
    pub lines: Vec<Polyline>,
}

/// One prepared contour level: the iso-lines at `level` plus the mask of
/// all terrain strictly above it. Prepared contours are immutable; the
/// spacing engine only reads them.
#[derive(Debug, Clone)]
pub struct Contour {
    pub level: f64,
    /// Closed rings (or supplied line contours) tracing this level.
    pub rings: Vec<Polyline>,
    /// Everything above this level; hachures terminated at this contour are
    /// cut against it.
    pub above: geo::MultiPolygon<f64>,
}

/// Turn filled bands into the ordered contour list the engine sweeps.
///
/// Starting from the (densified) extent rectangle, each band is subtracted
/// in elevation order; what remains after band `i` is the mask above level
/// `i + 1`, whose boundary rings are that level's contour. The final,
/// empty level is dropped, as are levels whose mask vanished early.
#[must_use]
pub fn prepare_contours(
    extent: &GridExtent,
    bands: &[ContourBand],
    line_contours: Option<&[LevelLines]>,
) -> Vec<Contour> {
    let mut order: Vec<&ContourBand> = bands.iter().collect();
    order.sort_by(|a, b| a.elev_min.total_cmp(&b.elev_min));

    let mut running = geo::MultiPolygon::new(vec![extent_polygon(extent)]);
    let mut contours = Vec::new();

    for pair in order.windows(2) {
        let (band, next) = (pair[0], pair[1]);

        match checked_boolean(&running, &band.regions, OpType::Difference) {
            Some(remaining) => running = remaining,
            None => {
                log::debug!(
                    "skipping degenerate difference at band {}",
                    band.elev_min
                );
                continue;
            }
        }
        if running.0.is_empty() {
            break;
        }

        let level = next.elev_min;
        let rings = line_contours
            .and_then(|lines| {
                lines
                    .iter()
                    .find(|l| (l.elev - level).abs() < 1e-9)
                    .map(|l| l.lines.clone())
            })
            .unwrap_or_else(|| polygon_rings(&running));

        contours.push(Contour {
            level,
            rings,
            above: running.clone(),
        });
    }

    log::debug!("prepared {} contour levels", contours.len());
    contours
}

/// Boolean operation that treats a panicking kernel as a degenerate input:
/// the piece is skipped and the caller keeps going.
#[must_use]
pub fn checked_boolean(
    a: &geo::MultiPolygon<f64>,
    b: &geo::MultiPolygon<f64>,
    op: OpType,
) -> Option<geo::MultiPolygon<f64>> {
    catch_unwind(AssertUnwindSafe(|| a.boolean_op(b, op))).ok()
}

/// Clip a set of lines against a mask, keeping the parts outside it.
/// Panicking kernels yield `None` (caller skips the clip).
#[must_use]
pub fn checked_clip_outside(
    mask: &geo::MultiPolygon<f64>,
    lines: &geo::MultiLineString<f64>,
) -> Option<geo::MultiLineString<f64>> {
    catch_unwind(AssertUnwindSafe(|| mask.clip(lines, true))).ok()
}

/// All rings of a mask (exteriors and holes) as polylines.
#[must_use]
pub fn polygon_rings(mask: &geo::MultiPolygon<f64>) -> Vec<Polyline> {
    let mut rings = Vec::new();
    for polygon in &mask.0 {
        rings.push(Polyline::from(polygon.exterior()));
        for interior in polygon.interiors() {
            rings.push(Polyline::from(interior));
        }
    }
    rings.retain(|r| r.points().len() >= 4);
    rings
}

/// The extent rectangle as a polygon with densified edges, so that
/// raster sampling along the boundary ring sees the terrain it crosses and
/// boolean ops against nearly-parallel band edges stay well-conditioned.
#[must_use]
pub fn extent_polygon(extent: &GridExtent) -> geo::Polygon<f64> {
    let rect = extent.to_rect();
    let corners = [
        Point::new(rect.x0, rect.y1),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x0, rect.y1),
    ];
    let ring = Polyline::new(corners.to_vec()).densify(2.0 * extent.avg_pixel());
    geo::Polygon::new((&ring).into(), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Area;

    fn extent() -> GridExtent {
        GridExtent {
            x_min: 0.0,
            y_max: 100.0,
            cell_width: 1.0,
            cell_height: 1.0,
            rows: 100,
            cols: 100,
        }
    }

    fn strip(y0: f64, y1: f64) -> geo::MultiPolygon<f64> {
        geo::MultiPolygon::new(vec![geo::Rect::new(
            geo::coord! { x: -1.0, y: y0 },
            geo::coord! { x: 101.0, y: y1 },
        )
        .to_polygon()])
    }

    /// Three bands of a south-facing slope stacked northward.
    fn bands() -> Vec<ContourBand> {
        vec![
            ContourBand {
                elev_min: 0.0,
                regions: strip(0.0, 30.0),
            },
            ContourBand {
                elev_min: 10.0,
                regions: strip(30.0, 60.0),
            },
            ContourBand {
                elev_min: 20.0,
                regions: strip(60.0, 100.0),
            },
        ]
    }

    #[test]
    fn test_prepare_drops_top_level() {
        let contours = prepare_contours(&extent(), &bands(), None);
        assert_eq!(contours.len(), 2);
        assert_relative_eq!(contours[0].level, 10.0);
        assert_relative_eq!(contours[1].level, 20.0);
    }

    #[test]
    fn test_prepare_masks_shrink() {
        let contours = prepare_contours(&extent(), &bands(), None);
        let areas: Vec<f64> = contours
            .iter()
            .map(|c| c.above.unsigned_area())
            .collect();
        assert!(areas[0] > areas[1]);
        assert_relative_eq!(areas[0], 7000.0, epsilon = 50.0);
        assert_relative_eq!(areas[1], 4000.0, epsilon = 50.0);
    }

    #[test]
    fn test_prepare_handles_unsorted_bands() {
        let mut shuffled = bands();
        shuffled.reverse();
        let contours = prepare_contours(&extent(), &shuffled, None);
        assert_eq!(contours.len(), 2);
        assert!(contours[0].level < contours[1].level);
    }

    #[test]
    fn test_prepare_rings_are_closed() {
        let contours = prepare_contours(&extent(), &bands(), None);
        for contour in &contours {
            assert!(!contour.rings.is_empty());
            for ring in &contour.rings {
                assert!(ring.is_closed());
            }
        }
    }

    #[test]
    fn test_prepare_prefers_line_contours() {
        let lines = vec![LevelLines {
            elev: 10.0,
            lines: vec![Polyline::from_iter([(0.0, 30.0), (100.0, 30.0)])],
        }];
        let contours = prepare_contours(&extent(), &bands(), Some(&lines));
        assert_eq!(contours[0].rings.len(), 1);
        assert_eq!(contours[0].rings[0].points().len(), 2);
        // level without a matching line keeps its polygon rings
        assert!(contours[1].rings[0].points().len() >= 4);
    }

    #[test]
    fn test_extent_polygon_is_densified() {
        let polygon = extent_polygon(&extent());
        assert!(polygon.exterior().0.len() > 100);
        assert_relative_eq!(polygon.unsigned_area(), 10_000.0, epsilon = 1e-6);
    }
}
