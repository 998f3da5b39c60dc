use geo::algorithm::bool_ops::OpType;
use geo::{Area, Contains};
use ndarray::Array2;

use crate::{
    ContourBand, Point, RasterGrid, checked_boolean, extent_polygon,
};

/// Filled contour bands at multiples of `interval` spanning the DEM range.
///
/// Band `k` holds the terrain with elevation in `[t_k, t_k + interval)`;
/// the lowest band covers the whole extent below the first threshold, so
/// the union of all bands tiles the extent. Superlevel masks come from
/// marching squares over the DEM padded with a deep border, which closes
/// every ring; consecutive masks are differenced into bands.
#[must_use]
pub fn filled_bands(dem: &RasterGrid, interval: f64) -> Vec<ContourBand> {
    let (min, max) = (dem.min_value(), dem.max_value());
    if !min.is_finite() || !max.is_finite() || interval <= 0.0 {
        return Vec::new();
    }

    let base = (min / interval).floor() * interval;
    let mut thresholds = Vec::new();
    let mut t = base + interval;
    while t < max {
        thresholds.push(t);
        t += interval;
    }

    let extent_mask = geo::MultiPolygon::new(vec![extent_polygon(dem.extent())]);
    let tracer = SuperlevelTracer::new(dem);

    // masks[k] = terrain at or above thresholds[k], clipped to the extent
    let masks: Vec<geo::MultiPolygon<f64>> = thresholds
        .iter()
        .map(|&t| {
            let raw = tracer.mask(t);
            checked_boolean(&raw, &extent_mask, OpType::Intersection).unwrap_or(raw)
        })
        .collect();

    let mut bands = Vec::with_capacity(masks.len() + 1);
    let mut lower = extent_mask;
    for (k, mask) in masks.iter().enumerate() {
        let regions = checked_boolean(&lower, mask, OpType::Difference)
            .unwrap_or_else(|| lower.clone());
        #[allow(clippy::cast_precision_loss)]
        bands.push(ContourBand {
            elev_min: base + k as f64 * interval,
            regions,
        });
        lower = mask.clone();
    }
    #[allow(clippy::cast_precision_loss)]
    bands.push(ContourBand {
        elev_min: base + masks.len() as f64 * interval,
        regions: lower,
    });

    log::debug!("built {} filled bands at interval {interval}", bands.len());
    bands
}

/// Marching squares over the padded DEM. Grid values sit at cell centers;
/// the pad row/column carries a value deep below the range, so every
/// threshold crossing closes into a ring and no trace can leave the grid.
struct SuperlevelTracer {
    values: Array2<f64>,
    width: usize,
    height: usize,
    // world mapping for padded grid coordinates
    x_min: f64,
    y_max: f64,
    cell_width: f64,
    cell_height: f64,
}

impl SuperlevelTracer {
    fn new(dem: &RasterGrid) -> Self {
        let extent = dem.extent();
        let (rows, cols) = (extent.rows, extent.cols);
        let pad = dem.min_value() - 1.0e6;

        let mut values = Array2::from_elem((rows + 2, cols + 2), pad);
        for r in 0..rows {
            for c in 0..cols {
                values[[r + 1, c + 1]] = dem.data()[[r, c]];
            }
        }

        Self {
            values,
            width: cols + 2,
            height: rows + 2,
            x_min: extent.x_min,
            y_max: extent.y_max,
            cell_width: extent.cell_width,
            cell_height: extent.cell_height,
        }
    }

    /// The terrain at or above `threshold`, as polygons with holes.
    fn mask(&self, threshold: f64) -> geo::MultiPolygon<f64> {
        assemble_rings(self.rings(threshold))
    }

    /// All closed threshold rings, in world coordinates.
    fn rings(&self, threshold: f64) -> Vec<Vec<Point>> {
        let mut visited = vec![false; self.width * self.height * 4];
        let mut rings = Vec::new();

        for j in 0..self.height - 1 {
            for i in 0..self.width - 1 {
                let case = self.cell_case(i, j, threshold);
                if case == 0 || case == 15 {
                    continue;
                }
                for &edge in crossing_edges(case) {
                    if visited[(j * self.width + i) * 4 + edge] {
                        continue;
                    }
                    if let Some(ring) = self.trace(threshold, i, j, edge, &mut visited) {
                        rings.push(ring);
                    }
                }
            }
        }
        rings
    }

    fn value(&self, i: usize, j: usize) -> f64 {
        self.values[[j, i]]
    }

    fn cell_case(&self, i: usize, j: usize, threshold: f64) -> u8 {
        let mut case = 0u8;
        if self.value(i, j) >= threshold {
            case |= 1;
        }
        if self.value(i + 1, j) >= threshold {
            case |= 2;
        }
        if self.value(i + 1, j + 1) >= threshold {
            case |= 4;
        }
        if self.value(i, j + 1) >= threshold {
            case |= 8;
        }
        case
    }

    fn trace(
        &self,
        threshold: f64,
        start_i: usize,
        start_j: usize,
        start_edge: usize,
        visited: &mut [bool],
    ) -> Option<Vec<Point>> {
        let mut points: Vec<Point> = Vec::new();
        let (mut i, mut j, mut entry) = (start_i, start_j, start_edge);

        loop {
            let idx = (j * self.width + i) * 4 + entry;
            if visited[idx] {
                break;
            }
            visited[idx] = true;

            if let Some(p) = self.edge_point(i, j, entry, threshold) {
                if points
                    .last()
                    .is_none_or(|last| last.distance(&p) > 1e-12)
                {
                    points.push(p);
                }
            }

            let case = self.cell_case(i, j, threshold);
            let Some(exit) = exit_edge(entry, case) else {
                break;
            };
            visited[(j * self.width + i) * 4 + exit] = true;

            let Some((ni, nj, nentry)) = self.next_cell(i, j, exit) else {
                break;
            };
            if ni == start_i && nj == start_j && nentry == start_edge {
                break;
            }
            (i, j, entry) = (ni, nj, nentry);
        }

        if points.len() < 3 {
            return None;
        }
        if points[0].distance(&points[points.len() - 1]) > 1e-12 {
            points.push(points[0]);
        }
        Some(points)
    }

    /// Interpolated threshold crossing on one cell edge, in world
    /// coordinates.
    fn edge_point(&self, i: usize, j: usize, edge: usize, threshold: f64) -> Option<Point> {
        let ((i0, j0), (i1, j1)) = match edge {
            0 => ((i, j), (i + 1, j)),
            1 => ((i + 1, j), (i + 1, j + 1)),
            2 => ((i + 1, j + 1), (i, j + 1)),
            3 => ((i, j + 1), (i, j)),
            _ => return None,
        };

        let (v0, v1) = (self.value(i0, j0), self.value(i1, j1));
        if (v1 - v0).abs() < 1e-12 {
            return None;
        }
        let t = (threshold - v0) / (v1 - v0);
        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let (gi, gj) = (
            i0 as f64 + t * (i1 as f64 - i0 as f64),
            j0 as f64 + t * (j1 as f64 - j0 as f64),
        );
        Some(Point::new(
            self.x_min + (gi - 0.5) * self.cell_width,
            self.y_max - (gj - 0.5) * self.cell_height,
        ))
    }

    fn next_cell(&self, i: usize, j: usize, exit: usize) -> Option<(usize, usize, usize)> {
        match exit {
            0 => (j > 0).then(|| (i, j - 1, 2)),
            1 => (i + 1 < self.width - 1).then(|| (i + 1, j, 3)),
            2 => (j + 1 < self.height - 1).then(|| (i, j + 1, 0)),
            3 => (i > 0).then(|| (i - 1, j, 1)),
            _ => None,
        }
    }
}

/// Edges crossed by each marching-squares case. Bit 0 is (i, j), bit 1
/// (i+1, j), bit 2 (i+1, j+1), bit 3 (i, j+1); edges are numbered 0..4
/// starting between bits 0 and 1.
fn crossing_edges(case: u8) -> &'static [usize] {
    match case {
        1 | 14 => &[0, 3],
        2 | 13 => &[0, 1],
        3 | 12 => &[1, 3],
        4 | 11 => &[1, 2],
        6 | 9 => &[0, 2],
        7 | 8 => &[2, 3],
        5 | 10 => &[0, 1, 2, 3],
        _ => &[],
    }
}

/// Exit edge for a trace entering a cell through `entry`. Saddle cases
/// (5, 10) take one fixed interpretation.
fn exit_edge(entry: usize, case: u8) -> Option<usize> {
    let pair = |a: usize, b: usize| {
        if entry == a {
            Some(b)
        } else if entry == b {
            Some(a)
        } else {
            None
        }
    };
    match case {
        1 | 14 => pair(0, 3),
        2 | 13 => pair(0, 1),
        3 | 12 => pair(1, 3),
        4 | 11 => pair(1, 2),
        6 | 9 => pair(0, 2),
        7 | 8 => pair(2, 3),
        5 => pair(0, 1).or_else(|| pair(2, 3)),
        10 => pair(0, 3).or_else(|| pair(1, 2)),
        _ => None,
    }
}

/// Group closed rings into polygons with holes by containment depth:
/// even-depth rings are exteriors, odd-depth rings are holes of their
/// parent exterior.
fn assemble_rings(rings: Vec<Vec<Point>>) -> geo::MultiPolygon<f64> {
    let mut order: Vec<(usize, f64)> = rings
        .iter()
        .enumerate()
        .map(|(idx, ring)| {
            let ls = to_line_string(ring);
            let polygon = geo::Polygon::new(ls, vec![]);
            (idx, polygon.unsigned_area())
        })
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    // (ring index, depth, polygon index in output or parent index)
    let mut placed: Vec<(usize, usize, usize)> = Vec::new();
    let mut polygons: Vec<geo::Polygon<f64>> = Vec::new();

    for &(idx, _) in &order {
        let probe: geo::Point<f64> = rings[idx][0].into();

        // smallest already-placed ring containing this one; `placed` is in
        // descending area order, so the last hit wins
        let parent = placed
            .iter()
            .rev()
            .find(|(other_idx, _, _)| {
                let other = geo::Polygon::new(to_line_string(&rings[*other_idx]), vec![]);
                other.contains(&probe)
            })
            .copied();

        match parent {
            None => {
                polygons.push(geo::Polygon::new(to_line_string(&rings[idx]), vec![]));
                placed.push((idx, 0, polygons.len() - 1));
            }
            Some((_, depth, slot)) if depth % 2 == 0 => {
                polygons[slot].interiors_push(to_line_string(&rings[idx]));
                placed.push((idx, depth + 1, slot));
            }
            Some((_, depth, _)) => {
                // inside a hole: a fresh exterior
                polygons.push(geo::Polygon::new(to_line_string(&rings[idx]), vec![]));
                placed.push((idx, depth + 1, polygons.len() - 1));
            }
        }
    }

    geo::MultiPolygon::new(polygons)
}

fn to_line_string(ring: &[Point]) -> geo::LineString<f64> {
    geo::LineString::new(ring.iter().map(|p| (*p).into()).collect())
}
