use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use indexmap::IndexMap;
use rayon::prelude::*;

use crate::{
    Contour, DashPlanner, HachureConfig, HachureGrower, HachureIndex, Point, Polyline,
    RasterGrid, SAME_POINT_EPSILON, Segment, SegmentRef, SegmentStatus, checked_clip_outside,
    thickness_pieces,
};

/// Contour pieces longer than this multiple of `max_spacing` are re-split
/// so their slope statistics stay local.
pub const SUBDIVIDE_SPAN: f64 = 3.0;

/// Finished strokes shorter than this multiple of the grower step are
/// discarded, as are clipped remnants.
pub const MIN_FEATURE_STEPS: f64 = 1.5;

pub type HachureId = u64;

/// A live hachure: one stroke grown from a seed, possibly split into
/// several parts by a termination clip.
#[derive(Debug, Clone)]
pub struct Hachure {
    pub id: HachureId,
    pub seed: Point,
    pub parts: Vec<Polyline>,
}

impl Hachure {
    /// Total arc length over all parts.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.parts.iter().map(Polyline::length).sum()
    }

    #[must_use]
    pub fn to_multi_line_string(&self) -> geo::MultiLineString<f64> {
        geo::MultiLineString::new(self.parts.iter().map(Into::into).collect())
    }
}

/// The live hachure set `H`. Insertion order is the deterministic identity
/// order (ids are handed out sequentially), which keeps reruns
/// reproducible; a clipped stroke reinserted under its old id moves to the
/// back without disturbing anyone else's identity.
#[derive(Debug, Default)]
pub struct HachureSet {
    map: IndexMap<HachureId, Hachure>,
    next_id: HachureId,
}

impl HachureSet {
    pub fn insert(&mut self, line: Polyline, seed: Point) -> HachureId {
        let id = self.next_id;
        self.next_id += 1;
        self.map.insert(
            id,
            Hachure {
                id,
                seed,
                parts: vec![line],
            },
        );
        id
    }

    pub fn remove(&mut self, id: HachureId) -> Option<Hachure> {
        self.map.shift_remove(&id)
    }

    pub fn reinsert(&mut self, hachure: Hachure) {
        self.map.insert(hachure.id, hachure);
    }

    #[must_use]
    pub fn get(&self, id: HachureId) -> Option<&Hachure> {
        self.map.get(&id)
    }

    /// Total length of a live hachure; 0 when absent.
    #[must_use]
    pub fn length_of(&self, id: HachureId) -> f64 {
        self.map.get(&id).map_or(0.0, Hachure::length)
    }

    /// Endpoints of one hachure segment addressed by a [`SegmentRef`].
    #[must_use]
    pub fn segment_points(&self, r: SegmentRef) -> Option<(Point, Point)> {
        let part = self.map.get(&r.hachure)?.parts.get(r.part)?;
        let points = part.points();
        Some((*points.get(r.segment)?, *points.get(r.segment + 1)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hachure> {
        self.map.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_hachures(self) -> impl Iterator<Item = Hachure> {
        self.map.into_values()
    }
}

/// A finished stroke, carrying its arc length as the feature attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct HachureFeature {
    pub geometry: Polyline,
    pub length: f64,
}

/// A short piece of a finished stroke tagged with its local mean slope,
/// for variable-width symbology.
#[derive(Debug, Clone, PartialEq)]
pub struct ThicknessPiece {
    pub geometry: Polyline,
    pub slope: f64,
}

/// End-of-run warnings, numbered like the configuration codes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RunWarning {
    #[error("no hachures were produced; the terrain may lie entirely below slope_min")]
    NoHachures,
}

impl RunWarning {
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::NoHachures => 11,
        }
    }
}

#[derive(Debug, Default)]
pub struct EngineOutput {
    pub hachures: Vec<HachureFeature>,
    pub thickness: Option<Vec<ThicknessPiece>>,
    pub warnings: Vec<RunWarning>,
}

/// An intersection of a contour ring with a live hachure, pinned to its
/// arc-length position along the ring. Lives only long enough to cut the
/// ring into [`Segment`]s.
#[derive(Debug, Clone, Copy)]
struct CutPoint {
    arc: f64,
    hachure: HachureId,
}

/// A ring piece before slope sampling and classification.
struct ProtoSegment {
    geometry: Polyline,
    endpoint_hachures: [Option<HachureId>; 2],
    ring: usize,
    start_arc: f64,
}

/// A hachure seed waiting to be grown, with the keys that fix the
/// deterministic insertion order.
struct Seed {
    ring: usize,
    arc: f64,
    point: Point,
}

/// The contour-by-contour spacing loop.
///
/// Sweeping the prepared contours from low to high elevation, the engine
/// keeps the live set `H` in balance: rings are cut at existing hachure
/// crossings, crowded strokes are terminated against the level's `above`
/// mask, and gaps wide enough for new strokes get seeded through the
/// grower. The rasters are read-only throughout; `H` is owned here and
/// nowhere else.
pub struct SpacingEngine<'a> {
    config: &'a HachureConfig,
    slope: &'a RasterGrid,
    aspect: &'a RasterGrid,
    step: f64,
    min_keep: f64,
    set: HachureSet,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> SpacingEngine<'a> {
    #[must_use]
    pub fn new(config: &'a HachureConfig, slope: &'a RasterGrid, aspect: &'a RasterGrid) -> Self {
        let step = config.step(slope.extent().avg_pixel());
        Self {
            config,
            slope,
            aspect,
            step,
            min_keep: MIN_FEATURE_STEPS * step,
            set: HachureSet::default(),
            cancel: None,
        }
    }

    /// Install a cancellation flag, checked between contour iterations.
    #[must_use]
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run the loop over the prepared contours and return the finished
    /// stroke set.
    #[must_use]
    pub fn run(mut self, contours: &[Contour]) -> EngineOutput {
        for contour in contours {
            if self
                .cancel
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                log::warn!("cancelled at level {}", contour.level);
                break;
            }

            if self.set.is_empty() {
                self.first_contour(contour);
            } else {
                self.subsequent_contour(contour);
            }
            log::debug!(
                "level {}: {} live hachures",
                contour.level,
                self.set.len()
            );
        }

        self.finalize()
    }

    /// Seed the very first strokes: subdivide the rings uniformly, then
    /// dash every piece steep enough to carry hachures.
    fn first_contour(&mut self, contour: &Contour) {
        let max_len = SUBDIVIDE_SPAN * self.config.max_spacing;

        let mut protos = Vec::new();
        for (ring_idx, ring) in contour.rings.iter().enumerate() {
            let mut start_arc = 0.0;
            for piece in ring.split_even(max_len) {
                let length = piece.length();
                protos.push(ProtoSegment {
                    geometry: piece,
                    endpoint_hachures: [None, None],
                    ring: ring_idx,
                    start_arc,
                });
                start_arc += length;
            }
        }

        let segments = self.classify(protos);
        self.birth(
            segments
                .iter()
                .filter(|s| s.status != SegmentStatus::BelowSlope),
        );
    }

    /// The steady-state iteration: cut, subdivide, classify, terminate,
    /// then seed into the gaps.
    fn subsequent_contour(&mut self, contour: &Contour) {
        let index = HachureIndex::build(&self.set);

        let mut protos = Vec::new();
        for (ring_idx, ring) in contour.rings.iter().enumerate() {
            self.split_ring(ring_idx, ring, &index, &mut protos);
        }

        let segments = self.classify(protos);
        self.terminate_crowded(&segments, &contour.above);
        self.birth(
            segments
                .iter()
                .filter(|s| s.status == SegmentStatus::TooLong),
        );
    }

    /// All crossings of one ring with the live set, sorted along the ring.
    fn cut_points(&self, ring: &Polyline, index: &HachureIndex) -> Vec<CutPoint> {
        let mut cuts = Vec::new();
        let mut arc = 0.0;

        for w in ring.points().windows(2) {
            let (a, b) = (w[0], w[1]);
            let seg_len = a.distance(&b);
            if seg_len < SAME_POINT_EPSILON {
                continue;
            }

            let ring_line = geo::Line::new(geo::Coord::from(a), geo::Coord::from(b));
            for r in index.candidates(a, b) {
                let Some((ha, hb)) = self.set.segment_points(r) else {
                    continue;
                };
                let hachure_line = geo::Line::new(geo::Coord::from(ha), geo::Coord::from(hb));
                if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                    line_intersection(ring_line, hachure_line)
                {
                    // collinear overlaps fall through as degenerate
                    let p = Point::from(intersection);
                    cuts.push(CutPoint {
                        arc: arc + a.distance(&p),
                        hachure: r.hachure,
                    });
                }
            }
            arc += seg_len;
        }

        cuts.sort_by(|x, y| x.arc.total_cmp(&y.arc).then(x.hachure.cmp(&y.hachure)));
        // crossings at shared ring vertices show up once per adjacent edge
        cuts.dedup_by(|a, b| a.hachure == b.hachure && (a.arc - b.arc).abs() < 1e-6);
        cuts
    }

    /// Cut one ring at its hachure crossings and re-split anything long
    /// enough to blur the slope statistics.
    fn split_ring(
        &self,
        ring_idx: usize,
        ring: &Polyline,
        index: &HachureIndex,
        protos: &mut Vec<ProtoSegment>,
    ) {
        let cuts = self.cut_points(ring, index);
        let total = ring.length();

        let mut raw: Vec<(Polyline, [Option<HachureId>; 2], f64)> = Vec::new();
        if cuts.is_empty() {
            raw.push((ring.clone(), [None, None], 0.0));
        } else if ring.is_closed() {
            for (k, cut) in cuts.iter().enumerate() {
                let next = cuts[(k + 1) % cuts.len()];
                let geometry = if k + 1 < cuts.len() {
                    ring.substring(cut.arc, next.arc)
                } else {
                    // wrap across the ring closure
                    let mut wrapped = ring.substring(cut.arc, total);
                    wrapped.join(&ring.substring(0.0, next.arc));
                    wrapped
                };
                if geometry.points().len() < 2 {
                    continue;
                }
                raw.push((geometry, [Some(cut.hachure), Some(next.hachure)], cut.arc));
            }
        } else {
            // open line contour: the end pieces dangle
            let first = cuts[0];
            let last = cuts[cuts.len() - 1];
            raw.push((ring.substring(0.0, first.arc), [None, Some(first.hachure)], 0.0));
            for pair in cuts.windows(2) {
                raw.push((
                    ring.substring(pair[0].arc, pair[1].arc),
                    [Some(pair[0].hachure), Some(pair[1].hachure)],
                    pair[0].arc,
                ));
            }
            raw.push((
                ring.substring(last.arc, total),
                [Some(last.hachure), None],
                last.arc,
            ));
            raw.retain(|(g, _, _)| g.points().len() >= 2);
        }

        let max_len = SUBDIVIDE_SPAN * self.config.max_spacing;
        for (geometry, endpoints, start_arc) in raw {
            if geometry.length() <= max_len {
                protos.push(ProtoSegment {
                    geometry,
                    endpoint_hachures: endpoints,
                    ring: ring_idx,
                    start_arc,
                });
                continue;
            }

            let pieces = geometry.split_even(max_len);
            let n = pieces.len();
            let mut offset = 0.0;
            for (i, piece) in pieces.into_iter().enumerate() {
                let length = piece.length();
                protos.push(ProtoSegment {
                    geometry: piece,
                    // endpoint crossings survive only on the end pieces
                    endpoint_hachures: [
                        if i == 0 { endpoints[0] } else { None },
                        if i + 1 == n { endpoints[1] } else { None },
                    ],
                    ring: ring_idx,
                    start_arc: start_arc + offset,
                });
                offset += length;
            }
        }
    }

    /// Slope-sample and classify ring pieces. The sampling fans out on the
    /// worker pool; everything it touches is read-only.
    fn classify(&self, protos: Vec<ProtoSegment>) -> Vec<Segment> {
        protos
            .into_par_iter()
            .map(|p| {
                Segment::new(
                    p.geometry,
                    p.endpoint_hachures,
                    p.ring,
                    p.start_arc,
                    self.config,
                    self.slope,
                )
            })
            .collect()
    }

    /// Cut back the strokes that crowd this contour. A below-slope piece
    /// ends every stroke touching it; a too-short piece between two
    /// distinct strokes ends the shorter one (ties end the later-seeded).
    fn terminate_crowded(&mut self, segments: &[Segment], above: &geo::MultiPolygon<f64>) {
        let mut clip: BTreeSet<HachureId> = BTreeSet::new();

        for seg in segments {
            match seg.status {
                SegmentStatus::BelowSlope => {
                    clip.extend(seg.endpoint_hachures.into_iter().flatten());
                }
                SegmentStatus::TooShort => {
                    if let [Some(a), Some(b)] = seg.endpoint_hachures {
                        if a != b {
                            let (la, lb) = (self.set.length_of(a), self.set.length_of(b));
                            let victim = if la > lb {
                                b
                            } else if lb > la {
                                a
                            } else {
                                a.max(b)
                            };
                            clip.insert(victim);
                        }
                    }
                }
                SegmentStatus::TooLong | SegmentStatus::Ok => {}
            }
        }

        for id in clip {
            let Some(mut hachure) = self.set.remove(id) else {
                continue;
            };
            let lines = hachure.to_multi_line_string();
            let Some(clipped) = checked_clip_outside(above, &lines) else {
                // degenerate clip: leave the stroke as it was
                self.set.reinsert(hachure);
                continue;
            };

            let parts: Vec<Polyline> = clipped
                .0
                .iter()
                .map(Polyline::from)
                .filter(|p| p.points().len() >= 2)
                .collect();
            let total: f64 = parts.iter().map(Polyline::length).sum();
            if !parts.is_empty() && total >= self.min_keep {
                hachure.parts = parts;
                self.set.reinsert(hachure);
            }
        }
    }

    /// Grow new strokes from the dash midpoints of the given pieces. Growth
    /// fans out on the worker pool; insertion into `H` happens afterwards
    /// in (ring, arc) order so reruns produce identical ids.
    fn birth<'s>(&mut self, candidates: impl Iterator<Item = &'s Segment>) {
        let planner = DashPlanner::new(self.config);

        let mut seeds: Vec<Seed> = Vec::new();
        for seg in candidates {
            for (offset, dash) in planner.plan(seg) {
                seeds.push(Seed {
                    ring: seg.ring,
                    arc: seg.start_arc + offset + dash.length() / 2.0,
                    point: dash.midpoint(),
                });
            }
        }
        seeds.sort_by(|a, b| a.ring.cmp(&b.ring).then(a.arc.total_cmp(&b.arc)));

        let grower = HachureGrower::new(self.slope, self.aspect, self.config.slope_min, self.step);
        let grown: Vec<Option<Polyline>> = seeds
            .par_iter()
            .map(|seed| grower.grow(seed.point))
            .collect();

        for (seed, line) in seeds.iter().zip(grown) {
            if let Some(line) = line {
                self.set.insert(line, seed.point);
            }
        }
    }

    /// Explode multipart strokes, drop duplicates and stubs, and attach
    /// the end-of-run diagnostics.
    fn finalize(self) -> EngineOutput {
        let mut seen: HashSet<Vec<(u64, u64)>> = HashSet::new();
        let mut hachures = Vec::new();

        for hachure in self.set.into_hachures() {
            for part in hachure.parts {
                if part.points().len() < 2 {
                    continue;
                }
                let length = part.length();
                if length < self.min_keep {
                    continue;
                }
                let key: Vec<(u64, u64)> = part
                    .points()
                    .iter()
                    .map(|p| (p.x().to_bits(), p.y().to_bits()))
                    .collect();
                if !seen.insert(key) {
                    continue;
                }
                hachures.push(HachureFeature {
                    geometry: part,
                    length,
                });
            }
        }

        let mut warnings = Vec::new();
        if hachures.is_empty() {
            warnings.push(RunWarning::NoHachures);
            log::warn!("run warning 11: {}", RunWarning::NoHachures);
        }

        let thickness = self
            .config
            .generate_thickness_layer
            .then(|| thickness_pieces(&hachures, self.slope, self.step));

        log::info!("finished with {} hachures", hachures.len());
        EngineOutput {
            hachures,
            thickness,
            warnings,
        }
    }
}
