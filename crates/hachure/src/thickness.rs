use rayon::prelude::*;

use crate::{HachureFeature, RasterGrid, ThicknessPiece, mean_slope};

/// Split finished strokes into short pieces tagged with their local mean
/// slope, so a renderer can vary stroke width along each hachure. Pieces
/// are one grower step long, short enough for the tag to stay local.
#[must_use]
pub fn thickness_pieces(
    hachures: &[HachureFeature],
    slope: &RasterGrid,
    piece_len: f64,
) -> Vec<ThicknessPiece> {
    hachures
        .par_iter()
        .flat_map_iter(|feature| {
            feature
                .geometry
                .split_even(piece_len)
                .into_iter()
                .map(|piece| {
                    let slope = mean_slope(slope, &piece);
                    ThicknessPiece {
                        geometry: piece,
                        slope,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridExtent, Polyline};
    use approx::assert_relative_eq;

    #[test]
    fn test_pieces_cover_feature() {
        let extent = GridExtent {
            x_min: 0.0,
            y_max: 50.0,
            cell_width: 1.0,
            cell_height: 1.0,
            rows: 50,
            cols: 50,
        };
        let slope = RasterGrid::constant(extent, 25.0);
        let feature = HachureFeature {
            geometry: Polyline::from_iter([(10.0, 10.0), (10.0, 40.0)]),
            length: 30.0,
        };

        let pieces = thickness_pieces(&[feature], &slope, 3.0);
        assert_eq!(pieces.len(), 10);
        let total: f64 = pieces.iter().map(|p| p.geometry.length()).sum();
        assert_relative_eq!(total, 30.0, epsilon = 1e-9);
        for piece in &pieces {
            assert_relative_eq!(piece.slope, 25.0);
        }
    }

    #[test]
    fn test_short_feature_single_piece() {
        let extent = GridExtent {
            x_min: 0.0,
            y_max: 50.0,
            cell_width: 1.0,
            cell_height: 1.0,
            rows: 50,
            cols: 50,
        };
        let slope = RasterGrid::constant(extent, 25.0);
        let feature = HachureFeature {
            geometry: Polyline::from_iter([(10.0, 10.0), (10.0, 12.0)]),
            length: 2.0,
        };

        let pieces = thickness_pieces(&[feature], &slope, 3.0);
        assert_eq!(pieces.len(), 1);
    }
}
