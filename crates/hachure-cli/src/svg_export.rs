use std::path::Path;

use hachure::{EngineOutput, GridExtent, Polyline};
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Group, Path as SvgPath};

/// Scale factor between the flattest and steepest thickness pieces.
const WIDTH_RANGE: f64 = 3.0;

/// Write the run output as an SVG in map units, north up.
///
/// The plain hachure layer is always present; when the engine produced a
/// thickness layer it is written instead as one path per piece with a
/// slope-scaled stroke width.
pub fn write_svg(
    path: &Path,
    output: &EngineOutput,
    extent: &GridExtent,
    stroke_width: f64,
) -> anyhow::Result<()> {
    let width = extent.x_max() - extent.x_min;
    let height = extent.y_max - extent.y_min();

    let mut document = Document::new()
        .set("viewBox", (0.0, 0.0, width, height))
        .set("width", width)
        .set("height", height);

    if let Some(pieces) = &output.thickness {
        let mut group = Group::new()
            .set("id", "hachures-thickness")
            .set("stroke", "black")
            .set("fill", "none")
            .set("stroke-linecap", "round");
        for piece in pieces {
            let scaled = stroke_width * (1.0 + (WIDTH_RANGE - 1.0) * (piece.slope / 90.0));
            group = group.add(
                polyline_path(&piece.geometry, extent).set("stroke-width", scaled),
            );
        }
        document = document.add(group);
    } else {
        let mut group = Group::new()
            .set("id", "hachures")
            .set("stroke", "black")
            .set("fill", "none")
            .set("stroke-width", stroke_width)
            .set("stroke-linecap", "round");
        for feature in &output.hachures {
            group = group.add(polyline_path(&feature.geometry, extent));
        }
        document = document.add(group);
    }

    svg::save(path, &document)?;
    Ok(())
}

/// One polyline as an SVG path element, flipped into the y-down SVG frame.
fn polyline_path(line: &Polyline, extent: &GridExtent) -> SvgPath {
    let mut data = Data::new();
    for (i, p) in line.points().iter().enumerate() {
        let x = p.x() - extent.x_min;
        let y = extent.y_max - p.y();
        if i == 0 {
            data = data.move_to((x, y));
        } else {
            data = data.line_to((x, y));
        }
    }
    SvgPath::new().set("d", data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hachure::HachureFeature;

    fn extent() -> GridExtent {
        GridExtent {
            x_min: 100.0,
            y_max: 250.0,
            cell_width: 1.0,
            cell_height: 1.0,
            rows: 50,
            cols: 50,
        }
    }

    #[test]
    fn test_write_svg_smoke() {
        let output = EngineOutput {
            hachures: vec![HachureFeature {
                geometry: Polyline::from_iter([(110.0, 210.0), (110.0, 230.0)]),
                length: 20.0,
            }],
            thickness: None,
            warnings: vec![],
        };

        let dir = std::env::temp_dir();
        let path = dir.join("hachure_svg_smoke.svg");
        write_svg(&path, &output, &extent(), 0.5).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("hachures"));
        assert!(text.contains("<path"));
        let _ = std::fs::remove_file(&path);
    }
}
