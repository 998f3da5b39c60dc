use std::path::Path;

use hachure::{GridExtent, RasterGrid};
use hachure::exports::ndarray::Array2;

/// Problems reading an ESRI ASCII grid.
#[derive(thiserror::Error, Debug)]
pub enum AscError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("missing header field `{0}`")]
    MissingHeader(&'static str),

    #[error("malformed header line: {0}")]
    MalformedHeader(String),

    #[error("expected {expected} cell values, found {found}")]
    CellCountMismatch { expected: usize, found: usize },

    #[error("cannot parse cell value `{0}`")]
    BadCell(String),

    #[error("grid contains no valid cells")]
    AllNoData,
}

/// Read an ESRI ASCII grid (`ncols`/`nrows`/`xllcorner`/`yllcorner`/
/// `cellsize` header, then row-major values from the north edge down).
///
/// NODATA cells are replaced by the lowest valid elevation, which leaves
/// them flat and therefore unhachured.
pub fn read_asc(path: &Path) -> Result<RasterGrid, AscError> {
    let text = std::fs::read_to_string(path).map_err(|source| AscError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_asc(&text)
}

/// Parse ASCII-grid text. Separated from [`read_asc`] so the parser stays
/// I/O-free and testable.
pub fn parse_asc(text: &str) -> Result<RasterGrid, AscError> {
    let mut ncols = None;
    let mut nrows = None;
    let mut xllcorner = None;
    let mut yllcorner = None;
    let mut cellsize = None;
    let mut nodata = None;

    let mut lines = text.lines();
    let mut body_start = String::new();

    for line in lines.by_ref() {
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            continue;
        };
        let key_lower = key.to_ascii_lowercase();
        let field = match key_lower.as_str() {
            "ncols" | "nrows" | "xllcorner" | "yllcorner" | "cellsize" | "nodata_value" => {
                tokens
                    .next()
                    .ok_or_else(|| AscError::MalformedHeader(line.to_string()))?
            }
            _ => {
                // first data row
                body_start = line.to_string();
                break;
            }
        };
        let value: f64 = field
            .parse()
            .map_err(|_| AscError::MalformedHeader(line.to_string()))?;
        match key_lower.as_str() {
            "ncols" => ncols = Some(value),
            "nrows" => nrows = Some(value),
            "xllcorner" => xllcorner = Some(value),
            "yllcorner" => yllcorner = Some(value),
            "cellsize" => cellsize = Some(value),
            _ => nodata = Some(value),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cols = ncols.ok_or(AscError::MissingHeader("ncols"))? as usize;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rows = nrows.ok_or(AscError::MissingHeader("nrows"))? as usize;
    let x_min = xllcorner.ok_or(AscError::MissingHeader("xllcorner"))?;
    let y_min = yllcorner.ok_or(AscError::MissingHeader("yllcorner"))?;
    let cell = cellsize.ok_or(AscError::MissingHeader("cellsize"))?;

    let mut values: Vec<f64> = Vec::with_capacity(rows * cols);
    for token in body_start
        .split_whitespace()
        .chain(lines.flat_map(str::split_whitespace))
    {
        let v: f64 = token
            .parse()
            .map_err(|_| AscError::BadCell(token.to_string()))?;
        values.push(v);
    }
    if values.len() != rows * cols {
        return Err(AscError::CellCountMismatch {
            expected: rows * cols,
            found: values.len(),
        });
    }

    // flatten NODATA cells to the lowest valid elevation
    if let Some(nodata) = nodata {
        let floor = values
            .iter()
            .copied()
            .filter(|v| (v - nodata).abs() > f64::EPSILON)
            .fold(f64::INFINITY, f64::min);
        if !floor.is_finite() {
            return Err(AscError::AllNoData);
        }
        let mut replaced = 0usize;
        for v in &mut values {
            if (*v - nodata).abs() <= f64::EPSILON {
                *v = floor;
                replaced += 1;
            }
        }
        if replaced > 0 {
            log::info!("flattened {replaced} NODATA cells to {floor}");
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let extent = GridExtent {
        x_min,
        y_max: y_min + cell * rows as f64,
        cell_width: cell,
        cell_height: cell,
        rows,
        cols,
    };
    let data = Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| AscError::MalformedHeader(e.to_string()))?;
    Ok(RasterGrid::new(extent, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hachure::Point;

    const SMALL: &str = "\
ncols 3
nrows 2
xllcorner 100.0
yllcorner 200.0
cellsize 10.0
NODATA_value -9999
1 2 3
4 -9999 6
";

    #[test]
    fn test_parse_header_and_extent() {
        let grid = parse_asc(SMALL).unwrap();
        let extent = grid.extent();
        assert_eq!((extent.rows, extent.cols), (2, 3));
        assert_relative_eq!(extent.x_min, 100.0);
        assert_relative_eq!(extent.y_max, 220.0);
        assert_relative_eq!(extent.cell_width, 10.0);
    }

    #[test]
    fn test_first_row_is_northernmost() {
        let grid = parse_asc(SMALL).unwrap();
        // northwest cell center
        assert_eq!(grid.sample(Point::new(105.0, 215.0)), Some(1.0));
        // southeast cell center
        assert_eq!(grid.sample(Point::new(125.0, 205.0)), Some(6.0));
    }

    #[test]
    fn test_nodata_flattened_to_minimum() {
        let grid = parse_asc(SMALL).unwrap();
        assert_eq!(grid.sample(Point::new(115.0, 205.0)), Some(1.0));
    }

    #[test]
    fn test_cell_count_mismatch() {
        let truncated = SMALL.rsplit_once('\n').map(|(a, _)| a).unwrap();
        let truncated = truncated.rsplit_once('\n').map(|(a, _)| a).unwrap();
        assert!(matches!(
            parse_asc(truncated),
            Err(AscError::CellCountMismatch { expected: 6, found: 3 })
        ));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            parse_asc("ncols 3\n1 2 3\n"),
            Err(AscError::MissingHeader(_))
        ));
    }
}
