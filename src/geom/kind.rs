use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

/// Geometry family published by a layer's metadata or found in a blob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

/// Coordinate dimension of a layer or blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    #[serde(rename = "XY")] Xy,
    #[serde(rename = "XYZ")] Xyz,
    #[serde(rename = "XYM")] Xym,
    #[serde(rename = "XYZM")] Xyzm,
}

impl GeometryType {
    /// Decode an ISO/Spatialite geometry class code (e.g. 3, 1003, 3006).
    pub fn from_code(code: i64) -> Result<(Self, Dimension)> {
        if code < 0 {
            bail!("[geom::kind] negative geometry type code {code}");
        }
        let dim = match code / 1000 {
            0 => Dimension::Xy,
            1 => Dimension::Xyz,
            2 => Dimension::Xym,
            3 => Dimension::Xyzm,
            _ => bail!("[geom::kind] unsupported geometry type code {code}"),
        };
        let ty = match code % 1000 {
            0 => Self::Geometry,
            1 => Self::Point,
            2 => Self::LineString,
            3 => Self::Polygon,
            4 => Self::MultiPoint,
            5 => Self::MultiLineString,
            6 => Self::MultiPolygon,
            7 => Self::GeometryCollection,
            _ => bail!("[geom::kind] unknown geometry type code {code}"),
        };
        Ok((ty, dim))
    }

    /// Get the base ISO code for this type (without dimension offset).
    pub fn code(&self) -> u32 {
        match self {
            Self::Geometry => 0,
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
            Self::MultiPoint => 4,
            Self::MultiLineString => 5,
            Self::MultiPolygon => 6,
            Self::GeometryCollection => 7,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Geometry => "GEOMETRY",
            Self::Point => "POINT",
            Self::LineString => "LINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPoint => "MULTIPOINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    /// Check whether features of this type are drawn as points.
    #[inline] pub fn is_point(&self) -> bool { matches!(self, Self::Point | Self::MultiPoint) }

    /// Check whether features of this type are drawn as lines.
    #[inline] pub fn is_line(&self) -> bool { matches!(self, Self::LineString | Self::MultiLineString) }

    /// Check whether features of this type are drawn as areas.
    #[inline] pub fn is_polygon(&self) -> bool { matches!(self, Self::Polygon | Self::MultiPolygon) }
}

impl Dimension {
    /// Decode the `coord_dimension` column: 2/3/4 or the text forms ("XY", "XYZ", ...).
    pub fn from_label(label: &str) -> Result<Self> {
        match label.trim().to_uppercase().as_str() {
            "2" | "XY" => Ok(Self::Xy),
            "3" | "XYZ" => Ok(Self::Xyz),
            "XYM" => Ok(Self::Xym),
            "4" | "XYZM" => Ok(Self::Xyzm),
            other => Err(anyhow!("[geom::kind] unknown coordinate dimension '{other}'")),
        }
    }

    /// Number of ordinates per coordinate.
    #[inline]
    pub fn ordinates(&self) -> usize {
        match self {
            Self::Xy => 2,
            Self::Xyz | Self::Xym => 3,
            Self::Xyzm => 4,
        }
    }

    /// Code offset added to the base geometry type (0, 1000, 2000, 3000).
    #[inline]
    pub fn code_offset(&self) -> u32 {
        match self {
            Self::Xy => 0,
            Self::Xyz => 1000,
            Self::Xym => 2000,
            Self::Xyzm => 3000,
        }
    }
}

impl FromStr for GeometryType {
    type Err = anyhow::Error;

    /// Parse the text form used by older `geometry_columns` tables,
    /// e.g. "POINT", "multipolygon", "LINESTRING Z".
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        let base = upper.split_whitespace().next().unwrap_or("");
        match base {
            "GEOMETRY" => Ok(Self::Geometry),
            "POINT" => Ok(Self::Point),
            "LINESTRING" => Ok(Self::LineString),
            "POLYGON" => Ok(Self::Polygon),
            "MULTIPOINT" => Ok(Self::MultiPoint),
            "MULTILINESTRING" => Ok(Self::MultiLineString),
            "MULTIPOLYGON" => Ok(Self::MultiPolygon),
            "GEOMETRYCOLLECTION" => Ok(Self::GeometryCollection),
            _ => Err(anyhow!("[geom::kind] unknown geometry type '{s}'")),
        }
    }
}

/// Read the dimension suffix of a text geometry type ("POINT Z" -> XYZ).
pub(crate) fn dimension_suffix(s: &str) -> Dimension {
    let upper = s.trim().to_uppercase();
    match upper.split_whitespace().nth(1) {
        Some("Z") => Dimension::Xyz,
        Some("M") => Dimension::Xym,
        Some("ZM") => Dimension::Xyzm,
        _ => Dimension::Xy,
    }
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}
