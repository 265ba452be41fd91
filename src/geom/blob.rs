//! Geometry blob containers stored in spatial SQLite databases.
//!
//! Three layouts are recognised:
//! - plain WKB (ISO or EWKB),
//! - GeoPackage binary: `GP` magic, version, flags, srid, optional envelope, then WKB,
//! - Spatialite internal blob: `0x00`, byte order, srid, MBR, `0x7C`, class type,
//!   body, `0xFE`.

use anyhow::{anyhow, bail, Context, Result};
use geo::{BoundingRect, Geometry};
use serde::{Deserialize, Serialize};

use crate::geom::wkb::{geometry_type_of, read_body, read_wkb, write_body, write_wkb, ByteReader, Framing};
use crate::geom::{Dimension, GeometryType};

const GPKG_MAGIC: &[u8; 2] = b"GP";
const GPKG_FLAG_LE: u8 = 0b0000_0001;
const GPKG_FLAG_EMPTY: u8 = 0b0001_0000;
const GPKG_ENVELOPE_XY: u8 = 0b0000_0010;

const SPL_START: u8 = 0x00;
const SPL_MBR_END: u8 = 0x7C;
const SPL_END: u8 = 0xFE;
/// start + order + srid + mbr + mbr end
const SPL_HEADER_LEN: usize = 1 + 1 + 4 + 32 + 1;

/// Storage layout of a geometry blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobFormat {
    Wkb,
    GeoPackage,
    Spatialite,
}

/// A decoded blob: XY geometry plus the SRID stored in the container, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBlob {
    pub geometry: Geometry<f64>,
    pub srid: Option<i32>,
    pub format: BlobFormat,
}

impl BlobFormat {
    /// Guess the layout of a blob from its leading and trailing bytes.
    pub fn detect(blob: &[u8]) -> Option<Self> {
        if blob.len() >= 8 && &blob[..2] == GPKG_MAGIC {
            return Some(Self::GeoPackage);
        }
        if blob.len() > SPL_HEADER_LEN + 4
            && blob[0] == SPL_START
            && blob[1] <= 1
            && blob[SPL_HEADER_LEN - 1] == SPL_MBR_END
            && blob[blob.len() - 1] == SPL_END
        {
            return Some(Self::Spatialite);
        }
        match blob.first() {
            Some(0) | Some(1) => Some(Self::Wkb),
            _ => None,
        }
    }
}

/// Decode any supported geometry blob.
pub fn decode_blob(blob: &[u8]) -> Result<DecodedBlob> {
    let format = BlobFormat::detect(blob)
        .ok_or_else(|| anyhow!("[geom::blob] unrecognised geometry blob ({} bytes)", blob.len()))?;
    let (geometry, srid) = match format {
        BlobFormat::Wkb => (crate::geom::geometry_from_wkb(blob)?, None),
        BlobFormat::GeoPackage => {
            let (g, srid) = decode_gpkg(blob).context("[geom::blob] Failed to decode GeoPackage blob")?;
            (g, Some(srid))
        }
        BlobFormat::Spatialite => {
            let (g, srid) = decode_spatialite(blob).context("[geom::blob] Failed to decode Spatialite blob")?;
            (g, Some(srid))
        }
    };
    Ok(DecodedBlob { geometry, srid, format })
}

/// Encode a geometry in the given container layout.
pub fn encode_blob(geometry: &Geometry<f64>, srid: i32, format: BlobFormat) -> Vec<u8> {
    match format {
        BlobFormat::Wkb => crate::geom::geometry_to_wkb(geometry),
        BlobFormat::GeoPackage => encode_gpkg(geometry, srid),
        BlobFormat::Spatialite => encode_spatialite(geometry, srid),
    }
}

fn decode_gpkg(blob: &[u8]) -> Result<(Geometry<f64>, i32)> {
    let mut r = ByteReader::new(blob);
    r.skip(2)?; // magic
    let _version = r.u8()?;
    let flags = r.u8()?;
    r.set_little_endian(flags & GPKG_FLAG_LE != 0);
    let srid = r.i32()?;

    let envelope_len = match (flags >> 1) & 0b111 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => bail!("[geom::blob] invalid GeoPackage envelope indicator {other}"),
    };
    r.skip(envelope_len).context("[geom::blob] GeoPackage envelope truncated")?;

    let geometry = read_wkb(&mut r)?;
    Ok((geometry, srid))
}

fn encode_gpkg(geometry: &Geometry<f64>, srid: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(GPKG_MAGIC);
    out.push(0); // version 1.0

    match geometry.bounding_rect() {
        Some(rect) => {
            out.push(GPKG_FLAG_LE | GPKG_ENVELOPE_XY);
            out.extend_from_slice(&srid.to_le_bytes());
            for v in [rect.min().x, rect.max().x, rect.min().y, rect.max().y] {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        None => {
            out.push(GPKG_FLAG_LE | GPKG_FLAG_EMPTY);
            out.extend_from_slice(&srid.to_le_bytes());
        }
    }

    write_wkb(&mut out, geometry);
    out
}

fn decode_spatialite(blob: &[u8]) -> Result<(Geometry<f64>, i32)> {
    let mut r = ByteReader::new(blob);
    if r.u8()? != SPL_START {
        bail!("[geom::blob] missing Spatialite start byte");
    }
    let order = r.u8()?;
    r.set_little_endian(order == 1);
    let srid = r.i32()?;
    r.skip(32)?; // MBR
    if r.u8()? != SPL_MBR_END {
        bail!("[geom::blob] missing Spatialite MBR end marker");
    }
    let class = r.i32()?;
    if class >= 1_000_000 {
        bail!("[geom::blob] compressed Spatialite geometry class {class} is not supported");
    }
    let (ty, dim) = GeometryType::from_code(class as i64)?;
    let geometry = read_body(&mut r, ty, dim, Framing::Spatialite)?;
    if r.u8()? != SPL_END || r.remaining() != 0 {
        bail!("[geom::blob] Spatialite blob not terminated at byte {}", r.position());
    }
    Ok((geometry, srid))
}

fn encode_spatialite(geometry: &Geometry<f64>, srid: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.push(SPL_START);
    out.push(1);
    out.extend_from_slice(&srid.to_le_bytes());
    let (min_x, min_y, max_x, max_y) = match geometry.bounding_rect() {
        Some(rect) => (rect.min().x, rect.min().y, rect.max().x, rect.max().y),
        None => (0.0, 0.0, 0.0, 0.0),
    };
    for v in [min_x, min_y, max_x, max_y] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.push(SPL_MBR_END);
    let class = geometry_type_of(geometry).code() + Dimension::Xy.code_offset();
    out.extend_from_slice(&class.to_le_bytes());
    write_body(&mut out, geometry, Framing::Spatialite);
    out.push(SPL_END);
    out
}
