//! WKB reading operations.

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

use crate::geom::{Dimension, GeometryType};
use super::{Framing, ENTITY_MARKER, EWKB_M, EWKB_SRID, EWKB_Z, WKB_LE};

/// Deepest allowed nesting of multi-geometries and collections.
const MAX_NESTING: usize = 32;

/// Cursor over a geometry buffer with a switchable byte order.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    le: bool,
    depth: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self { Self { buf, pos: 0, le: true, depth: 0 } }

    #[inline] pub(crate) fn set_little_endian(&mut self, le: bool) { self.le = le }

    #[inline] pub(crate) fn position(&self) -> usize { self.pos }

    #[inline] pub(crate) fn remaining(&self) -> usize { self.buf.len() - self.pos }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self.buf.get(self.pos..end)
            .ok_or_else(|| anyhow!("[geom::wkb::read] unexpected end of buffer at byte {}", self.pos))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            bail!("[geom::wkb::read] cannot skip {n} bytes at byte {}", self.pos);
        }
        self.pos += n;
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> Result<u8> { Ok(self.take::<1>()?[0]) }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let b = self.take::<4>()?;
        Ok(if self.le { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        let b = self.take::<4>()?;
        Ok(if self.le { i32::from_le_bytes(b) } else { i32::from_be_bytes(b) })
    }

    pub(crate) fn f64(&mut self) -> Result<f64> {
        let b = self.take::<8>()?;
        Ok(if self.le { f64::from_le_bytes(b) } else { f64::from_be_bytes(b) })
    }

    /// Read an element count and check that the buffer can hold that many items.
    fn count(&mut self, min_item_size: usize) -> Result<usize> {
        let n = self.u32()? as usize;
        if n.saturating_mul(min_item_size) > self.remaining() {
            bail!("[geom::wkb::read] count {n} exceeds remaining {} bytes", self.remaining());
        }
        Ok(n)
    }
}

/// Read a coordinate, dropping any Z/M ordinates.
fn read_coord(r: &mut ByteReader, dim: Dimension) -> Result<Coord<f64>> {
    let x = r.f64()?;
    let y = r.f64()?;
    r.skip((dim.ordinates() - 2) * 8)?;
    Ok(Coord { x, y })
}

fn read_line(r: &mut ByteReader, dim: Dimension) -> Result<LineString<f64>> {
    let n = r.count(dim.ordinates() * 8)?;
    let coords = (0..n)
        .map(|_| read_coord(r, dim))
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::from(coords))
}

fn read_polygon(r: &mut ByteReader, dim: Dimension) -> Result<Polygon<f64>> {
    let rings = r.count(4)?;
    if rings == 0 {
        return Ok(Polygon::new(LineString::new(vec![]), vec![]));
    }
    let exterior = read_line(r, dim)
        .context("[geom::wkb::read] Failed to read exterior ring")?;
    let interiors = (1..rings)
        .map(|_| read_line(r, dim))
        .collect::<Result<Vec<_>>>()
        .context("[geom::wkb::read] Failed to read interior ring")?;
    Ok(Polygon::new(exterior, interiors))
}

/// Read the members of a multi-geometry or collection.
fn read_members(r: &mut ByteReader, framing: Framing) -> Result<Vec<Geometry<f64>>> {
    if r.depth >= MAX_NESTING {
        bail!("[geom::wkb::read] geometry nested deeper than {MAX_NESTING} levels");
    }
    let n = r.count(5)?;
    r.depth += 1;
    let members = (0..n).map(|_| read_entity(r, framing)).collect();
    r.depth -= 1;
    members
}

/// Read a geometry body once its type and dimension are known.
pub(crate) fn read_body(r: &mut ByteReader, ty: GeometryType, dim: Dimension, framing: Framing) -> Result<Geometry<f64>> {
    Ok(match ty {
        GeometryType::Point => Geometry::Point(Point(read_coord(r, dim)?)),
        GeometryType::LineString => Geometry::LineString(read_line(r, dim)?),
        GeometryType::Polygon => Geometry::Polygon(read_polygon(r, dim)?),
        GeometryType::MultiPoint => Geometry::MultiPoint(MultiPoint(
            read_members(r, framing)?.into_iter()
                .map(|g| match g {
                    Geometry::Point(p) => Ok(p),
                    _ => Err(anyhow!("[geom::wkb::read] MultiPoint member is not a Point")),
                })
                .collect::<Result<_>>()?
        )),
        GeometryType::MultiLineString => Geometry::MultiLineString(MultiLineString(
            read_members(r, framing)?.into_iter()
                .map(|g| match g {
                    Geometry::LineString(l) => Ok(l),
                    _ => Err(anyhow!("[geom::wkb::read] MultiLineString member is not a LineString")),
                })
                .collect::<Result<_>>()?
        )),
        GeometryType::MultiPolygon => Geometry::MultiPolygon(MultiPolygon(
            read_members(r, framing)?.into_iter()
                .map(|g| match g {
                    Geometry::Polygon(p) => Ok(p),
                    _ => Err(anyhow!("[geom::wkb::read] MultiPolygon member is not a Polygon")),
                })
                .collect::<Result<_>>()?
        )),
        GeometryType::GeometryCollection => Geometry::GeometryCollection(
            GeometryCollection(read_members(r, framing)?)
        ),
        GeometryType::Geometry => bail!("[geom::wkb::read] abstract GEOMETRY type has no body"),
    })
}

/// Read a nested entity using the framing of the enclosing container.
fn read_entity(r: &mut ByteReader, framing: Framing) -> Result<Geometry<f64>> {
    match framing {
        Framing::Wkb => read_wkb(r),
        Framing::Spatialite => {
            let marker = r.u8()?;
            if marker != ENTITY_MARKER {
                bail!("[geom::wkb::read] expected entity marker 0x69, found {marker:#04x}");
            }
            let (ty, dim) = GeometryType::from_code(r.i32()? as i64)?;
            read_body(r, ty, dim, framing)
        }
    }
}

/// Read one WKB geometry (ISO or EWKB) starting at the reader position.
pub(crate) fn read_wkb(r: &mut ByteReader) -> Result<Geometry<f64>> {
    let order = r.u8().context("[geom::wkb::read] Failed to read byte order")?;
    if order > 1 {
        bail!("[geom::wkb::read] invalid byte order flag {order}");
    }
    r.set_little_endian(order == WKB_LE);

    let raw = r.u32().context("[geom::wkb::read] Failed to read geometry type")?;
    if raw & EWKB_SRID != 0 {
        r.i32().context("[geom::wkb::read] Failed to read EWKB srid")?;
    }
    let (ty, iso_dim) = GeometryType::from_code((raw & 0x0FFF_FFFF) as i64)?;
    let dim = match (raw & EWKB_Z != 0, raw & EWKB_M != 0) {
        (true, true) => Dimension::Xyzm,
        (true, false) => Dimension::Xyz,
        (false, true) => Dimension::Xym,
        (false, false) => iso_dim,
    };
    read_body(r, ty, dim, Framing::Wkb)
}

/// Read a Geometry from WKB bytes.
pub fn geometry_from_wkb(bytes: &[u8]) -> Result<Geometry<f64>> {
    let mut reader = ByteReader::new(bytes);
    read_wkb(&mut reader)
}
