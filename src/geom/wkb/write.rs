//! WKB writing operations.

use geo::{Coord, Geometry, LineString, Polygon};

use crate::geom::{Dimension, GeometryType};
use super::{Framing, ENTITY_MARKER, WKB_LE};

#[inline]
fn put_u32(out: &mut Vec<u8>, v: u32) { out.extend_from_slice(&v.to_le_bytes()) }

#[inline]
fn put_coord(out: &mut Vec<u8>, c: &Coord<f64>) {
    out.extend_from_slice(&c.x.to_le_bytes());
    out.extend_from_slice(&c.y.to_le_bytes());
}

fn put_line(out: &mut Vec<u8>, line: &LineString<f64>) {
    put_u32(out, line.0.len() as u32);
    for coord in line.coords() {
        put_coord(out, coord);
    }
}

fn put_polygon(out: &mut Vec<u8>, poly: &Polygon<f64>) {
    if poly.exterior().0.is_empty() && poly.interiors().is_empty() {
        put_u32(out, 0);
        return;
    }
    put_u32(out, (1 + poly.interiors().len()) as u32);
    put_line(out, poly.exterior());
    for interior in poly.interiors() {
        put_line(out, interior);
    }
}

/// The geometry type written for a geo value. Line, Rect and Triangle are
/// widened to LineString and Polygon.
pub(crate) fn geometry_type_of(g: &Geometry<f64>) -> GeometryType {
    match g {
        Geometry::Point(_) => GeometryType::Point,
        Geometry::Line(_) | Geometry::LineString(_) => GeometryType::LineString,
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => GeometryType::Polygon,
        Geometry::MultiPoint(_) => GeometryType::MultiPoint,
        Geometry::MultiLineString(_) => GeometryType::MultiLineString,
        Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
    }
}

/// Write a nested entity header in the framing of the enclosing container.
fn put_entity(out: &mut Vec<u8>, g: &Geometry<f64>, framing: Framing) {
    match framing {
        Framing::Wkb => write_wkb(out, g),
        Framing::Spatialite => {
            out.push(ENTITY_MARKER);
            put_u32(out, geometry_type_of(g).code() + Dimension::Xy.code_offset());
            write_body(out, g, framing);
        }
    }
}

/// Write a geometry body (no header), XY only.
pub(crate) fn write_body(out: &mut Vec<u8>, g: &Geometry<f64>, framing: Framing) {
    match g {
        Geometry::Point(p) => put_coord(out, &p.0),
        Geometry::Line(l) => put_line(out, &LineString::new(vec![l.start, l.end])),
        Geometry::LineString(ls) => put_line(out, ls),
        Geometry::Polygon(poly) => put_polygon(out, poly),
        Geometry::Rect(r) => put_polygon(out, &r.to_polygon()),
        Geometry::Triangle(t) => put_polygon(out, &t.to_polygon()),
        Geometry::MultiPoint(mp) => {
            put_u32(out, mp.0.len() as u32);
            for p in &mp.0 {
                put_entity(out, &Geometry::Point(*p), framing);
            }
        }
        Geometry::MultiLineString(mls) => {
            put_u32(out, mls.0.len() as u32);
            for ls in &mls.0 {
                put_entity(out, &Geometry::LineString(ls.clone()), framing);
            }
        }
        Geometry::MultiPolygon(mp) => {
            put_u32(out, mp.0.len() as u32);
            for poly in &mp.0 {
                put_entity(out, &Geometry::Polygon(poly.clone()), framing);
            }
        }
        Geometry::GeometryCollection(gc) => {
            put_u32(out, gc.0.len() as u32);
            for member in &gc.0 {
                put_entity(out, member, framing);
            }
        }
    }
}

/// Append one little-endian XY WKB geometry to `out`.
pub(crate) fn write_wkb(out: &mut Vec<u8>, g: &Geometry<f64>) {
    out.push(WKB_LE);
    put_u32(out, geometry_type_of(g).code());
    write_body(out, g, Framing::Wkb);
}

/// Write a Geometry to little-endian XY WKB.
pub fn geometry_to_wkb(g: &Geometry<f64>) -> Vec<u8> {
    let mut out = Vec::new();
    write_wkb(&mut out, g);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::geometry_from_wkb;
    use geo::{line_string, point, polygon, MultiPolygon, Rect};

    #[test]
    fn point_layout() {
        let bytes = geometry_to_wkb(&Geometry::Point(point!(x: 1.0, y: 2.0)));
        assert_eq!(bytes.len(), 21);
        assert_eq!(bytes[0], WKB_LE);
        assert_eq!(u32::from_le_bytes(bytes[1..5].try_into().unwrap()), 1);
    }

    #[test]
    fn polygon_with_hole_survives() {
        let poly = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 1.0)]],
        );
        let g = Geometry::MultiPolygon(MultiPolygon(vec![poly]));
        assert_eq!(geometry_from_wkb(&geometry_to_wkb(&g)).unwrap(), g);
    }

    #[test]
    fn rect_is_written_as_polygon() {
        let rect = Rect::new((0.0, 0.0), (1.0, 1.0));
        let back = geometry_from_wkb(&geometry_to_wkb(&Geometry::Rect(rect))).unwrap();
        assert_eq!(back, Geometry::Polygon(rect.to_polygon()));
    }

    #[test]
    fn line_is_written_as_linestring() {
        let g = Geometry::Line(geo::Line::new((0.0, 0.0), (3.0, 4.0)));
        let back = geometry_from_wkb(&geometry_to_wkb(&g)).unwrap();
        assert_eq!(back, Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)]));
    }
}
