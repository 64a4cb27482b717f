//! Helpers over `geo::Geometry<f64>`: normalisation, envelopes, envelope
//! intersection, flattening and multi-geometry assembly.

use geo::{
    BooleanOps, BoundingRect, Geometry, GeometryCollection, LineString, MultiLineString,
    MultiPoint, MultiPolygon, Point, Polygon,
};

use crate::envelope::Envelope;
use crate::proj::crs::Crs;

/// Concrete type of a simple (non-collection) geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafKind {
    Point,
    LineString,
    Polygon,
}

impl LeafKind {
    pub fn of(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Point(_) => Some(Self::Point),
            Geometry::LineString(_) | Geometry::Line(_) => Some(Self::LineString),
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => Some(Self::Polygon),
            _ => None,
        }
    }
}

/// Rewrite `Line`, `Rect` and `Triangle` as `LineString`/`Polygon`, recursively.
pub fn normalise(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::Line(l) => Geometry::LineString(LineString::from(vec![l.start, l.end])),
        Geometry::Rect(r) => Geometry::Polygon(r.to_polygon()),
        Geometry::Triangle(t) => Geometry::Polygon(t.to_polygon()),
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection(
            gc.0.into_iter().map(normalise).collect(),
        )),
        other => other,
    }
}

/// Bounding envelope, `None` for empty geometries.
pub fn envelope_of(geometry: &Geometry<f64>, crs: Option<&Crs>) -> Option<Envelope> {
    geometry
        .bounding_rect()
        .map(|r| Envelope::from_rect(r, crs.cloned()))
}

pub fn is_empty(geometry: &Geometry<f64>) -> bool {
    geometry.bounding_rect().is_none()
}

/// Collect the simple components of `geometry` (multi-geometries and
/// collections are decomposed recursively). Empty components are skipped.
pub fn flatten(geometry: Geometry<f64>, out: &mut Vec<Geometry<f64>>) {
    match normalise(geometry) {
        Geometry::MultiPoint(mp) => out.extend(mp.0.into_iter().map(Geometry::Point)),
        Geometry::MultiLineString(mls) => out.extend(
            mls.0
                .into_iter()
                .filter(|l| !l.0.is_empty())
                .map(Geometry::LineString),
        ),
        Geometry::MultiPolygon(mp) => out.extend(
            mp.0
                .into_iter()
                .filter(|p| !p.exterior().0.is_empty())
                .map(Geometry::Polygon),
        ),
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                flatten(g, out);
            }
        }
        leaf if is_empty(&leaf) => {}
        leaf => out.push(leaf),
    }
}

/// Build the most specific geometry holding `leaves`: the leaf itself when
/// there is one, a typed multi-geometry when they share a type, a collection
/// otherwise. `None` when there are no leaves.
pub fn assemble(leaves: Vec<Geometry<f64>>) -> Option<Geometry<f64>> {
    let mut kind = None;
    let mut mixed = false;
    for leaf in &leaves {
        let k = LeafKind::of(leaf);
        match kind {
            None => kind = k,
            Some(prev) if Some(prev) != k => mixed = true,
            _ => {}
        }
    }
    assemble_as(leaves, if mixed { None } else { kind })
}

/// [`assemble`] with the leaf type already tracked by the caller (`None` means mixed).
pub fn assemble_as(mut leaves: Vec<Geometry<f64>>, kind: Option<LeafKind>) -> Option<Geometry<f64>> {
    if leaves.len() <= 1 {
        return leaves.pop();
    }
    let geometry = match kind {
        Some(LeafKind::Point) => Geometry::MultiPoint(MultiPoint(
            leaves.into_iter().filter_map(|g| Point::try_from(g).ok()).collect(),
        )),
        Some(LeafKind::LineString) => Geometry::MultiLineString(MultiLineString(
            leaves
                .into_iter()
                .filter_map(|g| LineString::try_from(g).ok())
                .collect(),
        )),
        Some(LeafKind::Polygon) => Geometry::MultiPolygon(MultiPolygon(
            leaves
                .into_iter()
                .filter_map(|g| Polygon::try_from(g).ok())
                .collect(),
        )),
        None => Geometry::GeometryCollection(GeometryCollection(leaves)),
    };
    Some(geometry)
}

/// Intersection of `geometry` with the polygon of `envelope`.
///
/// Points are kept by inclusive containment, lines are clipped, polygons are
/// intersected. Results collapse to the simple type when single-part; an empty
/// result is `None`.
pub fn intersect_envelope(geometry: &Geometry<f64>, envelope: &Envelope) -> Option<Geometry<f64>> {
    let bounds = envelope_of(geometry, None)?;
    if envelope.contains(&bounds) {
        return Some(normalise(geometry.clone()));
    }
    if !envelope.intersects(&bounds) {
        return None;
    }

    let mask = envelope.to_polygon();
    match normalise(geometry.clone()) {
        Geometry::Point(p) => envelope.contains_point(p.x(), p.y()).then_some(Geometry::Point(p)),
        Geometry::MultiPoint(mp) => assemble_as(
            mp.0.into_iter()
                .filter(|p| envelope.contains_point(p.x(), p.y()))
                .map(Geometry::Point)
                .collect(),
            Some(LeafKind::Point),
        ),
        Geometry::LineString(ls) => clip_lines(&mask, MultiLineString(vec![ls])),
        Geometry::MultiLineString(mls) => clip_lines(&mask, mls),
        Geometry::Polygon(p) => collapse_polygons(p.intersection(&mask)),
        Geometry::MultiPolygon(mp) => collapse_polygons(mp.intersection(&MultiPolygon(vec![mask]))),
        Geometry::GeometryCollection(gc) => {
            let mut leaves = Vec::new();
            for g in &gc.0 {
                if let Some(part) = intersect_envelope(g, envelope) {
                    flatten(part, &mut leaves);
                }
            }
            assemble(leaves)
        }
        // normalise leaves no other variant
        _ => None,
    }
}

fn clip_lines(mask: &Polygon<f64>, lines: MultiLineString<f64>) -> Option<Geometry<f64>> {
    let clipped = mask.clip(&lines, false);
    assemble_as(
        clipped
            .0
            .into_iter()
            .filter(|l| l.0.len() >= 2)
            .map(Geometry::LineString)
            .collect(),
        Some(LeafKind::LineString),
    )
}

fn collapse_polygons(mp: MultiPolygon<f64>) -> Option<Geometry<f64>> {
    assemble_as(
        mp.0.into_iter()
            .filter(|p| !p.exterior().0.is_empty())
            .map(Geometry::Polygon)
            .collect(),
        Some(LeafKind::Polygon),
    )
}

/// Run `f` over every line-like component: line strings, polygon rings and
/// the lines of multi-geometries and collections. Points are not visited.
pub fn for_each_line_mut<F>(geometry: &mut Geometry<f64>, f: &mut F)
where
    F: FnMut(&mut LineString<f64>),
{
    match geometry {
        Geometry::LineString(ls) => f(ls),
        Geometry::MultiLineString(mls) => mls.0.iter_mut().for_each(|ls| f(ls)),
        Geometry::Polygon(p) => polygon_rings_mut(p, f),
        Geometry::MultiPolygon(mp) => mp.0.iter_mut().for_each(|p| polygon_rings_mut(p, f)),
        Geometry::GeometryCollection(gc) => {
            gc.0.iter_mut().for_each(|g| for_each_line_mut(g, f))
        }
        _ => {}
    }
}

fn polygon_rings_mut<F>(polygon: &mut Polygon<f64>, f: &mut F)
where
    F: FnMut(&mut LineString<f64>),
{
    polygon.exterior_mut(|ring| f(ring));
    polygon.interiors_mut(|rings| rings.iter_mut().for_each(|ring| f(ring)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, Line, Rect};

    fn world() -> Envelope {
        Envelope::with_crs(-180.0, -90.0, 180.0, 90.0, Crs::wgs84())
    }

    #[test]
    fn test_normalise_simple_shapes() {
        let line = Geometry::Line(Line::new((0.0, 0.0), (1.0, 1.0)));
        assert!(matches!(normalise(line), Geometry::LineString(ls) if ls.0.len() == 2));
        let rect = Geometry::Rect(Rect::new((0.0, 0.0), (1.0, 1.0)));
        assert!(matches!(normalise(rect), Geometry::Polygon(_)));
    }

    #[test]
    fn test_envelope_of_empty_is_none() {
        let empty = Geometry::GeometryCollection(GeometryCollection(vec![]));
        assert!(envelope_of(&empty, None).is_none());
        let ls = Geometry::LineString(line_string![(x: 1.0, y: 2.0), (x: 5.0, y: -3.0)]);
        let env = envelope_of(&ls, None).unwrap();
        assert_eq!((env.min_x, env.min_y, env.max_x, env.max_y), (1.0, -3.0, 5.0, 2.0));
    }

    #[test]
    fn test_flatten_nested() {
        let gc = Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::MultiPoint(MultiPoint(vec![point!(x: 0.0, y: 0.0), point!(x: 1.0, y: 1.0)])),
            Geometry::GeometryCollection(GeometryCollection(vec![Geometry::LineString(
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)],
            )])),
        ]));
        let mut leaves = Vec::new();
        flatten(gc, &mut leaves);
        assert_eq!(leaves.len(), 3);
    }

    #[test]
    fn test_assemble_types() {
        assert!(assemble(vec![]).is_none());
        let p = Geometry::Point(point!(x: 1.0, y: 1.0));
        assert_eq!(assemble(vec![p.clone()]), Some(p.clone()));
        assert!(matches!(
            assemble(vec![p.clone(), p.clone()]),
            Some(Geometry::MultiPoint(mp)) if mp.0.len() == 2
        ));
        let ls = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        assert!(matches!(
            assemble(vec![p, ls]),
            Some(Geometry::GeometryCollection(gc)) if gc.0.len() == 2
        ));
    }

    #[test]
    fn test_intersect_point() {
        let inside = Geometry::Point(point!(x: 10.0, y: 10.0));
        let outside = Geometry::Point(point!(x: 0.0, y: 95.0));
        assert_eq!(intersect_envelope(&inside, &world()), Some(inside));
        assert!(intersect_envelope(&outside, &world()).is_none());
    }

    #[test]
    fn test_intersect_line_is_clipped() {
        let ls = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 200.0, y: 0.0)]);
        match intersect_envelope(&ls, &world()) {
            Some(Geometry::LineString(clipped)) => {
                let max_x = clipped.0.iter().map(|c| c.x).fold(f64::MIN, f64::max);
                assert!((max_x - 180.0).abs() < 1e-9, "max_x = {max_x}");
            }
            other => panic!("expected a line string, got {other:?}"),
        }
    }

    #[test]
    fn test_intersect_polygon() {
        let poly = Geometry::Polygon(polygon![
            (x: 170.0, y: 0.0),
            (x: 190.0, y: 0.0),
            (x: 190.0, y: 10.0),
            (x: 170.0, y: 10.0),
            (x: 170.0, y: 0.0),
        ]);
        let env = envelope_of(&intersect_envelope(&poly, &world()).unwrap(), None).unwrap();
        assert!((env.min_x - 170.0).abs() < 1e-9);
        assert!((env.max_x - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_visitor_covers_rings() {
        let mut poly = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]);
        let mut visited = 0;
        for_each_line_mut(&mut poly, &mut |_| visited += 1);
        assert_eq!(visited, 1);
    }
}
