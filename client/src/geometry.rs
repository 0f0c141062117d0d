use numbrush_shared::Point;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: &[Point]) -> Option<Bounds> {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for point in points {
            min_x = min_x.min(point.x as f64);
            min_y = min_y.min(point.y as f64);
            max_x = max_x.max(point.x as f64);
            max_y = max_y.max(point.y as f64);
        }
        if min_x == f64::MAX {
            None
        } else {
            Some(Bounds {
                min_x,
                min_y,
                max_x,
                max_y,
            })
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        let x = point.x as f64;
        let y = point.y as f64;
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Even-odd rule. The polygon is implicitly closed.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let px = point.x as f64;
    let py = point.y as f64;
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let xi = polygon[i].x as f64;
        let yi = polygon[i].y as f64;
        let xj = polygon[j].x as f64;
        let yj = polygon[j].y as f64;
        // yi != yj whenever the first clause holds, so the division is safe.
        let intersect = ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi);
        if intersect {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn bounds_cover_all_points() {
        let bounds = Bounds::from_points(&[p(3.0, -1.0), p(-2.0, 4.0), p(1.0, 1.0)]).unwrap();
        assert_eq!(
            bounds,
            Bounds {
                min_x: -2.0,
                min_y: -1.0,
                max_x: 3.0,
                max_y: 4.0
            }
        );
        assert!(bounds.contains(p(3.0, 4.0)));
        assert!(!bounds.contains(p(3.1, 0.0)));
    }

    #[test]
    fn bounds_of_nothing() {
        assert_eq!(Bounds::from_points(&[]), None);
    }

    #[test]
    fn concave_polygon() {
        // U shape opening upwards.
        let polygon = [
            p(0.0, 0.0),
            p(3.0, 0.0),
            p(3.0, 3.0),
            p(2.0, 3.0),
            p(2.0, 1.0),
            p(1.0, 1.0),
            p(1.0, 3.0),
            p(0.0, 3.0),
        ];
        assert!(point_in_polygon(p(0.5, 2.0), &polygon));
        assert!(point_in_polygon(p(2.5, 2.0), &polygon));
        assert!(point_in_polygon(p(1.5, 0.5), &polygon));
        assert!(!point_in_polygon(p(1.5, 2.0), &polygon));
    }

    #[test]
    fn self_intersecting_polygon_uses_even_odd() {
        // Pentagram: the center pentagon is covered twice and therefore outside.
        let polygon = [
            p(50.0, 0.0),
            p(79.0, 90.0),
            p(2.0, 35.0),
            p(98.0, 35.0),
            p(21.0, 90.0),
        ];
        assert!(!point_in_polygon(p(50.0, 50.0), &polygon));
        assert!(point_in_polygon(p(50.0, 10.0), &polygon));
    }
}
