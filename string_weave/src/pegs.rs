use num_traits::AsPrimitive;

use crate::{
    geometry::Point,
    layout::Layout,
    verboser::{Message, Verboser},
    Float,
};

/// Peg positions around the solving circle, computed once per layout.
#[derive(Clone, Debug)]
pub struct Pegs<T = f64> {
    positions: Vec<Point<T>>,
}

impl<T: Float> Pegs<T>
where
    usize: AsPrimitive<T>,
{
    /// Peg `i` sits at angle `i * 2π / pegs`, on the circle inscribed in the canvas.
    pub fn circular(layout: &Layout, verboser: &impl Verboser) -> Self {
        verboser.verbose(Message::CachingPegs(layout.pegs()));
        let radius: T = layout.radius().as_();
        let delta: T = layout.angle_delta();
        Self {
            positions: (0..layout.pegs())
                .map(|i| {
                    let theta = delta * i.as_();
                    Point {
                        x: radius * (T::ONE + theta.cos()),
                        y: radius * (T::ONE + theta.sin()),
                    }
                })
                .collect(),
        }
    }
}

impl<T: Copy> Pegs<T> {
    pub fn positions(&self) -> &[Point<T>] {
        &self.positions
    }

    pub fn get(&self, index: usize) -> Option<Point<T>> {
        self.positions.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verboser::Silent;

    #[test]
    fn pegs_lie_on_the_inscribed_circle() {
        let layout = Layout::new(10, 8).unwrap();
        let pegs = Pegs::<f64>::circular(&layout, &Silent);
        assert_eq!(pegs.len(), 8);
        let center = Point::new(10.0, 10.0);
        for peg in pegs.positions() {
            assert!((peg.distance(&center) - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn first_pegs_follow_the_angle() {
        let layout = Layout::new(10, 4).unwrap();
        let pegs = Pegs::<f64>::circular(&layout, &Silent);
        let first = pegs.get(0).unwrap();
        assert!((first.x - 20.0).abs() < 1e-9 && (first.y - 10.0).abs() < 1e-9);
        let second = pegs.get(1).unwrap();
        assert!((second.x - 10.0).abs() < 1e-9 && (second.y - 20.0).abs() < 1e-9);
        assert!(pegs.get(4).is_none());
    }
}
