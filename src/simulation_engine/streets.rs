use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SignalTiming;
use crate::error::JunctionResult;
use crate::shared_data::{IntersectionId, StreetId};
use crate::simulation_engine::intersections::Intersection;

/// A two-way street between two intersections.
#[derive(Debug, Clone, PartialEq)]
pub struct Street {
    pub id: StreetId,
    pub name: String,
    pub from: IntersectionId,
    pub to: IntersectionId,
    /// Length of the street in meters.
    pub length_m: f64,
}

impl Street {
    pub fn new(id: StreetId, from: IntersectionId, to: IntersectionId, length_m: f64) -> Self {
        Self {
            id,
            name: format!("{}{}-{}{}", from.0, from.1, to.0, to.1),
            from,
            to,
            length_m,
        }
    }

    /// The end of the street that is not `at`.
    pub fn other_end(&self, at: IntersectionId) -> IntersectionId {
        if at == self.from {
            self.to
        } else {
            self.from
        }
    }
}

/// A rows x cols grid of intersections joined by horizontal and vertical streets.
pub struct TrafficGrid {
    pub intersections: BTreeMap<IntersectionId, Arc<Intersection>>,
    pub streets: BTreeMap<StreetId, Street>,
}

impl TrafficGrid {
    /// Fails if `timing` does not validate.
    pub fn new(
        rows: u8,
        cols: u8,
        street_length_m: f64,
        timing: SignalTiming,
    ) -> JunctionResult<Self> {
        let mut intersections = BTreeMap::new();
        for row in 0..rows {
            for col in 0..cols {
                let id = IntersectionId(row, col);
                intersections.insert(id, Arc::new(Intersection::new(id, timing)?));
            }
        }

        let mut grid = Self {
            intersections,
            streets: BTreeMap::new(),
        };

        // Horizontal streets: (row, col) <-> (row, col+1)
        for row in 0..rows {
            for col in 1..cols {
                grid.connect(
                    IntersectionId(row, col - 1),
                    IntersectionId(row, col),
                    street_length_m,
                );
            }
        }

        // Vertical streets: (row, col) <-> (row+1, col)
        for col in 0..cols {
            for row in 1..rows {
                grid.connect(
                    IntersectionId(row - 1, col),
                    IntersectionId(row, col),
                    street_length_m,
                );
            }
        }

        Ok(grid)
    }

    fn connect(&mut self, from: IntersectionId, to: IntersectionId, length_m: f64) {
        let id = StreetId(self.streets.len() as u32);
        for end in [from, to] {
            if let Some(intersection) = self.intersections.get(&end) {
                intersection.add_street(id);
            }
        }
        self.streets.insert(id, Street::new(id, from, to, length_m));
    }

    pub fn street(&self, id: StreetId) -> Option<&Street> {
        self.streets.get(&id)
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Arc<Intersection>> {
        self.intersections.get(&id)
    }

    /// Starts every intersection's light and admission loop.
    pub fn simulate(&self) {
        for intersection in self.intersections.values() {
            intersection.simulate();
        }
    }

    pub fn shutdown(&self) {
        for intersection in self.intersections.values() {
            intersection.shutdown();
        }
    }
}
