//! Nearest-candidate resolution by great-circle distance
//!
//! Candidate sets are small (tens to low hundreds of stations), so a linear
//! scan is used rather than a spatial index.

use crate::models::{Coordinate, NearestStation, SavedLocation, Station};

/// Anything that may carry a position
pub trait Locatable {
    fn coordinate(&self) -> Option<Coordinate>;
}

impl Locatable for Coordinate {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(*self)
    }
}

impl Locatable for Station {
    fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }
}

impl Locatable for NearestStation {
    fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }
}

impl Locatable for SavedLocation {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(self.coordinate)
    }
}

impl<T: Locatable> Locatable for &T {
    fn coordinate(&self) -> Option<Coordinate> {
        (*self).coordinate()
    }
}

/// A selected candidate together with its distance from the reference point
#[derive(Debug, PartialEq)]
pub struct Nearest<'a, T> {
    pub candidate: &'a T,
    pub distance_km: f64,
}

impl<T> Clone for Nearest<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Nearest<'_, T> {}

/// Haversine distance in kilometres on a sphere of radius 6371 km
#[must_use]
pub fn distance_km(from: Coordinate, to: Coordinate) -> f64 {
    haversine::distance(
        haversine::Location {
            latitude: from.latitude,
            longitude: from.longitude,
        },
        haversine::Location {
            latitude: to.latitude,
            longitude: to.longitude,
        },
        haversine::Units::Kilometers,
    )
}

fn usable_distance<T: Locatable>(reference: Coordinate, candidate: &T) -> Option<f64> {
    let coordinate = candidate.coordinate().filter(Coordinate::is_usable)?;
    let distance = distance_km(reference, coordinate);
    (!distance.is_nan()).then_some(distance)
}

/// Select the candidate closest to `reference`.
///
/// Candidates without a usable coordinate are skipped. On equal distances the
/// earliest candidate wins. Returns `None` when nothing usable remains.
#[must_use]
pub fn nearest<T: Locatable>(reference: Coordinate, candidates: &[T]) -> Option<Nearest<'_, T>> {
    let mut best: Option<Nearest<'_, T>> = None;

    for candidate in candidates {
        let Some(distance) = usable_distance(reference, candidate) else {
            continue;
        };

        if best.is_none_or(|current| distance < current.distance_km) {
            best = Some(Nearest {
                candidate,
                distance_km: distance,
            });
        }
    }

    best
}

/// All usable candidates ordered by distance, closest first.
///
/// The sort is stable, so equal distances keep input order.
#[must_use]
pub fn rank_by_distance<T: Locatable>(reference: Coordinate, candidates: &[T]) -> Vec<Nearest<'_, T>> {
    let mut ranked: Vec<Nearest<'_, T>> = candidates
        .iter()
        .filter_map(|candidate| {
            usable_distance(reference, candidate).map(|distance_km| Nearest {
                candidate,
                distance_km,
            })
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}
