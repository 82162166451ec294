//! Labeled regions of the play area, and tracking which of them each body is in.
//!
//! Zone geometry belongs to the game's level; this module only needs to ask a
//! [`ZoneCatalog`] which zones contain a point, and it reports changes in membership
//! to a [`ZoneEventSink`] supplied by the caller, so that the game rules layer decides
//! what entering or leaving a zone means.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashSet;

use crate::math::{FreePoint, Rect, polygon_contains_point};
use crate::space::BodyId;

/// Identifies a zone within a [`ZoneCatalog`].
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneId(pub u32);

/// Source of zone geometry.
pub trait ZoneCatalog {
    /// Appends to `out` every zone that contains `point`.
    fn zones_containing(&self, point: FreePoint, out: &mut Vec<ZoneId>);

    /// Returns whether the zone still exists. Zones may be removed while bodies are
    /// inside them, in which case no "left" event is reported for them.
    fn contains_zone(&self, zone: ZoneId) -> bool;
}

/// Receiver of zone membership changes.
pub trait ZoneEventSink {
    /// `body` was found inside `zone`, and was not on the previous check.
    fn zone_entered(&mut self, body: BodyId, zone: ZoneId);
    /// `body` is no longer inside `zone`, but was on the previous check.
    fn zone_left(&mut self, body: BodyId, zone: ZoneId);
}

/// A zone membership change, as recorded by the [`ZoneEventSink`] implementation for
/// [`Vec`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum ZoneEvent {
    /// See [`ZoneEventSink::zone_entered()`].
    Entered(BodyId, ZoneId),
    /// See [`ZoneEventSink::zone_left()`].
    Left(BodyId, ZoneId),
}

impl ZoneEventSink for Vec<ZoneEvent> {
    fn zone_entered(&mut self, body: BodyId, zone: ZoneId) {
        self.push(ZoneEvent::Entered(body, zone));
    }
    fn zone_left(&mut self, body: BodyId, zone: ZoneId) {
        self.push(ZoneEvent::Left(body, zone));
    }
}

/// The zones one body was in on the most recent and the previous check.
///
/// The two sets trade places on every check, so no set is ever copied.
#[derive(Clone, Default, PartialEq)]
pub struct ZoneMembership {
    sets: [HashSet<ZoneId>; 2],
    first_is_current: bool,
    // reused buffer for catalog results
    scratch: Vec<ZoneId>,
}

impl ZoneMembership {
    /// Zones the body was in as of the most recent check.
    pub fn current(&self) -> &HashSet<ZoneId> {
        &self.sets[self.current_index()]
    }

    fn current_index(&self) -> usize {
        usize::from(!self.first_is_current)
    }

    /// Checks which zones `position` is in and reports differences from the previous
    /// check to `sink`.
    pub fn update(
        &mut self,
        body: BodyId,
        position: FreePoint,
        catalog: &dyn ZoneCatalog,
        sink: &mut dyn ZoneEventSink,
    ) {
        self.first_is_current = !self.first_is_current;
        let current_index = self.current_index();
        let [first, second] = &mut self.sets;
        let (current, previous) = if current_index == 0 {
            (first, second)
        } else {
            (second, first)
        };

        self.scratch.clear();
        catalog.zones_containing(position, &mut self.scratch);
        current.clear();
        current.extend(self.scratch.iter().copied());

        // Sort so that events come out in a deterministic order.
        let mut entered: Vec<ZoneId> = current.difference(previous).copied().collect();
        entered.sort_unstable();
        for zone in entered {
            sink.zone_entered(body, zone);
        }

        let mut left: Vec<ZoneId> = previous
            .difference(current)
            .copied()
            .filter(|&zone| catalog.contains_zone(zone))
            .collect();
        left.sort_unstable();
        for zone in left {
            sink.zone_left(body, zone);
        }
    }

    /// Forgets all membership, without reporting any events.
    pub fn clear(&mut self) {
        for set in &mut self.sets {
            set.clear();
        }
    }
}

impl fmt::Debug for ZoneMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current: Vec<ZoneId> = self.current().iter().copied().collect();
        current.sort_unstable();
        f.debug_struct("ZoneMembership")
            .field("current", &current)
            .finish_non_exhaustive()
    }
}

/// A [`ZoneCatalog`] of polygonal zones.
#[derive(Clone, Debug, Default)]
pub struct ZoneMap {
    zones: BTreeMap<ZoneId, MapZone>,
    next_id: u32,
}

#[derive(Clone, Debug)]
struct MapZone {
    polygon: Vec<FreePoint>,
    bounds: Rect,
}

impl ZoneMap {
    /// Constructs an empty [`ZoneMap`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a zone bounded by the given polygon and returns its id.
    ///
    /// Returns [`None`] if the polygon has fewer than three vertices, since it could not
    /// contain anything, or if any vertex is not finite.
    pub fn add(&mut self, polygon: Vec<FreePoint>) -> Option<ZoneId> {
        if polygon.len() < 3 || !polygon.iter().all(|v| v.x.is_finite() && v.y.is_finite()) {
            return None;
        }
        let bounds = Rect::bounding(polygon.iter().copied())?;
        let id = ZoneId(self.next_id);
        self.next_id += 1;
        self.zones.insert(id, MapZone { polygon, bounds });
        Some(id)
    }

    /// Removes a zone. Returns whether it existed.
    pub fn remove(&mut self, zone: ZoneId) -> bool {
        self.zones.remove(&zone).is_some()
    }

    /// Returns the polygon of the given zone.
    pub fn polygon(&self, zone: ZoneId) -> Option<&[FreePoint]> {
        self.zones.get(&zone).map(|z| z.polygon.as_slice())
    }
}

impl ZoneCatalog for ZoneMap {
    fn zones_containing(&self, point: FreePoint, out: &mut Vec<ZoneId>) {
        out.extend(
            self.zones
                .iter()
                .filter(|(_, zone)| {
                    zone.bounds.contains(point) && polygon_contains_point(&zone.polygon, point)
                })
                .map(|(&id, _)| id),
        );
    }

    fn contains_zone(&self, zone: ZoneId) -> bool {
        self.zones.contains_key(&zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn square(x: f64, y: f64, size: f64) -> Vec<FreePoint> {
        vec![
            FreePoint::new(x, y),
            FreePoint::new(x + size, y),
            FreePoint::new(x + size, y + size),
            FreePoint::new(x, y + size),
        ]
    }

    #[test]
    fn stationary_inside_then_leaves() {
        let mut map = ZoneMap::new();
        let zone = map.add(square(0.0, 0.0, 100.0)).unwrap();
        let body = BodyId::for_testing(1);
        let mut membership = ZoneMembership::default();
        let mut events = Vec::new();

        for _tick in 1..=5 {
            membership.update(body, FreePoint::new(50.0, 50.0), &map, &mut events);
        }
        assert_eq!(events, vec![ZoneEvent::Entered(body, zone)]);

        membership.update(body, FreePoint::new(150.0, 50.0), &map, &mut events);
        assert_eq!(
            events,
            vec![ZoneEvent::Entered(body, zone), ZoneEvent::Left(body, zone)]
        );

        membership.update(body, FreePoint::new(150.0, 50.0), &map, &mut events);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn overlapping_zones_cross_over() {
        let mut map = ZoneMap::new();
        let a = map.add(square(0.0, 0.0, 100.0)).unwrap();
        let b = map.add(square(50.0, 0.0, 100.0)).unwrap();
        let body = BodyId::for_testing(7);
        let mut membership = ZoneMembership::default();
        let mut events = Vec::new();

        membership.update(body, FreePoint::new(25.0, 10.0), &map, &mut events);
        membership.update(body, FreePoint::new(75.0, 10.0), &map, &mut events);
        membership.update(body, FreePoint::new(125.0, 10.0), &map, &mut events);
        assert_eq!(
            events,
            vec![
                ZoneEvent::Entered(body, a),
                ZoneEvent::Entered(body, b),
                ZoneEvent::Left(body, a),
            ]
        );
        assert_eq!(membership.current().len(), 1);
        assert!(membership.current().contains(&b));
    }

    #[test]
    fn removed_zone_does_not_report_leaving() {
        let mut map = ZoneMap::new();
        let zone = map.add(square(0.0, 0.0, 100.0)).unwrap();
        let body = BodyId::for_testing(1);
        let mut membership = ZoneMembership::default();
        let mut events = Vec::new();

        membership.update(body, FreePoint::new(50.0, 50.0), &map, &mut events);
        assert!(map.remove(zone));
        membership.update(body, FreePoint::new(50.0, 50.0), &map, &mut events);
        assert_eq!(events, vec![ZoneEvent::Entered(body, zone)]);
    }

    #[test]
    fn degenerate_zone_rejected() {
        let mut map = ZoneMap::new();
        assert_eq!(
            map.add(vec![FreePoint::origin(), FreePoint::new(1.0, 0.0)]),
            None
        );
    }
}
