//! [`Space`], the container of everything that moves and everything it collides with.

use std::collections::BTreeMap;
use std::fmt;
use std::ops;

use crate::math::{FreeCoordinate, FreePoint, Rect};
use crate::net::{BitReader, BitWriter, BodyUpdate, DecodeError, UpdateMask, authority_tick, peer_tick};
use crate::physics::{
    Collider, ColliderId, DynamicBody, HIT_BUDGET, Interpolation, SpatialQuery, StateRole,
    move_body, update_interpolation,
};
use crate::time::{Duration, Tick};
use crate::zone::{ZoneCatalog, ZoneEventSink};

#[cfg(test)]
mod tests;

/// Identifies a [`DynamicBody`] within a [`Space`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyId(u32);

impl BodyId {
    #[cfg(test)]
    pub(crate) fn for_testing(index: u32) -> Self {
        Self(index)
    }
}

/// Identifies an [`Obstacle`] within a [`Space`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObstacleId(u32);

impl ObstacleId {
    #[cfg(test)]
    pub(crate) fn for_testing(index: u32) -> Self {
        Self(index)
    }
}

/// Which end of the network connection a [`Space`] is simulating.
#[expect(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// The server, whose actual state is the truth.
    Authority,
    /// A client, which predicts motion locally and adopts the authority's updates.
    Peer,
}

/// Geometry of an [`Obstacle`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Shape {
    /// A closed polygon, or a line segment if it has two vertices.
    Polygon(Vec<FreePoint>),
    /// A circle.
    #[allow(missing_docs)]
    Circle {
        center: FreePoint,
        radius: FreeCoordinate,
    },
}

/// Static geometry that bodies collide with.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    shape: Shape,
    bounds: Rect,
    /// Whether bodies bounce off this obstacle. Bodies pass through non-solid obstacles,
    /// though [`ContactRules::collided()`] still hears about it.
    pub solid: bool,
    pub(crate) collision_enabled: bool,
}

impl Obstacle {
    /// Constructs a solid polygonal obstacle, such as a wall.
    ///
    /// Returns [`None`] if there are fewer than two vertices or any is not finite.
    pub fn polygon(vertices: Vec<FreePoint>) -> Option<Self> {
        if vertices.len() < 2 || !vertices.iter().all(|v| v.x.is_finite() && v.y.is_finite()) {
            return None;
        }
        let bounds = Rect::bounding(vertices.iter().copied())?;
        Some(Self {
            shape: Shape::Polygon(vertices),
            bounds,
            solid: true,
            collision_enabled: true,
        })
    }

    /// Constructs a solid circular obstacle.
    ///
    /// Returns [`None`] if the radius is negative or anything is not finite.
    pub fn circle(center: FreePoint, radius: FreeCoordinate) -> Option<Self> {
        if !(radius >= 0.0 && radius.is_finite() && center.x.is_finite() && center.y.is_finite()) {
            return None;
        }
        let bounds = Rect::bounding([center])?.expand(radius);
        Some(Self {
            shape: Shape::Circle { center, radius },
            bounds,
            solid: true,
            collision_enabled: true,
        })
    }

    /// Sets [`Obstacle::solid`], returning the modified obstacle.
    #[must_use]
    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }

    /// The obstacle's geometry.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Bounding rectangle of the obstacle.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

/// Game rules governing contact between bodies and obstacles.
///
/// Every method has a default, used by [`DefaultContactRules`].
pub trait ContactRules: fmt::Debug {
    /// Whether `this` is willing to collide with `other`. A contact only happens if
    /// both sides agree.
    ///
    /// By default, bodies collide if their [`DynamicBody::collideable`] flag is set, and
    /// obstacles always collide.
    fn collide(&self, this: Collider<'_>, other: Collider<'_>) -> bool {
        let _ = other;
        match this {
            Collider::Body(_, body) => body.collideable,
            Collider::Obstacle(..) => true,
        }
    }

    /// Called when `this` touches `other`, before any physical response. Returning true
    /// means the contact was handled (a projectile hitting something, a craft picking
    /// up an item) and the moving body passes through `other` for the rest of its move.
    ///
    /// This is asked from both sides; either may handle it.
    fn collided(&self, this: Collider<'_>, other: Collider<'_>, role: StateRole) -> bool {
        let _ = (this, other, role);
        false
    }

    /// Called after two bodies have exchanged momentum.
    fn bodies_collided(&mut self, mover: BodyId, struck: BodyId, role: StateRole) {
        let _ = (mover, struck, role);
    }
}

/// [`ContactRules`] with no game-specific behavior.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct DefaultContactRules;

impl ContactRules for DefaultContactRules {}

/// Aggregate data returned by [`Space::step`]. The exact contents of this structure
/// are unstable; use only `Debug` formatting to examine its contents unless you have
/// a specific need for one of the values.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct SpaceStepInfo {
    /// Number of bodies stepped.
    pub bodies: usize,
    /// Total straight-line distance moved by all bodies.
    pub distance: FreeCoordinate,
    /// Total collisions resolved.
    pub attempts: usize,
    /// Number of bodies stopped because they could make no progress.
    pub stalled: usize,
    /// Number of bodies reverted to their last synchronized state.
    pub reverted: usize,
}

impl ops::AddAssign<SpaceStepInfo> for SpaceStepInfo {
    fn add_assign(&mut self, other: Self) {
        self.bodies += other.bodies;
        self.distance += other.distance;
        self.attempts += other.attempts;
        self.stalled += other.stalled;
        self.reverted += other.reverted;
    }
}

/// Container of [`DynamicBody`]s and [`Obstacle`]s, which advances the bodies through
/// time.
///
/// Bodies are stepped in the order they were added.
#[derive(Debug)]
pub struct Space {
    side: Side,
    bodies: BTreeMap<BodyId, DynamicBody>,
    obstacles: BTreeMap<ObstacleId, Obstacle>,
    next_body: u32,
    next_obstacle: u32,
    rules: Box<dyn ContactRules>,
}

impl Space {
    /// Constructs an empty [`Space`] using [`DefaultContactRules`].
    pub fn new(side: Side) -> Self {
        Self::with_rules(side, Box::new(DefaultContactRules))
    }

    /// Constructs an empty [`Space`] using the given rules.
    pub fn with_rules(side: Side, rules: Box<dyn ContactRules>) -> Self {
        Self {
            side,
            bodies: BTreeMap::new(),
            obstacles: BTreeMap::new(),
            next_body: 0,
            next_obstacle: 0,
            rules,
        }
    }

    /// Which end of the connection this space simulates.
    pub fn side(&self) -> Side {
        self.side
    }

    /// The contact rules in use.
    pub fn rules(&self) -> &dyn ContactRules {
        &*self.rules
    }

    /// Replaces the contact rules.
    pub fn set_rules(&mut self, rules: Box<dyn ContactRules>) {
        self.rules = rules;
    }

    /// The contact rules in use, mutably.
    pub fn rules_mut(&mut self) -> &mut dyn ContactRules {
        &mut *self.rules
    }

    /// Adds a body and returns its id. It is scheduled to be announced to peers.
    pub fn add_body(&mut self, body: DynamicBody) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.insert(id, body);
        id
    }

    /// Removes a body, returning it if it existed.
    pub fn remove_body(&mut self, id: BodyId) -> Option<DynamicBody> {
        let removed = self.bodies.remove(&id);
        if removed.is_none() {
            log::trace!("remove_body: no body {id:?}");
        }
        removed
    }

    #[allow(missing_docs)]
    pub fn body(&self, id: BodyId) -> Option<&DynamicBody> {
        self.bodies.get(&id)
    }

    #[allow(missing_docs)]
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut DynamicBody> {
        self.bodies.get_mut(&id)
    }

    /// Iterates over all bodies in stepping order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &DynamicBody)> + '_ {
        self.bodies.iter().map(|(&id, body)| (id, body))
    }

    /// Adds an obstacle and returns its id.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> ObstacleId {
        let id = ObstacleId(self.next_obstacle);
        self.next_obstacle += 1;
        self.obstacles.insert(id, obstacle);
        id
    }

    /// Removes an obstacle, returning it if it existed.
    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        self.obstacles.remove(&id)
    }

    #[allow(missing_docs)]
    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    /// Includes or excludes a collider from collision detection. Returns false if it
    /// does not exist.
    pub fn set_collision_enabled(&mut self, id: ColliderId, enabled: bool) -> bool {
        let flag = match id {
            ColliderId::Body(id) => self.bodies.get_mut(&id).map(|b| &mut b.collision_enabled),
            ColliderId::Obstacle(id) => self
                .obstacles
                .get_mut(&id)
                .map(|o| &mut o.collision_enabled),
        };
        match flag {
            Some(flag) => {
                *flag = enabled;
                true
            }
            None => {
                log::trace!("set_collision_enabled: no collider {id:?}");
                false
            }
        }
    }

    /// Moves a body instantly to `position`, as for a teleport or respawn. Peers will
    /// jump rather than glide. Returns false if the body does not exist.
    pub fn warp_body(&mut self, id: BodyId, position: FreePoint) -> bool {
        let Some(body) = self.bodies.get_mut(&id) else {
            log::trace!("warp_body: no body {id:?}");
            return false;
        };
        body.set_position(StateRole::Actual, position);
        body.copy_state(StateRole::Actual, StateRole::Render);
        body.sync.mark(UpdateMask::POSITION | UpdateMask::WARP);
        true
    }

    /// Advances every body by one tick.
    ///
    /// On the authority, each body's zone membership is checked against `zones` before
    /// it moves, and changes are reported to `sink`. Peers do not track zones.
    pub fn step(
        &mut self,
        tick: Tick,
        zones: &dyn ZoneCatalog,
        sink: &mut dyn ZoneEventSink,
    ) -> SpaceStepInfo {
        let mut info = SpaceStepInfo::default();
        if tick.paused() {
            return info;
        }
        let dt = tick.delta_t_f64();

        for body in self.bodies.values_mut() {
            body.hit_budget = HIT_BUDGET;
        }

        let ids: Vec<BodyId> = self.bodies.keys().copied().collect();
        for id in ids {
            if self.side == Side::Authority {
                let Some(body) = self.bodies.get_mut(&id) else {
                    continue;
                };
                let position = body.position(StateRole::Actual);
                body.zones.update(id, position, zones, sink);
            }

            let move_info = move_body(self, id, dt, StateRole::Actual, None);
            info.bodies += 1;
            info.distance += move_info.distance;
            info.attempts += move_info.attempts;
            info.stalled += usize::from(move_info.stalled);

            let Some(body) = self.bodies.get_mut(&id) else {
                continue;
            };
            match self.side {
                Side::Authority => authority_tick(body, dt),
                Side::Peer => info.reverted += usize::from(peer_tick(body, dt)),
            }
        }
        info
    }

    /// Advances every body's render state by one display frame. Returns the number of
    /// bodies still gliding toward their actual state.
    pub fn interpolate_frame(&mut self, frame_time: Duration) -> usize {
        self.bodies
            .values_mut()
            .map(|body| update_interpolation(body, frame_time))
            .filter(|&result| result == Interpolation::Gliding)
            .count()
    }

    /// Whether the body has changes to send to peers.
    pub fn has_pending_update(&self, id: BodyId) -> bool {
        self.bodies
            .get(&id)
            .is_some_and(|body| !body.sync.pending().is_empty())
    }

    /// Writes an update for the body's pending changes, and clears them. Returns the
    /// parts written, or [`None`] if the body does not exist.
    pub fn write_update(&mut self, id: BodyId, writer: &mut BitWriter) -> Option<UpdateMask> {
        let Some(body) = self.bodies.get_mut(&id) else {
            log::trace!("write_update: no body {id:?}");
            return None;
        };
        let mask = body.sync.take_pending();
        BodyUpdate::from_body(body, mask).write(writer);
        Some(mask)
    }

    /// Reads an update written by [`Space::write_update()`] and applies it to the body.
    ///
    /// Unless the update is a warp, the body's render state is left where it was to
    /// glide toward the new state, and the actual state is advanced by `one_way_time`
    /// to account for the update's age.
    ///
    /// Returns whether the body exists. The update is fully decoded before anything is
    /// changed, so a decoding error leaves the body untouched.
    pub fn receive_update(
        &mut self,
        id: BodyId,
        reader: &mut BitReader<'_>,
        one_way_time: Duration,
    ) -> Result<bool, DecodeError> {
        let update = BodyUpdate::read(reader)?;
        let Some(body) = self.bodies.get_mut(&id) else {
            log::trace!("receive_update: no body {id:?}");
            return Ok(false);
        };

        if let Some(item_id) = update.item_id {
            body.item_id = item_id;
        }
        let Some(position_update) = update.position else {
            return Ok(true);
        };

        if update.item_id.is_some() {
            // First sighting: there is no meaningful render position to glide from.
            body.set_position(StateRole::Render, position_update.position);
        }
        body.set_position(StateRole::Actual, position_update.position);
        body.set_velocity(StateRole::Actual, position_update.velocity);

        if position_update.snap {
            body.interpolating = false;
            body.copy_state(StateRole::Actual, StateRole::Render);
        } else {
            body.interpolating = true;
            move_body(
                self,
                id,
                one_way_time.as_secs_f64(),
                StateRole::Actual,
                None,
            );
        }

        if let Some(body) = self.bodies.get_mut(&id) {
            body.copy_state(StateRole::Actual, StateRole::LastSynced);
            let velocity = body.velocity(StateRole::Actual);
            body.sync.note_received(velocity);
        }
        Ok(true)
    }
}

impl SpatialQuery for Space {
    fn query_region(&self, region: Rect, out: &mut Vec<ColliderId>) {
        out.extend(
            self.obstacles
                .iter()
                .filter(|(_, obstacle)| obstacle.bounds.intersects(region))
                .map(|(&id, _)| ColliderId::Obstacle(id)),
        );
        out.extend(
            self.bodies
                .iter()
                .filter(|(_, body)| body.extent().intersects(region))
                .map(|(&id, _)| ColliderId::Body(id)),
        );
    }

    fn collider(&self, id: ColliderId) -> Option<Collider<'_>> {
        match id {
            ColliderId::Body(id) => self.bodies.get(&id).map(|body| Collider::Body(id, body)),
            ColliderId::Obstacle(id) => self
                .obstacles
                .get(&id)
                .map(|obstacle| Collider::Obstacle(id, obstacle)),
        }
    }

    fn collision_enabled(&self, id: ColliderId) -> bool {
        match id {
            ColliderId::Body(id) => self.bodies.get(&id).is_some_and(|b| b.collision_enabled),
            ColliderId::Obstacle(id) => self
                .obstacles
                .get(&id)
                .is_some_and(|o| o.collision_enabled),
        }
    }
}
