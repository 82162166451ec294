use std::cell::RefCell;
use std::rc::Rc;

use euclid::{point2, vec2};
use pretty_assertions::assert_eq;

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::net::{
    BitReader, BitWriter, BodyUpdate, PositionUpdate, REVERT_TIME_AT_REST, REVERT_TIME_MOVING,
    UpdateMask,
};
use crate::physics::{ColliderId, DynamicBody, StateRole, move_body};
use crate::space::{BodyId, ContactRules, Side, Space, SpaceStepInfo};
use crate::time::{Duration, Tick};
use crate::zone::{ZoneEvent, ZoneId, ZoneMap};

fn body_at(x: FreeCoordinate, y: FreeCoordinate) -> DynamicBody {
    DynamicBody::new(point2(x, y), 10.0, 1.0)
}

fn step(space: &mut Space, tick: Tick) -> SpaceStepInfo {
    space.step(tick, &ZoneMap::new(), &mut Vec::<ZoneEvent>::new())
}

fn encode(update: BodyUpdate) -> Vec<u8> {
    let mut writer = BitWriter::new();
    update.write(&mut writer);
    writer.into_bytes()
}

fn position_update(position: FreePoint, velocity: FreeVector, snap: bool) -> BodyUpdate {
    BodyUpdate {
        item_id: None,
        position: Some(PositionUpdate {
            position,
            velocity,
            snap,
        }),
    }
}

fn receive(space: &mut Space, id: BodyId, update: BodyUpdate, one_way_time: Duration) {
    let bytes = encode(update);
    assert_eq!(
        space.receive_update(id, &mut BitReader::new(&bytes), one_way_time),
        Ok(true)
    );
}

#[test]
fn paused_tick_changes_nothing() {
    let mut space = Space::new(Side::Authority);
    let id = space.add_body(body_at(0.0, 0.0).with_velocity(vec2(100.0, 0.0)));
    let before = space.body(id).unwrap().clone();

    let info = step(&mut space, Tick::from_millis(16).pause());

    assert_eq!(info, SpaceStepInfo::default());
    assert_eq!(space.body(id).unwrap(), &before);
}

#[test]
fn step_reports_motion() {
    let mut space = Space::new(Side::Authority);
    space.add_body(body_at(0.0, 0.0).with_velocity(vec2(100.0, 0.0)));
    space.add_body(body_at(500.0, 0.0));

    let info = step(&mut space, Tick::from_millis(100));

    assert_eq!(info.bodies, 2);
    assert!((info.distance - 10.0).abs() < 1e-9, "{info:?}");
    assert_eq!(info.attempts, 1);
}

#[test]
fn step_info_accumulates() {
    let mut total = SpaceStepInfo::default();
    let one = SpaceStepInfo {
        bodies: 2,
        distance: 1.5,
        attempts: 3,
        stalled: 0,
        reverted: 1,
    };
    total += one;
    total += one;
    assert_eq!(
        total,
        SpaceStepInfo {
            bodies: 4,
            distance: 3.0,
            attempts: 6,
            stalled: 0,
            reverted: 2,
        }
    );
}

#[test]
fn authority_renders_actual_state() {
    let mut space = Space::new(Side::Authority);
    let id = space.add_body(body_at(0.0, 0.0).with_velocity(vec2(100.0, 0.0)));

    step(&mut space, Tick::from_millis(500));

    let body = space.body(id).unwrap();
    assert_eq!(body.position(StateRole::Render), point2(50.0, 0.0));
    assert_eq!(body.position(StateRole::Actual), point2(50.0, 0.0));
}

fn zone_fixture(side: Side) -> (Space, BodyId, ZoneMap, ZoneId) {
    let mut space = Space::new(side);
    let id = space.add_body(body_at(50.0, 0.0).with_velocity(vec2(100.0, 0.0)));
    let mut zones = ZoneMap::new();
    let zone = zones
        .add(vec![
            point2(100.0, -50.0),
            point2(200.0, -50.0),
            point2(200.0, 50.0),
            point2(100.0, 50.0),
        ])
        .unwrap();
    (space, id, zones, zone)
}

#[test]
fn zone_events_follow_the_body() {
    let (mut space, id, zones, zone) = zone_fixture(Side::Authority);
    let mut events = Vec::new();

    // Zones are checked at each tick's starting position: 50, then 150, then 250.
    space.step(Tick::from_millis(1000), &zones, &mut events);
    assert_eq!(events, vec![]);
    space.step(Tick::from_millis(1000), &zones, &mut events);
    assert_eq!(events, vec![ZoneEvent::Entered(id, zone)]);
    assert!(space.body(id).unwrap().zones().current().contains(&zone));
    space.step(Tick::from_millis(1000), &zones, &mut events);
    assert_eq!(
        events,
        vec![ZoneEvent::Entered(id, zone), ZoneEvent::Left(id, zone)]
    );
}

#[test]
fn removed_zone_is_not_reported_as_left() {
    let (mut space, id, mut zones, zone) = zone_fixture(Side::Authority);
    let mut events = Vec::new();
    space.step(Tick::from_millis(1000), &zones, &mut events);
    space.step(Tick::from_millis(1000), &zones, &mut events);
    assert_eq!(events, vec![ZoneEvent::Entered(id, zone)]);

    assert!(zones.remove(zone));
    space.step(Tick::from_millis(1000), &zones, &mut events);
    assert_eq!(events, vec![ZoneEvent::Entered(id, zone)]);
}

#[test]
fn peers_do_not_track_zones() {
    let (mut space, _, zones, _) = zone_fixture(Side::Peer);
    let mut events = Vec::new();
    for _ in 0..3 {
        space.step(Tick::from_millis(1000), &zones, &mut events);
    }
    assert_eq!(events, vec![]);
}

#[test]
fn new_body_announces_itself_once() {
    let mut space = Space::new(Side::Authority);
    let id = space.add_body(body_at(0.0, 0.0));
    assert!(space.has_pending_update(id));

    let mask = space.write_update(id, &mut BitWriter::new());
    assert_eq!(
        mask,
        Some(UpdateMask::INITIAL | UpdateMask::POSITION | UpdateMask::WARP)
    );
    assert!(!space.has_pending_update(id));

    // A body at rest has nothing further to say.
    for _ in 0..10 {
        step(&mut space, Tick::from_millis(16));
    }
    assert!(!space.has_pending_update(id));
}

#[test]
fn moving_body_resends_on_a_timer() {
    let mut space = Space::new(Side::Authority);
    let id = space.add_body(body_at(0.0, 0.0));
    space.write_update(id, &mut BitWriter::new());

    space.body_mut(id).unwrap().set_actual_velocity(vec2(50.0, 0.0));
    assert_eq!(
        space.write_update(id, &mut BitWriter::new()),
        Some(UpdateMask::POSITION)
    );

    // The timer starts expired, so the first tick in motion sends.
    step(&mut space, Tick::from_millis(16));
    assert_eq!(
        space.write_update(id, &mut BitWriter::new()),
        Some(UpdateMask::POSITION)
    );

    // Then it counts down by (50 + 20) * 0.016 = 1.12 per tick from 100.
    for _ in 0..89 {
        step(&mut space, Tick::from_millis(16));
        assert!(!space.has_pending_update(id));
    }
    step(&mut space, Tick::from_millis(16));
    assert!(space.has_pending_update(id));
}

#[test]
fn collision_on_authority_schedules_update() {
    let mut space = Space::new(Side::Authority);
    let a = space.add_body(body_at(0.0, 0.0).with_velocity(vec2(100.0, 0.0)));
    let b = space.add_body(body_at(21.0, 0.0));
    for id in [a, b] {
        space.write_update(id, &mut BitWriter::new());
    }

    step(&mut space, Tick::from_millis(16));

    // Both are moving after the contact, and neither has sent anything while moving.
    assert!(space.has_pending_update(a));
    assert!(space.has_pending_update(b));
    assert!(!space.body(b).unwrap().sync().waiting_for_sync());
}

#[test]
fn warp_snaps_everywhere() {
    let mut space = Space::new(Side::Authority);
    let id = space.add_body(body_at(0.0, 0.0));
    space.write_update(id, &mut BitWriter::new());

    assert!(space.warp_body(id, point2(300.0, -40.0)));

    let body = space.body(id).unwrap();
    assert_eq!(body.position(StateRole::Actual), point2(300.0, -40.0));
    assert_eq!(body.position(StateRole::Render), point2(300.0, -40.0));
    assert_eq!(
        body.sync().pending(),
        UpdateMask::POSITION | UpdateMask::WARP
    );
}

#[test]
fn first_update_places_render_state() {
    let mut authority = Space::new(Side::Authority);
    let source = authority.add_body(body_at(100.0, 50.0));
    authority.body_mut(source).unwrap().item_id = 7;
    let mut writer = BitWriter::new();
    authority.write_update(source, &mut writer);
    let bytes = writer.into_bytes();

    let mut peer = Space::new(Side::Peer);
    let id = peer.add_body(body_at(0.0, 0.0));
    assert_eq!(
        peer.receive_update(id, &mut BitReader::new(&bytes), Duration::ZERO),
        Ok(true)
    );

    let body = peer.body(id).unwrap();
    assert_eq!(body.item_id, 7);
    for role in StateRole::ALL {
        assert_eq!(body.position(role), point2(100.0, 50.0), "{role:?}");
    }
    assert!(!body.is_interpolating());
}

#[test]
fn first_update_without_warp_still_starts_at_the_new_position() {
    let mut space = Space::new(Side::Peer);
    let id = space.add_body(body_at(0.0, 0.0));
    let update = BodyUpdate {
        item_id: Some(3),
        ..position_update(point2(100.0, 50.0), vec2(0.0, 0.0), false)
    };

    receive(&mut space, id, update, Duration::ZERO);

    let body = space.body(id).unwrap();
    assert_eq!(body.position(StateRole::Render), point2(100.0, 50.0));
    assert_eq!(body.position(StateRole::Actual), point2(100.0, 50.0));
}

#[test]
fn update_glides_render_state() {
    let mut space = Space::new(Side::Peer);
    let id = space.add_body(body_at(0.0, 0.0));

    receive(
        &mut space,
        id,
        position_update(point2(64.0, 0.0), vec2(0.0, 0.0), false),
        Duration::ZERO,
    );

    let body = space.body(id).unwrap();
    assert_eq!(body.position(StateRole::Render), point2(0.0, 0.0));
    assert_eq!(body.position(StateRole::Actual), point2(64.0, 0.0));
    assert_eq!(body.position(StateRole::LastSynced), point2(64.0, 0.0));
    assert!(body.is_interpolating());
    assert_eq!(body.sync().update_timer(), REVERT_TIME_AT_REST);

    let mut frames = 0;
    while space.interpolate_frame(Duration::from_millis(16)) > 0 {
        frames += 1;
        assert!(frames < 1000, "interpolation did not converge");
    }
    let body = space.body(id).unwrap();
    assert_eq!(body.position(StateRole::Render), point2(64.0, 0.0));
    assert!(!body.is_interpolating());
}

#[test]
fn warp_update_snaps_render_state() {
    let mut space = Space::new(Side::Peer);
    let id = space.add_body(body_at(0.0, 0.0));

    receive(
        &mut space,
        id,
        position_update(point2(64.0, 0.0), vec2(0.0, 0.0), true),
        Duration::ZERO,
    );

    let body = space.body(id).unwrap();
    assert_eq!(body.position(StateRole::Render), point2(64.0, 0.0));
    assert!(!body.is_interpolating());
    assert_eq!(space.interpolate_frame(Duration::from_millis(16)), 0);
}

#[test]
fn repeated_warp_update_changes_nothing() {
    let mut space = Space::new(Side::Peer);
    let id = space.add_body(body_at(0.0, 0.0));
    space.body_mut(id).unwrap().set_heading(StateRole::Actual, 0.75);
    let update = position_update(point2(64.0, -32.0), vec2(40.0, 30.0), true);

    let mut previous: Option<DynamicBody> = None;
    for _ in 0..2 {
        receive(&mut space, id, update, Duration::ZERO);

        let body = space.body(id).unwrap();
        assert_eq!(
            body.position(StateRole::Render),
            body.position(StateRole::Actual)
        );
        assert_eq!(
            body.velocity(StateRole::Render),
            body.velocity(StateRole::Actual)
        );
        assert_eq!(
            body.heading(StateRole::Render),
            body.heading(StateRole::Actual)
        );
        assert_ne!(body.velocity(StateRole::Render), vec2(0.0, 0.0));
        if let Some(previous) = &previous {
            assert_eq!(body, previous);
        }
        previous = Some(body.clone());
    }
}

#[test]
fn update_is_advanced_by_its_age() {
    let mut space = Space::new(Side::Peer);
    let id = space.add_body(body_at(0.0, 0.0));

    receive(
        &mut space,
        id,
        position_update(point2(0.0, 0.0), vec2(32.0, 0.0), false),
        Duration::from_millis(250),
    );

    let body = space.body(id).unwrap();
    let actual = body.position(StateRole::Actual);
    assert!((actual - point2(8.0, 0.0)).length() < 0.01, "{actual:?}");
    assert_eq!(body.position(StateRole::LastSynced), actual);
    assert_eq!(body.sync().update_timer(), REVERT_TIME_MOVING);
}

#[test]
fn truncated_update_leaves_body_untouched() {
    let mut space = Space::new(Side::Peer);
    let id = space.add_body(body_at(0.0, 0.0));
    let before = space.body(id).unwrap().clone();

    let mut bytes = encode(position_update(point2(64.0, 0.0), vec2(10.0, 0.0), false));
    bytes.truncate(2);

    assert!(
        space
            .receive_update(id, &mut BitReader::new(&bytes), Duration::ZERO)
            .is_err()
    );
    assert_eq!(space.body(id).unwrap(), &before);
}

/// A peer predicts B being struck, the authority never confirms, and B goes back.
#[test]
fn unconfirmed_prediction_reverts() {
    let mut space = Space::new(Side::Peer);
    let a = space.add_body(body_at(0.0, 0.0).with_velocity(vec2(100.0, 0.0)));
    let b = space.add_body(body_at(0.0, 0.0));
    receive(
        &mut space,
        b,
        position_update(point2(50.0, 0.0), vec2(0.0, 0.0), true),
        Duration::ZERO,
    );
    assert_eq!(space.body(b).unwrap().sync().update_timer(), REVERT_TIME_AT_REST);

    // Contact at 0.3 s.
    let info = step(&mut space, Tick::from_millis(400));
    assert_eq!(info.reverted, 0);
    let body = space.body(b).unwrap();
    assert!(body.sync().waiting_for_sync());
    assert!(body.position(StateRole::Actual).x > 50.0);

    let info = step(&mut space, Tick::from_millis(400));
    assert_eq!(info.reverted, 1);
    let body = space.body(b).unwrap();
    assert!(!body.sync().waiting_for_sync());
    assert_eq!(body.position(StateRole::Actual), point2(50.0, 0.0));
    assert_eq!(body.velocity(StateRole::Actual), vec2(0.0, 0.0));

    // The mover's own prediction stands.
    assert!(!space.body(a).unwrap().sync().waiting_for_sync());
}

#[test]
fn confirmed_prediction_is_kept() {
    let mut space = Space::new(Side::Peer);
    space.add_body(body_at(0.0, 0.0).with_velocity(vec2(100.0, 0.0)));
    let b = space.add_body(body_at(50.0, 0.0));
    receive(
        &mut space,
        b,
        position_update(point2(50.0, 0.0), vec2(0.0, 0.0), true),
        Duration::ZERO,
    );

    step(&mut space, Tick::from_millis(400));
    assert!(space.body(b).unwrap().sync().waiting_for_sync());

    receive(
        &mut space,
        b,
        position_update(point2(80.0, 0.0), vec2(95.0, 0.0), false),
        Duration::ZERO,
    );
    assert!(!space.body(b).unwrap().sync().waiting_for_sync());

    let info = step(&mut space, Tick::from_millis(400));
    assert_eq!(info.reverted, 0);
}

#[derive(Debug)]
struct RecordCollisions(Rc<RefCell<Vec<(BodyId, BodyId)>>>);

impl ContactRules for RecordCollisions {
    fn bodies_collided(&mut self, mover: BodyId, struck: BodyId, _: StateRole) {
        self.0.borrow_mut().push((mover, struck));
    }
}

#[test]
fn rules_hear_about_body_collisions() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut space = Space::with_rules(
        Side::Authority,
        Box::new(RecordCollisions(Rc::clone(&log))),
    );
    let a = space.add_body(body_at(0.0, 0.0).with_velocity(vec2(100.0, 0.0)));
    let b = space.add_body(body_at(50.0, 0.0));

    move_body(&mut space, a, 0.75, StateRole::Actual, None);

    assert_eq!(*log.borrow(), vec![(a, b)]);
}

#[test]
fn non_collideable_bodies_pass_each_other() {
    let mut space = Space::new(Side::Authority);
    let a = space.add_body(body_at(0.0, 0.0).with_velocity(vec2(100.0, 0.0)));
    let mut ghost = body_at(50.0, 0.0);
    ghost.collideable = false;
    let b = space.add_body(ghost);

    move_body(&mut space, a, 1.0, StateRole::Actual, None);

    assert_eq!(space.body(a).unwrap().position(StateRole::Actual), point2(100.0, 0.0));
    assert_eq!(space.body(b).unwrap().velocity(StateRole::Actual), vec2(0.0, 0.0));
}

#[test]
fn missing_ids_are_ignored() {
    let mut space = Space::new(Side::Peer);
    let id = space.add_body(body_at(0.0, 0.0));
    assert!(space.remove_body(id).is_some());

    assert!(space.remove_body(id).is_none());
    assert!(!space.warp_body(id, point2(1.0, 1.0)));
    assert!(!space.has_pending_update(id));
    assert_eq!(space.write_update(id, &mut BitWriter::new()), None);
    assert!(!space.set_collision_enabled(ColliderId::Body(id), false));
    assert_eq!(
        move_body(&mut space, id, 1.0, StateRole::Actual, None).attempts,
        0
    );

    let bytes = encode(position_update(point2(1.0, 1.0), vec2(0.0, 0.0), false));
    assert_eq!(
        space.receive_update(id, &mut BitReader::new(&bytes), Duration::ZERO),
        Ok(false)
    );
}

#[test]
fn interpolate_frame_counts_gliding_bodies() {
    let mut space = Space::new(Side::Peer);
    let near = space.add_body(body_at(0.0, 0.0));
    let far = space.add_body(body_at(0.0, 100.0));
    space.add_body(body_at(0.0, 200.0));

    receive(
        &mut space,
        near,
        position_update(point2(0.0625, 0.0), vec2(0.0, 0.0), false),
        Duration::ZERO,
    );
    receive(
        &mut space,
        far,
        position_update(point2(500.0, 100.0), vec2(0.0, 0.0), false),
        Duration::ZERO,
    );

    // The near one arrives within the first frame, and the third was never moved.
    assert_eq!(space.interpolate_frame(Duration::from_millis(16)), 1);
}
