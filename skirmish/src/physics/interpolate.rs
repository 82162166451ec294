use crate::math::FreeCoordinate;
use crate::physics::{DynamicBody, StateRole};
use crate::time::Duration;

/// Speed, in units per second, that the render state may always reach while catching
/// up to the actual state. It may go faster if the actual state is itself faster.
pub const INTERPOLATION_MAX_SPEED: FreeCoordinate = 900.0;

/// Maximum acceleration, in units per second squared, of the render state while
/// catching up to the actual state.
pub const INTERPOLATION_ACCELERATION: FreeCoordinate = 1800.0;

/// Result of [`update_interpolation()`].
#[expect(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Interpolation {
    /// The render state now equals the actual state.
    Completed,
    /// The render state moved toward the actual state but has not reached it.
    Gliding,
}

/// Advances the body's render state by one display frame of length `frame_time`.
///
/// If the body is interpolating, the render state glides toward the actual state,
/// limited to [`INTERPOLATION_MAX_SPEED`] and [`INTERPOLATION_ACCELERATION`], until it
/// would reach it within a frame, whereupon it snaps to the actual state. The render
/// state never passes the actual state.
pub fn update_interpolation(body: &mut DynamicBody, frame_time: Duration) -> Interpolation {
    body.set_heading(StateRole::Render, body.heading(StateRole::Actual));
    if !body.interpolating {
        return finish(body);
    }

    let offset = body.position(StateRole::Actual) - body.position(StateRole::Render);
    let distance = offset.length();
    if distance == 0.0 {
        return finish(body);
    }
    let direction = offset / distance;

    let time = frame_time.as_secs_f64();
    if time <= 0.0 {
        return Interpolation::Gliding;
    }

    let actual_velocity = body.velocity(StateRole::Actual);
    let mut render_speed = direction
        .dot(body.velocity(StateRole::Render))
        .max(direction.dot(actual_velocity))
        .max(0.0);
    if render_speed * time > distance {
        return finish(body);
    }

    // `clamped` records whether either limit changed the naive "arrive this frame" motion.
    let mut clamped = false;
    let max_speed = INTERPOLATION_MAX_SPEED.max(actual_velocity.length());
    let mut requested_speed = distance / time;
    if requested_speed > max_speed {
        clamped = true;
        requested_speed = max_speed;
    }
    let mut acceleration = (requested_speed - render_speed) / time;
    if acceleration > INTERPOLATION_ACCELERATION {
        clamped = true;
        acceleration = INTERPOLATION_ACCELERATION;
    }
    if !clamped {
        return finish(body);
    }

    render_speed += acceleration * time;
    let render_velocity = direction * render_speed;
    body.set_velocity(StateRole::Render, render_velocity);
    body.set_position(
        StateRole::Render,
        body.position(StateRole::Render) + render_velocity * time,
    );
    Interpolation::Gliding
}

fn finish(body: &mut DynamicBody) -> Interpolation {
    body.interpolating = false;
    body.copy_state(StateRole::Actual, StateRole::Render);
    Interpolation::Completed
}
