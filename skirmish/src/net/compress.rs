//! Lossy encodings of positions and velocities.

use std::f64::consts::PI;

use crate::math::{FreeCoordinate, FreePoint, FreeVector, heading_vector};
use crate::net::{BitReader, BitWriter, DecodeError, signed_float_steps};

/// Magnitude of the largest coordinate that can be sent. Coordinates beyond it are
/// clamped.
pub const POSITION_LIMIT: FreeCoordinate = 1_048_576.0;

/// Number of quantization steps per unit of position.
pub const POSITION_RESOLUTION: FreeCoordinate = 16.0;

/// Largest speed, in units per second, sent in compressed form. Faster velocities
/// are sent as raw components.
pub const VELOCITY_SEND_MAX: u32 = 511;

/// Number of quantization steps per unit of speed.
const SPEED_RESOLUTION: FreeCoordinate = 4.0;

/// Bits used to send the direction of a velocity.
const DIRECTION_BITS: u32 = 12;

const POSITION_STEPS: u32 = (2.0 * POSITION_LIMIT * POSITION_RESOLUTION) as u32;
const SPEED_STEPS: u32 = VELOCITY_SEND_MAX * SPEED_RESOLUTION as u32;

fn write_coordinate(writer: &mut BitWriter, value: FreeCoordinate) {
    let shifted = (value.clamp(-POSITION_LIMIT, POSITION_LIMIT) + POSITION_LIMIT) * POSITION_RESOLUTION;
    // `as` maps NaN to zero.
    writer.write_ranged_u32(shifted.round() as u32, 0, POSITION_STEPS);
}

fn read_coordinate(reader: &mut BitReader<'_>) -> Result<FreeCoordinate, DecodeError> {
    let steps = reader.read_ranged_u32(0, POSITION_STEPS)?;
    Ok(f64::from(steps) / POSITION_RESOLUTION - POSITION_LIMIT)
}

/// Writes a position with a resolution of 1/16 unit.
pub fn write_compressed_point(writer: &mut BitWriter, point: FreePoint) {
    write_coordinate(writer, point.x);
    write_coordinate(writer, point.y);
}

/// Reads a position written by [`write_compressed_point()`].
pub fn read_compressed_point(reader: &mut BitReader<'_>) -> Result<FreePoint, DecodeError> {
    let x = read_coordinate(reader)?;
    let y = read_coordinate(reader)?;
    Ok(FreePoint::new(x, y))
}

/// Writes a velocity as a direction and a speed of at most [`VELOCITY_SEND_MAX`],
/// with a resolution of 1/4 unit per second.
///
/// Velocities that round to zero speed are sent as exactly zero in a single bit.
/// Velocities faster than [`VELOCITY_SEND_MAX`] are sent as two `f32` components.
pub fn write_compressed_velocity(writer: &mut BitWriter, velocity: FreeVector) {
    let speed = velocity.length();
    let speed_steps = (speed.min(f64::from(VELOCITY_SEND_MAX)) * SPEED_RESOLUTION).round() as u32;
    if writer.write_flag(speed_steps == 0) {
        return;
    }
    if writer.write_flag(speed > f64::from(VELOCITY_SEND_MAX)) {
        writer.write_f32(velocity.x as f32);
        writer.write_f32(velocity.y as f32);
        return;
    }
    writer.write_signed_float(velocity.y.atan2(velocity.x) / PI, DIRECTION_BITS);
    writer.write_ranged_u32(speed_steps, 1, SPEED_STEPS);
}

/// Reads a velocity written by [`write_compressed_velocity()`].
pub fn read_compressed_velocity(reader: &mut BitReader<'_>) -> Result<FreeVector, DecodeError> {
    if reader.read_flag()? {
        return Ok(FreeVector::zero());
    }
    if reader.read_flag()? {
        let x = reader.read_f32()?;
        let y = reader.read_f32()?;
        return Ok(FreeVector::new(f64::from(x), f64::from(y)));
    }
    let direction = reader.read_signed_float(DIRECTION_BITS)? * PI;
    let speed = f64::from(reader.read_ranged_u32(1, SPEED_STEPS)?) / SPEED_RESOLUTION;
    Ok(heading_vector(direction) * speed)
}

/// Largest error that sending `velocity` through [`write_compressed_velocity()`] can
/// introduce, if its speed is within [`VELOCITY_SEND_MAX`]. Faster velocities lose
/// only `f32` precision.
pub fn velocity_tolerance(velocity: FreeVector) -> FreeCoordinate {
    let direction_steps = f64::from(signed_float_steps(DIRECTION_BITS));
    0.5 / SPEED_RESOLUTION + velocity.length() * PI / direction_steps
}
