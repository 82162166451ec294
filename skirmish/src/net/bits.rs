use bitvec::prelude::{BitSlice, BitVec, Msb0};

/// Error from reading a bit stream that does not contain what was expected.
#[derive(Clone, Copy, Debug, displaydoc::Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum DecodeError {
    /// stream ended early: {needed} bits needed, {remaining} remaining
    Truncated {
        /// Number of bits the read required.
        needed: usize,
        /// Number of bits that were left in the stream.
        remaining: usize,
    },
    /// value {value} is out of range (maximum {max})
    OutOfRange {
        /// The value decoded.
        value: u64,
        /// The largest permitted value.
        max: u64,
    },
}

impl std::error::Error for DecodeError {}

/// Number of bits needed to store any value in `0 ..= span`.
pub const fn bits_for_range(span: u32) -> u32 {
    u32::BITS - span.leading_zeros()
}

/// Appends values to a bit stream, most significant bit first.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    /// Constructs an empty [`BitWriter`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Writes one bit, and returns it so that the caller can branch on what was written.
    pub fn write_flag(&mut self, flag: bool) -> bool {
        self.bits.push(flag);
        flag
    }

    /// Writes the low `count` bits of `value`.
    ///
    /// Panics if `count` is greater than 32.
    #[track_caller]
    pub fn write_bits(&mut self, value: u32, count: u32) {
        assert!(count <= u32::BITS, "cannot write {count} bits of a u32");
        for shift in (0..count).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
    }

    /// Writes `value`, clamped to `min ..= max`, using only as many bits as that range
    /// needs.
    pub fn write_ranged_u32(&mut self, value: u32, min: u32, max: u32) {
        debug_assert!(min <= max);
        let value = value.clamp(min, max);
        self.write_bits(value - min, bits_for_range(max - min));
    }

    /// Writes the bits of `value` unchanged.
    pub fn write_f32(&mut self, value: f32) {
        self.write_bits(value.to_bits(), u32::BITS);
    }

    /// Writes `value`, clamped to `-1.0 ..= 1.0`, quantized to `bit_count` bits.
    ///
    /// The number of steps is even, so 0.0 is represented exactly.
    pub fn write_signed_float(&mut self, value: f64, bit_count: u32) {
        let steps = signed_float_steps(bit_count);
        let normalized = (value.clamp(-1.0, 1.0) + 1.0) / 2.0;
        // `as` maps NaN to zero.
        let quantized = (normalized * f64::from(steps)).round() as u32;
        self.write_bits(quantized.min(steps), bit_count);
    }

    /// Finishes writing and returns the bytes, padded with zero bits.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bits = self.bits;
        bits.set_uninitialized(false);
        bits.into_vec()
    }
}

/// Reads values written by [`BitWriter`].
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    cursor: usize,
}

impl<'a> BitReader<'a> {
    /// Constructs a reader positioned at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bits: BitSlice::from_slice(bytes),
            cursor: 0,
        }
    }

    /// Number of bits not yet read, including any padding.
    pub fn remaining(&self) -> usize {
        self.bits.len() - self.cursor
    }

    fn take(&mut self, count: usize) -> Result<&'a BitSlice<u8, Msb0>, DecodeError> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(DecodeError::Truncated {
                needed: count,
                remaining,
            });
        }
        let bits = self.bits;
        let taken = &bits[self.cursor..self.cursor + count];
        self.cursor += count;
        Ok(taken)
    }

    /// Reads one bit.
    pub fn read_flag(&mut self) -> Result<bool, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Reads `count` bits as an unsigned integer.
    ///
    /// Panics if `count` is greater than 32.
    #[track_caller]
    pub fn read_bits(&mut self, count: u32) -> Result<u32, DecodeError> {
        assert!(count <= u32::BITS, "cannot read {count} bits into a u32");
        Ok(self
            .take(count as usize)?
            .iter()
            .by_vals()
            .fold(0, |value, bit| (value << 1) | u32::from(bit)))
    }

    /// Reads a value written by [`BitWriter::write_ranged_u32()`] with the same range.
    pub fn read_ranged_u32(&mut self, min: u32, max: u32) -> Result<u32, DecodeError> {
        let raw = self.read_bits(bits_for_range(max.saturating_sub(min)))?;
        match min.checked_add(raw) {
            Some(value) if value <= max => Ok(value),
            _ => Err(DecodeError::OutOfRange {
                value: u64::from(min) + u64::from(raw),
                max: u64::from(max),
            }),
        }
    }

    /// Reads a value written by [`BitWriter::write_f32()`].
    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_bits(u32::BITS)?))
    }

    /// Reads a value written by [`BitWriter::write_signed_float()`] with the same
    /// number of bits.
    pub fn read_signed_float(&mut self, bit_count: u32) -> Result<f64, DecodeError> {
        let steps = signed_float_steps(bit_count);
        let quantized = self.read_bits(bit_count)?;
        if quantized > steps {
            return Err(DecodeError::OutOfRange {
                value: u64::from(quantized),
                max: u64::from(steps),
            });
        }
        Ok(f64::from(quantized) / f64::from(steps) * 2.0 - 1.0)
    }
}

/// Largest quantized value of a signed float of `bit_count` bits. It is even, so
/// that the midpoint, which stands for zero, is a whole step.
pub(crate) fn signed_float_steps(bit_count: u32) -> u32 {
    (u32::MAX >> (u32::BITS - bit_count.clamp(2, u32::BITS))) - 1
}
