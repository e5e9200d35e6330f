//! Hidden layers of one layer stack.

use std::io::{Read, Write};

use rand::Rng;

use super::aligned::{AlignedBuffer, CacheAligned};
use super::error::NetworkError;
use super::serialize::{read_into, write_from};
use super::{Value, L2, L3, OUTPUT_SCALE, WEIGHT_SCALE_BITS};

/// Round `n` up to a multiple of 32 (input row padding)
#[must_use]
pub const fn padded(n: usize) -> usize {
    n.div_ceil(32) * 32
}

const FC0_OUTPUTS: usize = L2 + 1;
const FC1_INPUTS: usize = L2 * 2;

/// Dense `IN -> OUT` layer with i8 weights and i32 biases.
///
/// Weights are stored row-major per output, each row padded to 32 inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineTransform<const IN: usize, const OUT: usize> {
    biases: AlignedBuffer<i32>,
    weights: AlignedBuffer<i8>,
}

impl<const IN: usize, const OUT: usize> AffineTransform<IN, OUT> {
    pub const PADDED_INPUT: usize = padded(IN);

    #[must_use]
    pub fn zeroed() -> Self {
        AffineTransform {
            biases: AlignedBuffer::zeroed(OUT),
            weights: AlignedBuffer::zeroed(OUT * Self::PADDED_INPUT),
        }
    }

    #[must_use]
    pub const fn hash_value(prev: u32) -> u32 {
        let mut hash = 0xCC03_DAE4u32.wrapping_add(OUT as u32);
        hash ^= prev >> 1;
        hash ^= prev << 31;
        hash
    }

    pub fn clear(&mut self) {
        self.biases.clear();
        self.weights.clear();
    }

    /// Padding columns stay zero
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for b in self.biases.iter_mut() {
            *b = rng.gen_range(-2048..=2048);
        }
        for (i, w) in self.weights.iter_mut().enumerate() {
            *w = if i % Self::PADDED_INPUT < IN {
                rng.gen_range(-16..=16)
            } else {
                0
            };
        }
    }

    pub(crate) fn read_parameters<R: Read>(&mut self, reader: &mut R) -> Result<(), NetworkError> {
        read_into(reader, &mut self.biases)?;
        read_into(reader, &mut self.weights)
    }

    pub(crate) fn write_parameters<W: Write>(&self, writer: &mut W) -> Result<(), NetworkError> {
        write_from(writer, &self.biases)?;
        write_from(writer, &self.weights)
    }

    #[inline]
    pub fn propagate(&self, input: &[u8], output: &mut [i32; OUT]) {
        let input = &input[..IN];
        for (j, out) in output.iter_mut().enumerate() {
            let row = &self.weights[j * Self::PADDED_INPUT..j * Self::PADDED_INPUT + IN];
            let dot: i32 = row
                .iter()
                .zip(input)
                .map(|(&w, &x)| i32::from(w) * i32::from(x))
                .sum();
            *out = self.biases[j].wrapping_add(dot);
        }
    }
}

#[must_use]
pub const fn clipped_relu_hash(prev: u32) -> u32 {
    0x538D_24C7u32.wrapping_add(prev)
}

#[inline]
fn clipped_relu(input: &[i32], output: &mut [u8]) {
    for (o, &x) in output.iter_mut().zip(input) {
        *o = (x >> WEIGHT_SCALE_BITS).clamp(0, 127) as u8;
    }
}

#[inline]
fn sqr_clipped_relu(input: &[i32], output: &mut [u8]) {
    for (o, &x) in output.iter_mut().zip(input) {
        let x = i64::from(x);
        *o = ((x * x) >> (2 * WEIGHT_SCALE_BITS + 7)).min(127) as u8;
    }
}

/// One bucket's sub-network:
/// `L1 -> 16`, `15 squared + 15 clipped -> 32`, `32 -> 1`, plus a skip
/// connection from the 16th output of the first layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerStack<const L1: usize> {
    fc0: AffineTransform<L1, FC0_OUTPUTS>,
    fc1: AffineTransform<FC1_INPUTS, L3>,
    fc2: AffineTransform<L3, 1>,
}

impl<const L1: usize> Default for LayerStack<L1> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const L1: usize> LayerStack<L1> {
    pub const HASH: u32 = Self::hash_value();

    #[must_use]
    pub fn zeroed() -> Self {
        LayerStack {
            fc0: AffineTransform::zeroed(),
            fc1: AffineTransform::zeroed(),
            fc2: AffineTransform::zeroed(),
        }
    }

    const fn hash_value() -> u32 {
        let mut hash = 0xEC42_E90Du32;
        hash ^= (L1 * 2) as u32;
        hash = AffineTransform::<L1, FC0_OUTPUTS>::hash_value(hash);
        hash = clipped_relu_hash(hash);
        hash = AffineTransform::<FC1_INPUTS, L3>::hash_value(hash);
        hash = clipped_relu_hash(hash);
        AffineTransform::<L3, 1>::hash_value(hash)
    }

    pub fn clear(&mut self) {
        self.fc0.clear();
        self.fc1.clear();
        self.fc2.clear();
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.fc0.randomize(rng);
        self.fc1.randomize(rng);
        self.fc2.randomize(rng);
    }

    pub(crate) fn read_parameters<R: Read>(&mut self, reader: &mut R) -> Result<(), NetworkError> {
        self.fc0.read_parameters(reader)?;
        self.fc1.read_parameters(reader)?;
        self.fc2.read_parameters(reader)
    }

    pub(crate) fn write_parameters<W: Write>(&self, writer: &mut W) -> Result<(), NetworkError> {
        self.fc0.write_parameters(writer)?;
        self.fc1.write_parameters(writer)?;
        self.fc2.write_parameters(writer)
    }

    /// Positional contribution of the transformed features, in raw
    /// (pre-`OUTPUT_SCALE`) units.
    #[must_use]
    pub fn propagate(&self, transformed: &[u8]) -> Value {
        let mut fc0_out = [0i32; FC0_OUTPUTS];
        self.fc0.propagate(transformed, &mut fc0_out);

        let mut ac0_out = CacheAligned([0u8; padded(FC1_INPUTS)]);
        sqr_clipped_relu(&fc0_out[..L2], &mut ac0_out[..L2]);
        clipped_relu(&fc0_out[..L2], &mut ac0_out[L2..FC1_INPUTS]);

        let mut fc1_out = [0i32; L3];
        self.fc1.propagate(&ac0_out[..], &mut fc1_out);

        let mut ac1_out = CacheAligned([0u8; padded(L3)]);
        clipped_relu(&fc1_out, &mut ac1_out[..L3]);

        let mut fc2_out = [0i32; 1];
        self.fc2.propagate(&ac1_out[..], &mut fc2_out);

        let forward = i64::from(fc0_out[L2]) * i64::from(600 * OUTPUT_SCALE)
            / i64::from(127 * (1 << WEIGHT_SCALE_BITS));
        fc2_out[0].wrapping_add(forward as i32)
    }
}
