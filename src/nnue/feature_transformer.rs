//! Input feature transformer and incremental accumulator maintenance.

use std::io::{Read, Write};

use rand::Rng;

use super::accumulator::{Accumulator, AccumulatorSlot};
use super::aligned::AlignedBuffer;
use super::error::NetworkError;
use super::serialize::{read_into, write_from};
use super::{feature_index, simd, Value, INPUT_DIMENSIONS, PSQT_BUCKETS};
use crate::board::{Color, Position, StateInfo};

/// Hash of the 768-input piece-square feature set
pub const FEATURE_SET_HASH: u32 = 0x5D69_D5B8;

#[inline]
fn slot<const L1: usize>(state: &StateInfo) -> &Accumulator<L1>
where
    StateInfo: AccumulatorSlot<L1>,
{
    <StateInfo as AccumulatorSlot<L1>>::accumulator(state)
}

#[inline]
fn slot_mut<const L1: usize>(state: &mut StateInfo) -> &mut Accumulator<L1>
where
    StateInfo: AccumulatorSlot<L1>,
{
    <StateInfo as AccumulatorSlot<L1>>::accumulator_mut(state)
}

/// Weights mapping the 768 piece-square inputs to `L1` accumulator lanes
/// plus `PSQT_BUCKETS` PSQT lanes.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTransformer<const L1: usize> {
    pub(crate) biases: AlignedBuffer<i16>,
    pub(crate) weights: AlignedBuffer<i16>,
    pub(crate) psqt_weights: AlignedBuffer<i32>,
}

impl<const L1: usize> Default for FeatureTransformer<L1> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const L1: usize> FeatureTransformer<L1> {
    pub const HASH: u32 = FEATURE_SET_HASH ^ (L1 as u32 * 2);

    #[must_use]
    pub fn zeroed() -> Self {
        FeatureTransformer {
            biases: AlignedBuffer::zeroed(L1),
            weights: AlignedBuffer::zeroed(INPUT_DIMENSIONS * L1),
            psqt_weights: AlignedBuffer::zeroed(INPUT_DIMENSIONS * PSQT_BUCKETS),
        }
    }

    pub fn clear(&mut self) {
        self.biases.clear();
        self.weights.clear();
        self.psqt_weights.clear();
    }

    /// Fill with small pseudo-random parameters
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for b in self.biases.iter_mut() {
            *b = rng.gen_range(0..=64);
        }
        for w in self.weights.iter_mut() {
            *w = rng.gen_range(-32..=32);
        }
        for w in self.psqt_weights.iter_mut() {
            *w = rng.gen_range(-4000..=4000);
        }
    }

    pub(crate) fn read_parameters<R: Read>(&mut self, reader: &mut R) -> Result<(), NetworkError> {
        read_into(reader, &mut self.biases)?;
        read_into(reader, &mut self.weights)?;
        read_into(reader, &mut self.psqt_weights)
    }

    pub(crate) fn write_parameters<W: Write>(&self, writer: &mut W) -> Result<(), NetworkError> {
        write_from(writer, &self.biases)?;
        write_from(writer, &self.weights)?;
        write_from(writer, &self.psqt_weights)
    }

    #[inline]
    fn weight_row(&self, feature: usize) -> &[i16] {
        &self.weights[feature * L1..(feature + 1) * L1]
    }

    #[inline]
    fn psqt_row(&self, feature: usize) -> &[i32] {
        &self.psqt_weights[feature * PSQT_BUCKETS..(feature + 1) * PSQT_BUCKETS]
    }
}

impl<const L1: usize> FeatureTransformer<L1>
where
    StateInfo: AccumulatorSlot<L1>,
{
    /// Bring the accumulator of the current node up to date and write the
    /// transformed features of both perspectives (side to move first) into
    /// `output`. Returns the PSQT value of `bucket`.
    ///
    /// With `psqt_only` the positional lanes are neither updated nor written.
    pub fn transform(
        &self,
        pos: &mut Position,
        output: &mut [u8],
        bucket: usize,
        psqt_only: bool,
    ) -> Value {
        self.update_accumulator(pos, Color::White, psqt_only);
        self.update_accumulator(pos, Color::Black, psqt_only);

        let us = pos.side_to_move().index();
        let them = 1 - us;
        let acc = slot::<L1>(pos.state());
        let psqt = acc.psqt_accumulation[us][bucket]
            .wrapping_sub(acc.psqt_accumulation[them][bucket])
            / 2;
        if psqt_only {
            return psqt;
        }

        let half = L1 / 2;
        for (k, p) in [us, them].into_iter().enumerate() {
            let lanes = &acc.accumulation[p];
            let out = &mut output[half * k..half * (k + 1)];
            for (j, o) in out.iter_mut().enumerate() {
                let a = i32::from(lanes[j]).clamp(0, 127);
                let b = i32::from(lanes[j + half]).clamp(0, 127);
                *o = (a * b / 128) as u8;
            }
        }
        psqt
    }

    /// Precompute the current node's accumulator ahead of several
    /// evaluations of its children.
    pub fn hint_common_access(&self, pos: &mut Position, psqt_only: bool) {
        self.update_accumulator(pos, Color::White, psqt_only);
        self.update_accumulator(pos, Color::Black, psqt_only);
    }

    fn update_accumulator(&self, pos: &mut Position, perspective: Color, psqt_only: bool) {
        let states = pos.states();
        let cur = states.len() - 1;
        if slot::<L1>(&states[cur]).is_ready(perspective, psqt_only) {
            return;
        }

        // Replaying a long chain of diffs costs more than a refresh.
        let mut budget = pos.count_all() as i32 - 2;
        let mut idx = cur;
        let start = loop {
            let node = &states[idx];
            if node.refresh_required || idx == 0 {
                break None;
            }
            budget -= node.dirty.len() as i32 + 1;
            if budget < 0 {
                break None;
            }
            idx -= 1;
            if slot::<L1>(&states[idx]).is_ready(perspective, psqt_only) {
                break Some(idx);
            }
        };

        match start {
            Some(start) => self.update_forward(pos, start, perspective, psqt_only),
            None => self.refresh(pos, perspective, psqt_only),
        }
    }

    /// Replay the diffs of every node after `start` up to the current one.
    fn update_forward(&self, pos: &mut Position, start: usize, perspective: Color, psqt_only: bool) {
        let p = perspective.index();
        let states = pos.states_mut();
        for i in (start + 1)..states.len() {
            let (done, rest) = states.split_at_mut(i);
            let prev = slot::<L1>(&done[i - 1]);
            let node = &mut rest[0];
            let dirty = node.dirty;
            let acc = slot_mut::<L1>(node);

            acc.psqt_accumulation[p] = prev.psqt_accumulation[p];
            if !psqt_only {
                acc.accumulation[p] = prev.accumulation[p];
            }
            for entry in dirty.iter() {
                if let Some(from) = entry.from {
                    let f = feature_index(perspective, entry.color, entry.piece, from);
                    simd::sub_psqt(&mut acc.psqt_accumulation[p], self.psqt_row(f));
                    if !psqt_only {
                        simd::sub_weights(&mut acc.accumulation[p], self.weight_row(f));
                    }
                }
                if let Some(to) = entry.to {
                    let f = feature_index(perspective, entry.color, entry.piece, to);
                    simd::add_psqt(&mut acc.psqt_accumulation[p], self.psqt_row(f));
                    if !psqt_only {
                        simd::add_weights(&mut acc.accumulation[p], self.weight_row(f));
                    }
                }
            }
            acc.computed_psqt[p] = true;
            if !psqt_only {
                acc.computed[p] = true;
            }
        }
    }

    /// Rebuild the current node's accumulator from the board.
    fn refresh(&self, pos: &mut Position, perspective: Color, psqt_only: bool) {
        let mut features = [0usize; 64];
        let mut count = 0;
        for sq in pos.occupied().iter() {
            if let Some((color, piece)) = pos.piece_on(sq) {
                features[count] = feature_index(perspective, color, piece, sq);
                count += 1;
            }
        }

        let p = perspective.index();
        let acc = slot_mut::<L1>(pos.state_mut());
        acc.psqt_accumulation[p] = [0; PSQT_BUCKETS];
        for &f in &features[..count] {
            simd::add_psqt(&mut acc.psqt_accumulation[p], self.psqt_row(f));
        }
        acc.computed_psqt[p] = true;

        if !psqt_only {
            acc.accumulation[p].copy_from_slice(&self.biases);
            for &f in &features[..count] {
                simd::add_weights(&mut acc.accumulation[p], self.weight_row(f));
            }
            acc.computed[p] = true;
        }
    }
}
