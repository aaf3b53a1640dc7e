use crate::{backends::soft, chacha::ChaChaCore, Rounds, COUNTER_WORD, STATE_WORDS};
use cipher::{
    consts::{U4, U64},
    Block, BlockSizeUser, ParBlocks, ParBlocksSizeUser, StreamBackend,
};
use core::simd::prelude::*;
use zeroize::Zeroize;

/// Blocks produced per `gen_par_ks_blocks` call, one per vector lane.
const LANES: usize = 4;

/// The portable SIMD backend for ChaCha.
///
/// Lane `i` of every state vector belongs to the block at counter
/// `base + i`, so four blocks are mixed at once.
pub struct Backend<'a, R: Rounds>(pub(crate) &'a mut ChaChaCore<R>);

impl<'a, R: Rounds> BlockSizeUser for Backend<'a, R> {
    type BlockSize = U64;
}

impl<'a, R: Rounds> ParBlocksSizeUser for Backend<'a, R> {
    type ParBlocksSize = U4;
}

impl<'a, R: Rounds> StreamBackend for Backend<'a, R> {
    #[inline]
    fn gen_ks_block(&mut self, block: &mut Block<Self>) {
        soft::Backend(&mut *self.0).gen_ks_block(block);
    }

    #[inline]
    fn gen_par_ks_blocks(&mut self, blocks: &mut ParBlocks<Self>) {
        let base = self.0.counter;
        let input = self.0.input_state(base);

        let mut original = [u32x4::splat(0); STATE_WORDS];
        for (lane, &word) in original.iter_mut().zip(input.iter()) {
            *lane = u32x4::splat(word);
        }
        original[COUNTER_WORD] = u32x4::from_array([
            base,
            base.wrapping_add(1),
            base.wrapping_add(2),
            base.wrapping_add(3),
        ]);

        let mut working_state = original;
        for _ in 0..R::DOUBLE_ROUNDS {
            double_round_simd(&mut working_state);
        }

        let mut words = [[0u32; LANES]; STATE_WORDS];
        for (out, (mixed, original)) in words
            .iter_mut()
            .zip(working_state.iter().zip(original.iter()))
        {
            *out = (*mixed + *original).to_array();
        }

        for (lane, block) in blocks.iter_mut().enumerate() {
            for (chunk, word) in block.chunks_exact_mut(4).zip(words.iter()) {
                chunk.copy_from_slice(&word[lane].to_le_bytes());
            }
        }
        words.zeroize();

        self.0.counter = base.wrapping_add(LANES as u32);
    }
}

#[inline(always)]
fn rotate_left(val: u32x4, amount: u32) -> u32x4 {
    (val << u32x4::splat(amount)) | (val >> u32x4::splat(32 - amount))
}

#[inline(always)]
fn quarter_round_simd(state: &mut [u32x4; STATE_WORDS], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a] + state[b];
    state[d] = rotate_left(state[d] ^ state[a], 16);

    state[c] = state[c] + state[d];
    state[b] = rotate_left(state[b] ^ state[c], 12);

    state[a] = state[a] + state[b];
    state[d] = rotate_left(state[d] ^ state[a], 8);

    state[c] = state[c] + state[d];
    state[b] = rotate_left(state[b] ^ state[c], 7);
}

#[inline(always)]
fn double_round_simd(state: &mut [u32x4; STATE_WORDS]) {
    quarter_round_simd(state, 0, 4, 8, 12);
    quarter_round_simd(state, 1, 5, 9, 13);
    quarter_round_simd(state, 2, 6, 10, 14);
    quarter_round_simd(state, 3, 7, 11, 15);

    quarter_round_simd(state, 0, 5, 10, 15);
    quarter_round_simd(state, 1, 6, 11, 12);
    quarter_round_simd(state, 2, 7, 8, 13);
    quarter_round_simd(state, 3, 4, 9, 14);
}
