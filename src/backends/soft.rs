use crate::{arx::double_round, chacha::ChaChaCore, Rounds, BLOCK_SIZE, STATE_WORDS};
use cipher::{
    consts::{U1, U64},
    Block, BlockSizeUser, ParBlocksSizeUser, StreamBackend,
};
use zeroize::Zeroize;

/// The software backend for ChaCha.
pub struct Backend<'a, R: Rounds>(pub(crate) &'a mut ChaChaCore<R>);

impl<'a, R: Rounds> BlockSizeUser for Backend<'a, R> {
    type BlockSize = U64;
}

impl<'a, R: Rounds> ParBlocksSizeUser for Backend<'a, R> {
    type ParBlocksSize = U1;
}

impl<'a, R: Rounds> StreamBackend for Backend<'a, R> {
    #[inline(always)]
    fn gen_ks_block(&mut self, block: &mut Block<Self>) {
        let mut keystream = self.0.keystream_block();
        block.copy_from_slice(&keystream);
        keystream.zeroize();
    }
}

/// The block function.
///
/// Copies `input` into a working state, applies `R::DOUBLE_ROUNDS`
/// double-rounds to the copy, adds the input back word by word and serializes
/// the sum little-endian.
#[inline(always)]
pub(crate) fn block<R: Rounds>(input: &[u32; STATE_WORDS]) -> [u8; BLOCK_SIZE] {
    let mut working_state = *input;
    for _ in 0..R::DOUBLE_ROUNDS {
        double_round(&mut working_state);
    }

    let mut out = [0u8; BLOCK_SIZE];
    for ((chunk, mixed), original) in out
        .chunks_exact_mut(4)
        .zip(working_state.iter())
        .zip(input.iter())
    {
        chunk.copy_from_slice(&mixed.wrapping_add(*original).to_le_bytes());
    }
    working_state.zeroize();
    out
}
