use crate::{
    backends, Rounds, BLOCK_SIZE, CONSTANTS, COUNTER_WORD, KEY_WORDS, NONCE_WORDS, STATE_WORDS,
};
use cfg_if::cfg_if;
use cipher::{
    consts::{U12, U32, U64},
    BlockSizeUser, Iv, IvSizeUser, Key, KeyIvInit, KeySizeUser, StreamCipherCore,
    StreamCipherSeekCore, StreamClosure,
};
use core::marker::PhantomData;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The core state for the ChaCha cipher.
///
/// Holds the constant, key and nonce words of the input state together with
/// the block counter; word 12 is filled in from the counter for every block.
pub struct ChaChaCore<R: Rounds> {
    /// Input state of the block function, counter word unset
    pub(crate) state: [u32; STATE_WORDS],
    /// Block counter
    pub(crate) counter: u32,
    /// PhantomData to tie the struct to the round count
    pub(crate) _variant: PhantomData<R>,
}

impl<R: Rounds> ChaChaCore<R> {
    /// Creates a core whose first keystream block uses `counter`.
    pub fn new_with_counter(key: &Key<Self>, nonce: &Iv<Self>, counter: u32) -> Self {
        let mut state = [0u32; STATE_WORDS];
        let (constants, rest) = state.split_at_mut(CONSTANTS.len());
        let (key_words, rest) = rest.split_at_mut(KEY_WORDS);
        let nonce_words = &mut rest[1..];

        constants.copy_from_slice(&CONSTANTS);
        for (word, chunk) in key_words.iter_mut().zip(key.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        for (word, chunk) in nonce_words.iter_mut().zip(nonce.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        debug_assert_eq!(nonce_words.len(), NONCE_WORDS);

        Self {
            state,
            counter,
            _variant: PhantomData,
        }
    }

    /// The block function input for `counter`.
    #[inline(always)]
    pub(crate) fn input_state(&self, counter: u32) -> [u32; STATE_WORDS] {
        let mut input = self.state;
        input[COUNTER_WORD] = counter;
        input
    }

    /// Runs the block function once at the current counter and advances the
    /// counter by one.
    ///
    /// This raw access does not guard the end of the counter space: after
    /// block `u32::MAX` the counter wraps to 0. The stream types built on
    /// [`StreamCipherCore`] stop before that point.
    pub fn keystream_block(&mut self) -> [u8; BLOCK_SIZE] {
        let mut input = self.input_state(self.counter);
        let block = backends::soft::block::<R>(&input);
        input.zeroize();
        self.counter = self.counter.wrapping_add(1);
        block
    }
}

impl<R: Rounds> KeySizeUser for ChaChaCore<R> {
    type KeySize = U32;
}

impl<R: Rounds> IvSizeUser for ChaChaCore<R> {
    type IvSize = U12;
}

impl<R: Rounds> BlockSizeUser for ChaChaCore<R> {
    type BlockSize = U64; // 512-bit blocks
}

impl<R: Rounds> KeyIvInit for ChaChaCore<R> {
    /// Counter starts at 0; position the stream with
    /// [`StreamCipherSeekCore::set_block_pos`] or `seek` as needed.
    fn new(key: &Key<Self>, iv: &Iv<Self>) -> Self {
        Self::new_with_counter(key, iv, 0)
    }
}

impl<R: Rounds> StreamCipherCore for ChaChaCore<R> {
    fn process_with_backend(&mut self, f: impl StreamClosure<BlockSize = Self::BlockSize>) {
        cfg_if! {
            if #[cfg(all(feature = "chacha_simd", not(chacha20_force_soft)))] {
                f.call(&mut backends::simd::Backend(self));
            } else {
                f.call(&mut backends::soft::Backend(self));
            }
        }
    }

    // One block short of the full counter space so the counter never wraps.
    fn remaining_blocks(&self) -> Option<usize> {
        let rem = u32::MAX - self.counter;
        rem.try_into().ok()
    }
}

impl<R: Rounds> StreamCipherSeekCore for ChaChaCore<R> {
    type Counter = u32;

    fn get_block_pos(&self) -> Self::Counter {
        self.counter
    }

    fn set_block_pos(&mut self, pos: Self::Counter) {
        self.counter = pos;
    }
}

impl<R: Rounds> Drop for ChaChaCore<R> {
    fn drop(&mut self) {
        self.state.zeroize();
        self.counter.zeroize();
    }
}

impl<R: Rounds> ZeroizeOnDrop for ChaChaCore<R> {}
