//! ChaCha20 stream cipher and Poly1305 one-time authenticator ([RFC 8439])
//!
//! The cipher is compatible with the `cipher` crate traits. Its structure
//! separates the core block logic from the trait implementations and the
//! keystream backends.
//!
//! Two primitives are provided and nothing more: the stream cipher
//! ([`encrypt_in_place`] / [`decrypt_in_place`], or the seekable [`ChaCha20`]
//! type) and the authenticator ([`compute_tag`], [`Poly1305`]). Composing them
//! into an AEAD mode is left to the caller.
//!
//! # Usage
//!
//! ```
//! use chacha20_rfc::{compute_tag, decrypt_in_place, encrypt_in_place};
//!
//! let key = [0x42; 32];
//! let nonce = [0x24; 12];
//! let mut data = *b"attack at dawn";
//!
//! encrypt_in_place(&mut data, &key, &nonce);
//! let tag = compute_tag(&data, &key, &nonce);
//!
//! decrypt_in_place(&mut data, &key, &nonce);
//! assert_eq!(&data, b"attack at dawn");
//! assert_eq!(tag.len(), 16);
//! ```
//!
//! # Limits
//!
//! The block counter is 32 bits wide. The stream types never use block
//! `u32::MAX`, so a stream starting at counter `c` yields `u32::MAX - c`
//! blocks: from counter 1 that is blocks 1 through 2^32 - 2, just under
//! 256 GiB. Past that they refuse to go on instead of wrapping.
//!
//! [RFC 8439]: https://tools.ietf.org/html/rfc8439

#![no_std]
#![cfg_attr(feature = "chacha_simd", feature(portable_simd))]

pub use cipher; // Re-export cipher crate for downstream users

use cipher::{StreamCipher, StreamCipherCoreWrapper};

pub use crate::chacha::ChaChaCore;
pub use crate::error::Error;
pub use crate::poly1305::{
    compute_tag, poly1305_key_gen, try_compute_tag, verify_tag, OneTimeKey, Poly1305, Tag,
    TAG_SIZE,
};

// --- Round Count Abstraction ---

/// A trait to define the number of double-rounds of a ChaCha variant.
pub trait Rounds: Clone {
    const DOUBLE_ROUNDS: usize;
}

/// 8 rounds (4 double-rounds).
#[derive(Clone, Copy, Debug)]
pub struct R8;
impl Rounds for R8 {
    const DOUBLE_ROUNDS: usize = 4;
}

/// 12 rounds (6 double-rounds).
#[derive(Clone, Copy, Debug)]
pub struct R12;
impl Rounds for R12 {
    const DOUBLE_ROUNDS: usize = 6;
}

/// 20 rounds (10 double-rounds), the RFC 8439 cipher.
#[derive(Clone, Copy, Debug)]
pub struct R20;
impl Rounds for R20 {
    const DOUBLE_ROUNDS: usize = 10;
}

// --- Core Cipher Logic ---

pub(crate) mod arx;
pub(crate) mod chacha;
mod error;
mod poly1305;

// --- Keystream Backends ---
pub(crate) mod backends;

// --- Constants ---

/// Size of a key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of a nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of a keystream block in bytes.
pub const BLOCK_SIZE: usize = 64;
/// Block counter the stream functions start from; counter 0 is reserved for
/// the authenticator's one-time key.
pub const STREAM_START_COUNTER: u32 = 1;

pub(crate) const STATE_WORDS: usize = 16;
pub(crate) const KEY_WORDS: usize = 8;
pub(crate) const NONCE_WORDS: usize = 3;
pub(crate) const COUNTER_WORD: usize = 12;
/// "expand 32-byte k"
pub(crate) const CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

// --- Convenience Type Aliases for Users ---
pub type ChaCha8 = StreamCipherCoreWrapper<ChaChaCore<R8>>;
pub type ChaCha12 = StreamCipherCoreWrapper<ChaChaCore<R12>>;
pub type ChaCha20 = StreamCipherCoreWrapper<ChaChaCore<R20>>;

/// ChaCha20 positioned at [`STREAM_START_COUNTER`].
fn stream_cipher(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE]) -> ChaCha20 {
    ChaCha20::from_core(ChaChaCore::new_with_counter(
        &(*key).into(),
        &(*nonce).into(),
        STREAM_START_COUNTER,
    ))
}

/// Encrypts `buffer` in place with ChaCha20, starting at block counter 1.
///
/// Every full 64-byte chunk is XORed with one keystream block; a trailing
/// partial chunk consumes one more block, of which only the needed prefix is
/// used.
///
/// # Panics
///
/// Panics if `buffer` is longer than the keystream available from counter 1
/// (just under 256 GiB). Use [`try_encrypt_in_place`] to get an error instead.
pub fn encrypt_in_place(buffer: &mut [u8], key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE]) {
    stream_cipher(key, nonce).apply_keystream(buffer);
}

/// Decrypts `buffer` in place. This is the same operation as
/// [`encrypt_in_place`]: both start from counter 1, so either undoes the other.
///
/// # Panics
///
/// Same conditions as [`encrypt_in_place`].
pub fn decrypt_in_place(buffer: &mut [u8], key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE]) {
    encrypt_in_place(buffer, key, nonce);
}

/// Checked form of [`encrypt_in_place`] for callers holding key and nonce as
/// slices. Decryption is the same call.
///
/// The buffer is left untouched when an error is returned.
pub fn try_encrypt_in_place(buffer: &mut [u8], key: &[u8], nonce: &[u8]) -> Result<(), Error> {
    let key: &[u8; KEY_SIZE] = key.try_into().map_err(|_| Error::InvalidKeyLength)?;
    let nonce: &[u8; NONCE_SIZE] = nonce.try_into().map_err(|_| Error::InvalidNonceLength)?;
    stream_cipher(key, nonce).try_apply_keystream(buffer)?;
    Ok(())
}
