//! The Poly1305 one-time authenticator ([RFC 8439] section 2.5) keyed from
//! ChaCha20 block 0 (section 2.6).
//!
//! The accumulator `h` and the multiplier `r` are held as five 26-bit limbs,
//! so every product fits in a `u64` and the reduction modulo 2^130 - 5 folds
//! the bits above 2^130 back in as a multiple of 5.
//!
//! [RFC 8439]: https://tools.ietf.org/html/rfc8439

use crate::{chacha::ChaChaCore, Error, R20, KEY_SIZE, NONCE_SIZE};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of an authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Message chunk size in bytes.
const CHUNK_SIZE: usize = 16;
const LIMB_MASK: u32 = 0x03ff_ffff;
/// The 2^128 bit of a full chunk, as seen by the top limb.
const HIBIT: u32 = 1 << 24;

/// A Poly1305 tag.
pub type Tag = [u8; TAG_SIZE];

/// One-time authenticator key: `r` (bytes 0..16) followed by `s` (16..32).
pub type OneTimeKey = [u8; KEY_SIZE];

/// Incremental Poly1305 state.
///
/// An instance, like its key, authenticates exactly one message.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Poly1305 {
    /// Clamped `r` in 26-bit limbs
    r: [u32; 5],
    /// `s` as little-endian words
    s: [u32; 4],
    /// Accumulator in 26-bit limbs
    h: [u32; 5],
    /// Bytes of an incomplete chunk
    buffer: [u8; CHUNK_SIZE],
    buffer_len: usize,
}

#[inline(always)]
fn le32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Clears the bits of `r` that must be zero: the top four bits of bytes 3,
/// 7, 11, 15 and the bottom two bits of bytes 4, 8, 12.
pub(crate) fn clamp(r: &mut [u8; 16]) {
    for i in [3, 7, 11, 15] {
        r[i] &= 0x0f;
    }
    for i in [4, 8, 12] {
        r[i] &= 0xfc;
    }
}

impl Poly1305 {
    /// Creates an authenticator from a one-time key.
    pub fn new(key: &OneTimeKey) -> Self {
        let mut r = [0u8; 16];
        r.copy_from_slice(&key[..16]);
        clamp(&mut r);

        let limbs = [
            le32(&r[0..4]) & LIMB_MASK,
            (le32(&r[3..7]) >> 2) & LIMB_MASK,
            (le32(&r[6..10]) >> 4) & LIMB_MASK,
            (le32(&r[9..13]) >> 6) & LIMB_MASK,
            le32(&r[12..16]) >> 8,
        ];
        r.zeroize();

        let s = [
            le32(&key[16..20]),
            le32(&key[20..24]),
            le32(&key[24..28]),
            le32(&key[28..32]),
        ];

        Self {
            r: limbs,
            s,
            h: [0; 5],
            buffer: [0; CHUNK_SIZE],
            buffer_len: 0,
        }
    }

    /// `h = ((h + chunk) * r) mod 2^130 - 5`, with `hibit` as bit 128 of the
    /// chunk.
    fn compute_chunk(&mut self, chunk: &[u8; CHUNK_SIZE], hibit: u32) {
        let [r0, r1, r2, r3, r4] = self.r.map(u64::from);
        let (s1, s2, s3, s4) = (r1 * 5, r2 * 5, r3 * 5, r4 * 5);

        let h0 = u64::from(self.h[0] + (le32(&chunk[0..4]) & LIMB_MASK));
        let h1 = u64::from(self.h[1] + ((le32(&chunk[3..7]) >> 2) & LIMB_MASK));
        let h2 = u64::from(self.h[2] + ((le32(&chunk[6..10]) >> 4) & LIMB_MASK));
        let h3 = u64::from(self.h[3] + ((le32(&chunk[9..13]) >> 6) & LIMB_MASK));
        let h4 = u64::from(self.h[4] + ((le32(&chunk[12..16]) >> 8) | hibit));

        // Limbs above 2^130 wrap around multiplied by 5.
        let d0 = h0 * r0 + h1 * s4 + h2 * s3 + h3 * s2 + h4 * s1;
        let d1 = h0 * r1 + h1 * r0 + h2 * s4 + h3 * s3 + h4 * s2;
        let d2 = h0 * r2 + h1 * r1 + h2 * r0 + h3 * s4 + h4 * s3;
        let d3 = h0 * r3 + h1 * r2 + h2 * r1 + h3 * r0 + h4 * s4;
        let d4 = h0 * r4 + h1 * r3 + h2 * r2 + h3 * r1 + h4 * r0;

        let mask = u64::from(LIMB_MASK);
        let mut c = d0 >> 26;
        let mut t0 = d0 & mask;
        let d1 = d1 + c;
        c = d1 >> 26;
        let t1 = d1 & mask;
        let d2 = d2 + c;
        c = d2 >> 26;
        let t2 = d2 & mask;
        let d3 = d3 + c;
        c = d3 >> 26;
        let t3 = d3 & mask;
        let d4 = d4 + c;
        c = d4 >> 26;
        let t4 = d4 & mask;
        t0 += c * 5;
        c = t0 >> 26;
        t0 &= mask;
        let t1 = t1 + c;

        self.h = [t0 as u32, t1 as u32, t2 as u32, t3 as u32, t4 as u32];
    }

    /// Absorbs message bytes. Full 16-byte chunks are processed immediately;
    /// a trailing partial chunk waits for more input, [`Self::update_padded`]
    /// or [`Self::finalize`].
    pub fn update(&mut self, data: &[u8]) {
        let mut data = data;

        if self.buffer_len > 0 {
            let needed = CHUNK_SIZE - self.buffer_len;
            if data.len() < needed {
                self.buffer[self.buffer_len..self.buffer_len + data.len()].copy_from_slice(data);
                self.buffer_len += data.len();
                return;
            }
            self.buffer[self.buffer_len..].copy_from_slice(&data[..needed]);
            let chunk = self.buffer;
            self.compute_chunk(&chunk, HIBIT);
            self.buffer_len = 0;
            data = &data[needed..];
        }

        let mut chunks = data.chunks_exact(CHUNK_SIZE);
        for chunk in &mut chunks {
            let mut full = [0u8; CHUNK_SIZE];
            full.copy_from_slice(chunk);
            self.compute_chunk(&full, HIBIT);
        }

        let rest = chunks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffer_len = rest.len();
    }

    /// Absorbs message bytes, then zero-pads any incomplete trailing chunk to
    /// 16 bytes and processes it as a full chunk (marker bit at 2^128).
    pub fn update_padded(&mut self, data: &[u8]) {
        self.update(data);
        if self.buffer_len > 0 {
            self.buffer[self.buffer_len..].fill(0);
            let chunk = self.buffer;
            self.compute_chunk(&chunk, HIBIT);
            self.buffer_len = 0;
        }
    }

    /// Produces the tag. A buffered partial chunk is closed with a `0x01`
    /// byte right after its last message byte, as RFC 8439 prescribes for
    /// unpadded messages.
    pub fn finalize(mut self) -> Tag {
        if self.buffer_len > 0 {
            self.buffer[self.buffer_len] = 1;
            self.buffer[self.buffer_len + 1..].fill(0);
            let chunk = self.buffer;
            self.compute_chunk(&chunk, 0);
        }

        let [mut h0, mut h1, mut h2, mut h3, mut h4] = self.h;

        // Fully carry h.
        let mut c = h1 >> 26;
        h1 &= LIMB_MASK;
        h2 += c;
        c = h2 >> 26;
        h2 &= LIMB_MASK;
        h3 += c;
        c = h3 >> 26;
        h3 &= LIMB_MASK;
        h4 += c;
        c = h4 >> 26;
        h4 &= LIMB_MASK;
        h0 += c * 5;
        c = h0 >> 26;
        h0 &= LIMB_MASK;
        h1 += c;

        // g = h - p
        let mut g0 = h0.wrapping_add(5);
        c = g0 >> 26;
        g0 &= LIMB_MASK;
        let mut g1 = h1.wrapping_add(c);
        c = g1 >> 26;
        g1 &= LIMB_MASK;
        let mut g2 = h2.wrapping_add(c);
        c = g2 >> 26;
        g2 &= LIMB_MASK;
        let mut g3 = h3.wrapping_add(c);
        c = g3 >> 26;
        g3 &= LIMB_MASK;
        let mut g4 = h4.wrapping_add(c).wrapping_sub(1 << 26);

        // Select g when h >= p, without branching on secret data.
        let mut mask = (g4 >> 31).wrapping_sub(1);
        g0 &= mask;
        g1 &= mask;
        g2 &= mask;
        g3 &= mask;
        g4 &= mask;
        mask = !mask;
        h0 = (h0 & mask) | g0;
        h1 = (h1 & mask) | g1;
        h2 = (h2 & mask) | g2;
        h3 = (h3 & mask) | g3;
        h4 = (h4 & mask) | g4;

        // h mod 2^128
        let words = [
            h0 | (h1 << 26),
            (h1 >> 6) | (h2 << 20),
            (h2 >> 12) | (h3 << 14),
            (h3 >> 18) | (h4 << 8),
        ];

        // (h + s) mod 2^128
        let mut tag = [0u8; TAG_SIZE];
        let mut carry = 0u64;
        for ((out, word), s) in tag.chunks_exact_mut(4).zip(words).zip(self.s) {
            let f = u64::from(word) + u64::from(s) + carry;
            out.copy_from_slice(&(f as u32).to_le_bytes());
            carry = f >> 32;
        }
        tag
    }

    /// One-shot RFC 8439 Poly1305 over `data`.
    pub fn compute_unpadded(mut self, data: &[u8]) -> Tag {
        self.update(data);
        self.finalize()
    }
}

/// Derives the one-time authenticator key: the first 32 bytes of the ChaCha20
/// block at counter 0.
pub fn poly1305_key_gen(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE]) -> Zeroizing<OneTimeKey> {
    let mut core = ChaChaCore::<R20>::new_with_counter(&(*key).into(), &(*nonce).into(), 0);
    let mut block = core.keystream_block();

    let mut one_time_key = Zeroizing::new([0u8; KEY_SIZE]);
    one_time_key.copy_from_slice(&block[..KEY_SIZE]);
    block.zeroize();
    one_time_key
}

/// Computes the 16-byte tag of `message` under the one-time key derived from
/// `key` and `nonce`.
///
/// The message is split into 16-byte chunks; a short final chunk is
/// zero-padded to 16 bytes and every chunk carries the `0x01` marker at byte
/// 16. For messages whose length is a multiple of 16 this is identical to
/// [`Poly1305::compute_unpadded`].
pub fn compute_tag(message: &[u8], key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE]) -> Tag {
    let one_time_key = poly1305_key_gen(key, nonce);
    let mut mac = Poly1305::new(&one_time_key);
    mac.update_padded(message);
    mac.finalize()
}

/// Checked form of [`compute_tag`] for callers holding key and nonce as slices.
pub fn try_compute_tag(message: &[u8], key: &[u8], nonce: &[u8]) -> Result<Tag, Error> {
    let key: &[u8; KEY_SIZE] = key.try_into().map_err(|_| Error::InvalidKeyLength)?;
    let nonce: &[u8; NONCE_SIZE] = nonce.try_into().map_err(|_| Error::InvalidNonceLength)?;
    Ok(compute_tag(message, key, nonce))
}

/// Recomputes the tag of `message` and compares it with `tag` in constant time.
pub fn verify_tag(
    message: &[u8],
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    tag: &Tag,
) -> Result<(), Error> {
    let mut expected = compute_tag(message, key, nonce);
    let diff = expected
        .iter()
        .zip(tag.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    expected.zeroize();

    if diff == 0 {
        Ok(())
    } else {
        Err(Error::TagMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        clamp, compute_tag, poly1305_key_gen, try_compute_tag, verify_tag, Poly1305, TAG_SIZE,
    };
    use crate::Error;
    use hex_literal::hex;

    const RFC_KEY: [u8; 32] =
        hex!("85d6be7857556d337f4452fe42d506a80103808afb0db2fd4abff6af4149f51b");
    const RFC_MESSAGE: &[u8] = b"Cryptographic Forum Research Group";

    #[test]
    fn test_rfc_poly1305_vector() {
        let tag = Poly1305::new(&RFC_KEY).compute_unpadded(RFC_MESSAGE);
        assert_eq!(tag, hex!("a8061dc1305136c6c22b8baf0c0127a9"));
    }

    #[test]
    fn test_incremental_update_matches_one_shot() {
        let expected = Poly1305::new(&RFC_KEY).compute_unpadded(RFC_MESSAGE);
        for split in [0, 1, 15, 16, 17, 33, RFC_MESSAGE.len()] {
            let mut mac = Poly1305::new(&RFC_KEY);
            mac.update(&RFC_MESSAGE[..split]);
            mac.update(&RFC_MESSAGE[split..]);
            assert_eq!(mac.finalize(), expected, "split at {split}");
        }

        let mut mac = Poly1305::new(&RFC_KEY);
        for byte in RFC_MESSAGE {
            mac.update(core::slice::from_ref(byte));
        }
        assert_eq!(mac.finalize(), expected);
    }

    #[test]
    fn test_padded_equals_unpadded_on_full_chunks() {
        let message = &RFC_MESSAGE[..32];
        let mut padded = Poly1305::new(&RFC_KEY);
        padded.update_padded(message);
        assert_eq!(padded.finalize(), Poly1305::new(&RFC_KEY).compute_unpadded(message));
    }

    #[test]
    fn test_padded_differs_from_unpadded_on_short_chunk() {
        let mut padded = Poly1305::new(&RFC_KEY);
        padded.update_padded(RFC_MESSAGE);
        assert_ne!(padded.finalize(), Poly1305::new(&RFC_KEY).compute_unpadded(RFC_MESSAGE));
    }

    #[test]
    fn test_empty_message_tag_is_s() {
        let tag = Poly1305::new(&RFC_KEY).compute_unpadded(&[]);
        assert_eq!(tag[..], RFC_KEY[16..]);
    }

    #[test]
    fn test_zero_key_gives_zero_tag() {
        let tag = Poly1305::new(&[0u8; 32]).compute_unpadded(&[0u8; 64]);
        assert_eq!(tag, [0u8; TAG_SIZE]);
    }

    #[test]
    fn test_accumulator_reduction_near_modulus() {
        // r = 1, s = 0:
        // one chunk of 0xff.. gives h = 2^129 - 1, already below p.
        let mut key = [0u8; 32];
        key[0] = 1;
        let tag = Poly1305::new(&key).compute_unpadded(&[0xff; 16]);
        assert_eq!(tag, [0xff; 16]);

        // Two such chunks: h = 2^130 - 2 = p + 3, which must reduce to 3.
        let tag = Poly1305::new(&key).compute_unpadded(&[0xff; 32]);
        let mut expected = [0u8; 16];
        expected[0] = 3;
        assert_eq!(tag, expected);
    }

    #[test]
    fn test_padded_short_chunks_against_integer_sum() {
        // r = 1, s = 0: each padded chunk adds le(chunk) + 2^128 to h, and h
        // stays below p for two chunks, so the tag is the sum of the chunks
        // mod 2^128.
        let mut key = [0u8; 32];
        key[0] = 1;
        let chunk_value = |bytes: &[u8]| {
            let mut padded = [0u8; 16];
            padded[..bytes.len()].copy_from_slice(bytes);
            u128::from_le_bytes(padded)
        };

        let one_byte = [0x5a];
        let mut mac = Poly1305::new(&key);
        mac.update_padded(&one_byte);
        assert_eq!(mac.finalize(), chunk_value(&one_byte).to_le_bytes());
        // The RFC framing marks the end at 2^8 instead.
        assert_eq!(
            Poly1305::new(&key).compute_unpadded(&one_byte),
            (chunk_value(&one_byte) + (1 << 8)).to_le_bytes()
        );

        let mut seventeen_bytes = [0xff; 17];
        seventeen_bytes[16] = 0x02;
        let expected = chunk_value(&seventeen_bytes[..16])
            .wrapping_add(chunk_value(&seventeen_bytes[16..]));
        let mut mac = Poly1305::new(&key);
        mac.update_padded(&seventeen_bytes);
        let tag = mac.finalize();
        assert_eq!(tag, expected.to_le_bytes());
        assert_eq!(tag, 1u128.to_le_bytes());
    }

    #[test]
    fn test_clamp() {
        let mut r = [0xff; 16];
        clamp(&mut r);
        assert_eq!(r, hex!("ffffff0ffcffff0ffcffff0ffcffff0f"));
    }

    #[test]
    fn test_rfc_key_generation_vector() {
        let key = hex!("808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f");
        let nonce = hex!("000000000001020304050607");
        assert_eq!(
            *poly1305_key_gen(&key, &nonce),
            hex!("8ad5a08b905f81cc815040274ab29471a833b637e3fd0da508dbb8e2fdd1a646")
        );
    }

    #[test]
    fn test_compute_tag_pads_short_final_chunk() {
        let key = hex!("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let nonce = hex!("000000000000004a00000000");
        let message = b"Ladies and Gentlemen of the class of '99: If I could offer you only one tip for the future, sunscreen would be it.";

        assert_eq!(
            compute_tag(message, &key, &nonce),
            hex!("15c789bb0680ac63512494d4e9f0a83e")
        );
        let unpadded = Poly1305::new(&poly1305_key_gen(&key, &nonce)).compute_unpadded(message);
        assert_eq!(unpadded, hex!("cd5213c13e77e1f8666e530602583f40"));
    }

    #[test]
    fn test_compute_tag_empty_message() {
        let key = hex!("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let nonce = hex!("000000000000004a00000000");
        assert_eq!(compute_tag(&[], &key, &nonce), hex!("d258a22a6dcb4bb9f6569cb3efe2deaf"));
    }

    #[test]
    fn test_verify_tag() {
        let key = [9u8; 32];
        let nonce = [3u8; 12];
        let mut tag = compute_tag(b"message", &key, &nonce);
        assert_eq!(verify_tag(b"message", &key, &nonce, &tag), Ok(()));
        assert_eq!(verify_tag(b"massage", &key, &nonce, &tag), Err(Error::TagMismatch));
        tag[15] ^= 0x80;
        assert_eq!(verify_tag(b"message", &key, &nonce, &tag), Err(Error::TagMismatch));
    }

    #[test]
    fn test_try_compute_tag_lengths() {
        let key = [9u8; 32];
        let nonce = [3u8; 12];
        assert_eq!(
            try_compute_tag(b"message", &key, &nonce),
            Ok(compute_tag(b"message", &key, &nonce))
        );
        assert_eq!(try_compute_tag(b"m", &key[..16], &nonce), Err(Error::InvalidKeyLength));
        assert_eq!(try_compute_tag(b"m", &key, &nonce[..11]), Err(Error::InvalidNonceLength));
    }
}
