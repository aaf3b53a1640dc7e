use crate::STATE_WORDS;

/// Rotation amounts of the four quarter-round steps.
const R: [u32; 4] = [16, 12, 8, 7];

/// The ARX (Add-Rotate-XOR) quarter-round on state words `a`, `b`, `c`, `d`.
#[inline(always)]
pub(crate) fn quarter_round(state: &mut [u32; STATE_WORDS], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] = (state[d] ^ state[a]).rotate_left(R[0]);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_left(R[1]);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] = (state[d] ^ state[a]).rotate_left(R[2]);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_left(R[3]);
}

/// Four column quarter-rounds followed by four diagonal quarter-rounds.
#[inline(always)]
pub(crate) fn double_round(state: &mut [u32; STATE_WORDS]) {
    quarter_round(state, 0, 4, 8, 12);
    quarter_round(state, 1, 5, 9, 13);
    quarter_round(state, 2, 6, 10, 14);
    quarter_round(state, 3, 7, 11, 15);

    quarter_round(state, 0, 5, 10, 15);
    quarter_round(state, 1, 6, 11, 12);
    quarter_round(state, 2, 7, 8, 13);
    quarter_round(state, 3, 4, 9, 14);
}
