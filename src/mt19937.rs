// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Concrete 32-bit Mersenne Twister.
//!
//! This is the reference generator: it produces test vectors and
//! replays recovered states. The state layout is the usual one
//! (624 words and an index into the current batch), so that a state
//! can be exchanged with other MT19937 implementations.

use rand::{Error, RngCore};

use crate::N;

pub const M: usize = 397;
pub const MATRIX_A: u32 = 0x9908b0df;
pub const UPPER_MASK: u32 = 0x8000_0000;
pub const LOWER_MASK: u32 = 0x7fff_ffff;

// Tempering parameters.
pub const TEMPER_U: u32 = 11;
pub const TEMPER_S: u32 = 7;
pub const TEMPER_B: u32 = 0x9d2c5680;
pub const TEMPER_T: u32 = 15;
pub const TEMPER_C: u32 = 0xefc60000;
pub const TEMPER_L: u32 = 18;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mt19937 {
    index: usize,
    state: [u32; N],
}

impl Mt19937 {
    /// Classical initialization (init_genrand).
    pub fn new(seed: u32) -> Self {
        let mut state = [seed; N];
        for i in 1..N {
            let prev = state[i - 1];
            state[i] = (prev ^ (prev >> 30))
                .wrapping_mul(1812433253)
                .wrapping_add(i as u32);
        }
        Mt19937 { index: N, state }
    }

    /// Install a generator at a given state.
    ///
    /// The next output is the tempered value of `state[index]`,
    /// or the first word of the next batch if `index == N`.
    pub fn from_state(state: [u32; N], index: usize) -> Self {
        assert!(index <= N, "index {index} out of range");
        Mt19937 { index, state }
    }

    pub fn state(&self) -> &[u32; N] {
        &self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn twist(&mut self) {
        let s = &mut self.state;
        for i in 0..N {
            let y = (s[i] & UPPER_MASK) | (s[(i + 1) % N] & LOWER_MASK);
            s[i] = s[(i + M) % N] ^ (y >> 1);
            if y & 1 == 1 {
                s[i] ^= MATRIX_A;
            }
        }
        self.index = 0;
    }

    pub fn next_u32(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }
        let y = self.state[self.index];
        self.index += 1;
        temper(y)
    }

    /// Returns the top `k` bits of the next output (like Python
    /// `random.getrandbits(k)` for k <= 32).
    pub fn getrandbits(&mut self, k: u32) -> u32 {
        assert!(k >= 1 && k <= 32);
        self.next_u32() >> (32 - k)
    }

    /// Skip `n` outputs.
    pub fn discard(&mut self, n: usize) {
        for _ in 0..n {
            if self.index >= N {
                self.twist();
            }
            self.index += 1;
        }
    }
}

impl RngCore for Mt19937 {
    fn next_u32(&mut self) -> u32 {
        Mt19937::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = Mt19937::next_u32(self) as u64;
        let hi = Mt19937::next_u32(self) as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let b = Mt19937::next_u32(self).to_le_bytes();
            chunk.copy_from_slice(&b[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

pub fn temper(mut y: u32) -> u32 {
    y ^= y >> TEMPER_U;
    y ^= (y << TEMPER_S) & TEMPER_B;
    y ^= (y << TEMPER_T) & TEMPER_C;
    y ^= y >> TEMPER_L;
    y
}

/// Inverse of the tempering transform.
pub fn untemper(y: u32) -> u32 {
    let y = un_xor_shr(y, TEMPER_L);
    let y = un_xor_shl_and(y, TEMPER_T, TEMPER_C);
    let y = un_xor_shl_and(y, TEMPER_S, TEMPER_B);
    un_xor_shr(y, TEMPER_U)
}

// Invert y = x ^ (x >> n): bits are recovered from the top,
// n bits at a time.
fn un_xor_shr(y: u32, n: u32) -> u32 {
    let mut x = y;
    let mut known = n;
    while known < 32 {
        x = y ^ (x >> n);
        known += n;
    }
    x
}

// Invert y = x ^ ((x << n) & mask), from the bottom.
fn un_xor_shl_and(y: u32, n: u32, mask: u32) -> u32 {
    let mut x = y;
    let mut known = n;
    while known < 32 {
        x = y ^ ((x << n) & mask);
        known += n;
    }
    x
}

#[test]
fn test_seed_values() {
    let g = Mt19937::new(0);
    assert_eq!(g.index(), N);
    assert_eq!(&g.state()[0..5], &[0, 1, 1812433255, 1900727105, 1208447044]);
}

#[test]
fn test_outputs() {
    // Reference values of the canonical seed.
    let mut g = Mt19937::new(5489);
    assert_eq!(g.next_u32(), 3499211612);
    assert_eq!(g.next_u32(), 581869302);
    assert_eq!(g.next_u32(), 3890346734);
    assert_eq!(g.next_u32(), 3586334585);
    assert_eq!(g.next_u32(), 545404204);

    let mut g = Mt19937::new(17);
    let v: Vec<u32> = (0..3).map(|_| g.next_u32()).collect();
    assert_eq!(&v, &[1265576559, 780729585, 2278852751]);

    // The 10000th output of the default generator (C++ std::mt19937).
    let mut g = Mt19937::new(5489);
    g.discard(9999);
    assert_eq!(g.next_u32(), 4123659995);
}

#[test]
fn test_untemper() {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    for _ in 0..10000 {
        let x: u32 = rng.gen();
        assert_eq!(untemper(temper(x)), x);
    }
    // The outputs of a batch untemper to the batch state.
    let mut g = Mt19937::new(1234);
    let outs: Vec<u32> = (0..N).map(|_| g.next_u32()).collect();
    let state: Vec<u32> = outs.iter().map(|&y| untemper(y)).collect();
    assert_eq!(&state[..], &g.state()[..]);
}

#[test]
fn test_from_state() {
    let mut g = Mt19937::new(42);
    for _ in 0..100 {
        g.next_u32();
    }
    let mut h = Mt19937::from_state(*g.state(), g.index());
    for _ in 0..1000 {
        assert_eq!(g.next_u32(), h.next_u32());
    }
    assert_eq!(g, h);
}

#[test]
fn test_getrandbits() {
    let mut g = Mt19937::new(5489);
    let mut h = g.clone();
    assert_eq!(g.getrandbits(32), h.next_u32());
    assert_eq!(g.getrandbits(8), h.next_u32() >> 24);
    assert_eq!(g.getrandbits(1), h.next_u32() >> 31);
}

#[test]
fn test_rngcore() {
    use rand::Rng;

    let mut g = Mt19937::new(7);
    let mut h = g.clone();
    let x: u32 = g.gen();
    assert_eq!(x, h.next_u32());
    let mut buf = [0u8; 8];
    g.fill_bytes(&mut buf);
    assert_eq!(&buf[..4], &h.next_u32().to_le_bytes());
    assert_eq!(&buf[4..], &h.next_u32().to_le_bytes());
}
