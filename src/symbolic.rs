// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Symbolic execution of MT19937 over GF(2).
//!
//! A symbolic word is an array of 32 lanes, one per bit of a 32-bit
//! register (lane 0 is the most significant bit). Each lane is a vector
//! of 19968 coefficients: the set of initial state bits whose XOR is
//! the value of that bit.
//!
//! The twist and tempering only use XOR, shifts by constant amounts
//! and AND with constant masks, so they act linearly on lanes:
//! - XOR adds lanes pairwise
//! - a shift moves lanes and fills with zero vectors
//! - AND with a constant keeps or zeroes each lane.
//!
//! The initial state is the array from which the first output
//! is tempered: word i, bit b is the unit vector at coordinate 32i+b.
//!
//! Memory usage is 624*32 vectors of 2.5kB (50MB).

use bitvec_simd::BitVec;

use crate::mt19937::{M, MATRIX_A, TEMPER_B, TEMPER_C, TEMPER_L, TEMPER_S, TEMPER_T, TEMPER_U};
use crate::{N, STATE_BITS};

#[derive(Clone, Debug, PartialEq)]
pub struct SymWord {
    lanes: [BitVec; 32],
}

// Coordinate of word i, lane j in the unknown vector.
fn coord(i: usize, j: usize) -> usize {
    32 * i + 31 - j
}

// Whether the bit of c read by lane j is set.
fn lane_bit(c: u32, j: usize) -> bool {
    (c >> (31 - j)) & 1 == 1
}

impl SymWord {
    pub fn zero() -> Self {
        SymWord {
            lanes: std::array::from_fn(|_| BitVec::zeros(STATE_BITS)),
        }
    }

    /// The symbolic value of state word i.
    pub fn unit(i: usize) -> Self {
        assert!(i < N);
        SymWord {
            lanes: std::array::from_fn(|j| {
                let mut v = BitVec::zeros(STATE_BITS);
                v.set(coord(i, j), true);
                v
            }),
        }
    }

    pub fn lane(&self, j: usize) -> &BitVec {
        &self.lanes[j]
    }

    pub fn lanes(&self) -> &[BitVec; 32] {
        &self.lanes
    }

    pub fn into_lanes(self) -> [BitVec; 32] {
        self.lanes
    }

    pub fn xor(&self, other: &SymWord) -> SymWord {
        let mut w = self.clone();
        w.xor_assign(other);
        w
    }

    pub fn xor_assign(&mut self, other: &SymWord) {
        for (a, b) in self.lanes.iter_mut().zip(&other.lanes) {
            a.xor_inplace(b);
        }
    }

    /// AND with a constant: lanes where c has a zero bit are cleared.
    pub fn and(&self, c: u32) -> SymWord {
        SymWord {
            lanes: std::array::from_fn(|j| {
                if lane_bit(c, j) {
                    self.lanes[j].clone()
                } else {
                    BitVec::zeros(STATE_BITS)
                }
            }),
        }
    }

    /// Right shift: lanes move towards the least significant end.
    pub fn shr(&self, x: usize) -> SymWord {
        assert!(x < 32);
        SymWord {
            lanes: std::array::from_fn(|j| {
                if j < x {
                    BitVec::zeros(STATE_BITS)
                } else {
                    self.lanes[j - x].clone()
                }
            }),
        }
    }

    /// Left shift: lanes move towards the most significant end.
    pub fn shl(&self, x: usize) -> SymWord {
        assert!(x < 32);
        SymWord {
            lanes: std::array::from_fn(|j| {
                if j + x < 32 {
                    self.lanes[j + x].clone()
                } else {
                    BitVec::zeros(STATE_BITS)
                }
            }),
        }
    }

    /// In-place `y ^= (y >> x) & c`.
    pub fn xor_shr(&mut self, x: usize, c: u32) {
        assert!(x > 0 && x < 32);
        // Lane j reads lane j-x: go downwards so that it is still unmodified.
        for j in (x..32).rev() {
            if lane_bit(c, j) {
                let (lo, hi) = self.lanes.split_at_mut(j);
                hi[0].xor_inplace(&lo[j - x]);
            }
        }
    }

    /// In-place `y ^= (y << x) & c`.
    pub fn xor_shl(&mut self, x: usize, c: u32) {
        assert!(x > 0 && x < 32);
        for j in 0..32 - x {
            if lane_bit(c, j) {
                let (lo, hi) = self.lanes.split_at_mut(j + 1);
                lo[j].xor_inplace(&hi[x - 1]);
            }
        }
    }

    /// XOR vector v into lanes where c has a one bit.
    fn xor_where(&mut self, c: u32, v: &BitVec) {
        for j in 0..32 {
            if lane_bit(c, j) {
                self.lanes[j].xor_inplace(v);
            }
        }
    }

    /// Apply the output tempering.
    pub fn temper(&mut self) {
        self.xor_shr(TEMPER_U as usize, !0);
        self.xor_shl(TEMPER_S as usize, TEMPER_B);
        self.xor_shl(TEMPER_T as usize, TEMPER_C);
        self.xor_shr(TEMPER_L as usize, !0);
    }

    /// Concrete value of this word when the unknown vector is `state`.
    pub fn evaluate(&self, state: &BitVec) -> u32 {
        let mut res = 0;
        for (j, lane) in self.lanes.iter().enumerate() {
            let mut v = lane.clone();
            v.and_inplace(state);
            if v.count_ones() % 2 == 1 {
                res |= 1 << (31 - j);
            }
        }
        res
    }
}

/// Unknown vector corresponding to a concrete state array.
pub fn state_vector(state: &[u32; N]) -> BitVec {
    let mut v = BitVec::zeros(STATE_BITS);
    for (i, &w) in state.iter().enumerate() {
        for b in 0..32 {
            if (w >> b) & 1 == 1 {
                v.set(32 * i + b, true);
            }
        }
    }
    v
}

/// A symbolic MT19937 generator, producing the linear forms
/// of output bits in the same order as the concrete generator
/// produces outputs.
pub struct SymbolicTwister {
    state: Vec<SymWord>,
    index: usize,
    outputs: usize,
    twists: usize,
}

impl SymbolicTwister {
    pub fn new() -> Self {
        SymbolicTwister {
            state: (0..N).map(SymWord::unit).collect(),
            index: 0,
            outputs: 0,
            twists: 0,
        }
    }

    /// Number of outputs produced (or skipped) so far.
    pub fn position(&self) -> usize {
        self.outputs
    }

    pub fn twists(&self) -> usize {
        self.twists
    }

    /// Run the twist recurrence on the whole batch.
    pub fn advance(&mut self) {
        for i in 0..N {
            // Top bit of word i, 31 low bits of word i+1.
            let mut y = self.state[(i + 1) % N].clone();
            y.lanes[0] = self.state[i].lanes[0].clone();
            // The parity bit y & 1 selects whether MATRIX_A is added.
            let odd = y.lanes[31].clone();
            let mut w = self.state[(i + M) % N].xor(&y.shr(1));
            w.xor_where(MATRIX_A, &odd);
            self.state[i] = w;
        }
        self.index = 0;
        self.twists += 1;
    }

    /// Linear forms of the 32 bits of the next output,
    /// most significant bit first.
    pub fn next_word(&mut self) -> SymWord {
        if self.index >= N {
            self.advance();
        }
        let mut y = self.state[self.index].clone();
        self.index += 1;
        self.outputs += 1;
        y.temper();
        y
    }

    /// Skip an output which was not observed.
    pub fn skip_word(&mut self) {
        if self.index >= N {
            self.advance();
        }
        self.index += 1;
        self.outputs += 1;
    }
}

impl Default for SymbolicTwister {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
fn random_state(seed: u64) -> [u32; N] {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut state = [0u32; N];
    rng.fill(&mut state[..]);
    state
}

#[test]
fn test_lane_ops() {
    use crate::mt19937::temper;

    // Compare symbolic operations with concrete operations on word 3.
    let state = random_state(1);
    let sv = state_vector(&state);
    let x = state[3];
    let w = SymWord::unit(3);
    assert_eq!(w.evaluate(&sv), x);
    assert_eq!(SymWord::zero().evaluate(&sv), 0);
    for s in [1, 7, 11, 31] {
        assert_eq!(w.shr(s).evaluate(&sv), x >> s);
        assert_eq!(w.shl(s).evaluate(&sv), x << s);
    }
    for c in [0, !0, 0x9d2c5680, 0x1234_5678] {
        assert_eq!(w.and(c).evaluate(&sv), x & c);
    }
    let w2 = SymWord::unit(100);
    assert_eq!(w.xor(&w2).evaluate(&sv), x ^ state[100]);

    let mut y = w.clone();
    y.xor_shr(5, 0xf0f0_f0f0);
    assert_eq!(y.evaluate(&sv), x ^ ((x >> 5) & 0xf0f0_f0f0));
    let mut y = w.clone();
    y.xor_shl(9, 0x0ff0_0ff0);
    assert_eq!(y.evaluate(&sv), x ^ ((x << 9) & 0x0ff0_0ff0));

    let mut y = w.clone();
    y.temper();
    assert_eq!(y.evaluate(&sv), temper(x));
}

#[test]
fn test_and_per_lane() {
    // AND keeps or clears whole lanes.
    let w = SymWord::unit(0).xor(&SymWord::unit(1));
    let z = w.and(0x8000_0001);
    assert_eq!(z.lane(0), w.lane(0));
    assert_eq!(z.lane(31), w.lane(31));
    for j in 1..31 {
        assert_eq!(z.lane(j).len(), STATE_BITS);
        assert!(z.lane(j).clone().into_usizes().is_empty());
    }
    // Lane 31 of word i is bit 32i of the state.
    assert_eq!(w.lane(31).clone().into_usizes(), vec![0, 32]);
    assert_eq!(w.lane(0).clone().into_usizes(), vec![31, 63]);
}

#[test]
fn test_symbolic_outputs() {
    use crate::Mt19937;

    // Outputs of the symbolic generator evaluated on a concrete state
    // match the concrete generator across a twist.
    let state = random_state(2);
    let sv = state_vector(&state);
    let mut g = Mt19937::from_state(state, 0);
    let mut s = SymbolicTwister::new();
    for i in 0..N + 40 {
        let w = s.next_word();
        let x = g.next_u32();
        assert_eq!(w.evaluate(&sv), x, "output {i}");
    }
    assert_eq!(s.twists(), 1);
    assert_eq!(s.position(), N + 40);

    // Skipping keeps both streams aligned.
    for _ in 0..N {
        s.skip_word();
        g.next_u32();
    }
    assert_eq!(s.twists(), 2);
    for _ in 0..10 {
        assert_eq!(s.next_word().evaluate(&sv), g.next_u32());
    }
}
