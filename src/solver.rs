// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Incremental Gauss-Jordan elimination over GF(2).
//!
//! Equations (mask, value) mean that the XOR of unknowns selected
//! by mask equals value. They are kept in reduced row echelon form:
//! - each stored equation has a pivot, its lowest set coordinate
//! - a pivot appears in no other stored equation.
//!
//! A new equation is reduced by the equations whose pivots it contains
//! (in reduced form, adding one of them cannot bring back another pivot).
//! If something is left, its lowest coordinate becomes a new pivot and
//! is eliminated from the other equations.
//!
//! A full system of size 19968 uses 50MB of memory.

use bitvec_simd::BitVec;
use rayon::prelude::*;

/// The equation reduced to 0 = 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contradiction;

#[derive(Clone, Debug)]
struct Equation {
    pivot: usize,
    mask: BitVec,
    value: bool,
}

pub struct Solver {
    dim: usize,
    eqs: Vec<Equation>,
    // pivots[i] is the index of the equation with pivot i.
    pivots: Vec<Option<usize>>,
}

impl Solver {
    pub fn new(dim: usize) -> Self {
        Solver {
            dim,
            eqs: vec![],
            pivots: vec![None; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of independent equations.
    pub fn rank(&self) -> usize {
        self.eqs.len()
    }

    /// Number of independent equations still needed.
    pub fn missing(&self) -> usize {
        self.dim.saturating_sub(self.eqs.len())
    }

    pub fn is_complete(&self) -> bool {
        self.eqs.len() == self.dim
    }

    /// Insert an equation. Returns whether the rank increased.
    /// A contradicting equation is not inserted.
    pub fn insert(&mut self, mask: BitVec, value: bool) -> Result<bool, Contradiction> {
        self.insert_in(mask, value, None)
    }

    pub fn insert_in(
        &mut self,
        mut mask: BitVec,
        mut value: bool,
        tpool: Option<&rayon::ThreadPool>,
    ) -> Result<bool, Contradiction> {
        assert_eq!(mask.len(), self.dim);
        // Eliminate
        for idx in mask.clone().into_usizes() {
            if let Some(e) = self.pivots[idx] {
                let eq = &self.eqs[e];
                mask.xor_inplace(&eq.mask);
                value ^= eq.value;
            }
        }
        let p = match lowest_set(&mask) {
            Some(p) => p,
            None => {
                // Linearly dependent.
                if value {
                    return Err(Contradiction);
                }
                return Ok(false);
            }
        };
        // Back-substitute
        let backsub = |eq: &mut Equation| {
            if eq.mask[p] {
                eq.mask.xor_inplace(&mask);
                eq.value ^= value;
            }
        };
        match tpool {
            Some(pool) => pool.install(|| self.eqs.par_iter_mut().for_each(backsub)),
            None => self.eqs.iter_mut().for_each(backsub),
        }
        self.pivots[p] = Some(self.eqs.len());
        self.eqs.push(Equation {
            pivot: p,
            mask,
            value,
        });
        Ok(true)
    }

    /// A solution of the system where all free unknowns are zero.
    /// It is the unique solution if the system is complete.
    pub fn solution(&self) -> BitVec {
        let mut x = BitVec::zeros(self.dim);
        for eq in &self.eqs {
            if eq.value {
                x.set(eq.pivot, true);
            }
        }
        x
    }

    /// The solution packed into 32-bit words (coordinate 32i+b
    /// is bit b of word i).
    pub fn solution_words(&self) -> Vec<u32> {
        let mut words = vec![0u32; (self.dim + 31) / 32];
        for eq in &self.eqs {
            if eq.value {
                words[eq.pivot / 32] |= 1 << (eq.pivot % 32);
            }
        }
        words
    }
}

/// Index of the lowest set coordinate, None for the zero vector.
fn lowest_set(v: &BitVec) -> Option<usize> {
    v.clone().into_usizes().first().copied()
}

#[cfg(test)]
fn make_vec(dim: usize, idx: &[usize]) -> BitVec {
    let mut v = BitVec::zeros(dim);
    for &i in idx {
        v.set(i, !v[i]);
    }
    v
}

#[cfg(test)]
fn check_reduced(s: &Solver) {
    for (e, eq) in s.eqs.iter().enumerate() {
        assert!(eq.mask[eq.pivot]);
        let set = eq.mask.clone().into_usizes();
        assert_eq!(set.iter().min(), Some(&eq.pivot));
        assert_eq!(s.pivots[eq.pivot], Some(e));
        for other in &s.eqs {
            if other.pivot != eq.pivot {
                assert!(!other.mask[eq.pivot]);
            }
        }
    }
}

#[test]
fn test_solver_small() {
    // x0 + x1 = 1, x1 + x2 = 0, x0 + x2 = 1 (dependent), x2 = 1
    let mut s = Solver::new(4);
    assert_eq!(s.insert(make_vec(4, &[0, 1]), true), Ok(true));
    assert_eq!(s.insert(make_vec(4, &[1, 2]), false), Ok(true));
    assert_eq!(s.insert(make_vec(4, &[0, 2]), true), Ok(false));
    assert_eq!(s.rank(), 2);
    assert_eq!(s.missing(), 2);
    check_reduced(&s);
    // Free unknowns x2, x3 are zero: x0 = 1, x1 = 0
    assert_eq!(s.solution(), make_vec(4, &[0]));
    assert_eq!(s.insert(make_vec(4, &[2]), true), Ok(true));
    assert_eq!(s.insert(make_vec(4, &[3]), false), Ok(true));
    assert!(s.is_complete());
    check_reduced(&s);
    assert_eq!(s.solution(), make_vec(4, &[1, 2]));
    assert_eq!(s.solution_words(), vec![0b0110]);
}

#[test]
fn test_solver_contradiction() {
    let mut s = Solver::new(8);
    s.insert(make_vec(8, &[1, 5]), true).unwrap();
    s.insert(make_vec(8, &[5, 7]), false).unwrap();
    assert_eq!(
        s.insert(make_vec(8, &[1, 7]), false),
        Err(Contradiction)
    );
    // The zero equation 0 = 1 is also a contradiction.
    assert_eq!(s.insert(make_vec(8, &[]), true), Err(Contradiction));
    assert_eq!(s.insert(make_vec(8, &[]), false), Ok(false));
    assert_eq!(s.rank(), 2);
    check_reduced(&s);
}

#[test]
fn test_solver_random() {
    use rand::{Rng, SeedableRng};

    // Random equations satisfied by a random vector: rank grows
    // monotonically up to dim, then the solution is the vector.
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let dim = 300;
    let x: Vec<bool> = (0..dim).map(|_| rng.gen()).collect();
    let mut s = Solver::new(dim);
    let mut rank = 0;
    let mut inserted = vec![];
    while !s.is_complete() {
        let density = rng.gen_range(1..20);
        let idx: Vec<usize> = (0..density).map(|_| rng.gen_range(0..dim)).collect();
        let mask = make_vec(dim, &idx);
        let value = idx.iter().fold(false, |acc, &i| acc ^ x[i]);
        let grew = s.insert(mask.clone(), value).unwrap();
        assert_eq!(s.rank(), if grew { rank + 1 } else { rank });
        assert_eq!(s.missing(), dim - s.rank());
        rank = s.rank();
        inserted.push((mask, value));
    }
    check_reduced(&s);
    let sol = s.solution();
    for i in 0..dim {
        assert_eq!(sol[i], x[i]);
    }
    // Reinsertion changes nothing.
    for (mask, value) in inserted.into_iter().take(100) {
        assert_eq!(s.insert(mask, value), Ok(false));
    }
    assert_eq!(s.rank(), dim);
}

#[test]
fn test_solver_idempotent() {
    let dim = 64;
    let mut s = Solver::new(dim);
    let m1 = make_vec(dim, &[3, 10, 40]);
    let m2 = make_vec(dim, &[10, 63]);
    s.insert(m1.clone(), true).unwrap();
    s.insert(m2.clone(), false).unwrap();
    let before: Vec<(usize, BitVec, bool)> = s
        .eqs
        .iter()
        .map(|e| (e.pivot, e.mask.clone(), e.value))
        .collect();
    assert_eq!(s.insert(m1, true), Ok(false));
    assert_eq!(s.insert(m2, false), Ok(false));
    let after: Vec<(usize, BitVec, bool)> = s
        .eqs
        .iter()
        .map(|e| (e.pivot, e.mask.clone(), e.value))
        .collect();
    assert_eq!(before, after);
    assert_eq!(s.missing(), dim - 2);
}

#[test]
fn test_solver_threads() {
    use rand::{Rng, SeedableRng};

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(2)
        .build()
        .unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(2);
    let dim = 200;
    let mut s1 = Solver::new(dim);
    let mut s2 = Solver::new(dim);
    for _ in 0..150 {
        let idx: Vec<usize> = (0..8).map(|_| rng.gen_range(0..dim)).collect();
        let value: bool = rng.gen();
        let r1 = s1.insert(make_vec(dim, &idx), value);
        let r2 = s2.insert_in(make_vec(dim, &idx), value, Some(&pool));
        assert_eq!(r1, r2);
    }
    check_reduced(&s2);
    assert_eq!(s1.rank(), s2.rank());
    assert_eq!(s1.solution(), s2.solution());
}

#[test]
fn test_solver_pivots() {
    use rand::{Rng, SeedableRng};

    // A single equation x0 = 1 pins exactly x0.
    let dim = 1000;
    let mut s = Solver::new(dim);
    assert_eq!(s.insert(make_vec(dim, &[0]), true), Ok(true));
    assert_eq!(s.eqs[0].pivot, 0);
    assert_eq!(s.solution().into_usizes(), vec![0]);
    // Coordinates near the end of a partial last block.
    assert_eq!(s.insert(make_vec(dim, &[997, 999]), true), Ok(true));
    assert_eq!(s.eqs[1].pivot, 997);
    assert_eq!(s.insert(make_vec(dim, &[999]), false), Ok(true));
    check_reduced(&s);
    assert_eq!(s.solution().into_usizes(), vec![0, 997]);

    // Pivots are the lowest set coordinate of each stored equation,
    // and the rank never exceeds the dimension.
    let mut rng = rand::rngs::StdRng::seed_from_u64(5);
    let mut s = Solver::new(dim);
    for _ in 0..1200 {
        let density = rng.gen_range(1..6);
        let idx: Vec<usize> = (0..density).map(|_| rng.gen_range(0..dim)).collect();
        let _ = s.insert(make_vec(dim, &idx), rng.gen());
        assert!(s.rank() <= dim);
        assert_eq!(s.missing(), dim - s.rank());
    }
    assert!(s.rank() > dim / 2, "rank {}", s.rank());
    check_reduced(&s);
    for eq in &s.eqs {
        assert!(eq.mask[eq.pivot]);
        assert_eq!(eq.mask.clone().into_usizes()[0], eq.pivot);
    }
}
