// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! A state recovery session.
//!
//! The session owns a symbolic generator and a solver. Each observed
//! output consumes exactly one symbolic word, so that the n-th
//! observation is always matched with the linear forms of the n-th
//! output, and each known bit becomes one equation.

use std::time::Instant;

use crate::mt19937::Mt19937;
use crate::observation::Observation;
use crate::solver::Solver;
use crate::symbolic::SymbolicTwister;
use crate::{Error, Preferences, Verbosity, N, STATE_BITS};

pub struct Cracker {
    prefs: Preferences,
    twister: SymbolicTwister,
    solver: Solver,
    tpool: Option<rayon::ThreadPool>,
    start: Instant,
}

impl Cracker {
    pub fn new(prefs: &Preferences) -> Self {
        let tpool: Option<rayon::ThreadPool> = prefs.threads.and_then(|t| {
            if prefs.verbose(Verbosity::Info) {
                eprintln!("Using a pool of {} threads", t);
            }
            match rayon::ThreadPoolBuilder::new().num_threads(t).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    eprintln!("Cannot create thread pool: {e}");
                    None
                }
            }
        });
        Cracker {
            prefs: prefs.clone(),
            twister: SymbolicTwister::new(),
            solver: Solver::new(STATE_BITS),
            tpool,
            start: Instant::now(),
        }
    }

    /// Number of outputs consumed so far (observed or skipped).
    pub fn outputs(&self) -> usize {
        self.twister.position()
    }

    pub fn rank(&self) -> usize {
        self.solver.rank()
    }

    /// Number of independent equations still needed.
    pub fn missing(&self) -> usize {
        self.solver.missing()
    }

    /// Decode and observe a token. A malformed token is rejected
    /// before anything is consumed.
    pub fn observe_token(&mut self, token: &str) -> Result<usize, Error> {
        let obs: Observation = token.parse()?;
        self.observe(obs)
    }

    pub fn observe_u32(&mut self, x: u32) -> Result<usize, Error> {
        self.observe(Observation::full(x))
    }

    /// Observe the result of `getrandbits(k)`: the top k bits of an output.
    /// An invalid width or value is rejected before anything is consumed.
    pub fn observe_bits(&mut self, value: u32, k: u32) -> Result<usize, Error> {
        self.observe(Observation::top_bits(value, k)?)
    }

    /// Observe the next output. Returns the number of independent
    /// equations it contributed.
    pub fn observe(&mut self, obs: Observation) -> Result<usize, Error> {
        let output = self.twister.position();
        let twists = self.twister.twists();
        let t0 = Instant::now();
        if obs.known() == 0 {
            self.twister.skip_word();
        } else {
            let w = self.twister.next_word();
            if self.twister.twists() > twists && self.prefs.verbose(Verbosity::Verbose) {
                eprintln!(
                    "Symbolic twist #{} done in {:.3}s",
                    self.twister.twists(),
                    t0.elapsed().as_secs_f64()
                );
            }
            let mut added = 0;
            for (j, b) in obs.known_bits() {
                let mask = w.lane(j).clone();
                match self.solver.insert_in(mask, b, self.tpool.as_ref()) {
                    Ok(true) => added += 1,
                    Ok(false) => {}
                    Err(_) => {
                        if self.prefs.verbose(Verbosity::Info) {
                            eprintln!("Output #{output} bit {j} contradicts previous outputs");
                        }
                        return Err(Error::Inconsistent { output });
                    }
                }
            }
            if self.prefs.verbose(Verbosity::Debug) {
                eprintln!(
                    "Output #{output} ({}): +{added} equations, rank {}",
                    obs,
                    self.solver.rank()
                );
            }
            return Ok(added);
        }
        Ok(0)
    }

    /// Skip n outputs which were not observed.
    pub fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.twister.skip_word();
        }
    }

    /// The recovered state: the array from which the first observed
    /// output was tempered. Installing it with index 0 replays every
    /// observed output; installing it with index N continues after
    /// the first N outputs.
    pub fn state(&self) -> Result<[u32; N], Error> {
        self.log_summary();
        if !self.solver.is_complete() {
            return Err(Error::Insufficient {
                missing: self.solver.missing(),
            });
        }
        Ok(self.best_effort_state())
    }

    /// The minimal solution (unknown bits set to zero), which is only
    /// guaranteed correct when `missing()` is zero.
    pub fn best_effort_state(&self) -> [u32; N] {
        let mut state = [0u32; N];
        state.copy_from_slice(&self.solver.solution_words());
        state
    }

    /// A generator positioned right after the last consumed output.
    pub fn generator(&self) -> Result<Mt19937, Error> {
        let mut g = Mt19937::from_state(self.state()?, 0);
        g.discard(self.outputs());
        Ok(g)
    }

    fn log_summary(&self) {
        if self.prefs.verbose(Verbosity::Info) {
            eprintln!(
                "Collected {} independent equations from {} outputs ({} missing) in {:.3}s",
                self.solver.rank(),
                self.outputs(),
                self.solver.missing(),
                self.start.elapsed().as_secs_f64()
            );
        }
    }
}

#[cfg(test)]
fn silent() -> Preferences {
    Preferences {
        verbosity: Verbosity::Silent,
        threads: None,
    }
}

#[test]
fn test_crack_random_state() {
    use rand::{Rng, SeedableRng};

    // Any state is recovered from the N outputs it tempers to.
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let mut state = [0u32; N];
    rng.fill(&mut state[..]);
    let mut g = Mt19937::from_state(state, 0);
    let mut c = Cracker::new(&silent());
    for i in 0..N {
        assert_eq!(c.observe_u32(g.next_u32()), Ok(32));
        assert_eq!(c.missing(), STATE_BITS - 32 * (i + 1));
    }
    assert_eq!(c.state(), Ok(state));
    // Fast-forwarded generator continues the stream.
    let mut h = c.generator().unwrap();
    for _ in 0..2 * N {
        assert_eq!(h.next_u32(), g.next_u32());
    }
}

#[test]
fn test_deficiency() {
    // 24 and 16 known bits per output: outputs of a batch give
    // independent equations on disjoint words.
    let mut g = Mt19937::new(5489);
    let mut c8 = Cracker::new(&silent());
    let mut c16 = Cracker::new(&silent());
    for _ in 0..N {
        let x = g.next_u32();
        let t = format!("{:032b}", x);
        c8.observe_token(&format!("{}{}", &t[..24], "x".repeat(8)))
            .unwrap();
        c16.observe_token(&format!("{}{}", &t[..16], "x".repeat(16)))
            .unwrap();
    }
    assert_eq!(c8.missing(), STATE_BITS - 24 * N);
    assert_eq!(c16.missing(), STATE_BITS - 16 * N);
    assert_eq!(
        c16.state(),
        Err(Error::Insufficient {
            missing: STATE_BITS - 16 * N
        })
    );
    assert!(c16.generator().is_err());
}

#[test]
fn test_trailing_unknown() {
    // With 2 unknown bits per output, 2 batches pin down everything
    // except low bits of word 0, which never influence later outputs.
    let mut g = Mt19937::new(5489);
    let mut c = Cracker::new(&silent());
    let mut outs = vec![];
    for _ in 0..2 * N {
        let x = g.next_u32();
        outs.push(x);
        let obs = Observation::top_bits(x >> 2, 30).unwrap();
        c.observe(obs).unwrap();
    }
    assert!(c.missing() < 32, "missing {}", c.missing());
    let state = c.best_effort_state();
    let mut h = Mt19937::from_state(state, 0);
    for (i, &x) in outs.iter().enumerate() {
        let y = h.next_u32();
        if i > 0 {
            assert_eq!(y, x, "output {i}");
        } else {
            assert_eq!(y >> 2, x >> 2);
        }
    }
    for _ in 0..N {
        assert_eq!(h.next_u32(), g.next_u32());
    }
}

#[test]
fn test_getrandbits_and_skip() {
    // getrandbits(8) outputs interleaved with unobserved outputs,
    // then full outputs until the state is determined.
    let mut g = Mt19937::new(1);
    let mut c = Cracker::new(&silent());
    assert_eq!(c.observe_u32(g.next_u32()), Ok(32));
    for i in 1..200 {
        if i % 3 == 0 {
            g.next_u32();
            c.skip(1);
        } else {
            let b = g.getrandbits(8);
            assert_eq!(c.observe_bits(b, 8), Ok(8));
        }
    }
    assert_eq!(c.outputs(), 200);
    assert_eq!(c.rank(), 32 + 8 * 133);
    // A misaligned stream would be inconsistent.
    for _ in 200..2 * N {
        c.observe_u32(g.next_u32()).unwrap();
    }
    assert_eq!(c.missing(), 0);
    let mut h = c.generator().unwrap();
    for _ in 0..N {
        assert_eq!(h.next_u32(), g.next_u32());
    }
}

#[test]
fn test_malformed_token() {
    let mut c = Cracker::new(&silent());
    c.observe_u32(12345).unwrap();
    let bad = format!("xx1{}", "x".repeat(29));
    assert!(matches!(c.observe_token(&bad), Err(Error::Malformed(_))));
    assert_eq!(c.outputs(), 1);
    assert_eq!(c.rank(), 32);
    // Only trailing unknown bits count.
    assert_eq!(c.observe_token(&"x".repeat(32)), Ok(0));
    assert_eq!(c.outputs(), 2);
}

#[test]
fn test_malformed_bits() {
    use crate::observation::ParseError;

    let mut c = Cracker::new(&silent());
    assert_eq!(c.observe_bits(0xab, 8), Ok(8));
    assert_eq!(
        c.observe_bits(300, 8),
        Err(Error::Malformed(ParseError::Overflow(300, 8)))
    );
    assert_eq!(
        c.observe_bits(1, 33),
        Err(Error::Malformed(ParseError::Width(33)))
    );
    assert_eq!(c.outputs(), 1);
    assert_eq!(c.rank(), 8);
    assert_eq!(c.observe_bits(0, 0), Ok(0));
    assert_eq!(c.outputs(), 2);
}

#[test]
fn test_inconsistent() {
    let mut g = Mt19937::new(99);
    let mut c = Cracker::new(&silent());
    for _ in 0..N {
        c.observe_u32(g.next_u32()).unwrap();
    }
    // The state is known: a consistent output adds nothing,
    // a wrong output is reported.
    assert_eq!(c.observe_u32(g.next_u32()), Ok(0));
    let x = g.next_u32();
    assert_eq!(
        c.observe_u32(x ^ 0x100),
        Err(Error::Inconsistent { output: N + 1 })
    );
    assert_eq!(c.rank(), STATE_BITS);
}

#[test]
fn test_threads() {
    let prefs = Preferences {
        verbosity: Verbosity::Silent,
        threads: Some(2),
    };
    let mut g = Mt19937::new(7);
    let mut c = Cracker::new(&prefs);
    for _ in 0..N {
        c.observe_u32(g.next_u32()).unwrap();
    }
    assert_eq!(&c.state().unwrap(), g.state());
}
