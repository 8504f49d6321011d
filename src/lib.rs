// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Recovery of the internal state of a 32-bit Mersenne Twister
//! (MT19937) from a sequence of its outputs, some of which may have
//! unknown trailing bits.
//!
//! Every output bit is a GF(2)-linear function of the 19968 bits of the
//! state array. The symbolic generator computes these linear functions
//! by running the twist and tempering on vectors of coefficients instead
//! of bits, and the solver accumulates the resulting equations in reduced
//! echelon form until the state is determined.

use std::fmt;
use std::str::FromStr;

pub mod cracker;
pub mod mt19937;
pub mod observation;
pub mod solver;
pub mod symbolic;

pub use cracker::Cracker;
pub use mt19937::Mt19937;
pub use observation::Observation;

/// Number of 32-bit words in the generator state.
pub const N: usize = 624;

/// Number of unknown bits (dimension of the GF(2) vector space).
pub const STATE_BITS: usize = 32 * N;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    Info,
    Verbose,
    Debug,
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "silent" => Ok(Verbosity::Silent),
            "info" => Ok(Verbosity::Info),
            "verbose" => Ok(Verbosity::Verbose),
            "debug" => Ok(Verbosity::Debug),
            _ => Err(format!("invalid verbosity {s:?}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Preferences {
    pub verbosity: Verbosity,
    // Size of the thread pool used for back-substitution.
    pub threads: Option<usize>,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            verbosity: Verbosity::Info,
            threads: None,
        }
    }
}

impl Preferences {
    pub fn verbose(&self, v: Verbosity) -> bool {
        self.verbosity >= v
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An observation token could not be decoded.
    Malformed(observation::ParseError),
    /// The collected equations do not determine the state yet.
    Insufficient { missing: usize },
    /// Output number `output` (counting from 0) contradicts
    /// the previous observations.
    Inconsistent { output: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Malformed(e) => write!(f, "malformed observation: {e}"),
            Error::Insufficient { missing } => {
                write!(f, "{missing} bits of more information are required")
            }
            Error::Inconsistent { output } => {
                write!(f, "output #{output} is inconsistent with previous outputs")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<observation::ParseError> for Error {
    fn from(e: observation::ParseError) -> Self {
        Error::Malformed(e)
    }
}

/// Recover the generator state from a sequence of observation tokens
/// (32 characters over `0`, `1` and trailing `x`).
///
/// The result is the state array from which the first token was tempered:
/// see [`Cracker::state`].
pub fn crack<I, S>(tokens: I, prefs: &Preferences) -> Result<[u32; N], Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut c = Cracker::new(prefs);
    for t in tokens {
        c.observe_token(t.as_ref())?;
    }
    c.state()
}

#[test]
fn test_crack_default_seed() {
    // Canonical seed: first 624 outputs determine the twisted array.
    let mut rng = Mt19937::new(5489);
    let tokens: Vec<String> = (0..N).map(|_| format!("{:032b}", rng.next_u32())).collect();
    let prefs = Preferences {
        verbosity: Verbosity::Silent,
        threads: None,
    };
    let state = crack(&tokens, &prefs).unwrap();
    assert_eq!(&state, rng.state());
    assert_eq!(rng.index(), N);

    // Outputs 625..1248 are reproduced by a generator installed
    // at the recovered state with index N.
    let mut replay = Mt19937::from_state(state, N);
    for _ in 0..N {
        assert_eq!(replay.next_u32(), rng.next_u32());
    }
}

#[test]
fn test_crack_errors() {
    let prefs = Preferences {
        verbosity: Verbosity::Silent,
        threads: None,
    };
    let mut rng = Mt19937::new(5489);
    let mut tokens: Vec<String> = (0..10).map(|_| format!("{:032b}", rng.next_u32())).collect();
    assert_eq!(
        crack(&tokens, &prefs),
        Err(Error::Insufficient {
            missing: STATE_BITS - 320
        })
    );
    tokens.push("0101x1".to_string());
    assert!(matches!(crack(&tokens, &prefs), Err(Error::Malformed(_))));

    let e = Error::Insufficient { missing: 42 };
    assert_eq!(e.to_string(), "42 bits of more information are required");
    assert_eq!(Verbosity::from_str("verbose"), Ok(Verbosity::Verbose));
    assert!(Verbosity::from_str("loud").is_err());
    assert!(Preferences::default().verbose(Verbosity::Info));
    assert!(!Preferences::default().verbose(Verbosity::Debug));
}
