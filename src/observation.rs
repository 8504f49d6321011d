// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Decoding of observed output words.
//!
//! An observation is written as 32 characters, most significant bit
//! first, where `x` marks an unknown bit. Unknown bits must form
//! a trailing run: this is what a truncated output (for example
//! `getrandbits(k)` with k < 32) looks like, and it keeps every
//! known bit usable as an exact linear equation.

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    // Known bits are the top `known` bits of value, other bits are zero.
    value: u32,
    known: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Token does not have 32 characters.
    Length(usize),
    /// Invalid character at given position.
    Char(usize, char),
    /// A known bit at given position follows an unknown bit.
    UnknownNotTrailing(usize),
    /// More than 32 known bits.
    Width(u32),
    /// Value does not fit in the given number of bits.
    Overflow(u32, u32),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Length(l) => write!(f, "expected 32 characters, got {l}"),
            ParseError::Char(i, c) => write!(f, "invalid character {c:?} at position {i}"),
            ParseError::UnknownNotTrailing(i) => {
                write!(f, "known bit at position {i} follows an unknown bit")
            }
            ParseError::Width(k) => write!(f, "cannot observe {k} bits of a 32-bit output"),
            ParseError::Overflow(v, k) => write!(f, "value {v} exceeds {k} bits"),
        }
    }
}

impl std::error::Error for ParseError {}

impl Observation {
    pub fn full(value: u32) -> Self {
        Observation { value, known: 32 }
    }

    /// An observation of the top k bits of an output:
    /// `value` is a k-bit integer.
    pub fn top_bits(value: u32, k: u32) -> Result<Self, ParseError> {
        if k > 32 {
            return Err(ParseError::Width(k));
        }
        if k == 0 {
            if value != 0 {
                return Err(ParseError::Overflow(value, k));
            }
            return Ok(Self::unknown());
        }
        if k < 32 && value >> k != 0 {
            return Err(ParseError::Overflow(value, k));
        }
        Ok(Observation {
            value: value << (32 - k),
            known: k,
        })
    }

    pub fn unknown() -> Self {
        Observation { value: 0, known: 0 }
    }

    /// Number of known bits.
    pub fn known(&self) -> u32 {
        self.known
    }

    /// Value of bit lane `j` (0 is the most significant bit).
    pub fn bit(&self, j: usize) -> Option<bool> {
        assert!(j < 32);
        if (j as u32) < self.known {
            Some((self.value >> (31 - j)) & 1 == 1)
        } else {
            None
        }
    }

    /// Iterate over (lane, bit) for known bits, most significant first.
    pub fn known_bits(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        (0..self.known as usize).map(move |j| (j, (self.value >> (31 - j)) & 1 == 1))
    }
}

impl FromStr for Observation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 32 {
            return Err(ParseError::Length(chars.len()));
        }
        let mut value = 0u32;
        let mut known = 0u32;
        for (i, &c) in chars.iter().enumerate() {
            let b = match c {
                '0' => 0,
                '1' => 1,
                'x' => continue,
                _ => return Err(ParseError::Char(i, c)),
            };
            if known as usize != i {
                return Err(ParseError::UnknownNotTrailing(i));
            }
            value |= b << (31 - i);
            known += 1;
        }
        Ok(Observation { value, known })
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for j in 0..32 {
            let c = match self.bit(j) {
                Some(true) => '1',
                Some(false) => '0',
                None => 'x',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[test]
fn test_parse() {
    let o: Observation = "10000000000000000000000000000011".parse().unwrap();
    assert_eq!(o, Observation::full(0x8000_0003));
    assert_eq!(o.known(), 32);

    let o: Observation = "1011xxxxxxxxxxxxxxxxxxxxxxxxxxxx".parse().unwrap();
    assert_eq!(o, Observation::top_bits(0b1011, 4).unwrap());
    assert_eq!(o.bit(0), Some(true));
    assert_eq!(o.bit(1), Some(false));
    assert_eq!(o.bit(4), None);
    assert_eq!(
        o.known_bits().collect::<Vec<_>>(),
        vec![(0, true), (1, false), (2, true), (3, true)]
    );

    let o: Observation = "x".repeat(32).parse().unwrap();
    assert_eq!(o, Observation::unknown());
    assert_eq!(o.known_bits().count(), 0);
}

#[test]
fn test_parse_errors() {
    let bad = format!("xx1{}", "x".repeat(29));
    assert_eq!(
        bad.parse::<Observation>(),
        Err(ParseError::UnknownNotTrailing(2))
    );
    let bad = format!("0x{}", "0".repeat(30));
    assert_eq!(
        bad.parse::<Observation>(),
        Err(ParseError::UnknownNotTrailing(2))
    );
    assert_eq!("0101".parse::<Observation>(), Err(ParseError::Length(4)));
    assert_eq!(
        "1".repeat(33).parse::<Observation>(),
        Err(ParseError::Length(33))
    );
    let bad = format!("01?{}", "0".repeat(29));
    assert_eq!(bad.parse::<Observation>(), Err(ParseError::Char(2, '?')));
}

#[test]
fn test_top_bits() {
    assert_eq!(Observation::top_bits(0, 0), Ok(Observation::unknown()));
    assert_eq!(
        Observation::top_bits(u32::MAX, 32),
        Ok(Observation::full(u32::MAX))
    );
    assert_eq!(
        Observation::top_bits(0xff, 8).map(|o| o.to_string()),
        Ok(format!("11111111{}", "x".repeat(24)))
    );
    assert_eq!(Observation::top_bits(256, 8), Err(ParseError::Overflow(256, 8)));
    assert_eq!(Observation::top_bits(1, 0), Err(ParseError::Overflow(1, 0)));
    assert_eq!(Observation::top_bits(1, 33), Err(ParseError::Width(33)));
}

#[test]
fn test_display() {
    for s in [
        "01010101010101010101010101010101",
        "110xxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        "1111111111111111111111111111111x",
        "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
    ] {
        let o: Observation = s.parse().unwrap();
        assert_eq!(o.to_string(), s);
    }
    assert_eq!(
        Observation::top_bits(1, 1).unwrap().to_string(),
        format!("1{}", "x".repeat(31))
    );
}
