// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Timing of complete state recoveries.
//!
//! For each number of unknown trailing bits, outputs of a generator
//! are observed until no more equations are gained, and the time
//! spent in symbolic execution and elimination is reported.

use std::time::Instant;

use mtcrack::{Cracker, Mt19937, Preferences, Verbosity, N};

fn main() {
    let prefs = Preferences {
        verbosity: Verbosity::Silent,
        threads: None,
    };
    for unknown in [0, 1, 2, 4, 8, 12, 16] {
        let known = 32 - unknown;
        let mut g = Mt19937::new(5489 + unknown);
        let mut c = Cracker::new(&prefs);
        let start = Instant::now();
        // Stop after a batch without new equations.
        let mut batch_gain = 1;
        while batch_gain > 0 && c.outputs() < 8 * N {
            batch_gain = 0;
            for _ in 0..N {
                let x = g.next_u32();
                batch_gain += c.observe_bits(x >> unknown, known).unwrap();
            }
        }
        eprintln!(
            "unknown={} outputs={} rank={} missing={} in {:.3}s",
            unknown,
            c.outputs(),
            c.rank(),
            c.missing(),
            start.elapsed().as_secs_f64()
        );
    }
}
