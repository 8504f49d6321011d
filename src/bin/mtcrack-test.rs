// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Random mtcrack testing.
//!
//! This program seeds generators randomly, hides trailing bits
//! of their outputs and checks that the recovered state predicts
//! the following outputs, for test and benchmark purposes.

use std::time::Instant;

use rand::Rng;

use mtcrack::{Cracker, Mt19937, Preferences, Verbosity, N};

fn main() {
    let arg = arguments::parse(std::env::args()).unwrap();
    if arg.get::<bool>("help").is_some() {
        eprintln!("Usage: mtcrack-test [OPTIONS]");
        eprintln!("");
        eprintln!("Options:");
        eprintln!("  --help                    show this help");
        eprintln!("  --unknown K               number of unknown trailing bits (default 0)");
        eprintln!("  --words W                 number of observed outputs");
        eprintln!("  --count C                 stop after C tests");
        eprintln!("  --threads N               use N threads for elimination");
        return;
    }
    let unknown = arg.get::<u32>("unknown").unwrap_or(0);
    assert!(unknown < 32);
    // Full outputs need a single batch, truncated outputs need more.
    let default_words = if unknown == 0 { N } else { 2 * N };
    let words = arg.get::<usize>("words").unwrap_or(default_words);
    let count = arg.get::<usize>("count");
    let threads = arg.get::<usize>("threads");
    let prefs = Preferences {
        verbosity: Verbosity::Silent,
        threads,
    };

    let mut rng = rand::thread_rng();
    let mut i = 0;
    let t0 = Instant::now();
    while count.map_or(true, |c| i < c) {
        let seed: u32 = rng.gen();
        let mut g = Mt19937::new(seed);
        let mut c = Cracker::new(&prefs);
        let known = 32 - unknown;
        for _ in 0..words {
            let x = g.next_u32();
            if let Err(e) = c.observe_bits(x >> unknown, known) {
                eprintln!("ERROR seed={seed}: {e}");
                std::process::exit(1);
            }
        }
        // Unobserved low bits of the first word never influence
        // later outputs and cannot be determined.
        if c.missing() > unknown as usize {
            eprintln!("seed={seed}: {} bits missing", c.missing());
        }
        let mut h = Mt19937::from_state(c.best_effort_state(), 0);
        h.discard(words);
        for k in 0..N {
            let (x, y) = (g.next_u32(), h.next_u32());
            if x != y {
                eprintln!("ERROR seed={seed} prediction #{k} {y} != {x}");
                std::process::exit(1);
            }
        }
        i += 1;
        let elapsed = t0.elapsed().as_secs_f64();
        let avg = elapsed / (i as f64);
        eprintln!("Processed {i} generators in {elapsed:.3}s (average {avg:.3}s)");
    }
}
