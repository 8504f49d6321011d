// Copyright 2022 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Recover MT19937 state from observed outputs.
//!
//! Input is a whitespace-separated list of 32-character tokens,
//! most significant bit first, where trailing unknown bits are
//! written as 'x'. The recovered state (624 words, to be installed
//! with index 0 before the first observed output) is printed on
//! standard output, or the next outputs if --predict is given.

use std::io::Read;
use std::str::FromStr;

use mtcrack::{Cracker, Preferences, Verbosity};

fn main() {
    let arg = arguments::parse(std::env::args()).unwrap();
    if arg.get::<bool>("help").is_some() || arg.orphans.len() > 1 {
        eprintln!("Usage: mtcrack [OPTIONS] [FILE]");
        eprintln!("");
        eprintln!("Options:");
        eprintln!("  --help                    show this help");
        eprintln!("  --verbose LEVEL           verbosity level (silent, info, verbose, debug)");
        eprintln!("  --threads N               use N threads for elimination");
        eprintln!("  --predict K               print the K outputs following the input");
        return;
    }
    let v = arg.get::<String>("verbose").unwrap_or("info".into());
    let verbosity = Verbosity::from_str(&v).unwrap();
    let threads = arg.get::<usize>("threads");
    let predict = arg.get::<usize>("predict");

    let mut input = String::new();
    let res = match arg.orphans.first() {
        Some(path) => std::fs::File::open(path).and_then(|mut f| f.read_to_string(&mut input)),
        None => std::io::stdin().read_to_string(&mut input),
    };
    if let Err(e) = res {
        eprintln!("Cannot read input: {e}");
        std::process::exit(1);
    }

    let prefs = Preferences { verbosity, threads };
    let mut c = Cracker::new(&prefs);
    for (i, token) in input.split_whitespace().enumerate() {
        if let Err(e) = c.observe_token(token) {
            eprintln!("Token #{i}: {e}");
            std::process::exit(1);
        }
    }
    if let Some(k) = predict {
        let mut g = match c.generator() {
            Ok(g) => g,
            Err(e) => {
                eprintln!("ERROR {e}");
                std::process::exit(1);
            }
        };
        for _ in 0..k {
            println!("{}", g.next_u32());
        }
        return;
    }
    match c.state() {
        Ok(state) => {
            for w in state {
                println!("{}", w);
            }
        }
        Err(e) => {
            eprintln!("ERROR {e}");
            std::process::exit(1);
        }
    }
}
