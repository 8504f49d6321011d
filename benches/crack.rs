use std::time::Duration;

use brunch::Bench;
use mtcrack::solver::Solver;
use mtcrack::symbolic::{SymWord, SymbolicTwister};
use mtcrack::{Mt19937, Observation, STATE_BITS};

fn main() {
    let mut g = Mt19937::new(5489);
    let outputs: Vec<u32> = (0..1000).map(|_| g.next_u32()).collect();

    brunch::benches! {
        inline:
        // Concrete generator
        Bench::new("mt19937 init + 624 outputs")
        .run_seeded(1, |seed| {
            let mut g = Mt19937::new(seed);
            (0..624).fold(0, |acc, _| acc ^ g.next_u32())
        }),
        {
            let tok = format!("{:030b}xx", outputs[0] >> 2);
            Bench::new("parse observation")
            .run_seeded(tok, |t| t.parse::<Observation>())
        },
        // Symbolic generator
        {
            let w = SymWord::unit(17);
            Bench::new("symbolic temper")
            .run_seeded(w, |mut w| { w.temper(); w })
        },
        Bench::new("symbolic init + twist (624 words)")
        .with_samples(100)
        .with_timeout(Duration::from_secs(30))
        .run(|| {
            let mut s = SymbolicTwister::new();
            s.advance();
            s.twists()
        }),
        // Solver
        {
            let mut s = SymbolicTwister::new();
            let words: Vec<SymWord> = (0..64).map(|_| s.next_word()).collect();
            Bench::new("solver insert 64 full outputs")
            .with_samples(100)
            .run_seeded(&words, |words| {
                let mut sv = Solver::new(STATE_BITS);
                for (w, &x) in words.iter().zip(&outputs) {
                    for j in 0..32 {
                        let b = (x >> (31 - j)) & 1 == 1;
                        sv.insert(w.lane(j).clone(), b).unwrap();
                    }
                }
                sv.rank()
            })
        },
    }
}
