//! Write a synthetic catalogue / random / ideal trio for trying out `sspf`.
//!
//! `generate_sample [DIR] [N]` writes `catalogue.parquet`, `random.parquet`
//! and `ideal.parquet` with `N` objects each (default 1000) into `DIR`
//! (default the current directory).

use std::path::PathBuf;

use anyhow::{Context, Result};
use sspf::data::model::{Dataset, TableMeta, Value};
use sspf::data::writer::write_table;

/// Objects brighter than this in H-alpha count as targets.
const TARGET_HAFLUX: f64 = 8e-16;
const TARGET_Z: (f64, f64) = (0.6, 1.6);

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Object {
    id: i64,
    z: f64,
    kind: &'static str,
    haflux: f64,
}

impl Object {
    fn is_target(&self) -> bool {
        self.kind == "ELG"
            && self.haflux > TARGET_HAFLUX
            && (TARGET_Z.0..TARGET_Z.1).contains(&self.z)
    }

    fn row(&self, z: f64) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Float(z),
            Value::from(self.kind),
            Value::Float(self.haflux),
        ]
    }
}

fn columns() -> Vec<String> {
    ["ID", "z", "type", "Haflux"].map(String::from).to_vec()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    let n: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("'{n}' is not a row count"))?,
        None => 1000,
    };

    let mut rng = SimpleRng::new(42);
    let kinds = ["ELG", "ELG", "LRG", "QSO"];

    let objects: Vec<Object> = (0..n)
        .map(|i| Object {
            id: i as i64 + 1,
            z: rng.uniform(0.0, 2.0),
            kind: kinds[(rng.next_u64() % kinds.len() as u64) as usize],
            haflux: rng.gauss(8e-16, 4e-16).max(0.0),
        })
        .collect();

    // The catalogue and random tables carry photometric redshifts; the ideal
    // table keeps the true ones and only lists targets.
    let catalogue = Dataset::new(
        columns(),
        objects.iter().map(|o| o.row(o.z + rng.gauss(0.0, 0.05))).collect(),
    );
    let random = Dataset::new(
        columns(),
        objects.iter().map(|o| o.row(o.z + rng.gauss(0.0, 0.05))).collect(),
    );
    let ideal = Dataset::new(
        columns(),
        objects.iter().filter(|o| o.is_target()).map(|o| o.row(o.z)).collect(),
    );

    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    for (name, dataset) in [
        ("catalogue.parquet", &catalogue),
        ("random.parquet", &random),
        ("ideal.parquet", &ideal),
    ] {
        let path = dir.join(name);
        write_table(dataset, &TableMeta::new(), &path)?;
        println!("Wrote {} objects to {}", dataset.len(), path.display());
    }

    Ok(())
}
