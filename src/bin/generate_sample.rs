//! Writes synthetic TWA measurement files for trying out the analyzer.
//!
//! Usage: `generate_sample [output_dir]` (default `data/input`).

use std::f64::consts::PI;
use std::path::PathBuf;

use anyhow::{Context, Result};

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std_dev * z
    }
}

/// One synthetic sample: diffusivity [m²/s], thickness [µm], stage position [µm].
struct Sample {
    name: String,
    alpha: f64,
    thickness_um: f64,
    position: (f64, f64, f64),
}

/// Fold a phase into (-π/2, π/2] like the lock-in reports it.
fn wrap_phase(phase: f64) -> f64 {
    let wrapped = (phase + PI / 2.0).rem_euclid(PI) - PI / 2.0;
    if wrapped <= -PI / 2.0 {
        wrapped + PI
    } else {
        wrapped
    }
}

fn render(sample: &Sample, rng: &mut SimpleRng) -> String {
    let d = sample.thickness_um * 1e-6;
    let mut text = String::from("TWA1_freq\tTWA1_sqrt_TW_freq\tTWA1_amp\tTWA1_theta\n");
    for i in 0..40 {
        let freq = 10.0 * 1.08_f64.powi(i);
        let x = freq.sqrt();
        // Thermal wave decays as exp(-kd) and lags by kd.
        let kd = d * (PI * freq / sample.alpha).sqrt();
        let amp = 0.8 * (-kd).exp() * (1.0 + rng.gauss(0.0, 0.01));
        let theta = wrap_phase(-kd + 0.3 + rng.gauss(0.0, 0.005));
        text.push_str(&format!("{freq:.4}\t{x:.6}\t{amp:.6e}\t{theta:.6}\n"));
    }
    text.push_str("---- sample information ----\n");
    text.push_str(&format!("試料厚\t{:.2}\n", sample.thickness_um));
    let (x, y, z) = sample.position;
    text.push_str(&format!("x_pos\t{x:.1}\n"));
    text.push_str(&format!("y_pos\t{y:.1}\n"));
    text.push_str(&format!("z_pos\t{z:.1}\n"));
    text
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data").join("input"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let samples: Vec<Sample> = (0..8)
        .map(|i| Sample {
            name: format!("sample_{:02}", i + 1),
            // Gradient along x, slight thickness drift along z.
            alpha: 1.0e-7 * (1.0 + 0.1 * i as f64),
            thickness_um: 30.0 + rng.gauss(0.0, 1.5),
            position: (i as f64 * 50.0, 0.0, i as f64 * 5.0),
        })
        .collect();

    for sample in &samples {
        let path = out_dir.join(format!("{}.txt", sample.name));
        std::fs::write(&path, render(sample, &mut rng))
            .with_context(|| format!("writing {}", path.display()))?;
    }

    println!(
        "Wrote {} TWA files (40 frequencies each) to {}",
        samples.len(),
        out_dir.display()
    );
    Ok(())
}
