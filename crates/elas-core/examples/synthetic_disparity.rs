// Example: run the full ELAS pipeline on a synthetic fronto-parallel pair.
// Usage:
//   cargo run -p elas-core --example synthetic_disparity

use elas_core::{Elas, Parameters, Setting};

fn main() {
    env_logger::init();

    let width = 320usize;
    let height = 240usize;
    let true_shift = 12i32;

    let left = noise_image(width, height, 0x5EED);
    let right = shift_image(&left, width, height, true_shift);

    let params = Parameters::new(Setting::Robotics);
    let elas = Elas::new(params);

    let mut d1 = vec![0.0f32; width * height];
    let mut d2 = vec![0.0f32; width * height];

    match elas.process(&left, &right, width, height, &mut d1, &mut d2) {
        Ok(()) => {
            let (valid, mean_abs_error) = summarize(&d1, true_shift);
            println!(
                "synthetic pair {width}x{height}, shift={true_shift}: {valid} valid pixels, mean |error|={mean_abs_error:.3}"
            );
        }
        Err(e) => {
            eprintln!("pipeline failed: {e}");
            std::process::exit(1);
        }
    }
}

fn summarize(d1: &[f32], true_shift: i32) -> (usize, f32) {
    let mut valid = 0usize;
    let mut error_sum = 0.0f32;
    for &v in d1 {
        if v >= 0.0 {
            valid += 1;
            error_sum += (v - true_shift as f32).abs();
        }
    }
    let mean = if valid > 0 { error_sum / valid as f32 } else { 0.0 };
    (valid, mean)
}

fn noise_image(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..width * height)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 256) as u8
        })
        .collect()
}

fn shift_image(src: &[u8], width: usize, height: usize, shift: i32) -> Vec<u8> {
    let mut out = vec![0u8; width * height];
    for v in 0..height {
        for u in 0..width {
            let su = u as i32 + shift;
            out[v * width + u] = if (su as usize) < width { src[v * width + su as usize] } else { 0 };
        }
    }
    out
}
