use crate::error::{Error, Result};
use crate::sweep::{Sample, SweepResult};

use num::Complex;

pub const REFERENCE_IMPEDANCE: f64 = 50.0;
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0; // m/s
pub const DEFAULT_VELOCITY_FACTOR: f64 = 0.66; // solid PE coax

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Analysis {
    pub velocity_factor: f64,
    pub z0: f64,
}

impl Default for Analysis {
    fn default() -> Self {
        Analysis {
            velocity_factor: DEFAULT_VELOCITY_FACTOR,
            z0: REFERENCE_IMPEDANCE,
        }
    }
}

// a sweep plus everything derived from it, ready for a display
#[derive(Debug, Clone, Default)]
pub struct Analysed {
    pub result: SweepResult,
    pub vswr: Vec<(f64, f64)>, // (Hz, VSWR)
    pub return_loss: Vec<(f64, f64)>, // (Hz, dB)
    pub tdr: Option<Vec<(f64, f64)>>, // (m, |impulse|)
}

impl Analysis {
    pub fn new(velocity_factor: f64, z0: f64) -> Result<Self> {
        if !(velocity_factor > 0.0 && velocity_factor <= 1.0) {
            return Err(Error::InvalidRequest(
                format!("velocity factor {} not in (0, 1]", velocity_factor)
            ));
        }
        if !(z0 > 0.0 && z0.is_finite()) {
            return Err(Error::InvalidRequest(
                format!("reference impedance {} ohm is not positive", z0)
            ));
        }
        Ok(Analysis { velocity_factor, z0 })
    }

    // never throws the sweep away: a trace that can't be computed is left out
    pub fn run(&self, result: SweepResult) -> Analysed {
        let vswr = result.samples.iter()
            .map(|s| (s.frequency, vswr_with(s, self.z0)))
            .collect();
        let return_loss = result.samples.iter()
            .map(|s| (s.frequency, return_loss_with(s, self.z0)))
            .collect();
        let tdr = match tdr_with(&result, self.velocity_factor, self.z0) {
            Ok(tdr) => Some(tdr),
            Err(Error::InsufficientData { got, .. }) => {
                log::debug!("no TDR for {} samples", got);
                None
            }
            Err(e) => {
                log::warn!("no TDR trace: {}", e);
                None
            }
        };
        Analysed { result, vswr, return_loss, tdr }
    }
}

// shortest transform we'll run, so short sweeps still give a smooth trace
const MIN_TDR_LEN: usize = 1024;

pub fn reflection(sample: &Sample, z0: f64) -> Complex<f64> {
    let z = sample.impedance();
    let z0 = Complex::new(z0, 0.0);
    let den = z + z0;
    if den.norm() == 0.0 {
        // R = -Z0, X = 0 is not a passive load, call it a total reflection
        return Complex::new(1.0, 0.0);
    }
    (z - z0) / den
}

pub fn vswr_from_gamma(gamma: f64) -> f64 {
    if gamma >= 1.0 {
        std::f64::INFINITY
    } else {
        (1.0 + gamma) / (1.0 - gamma)
    }
}

pub fn compute_vswr(sample: &Sample) -> f64 {
    vswr_with(sample, REFERENCE_IMPEDANCE)
}

pub fn vswr_with(sample: &Sample, z0: f64) -> f64 {
    vswr_from_gamma(reflection(sample, z0).norm())
}

// positive dB, infinite at a perfect match
pub fn return_loss_db(sample: &Sample) -> f64 {
    return_loss_with(sample, REFERENCE_IMPEDANCE)
}

pub fn return_loss_with(sample: &Sample, z0: f64) -> f64 {
    -20.0 * reflection(sample, z0).norm().log10()
}

pub fn compute_tdr_distance(result: &SweepResult, velocity_factor: f64)
                            -> Result<Vec<(f64, f64)>>
{
    tdr_with(result, velocity_factor, REFERENCE_IMPEDANCE)
}

// band-limited impulse response of the reflection coefficient, against
// one-way distance along the line
pub fn tdr_with(result: &SweepResult, velocity_factor: f64, z0: f64)
                -> Result<Vec<(f64, f64)>>
{
    if !(velocity_factor > 0.0 && velocity_factor <= 1.0) {
        return Err(Error::InvalidRequest(
            format!("velocity factor {} not in (0, 1]", velocity_factor)
        ));
    }
    let n = result.samples.len();
    if n < 2 {
        return Err(Error::InsufficientData { needed: 2, got: n });
    }

    let gammas = uniform_gamma(result, z0)?;
    let points = gammas.len();
    let df = (result.samples[n - 1].frequency - result.samples[0].frequency)
        / (points - 1) as f64;

    let len = (points * 4).max(MIN_TDR_LEN).next_power_of_two();
    let mut input = vec![Complex::new(0.0, 0.0); len];
    for (i, g) in gammas.iter().enumerate() {
        input[i] = *g * hann(i, points);
    }

    let mut output = vec![Complex::new(0.0, 0.0); len];
    let mut planner = rustfft::FFTplanner::new(true);
    let fft = planner.plan_fft(len);
    fft.process(&mut input, &mut output);

    // delay resolution of the padded transform, round trip
    let dt = 1.0 / (len as f64 * df);
    let norm = 2.0 / points as f64;
    Ok(output.iter()
       .take(len / 2)
       .enumerate()
       .map(|(i, v)| {
           let t = i as f64 * dt;
           (t * SPEED_OF_LIGHT * velocity_factor / 2.0, v.norm() * norm)
       })
       .collect())
}

fn hann(i: usize, n: usize) -> f64 {
    // a plain Hann zeroes both ends, which for two or three points is everything
    if n <= 3 {
        return 1.0;
    }
    let x = 2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64;
    0.5 - 0.5 * x.cos()
}

// reflection coefficients on the sweep's regular grid, with any skipped
// points filled in linearly from their neighbours
fn uniform_gamma(result: &SweepResult, z0: f64) -> Result<Vec<Complex<f64>>> {
    let samples = &result.samples;
    let n = samples.len();
    let first = samples[0].frequency;
    let last = samples[n - 1].frequency;
    if !(last > first) {
        return Err(Error::InvalidRequest("sweep frequencies are not ascending".to_owned()));
    }

    let inside = result.missing.iter().filter(|&&f| f > first && f < last).count();
    let points = n + inside;
    let df = (last - first) / (points - 1) as f64;

    let mut grid: Vec<Option<Complex<f64>>> = vec![None; points];
    for s in samples {
        let idx = ((s.frequency - first) / df).round() as usize;
        if idx < points {
            grid[idx] = Some(reflection(s, z0));
        }
    }

    let mut out = Vec::with_capacity(points);
    for i in 0..points {
        match grid[i] {
            Some(g) => out.push(g),
            None => {
                let prev = (0..i).rev().find_map(|j| grid[j].map(|g| (j, g)));
                let next = (i + 1..points).find_map(|j| grid[j].map(|g| (j, g)));
                let g = match (prev, next) {
                    (Some((a, ga)), Some((b, gb))) => {
                        let t = (i - a) as f64 / (b - a) as f64;
                        ga + (gb - ga) * t
                    }
                    (Some((_, g)), None) | (None, Some((_, g))) => g,
                    (None, None) => Complex::new(0.0, 0.0),
                };
                out.push(g);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SweepRequest;

    fn sample(r: f64, x: f64) -> Sample {
        Sample::new(14e6, r, x)
    }

    #[test]
    fn perfect_match_is_one() {
        assert_eq!(compute_vswr(&sample(50.0, 0.0)), 1.0);
        assert!(compute_vswr(&sample(50.0, 1.0)) > 1.0);
        assert!(compute_vswr(&sample(49.0, 0.0)) > 1.0);
    }

    #[test]
    fn known_mismatches() {
        assert!((compute_vswr(&sample(100.0, 0.0)) - 2.0).abs() < 1e-12);
        assert!((compute_vswr(&sample(25.0, 0.0)) - 2.0).abs() < 1e-12);
        assert!(compute_vswr(&sample(0.0, 0.0)).is_infinite());
        assert!(compute_vswr(&sample(0.0, 75.0)) > 1e6);
    }

    #[test]
    fn vswr_grows_with_reflection() {
        let mut last = 0.0;
        for i in 0..100 {
            let v = vswr_from_gamma(i as f64 / 100.0);
            assert!(v > last);
            last = v;
        }
        let mut last = 1.0;
        for r in 51..400 {
            let s = sample(r as f64, 0.0);
            let v = compute_vswr(&s);
            assert!(v > last);
            last = v;
        }
    }

    #[test]
    fn return_loss() {
        assert!((return_loss_db(&sample(100.0, 0.0)) - 9.542).abs() < 1e-3);
        assert!(return_loss_db(&sample(50.0, 0.0)).is_infinite());
    }

    #[test]
    fn tdr_needs_two_samples() {
        let empty = SweepResult::default();
        assert!(matches!(compute_tdr_distance(&empty, 0.66),
                         Err(Error::InsufficientData { got: 0, .. })));
        let one = SweepResult {
            samples: vec![sample(50.0, 0.0)],
            ..SweepResult::default()
        };
        assert!(matches!(compute_tdr_distance(&one, 0.66),
                         Err(Error::InsufficientData { got: 1, .. })));
    }

    // a slightly lossy open stub of coax `length` long: gamma = 0.9 exp(-j 4 pi f L / v)
    fn open_stub(length: f64, vf: f64, req: &SweepRequest) -> SweepResult {
        let v = SPEED_OF_LIGHT * vf;
        let z0 = Complex::new(REFERENCE_IMPEDANCE, 0.0);
        let samples = req.frequencies().into_iter().map(|f| {
            let gamma = Complex::from_polar(&0.9, &(-4.0 * std::f64::consts::PI * f * length / v));
            // back out the impedance that gives this gamma
            let z = z0 * (Complex::new(1.0, 0.0) + gamma) / (Complex::new(1.0, 0.0) - gamma);
            Sample::new(f, z.re, z.im)
        }).collect();
        SweepResult { samples, ..SweepResult::default() }
    }

    #[test]
    fn finds_open_stub() {
        let req = SweepRequest::new(1e6, 30e6, 200).unwrap();
        let result = open_stub(12.0, 0.66, &req);
        let tdr = compute_tdr_distance(&result, 0.66).unwrap();
        let (dist, _) = tdr.iter().cloned()
            .fold((0.0, 0.0), |best, p| if p.1 > best.1 { p } else { best });
        // resolution is v / (2 * span) ~ 3.4 m; the zero padding interpolates
        assert!((dist - 12.0).abs() < 1.0, "peak at {} m", dist);
    }

    #[test]
    fn distance_axis_is_monotonic() {
        let req = SweepRequest::new(1e6, 10e6, 2).unwrap();
        let result = open_stub(5.0, 0.8, &req);
        let tdr = compute_tdr_distance(&result, 0.8).unwrap();
        assert_eq!(tdr.len(), MIN_TDR_LEN / 2);
        assert_eq!(tdr[0].0, 0.0);
        for w in tdr.windows(2) {
            assert!(w[1].0 > w[0].0);
        }
    }

    #[test]
    fn missing_points_are_filled() {
        let req = SweepRequest::new(1e6, 30e6, 50).unwrap();
        let mut result = open_stub(12.0, 0.66, &req);
        let dropped = result.samples.remove(20);
        result.missing.push(dropped.frequency);
        let tdr = compute_tdr_distance(&result, 0.66).unwrap();
        let (dist, _) = tdr.iter().cloned()
            .fold((0.0, 0.0), |best, p| if p.1 > best.1 { p } else { best });
        assert!((dist - 12.0).abs() < 2.0, "peak at {} m", dist);
    }

    #[test]
    fn analysis_skips_tdr_for_one_point() {
        let one = SweepResult {
            samples: vec![sample(100.0, 0.0)],
            ..SweepResult::default()
        };
        let a = Analysis::default().run(one);
        assert!(a.tdr.is_none());
        assert_eq!(a.vswr.len(), 1);
        assert!((a.vswr[0].1 - 2.0).abs() < 1e-12);
        assert!((a.return_loss[0].1 - 9.542).abs() < 1e-3);

        let req = SweepRequest::new(1e6, 10e6, 10).unwrap();
        let a = Analysis::default().run(open_stub(5.0, 0.66, &req));
        assert!(a.tdr.is_some());
        assert_eq!(a.vswr.len(), 10);
        assert_eq!(a.return_loss.len(), 10);
    }

    #[test]
    fn analysis_settings_are_checked() {
        assert!(Analysis::new(0.66, 50.0).is_ok());
        assert!(Analysis::new(1.0, 75.0).is_ok());
        assert!(matches!(Analysis::new(1.5, 50.0), Err(Error::InvalidRequest(_))));
        assert!(matches!(Analysis::new(0.0, 50.0), Err(Error::InvalidRequest(_))));
        assert!(matches!(Analysis::new(0.66, 0.0), Err(Error::InvalidRequest(_))));
        assert!(matches!(Analysis::new(0.66, std::f64::NAN), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn bad_tdr_settings_keep_the_sweep() {
        let req = SweepRequest::new(1e6, 10e6, 10).unwrap();
        let bad = Analysis { velocity_factor: 1.5, ..Analysis::default() };
        let a = bad.run(open_stub(5.0, 0.66, &req));
        assert_eq!(a.result.len(), 10);
        assert_eq!(a.vswr.len(), 10);
        assert!(a.tdr.is_none());
    }

    #[test]
    fn vswr_follows_reference_impedance() {
        let s = sample(75.0, 0.0);
        assert_eq!(vswr_with(&s, 75.0), 1.0);
        assert!((compute_vswr(&s) - 1.5).abs() < 1e-12);
        assert!(return_loss_with(&s, 75.0).is_infinite());
    }

    #[test]
    fn rejects_bad_velocity_factor() {
        let req = SweepRequest::new(1e6, 10e6, 10).unwrap();
        let result = open_stub(5.0, 0.8, &req);
        assert!(compute_tdr_distance(&result, 0.0).is_err());
        assert!(compute_tdr_distance(&result, 1.5).is_err());
    }
}
