use crate::error::{Error, Result};
use crate::session::Analyzer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub frequency: f64, // Hz
    pub resistance: f64, // ohm
    pub reactance: f64, // ohm
}

impl Sample {
    pub fn new(frequency: f64, resistance: f64, reactance: f64) -> Self {
        Sample { frequency, resistance, reactance }
    }

    pub fn impedance(&self) -> num::Complex<f64> {
        num::Complex::new(self.resistance, self.reactance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRequest {
    start: f64,
    stop: f64,
    steps: usize,
}

impl SweepRequest {
    pub fn new(start: f64, stop: f64, steps: usize) -> Result<Self> {
        if !start.is_finite() || !stop.is_finite() || start < 0.0 {
            return Err(Error::InvalidRequest(
                format!("bad span {} .. {} Hz", start, stop)
            ));
        }
        if !(start < stop) {
            return Err(Error::InvalidRequest(
                format!("start {} Hz is not below stop {} Hz", start, stop)
            ));
        }
        if steps == 0 {
            return Err(Error::InvalidRequest("step count must be positive".to_owned()));
        }
        Ok(SweepRequest { start, stop, steps })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    // evenly spaced, both ends included; a single step is just `start`
    pub fn frequencies(&self) -> Vec<f64> {
        if self.steps == 1 {
            return vec![self.start];
        }
        let step = (self.stop - self.start) / (self.steps - 1) as f64;
        (0..self.steps)
            .map(|i| if i + 1 == self.steps {
                self.stop
            } else {
                self.start + step * i as f64
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepResult {
    pub samples: Vec<Sample>,
    // frequencies that could not be measured
    pub missing: Vec<f64>,
    pub cancelled: bool,
}

impl SweepResult {
    pub fn is_partial(&self) -> bool {
        self.cancelled || !self.missing.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frequencies(&self) -> impl Iterator<Item=f64> + '_ {
        self.samples.iter().map(|s| s.frequency)
    }
}

// shared "please stop" flag, checked between points
#[derive(Debug, Clone, Default)]
pub struct Stop(Arc<AtomicBool>);

impl Stop {
    pub fn new() -> Self {
        Stop(Arc::new(AtomicBool::new(false)))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Sweeper<A: Analyzer> {
    analyzer: A,
    retries: usize,
    stop: Stop,
}

impl<A: Analyzer> Sweeper<A> {
    pub fn new(analyzer: A) -> Self {
        Sweeper {
            analyzer,
            retries: 1,
            stop: Stop::new(),
        }
    }

    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn stop_handle(&self) -> Stop {
        self.stop.clone()
    }

    pub fn analyzer(&mut self) -> &mut A {
        &mut self.analyzer
    }

    pub fn into_analyzer(self) -> A {
        self.analyzer
    }

    pub fn run_sweep(&mut self, request: &SweepRequest) -> SweepResult {
        self.run_sweep_with(request, |_, _| ())
    }

    // `progress` sees (points done, points total) after every point
    pub fn run_sweep_with<F>(&mut self, request: &SweepRequest, mut progress: F)
                             -> SweepResult
    where
        F: FnMut(usize, usize),
    {
        let freqs = request.frequencies();
        let total = freqs.len();
        let mut result = SweepResult {
            samples: Vec::with_capacity(total),
            missing: vec![],
            cancelled: false,
        };

        log::info!("sweeping {:.6} .. {:.6} MHz in {} points",
                   request.start() / 1e6, request.stop() / 1e6, total);
        for (i, freq) in freqs.into_iter().enumerate() {
            if self.stop.requested() {
                log::info!("sweep stopped after {} of {} points", i, total);
                result.cancelled = true;
                break;
            }
            match self.measure_point(freq) {
                Ok(sample) => result.samples.push(sample),
                Err(e) => {
                    log::warn!("giving up on {:.6} MHz: {}", freq / 1e6, e);
                    result.missing.push(freq);
                }
            }
            progress(i + 1, total);
        }

        if result.is_partial() {
            log::warn!("partial sweep: {} of {} points", result.len(), total);
        }
        result
    }

    fn measure_point(&mut self, freq: f64) -> Result<Sample> {
        let mut attempt = 0;
        loop {
            match self.analyzer.measure(freq) {
                Ok(s) => return Ok(s),
                Err(e) if attempt < self.retries => {
                    log::debug!("retrying {:.6} MHz: {}", freq / 1e6, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
