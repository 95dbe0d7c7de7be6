use crate::error::{Error, Result};
use crate::metrics::{Analysed, Analysis};
use crate::session::Analyzer;
use crate::sweep::{Stop, SweepRequest, Sweeper};

use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

// sweeps on a background thread that owns the analyzer, so there is only
// ever one sweep in flight
#[derive(Debug)]
pub struct Acquisition {
    results: Receiver<Analysed>,
    stop: Stop,
    handle: Option<JoinHandle<Result<()>>>,
}

impl Acquisition {
    pub fn spawn<A>(mut sweeper: Sweeper<A>, request: SweepRequest,
                    analysis: Analysis, repeat: bool) -> Self
    where
        A: Analyzer + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = sweeper.stop_handle();
        let worker_stop = stop.clone();

        let handle = std::thread::spawn(move || {
            log::debug!("acquisition thread started");
            let mut count = 0usize;
            loop {
                let result = sweeper.run_sweep(&request);
                count += 1;
                if tx.send(analysis.run(result)).is_err() {
                    // nobody is listening any more
                    break;
                }
                if !repeat || worker_stop.requested() {
                    break;
                }
            }
            log::info!("acquisition finished after {} sweeps", count);
            sweeper.into_analyzer().disconnect()
        });

        Acquisition {
            results: rx,
            stop,
            handle: Some(handle),
        }
    }

    pub fn results(&self) -> &Receiver<Analysed> {
        &self.results
    }

    pub fn stop_handle(&self) -> Stop {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.request();
    }

    // stop and wait for the current point to finish
    pub fn join(mut self) -> Result<()> {
        self.stop();
        self.wait()
    }

    fn wait(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(r) => r,
                Err(_) => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other, "acquisition thread panicked",
                ))),
            },
            None => Ok(()),
        }
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        self.stop();
        if let Err(e) = self.wait() {
            log::error!("acquisition: {}", e);
        }
    }
}
