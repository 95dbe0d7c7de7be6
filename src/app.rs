use crate::acquire::Acquisition;
use crate::config::Config;
use crate::error::Result;
use crate::metrics::{Analysed, Analysis};
use crate::session::{Aa30Session, Analyzer};
use crate::sweep::{SweepRequest, Sweeper};

pub type SerialAnalyzer = Aa30Session<Box<dyn serialport::SerialPort>>;

// everything a front end needs, built once at startup and passed around
#[derive(Debug)]
pub struct App<A: Analyzer> {
    config: Config,
    sweeper: Sweeper<A>,
}

impl App<SerialAnalyzer> {
    pub fn connect(config: Config) -> Result<Self> {
        // bad settings should not cost a trip to the analyzer
        config.validate()?;
        let session = config.analyzer().connect()?;
        Ok(App::new(config, session))
    }
}

impl<A: Analyzer> App<A> {
    pub fn new(config: Config, analyzer: A) -> Self {
        let sweeper = Sweeper::new(analyzer).retries(config.retries);
        App { config, sweeper }
    }

    pub fn analysis(&self) -> Analysis {
        Analysis {
            velocity_factor: self.config.velocity_factor,
            z0: self.config.reference_impedance,
        }
    }

    pub fn sweep(&mut self, request: &SweepRequest) -> Analysed {
        let result = self.sweeper.run_sweep_with(request, |done, total| {
            log::debug!("measured {}/{}", done, total);
        });
        self.analysis().run(result)
    }

    // one sweep per request, in order; a stopped sweep ends the scan
    pub fn scan(&mut self, requests: &[SweepRequest]) -> Vec<Analysed> {
        let mut sweeps = Vec::with_capacity(requests.len());
        for request in requests {
            let analysed = self.sweep(request);
            let cancelled = analysed.result.cancelled;
            sweeps.push(analysed);
            if cancelled {
                break;
            }
        }
        sweeps
    }

    // hand the analyzer over to a background thread
    pub fn acquire(self, request: SweepRequest, repeat: bool) -> Acquisition
    where
        A: Send + 'static,
    {
        let analysis = self.analysis();
        Acquisition::spawn(self.sweeper, request, analysis, repeat)
    }

    pub fn close(self) -> Result<A> {
        let mut analyzer = self.sweeper.into_analyzer();
        analyzer.disconnect()?;
        Ok(analyzer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::presets;
    use crate::sweep::tests::Stub;

    #[test]
    fn sweeps_with_configured_retries() {
        let config = Config { retries: 0, ..Config::default() };
        let mut app = App::new(config, Stub::new(50.0, 0.0).fail(2e6, 1));
        let req = SweepRequest::new(1e6, 3e6, 3).unwrap();
        let a = app.sweep(&req);
        assert!(a.result.is_partial());
        assert_eq!(a.result.missing, vec![2e6]);
        assert_eq!(a.vswr.len(), 2);
        assert!(a.tdr.is_some());
    }

    #[test]
    fn analysis_follows_config() {
        let config = Config { velocity_factor: 0.8, reference_impedance: 75.0, ..Config::default() };
        let mut app = App::new(config, Stub::new(75.0, 0.0));
        assert_eq!(app.analysis(), Analysis { velocity_factor: 0.8, z0: 75.0 });
        let req = SweepRequest::new(1e6, 3e6, 3).unwrap();
        let a = app.sweep(&req);
        assert!(a.vswr.iter().all(|&(_, v)| v == 1.0));
    }

    #[test]
    fn scans_a_band_group_in_order() {
        let requests: Vec<SweepRequest> = presets::select("ph").unwrap()
            .iter()
            .map(|p| p.request(Some(5)).unwrap())
            .collect();
        let mut app = App::new(Config::default(), Stub::new(50.0, 0.0));
        let sweeps = app.scan(&requests);
        assert_eq!(sweeps.len(), requests.len());
        for (a, req) in sweeps.iter().zip(requests.iter()) {
            assert_eq!(a.result.samples[0].frequency, req.start());
            assert_eq!(a.result.len(), 5);
        }
    }

    #[test]
    fn bad_settings_fail_before_connecting() {
        // no port is touched: validation comes first
        let config = Config { velocity_factor: 1.5, port: Some("/nonexistent".to_owned()), ..Config::default() };
        assert!(matches!(App::connect(config), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn close_disconnects() {
        let app = App::new(Config::default(), Stub::new(50.0, 0.0));
        let stub = app.close().unwrap();
        assert_eq!(stub.disconnects, 1);
    }
}
