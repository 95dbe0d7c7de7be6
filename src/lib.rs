// wickedly useful re-export
pub use num::Complex;

pub mod error;
pub use error::{Error, Result};

pub mod protocol;

pub mod session;
pub use session::{Aa30, Aa30Session, Analyzer, Transport};

pub mod sweep;
pub use sweep::{Sample, SweepRequest, SweepResult, Sweeper};

pub mod metrics;
pub use metrics::{compute_tdr_distance, compute_vswr, Analysed, Analysis};

pub mod presets;

pub mod config;
pub use config::Config;

pub mod acquire;

pub mod app;
pub use app::App;

pub mod report;

pub mod plot;
