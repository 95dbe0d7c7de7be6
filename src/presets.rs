use crate::error::{Error, Result};
use crate::sweep::SweepRequest;

// AA-30 coverage
pub const MIN_FREQUENCY: f64 = 100e3;
pub const MAX_FREQUENCY: f64 = 30e6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Any,
    Cw,
    Phone,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub start: f64, // Hz
    pub stop: f64, // Hz
    pub points: usize,
    pub mode: Mode,
}

impl Preset {
    // the band's own point count unless told otherwise
    pub fn request(&self, points: Option<usize>) -> Result<SweepRequest> {
        SweepRequest::new(self.start, self.stop, points.unwrap_or(self.points))
    }
}

pub const PRESETS: &[Preset] = &[
    Preset { name: "full", start: 2.0e6, stop: 30.0e6, points: 201, mode: Mode::Any },
    Preset { name: "80cw", start: 3.48e6, stop: 3.62e6, points: 31, mode: Mode::Cw },
    Preset { name: "75ph", start: 3.7e6, stop: 4.0e6, points: 31, mode: Mode::Phone },
    Preset { name: "80", start: 3.5e6, stop: 4.0e6, points: 51, mode: Mode::Any },
    Preset { name: "60", start: 5.0e6, stop: 5.2e6, points: 11, mode: Mode::Any },
    Preset { name: "40cw", start: 6.98e6, stop: 7.15e6, points: 51, mode: Mode::Cw },
    Preset { name: "40ph", start: 7.1e6, stop: 7.3e6, points: 52, mode: Mode::Phone },
    Preset { name: "40", start: 7.0e6, stop: 7.3e6, points: 51, mode: Mode::Any },
    Preset { name: "30", start: 10.08e6, stop: 10.17e6, points: 26, mode: Mode::Any },
    Preset { name: "20cw", start: 13.98e6, stop: 14.12e6, points: 26, mode: Mode::Cw },
    Preset { name: "20ph", start: 14.1e6, stop: 14.35e6, points: 51, mode: Mode::Phone },
    Preset { name: "20", start: 14.0e6, stop: 14.35e6, points: 51, mode: Mode::Any },
    Preset { name: "17", start: 18.06e6, stop: 18.18e6, points: 21, mode: Mode::Any },
    Preset { name: "15", start: 20.98e6, stop: 21.47e6, points: 51, mode: Mode::Any },
    Preset { name: "12", start: 24.87e6, stop: 24.96e6, points: 21, mode: Mode::Any },
    Preset { name: "10cw", start: 27.98e6, stop: 29.72e6, points: 26, mode: Mode::Cw },
    Preset { name: "10ph", start: 28.5e6, stop: 29.7e6, points: 26, mode: Mode::Phone },
    Preset { name: "10", start: 28.0e6, stop: 29.7e6, points: 101, mode: Mode::Any },
];

// sweep every band in the table, or skip the other mode's sub-bands
pub const GROUPS: &[&str] = &["all", "cw", "ph"];

pub fn find(name: &str) -> Option<&'static Preset> {
    // "40m" and "40" are the same band
    let name = name.trim();
    let name = name.strip_suffix(|c: char| c == 'm' || c == 'M').unwrap_or(name);
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub fn group(name: &str) -> Option<Vec<&'static Preset>> {
    let skip = match name.trim().to_ascii_lowercase().as_str() {
        "all" => None,
        "cw" => Some(Mode::Phone),
        "ph" => Some(Mode::Cw),
        _ => return None,
    };
    Some(PRESETS.iter().filter(|p| Some(p.mode) != skip).collect())
}

// a single band or a whole group
pub fn select(name: &str) -> Option<Vec<&'static Preset>> {
    group(name).or_else(|| find(name).map(|p| vec![p]))
}

pub fn names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).chain(GROUPS.iter().cloned()).collect()
}

// manual entry, refusing anything the analyzer can't reach
pub fn manual(start: f64, stop: f64, steps: usize) -> Result<SweepRequest> {
    if start < MIN_FREQUENCY || stop > MAX_FREQUENCY {
        return Err(Error::InvalidRequest(format!(
            "{:.3} .. {:.3} MHz is outside {:.1} .. {:.1} MHz",
            start / 1e6, stop / 1e6, MIN_FREQUENCY / 1e6, MAX_FREQUENCY / 1e6,
        )));
    }
    SweepRequest::new(start, stop, steps)
}

pub fn manual_centered(center: f64, span: f64, steps: usize) -> Result<SweepRequest> {
    manual(center - span / 2.0, center + span / 2.0, steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_of(presets: &[&Preset]) -> Vec<&'static str> {
        presets.iter().map(|p| p.name).collect()
    }

    #[test]
    fn looks_up_bands() {
        let p = find("40CW").unwrap();
        assert_eq!(p.start, 6.98e6);
        assert_eq!(p.points, 51);
        assert_eq!(find("40m"), find("40"));
        assert_eq!(find("Full").unwrap().stop, 30e6);
        assert!(find("2m").is_none());
        assert_eq!(names().len(), PRESETS.len() + GROUPS.len());
    }

    #[test]
    fn bands_use_their_own_point_count() {
        let full = find("full").unwrap();
        assert_eq!(full.request(None).unwrap().steps(), 201);
        assert_eq!(full.request(Some(20)).unwrap().steps(), 20);
    }

    #[test]
    fn presets_are_valid_requests() {
        for p in PRESETS {
            let req = p.request(None).unwrap();
            assert!(req.start() >= MIN_FREQUENCY);
            assert!(req.stop() <= MAX_FREQUENCY);
        }
    }

    #[test]
    fn groups() {
        assert_eq!(group("all").unwrap().len(), PRESETS.len());

        let cw = names_of(&group("cw").unwrap());
        assert!(cw.contains(&"40cw"));
        assert!(cw.contains(&"40"));
        assert!(!cw.iter().any(|n| n.ends_with("ph")));

        let ph = names_of(&group("PH").unwrap());
        assert!(ph.contains(&"75ph"));
        assert!(!ph.iter().any(|n| n.ends_with("cw")));
        // table order is kept
        assert_eq!(ph[0], "full");

        assert!(group("20").is_none());
        assert_eq!(names_of(&select("20").unwrap()), vec!["20"]);
        assert!(select("nope").is_none());
    }

    #[test]
    fn manual_limits() {
        assert!(manual(1e6, 2e6, 10).is_ok());
        assert!(manual(50e3, 2e6, 10).is_err());
        assert!(manual(1e6, 31e6, 10).is_err());
        assert!(manual(2e6, 1e6, 10).is_err());
        let r = manual_centered(13e6, 10e6, 10).unwrap();
        assert_eq!(r.start(), 8e6);
    }
}
