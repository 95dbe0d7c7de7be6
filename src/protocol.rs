// AA-series ASCII command set: commands go out as `CMD\n`, replies come
// back as `\r\n` terminated lines, interleaved with a lot of empty ones.
use crate::error::{Error, Result};
use crate::sweep::Sample;

pub const ACK: &str = "OK";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    On,
    Off,
    Version,
    SetFrequency(u64), // center, Hz
    SetSpan(u64), // Hz
    SweepRx(usize), // number of steps, device answers steps + 1 lines
}

impl Command {
    pub fn encode(&self) -> String {
        match *self {
            Command::On => "ON\n".to_owned(),
            Command::Off => "OFF\n".to_owned(),
            Command::Version => "VER\n".to_owned(),
            Command::SetFrequency(hz) => format!("FQ{}\n", hz),
            Command::SetSpan(hz) => format!("SW{}\n", hz),
            Command::SweepRx(steps) => format!("FRX{}\n", steps),
        }
    }

    pub fn name(&self) -> String {
        self.encode().trim_end().to_owned()
    }

    // does the device answer with a bare OK?
    pub fn acknowledged(&self) -> bool {
        match self {
            Command::Version | Command::SweepRx(_) => false,
            _ => true,
        }
    }
}

pub fn trim_line(line: &str) -> &str {
    line.trim_end_matches(|c| c == '\r' || c == '\n')
}

pub fn is_blank(line: &str) -> bool {
    trim_line(line).trim().is_empty()
}

pub fn check_ack(cmd: &Command, line: &str) -> Result<()> {
    let line = trim_line(line).trim();
    if line == ACK {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "expected {:?} after {}, got {:?}", ACK, cmd.name(), line,
        )))
    }
}

// `freq_mhz,r,x`
pub fn parse_sample(line: &str) -> Result<Sample> {
    let line = trim_line(line).trim();
    let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
    if fields.len() != 3 {
        return Err(Error::Protocol(format!(
            "expected 3 fields in data line, got {}: {:?}", fields.len(), line,
        )));
    }

    let mut values = [0.0f64; 3];
    for (v, f) in values.iter_mut().zip(fields.iter()) {
        *v = f.parse().map_err(|_| Error::Protocol(
            format!("bad number {:?} in data line {:?}", f, line)
        ))?;
        if !v.is_finite() {
            return Err(Error::Protocol(
                format!("non-finite value in data line {:?}", line)
            ));
        }
    }

    Ok(Sample::new(values[0] * 1e6, values[1], values[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_commands() {
        assert_eq!(Command::On.encode(), "ON\n");
        assert_eq!(Command::SetFrequency(14_000_000).encode(), "FQ14000000\n");
        assert_eq!(Command::SetSpan(0).encode(), "SW0\n");
        assert_eq!(Command::SweepRx(10).encode(), "FRX10\n");
        assert_eq!(Command::SweepRx(10).name(), "FRX10");
    }

    #[test]
    fn parses_data_line() {
        let s = parse_sample("14.000000,49.82,-3.10\r\n").unwrap();
        assert!((s.frequency - 14e6).abs() < 1e-6);
        assert_eq!(s.resistance, 49.82);
        assert_eq!(s.reactance, -3.10);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(parse_sample("14.0,50.0\r\n"), Err(Error::Protocol(_))));
        assert!(matches!(parse_sample("14.0,abc,1\r\n"), Err(Error::Protocol(_))));
        assert!(matches!(parse_sample("14.0,1,2,3\r\n"), Err(Error::Protocol(_))));
        assert!(matches!(parse_sample("14.0,NaN,2\r\n"), Err(Error::Protocol(_))));
    }

    #[test]
    fn acks() {
        assert!(check_ack(&Command::On, "OK\r\n").is_ok());
        assert!(matches!(check_ack(&Command::On, "ERROR\r\n"), Err(Error::Protocol(_))));
        assert!(is_blank("\r\n"));
        assert!(!is_blank("OK\r\n"));
    }
}
