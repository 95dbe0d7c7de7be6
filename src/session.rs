use crate::error::{Error, Result};
use crate::protocol::{self, Command};
use crate::sweep::Sample;

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

pub const DEFAULT_BAUD: u32 = 38400;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// anything that can measure one frequency at a time
pub trait Analyzer {
    fn measure(&mut self, frequency: f64) -> Result<Sample>;
    fn disconnect(&mut self) -> Result<()>;
}

// byte stream to the analyzer; `discard_input` throws away whatever has
// arrived but not been read yet
pub trait Transport: Read + Write {
    fn discard_input(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Transport for Box<dyn serialport::SerialPort> {
    fn discard_input(&mut self) -> std::io::Result<()> {
        self.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Aa30 {
    port: Option<String>,
    baud: u32,
    timeout: Duration,
}

impl Aa30 {
    pub fn new() -> Self {
        Aa30 {
            port: None,
            baud: DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    // None means pick the first USB serial port we find
    pub fn port(mut self, port: Option<String>) -> Self {
        self.port = port;
        self
    }

    pub fn baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect(&self) -> Result<Aa30Session<Box<dyn serialport::SerialPort>>> {
        let name = match self.port.clone().or_else(find_usb_port) {
            Some(name) => name,
            None => return Err(Error::Connection(
                "no serial port given and no USB serial port found".to_owned()
            )),
        };

        log::info!("opening {} at {} baud", name, self.baud);
        let port = serialport::new(&name, self.baud)
            .timeout(self.timeout)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| Error::Connection(format!("{}: {}", name, e)))?;

        let session = Aa30Session::open(port, self.timeout)?;
        log::info!("connected to {} on {}", session.version(), name);
        Ok(session)
    }
}

impl Default for Aa30 {
    fn default() -> Self {
        Self::new()
    }
}

pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
    Ok(serialport::available_ports()?)
}

pub fn find_usb_port() -> Option<String> {
    let ports = serialport::available_ports().ok()?;
    ports.into_iter()
        .find(|p| match p.port_type {
            serialport::SerialPortType::UsbPort(_) => true,
            _ => false,
        })
        .map(|p| p.port_name)
}

#[derive(Debug)]
pub struct Aa30Session<T: Transport> {
    stream: Option<BufReader<T>>,
    timeout: Duration,
    version: String,
}

impl<T: Transport> Aa30Session<T> {
    // identify the device and switch the generator on
    pub fn open(transport: T, timeout: Duration) -> Result<Self> {
        let mut us = Aa30Session {
            stream: Some(BufReader::new(transport)),
            timeout,
            version: String::new(),
        };

        let handshake = match us.identify() {
            Ok(()) => us.command(Command::On),
            Err(e) => Err(e),
        };
        match handshake {
            Ok(()) => Ok(us),
            Err(e @ Error::Connection(_)) => Err(e),
            Err(e) => {
                // don't send OFF to something that never said hello
                us.stream = None;
                Err(Error::Connection(format!("analyzer did not respond: {}", e)))
            }
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn identify(&mut self) -> Result<()> {
        let cmd = Command::Version;
        self.send(&cmd)?;
        let line = self.read_line(&cmd)?;
        self.version = protocol::trim_line(&line).trim().to_owned();
        Ok(())
    }

    fn send(&mut self, cmd: &Command) -> Result<()> {
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return Err(Error::Connection("not connected".to_owned())),
        };
        log::debug!("command: {}", cmd.name());
        match write_command(stream.get_mut(), cmd) {
            Ok(()) => Ok(()),
            Err(ref e) if e.kind() == ErrorKind::TimedOut => {
                Err(Error::Timeout(cmd.name()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn command(&mut self, cmd: Command) -> Result<()> {
        self.send(&cmd)?;
        if cmd.acknowledged() {
            self.expect_ack(&cmd)?;
        }
        Ok(())
    }

    fn expect_ack(&mut self, cmd: &Command) -> Result<()> {
        loop {
            let line = self.read_line(cmd)?;
            // late output of an abandoned FRX, not an answer to `cmd`
            if protocol::parse_sample(&line).is_ok() {
                log::debug!("dropping stale data line {:?}", protocol::trim_line(&line));
                continue;
            }
            return protocol::check_ack(cmd, &line);
        }
    }

    // throw away anything already received, so the next command starts clean
    fn resync(&mut self) {
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return,
        };
        let stale = stream.buffer().len();
        stream.consume(stale);
        if let Err(e) = stream.get_mut().discard_input() {
            log::warn!("could not flush analyzer input: {}", e);
        }
        log::debug!("resync, dropped {} buffered bytes", stale);
    }

    // next non-empty line, or Timeout once the deadline passes
    fn read_line(&mut self, cmd: &Command) -> Result<String> {
        let deadline = Instant::now() + self.timeout;
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return Err(Error::Connection("not connected".to_owned())),
        };

        let mut buf = Vec::new();
        loop {
            match stream.read_until(b'\n', &mut buf) {
                // end of stream, nothing more is coming
                Ok(0) => return Err(Error::Timeout(cmd.name())),
                Ok(_) => {
                    if buf.ends_with(b"\n") {
                        let line = String::from_utf8_lossy(&buf).into_owned();
                        if !protocol::is_blank(&line) {
                            log::debug!("response to {}: {:?}", cmd.name(), line);
                            return Ok(line);
                        }
                        buf.clear();
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut
                    || e.kind() == ErrorKind::WouldBlock
                    || e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(cmd.name()));
            }
        }
    }

    fn read_samples(&mut self, cmd: &Command, count: usize) -> Result<Vec<Sample>> {
        let mut samples = Vec::with_capacity(count);
        while samples.len() < count {
            let line = self.read_line(cmd)?;
            if protocol::trim_line(&line).trim() == protocol::ACK {
                return Err(Error::Protocol(format!(
                    "{} ended after {} of {} lines", cmd.name(), samples.len(), count,
                )));
            }
            samples.push(protocol::parse_sample(&line)?);
        }
        // FRX output is closed by an OK of its own
        let line = self.read_line(cmd)?;
        protocol::check_ack(cmd, &line)?;
        Ok(samples)
    }

    // native sweep, centered on `center` and `span` wide
    pub fn sweep(&mut self, center: f64, span: f64, steps: usize) -> Result<Vec<Sample>> {
        if steps == 0 {
            return Err(Error::InvalidRequest("sweep needs at least one step".to_owned()));
        }
        if !(center > 0.0) || !(span >= 0.0) {
            return Err(Error::InvalidRequest(format!(
                "bad center/span {} / {} Hz", center, span,
            )));
        }
        let samples = self.run_frx(center, span, steps);
        if samples.is_err() {
            self.resync();
        }
        samples
    }

    fn run_frx(&mut self, center: f64, span: f64, steps: usize) -> Result<Vec<Sample>> {
        self.command(Command::SetFrequency(center.round() as u64))?;
        self.command(Command::SetSpan(span.round() as u64))?;
        let cmd = Command::SweepRx(steps);
        self.send(&cmd)?;
        self.read_samples(&cmd, steps + 1)
    }
}

fn write_command<W: Write>(w: &mut W, cmd: &Command) -> std::io::Result<()> {
    w.write_all(cmd.encode().as_bytes())?;
    w.flush()
}

impl<T: Transport> Analyzer for Aa30Session<T> {
    fn measure(&mut self, frequency: f64) -> Result<Sample> {
        if !(frequency > 0.0) {
            return Err(Error::InvalidRequest(format!("bad frequency {} Hz", frequency)));
        }
        // zero span: both points of FRX1 land on the same frequency
        let samples = self.sweep(frequency, 0.0, 1)?;
        samples.into_iter().next()
            .ok_or_else(|| Error::Protocol("empty response to FRX1".to_owned()))
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        if let Err(e) = self.command(Command::Off) {
            log::warn!("analyzer did not acknowledge OFF: {}", e);
        }
        self.stream = None;
        log::info!("disconnected");
        Ok(())
    }
}

impl<T: Transport> Drop for Aa30Session<T> {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}
