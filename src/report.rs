use crate::error::Result;
use crate::metrics::Analysed;

use std::io::Write;
use std::path::Path;

fn writer<W: Write>(w: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b' ')
        .quote(b'|')
        .from_writer(w)
}

// one row per sample: MHz, VSWR, R, X, return loss; sweeps back to back
pub fn write_sweeps<W: Write>(w: W, sweeps: &[Analysed]) -> Result<()> {
    let mut wr = writer(w);
    wr.write_record(&["freq (MHz)", "vswr", "R (ohms)", "X (ohms)", "RL (dB)"])?;
    for analysed in sweeps {
        let rows = analysed.result.samples.iter()
            .zip(analysed.vswr.iter())
            .zip(analysed.return_loss.iter());
        for ((s, &(_, vswr)), &(_, rl)) in rows {
            wr.write_record(&[
                format!("{:.6}", s.frequency / 1e6),
                format!("{:.4}", vswr),
                format!("{:.3}", s.resistance),
                format!("{:.3}", s.reactance),
                format!("{:.2}", rl),
            ])?;
        }
    }
    wr.flush()?;
    Ok(())
}

pub fn write_tdr<W: Write>(w: W, tdr: &[(f64, f64)]) -> Result<()> {
    let mut wr = writer(w);
    wr.write_record(&["distance (m)", "magnitude"])?;
    for (d, m) in tdr {
        wr.write_record(&[format!("{:.3}", d), format!("{:.6}", m)])?;
    }
    wr.flush()?;
    Ok(())
}

pub fn save_sweeps<P: AsRef<Path>>(path: P, sweeps: &[Analysed]) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_sweeps(file, sweeps)?;
    let rows: usize = sweeps.iter().map(|a| a.result.len()).sum();
    log::info!("wrote {} samples to {}", rows, path.as_ref().display());
    Ok(())
}

pub fn save_tdr<P: AsRef<Path>>(path: P, tdr: &[(f64, f64)]) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_tdr(file, tdr)?;
    log::info!("wrote TDR trace to {}", path.as_ref().display());
    Ok(())
}
