use super::{draw_sweep, draw_sweeps};
use crate::metrics::Analysed;
use crate::sweep::Stop;

use piston_window::{EventLoop, PistonWindow, WindowSettings};
use plotters::prelude::*;
use std::error::Error;
use std::sync::mpsc::Receiver;

pub const WINDOW_SIZE: (u32, u32) = (800, 900);

pub fn setup<'a, 'b>(app: clap::App<'a, 'b>) -> clap::App<'a, 'b> {
    app.arg(clap::Arg::with_name("output")
            .short("o")
            .long("output")
            .value_name("FILE")
            .help("Write plot to a PNG file instead of opening a window.")
            .takes_value(true))
        .arg(clap::Arg::with_name("live")
             .long("live")
             .conflicts_with("output")
             .help("Keep sweeping and redraw after every sweep. Exports get the last sweep shown."))
}

fn window(title: &str, size: (u32, u32), fps: u64) -> Result<PistonWindow, Box<dyn Error>> {
    let mut window: PistonWindow = WindowSettings::new(
        title, [size.0, size.1]
    ).samples(4).build()?;
    window.set_max_fps(fps);
    Ok(window)
}

// finished sweeps, to a file or a window that stays up until closed
pub fn show(matches: &clap::ArgMatches, size: (u32, u32), sweeps: &[Analysed])
            -> Result<(), Box<dyn Error>>
{
    if let Some(output) = matches.value_of("output") {
        {
            let root = BitMapBackend::new(output, size).into_drawing_area();
            draw_sweeps(&root, sweeps)?;
        }
        log::info!("wrote plot to {}", output);
        Ok(())
    } else {
        let mut window = window("AA-30 sweep", size, 1)?;
        while let Some(_) = draw_piston_window(&mut window, |b| {
            let root = b.into_drawing_area();
            draw_sweeps(&root, sweeps)?;
            Ok(())
        }) {}
        Ok(())
    }
}

// redraw whatever the acquisition thread sent last; closing the window
// asks it to stop, and hands back the last sweep shown
pub fn live(size: (u32, u32), results: &Receiver<Analysed>, stop: &Stop)
            -> Result<Option<Analysed>, Box<dyn Error>>
{
    let mut window = window("AA-30 live", size, 10)?;
    let mut latest: Option<Analysed> = None;
    while let Some(_) = draw_piston_window(&mut window, |b| {
        while let Ok(analysed) = results.try_recv() {
            latest = Some(analysed);
        }
        let root = b.into_drawing_area();
        match latest {
            Some(ref analysed) => draw_sweep(&root, analysed)?,
            None => root.fill(&WHITE)?,
        }
        Ok(())
    }) {}
    stop.request();
    Ok(latest)
}
