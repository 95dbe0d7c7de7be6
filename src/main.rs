use reaa30::*;

use clap::value_t_or_exit;

fn cli<'a, 'b>() -> clap::App<'a, 'b> {
    let app = clap::App::new("reaa30")
        .about("sweep an antenna with a RigExpert AA-30")
        .arg(clap::Arg::with_name("list-ports")
             .long("list-ports")
             .help("List serial ports and exit."))
        .arg(clap::Arg::with_name("port")
             .short("p")
             .long("port")
             .value_name("PORT")
             .help("Serial port the analyzer is on (default: first USB port)")
             .takes_value(true))
        .arg(clap::Arg::with_name("baud")
             .short("b")
             .long("baud")
             .value_name("BAUD")
             .takes_value(true))
        .arg(clap::Arg::with_name("band")
             .long("band")
             .value_name("BAND")
             .help("Sweep a preset band (e.g. 40, 20ph, full) or a group of them (all, cw, ph)")
             .possible_values(&presets::names())
             .case_insensitive(true)
             .conflicts_with_all(&["start", "center"])
             .takes_value(true))
        .arg(clap::Arg::with_name("start")
             .long("start")
             .value_name("MHZ")
             .requires("stop")
             .conflicts_with("center")
             .takes_value(true))
        .arg(clap::Arg::with_name("stop")
             .long("stop")
             .value_name("MHZ")
             .requires("start")
             .takes_value(true))
        .arg(clap::Arg::with_name("center")
             .long("center")
             .value_name("MHZ")
             .requires("span")
             .takes_value(true))
        .arg(clap::Arg::with_name("span")
             .long("span")
             .value_name("MHZ")
             .requires("center")
             .takes_value(true))
        .arg(clap::Arg::with_name("points")
             .short("n")
             .long("points")
             .value_name("N")
             .help("Number of points in the sweep (bands have their own default)")
             .takes_value(true))
        .arg(clap::Arg::with_name("vf")
             .long("vf")
             .value_name("FACTOR")
             .help("Velocity factor of the feed line, for TDR distances")
             .takes_value(true))
        .arg(clap::Arg::with_name("csv")
             .long("csv")
             .value_name("FILE")
             .help("Also write the sweep to a CSV file.")
             .takes_value(true))
        .arg(clap::Arg::with_name("tdr-csv")
             .long("tdr-csv")
             .value_name("FILE")
             .help("Also write the TDR trace to a CSV file.")
             .takes_value(true))
        .arg(clap::Arg::with_name("save-config")
             .long("save-config")
             .help("Store the port, baud, points and velocity factor given here as defaults."));
    plot::cli::setup(app)
}

fn list_ports() -> Result<()> {
    let ports = session::list_ports()?;
    println!("Available serial ports:");
    if ports.is_empty() {
        println!("  (none)");
    }
    for port in ports {
        match port.port_type {
            serialport::SerialPortType::UsbPort(info) => {
                println!("  {} - USB (VID: 0x{:04x}, PID: 0x{:04x}) {}",
                         port.port_name, info.vid, info.pid,
                         info.product.unwrap_or_default());
            }
            _ => println!("  {}", port.port_name),
        }
    }
    Ok(())
}

fn requests(matches: &clap::ArgMatches, config: &Config) -> Result<Vec<SweepRequest>> {
    let points = if matches.is_present("points") { Some(config.points) } else { None };
    if let Some(band) = matches.value_of("band") {
        let bands = presets::select(band).ok_or_else(
            || Error::InvalidRequest(format!("unknown band {:?}", band))
        )?;
        bands.iter().map(|p| p.request(points)).collect()
    } else if matches.is_present("start") {
        let req = presets::manual(value_t_or_exit!(matches, "start", f64) * 1e6,
                                  value_t_or_exit!(matches, "stop", f64) * 1e6,
                                  config.points)?;
        Ok(vec![req])
    } else if matches.is_present("center") {
        let req = presets::manual_centered(value_t_or_exit!(matches, "center", f64) * 1e6,
                                           value_t_or_exit!(matches, "span", f64) * 1e6,
                                           config.points)?;
        Ok(vec![req])
    } else {
        Ok(vec![presets::PRESETS[0].request(points)?])
    }
}

fn export(matches: &clap::ArgMatches, sweeps: &[Analysed]) -> Result<()> {
    if let Some(path) = matches.value_of("csv") {
        report::save_sweeps(path, sweeps)?;
    }
    if let Some(path) = matches.value_of("tdr-csv") {
        match sweeps {
            [one] => match one.tdr {
                Some(ref tdr) => report::save_tdr(path, tdr)?,
                None => log::warn!("no TDR trace for this sweep, skipping {}", path),
            },
            _ => log::warn!("TDR export needs a single band, skipping {}", path),
        }
    }
    Ok(())
}

fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();

    if matches.is_present("list-ports") {
        list_ports()?;
        return Ok(());
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        log::warn!("could not load config, using defaults: {}", e);
        Config::default()
    });
    if let Some(port) = matches.value_of("port") {
        config.port = Some(port.to_owned());
    }
    if matches.is_present("baud") {
        config.baud_rate = value_t_or_exit!(matches, "baud", u32);
    }
    if matches.is_present("points") {
        config.points = value_t_or_exit!(matches, "points", usize);
    }
    if matches.is_present("vf") {
        config.velocity_factor = value_t_or_exit!(matches, "vf", f64);
    }
    config.validate()?;
    if matches.is_present("save-config") {
        config.save()?;
        log::info!("saved settings to {}", Config::path()?.display());
    }

    let requests = requests(&matches, &config)?;

    if matches.is_present("live") {
        let request = match requests.as_slice() {
            [one] => *one,
            _ => return Err(Error::InvalidRequest(
                "live mode sweeps a single band, not a group".to_owned()
            ).into()),
        };
        let acquisition = App::connect(config)?.acquire(request, true);
        let stop = acquisition.stop_handle();
        let last = plot::cli::live(plot::cli::WINDOW_SIZE, acquisition.results(), &stop)?;
        acquisition.join()?;
        if let Some(last) = last {
            export(&matches, std::slice::from_ref(&last))?;
        }
        return Ok(());
    }

    let mut app = App::connect(config)?;
    let sweeps = app.scan(&requests);
    app.close()?;

    export(&matches, &sweeps)?;
    plot::cli::show(&matches, plot::cli::WINDOW_SIZE, &sweeps)
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_groups_expand_to_every_band() {
        let matches = cli().get_matches_from(vec!["reaa30", "--band", "CW"]);
        let reqs = requests(&matches, &Config::default()).unwrap();
        assert_eq!(reqs.len(), presets::group("cw").unwrap().len());
        assert_eq!(reqs[0].steps(), 201);

        let matches = cli().get_matches_from(vec!["reaa30", "--band", "40cw", "-n", "7"]);
        let config = Config { points: 7, ..Config::default() };
        let reqs = requests(&matches, &config).unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].steps(), 7);
    }

    #[test]
    fn live_runs_export_the_last_sweep() {
        let dir = std::env::temp_dir().join(format!("reaa30-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let csv = dir.join("sweep.csv");
        let tdr = dir.join("tdr.csv");
        let matches = cli().get_matches_from(vec![
            "reaa30", "--live",
            "--csv", csv.to_str().unwrap(),
            "--tdr-csv", tdr.to_str().unwrap(),
        ]);
        let last = Analysis::default().run(SweepResult {
            samples: vec![Sample::new(7e6, 50.0, 0.0), Sample::new(7.1e6, 100.0, 0.0)],
            ..SweepResult::default()
        });
        export(&matches, std::slice::from_ref(&last)).unwrap();
        assert_eq!(std::fs::read_to_string(&csv).unwrap().lines().count(), 3);
        assert!(std::fs::read_to_string(&tdr).unwrap().lines().count() > 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
