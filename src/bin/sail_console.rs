/**
 * Sail Console
 *
 * Bench tool for a rig:
 * 1. Connects to the microcontroller and gpsd
 * 2. Reads sensors on demand
 * 3. Drives rudder and sail by angle
 *
 * Usage: sail_console [--rig dewi|xpb|kitty] [--config rig.toml] [--port PATH] [--baud N]
 */

use clap::Parser;
use sail_hal::{BoatDriver, RigConfig};
use std::io::{self, Write};

#[derive(Parser, Debug)]
#[command(name = "sail_console", about = "Interactive sensor/actuator console for a sailing rig")]
struct Args {
    /// Built-in rig preset
    #[arg(short, long, default_value = "dewi")]
    rig: String,

    /// TOML rig description (overrides --rig)
    #[arg(short, long)]
    config: Option<String>,

    /// Serial port override
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate override
    #[arg(short, long)]
    baud: Option<u32>,

    /// gpsd address override (host:port)
    #[arg(long)]
    gpsd: Option<String>,
}

fn load_rig(args: &Args) -> sail_hal::Result<RigConfig> {
    let mut rig = match &args.config {
        Some(path) => RigConfig::load(path)?,
        None => RigConfig::preset(&args.rig)?,
    };
    if let Some(port) = &args.port {
        rig.serial.port = port.clone();
    }
    if let Some(baud) = args.baud {
        rig.serial.baud = baud;
    }
    if let Some(gpsd) = &args.gpsd {
        rig.gpsd.address = gpsd.clone();
    }
    Ok(rig)
}

fn show(label: &str, reading: sail_hal::Result<Option<f64>>) {
    match reading {
        Ok(Some(value)) => println!("[{}] {:.1}", label, value),
        Ok(None) => println!("[{}] unsupported on this rig", label),
        Err(e) => println!("[{}] error: {}", label, e),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let rig = match load_rig(&args) {
        Ok(rig) => rig,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    println!("==============================================");
    println!("  Sail Console");
    println!("==============================================");
    println!("  Rig:  {}", rig.name);
    println!("  Port: {}", rig.serial.port);
    println!("  Baud: {}", rig.serial.baud);
    println!("  GPS:  {}", rig.gpsd.address);
    println!("==============================================\n");

    let mut driver = match BoatDriver::connect(rig) {
        Ok(driver) => driver,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    println!("[Commands]");
    println!("  c          - heading");
    println!("  p / &      - pitch / roll");
    println!("  w          - wind (absolute and apparent)");
    println!("  g          - position");
    println!("  r <angle>  - rudder");
    println!("  s <angle>  - sail");
    println!("  reconnect  - re-open serial and gpsd");
    println!("  x          - exit\n");

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let mut words = input.split_whitespace();
        let cmd = words.next().unwrap_or("");
        let angle = words.next().map(|w| w.parse::<f64>());

        match (cmd, angle) {
            ("c", None) => show("HEADING", driver.heading().map(Some)),
            ("p", None) => show("PITCH", driver.pitch()),
            ("&", None) => show("ROLL", driver.roll()),
            ("w", None) => {
                show("WIND", driver.wind_direction());
                show("APPARENT", driver.apparent_wind_direction());
                show("SPEED", Ok(driver.wind_speed()));
            }
            ("g", None) => {
                let (lat, lon) = driver.position();
                println!("[POSITION] {:.6}, {:.6}", lat, lon);
            }
            ("r", Some(Ok(angle))) => match driver.rudder(angle) {
                Ok(pwm) => println!("[RUDDER {:.1}] pwm={}", angle, pwm),
                Err(e) => println!("[RUDDER] error: {}", e),
            },
            ("s", Some(Ok(angle))) => match driver.sail(angle) {
                Ok(Some(pwm)) => println!("[SAIL {:.1}] pwm={}", angle, pwm),
                Ok(None) => println!("[SAIL] no winch on this rig"),
                Err(e) => println!("[SAIL] error: {}", e),
            },
            ("r", _) | ("s", _) => println!("Expected an angle in degrees"),
            ("reconnect", None) => match driver.reconnect() {
                Ok(()) => println!("[RECONNECTED]"),
                Err(e) => println!("[RECONNECT] error: {}", e),
            },
            ("x", None) | ("exit", None) | ("quit", None) => {
                println!("[SHUTDOWN]");
                break;
            }
            ("", None) => {}
            _ => println!("Unknown command: {}", input.trim()),
        }
    }

    println!("Goodbye!");
}
