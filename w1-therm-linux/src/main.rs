use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ds2484::{Ds2484, Ds2484Builder};
use linux_embedded_hal::{Delay, I2cdev};
use onewire_bus::OneWireSearch;
use w1_therm::{
    Alarms, BusErrorOf, BusLock, ConversionWait, Rom, SensorHandle, SharedBus, ThermConfig,
    ThermError, W1Therm,
};

type Therm = W1Therm<SharedBus<Ds2484<I2cdev, Delay>>>;
type Error = ThermError<BusErrorOf<SharedBus<Ds2484<I2cdev, Delay>>>>;

/// DS18B20 / DS18S20 thermometers behind a DS2484 1-Wire bridge
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to I2C bus (e.g., /dev/i2c-1)
    #[arg(short, long)]
    path: String,
    /// Attempts at acquiring the bus and at reading a valid scratchpad
    #[arg(long, default_value_t = 5)]
    max_tries: u8,
    /// Delay between two bus acquisition attempts, in milliseconds
    #[arg(long, default_value_t = 20)]
    retry_delay_ms: u32,
    /// Poll externally powered sensors every N milliseconds instead of waiting out the conversion
    #[arg(long)]
    poll_ms: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the thermometers on the bus
    Scan,
    /// Convert and print the temperature of one sensor, or of all of them
    Read { rom: Option<Rom> },
    /// Print the resolution, or set it to BITS (9 to 12)
    Resolution { rom: Rom, bits: Option<u8> },
    /// Print how a sensor is powered
    Power { rom: Rom },
    /// Persist the settings to EEPROM, or reload them from it
    Eeprom {
        rom: Rom,
        #[command(subcommand)]
        action: EepromAction,
    },
    /// Print the alarm thresholds, or set them
    Alarms {
        rom: Rom,
        #[arg(long, requires = "low", allow_hyphen_values = true)]
        high: Option<i8>,
        #[arg(long, requires = "high", allow_hyphen_values = true)]
        low: Option<i8>,
    },
}

#[derive(Subcommand, Debug)]
enum EepromAction {
    /// Copy the scratchpad to EEPROM
    Write,
    /// Recall the EEPROM into the scratchpad
    Read,
}

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Open the I2C bus
    let i2c = I2cdev::new(&args.path).expect("Failed to open I2C device");
    // Create a DS2484 instance
    let ds2484 = Ds2484Builder::default()
        .build(i2c, Delay)
        .expect("Failed to create DS2484 instance");

    let mut config = ThermConfig::default()
        .with_max_tries(args.max_tries)
        .with_retry_delay_ms(args.retry_delay_ms);
    if let Some(interval_ms) = args.poll_ms {
        config = config.with_conversion_wait(ConversionWait::Poll { interval_ms });
    }
    let therm = W1Therm::new(SharedBus::new(ds2484)).with_config(config);

    match run(&therm, args.command, &mut Delay) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(therm: &Therm, command: Command, delay: &mut Delay) -> Result<(), Error> {
    let found = discover(therm)?;
    log::info!("Found {found} thermometers");
    match command {
        Command::Scan => {
            for sensor in therm.sensors() {
                let power = therm.get_power_mode(sensor, delay)?;
                println!(
                    "{} {} {power:?}",
                    therm.rom(sensor)?,
                    therm.family(sensor)?.name()
                );
            }
        }
        Command::Read { rom } => {
            let sensors = match rom {
                Some(rom) => vec![lookup(therm, &rom)?],
                None => therm.sensors(),
            };
            for sensor in sensors {
                let reading = therm.convert_and_read(sensor, delay)?;
                println!("{} {}", therm.rom(sensor)?, reading.millicelsius());
            }
        }
        Command::Resolution { rom, bits } => {
            let sensor = lookup(therm, &rom)?;
            if let Some(bits) = bits {
                therm.set_resolution(sensor, bits, delay)?;
            }
            println!("{}", therm.get_resolution(sensor, delay)?.bits());
        }
        Command::Power { rom } => {
            let sensor = lookup(therm, &rom)?;
            println!("{:?}", therm.get_power_mode(sensor, delay)?);
        }
        Command::Eeprom { rom, action } => {
            let sensor = lookup(therm, &rom)?;
            match action {
                EepromAction::Write => therm.eeprom_write(sensor, delay)?,
                EepromAction::Read => therm.eeprom_read(sensor, delay)?,
            }
        }
        Command::Alarms { rom, high, low } => {
            let sensor = lookup(therm, &rom)?;
            if let (Some(high), Some(low)) = (high, low) {
                therm.set_alarms(sensor, Alarms { high, low }, delay)?;
            }
            let alarms = therm.get_alarms(sensor, delay)?;
            println!("high {} low {}", alarms.high, alarms.low);
        }
    }
    Ok(())
}

/// Walk the bus and register every thermometer on it.
fn discover(therm: &Therm) -> Result<usize, Error> {
    let mut bus = therm
        .bus()
        .acquire(therm.config().lock_timeout())
        .ok_or(ThermError::BusBusy)?;
    let mut search = OneWireSearch::new(&mut *bus);
    let mut found = 0;
    while let Some(rom) = search.next()? {
        match therm.on_sensor_added(rom) {
            Ok(_) => found += 1,
            Err(ThermError::UnsupportedFamily(family)) => {
                log::debug!("{rom}: skipping family {family:#04x}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(found)
}

fn lookup(therm: &Therm, rom: &Rom) -> Result<SensorHandle, Error> {
    therm.find(rom).ok_or(ThermError::UnknownSensor)
}
