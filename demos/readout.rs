extern crate bme280_linux;

use bme280_linux::{Bme280, Bme280Result};

fn run() -> Bme280Result<()> {
    let mut sensor = Bme280::open_default()?;

    sensor.read_calibration()?;
    sensor.configure()?;
    let reading = sensor.sample()?;

    println!(
        "Temperature in Celsius : {:.2} C",
        reading.temperature.as_celsius()
    );
    println!(
        "Temperature in Fahrenheit : {:.2} F",
        reading.temperature.as_fahrenheit()
    );
    println!("Pressure : {:.2} hPa ", reading.pressure.as_hectopascals());
    println!("Relative Humidity : {:.2} %", reading.humidity.as_percent());

    sensor.close();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
