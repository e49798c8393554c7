//! # A driver for the Bosch BME280 environmental sensor on Linux I2C
//!
//! The [BME280](https://www.bosch-sensortec.com/products/environmental-sensors/humidity-sensors-bme280/)
//! is a combined temperature, pressure and humidity sensor behind a
//! register-addressed serial bus. This crate drives it through the Linux
//! `/dev/i2c-*` interface and applies the datasheet's floating-point
//! compensation formulas to the raw readings.
//!
//! A device is driven through four steps, in order:
//!
//! * `open` the bus and select the sensor's address
//! * `read_calibration` to fetch the factory coefficient blocks
//! * `configure` to set oversampling and put the chip in normal mode
//! * `sample`, repeatedly, to obtain compensated readings
//!
//! ```no_run
//! use bme280_linux::Bme280;
//!
//! let mut sensor = Bme280::open_default().unwrap();
//! sensor.read_calibration().unwrap();
//! sensor.configure().unwrap();
//! let reading = sensor.sample().unwrap();
//! println!("{:.2} C", reading.temperature.as_celsius());
//! sensor.close();
//! ```
//!
//! The driver is fully synchronous and owns its bus handle exclusively. It
//! performs no internal locking; callers sharing one `Bme280` across threads
//! must provide their own mutual exclusion. Independent devices on distinct
//! handles may be used concurrently.

extern crate byteorder;
extern crate i2cdev;
extern crate measurements;

mod calibration;
mod compensation;
pub mod registers;
mod rh;

pub use measurements::Pressure;
pub use measurements::Temperature;
pub use crate::rh::RelativeHumidity;

use std::fmt;
use std::path::Path;

use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};

use crate::calibration::Calibration;
use crate::compensation::RawSample;

/// Default I2C bus device path.
pub const DEFAULT_BUS: &str = "/dev/i2c-1";
/// Default BME280 slave address (0x77 is the common alternative).
pub const DEFAULT_ADDRESS: u16 = 0x76;

/// Errors that this crate can return, parameterised over the transport's
/// own error type.
#[derive(Debug)]
pub enum Bme280Error<E> {
    /// Opening the bus device failed.
    BusOpen(E),
    /// Selecting the slave address failed.
    AddressSelect(E),
    /// A bus write failed.
    Write(E),
    /// A bus read failed.
    Read(E),
    /// A required input was missing or out of range.
    InvalidArgument(&'static str),
    /// The operation needs a state the device has not reached yet.
    NotInitialized,
    /// The pressure compensation denominator was zero for this
    /// calibration data; the datasheet leaves the result undefined.
    Computation,
}

/// A shortcut for Results that can return `T` or `Bme280Error`.
pub type Bme280Result<T, E = LinuxI2CError> = Result<T, Bme280Error<E>>;

impl<E: fmt::Display> fmt::Display for Bme280Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Bme280Error::BusOpen(e) => write!(f, "failed to open I2C bus: {}", e),
            Bme280Error::AddressSelect(e) => {
                write!(f, "failed to select I2C slave address: {}", e)
            }
            Bme280Error::Write(e) => write!(f, "I2C write operation failed: {}", e),
            Bme280Error::Read(e) => write!(f, "I2C read operation failed: {}", e),
            Bme280Error::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            Bme280Error::NotInitialized => write!(f, "device not initialized"),
            Bme280Error::Computation => {
                write!(f, "pressure compensation denominator is zero")
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Bme280Error<E> {}

/// One compensated measurement of all three quantities.
#[derive(Debug, Copy, Clone)]
pub struct Reading {
    /// Ambient temperature (Celsius and Fahrenheit via `measurements`).
    pub temperature: Temperature,
    /// Barometric pressure.
    pub pressure: Pressure,
    /// Relative humidity, clamped to 0..=100 percent.
    pub humidity: RelativeHumidity,
}

/// Protocol state. Calibration data lives inside the state that owns it,
/// so a sample can only ever see coefficients that were actually read.
enum State {
    Closed,
    Open,
    Calibrated(Calibration),
    Configured(Calibration),
}

/// The narrow bus capability the driver needs: raw byte writes and reads,
/// paired up at the call sites into register write-then-read transactions.
///
/// Every [`i2cdev::core::I2CDevice`] gets this for free via the blanket
/// impl, so `LinuxI2CDevice` and the i2cdev mock device both qualify.
pub trait BusTransport {
    type Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;
    fn read(&mut self, data: &mut [u8]) -> Result<(), Self::Error>;
}

impl<T> BusTransport for T
where
    T: I2CDevice,
{
    type Error = <T as I2CDevice>::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        I2CDevice::write(self, data)
    }

    fn read(&mut self, data: &mut [u8]) -> Result<(), Self::Error> {
        I2CDevice::read(self, data)
    }
}

/// Represents one BME280 device on one bus handle.
///
/// Invariant: `dev` is `Some` exactly when the state is not `Closed`. The
/// handle is released by `close` or, failing that, when the value drops.
pub struct Bme280<T: BusTransport> {
    dev: Option<T>,
    state: State,
}

/// One register transaction: write the register address byte, then read
/// `buf.len()` bytes back.
fn transact<T: BusTransport>(
    dev: &mut T,
    register: u8,
    buf: &mut [u8],
) -> Bme280Result<(), T::Error> {
    dev.write(&[register]).map_err(Bme280Error::Write)?;
    dev.read(buf).map_err(Bme280Error::Read)
}

impl Bme280<LinuxI2CDevice> {
    /// Open the sensor on the given bus path and slave address.
    pub fn open<P: AsRef<Path>>(
        path: P,
        address: u16,
    ) -> Bme280Result<Bme280<LinuxI2CDevice>, LinuxI2CError> {
        if address > 0x7f {
            return Err(Bme280Error::InvalidArgument(
                "I2C address out of 7-bit range",
            ));
        }
        // LinuxI2CDevice::new fuses open and address selection; reassert
        // the address so selection failures are reported distinctly.
        let mut dev = LinuxI2CDevice::new(path, address).map_err(Bme280Error::BusOpen)?;
        dev.set_slave_address(address)
            .map_err(Bme280Error::AddressSelect)?;
        Ok(Bme280::new(dev))
    }

    /// Open the sensor on [`DEFAULT_BUS`] at [`DEFAULT_ADDRESS`].
    pub fn open_default() -> Bme280Result<Bme280<LinuxI2CDevice>, LinuxI2CError> {
        Bme280::open(DEFAULT_BUS, DEFAULT_ADDRESS)
    }
}

impl<T> Bme280<T>
where
    T: BusTransport,
{
    /// Wrap an already-open transport whose slave address is selected.
    pub fn new(dev: T) -> Bme280<T> {
        Bme280 {
            dev: Some(dev),
            state: State::Open,
        }
    }

    /// Read and decode the three factory calibration blocks.
    ///
    /// Any bus failure leaves the previous state untouched; the stored
    /// calibration is replaced only once all three bursts succeed.
    /// Re-reading on a configured device drops back to the calibrated
    /// state, so `configure` must be repeated before sampling again.
    pub fn read_calibration(&mut self) -> Bme280Result<(), T::Error> {
        let dev = self.dev.as_mut().ok_or(Bme280Error::NotInitialized)?;
        let mut temp_press = [0u8; registers::CALIB_TEMP_PRESS_LEN];
        transact(dev, registers::REG_CALIB_TEMP_PRESS, &mut temp_press)?;
        let mut hum1 = [0u8; 1];
        transact(dev, registers::REG_CALIB_HUM1, &mut hum1)?;
        let mut hum2 = [0u8; registers::CALIB_HUM2_LEN];
        transact(dev, registers::REG_CALIB_HUM2, &mut hum2)?;
        self.state = State::Calibrated(Calibration::from_registers(&temp_press, hum1[0], &hum2));
        Ok(())
    }

    /// Apply the fixed operating configuration: humidity oversampling,
    /// then measurement control, then standby/filter, per
    /// [`registers::CONFIG_SEQUENCE`].
    ///
    /// Requires calibration to have been read first.
    pub fn configure(&mut self) -> Bme280Result<(), T::Error> {
        let cal = match &self.state {
            State::Calibrated(cal) | State::Configured(cal) => *cal,
            _ => return Err(Bme280Error::NotInitialized),
        };
        let dev = self.dev.as_mut().ok_or(Bme280Error::NotInitialized)?;
        for &(register, value) in registers::CONFIG_SEQUENCE.iter() {
            dev.write(&[register, value]).map_err(Bme280Error::Write)?;
        }
        self.state = State::Configured(cal);
        Ok(())
    }

    /// Read one data burst and compensate it into physical units.
    ///
    /// Valid only on a configured device; repeatable without any further
    /// state change.
    pub fn sample(&mut self) -> Bme280Result<Reading, T::Error> {
        let cal = match &self.state {
            State::Configured(cal) => *cal,
            _ => return Err(Bme280Error::NotInitialized),
        };
        let dev = self.dev.as_mut().ok_or(Bme280Error::NotInitialized)?;
        let mut burst = [0u8; registers::DATA_LEN];
        transact(dev, registers::REG_DATA, &mut burst)?;
        let raw = RawSample::from_burst(&burst);

        // Temperature must run first: its fine temperature carry feeds
        // both of the other stages.
        let (celsius, t_fine) = compensation::temperature(raw.temperature, &cal);
        let hectopascals =
            compensation::pressure(raw.pressure, t_fine, &cal).ok_or(Bme280Error::Computation)?;
        let percent = compensation::humidity(raw.humidity, t_fine, &cal);

        Ok(Reading {
            temperature: Temperature::from_celsius(celsius),
            pressure: Pressure::from_hectopascals(hectopascals),
            humidity: RelativeHumidity::from_percent(percent),
        })
    }

    /// Release the bus handle and return to the closed state.
    ///
    /// Safe to call from any state, any number of times.
    pub fn close(&mut self) {
        self.dev = None;
        self.state = State::Closed;
    }

    #[cfg(test)]
    fn device_mut(&mut self) -> &mut T {
        self.dev.as_mut().unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use i2cdev::mock::MockI2CDevice;
    use std::io;

    // Datasheet worked-example coefficients, already encoded as the three
    // calibration register blocks.
    const TEMP_PRESS_BLOCK: [u8; 24] = [
        0x70, 0x6b, // T1 = 27504
        0x43, 0x67, // T2 = 26435
        0x18, 0xfc, // T3 = -1000
        0x7d, 0x8e, // P1 = 36477
        0x43, 0xd6, // P2 = -10685
        0xd0, 0x0b, // P3 = 3024
        0x27, 0x0b, // P4 = 2855
        0x8c, 0x00, // P5 = 140
        0xf9, 0xff, // P6 = -7
        0x8c, 0x3c, // P7 = 15500
        0xf8, 0xc6, // P8 = -14600
        0x70, 0x17, // P9 = 6000
    ];
    const HUM1_BLOCK: [u8; 1] = [75];
    // H2 = 362, H3 = 0, H4 = 315, H5 = 50, H6 = 30
    const HUM2_BLOCK: [u8; 7] = [0x6a, 0x01, 0x00, 0x13, 0x2b, 0x03, 0x1e];
    // adc_p = 415148, adc_t = 519888, adc_h = 30000
    const DATA_BURST: [u8; 8] = [0x65, 0x5a, 0xc0, 0x7e, 0xed, 0x00, 0x75, 0x30];

    fn loaded_mock() -> MockI2CDevice {
        let mut dev = MockI2CDevice::new();
        dev.regmap
            .write_regs(usize::from(registers::REG_CALIB_TEMP_PRESS), &TEMP_PRESS_BLOCK);
        dev.regmap
            .write_regs(usize::from(registers::REG_CALIB_HUM1), &HUM1_BLOCK);
        dev.regmap
            .write_regs(usize::from(registers::REG_CALIB_HUM2), &HUM2_BLOCK);
        dev.regmap
            .write_regs(usize::from(registers::REG_DATA), &DATA_BURST);
        dev
    }

    fn mock_sensor() -> Bme280<MockI2CDevice> {
        Bme280::new(loaded_mock())
    }

    /// Forwards to a loaded mock device but fails the nth bus operation,
    /// counting writes and reads alike from zero.
    struct FaultyDevice {
        inner: MockI2CDevice,
        fail_at: usize,
        ops: usize,
    }

    impl FaultyDevice {
        fn new(fail_at: usize) -> FaultyDevice {
            FaultyDevice {
                inner: loaded_mock(),
                fail_at,
                ops: 0,
            }
        }

        fn tick(&mut self) -> Result<(), io::Error> {
            let failing = self.ops == self.fail_at;
            self.ops += 1;
            if failing {
                Err(io::Error::new(io::ErrorKind::Other, "bus fault"))
            } else {
                Ok(())
            }
        }
    }

    impl BusTransport for FaultyDevice {
        type Error = io::Error;

        fn write(&mut self, data: &[u8]) -> Result<(), io::Error> {
            self.tick()?;
            I2CDevice::write(&mut self.inner, data).unwrap();
            Ok(())
        }

        fn read(&mut self, data: &mut [u8]) -> Result<(), io::Error> {
            self.tick()?;
            I2CDevice::read(&mut self.inner, data).unwrap();
            Ok(())
        }
    }

    fn read_register(sensor: &mut Bme280<MockI2CDevice>, register: u8) -> u8 {
        let mut buf = [0u8; 1];
        transact(sensor.device_mut(), register, &mut buf).unwrap();
        buf[0]
    }

    #[test]
    fn full_sequence_produces_datasheet_reading() {
        let mut sensor = mock_sensor();
        sensor.read_calibration().unwrap();
        sensor.configure().unwrap();
        let reading = sensor.sample().unwrap();
        assert!((reading.temperature.as_celsius() - 25.0825).abs() < 0.01);
        assert!((reading.temperature.as_fahrenheit() - 77.1485).abs() < 0.02);
        assert!((reading.pressure.as_hectopascals() - 1006.5326).abs() < 0.1);
        assert!((reading.humidity.as_percent() - 54.2888).abs() < 0.1);
        sensor.close();
    }

    #[test]
    fn sampling_is_repeatable() {
        let mut sensor = mock_sensor();
        sensor.read_calibration().unwrap();
        sensor.configure().unwrap();
        let first = sensor.sample().unwrap();
        let second = sensor.sample().unwrap();
        assert_eq!(
            first.temperature.as_celsius(),
            second.temperature.as_celsius()
        );
    }

    #[test]
    fn configure_writes_policy_bytes() {
        let mut sensor = mock_sensor();
        sensor.read_calibration().unwrap();
        sensor.configure().unwrap();
        assert_eq!(read_register(&mut sensor, registers::REG_CTRL_HUM), 0x01);
        assert_eq!(read_register(&mut sensor, registers::REG_CTRL_MEAS), 0x27);
        assert_eq!(read_register(&mut sensor, registers::REG_CONFIG), 0xa0);
    }

    #[test]
    fn sample_requires_configuration() {
        let mut sensor = mock_sensor();
        assert!(matches!(sensor.sample(), Err(Bme280Error::NotInitialized)));
        sensor.read_calibration().unwrap();
        assert!(matches!(sensor.sample(), Err(Bme280Error::NotInitialized)));
    }

    #[test]
    fn configure_requires_calibration() {
        let mut sensor = mock_sensor();
        assert!(matches!(
            sensor.configure(),
            Err(Bme280Error::NotInitialized)
        ));
    }

    #[test]
    fn failed_calibration_read_leaves_state_unadvanced() {
        // Transactions are write/read pairs; ops 0..=5 cover the three
        // calibration bursts. Fail the first write, the first read, and a
        // read in the last burst: none may leave usable calibration behind.
        for fail_at in [0, 1, 5].iter().cloned() {
            let mut sensor = Bme280::new(FaultyDevice::new(fail_at));
            let err = sensor.read_calibration().unwrap_err();
            assert!(matches!(
                err,
                Bme280Error::Write(_) | Bme280Error::Read(_)
            ));
            assert!(matches!(
                sensor.configure(),
                Err(Bme280Error::NotInitialized)
            ));
            assert!(matches!(sensor.sample(), Err(Bme280Error::NotInitialized)));
        }
    }

    #[test]
    fn failed_configure_leaves_sample_rejected() {
        // Op 7 is the second of the three configuration writes, so the
        // failure lands mid-sequence.
        let mut sensor = Bme280::new(FaultyDevice::new(7));
        sensor.read_calibration().unwrap();
        assert!(matches!(sensor.configure(), Err(Bme280Error::Write(_))));
        assert!(matches!(sensor.sample(), Err(Bme280Error::NotInitialized)));
        // The device is still calibrated; a clean configure recovers it.
        sensor.configure().unwrap();
        assert!(sensor.sample().is_ok());
    }

    #[test]
    fn failed_sample_keeps_device_configured() {
        // Op 9 is the data-burst register write of the first sample.
        let mut sensor = Bme280::new(FaultyDevice::new(9));
        sensor.read_calibration().unwrap();
        sensor.configure().unwrap();
        assert!(matches!(sensor.sample(), Err(Bme280Error::Write(_))));
        assert!(sensor.sample().is_ok());
    }

    #[test]
    fn recalibration_demands_reconfiguration() {
        let mut sensor = mock_sensor();
        sensor.read_calibration().unwrap();
        sensor.configure().unwrap();
        sensor.read_calibration().unwrap();
        assert!(matches!(sensor.sample(), Err(Bme280Error::NotInitialized)));
        sensor.configure().unwrap();
        assert!(sensor.sample().is_ok());
    }

    #[test]
    fn close_is_idempotent() {
        let mut sensor = mock_sensor();
        sensor.close();
        sensor.close();
        assert!(matches!(sensor.sample(), Err(Bme280Error::NotInitialized)));
        assert!(matches!(
            sensor.read_calibration(),
            Err(Bme280Error::NotInitialized)
        ));
    }

    #[test]
    fn close_after_full_sequence_resets_state() {
        let mut sensor = mock_sensor();
        sensor.read_calibration().unwrap();
        sensor.configure().unwrap();
        sensor.sample().unwrap();
        sensor.close();
        assert!(matches!(sensor.sample(), Err(Bme280Error::NotInitialized)));
    }

    #[test]
    fn open_rejects_out_of_range_address() {
        assert!(matches!(
            Bme280::open("/dev/i2c-1", 0x1234),
            Err(Bme280Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn every_error_kind_has_a_description() {
        fn io_err() -> LinuxI2CError {
            LinuxI2CError::Io(io::Error::new(io::ErrorKind::Other, "boom"))
        }
        let errors: Vec<Bme280Error<LinuxI2CError>> = vec![
            Bme280Error::BusOpen(io_err()),
            Bme280Error::AddressSelect(io_err()),
            Bme280Error::Write(io_err()),
            Bme280Error::Read(io_err()),
            Bme280Error::InvalidArgument("x"),
            Bme280Error::NotInitialized,
            Bme280Error::Computation,
        ];
        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
