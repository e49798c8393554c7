//! Register map and fixed configuration policy for the BME280

/// Temperature and pressure calibration block (T1-T3, P1-P9).
pub const REG_CALIB_TEMP_PRESS: u8 = 0x88;
/// First humidity calibration byte (H1).
pub const REG_CALIB_HUM1: u8 = 0xa1;
/// Remaining humidity calibration block (H2-H6).
pub const REG_CALIB_HUM2: u8 = 0xe1;
/// Humidity oversampling control.
pub const REG_CTRL_HUM: u8 = 0xf2;
/// Measurement control (mode plus temperature/pressure oversampling).
pub const REG_CTRL_MEAS: u8 = 0xf4;
/// Standby time and filter configuration.
pub const REG_CONFIG: u8 = 0xf5;
/// Measurement data burst (pressure, temperature, humidity).
pub const REG_DATA: u8 = 0xf7;

pub const CALIB_TEMP_PRESS_LEN: usize = 24;
pub const CALIB_HUM2_LEN: usize = 7;
pub const DATA_LEN: usize = 8;

/// Humidity oversampling x1.
pub const CTRL_HUM_OVERSAMPLE_X1: u8 = 0x01;
/// Normal running mode, temperature and pressure oversampling x1.
pub const CTRL_MEAS_NORMAL_X1: u8 = 0x27;
/// Standby time 1000 ms, filter off.
pub const CONFIG_STANDBY_1000MS: u8 = 0xa0;

/// Control writes applied by `Bme280::configure`, in issue order.
pub const CONFIG_SEQUENCE: [(u8, u8); 3] = [
    (REG_CTRL_HUM, CTRL_HUM_OVERSAMPLE_X1),
    (REG_CTRL_MEAS, CTRL_MEAS_NORMAL_X1),
    (REG_CONFIG, CONFIG_STANDBY_1000MS),
];
