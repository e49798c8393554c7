//! * Compensation maths for the BME280
//! Floating-point compensation formulas from section 4.2.3 of the Bosch
//! datasheet. Pressure and humidity both consume the fine temperature value
//! produced by the temperature stage, so the stages only make sense run in
//! temperature, pressure, humidity order within one sample.

use crate::calibration::Calibration;

/// Raw ADC codes extracted from one 8-byte data burst.
#[derive(Debug, Copy, Clone)]
pub struct RawSample {
    /// 20-bit pressure code.
    pub pressure: u32,
    /// 20-bit temperature code.
    pub temperature: u32,
    /// 16-bit humidity code.
    pub humidity: u16,
}

impl RawSample {
    /// Unpack the burst read from 0xf7: pressure and temperature are
    /// 20 bits across three bytes each (top nibble of the third byte
    /// unused), humidity is a plain big-endian 16-bit pair.
    pub fn from_burst(buf: &[u8; 8]) -> RawSample {
        RawSample {
            pressure: u32::from(buf[0]) << 12 | u32::from(buf[1]) << 4 | u32::from(buf[2]) >> 4,
            temperature: u32::from(buf[3]) << 12 | u32::from(buf[4]) << 4 | u32::from(buf[5]) >> 4,
            humidity: u16::from(buf[6]) << 8 | u16::from(buf[7]),
        }
    }
}

/// Compensate the raw temperature code.
///
/// Returns degrees Celsius together with the fine temperature carry the
/// pressure and humidity stages require.
pub fn temperature(adc_t: u32, cal: &Calibration) -> (f64, i32) {
    let adc_t = f64::from(adc_t);
    let t1 = f64::from(cal.dig_t1);
    let var1 = (adc_t / 16384.0 - t1 / 1024.0) * f64::from(cal.dig_t2);
    let var2 = (adc_t / 131072.0 - t1 / 8192.0)
        * (adc_t / 131072.0 - t1 / 8192.0)
        * f64::from(cal.dig_t3);
    ((var1 + var2) / 5120.0, (var1 + var2) as i32)
}

/// Compensate the raw pressure code, in hectopascals.
///
/// Returns `None` when the calibration data drives the denominator term to
/// zero; the datasheet leaves the output undefined there.
pub fn pressure(adc_p: u32, t_fine: i32, cal: &Calibration) -> Option<f64> {
    let var1 = f64::from(t_fine) / 2.0 - 64000.0;
    let mut var2 = var1 * var1 * f64::from(cal.dig_p6) / 32768.0;
    var2 += var1 * f64::from(cal.dig_p5) * 2.0;
    var2 = var2 / 4.0 + f64::from(cal.dig_p4) * 65536.0;
    let var1 =
        (f64::from(cal.dig_p3) * var1 * var1 / 524288.0 + f64::from(cal.dig_p2) * var1) / 524288.0;
    let var1 = (1.0 + var1 / 32768.0) * f64::from(cal.dig_p1);
    if var1 == 0.0 {
        return None;
    }
    let p = 1048576.0 - f64::from(adc_p);
    let p = (p - var2 / 4096.0) * 6250.0 / var1;
    let var1 = f64::from(cal.dig_p9) * p * p / 2147483648.0;
    let var2 = p * f64::from(cal.dig_p8) / 32768.0;
    Some((p + (var1 + var2 + f64::from(cal.dig_p7)) / 16.0) / 100.0)
}

/// Compensate the raw humidity code, as a relative humidity percentage.
///
/// The raw formula swings outside 0..100 near the sensor's saturation
/// limits; the result is clamped per the datasheet.
pub fn humidity(adc_h: u16, t_fine: i32, cal: &Calibration) -> f64 {
    let h = f64::from(t_fine) - 76800.0;
    let h = (f64::from(adc_h)
        - (f64::from(cal.dig_h4) * 64.0 + f64::from(cal.dig_h5) / 16384.0 * h))
        * (f64::from(cal.dig_h2) / 65536.0
            * (1.0
                + f64::from(cal.dig_h6) / 67108864.0
                    * h
                    * (1.0 + f64::from(cal.dig_h3) / 67108864.0 * h)));
    let h = h * (1.0 - f64::from(cal.dig_h1) * h / 524288.0);
    if h > 100.0 {
        100.0
    } else if h < 0.0 {
        0.0
    } else {
        h
    }
}
