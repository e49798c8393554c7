//! * Calibration coefficient decoding for the BME280
//! Layout per section 4.2.2 of the Bosch datasheet.

use byteorder::{ByteOrder, LittleEndian};

/// Factory calibration coefficients, read once per device.
///
/// Decoded from the two calibration blocks at 0x88 and 0xe1 plus the single
/// H1 byte at 0xa1.
#[derive(Debug, Copy, Clone)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

impl Calibration {
    /// Decode the coefficient set from the raw calibration register bursts.
    ///
    /// Everything is a little-endian 16-bit pair except H1, H3 and H6
    /// (single bytes) and H4/H5, which are 12-bit values nibble-interleaved
    /// across bytes 3..=5 of the 0xe1 block: H4 is byte 3 shifted left over
    /// the low nibble of byte 4, H5 is byte 5 shifted left over the high
    /// nibble of byte 4.
    pub fn from_registers(
        temp_press: &[u8; 24],
        hum1: u8,
        hum2: &[u8; 7],
    ) -> Calibration {
        Calibration {
            dig_t1: LittleEndian::read_u16(&temp_press[0..2]),
            dig_t2: LittleEndian::read_i16(&temp_press[2..4]),
            dig_t3: LittleEndian::read_i16(&temp_press[4..6]),
            dig_p1: LittleEndian::read_u16(&temp_press[6..8]),
            dig_p2: LittleEndian::read_i16(&temp_press[8..10]),
            dig_p3: LittleEndian::read_i16(&temp_press[10..12]),
            dig_p4: LittleEndian::read_i16(&temp_press[12..14]),
            dig_p5: LittleEndian::read_i16(&temp_press[14..16]),
            dig_p6: LittleEndian::read_i16(&temp_press[16..18]),
            dig_p7: LittleEndian::read_i16(&temp_press[18..20]),
            dig_p8: LittleEndian::read_i16(&temp_press[20..22]),
            dig_p9: LittleEndian::read_i16(&temp_press[22..24]),
            dig_h1: hum1,
            dig_h2: LittleEndian::read_i16(&hum2[0..2]),
            dig_h3: hum2[2],
            dig_h4: i16::from(hum2[3]) << 4 | i16::from(hum2[4] & 0x0f),
            dig_h5: i16::from(hum2[4] >> 4) | i16::from(hum2[5]) << 4,
            dig_h6: hum2[6] as i8,
        }
    }
}
