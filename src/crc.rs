/// The reflected form of the Dallas/Maxim polynomial X<sup>8</sup> + X<sup>5</sup> +
/// X<sup>4</sup> + 1.
pub const POLYNOMIAL: u8 = 0x8C;

/// Shifts a single byte into a running CRC, least-significant bit first.
pub fn update(crc: u8, byte: u8) -> u8 {
    let mut crc = crc;
    let mut byte = byte;
    for _ in 0..8 {
        let mix = (crc ^ byte) & 0x01;
        crc >>= 1;
        if mix != 0 {
            crc ^= POLYNOMIAL;
        }
        byte >>= 1;
    }
    crc
}

/// Computes the CRC of the given bytes, starting from 0.
///
/// This is the checksum DS18B20 devices append to their scratchpad and ROM code.
pub fn compute(data: &[u8]) -> u8 {
    data.iter().fold(0, |crc, byte| update(crc, *byte))
}

/// Whether the last byte of `data` is the CRC of the bytes before it.
///
/// Running the CRC over data followed by its own CRC always results in 0, which is what this
/// checks. Empty data is never valid.
pub fn is_valid(data: &[u8]) -> bool {
    !data.is_empty() && compute(data) == 0
}
