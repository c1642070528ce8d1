use crate::crc;
use crate::onewire::OneWire;
use crate::sensor::Sensor;
use core::time::Duration;

/// The maximum resolution of the sensor when in 12-bit mode.
pub const MAX_RESOLUTION_F32: f32 = 0.0625;
/// The maximum resolution of the sensor when in 12-bit mode.
pub const MAX_RESOLUTION_F64: f64 = 0.0625;

/// The number of bytes in the sensor's scratchpad, including the CRC byte.
pub const SCRATCHPAD_LEN: usize = 9;

/// The maximum time a 9-bit temperature conversion may take.
pub const CONVERSION_TIME_9BIT: Duration = Duration::from_micros(93_750);
/// The maximum time a 10-bit temperature conversion may take.
pub const CONVERSION_TIME_10BIT: Duration = Duration::from_micros(187_500);
/// The maximum time an 11-bit temperature conversion may take.
pub const CONVERSION_TIME_11BIT: Duration = Duration::from_millis(375);
/// The maximum time a 12-bit temperature conversion may take.
///
/// This is also the worst case for any resolution, so it is the default conversion wait.
pub const CONVERSION_TIME_12BIT: Duration = Duration::from_millis(750);

const CONFIGURATION_BYTE_INDEX: usize = 4;
const RESOLUTION_BITS_MASK: u8 = 0x60;

#[derive(Debug, PartialEq)]
pub enum Error<TBusError> {
    /// Wrapped error from the bus.
    Wrapped(TBusError),
    /// Invalid argument was provided.
    InvalidArgument,
    /// No device responded to a reset, either before the conversion or before the read.
    NoPresence,
    /// The scratchpad's CRC did not match its contents.
    BadCrc,
}

impl<TBusError> From<TBusError> for Error<TBusError> {
    fn from(error: TBusError) -> Error<TBusError> {
        Error::Wrapped(error)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ResolutionMode {
    /// Nine-bit resolution reads the temperature in 0.5 degree increments.
    NineBit = 0b00,
    /// Ten-bit resolution reads the temperature in 0.25 degree increments.
    TenBit = 0b01,
    /// Eleven-bit resolution reads the temperature in 0.125 degree increments.
    ElevenBit = 0b10,
    /// Twelve-bit resolution reads the temperature in 0.0625 degree increments.
    TwelveBit = 0b11,
}

impl ResolutionMode {
    /// Decodes the resolution from the sensor's configuration byte (bits 5 and 6).
    pub fn from_configuration_byte(byte: u8) -> Self {
        match (byte & RESOLUTION_BITS_MASK) >> 5 {
            0b00 => ResolutionMode::NineBit,
            0b01 => ResolutionMode::TenBit,
            0b10 => ResolutionMode::ElevenBit,
            _ => ResolutionMode::TwelveBit,
        }
    }

    /// The number of significant bits in a reading.
    pub fn bits(self) -> u8 {
        9 + self as u8
    }

    /// The longest time the sensor may take to convert a reading at this resolution.
    pub const fn conversion_time(self) -> Duration {
        match self {
            ResolutionMode::NineBit => CONVERSION_TIME_9BIT,
            ResolutionMode::TenBit => CONVERSION_TIME_10BIT,
            ResolutionMode::ElevenBit => CONVERSION_TIME_11BIT,
            ResolutionMode::TwelveBit => CONVERSION_TIME_12BIT,
        }
    }

    /// Masks the low bits that are undefined at this resolution.
    fn mask(self) -> i16 {
        match self {
            ResolutionMode::NineBit => !0b111,
            ResolutionMode::TenBit => !0b11,
            ResolutionMode::ElevenBit => !0b1,
            ResolutionMode::TwelveBit => !0,
        }
    }
}

/// ROM commands for addressing devices on the line.
///
/// Only `Skip` is supported, so exactly one device may be connected.
pub enum RomCommand {
    /// Addresses all devices simultaneously.
    ///
    /// If there is only one device on the line, this can be used instead of a matching ROM code
    /// for all function commands.
    Skip = 0xCC,
}

/// Requests the sensor perform some operation.
///
/// These commands can only be sent after a [`RomCommand`].
pub enum FunctionCommand {
    /// Stores the current temperature in the 2-byte temperature register in the scratchpad memory.
    ///
    /// If in parasitic power mode, the line must be pulled-up within 10us of sending this command
    /// and held high while the conversion happens.
    ///
    /// After this command, the sensor returns to its low-power state.
    ConvertTemperature = 0x44,
    /// Reads the contents of the sensor's scratchpad.
    ///
    /// Bytes:
    ///
    /// 1. Byte 0: Temperature least-significant byte.
    /// 2. Byte 1: Temperature most-significant byte.
    /// 3. Byte 2: High temperature threshold for the alarm (T<sub>H</sub>).
    /// 4. Byte 3: Low temperature threshold for the alarm (T<sub>L</sub>).
    /// 5. Byte 4: Configuration (i.e. [`ResolutionMode`]).
    /// 6. Byte 5: Reserved (0xFF)
    /// 7. Byte 6: Reserved
    /// 8. Byte 7: Reserved (0x10)
    /// 9. Byte 8: The CRC of bytes 0-7.
    ReadScratchpad = 0xBE,
}

/// Represents a temperature reading from the sensor.
///
/// Stores the raw two's-complement reading in 1/16 degree steps, with any bits that are undefined
/// at the sensor's resolution cleared.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Temperature {
    raw: i16,
}

impl Temperature {
    pub fn from_raw(raw: i16, resolution: ResolutionMode) -> Self {
        Temperature {
            raw: raw & resolution.mask(),
        }
    }

    pub fn from_bytes(low_sig: u8, high_sig: u8, resolution: ResolutionMode) -> Self {
        Temperature::from_raw(i16::from_le_bytes([low_sig, high_sig]), resolution)
    }

    /// The reading in 1/16 degree steps.
    pub fn raw(&self) -> i16 {
        self.raw
    }

    /// The integer part of the temperature measurement, rounded towards zero.
    pub fn integer_part(&self) -> i16 {
        self.raw / 16
    }

    /// The decimal part of the temperature measurement, in 1/16 degree steps.
    ///
    /// Has the same sign as the measurement. Can be multiplied by [`MAX_RESOLUTION_F32`] or
    /// [`MAX_RESOLUTION_F64`] to convert it to a floating point value.
    pub fn decimal_part(&self) -> i8 {
        (self.raw % 16) as i8
    }

    /// The nearest integer of the temperature measurement. Halves round away from zero.
    ///
    /// Calculated without performing floating-point operations.
    pub fn nearest_integer(&self) -> i16 {
        let decimal = self.decimal_part();
        self.integer_part() + (decimal.signum() * (decimal.abs() >> 3)) as i16
    }
}

impl From<Temperature> for f32 {
    fn from(temp: Temperature) -> Self {
        temp.raw as f32 * MAX_RESOLUTION_F32
    }
}

impl From<Temperature> for f64 {
    fn from(temp: Temperature) -> Self {
        temp.raw as f64 * MAX_RESOLUTION_F64
    }
}

/// The sensor's register block, as returned by [`FunctionCommand::ReadScratchpad`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scratchpad([u8; SCRATCHPAD_LEN]);

impl Scratchpad {
    pub fn new(bytes: [u8; SCRATCHPAD_LEN]) -> Self {
        Scratchpad(bytes)
    }

    /// The raw register bytes, in the order they were read.
    pub fn bytes(&self) -> &[u8; SCRATCHPAD_LEN] {
        &self.0
    }

    /// The CRC byte sent by the sensor.
    pub fn crc(&self) -> u8 {
        self.0[SCRATCHPAD_LEN - 1]
    }

    /// The CRC computed over the data bytes.
    pub fn calculated_crc(&self) -> u8 {
        crc::compute(&self.0[..SCRATCHPAD_LEN - 1])
    }

    pub fn is_valid(&self) -> bool {
        self.crc() == self.calculated_crc()
    }

    pub fn resolution(&self) -> ResolutionMode {
        ResolutionMode::from_configuration_byte(self.0[CONFIGURATION_BYTE_INDEX])
    }

    /// The temperature held in the scratchpad, masked to its configured resolution.
    ///
    /// This does not check the CRC.
    pub fn temperature(&self) -> Temperature {
        Temperature::from_bytes(self.0[0], self.0[1], self.resolution())
    }
}

/// Options to modify the behavior of the DS18B20 driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Options {
    /// How long to wait for the sensor to convert a temperature before reading it. Cannot be below
    /// [`CONVERSION_TIME_9BIT`].
    ///
    /// Waiting less than the conversion time of the sensor's configured resolution reads a stale
    /// or undefined temperature. Only shorten this if the sensor is known to be configured with a
    /// lower resolution (see [`Options::for_resolution`]).
    pub conversion_time: Duration,
    /// Whether a failed read keeps the last trustworthy temperature.
    ///
    /// If false, a failed read resets the stored temperature to NaN.
    pub retain_on_failure: bool,
}

impl Options {
    /// Options that wait only as long as the given resolution requires.
    pub const fn for_resolution(resolution: ResolutionMode) -> Options {
        Options {
            conversion_time: resolution.conversion_time(),
            retain_on_failure: DEFAULT_OPTIONS.retain_on_failure,
        }
    }

    /// Whether the conversion time is long enough for any resolution to complete.
    pub fn is_valid(&self) -> bool {
        self.conversion_time >= CONVERSION_TIME_9BIT
    }
}

pub const DEFAULT_OPTIONS: Options = Options {
    conversion_time: CONVERSION_TIME_12BIT,
    retain_on_failure: true,
};

/// Resets the line and asks the sensor to start converting a temperature.
pub(crate) fn start_conversion<TBus: OneWire>(bus: &mut TBus) -> Result<(), Error<TBus::Error>> {
    if !bus.reset()? {
        warn!("DS18B20 did not respond before conversion");
        return Err(Error::NoPresence);
    }
    bus.write_byte(RomCommand::Skip as u8)?;
    bus.write_byte(FunctionCommand::ConvertTemperature as u8)?;
    Ok(())
}

/// Resets the line and reads back the whole scratchpad.
pub(crate) fn read_scratchpad<TBus: OneWire>(
    bus: &mut TBus,
) -> Result<Scratchpad, Error<TBus::Error>> {
    if !bus.reset()? {
        warn!("DS18B20 did not respond after conversion");
        return Err(Error::NoPresence);
    }
    bus.write_byte(RomCommand::Skip as u8)?;
    bus.write_byte(FunctionCommand::ReadScratchpad as u8)?;
    let mut data = [0u8; SCRATCHPAD_LEN];
    for byte in data.iter_mut() {
        *byte = bus.read_byte()?;
    }
    Ok(Scratchpad::new(data))
}

/// Validates the scratchpad and extracts its temperature in degrees Celsius.
pub(crate) fn decode<TBusError>(scratchpad: &Scratchpad) -> Result<f32, Error<TBusError>> {
    let calculated_crc = scratchpad.calculated_crc();
    if calculated_crc != scratchpad.crc() {
        warn!(
            "DS18B20 scratchpad CRC mismatch: received {}, calculated {}",
            scratchpad.crc(),
            calculated_crc
        );
        return Err(Error::BadCrc);
    }

    let resolution = scratchpad.resolution();
    let celsius = f32::from(scratchpad.temperature());
    debug!(
        "DS18B20 read {} C at {}-bit resolution",
        celsius,
        resolution.bits()
    );
    Ok(celsius)
}

/// A DS18B20 that is the only device on its 1-Wire bus.
///
/// Each read runs a full acquisition cycle: reset, start a conversion, wait for it, reset, then
/// read and validate the scratchpad. The last trustworthy temperature is kept so that it can be
/// fetched independently of the read.
pub struct Ds18b20<TBus> {
    bus: TBus,
    options: Options,
    last_temperature: f32,
}

impl<TBus: OneWire> Ds18b20<TBus> {
    /// Constructs a DS18B20 driver that owns the given bus.
    ///
    /// If options is `None`, then [`DEFAULT_OPTIONS`] is used, which waits for the worst-case
    /// 12-bit conversion time on every read.
    pub fn new(bus: TBus, options: Option<Options>) -> Result<Ds18b20<TBus>, Error<TBus::Error>> {
        let options = options.unwrap_or(DEFAULT_OPTIONS);
        if !options.is_valid() {
            return Err(Error::InvalidArgument);
        }
        Ok(Ds18b20 {
            bus: bus,
            options: options,
            last_temperature: f32::NAN,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Releases the bus.
    pub fn free(self) -> TBus {
        self.bus
    }

    /// Reads the temperature in degrees Celsius.
    ///
    /// This blocks for the configured conversion time (750ms by default). On success, the
    /// temperature is also stored for [`Sensor::get_temperature`].
    pub fn try_read(&mut self) -> Result<f32, Error<TBus::Error>> {
        let result = self.acquire();
        self.record(result)
    }

    /// Reads the temperature in degrees Celsius, sleeping during the conversion.
    ///
    /// This will asynchronously sleep using the provided `delay_fn` while the sensor converts the
    /// temperature. Communication with the sensor itself is blocking, and takes about 10ms.
    pub async fn read_async<DelayFn, EmptyFuture>(
        &mut self,
        delay_fn: DelayFn,
    ) -> Result<f32, Error<TBus::Error>>
    where
        DelayFn: Fn(Duration) -> EmptyFuture,
        EmptyFuture: core::future::Future<Output = ()>,
    {
        if let Err(err) = start_conversion(&mut self.bus) {
            return self.record(Err(err));
        }
        delay_fn(self.options.conversion_time).await;
        let result = read_scratchpad(&mut self.bus).and_then(|scratchpad| decode(&scratchpad));
        self.record(result)
    }

    fn acquire(&mut self) -> Result<f32, Error<TBus::Error>> {
        start_conversion(&mut self.bus)?;
        self.bus.hold(self.options.conversion_time)?;
        let scratchpad = read_scratchpad(&mut self.bus)?;
        decode(&scratchpad)
    }

    fn record(
        &mut self,
        result: Result<f32, Error<TBus::Error>>,
    ) -> Result<f32, Error<TBus::Error>> {
        match &result {
            Ok(celsius) => self.last_temperature = *celsius,
            Err(_) if !self.options.retain_on_failure => self.last_temperature = f32::NAN,
            Err(_) => {}
        }
        result
    }
}

impl<TBus: OneWire> Sensor for Ds18b20<TBus> {
    fn begin(&mut self) -> bool {
        info!(
            "DS18B20 ready, conversion wait {} ms",
            self.options.conversion_time.as_millis() as u32
        );
        self.bus.release().is_ok()
    }

    fn read(&mut self) -> bool {
        self.try_read().is_ok()
    }

    fn get_temperature(&self) -> f32 {
        self.last_temperature
    }
}
