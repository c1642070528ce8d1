use crate::ds18b20::{self, Error, Options, DEFAULT_OPTIONS};
use crate::onewire::OneWire;
use crate::sensor::Sensor;
use core::time::Duration;

/// The value reported by [`PolledDs18b20::temperature_c`] when no trustworthy reading was made.
///
/// This is well outside the sensor's measurement range of -55 to 125 degrees Celsius.
pub const DEVICE_DISCONNECTED_C: f32 = -127.0;

/// A DS18B20 whose conversion is requested and then polled, instead of waited for.
///
/// This is useful when the caller has other work to do during the conversion. Requesting a
/// temperature only sends the conversion command; [`PolledDs18b20::poll`] then reports
/// [`nb::Error::WouldBlock`] until the conversion time has passed, after which it reads the
/// scratchpad.
///
/// As a [`Sensor`], this behaves identically to [`ds18b20::Ds18b20`].
pub struct PolledDs18b20<TBus, TimeFn, ElapsedFn, TTime>
where
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    bus: TBus,
    options: Options,
    conversion_start: Option<TTime>,
    last_temperature: f32,
    time_fn: TimeFn,
    elapsed_since_fn: ElapsedFn,
}

impl<TBus, TimeFn, ElapsedFn, TTime> PolledDs18b20<TBus, TimeFn, ElapsedFn, TTime>
where
    TBus: OneWire,
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    /// Constructs a polled DS18B20 driver that owns the given bus.
    ///
    /// The provided `time_fn` closure should provide some representation of a given instant that
    /// can be used with `elapsed_since_fn` to determine how much time has passed since then. It
    /// does not need to reflect real dates and times, but only needs to be capable of providing
    /// reasonably accurate durations (i.e. with millisecond precision or better).
    ///
    /// If options is `None`, then [`DEFAULT_OPTIONS`] is used.
    pub fn new(
        bus: TBus,
        time_fn: TimeFn,
        elapsed_since_fn: ElapsedFn,
        options: Option<Options>,
    ) -> Result<PolledDs18b20<TBus, TimeFn, ElapsedFn, TTime>, Error<TBus::Error>> {
        let options = options.unwrap_or(DEFAULT_OPTIONS);
        if !options.is_valid() {
            return Err(Error::InvalidArgument);
        }
        Ok(PolledDs18b20 {
            bus: bus,
            options: options,
            conversion_start: None,
            last_temperature: f32::NAN,
            time_fn: time_fn,
            elapsed_since_fn: elapsed_since_fn,
        })
    }

    /// Releases the bus.
    pub fn free(self) -> TBus {
        self.bus
    }

    /// Whether a conversion has been requested but not yet read.
    pub fn is_conversion_pending(&self) -> bool {
        self.conversion_start.is_some()
    }

    /// Asks the sensor to start converting a temperature.
    ///
    /// Any pending conversion is abandoned and the wait starts over.
    pub fn request_temperature(&mut self) -> Result<(), Error<TBus::Error>> {
        self.conversion_start = None;
        if let Err(err) = ds18b20::start_conversion(&mut self.bus) {
            return self.record(Err(err)).map(|_| ());
        }
        self.conversion_start = Some((self.time_fn)());
        Ok(())
    }

    /// Reads the requested temperature once the conversion time has passed.
    ///
    /// Returns [`nb::Error::WouldBlock`] while the sensor is still converting. If no conversion is
    /// pending, one is requested first.
    pub fn poll(&mut self) -> nb::Result<f32, Error<TBus::Error>> {
        let start = match self.conversion_start {
            Some(start) => start,
            None => {
                self.request_temperature().map_err(nb::Error::Other)?;
                return Err(nb::Error::WouldBlock);
            }
        };
        if (self.elapsed_since_fn)(start) < self.options.conversion_time {
            return Err(nb::Error::WouldBlock);
        }

        self.conversion_start = None;
        let result = ds18b20::read_scratchpad(&mut self.bus)
            .and_then(|scratchpad| ds18b20::decode(&scratchpad));
        self.record(result).map_err(nb::Error::Other)
    }

    /// Requests a temperature and blocks until it has been read.
    ///
    /// Returns the temperature in degrees Celsius, or [`DEVICE_DISCONNECTED_C`] if the read
    /// failed for any reason.
    pub fn temperature_c(&mut self) -> f32 {
        if self.request_temperature().is_err() {
            return DEVICE_DISCONNECTED_C;
        }
        nb::block!(self.poll()).unwrap_or(DEVICE_DISCONNECTED_C)
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

impl<TBus, TimeFn, ElapsedFn, TTime> Sensor for PolledDs18b20<TBus, TimeFn, ElapsedFn, TTime>
where
    TBus: OneWire,
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    fn begin(&mut self) -> bool {
        self.conversion_start = None;
        self.bus.release().is_ok()
    }

    fn read(&mut self) -> bool {
        self.request_temperature().is_ok() && nb::block!(self.poll()).is_ok()
    }

    fn get_temperature(&self) -> f32 {
        self.last_temperature
    }
}
