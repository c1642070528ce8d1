use core::convert::TryFrom;
use core::marker::PhantomData;
use core::time::Duration;
use embedded_hal::delay::blocking::DelayUs;
use embedded_hal::digital::PinState;
use embedded_hal::digital::blocking::{InputPin, IoPin, OutputPin};

const RESET_TIME_US: u32 = 480;
// Sensors send a 60-240us presence pulse starting 15-60us after the reset.
const FIRST_PRESENCE_PULSE_DELAY_US: u32 = 30;
const SECOND_PRESENCE_PULSE_DELAY_US: u32 = 30;
const POST_PRESENCE_PULSE_DELAY_US: u32 =
    RESET_TIME_US - FIRST_PRESENCE_PULSE_DELAY_US - SECOND_PRESENCE_PULSE_DELAY_US;

const READ_WRITE_RECOVERY_TIME_US: u32 = 1;
// Slot durations are measured from the falling edge that starts the slot.
const MIN_READ_WRITE_DURATION_US: u32 = 60;
const WRITE_1_DURATION_US: u32 = 1;
const WRITE_1_POST_BIT_DELAY_US: u32 = MIN_READ_WRITE_DURATION_US - WRITE_1_DURATION_US;
const WRITE_0_DURATION_US: u32 = 60;
const READ_REQUEST_DURATION_US: u32 = 1;
const READ_SAMPLE_DELAY_US: u32 = 15 - READ_REQUEST_DURATION_US;
const READ_POST_SAMPLE_DELAY_US: u32 =
    MIN_READ_WRITE_DURATION_US - READ_REQUEST_DURATION_US - READ_SAMPLE_DELAY_US;

#[derive(Debug, PartialEq)]
pub enum Error<TIoError, TDelayError> {
    /// Wrapped error from the pin.
    Wrapped(TIoError),
    /// Wrapped error from the delay provider.
    WrappedDelay(TDelayError),
    /// The pin was lost by an earlier error while it was switching modes.
    PinUnavailable,
}

/// The physical-layer primitives of a 1-Wire bus.
///
/// Implementations own the data line. Every operation returns with the line released (i.e. held
/// high by the pull-up) so the next operation can start from a known state.
pub trait OneWire {
    type Error;

    /// Releases the line so that it idles high.
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Sends a reset pulse, and returns whether any device responded with a presence pulse.
    ///
    /// A missing presence pulse is not an error: it is the expected result when no device is
    /// connected.
    fn reset(&mut self) -> Result<bool, Self::Error>;

    /// Writes a byte to the line, least-significant bit first.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Reads a byte from the line, least-significant bit first.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Keeps the line released for the given duration.
    ///
    /// Devices drawing parasitic power rely on the line being held high while they work, e.g.
    /// during a temperature conversion.
    fn hold(&mut self, duration: Duration) -> Result<(), Self::Error>;
}

/// A 1-Wire bus driven by toggling a single open-drain GPIO.
///
/// The pin is switched into input mode to sample the line, and back into output mode for
/// everything else. All timing is performed with blocking microsecond delays, so the delay
/// provider must be accurate to within a few microseconds.
///
/// Errors from the pin or the delay provider abort the current operation but leave the bus
/// usable. Only a failure while switching the pin's mode loses the pin, after which every
/// operation fails with [`Error::PinUnavailable`].
pub struct BitBangOneWire<TInputPin, TOutputPin, TDelay> {
    pin: Option<TOutputPin>,
    delay: TDelay,
    phantom_in_pin: PhantomData<TInputPin>,
}

impl<TInputPin, TOutputPin, TError, TDelay, TDelayError>
    BitBangOneWire<TInputPin, TOutputPin, TDelay>
where
    TInputPin: InputPin<Error = TError> + IoPin<TInputPin, TOutputPin, Error = TError>,
    TOutputPin: OutputPin<Error = TError> + IoPin<TInputPin, TOutputPin, Error = TError>,
    TDelay: DelayUs<Error = TDelayError>,
{
    /// Constructs a bus on the given pin.
    ///
    /// The line is not touched until the first operation.
    pub fn new(pin: TOutputPin, delay: TDelay) -> Self {
        BitBangOneWire {
            pin: Some(pin),
            delay: delay,
            phantom_in_pin: PhantomData,
        }
    }

    /// Returns the pin and delay provider.
    ///
    /// The pin is `None` if it was lost to an error while switching modes.
    pub fn free(self) -> (Option<TOutputPin>, TDelay) {
        (self.pin, self.delay)
    }

    fn wrap_pin_error(error: TError) -> Error<TError, TDelayError> {
        Error::Wrapped(error)
    }

    fn take_pin(&mut self) -> Result<TOutputPin, Error<TError, TDelayError>> {
        self.pin.take().ok_or(Error::PinUnavailable)
    }

    fn delay_us(&mut self, us: u32) -> Result<(), Error<TError, TDelayError>> {
        self.delay.delay_us(us).map_err(Error::WrappedDelay)
    }

    /// Runs `drive_fn` with the output pin, and hands the pin back to the bus even if it failed.
    fn with_output<DriveFn>(&mut self, drive_fn: DriveFn) -> Result<(), Error<TError, TDelayError>>
    where
        DriveFn: FnOnce(&mut Self, &mut TOutputPin) -> Result<(), Error<TError, TDelayError>>,
    {
        let mut pin = self.take_pin()?;
        let result = drive_fn(self, &mut pin);
        self.pin = Some(pin);
        result
    }

    /// Switches the pin into input mode, samples the line with `sample_fn`, and switches the pin
    /// back to a released output.
    ///
    /// The pin is only lost if one of the mode switches fails.
    fn with_input<T, SampleFn>(
        &mut self,
        sample_fn: SampleFn,
    ) -> Result<T, Error<TError, TDelayError>>
    where
        SampleFn: FnOnce(&mut Self, &TInputPin) -> Result<T, Error<TError, TDelayError>>,
    {
        let pin: TInputPin = self
            .take_pin()?
            .into_input_pin()
            .map_err(Self::wrap_pin_error)?;
        let result = sample_fn(self, &pin);
        let pin: TOutputPin = pin
            .into_output_pin(PinState::High)
            .map_err(Self::wrap_pin_error)?;
        self.pin = Some(pin);
        result
    }

    /// Writes a single bit to the line.
    fn write_bit(&mut self, bit: bool) -> Result<(), Error<TError, TDelayError>> {
        self.with_output(|bus, pin| {
            // Ensure we wait for recovery period between reads/writes.
            pin.set_high().map_err(Self::wrap_pin_error)?;
            bus.delay_us(READ_WRITE_RECOVERY_TIME_US)?;

            pin.set_low().map_err(Self::wrap_pin_error)?;
            bus.delay_us(if bit {
                WRITE_1_DURATION_US
            } else {
                WRITE_0_DURATION_US
            })?;

            // Return high and wait out the rest of the slot.
            pin.set_high().map_err(Self::wrap_pin_error)?;
            if bit {
                bus.delay_us(WRITE_1_POST_BIT_DELAY_US)?;
            }
            Ok(())
        })
    }

    /// Reads a single bit from the line.
    fn read_bit(&mut self) -> Result<bool, Error<TError, TDelayError>> {
        self.with_output(|bus, pin| {
            pin.set_high().map_err(Self::wrap_pin_error)?;
            bus.delay_us(READ_WRITE_RECOVERY_TIME_US)?;

            // Request bit.
            pin.set_low().map_err(Self::wrap_pin_error)?;
            bus.delay_us(READ_REQUEST_DURATION_US)?;
            pin.set_high().map_err(Self::wrap_pin_error)
        })?;

        // Read bit after sample delay, then wait out the rest of the slot.
        self.with_input(|bus, pin| {
            bus.delay_us(READ_SAMPLE_DELAY_US)?;
            let data = pin.is_high().map_err(Self::wrap_pin_error)?;
            bus.delay_us(READ_POST_SAMPLE_DELAY_US)?;
            Ok(data)
        })
    }
}

impl<TInputPin, TOutputPin, TError, TDelay, TDelayError> OneWire
    for BitBangOneWire<TInputPin, TOutputPin, TDelay>
where
    TInputPin: InputPin<Error = TError> + IoPin<TInputPin, TOutputPin, Error = TError>,
    TOutputPin: OutputPin<Error = TError> + IoPin<TInputPin, TOutputPin, Error = TError>,
    TDelay: DelayUs<Error = TDelayError>,
{
    type Error = Error<TError, TDelayError>;

    fn release(&mut self) -> Result<(), Self::Error> {
        match self.pin.as_mut() {
            Some(pin) => pin.set_high().map_err(Self::wrap_pin_error),
            None => Err(Error::PinUnavailable),
        }
    }

    fn reset(&mut self) -> Result<bool, Self::Error> {
        // Hold pin low for at least 480us.
        self.with_output(|bus, pin| {
            pin.set_low().map_err(Self::wrap_pin_error)?;
            bus.delay_us(RESET_TIME_US)?;
            pin.set_high().map_err(Self::wrap_pin_error)
        })?;

        // Check that we receive a presence pulse, then wait the remaining time.
        let is_present = self.with_input(|bus, pin| {
            bus.delay_us(FIRST_PRESENCE_PULSE_DELAY_US)?;
            let mut is_present = pin.is_low().map_err(Self::wrap_pin_error)?;
            bus.delay_us(SECOND_PRESENCE_PULSE_DELAY_US)?;
            is_present |= pin.is_low().map_err(Self::wrap_pin_error)?;
            bus.delay_us(POST_PRESENCE_PULSE_DELAY_US)?;
            Ok(is_present)
        })?;

        trace!("1-Wire reset, presence: {}", is_present);
        Ok(is_present)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        for bit in 0..8 {
            self.write_bit((byte >> bit) & 1 != 0)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut byte = 0u8;
        for bit in 0..8 {
            byte |= (self.read_bit()? as u8) << bit;
        }
        Ok(byte)
    }

    fn hold(&mut self, duration: Duration) -> Result<(), Self::Error> {
        self.release()?;
        // Durations beyond a single delay call are split into several.
        let mut remaining_us = duration.as_micros();
        while remaining_us > 0 {
            let us = u32::try_from(remaining_us).unwrap_or(u32::MAX);
            self.delay_us(us)?;
            remaining_us -= u128::from(us);
        }
        Ok(())
    }
}
