use super::concurrent;
use embedded_hal::digital::PinState;
use embedded_hal::digital::blocking::{InputPin, IoPin, OutputPin};

#[derive(Debug, PartialEq)]
pub enum Error {
    Fault,
}

/// An open-drain pin with a scripted line state.
///
/// Each sample of the line consumes the next scripted value (0 is low, anything else is high).
/// Once the script runs out, or if there is none, the line reads as pulled high.
#[derive(Debug)]
pub struct Pin {
    samples: Vec<u8>,
    name: &'static str,
    conversion_fault: bool,
    pub levels: Vec<bool>,
}

impl Pin {
    pub fn new(name: &'static str) -> Pin {
        concurrent::reset_sample_index(name);
        Pin {
            samples: Vec::new(),
            name: name,
            conversion_fault: false,
            levels: Vec::new(),
        }
    }

    pub fn set_samples(&mut self, samples: Vec<u8>) {
        self.samples = samples;
        concurrent::reset_sample_index(self.name);
    }

    /// Fails every switch between input and output mode.
    pub fn set_conversion_fault(&mut self, fault: bool) {
        self.conversion_fault = fault;
    }

    pub fn samples_taken(&self) -> usize {
        concurrent::sample_index(self.name)
    }

    fn sample(&self) -> bool {
        let index = concurrent::next_sample_index(self.name);
        self.samples.get(index).map_or(true, |sample| *sample > 0)
    }
}

impl InputPin for Pin {
    type Error = Error;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.sample())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.sample())
    }
}

impl OutputPin for Pin {
    type Error = Error;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}

impl IoPin<Pin, Pin> for Pin {
    type Error = Error;

    fn into_input_pin(self) -> Result<Pin, Self::Error> {
        if self.conversion_fault {
            return Err(Error::Fault);
        }
        Ok(self)
    }

    fn into_output_pin(mut self, state: PinState) -> Result<Pin, Self::Error> {
        if self.conversion_fault {
            return Err(Error::Fault);
        }
        self.levels.push(matches!(state, PinState::High));
        Ok(self)
    }
}

/// Scripts the samples of a byte read, least-significant bit first.
pub fn byte_samples(byte: u8) -> Vec<u8> {
    (0..8).map(|bit| (byte >> bit) & 1).collect()
}

/// Scripts the two samples of a reset with the device present.
pub const PRESENT: [u8; 2] = [0, 0];
/// Scripts the two samples of a reset with no device on the line.
pub const ABSENT: [u8; 2] = [1, 1];
