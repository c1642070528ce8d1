use embedded_hal::delay::blocking::DelayUs;

#[derive(Debug, PartialEq)]
pub enum Error {
    Fault,
}

/// Records requested delays instead of sleeping.
#[derive(Debug, Default)]
pub struct Delay {
    pub delays_us: Vec<u32>,
    fault_at: Option<usize>,
}

impl Delay {
    pub fn new() -> Delay {
        Delay::default()
    }

    /// Makes the delay with the given index fail, once.
    pub fn set_fault_at(&mut self, index: usize) {
        self.fault_at = Some(index);
    }

    pub fn total_us(&self) -> u64 {
        self.delays_us.iter().map(|us| *us as u64).sum()
    }
}

impl DelayUs for Delay {
    type Error = Error;

    fn delay_us(&mut self, us: u32) -> Result<(), Self::Error> {
        if self.fault_at == Some(self.delays_us.len()) {
            self.fault_at = None;
            return Err(Error::Fault);
        }
        self.delays_us.push(us);
        Ok(())
    }
}
