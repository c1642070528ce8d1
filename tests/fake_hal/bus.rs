use onewire_sensors::onewire::OneWire;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, PartialEq)]
pub enum Error {
    Fault,
}

/// Everything the driver asked the bus to do, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Release,
    Reset,
    Write(u8),
    Read,
    Hold(Duration),
}

/// A bus with a scripted device on it.
///
/// Resets answer with the queued presences (absent once they run out), and reads return the
/// queued bytes (0xFF, i.e. an idle line, once they run out).
pub struct Bus {
    presences: VecDeque<bool>,
    data_to_read: VecDeque<u8>,
    write_fault: bool,
    events: Rc<RefCell<Vec<Event>>>,
}

impl Bus {
    pub fn new() -> Bus {
        Bus {
            presences: VecDeque::new(),
            data_to_read: VecDeque::new(),
            write_fault: false,
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A bus whose device answers one full read cycle with the given scratchpad.
    pub fn responding_with(scratchpad: [u8; 9]) -> Bus {
        let mut bus = Bus::new();
        bus.add_cycle(scratchpad);
        bus
    }

    pub fn add_cycle(&mut self, scratchpad: [u8; 9]) {
        self.add_presences(&[true, true]);
        self.data_to_read.extend(scratchpad.iter());
    }

    pub fn add_presences(&mut self, presences: &[bool]) {
        self.presences.extend(presences.iter());
    }

    pub fn set_write_fault(&mut self, fault: bool) {
        self.write_fault = fault;
    }

    pub fn events(&self) -> Rc<RefCell<Vec<Event>>> {
        self.events.clone()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl OneWire for Bus {
    type Error = Error;

    fn release(&mut self) -> Result<(), Self::Error> {
        self.record(Event::Release);
        Ok(())
    }

    fn reset(&mut self) -> Result<bool, Self::Error> {
        self.record(Event::Reset);
        Ok(self.presences.pop_front().unwrap_or(false))
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        if self.write_fault {
            return Err(Error::Fault);
        }
        self.record(Event::Write(byte));
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        self.record(Event::Read);
        Ok(self.data_to_read.pop_front().unwrap_or(0xFF))
    }

    fn hold(&mut self, duration: Duration) -> Result<(), Self::Error> {
        self.record(Event::Hold(duration));
        Ok(())
    }
}

/// The events of one successful acquisition cycle with the given conversion wait.
pub fn full_cycle(conversion_time: Duration) -> Vec<Event> {
    let mut events = vec![
        Event::Reset,
        Event::Write(0xCC),
        Event::Write(0x44),
        Event::Hold(conversion_time),
        Event::Reset,
        Event::Write(0xCC),
        Event::Write(0xBE),
    ];
    events.extend(std::iter::repeat(Event::Read).take(9));
    events
}
