/// The capabilities shared by every sensor, regardless of what it measures or how it is wired.
///
/// This lets callers treat different sensors uniformly: start them once with [`Sensor::begin`],
/// then periodically [`Sensor::read`] and fetch the latest values. A failed read is never fatal;
/// callers are expected to retry on their own schedule.
pub trait Sensor {
    /// Prepares the sensor for reading. Returns false if the sensor could not be initialized.
    fn begin(&mut self) -> bool;

    /// Acquires a new measurement. Returns true iff a trustworthy value was obtained.
    fn read(&mut self) -> bool;

    /// The last trustworthy temperature in degrees Celsius, or NaN if there is none.
    fn get_temperature(&self) -> f32;

    /// The last trustworthy relative humidity in percent.
    ///
    /// Returns `None` if the sensor cannot measure humidity at all.
    fn get_humidity(&self) -> Option<f32> {
        None
    }

    /// Whether this sensor can measure humidity.
    fn has_humidity(&self) -> bool {
        self.get_humidity().is_some()
    }
}
