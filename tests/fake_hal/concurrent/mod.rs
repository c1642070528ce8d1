use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;

// Input pins are sampled through `&self`, so the position in each pin's scripted samples lives
// here, keyed by pin name. Names must be unique across tests.
lazy_static! {
    static ref SAMPLE_INDICES: Mutex<HashMap<&'static str, usize>> = Mutex::new(HashMap::new());
}

pub fn reset_sample_index(name: &'static str) {
    let mut map = SAMPLE_INDICES.lock().unwrap();
    map.insert(name, 0);
}

pub fn next_sample_index(name: &str) -> usize {
    let mut map = SAMPLE_INDICES.lock().unwrap();
    let index = map.get_mut(name).unwrap();
    *index += 1;
    *index - 1
}

pub fn sample_index(name: &str) -> usize {
    let map = SAMPLE_INDICES.lock().unwrap();
    *map.get(name).unwrap()
}
