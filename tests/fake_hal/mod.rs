#![allow(dead_code)]

pub mod bus;
mod concurrent;
pub mod delay;
pub mod digital;
