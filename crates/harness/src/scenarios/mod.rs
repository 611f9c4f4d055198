//! Built-in scenarios. Each is registered in [`crate::for_each_scenario`].

pub mod rum;
pub mod smoke;
