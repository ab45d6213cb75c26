//! Looping replay of a day of aircraft state vectors.
//!
//! A [`loader::Dataset`] is replayed by a [`session::ReplaySession`]: every tick maps wall-clock
//! time to a simulated time ([`clock`]), selects what is visible ([`aggregate`]), updates the
//! per-aircraft trails ([`trails`]) and hands two GeoJSON sources to a [`frame::RenderSurface`].

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod loader;
pub mod session;
pub mod state;
pub mod trails;
pub mod types;
