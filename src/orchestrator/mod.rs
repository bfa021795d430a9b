pub mod service;
pub mod state;

pub use service::{RequestTicket, WeatherOrchestrator};
pub use state::{RequestState, StateSnapshot, WeatherReport, WeatherView, WeatherWatcher};
