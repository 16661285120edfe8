pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod logging;
pub mod midi;
pub mod note;
pub mod scheduler;
pub mod state;
pub mod sync;
pub mod telemetry;
pub mod tempo;

pub use cli::{handle_device_list, validate_device, Args};
pub use error::{ClockError, Result};
pub use scheduler::{Scheduler, ThreadScheduler};
pub use state::{SharedTransport, TransportState};

pub fn create_scheduler() -> ThreadScheduler {
    ThreadScheduler::new()
}

pub fn create_shared_transport() -> SharedTransport {
    TransportState::shared()
}
