use log::debug;
use std::io;
use std::thread::{self, JoinHandle};

pub trait Scheduler {
    /// Runs `f` on a worker named `name`.
    fn spawn<F>(&self, name: &str, f: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static;
}

pub struct ThreadScheduler;

impl ThreadScheduler {
    pub fn new() -> Self {
        ThreadScheduler
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadScheduler {
    fn spawn<F>(&self, name: &str, f: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        debug!("Spawning worker thread {}", name);
        thread::Builder::new().name(name.to_string()).spawn(f)
    }
}
