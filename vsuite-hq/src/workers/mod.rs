pub mod sweeper;

pub use sweeper::SweepWorker;
