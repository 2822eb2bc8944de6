pub mod client;
pub mod config;
pub mod exec;
pub mod worker;

pub use client::CoordinatorClient;
pub use config::{WorkerArgs, WorkerConfig};
pub use worker::{ExitReason, Worker, WorkerSummary};
