// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! afd-engine: The dispatcher core.
//!
//! Owns the in-memory status areas, the ready queue, and the connection
//! table; spawns one worker process per transfer, accounts for their
//! exits, retries with backoff, and toggles hosts on sustained failure.
//! The daemon shell feeds it commands and drives [`Dispatcher::tick`].

pub mod connection;
pub mod delete;
pub mod dispatcher;
pub mod dupcheck;
pub mod env;
pub mod error;
pub mod error_engine;
pub mod error_queue;
pub mod fsa_check;
pub mod positions;
pub mod spawn;
pub mod state;

pub use connection::{Connection, ConnectionTable};
pub use dispatcher::{Command, Dispatcher, DispatcherConfig};
pub use dupcheck::{handle_duplicate, DeleteLog, DupContext, DupFlags};
pub use env::WorkEnv;
pub use error::EngineError;
pub use error_engine::{remove_connection, Faulty};
pub use error_queue::ErrorQueue;
pub use spawn::{
    ProcessSpawner, ProgressError, ProgressReport, ReapedWorker, SpawnRequest, TransferSpawner,
};
pub use state::StatusAreas;

#[cfg(any(test, feature = "test-support"))]
pub use spawn::FakeSpawner;
