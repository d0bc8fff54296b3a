// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Exactly-once execution of keyed operations.
//!
//! An [`IdempotencyManager`] maps caller-chosen keys (an order id, a client-supplied
//! idempotency key) to the successful result of the first operation run under that key. Later
//! calls with the key get the stored result back without running their operation, until the
//! cache TTL has elapsed.
//!
//! Only successes are stored. A failed operation leaves no trace, so the caller may retry it
//! under the same key.
//!
//! # Logs
//!
//! With logs enabled, replaying a stored result emits `airbag.idempotency.hit` and
//! [`cleanup_expired`][IdempotencyManager::cleanup_expired] emits `airbag.idempotency.cleanup`,
//! both at `DEBUG`.

mod builder;
mod entry;
mod manager;

pub use builder::IdempotencyBuilder;
pub use manager::IdempotencyManager;
