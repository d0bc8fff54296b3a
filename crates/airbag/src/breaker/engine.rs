// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tick::Clock;

use super::constants::ERR_POISONED_LOCK;
use super::{CircuitSnapshot, CircuitState};

#[derive(Debug, Clone, Copy)]
pub(crate) struct EngineOptions {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

/// How a call was admitted. Returned to [`Engine::exit`] together with the call outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Permit {
    /// Regular call while the circuit was closed, tagged with the closed period it belongs to.
    Normal { generation: u64 },
    /// The single trial call of a half-open circuit.
    Trial { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnterCircuitResult {
    Accepted(Permit),
    /// The circuit moved to half-open and admitted a trial call.
    HalfOpened { permit: Permit, failure_count: u32 },
    Rejected { retry_after: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitCircuitResult {
    Unchanged,
    Opened { failure_count: u32 },
    Reopened { failure_count: u32 },
    Closed,
}

/// Circuit state machine. Every transition happens under one lock.
#[derive(Debug)]
pub(crate) struct Engine {
    core: Mutex<Core>,
    options: EngineOptions,
    clock: Clock,
}

impl Engine {
    pub fn new(options: EngineOptions, clock: Clock) -> Self {
        Self {
            core: Mutex::new(Core::default()),
            options,
            clock,
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn enter(&self) -> EnterCircuitResult {
        let now = self.clock.instant();

        // NOTE: Time is read outside the lock.
        self.core.lock().expect(ERR_POISONED_LOCK).enter(now, &self.options)
    }

    pub fn exit(&self, permit: Permit, success: bool) -> ExitCircuitResult {
        let now = self.clock.instant();

        self.core.lock().expect(ERR_POISONED_LOCK).exit(permit, success, now, &self.options)
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let core = self.core.lock().expect(ERR_POISONED_LOCK);

        CircuitSnapshot {
            state: core.state,
            failure_count: core.failure_count,
            last_failure_time: core.last_failure_time,
        }
    }

    pub fn reset(&self) {
        let mut core = self.core.lock().expect(ERR_POISONED_LOCK);
        let next_trial_id = core.next_trial_id;
        let generation = core.generation.wrapping_add(1);

        // Outstanding permits are invalidated by advancing the generation and keeping the id counter.
        *core = Core {
            generation,
            next_trial_id,
            ..Core::default()
        };
    }
}

#[derive(Debug, Default)]
struct Core {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
    trial: Option<Trial>,
    next_trial_id: u64,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Trial {
    id: u64,
    started_at: Instant,
}

impl Core {
    fn enter(&mut self, now: Instant, options: &EngineOptions) -> EnterCircuitResult {
        match self.state {
            CircuitState::Closed => EnterCircuitResult::Accepted(Permit::Normal {
                generation: self.generation,
            }),
            CircuitState::Open => {
                let opened_at = self.last_failure_time.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);

                if elapsed < options.recovery_timeout {
                    return EnterCircuitResult::Rejected {
                        retry_after: options.recovery_timeout.saturating_sub(elapsed),
                    };
                }

                self.state = CircuitState::HalfOpen;
                EnterCircuitResult::HalfOpened {
                    permit: self.start_trial(now),
                    failure_count: self.failure_count,
                }
            }
            CircuitState::HalfOpen => match self.trial {
                // A trial that has not reported back within the recovery timeout is superseded.
                Some(trial) if now.saturating_duration_since(trial.started_at) < options.recovery_timeout => {
                    EnterCircuitResult::Rejected {
                        retry_after: options
                            .recovery_timeout
                            .saturating_sub(now.saturating_duration_since(trial.started_at)),
                    }
                }
                _ => EnterCircuitResult::Accepted(self.start_trial(now)),
            },
        }
    }

    fn exit(&mut self, permit: Permit, success: bool, now: Instant, options: &EngineOptions) -> ExitCircuitResult {
        match (permit, self.state) {
            (Permit::Normal { generation }, CircuitState::Closed) if generation == self.generation => {
                if success {
                    self.failure_count = 0;
                    return ExitCircuitResult::Unchanged;
                }

                self.record_failure(now);

                if self.failure_count >= options.failure_threshold {
                    self.open();
                    ExitCircuitResult::Opened {
                        failure_count: self.failure_count,
                    }
                } else {
                    ExitCircuitResult::Unchanged
                }
            }
            (Permit::Trial { id }, CircuitState::HalfOpen) if self.trial.is_some_and(|trial| trial.id == id) => {
                self.trial = None;

                if success {
                    self.state = CircuitState::Closed;
                    self.failure_count = 0;
                    ExitCircuitResult::Closed
                } else {
                    self.open();
                    self.record_failure(now);
                    ExitCircuitResult::Reopened {
                        failure_count: self.failure_count,
                    }
                }
            }
            // The call was admitted under a state that no longer applies; its outcome is ignored.
            _ => ExitCircuitResult::Unchanged,
        }
    }

    fn start_trial(&mut self, now: Instant) -> Permit {
        self.next_trial_id = self.next_trial_id.wrapping_add(1);
        self.trial = Some(Trial {
            id: self.next_trial_id,
            started_at: now,
        });

        Permit::Trial { id: self.next_trial_id }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.generation = self.generation.wrapping_add(1);
    }

    fn record_failure(&mut self, now: Instant) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_time = Some(now);
    }
}
