// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Consecutive failures that open a closed circuit.
pub(super) const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Time an open circuit rejects calls before admitting a trial call.
pub(super) const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

pub(super) const ERR_POISONED_LOCK: &str = "poisoned lock - cannot continue execution because security and privacy guarantees can no longer be upheld";
