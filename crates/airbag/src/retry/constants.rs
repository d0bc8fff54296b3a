// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Default number of invocations, including the first one.
pub(super) const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// `Unavailable` errors signal a downstream-wide outage; retrying them is opt-in.
pub(super) const DEFAULT_HANDLE_UNAVAILABLE: bool = false;
