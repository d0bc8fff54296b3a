// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

/// Names and switches shared by the log events of one component.
#[derive(Debug, Clone)]
pub(crate) struct TelemetryHelper {
    pub(crate) pipeline_name: Cow<'static, str>,
    pub(crate) strategy_name: Cow<'static, str>,
    pub(crate) logs_enabled: bool,
}

impl TelemetryHelper {
    /// Returns `true` when log events should be emitted.
    #[inline]
    pub(crate) fn logs_enabled(&self) -> bool {
        cfg!(any(feature = "logs", test)) && self.logs_enabled
    }
}
