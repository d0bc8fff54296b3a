// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{OnRetryArgs, RecoveryArgs};
use crate::RecoveryInfo;

crate::define_fn_wrapper!(ShouldRetry<E>(Fn(error: &E, args: RecoveryArgs) -> RecoveryInfo));
crate::define_fn_wrapper!(OnRetry<E>(Fn(error: &E, args: OnRetryArgs)));
