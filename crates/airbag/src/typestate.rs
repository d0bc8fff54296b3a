// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Marks a required builder property that has not been configured yet.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct NotSet;

/// Marks a required builder property that has been configured.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct Set;
