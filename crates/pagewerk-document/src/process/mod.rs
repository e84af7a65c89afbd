// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process module: typed command construction and external process invocation.

pub mod runner;

pub use runner::{Arg, Invocation, MAX_COMMAND_LENGTH, ProcessInvoker, ProcessRunner};
