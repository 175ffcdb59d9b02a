// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Close-or-defer reconciliation of the open-step stack.
//!
//! A close request names a step that may sit anywhere on the open-step
//! stack. Closing it would also close every step stacked above it, and
//! those steps may still be live. The resolution: a step whose close had
//! to be deferred earlier is fair game to close in passing; a step that
//! never asked to close yet is not, and forces the new request to be
//! deferred in turn.

use crate::reporter::state::ReportState;
use quick_allure::Status;
use tracing::trace;

/// Closes the open step named `name`, defers the close, or ignores it.
///
/// Walks the open-step stack from the deepest step toward the test. Every
/// step visited before the match is checked off against a working copy of
/// the postponed set; a visited step with no postponed entry means closing
/// through it would cut a live step short, so the request itself is
/// postponed instead. A clean match closes the matched step and everything
/// above it in one sweep and commits the working copy. A name not on the
/// stack at all is a stale close and does nothing.
pub(crate) fn reconcile(state: &mut ReportState, name: &str, status: Status) {
    let mut working = state.postponed_steps.clone();
    let mut depth = 0;
    let mut must_defer = false;
    let mut matched = false;

    for step in state.step_stack.iter().rev() {
        depth += 1;
        if step.name == name {
            matched = true;
            break;
        }
        match working.iter().position(|postponed| postponed == &step.name) {
            Some(index) => {
                working.remove(index);
            }
            None => must_defer = true,
        }
    }

    if !matched {
        trace!(name, "step close does not match any open step, ignoring");
        return;
    }

    if must_defer {
        trace!(name, "step close would cut a live step short, postponing");
        state.postponed_steps.push(name.to_owned());
        return;
    }

    for _ in 0..depth {
        state.pop_step_closed(status);
    }
    state.postponed_steps = working;
}
