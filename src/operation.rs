// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cooperative operations
//!
//! An [`Operation`] is a unit of asynchronous work that is polled to
//! completion by a driver loop, typically once per frame. Polling never
//! blocks: an operation that is not finished simply returns control.
//! Polling a finished operation is a no-op.

use crate::error::BundleError;

/// A cooperative, single-use unit of asynchronous work.
pub trait Operation {
    /// Advance the operation by one step.
    ///
    /// Returns `true` while further polling is required.
    fn update(&mut self) -> bool;

    /// Whether the operation has reached its terminal state.
    fn is_done(&self) -> bool;

    /// Error latched by the operation, if it failed.
    fn error(&self) -> Option<&BundleError> {
        None
    }
}

impl<O: Operation + ?Sized> Operation for Box<O> {
    fn update(&mut self) -> bool {
        (**self).update()
    }

    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    fn error(&self) -> Option<&BundleError> {
        (**self).error()
    }
}

/// Completion flag of a request issued to an external collaborator
/// (asset extraction, scene activation, device preload).
pub trait AsyncRequest: Send {
    /// Pure query; never advances the request
    fn is_done(&self) -> bool;

    /// Advance the request by one step. Called once per poll of the
    /// operation that owns it.
    fn poll(&mut self) {}
}

/// A request that is complete as soon as it is issued.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompletedRequest;

impl AsyncRequest for CompletedRequest {
    fn is_done(&self) -> bool {
        true
    }
}

/// Poll `op` until it is done or `max_ticks` polls have been spent.
///
/// Returns whether the operation finished.
pub fn drive<O: Operation + ?Sized>(op: &mut O, max_ticks: usize) -> bool {
    for _ in 0..max_ticks {
        if op.is_done() {
            return true;
        }
        op.update();
    }
    op.is_done()
}
