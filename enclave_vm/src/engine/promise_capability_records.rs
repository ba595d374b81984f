// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.1.1 PromiseCapability Records](https://tc39.es/ecma262/#sec-promisecapability-records)
//!
//! One-shot completion cells standing in for host promises. A capability is
//! the resolve/reject side, the [`Promise`] is the consumer side. Reactions
//! never run re-entrantly: settling a promise queues its reactions as jobs on
//! the agent, preserving microtask ordering.
//!
//! Settling an already-settled capability is a no-op, matching promise
//! resolve-function semantics; it is not an internal-consistency violation.

use std::{cell::RefCell, rc::Rc};

use crate::engine::agent::{Agent, JsError};

type Reaction<T> = Box<dyn FnOnce(&mut Agent, Result<T, JsError>)>;

enum PromiseState<T> {
    Pending { reactions: Vec<Reaction<T>> },
    Fulfilled(T),
    Rejected(JsError),
}

/// The consumer half of a one-shot completion. Cheap to clone; all clones
/// observe the same settlement.
pub struct Promise<T>(Rc<RefCell<PromiseState<T>>>);

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// An already-fulfilled promise.
    pub fn resolved(value: T) -> Self {
        Self(Rc::new(RefCell::new(PromiseState::Fulfilled(value))))
    }

    /// An already-rejected promise.
    pub fn rejected(error: JsError) -> Self {
        Self(Rc::new(RefCell::new(PromiseState::Rejected(error))))
    }

    /// Register a reaction to run (as a job) once this promise settles. If it
    /// is already settled the reaction is queued immediately.
    pub fn on_settled(
        &self,
        agent: &mut Agent,
        reaction: impl FnOnce(&mut Agent, Result<T, JsError>) + 'static,
    ) {
        let mut state = self.0.borrow_mut();
        match &mut *state {
            PromiseState::Pending { reactions } => reactions.push(Box::new(reaction)),
            PromiseState::Fulfilled(value) => {
                let value = value.clone();
                drop(state);
                agent.enqueue_job(Box::new(move |agent| reaction(agent, Ok(value))));
            }
            PromiseState::Rejected(error) => {
                let error = error.clone();
                drop(state);
                agent.enqueue_job(Box::new(move |agent| reaction(agent, Err(error))));
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.0.borrow(), PromiseState::Pending { .. })
    }

    /// Snapshot of the settlement, if any. Used by tests and by callers that
    /// have already drained the job queue.
    pub fn result(&self) -> Option<Result<T, JsError>> {
        match &*self.0.borrow() {
            PromiseState::Pending { .. } => None,
            PromiseState::Fulfilled(value) => Some(Ok(value.clone())),
            PromiseState::Rejected(error) => Some(Err(error.clone())),
        }
    }
}

/// The resolve/reject half of a one-shot completion.
pub struct PromiseCapability<T> {
    promise: Promise<T>,
}

impl<T: Clone + 'static> PromiseCapability<T> {
    /// ### [27.2.1.5 NewPromiseCapability](https://tc39.es/ecma262/#sec-newpromisecapability)
    pub fn new() -> Self {
        Self {
            promise: Promise(Rc::new(RefCell::new(PromiseState::Pending {
                reactions: Vec::new(),
            }))),
        }
    }

    pub fn promise(&self) -> Promise<T> {
        self.promise.clone()
    }

    /// Fulfill the promise. No-op if already settled.
    pub fn resolve(&self, agent: &mut Agent, value: T) {
        self.settle(agent, Ok(value));
    }

    /// Reject the promise. No-op if already settled.
    pub fn reject(&self, agent: &mut Agent, error: JsError) {
        self.settle(agent, Err(error));
    }

    fn settle(&self, agent: &mut Agent, result: Result<T, JsError>) {
        let mut state = self.promise.0.borrow_mut();
        let reactions = match &mut *state {
            PromiseState::Pending { reactions } => std::mem::take(reactions),
            // Already settled; later settle attempts are ignored.
            _ => return,
        };
        *state = match &result {
            Ok(value) => PromiseState::Fulfilled(value.clone()),
            Err(error) => PromiseState::Rejected(error.clone()),
        };
        drop(state);
        for reaction in reactions {
            let result = result.clone();
            agent.enqueue_job(Box::new(move |agent| reaction(agent, result)));
        }
    }
}

impl<T: Clone + 'static> Default for PromiseCapability<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PromiseCapability<T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn reactions_run_as_jobs_not_inline() {
        let mut agent = Agent::new();
        let capability = PromiseCapability::<u32>::new();
        let observed = Rc::new(Cell::new(0));
        let o = observed.clone();
        capability
            .promise()
            .on_settled(&mut agent, move |_, result| o.set(result.unwrap()));
        capability.resolve(&mut agent, 7);
        // Settlement is visible immediately, the reaction only after jobs run.
        assert_eq!(observed.get(), 0);
        agent.run_jobs();
        assert_eq!(observed.get(), 7);
    }

    #[test]
    fn second_settle_is_ignored() {
        let mut agent = Agent::new();
        let capability = PromiseCapability::<u32>::new();
        capability.resolve(&mut agent, 1);
        capability.resolve(&mut agent, 2);
        let error = agent.throw_exception(crate::engine::agent::ExceptionType::Error, "nope");
        capability.reject(&mut agent, error);
        agent.run_jobs();
        assert_eq!(capability.promise().result(), Some(Ok(1)));
    }

    #[test]
    fn late_reactions_on_settled_promise_still_run() {
        let mut agent = Agent::new();
        let promise = Promise::resolved(3u32);
        let observed = Rc::new(Cell::new(0));
        let o = observed.clone();
        promise.on_settled(&mut agent, move |_, result| o.set(result.unwrap()));
        agent.run_jobs();
        assert_eq!(observed.get(), 3);
    }
}
