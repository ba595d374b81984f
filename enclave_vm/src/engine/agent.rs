// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [9.7 Agents](https://tc39.es/ecma262/#sec-agents)
//!
//! The agent owns every module and compartment record, addressed by `Copy`
//! handles, and the job queue that asynchronous continuations are drained
//! from. All "concurrency" in this crate is the interleaving of jobs on this
//! one queue.

use std::{
    collections::VecDeque,
    ops::{Index, IndexMut},
};

use crate::{
    compartment::{Compartment, CompartmentRecord},
    modules::virtual_module_records::{Module, VirtualModuleRecord},
    types::{ErrorRecord, Value},
};

pub type JsResult<T> = std::result::Result<T, JsError>;

/// A throw completion. Wraps the thrown language value; engine-raised errors
/// carry a `Value::Error` with an [`ExceptionType`], executor code may throw
/// anything.
#[derive(Debug, Clone, PartialEq)]
pub struct JsError(Value);

impl JsError {
    pub(crate) fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The exception kind, if this is an engine-raised error.
    pub fn kind(&self) -> Option<ExceptionType> {
        match &self.0 {
            Value::Error(record) => Some(record.kind()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Error,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
}

impl ExceptionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExceptionType::Error => "Error",
            ExceptionType::RangeError => "RangeError",
            ExceptionType::ReferenceError => "ReferenceError",
            ExceptionType::SyntaxError => "SyntaxError",
            ExceptionType::TypeError => "TypeError",
        }
    }
}

pub(crate) type Job = Box<dyn FnOnce(&mut Agent)>;

/// ### [9.7 Agents](https://tc39.es/ecma262/#sec-agents)
#[derive(Default)]
pub struct Agent {
    pub(crate) modules: Vec<VirtualModuleRecord>,
    pub(crate) compartments: Vec<CompartmentRecord>,
    pub(crate) jobs: VecDeque<Job>,
    /// Source of \[\[AsyncEvaluationOrder]] values. The order in which
    /// modules observe their async-evaluation flag turning on is
    /// significant; see AsyncModuleExecutionFulfilled.
    async_evaluation_count: u32,
}

impl Agent {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### [5.2.3.2 Throw an Exception](https://tc39.es/ecma262/#sec-throw-an-exception)
    pub fn throw_exception(&mut self, kind: ExceptionType, message: impl Into<Box<str>>) -> JsError {
        JsError(Value::Error(ErrorRecord::new(kind, message)))
    }

    pub(crate) fn enqueue_job(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    /// Drain the job queue until it is empty. Settled promise reactions run
    /// here, in FIFO order; jobs may enqueue further jobs. Callers drive this
    /// after kicking off a load, import, or evaluation.
    pub fn run_jobs(&mut self) {
        while let Some(job) = self.jobs.pop_front() {
            job(self);
        }
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.jobs.is_empty()
    }

    /// ### IncrementModuleAsyncEvaluationCount
    pub(crate) fn increment_module_async_evaluation_count(&mut self) -> u32 {
        let count = self.async_evaluation_count;
        self.async_evaluation_count += 1;
        count
    }
}

impl Index<Module> for Agent {
    type Output = VirtualModuleRecord;

    fn index(&self, index: Module) -> &Self::Output {
        &self.modules[index.get_index()]
    }
}

impl IndexMut<Module> for Agent {
    fn index_mut(&mut self, index: Module) -> &mut Self::Output {
        &mut self.modules[index.get_index()]
    }
}

impl Index<Compartment> for Agent {
    type Output = CompartmentRecord;

    fn index(&self, index: Compartment) -> &Self::Output {
        &self.compartments[index.get_index()]
    }
}

impl IndexMut<Compartment> for Agent {
    fn index_mut(&mut self, index: Compartment) -> &mut Self::Output {
        &mut self.compartments[index.get_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_run_in_fifo_order() {
        let mut agent = Agent::new();
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            agent.enqueue_job(Box::new(move |_| log.borrow_mut().push(i)));
        }
        agent.run_jobs();
        assert_eq!(&*log.borrow(), &[0, 1, 2]);
    }

    #[test]
    fn async_evaluation_count_is_monotonic() {
        let mut agent = Agent::new();
        assert_eq!(agent.increment_module_async_evaluation_count(), 0);
        assert_eq!(agent.increment_module_async_evaluation_count(), 1);
    }
}
