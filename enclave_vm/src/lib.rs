// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Userland module-loading isolation primitives: virtual module records with
//! the full cyclic module state machine (circular imports, live bindings,
//! top-level await) and compartments, lightweight realms that scope module
//! resolution and globals.
//!
//! Everything runs single-threaded on an [`Agent`]: asynchronous steps are
//! jobs on its queue, and promises here are deterministic one-shot completion
//! cells. Drive a pipeline, then call [`Agent::run_jobs`] to let it settle.
//!
//! ```
//! use enclave_vm::{Agent, Binding, Module, ModuleOptions, Value, VirtualModuleSource};
//!
//! let mut agent = Agent::new();
//! let source = VirtualModuleSource::new(vec![Binding::export("answer")])
//!     .with_executor(|agent, ctx| ctx.set(agent, "answer", Value::Number(42.0)));
//! let module = Module::new(&mut agent, source, ModuleOptions::default()).unwrap();
//! let promise = module.import(&mut agent);
//! agent.run_jobs();
//! let namespace = promise.result().unwrap().unwrap();
//! assert_eq!(namespace.get(&mut agent, "answer").unwrap(), Value::Number(42.0));
//! ```

pub mod compartment;
pub mod engine;
pub mod modules;
pub mod types;

pub use compartment::{
    Compartment, CompartmentOptions, ImportMetaHook, LoadHook, LoadHookResult, ModuleDescriptor,
    ModuleMapHook, ModuleSource, ResolveHook,
};
pub use engine::{
    agent::{Agent, ExceptionType, JsError, JsResult},
    promise_capability_records::{Promise, PromiseCapability},
};
pub use modules::{
    bindings::Binding,
    module_environments::ModuleEnvironment,
    module_namespaces::ModuleNamespace,
    virtual_module_records::{
        ExecuteContext, ImportHook, ImportHookResult, Module, ModuleExecutor, ModuleOptions,
        VirtualModuleSource,
    },
};
pub use types::{ErrorRecord, HostFunction, Object, Value};
