// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.5.1 LoadRequestedModules](https://tc39.es/ecma262/#sec-LoadRequestedModules)
//!
//! Concurrent, promise-driven resolution of the full dependency graph ahead
//! of linking. Each module calls its import hook at most once per specifier;
//! repeated requests join the in-flight load.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashSet;

use crate::{
    engine::{
        agent::{Agent, ExceptionType, JsError, JsResult},
        promise_capability_records::{Promise, PromiseCapability},
    },
    modules::virtual_module_records::{ImportHookResult, Module, ModuleStatus},
};

/// ### GraphLoadingState Record
pub(crate) struct GraphLoadingStateRecord {
    /// \[\[PromiseCapability]]
    capability: PromiseCapability<()>,
    /// \[\[IsLoading]]
    is_loading: bool,
    /// \[\[PendingModulesCount]]
    pending_modules_count: u32,
    /// \[\[Visited]]
    visited: AHashSet<Module>,
}

pub(crate) fn load_requested_modules(agent: &mut Agent, module: Module) -> Promise<()> {
    let capability = PromiseCapability::new();
    let promise = capability.promise();
    let state = Rc::new(RefCell::new(GraphLoadingStateRecord {
        capability,
        is_loading: true,
        pending_modules_count: 1,
        visited: AHashSet::new(),
    }));
    inner_module_loading(agent, &state, module);
    promise
}

/// ### [16.2.1.5.1.1 InnerModuleLoading](https://tc39.es/ecma262/#sec-InnerModuleLoading)
fn inner_module_loading(agent: &mut Agent, state: &Rc<RefCell<GraphLoadingStateRecord>>, module: Module) {
    // 1. Assert: state.[[IsLoading]] is true.
    debug_assert!(state.borrow().is_loading);
    // 2. New modules not yet visited contribute their requests to the load.
    if agent[module].status == ModuleStatus::New && state.borrow_mut().visited.insert(module) {
        let requested: Vec<Box<str>> = agent[module].requested_modules.to_vec();
        state.borrow_mut().pending_modules_count += requested.len() as u32;
        for required in requested {
            if let Some(loaded) = agent[module].loaded_modules.get(&required).copied() {
                inner_module_loading(agent, state, loaded);
            } else {
                let load = host_load_specifier(agent, module, &required);
                let state = state.clone();
                load.on_settled(agent, move |agent, result| {
                    finish_loading_imported_module(agent, module, &required, &state, result);
                });
            }
            if !state.borrow().is_loading {
                return;
            }
        }
    }
    // 3-4. One fewer module outstanding; finishing the count finishes the
    // load.
    let mut st = state.borrow_mut();
    if !st.is_loading {
        return;
    }
    assert!(st.pending_modules_count >= 1);
    st.pending_modules_count -= 1;
    if st.pending_modules_count == 0 {
        st.is_loading = false;
        let visited: Vec<Module> = st.visited.iter().copied().collect();
        let capability = st.capability.clone();
        drop(st);
        for loaded in visited {
            if agent[loaded].status == ModuleStatus::New {
                agent[loaded].status = ModuleStatus::Unlinked;
            }
        }
        log::debug!("module graph loaded");
        capability.resolve(agent, ());
    }
}

/// ### [16.2.1.5.1.2 ContinueModuleLoading](https://tc39.es/ecma262/#sec-ContinueModuleLoading)
fn continue_module_loading(
    agent: &mut Agent,
    state: &Rc<RefCell<GraphLoadingStateRecord>>,
    result: JsResult<Module>,
) {
    if !state.borrow().is_loading {
        return;
    }
    match result {
        Ok(module) => inner_module_loading(agent, state, module),
        Err(error) => {
            let capability = {
                let mut st = state.borrow_mut();
                st.is_loading = false;
                st.capability.clone()
            };
            capability.reject(agent, error);
        }
    }
}

/// ### [16.2.1.8 FinishLoadingImportedModule](https://tc39.es/ecma262/#sec-FinishLoadingImportedModule)
fn finish_loading_imported_module(
    agent: &mut Agent,
    referrer: Module,
    specifier: &str,
    state: &Rc<RefCell<GraphLoadingStateRecord>>,
    result: Result<Module, JsError>,
) {
    if let Ok(module) = result {
        record_loaded_module(agent, referrer, specifier, module);
    }
    continue_module_loading(agent, state, result);
}

/// The referrer remembers each request's outcome; a specifier must not map to
/// two different modules.
pub(crate) fn record_loaded_module(
    agent: &mut Agent,
    referrer: Module,
    specifier: &str,
    module: Module,
) {
    match agent[referrer].loaded_modules.get(specifier) {
        Some(existing) => assert_eq!(*existing, module),
        None => {
            agent[referrer]
                .loaded_modules
                .insert(specifier.into(), module);
        }
    }
}

/// ### HostLoadImportedModule
///
/// Drives the referrer's import hook for one specifier, memoizing the
/// resulting promise so the hook runs at most once per (module, specifier)
/// pair. Hook failures surface as `SyntaxError`s naming the specifier.
pub(crate) fn host_load_specifier(
    agent: &mut Agent,
    referrer: Module,
    specifier: &str,
) -> Promise<Module> {
    if let Some(in_flight) = agent[referrer].resolved_modules.get(specifier) {
        return in_flight.clone();
    }
    let capability = PromiseCapability::<Module>::new();
    let promise = capability.promise();
    agent[referrer]
        .resolved_modules
        .insert(specifier.into(), promise.clone());

    let Some(hook) = agent[referrer].import_hook.clone() else {
        let error = resolve_failure(agent, specifier);
        capability.reject(agent, error);
        return promise;
    };
    let referral = agent[referrer].referral.clone();
    log::trace!("loading '{specifier}' for {referral:?}");
    match hook(agent, specifier, &referral) {
        Ok(ImportHookResult::Resolved(module)) => {
            record_loaded_module(agent, referrer, specifier, module);
            capability.resolve(agent, module);
        }
        Ok(ImportHookResult::Unresolved) => {
            let error = resolve_failure(agent, specifier);
            capability.reject(agent, error);
        }
        Ok(ImportHookResult::Pending(pending)) => {
            let specifier: Box<str> = specifier.into();
            pending.on_settled(agent, move |agent, result| match result {
                Ok(Some(module)) => {
                    record_loaded_module(agent, referrer, &specifier, module);
                    capability.resolve(agent, module);
                }
                Ok(None) => {
                    let error = resolve_failure(agent, &specifier);
                    capability.reject(agent, error);
                }
                Err(_) => {
                    let error = agent.throw_exception(
                        ExceptionType::SyntaxError,
                        format!("Failed to import module '{specifier}'"),
                    );
                    capability.reject(agent, error);
                }
            });
        }
        Err(_) => {
            let error = agent.throw_exception(
                ExceptionType::SyntaxError,
                format!("Failed to import module '{specifier}'"),
            );
            capability.reject(agent, error);
        }
    }
    promise
}

fn resolve_failure(agent: &mut Agent, specifier: &str) -> JsError {
    agent.throw_exception(
        ExceptionType::SyntaxError,
        format!("Failed to resolve module '{specifier}'"),
    )
}
