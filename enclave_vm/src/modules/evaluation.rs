// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.5.3 Evaluate](https://tc39.es/ecma262/#sec-moduleevaluation)
//!
//! Depth-first evaluation over the linked graph. Synchronous subgraphs run to
//! completion inline; a module with top-level await (or with an async
//! dependency) enters async evaluation and its ancestors wait, resuming in
//! async-evaluation order once their pending dependency counts drain.
//!
//! Evaluation is idempotent per cycle: the top-level capability lives on the
//! cycle root, and re-evaluating any member returns the same promise.

use crate::{
    engine::{
        agent::{Agent, JsError, JsResult},
        promise_capability_records::{Promise, PromiseCapability},
    },
    modules::{
        graph_loading::{self, host_load_specifier},
        linking,
        module_namespaces::{ModuleNamespace, get_module_namespace},
        virtual_module_records::{
            AsyncEvaluationState, Module, ModuleStatus, execute_module, get_imported_module,
        },
    },
    types::Value,
};

pub(crate) fn evaluate(agent: &mut Agent, module: Module) -> Promise<()> {
    // 2. Assert: module.[[Status]] is LINKED, EVALUATING-ASYNC, or EVALUATED.
    assert!(matches!(
        agent[module].status,
        ModuleStatus::Linked | ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
    ));
    // 3. Members of an evaluated cycle defer to their cycle root.
    let module = if matches!(
        agent[module].status,
        ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
    ) {
        agent[module]
            .cycle_root
            .unwrap_or_else(|| unreachable!("evaluated module has no cycle root"))
    } else {
        module
    };
    // 4. Re-evaluation returns the original promise.
    if let Some(capability) = &agent[module].top_level_capability {
        return capability.promise();
    }
    // 6-7. First evaluation of this graph.
    let mut stack = Vec::new();
    let capability = PromiseCapability::new();
    agent[module].top_level_capability = Some(capability.clone());
    match inner_module_evaluation(agent, module, &mut stack, 0) {
        Err(error) => {
            // 9. Abrupt completion: everything still on the stack failed
            // with this error.
            for m in stack {
                debug_assert_eq!(agent[m].status, ModuleStatus::Evaluating);
                let record = &mut agent[m];
                record.status = ModuleStatus::Evaluated;
                record.evaluation_error = Some(error.clone());
                record.cycle_root = Some(module);
            }
            debug_assert_eq!(agent[module].status, ModuleStatus::Evaluated);
            log::debug!(
                "evaluation of {:?} failed: {:?}",
                agent[module].referral,
                error.value()
            );
            capability.reject(agent, error);
        }
        Ok(_) => {
            // 10. Normal completion: the graph is evaluated, or parked in
            // async evaluation.
            debug_assert!(matches!(
                agent[module].status,
                ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
            ));
            debug_assert!(agent[module].evaluation_error.is_none());
            if agent[module].status == ModuleStatus::Evaluated {
                capability.resolve(agent, ());
            }
            debug_assert!(stack.is_empty());
        }
    }
    capability.promise()
}

/// ### [16.2.1.5.3.1 InnerModuleEvaluation](https://tc39.es/ecma262/#sec-innermoduleevaluation)
fn inner_module_evaluation(
    agent: &mut Agent,
    module: Module,
    stack: &mut Vec<Module>,
    mut index: u32,
) -> JsResult<u32> {
    // 2. Finished modules replay their completion.
    match agent[module].status {
        ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated => {
            return match &agent[module].evaluation_error {
                None => Ok(index),
                Some(error) => Err(error.clone()),
            };
        }
        // 3. Already on the stack.
        ModuleStatus::Evaluating => return Ok(index),
        ModuleStatus::Linked => {}
        status => unreachable!("evaluation visited a module in state {status:?}"),
    }
    // 5-10. Enter the traversal.
    {
        let record = &mut agent[module];
        record.status = ModuleStatus::Evaluating;
        record.dfs_index = Some(index);
        record.dfs_ancestor_index = Some(index);
        record.pending_async_dependencies = Some(0);
    }
    index += 1;
    stack.push(module);
    // 11. Recurse into every requested module.
    let requested: Vec<Box<str>> = agent[module].requested_modules.to_vec();
    for required in requested {
        let mut required_module = get_imported_module(agent, module, &required);
        index = inner_module_evaluation(agent, required_module, stack, index)?;
        if agent[required_module].status == ModuleStatus::Evaluating {
            // 11.d.i. Same strongly connected component.
            debug_assert!(stack.contains(&required_module));
            let ancestor = agent[required_module].dfs_ancestor_index;
            let record = &mut agent[module];
            record.dfs_ancestor_index = record.dfs_ancestor_index.min(ancestor);
        } else {
            // 11.d.ii. Finished dependency: observe its cycle root's fate.
            required_module = agent[required_module]
                .cycle_root
                .unwrap_or_else(|| unreachable!("finished module has no cycle root"));
            debug_assert!(matches!(
                agent[required_module].status,
                ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
            ));
            if let Some(error) = &agent[required_module].evaluation_error {
                return Err(error.clone());
            }
        }
        // 11.e. Async dependencies park this module until they finish.
        if agent[required_module].async_evaluation.is_set() {
            if let Some(pending) = &mut agent[module].pending_async_dependencies {
                *pending += 1;
            }
            agent[required_module].async_parent_modules.push(module);
        }
    }
    let pending = agent[module]
        .pending_async_dependencies
        .unwrap_or_else(|| unreachable!("pending dependency count unset during evaluation"));
    if pending > 0 || agent[module].has_tla {
        // 12. This module evaluates asynchronously, in counter order.
        debug_assert_eq!(agent[module].async_evaluation, AsyncEvaluationState::Unset);
        let order = agent.increment_module_async_evaluation_count();
        agent[module].async_evaluation = AsyncEvaluationState::Order(order);
        if pending == 0 {
            execute_async_module(agent, module);
        }
    } else {
        // 13. Synchronous body, all dependencies settled: run it now.
        execute_module(agent, module, None)?;
    }
    // 14-15. Tarjan bookkeeping.
    debug_assert_eq!(stack.iter().filter(|m| **m == module).count(), 1);
    debug_assert!(agent[module].dfs_ancestor_index <= agent[module].dfs_index);
    // 16. Close out the strongly connected component.
    if agent[module].dfs_ancestor_index == agent[module].dfs_index {
        loop {
            let required_module = stack.pop().unwrap_or_else(|| {
                unreachable!("component root missing from evaluation stack")
            });
            let record = &mut agent[required_module];
            debug_assert_eq!(record.status, ModuleStatus::Evaluating);
            record.status = if record.async_evaluation == AsyncEvaluationState::Unset {
                ModuleStatus::Evaluated
            } else {
                ModuleStatus::EvaluatingAsync
            };
            record.cycle_root = Some(module);
            log::trace!("evaluated module {:?} ({:?})", record.referral, record.status);
            if required_module == module {
                break;
            }
        }
    }
    Ok(index)
}

/// ### [16.2.1.5.3.2 ExecuteAsyncModule](https://tc39.es/ecma262/#sec-execute-async-module)
fn execute_async_module(agent: &mut Agent, module: Module) {
    debug_assert!(matches!(
        agent[module].status,
        ModuleStatus::Evaluating | ModuleStatus::EvaluatingAsync
    ));
    debug_assert!(agent[module].has_tla);
    // 3-8. The executor's completion feeds back into the graph.
    let capability = PromiseCapability::<()>::new();
    capability.promise().on_settled(agent, move |agent, result| match result {
        Ok(()) => async_module_execution_fulfilled(agent, module),
        Err(error) => async_module_execution_rejected(agent, module, error),
    });
    let result = execute_module(agent, module, Some(capability));
    debug_assert!(result.is_ok());
}

/// ### [16.2.1.5.3.3 GatherAvailableAncestors](https://tc39.es/ecma262/#sec-gather-available-ancestors)
fn gather_available_ancestors(agent: &mut Agent, module: Module, exec_list: &mut Vec<Module>) {
    let parents = agent[module].async_parent_modules.clone();
    for m in parents {
        let cycle_root = agent[m]
            .cycle_root
            .unwrap_or_else(|| unreachable!("async parent has no cycle root"));
        if exec_list.contains(&m) || agent[cycle_root].evaluation_error.is_some() {
            continue;
        }
        debug_assert_eq!(agent[m].status, ModuleStatus::EvaluatingAsync);
        debug_assert!(agent[m].evaluation_error.is_none());
        debug_assert!(agent[m].async_evaluation.is_set());
        let pending = agent[m]
            .pending_async_dependencies
            .as_mut()
            .unwrap_or_else(|| unreachable!("async parent has no pending count"));
        debug_assert!(*pending > 0);
        *pending -= 1;
        if *pending == 0 {
            exec_list.push(m);
            if !agent[m].has_tla {
                gather_available_ancestors(agent, m, exec_list);
            }
        }
    }
}

/// ### [16.2.1.5.3.4 AsyncModuleExecutionFulfilled](https://tc39.es/ecma262/#sec-async-module-execution-fulfilled)
fn async_module_execution_fulfilled(agent: &mut Agent, module: Module) {
    // 1. A rejection elsewhere in the cycle got here first.
    if agent[module].status == ModuleStatus::Evaluated {
        debug_assert!(agent[module].evaluation_error.is_some());
        return;
    }
    debug_assert_eq!(agent[module].status, ModuleStatus::EvaluatingAsync);
    debug_assert!(agent[module].async_evaluation.is_set());
    debug_assert!(agent[module].evaluation_error.is_none());
    // 5-6. This module is done.
    agent[module].async_evaluation = AsyncEvaluationState::Done;
    agent[module].status = ModuleStatus::Evaluated;
    log::trace!("async module {:?} fulfilled", agent[module].referral);
    // 7. Settle the top-level promise, if this was the entry point.
    if let Some(capability) = agent[module].top_level_capability.clone() {
        debug_assert_eq!(agent[module].cycle_root, Some(module));
        capability.resolve(agent, ());
    }
    // 8-11. Ancestors whose last async dependency this was can now run, in
    // the order they entered async evaluation.
    let mut exec_list = Vec::new();
    gather_available_ancestors(agent, module, &mut exec_list);
    exec_list.sort_by_key(|m| match agent[*m].async_evaluation {
        AsyncEvaluationState::Order(order) => order,
        state => unreachable!("gathered ancestor in async state {state:?}"),
    });
    // 12. Run them.
    for m in exec_list {
        if agent[m].status == ModuleStatus::Evaluated {
            debug_assert!(agent[m].evaluation_error.is_some());
        } else if agent[m].has_tla {
            execute_async_module(agent, m);
        } else {
            match execute_module(agent, m, None) {
                Err(error) => async_module_execution_rejected(agent, m, error),
                Ok(()) => {
                    agent[m].async_evaluation = AsyncEvaluationState::Done;
                    agent[m].status = ModuleStatus::Evaluated;
                    if let Some(capability) = agent[m].top_level_capability.clone() {
                        debug_assert_eq!(agent[m].cycle_root, Some(m));
                        capability.resolve(agent, ());
                    }
                }
            }
        }
    }
}

/// ### [16.2.1.5.3.5 AsyncModuleExecutionRejected](https://tc39.es/ecma262/#sec-async-module-execution-rejected)
fn async_module_execution_rejected(agent: &mut Agent, module: Module, error: JsError) {
    // 1. Already failed through another path.
    if agent[module].status == ModuleStatus::Evaluated {
        debug_assert!(agent[module].evaluation_error.is_some());
        return;
    }
    debug_assert_eq!(agent[module].status, ModuleStatus::EvaluatingAsync);
    debug_assert!(agent[module].async_evaluation.is_set());
    debug_assert!(agent[module].evaluation_error.is_none());
    {
        let record = &mut agent[module];
        record.evaluation_error = Some(error.clone());
        record.status = ModuleStatus::Evaluated;
        record.async_evaluation = AsyncEvaluationState::Done;
    }
    log::debug!(
        "async module {:?} rejected: {:?}",
        agent[module].referral,
        error.value()
    );
    // 6. The failure propagates to every waiting ancestor.
    let parents = agent[module].async_parent_modules.clone();
    for m in parents {
        async_module_execution_rejected(agent, m, error.clone());
    }
    // 7. And to the top-level promise, if this was the entry point.
    if let Some(capability) = agent[module].top_level_capability.clone() {
        debug_assert_eq!(agent[module].cycle_root, Some(module));
        capability.reject(agent, error);
    }
}

/// Drive the load, link, evaluate pipeline for a module and settle with its
/// namespace. Both `Module::import` and dynamic `import()` end up here; a
/// module that previously failed evaluation yields a rejection carrying its
/// evaluation error.
pub(crate) fn import_module(agent: &mut Agent, module: Module) -> Promise<ModuleNamespace> {
    let capability = PromiseCapability::new();
    let promise = capability.promise();
    let load = graph_loading::load_requested_modules(agent, module);
    load.on_settled(agent, move |agent, result| {
        if let Err(error) = result {
            capability.reject(agent, error);
            return;
        }
        if let Err(error) = linking::link(agent, module) {
            capability.reject(agent, error);
            return;
        }
        let evaluated = evaluate(agent, module);
        evaluated.on_settled(agent, move |agent, result| match result {
            Ok(()) => {
                let namespace = get_module_namespace(agent, module);
                capability.resolve(agent, namespace);
            }
            Err(error) => capability.reject(agent, error),
        });
    });
    promise
}

/// ### [13.3.10.2 EvaluateImportCall](https://tc39.es/ecma262/#sec-evaluate-import-call)
///
/// Dynamic `import()` from inside a running executor: resolve the specifier
/// through the referrer's import hook, then run the full pipeline on the
/// result. Settles with the namespace as a [`Value`].
pub(crate) fn dynamic_import(
    agent: &mut Agent,
    referrer: Module,
    specifier: &str,
) -> Promise<Value> {
    let capability = PromiseCapability::new();
    let promise = capability.promise();
    let load = host_load_specifier(agent, referrer, specifier);
    load.on_settled(agent, move |agent, result| match result {
        Err(error) => capability.reject(agent, error),
        Ok(module) => {
            let imported = import_module(agent, module);
            imported.on_settled(agent, move |agent, result| match result {
                Ok(namespace) => capability.resolve(agent, Value::Namespace(namespace)),
                Err(error) => capability.reject(agent, error),
            });
        }
    });
    promise
}
