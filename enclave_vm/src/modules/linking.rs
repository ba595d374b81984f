// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.5.2 Link](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
//!
//! Depth-first linking over the loaded graph. Strongly connected components
//! are discovered with Tarjan's ancestor indices; a component moves to Linked
//! as a unit, and a failure anywhere rolls the entire traversal back to
//! Unlinked.

use crate::{
    engine::agent::{Agent, JsResult},
    modules::virtual_module_records::{
        Module, ModuleStatus, get_imported_module, initialize_environment,
    },
};

pub(crate) fn link(agent: &mut Agent, module: Module) -> JsResult<()> {
    // 1. Assert: module.[[Status]] is not LINKING or EVALUATING.
    assert!(!matches!(
        agent[module].status,
        ModuleStatus::Linking | ModuleStatus::Evaluating
    ));
    let mut stack = Vec::new();
    // 3. Let result be Completion(InnerModuleLinking(module, stack, 0)).
    if let Err(error) = inner_module_linking(agent, module, &mut stack, 0) {
        // 4. Linking failed; every module on the stack reverts to Unlinked.
        for m in stack {
            debug_assert_eq!(agent[m].status, ModuleStatus::Linking);
            let record = &mut agent[m];
            record.status = ModuleStatus::Unlinked;
            record.environment = None;
            record.dfs_index = None;
            record.dfs_ancestor_index = None;
        }
        debug_assert_eq!(agent[module].status, ModuleStatus::Unlinked);
        log::debug!(
            "linking {:?} failed: {:?}",
            agent[module].referral,
            error.value()
        );
        return Err(error);
    }
    // 5-6. The full traversal linked.
    debug_assert!(matches!(
        agent[module].status,
        ModuleStatus::Linked | ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
    ));
    debug_assert!(stack.is_empty());
    Ok(())
}

/// ### [16.2.1.5.2.1 InnerModuleLinking](https://tc39.es/ecma262/#sec-InnerModuleLinking)
fn inner_module_linking(
    agent: &mut Agent,
    module: Module,
    stack: &mut Vec<Module>,
    mut index: u32,
) -> JsResult<u32> {
    // 2. Already handled modules pass through.
    match agent[module].status {
        ModuleStatus::Linking
        | ModuleStatus::Linked
        | ModuleStatus::EvaluatingAsync
        | ModuleStatus::Evaluated => return Ok(index),
        ModuleStatus::Unlinked => {}
        ModuleStatus::New | ModuleStatus::Evaluating => {
            unreachable!("linking visited a module in state {:?}", agent[module].status)
        }
    }
    // 4-8. Enter the traversal.
    {
        let record = &mut agent[module];
        record.status = ModuleStatus::Linking;
        record.dfs_index = Some(index);
        record.dfs_ancestor_index = Some(index);
    }
    index += 1;
    stack.push(module);
    // 9. Recurse into every requested module.
    let requested: Vec<Box<str>> = agent[module].requested_modules.to_vec();
    for required in requested {
        let required_module = get_imported_module(agent, module, &required);
        index = inner_module_linking(agent, required_module, stack, index)?;
        if agent[required_module].status == ModuleStatus::Linking {
            // 9.c.i. Still on the stack: same strongly connected component.
            debug_assert!(stack.contains(&required_module));
            let ancestor = agent[required_module].dfs_ancestor_index;
            let record = &mut agent[module];
            record.dfs_ancestor_index = record.dfs_ancestor_index.min(ancestor);
        }
    }
    // 10. Resolve and validate this module's own bindings.
    initialize_environment(agent, module)?;
    // 11-12. Tarjan bookkeeping.
    debug_assert_eq!(stack.iter().filter(|m| **m == module).count(), 1);
    debug_assert!(agent[module].dfs_ancestor_index <= agent[module].dfs_index);
    // 13. This module roots its component: everything above it on the stack
    // links together.
    if agent[module].dfs_ancestor_index == agent[module].dfs_index {
        loop {
            let required_module = stack.pop().unwrap_or_else(|| {
                unreachable!("component root missing from linking stack")
            });
            agent[required_module].status = ModuleStatus::Linked;
            log::trace!("linked module {:?}", agent[required_module].referral);
            if required_module == module {
                break;
            }
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::agent::ExceptionType,
        modules::{
            bindings::Binding,
            virtual_module_records::{ModuleOptions, VirtualModuleSource},
        },
    };

    fn module(agent: &mut Agent, bindings: Vec<Binding>) -> Module {
        Module::new(
            agent,
            VirtualModuleSource::new(bindings),
            ModuleOptions::default(),
        )
        .unwrap()
    }

    fn wire(agent: &mut Agent, importer: Module, specifier: &str, imported: Module) {
        agent[importer]
            .loaded_modules
            .insert(specifier.into(), imported);
        agent[importer].status = ModuleStatus::Unlinked;
        agent[imported].status = ModuleStatus::Unlinked;
    }

    #[test]
    fn failed_link_rolls_the_graph_back_to_unlinked() {
        let mut agent = Agent::new();
        let dep = module(&mut agent, vec![Binding::export("a")]);
        // "missing" is not provided by dep.
        let root = module(&mut agent, vec![Binding::import("missing", "dep")]);
        wire(&mut agent, root, "dep", dep);
        let error = link(&mut agent, root).unwrap_err();
        assert_eq!(error.kind(), Some(ExceptionType::SyntaxError));
        assert_eq!(agent[root].status, ModuleStatus::Unlinked);
        assert!(agent[root].environment.is_none());
        // Retrying after fixing nothing fails again rather than panicking.
        assert!(link(&mut agent, root).is_err());
    }

    #[test]
    fn cyclic_graph_links_as_one_component() {
        let mut agent = Agent::new();
        let a = module(
            &mut agent,
            vec![Binding::export("a"), Binding::import("b", "b")],
        );
        let b = module(
            &mut agent,
            vec![Binding::export("b"), Binding::import("a", "a")],
        );
        wire(&mut agent, a, "b", b);
        wire(&mut agent, b, "a", a);
        link(&mut agent, a).unwrap();
        assert_eq!(agent[a].status, ModuleStatus::Linked);
        assert_eq!(agent[b].status, ModuleStatus::Linked);
    }
}
