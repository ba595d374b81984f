// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [10.4.6 Module Namespace Objects](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects)
//!
//! A namespace is a per-module view over its resolved exports, created at
//! most once and reading through to the exporting modules' environments. The
//! exports list is fixed at creation; the values are live.

use crate::{
    engine::agent::{Agent, JsResult},
    modules::{
        module_environments::read_local_export,
        virtual_module_records::{
            BindingName, Module, ModuleStatus, ResolveExportResult, ResolvedBinding,
            get_exported_names, resolve_export,
        },
    },
    types::Value,
};

/// The agent-side state of a module's namespace: its sorted, resolved export
/// list.
pub(crate) struct NamespaceRecord {
    pub(crate) exports: Box<[(Box<str>, ResolvedBinding)]>,
}

/// Handle to a module's namespace. Identity follows the module: two handles
/// are the same namespace exactly when they are the same module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleNamespace(Module);

impl ModuleNamespace {
    pub fn module(self) -> Module {
        self.0
    }

    /// Read an export. Missing names read as `undefined`; reading an export
    /// before its module initialized it is a `ReferenceError`.
    pub fn get(self, agent: &mut Agent, name: &str) -> JsResult<Value> {
        let record = namespace_record(agent, self.0);
        let binding = record
            .exports
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, b)| b.clone());
        match binding {
            None => Ok(Value::Undefined),
            Some(ResolvedBinding {
                module,
                binding_name: BindingName::Named(binding),
            }) => read_local_export(agent, module, &binding),
            Some(ResolvedBinding {
                module,
                binding_name: BindingName::Namespace,
            }) => Ok(Value::Namespace(get_module_namespace(agent, module))),
        }
    }

    pub fn has(self, agent: &Agent, name: &str) -> bool {
        namespace_record(agent, self.0)
            .exports
            .iter()
            .any(|(n, _)| &**n == name)
    }

    /// The exported names, in sorted order.
    pub fn keys(self, agent: &Agent) -> Vec<Box<str>> {
        namespace_record(agent, self.0)
            .exports
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }
}

fn namespace_record(agent: &Agent, module: Module) -> &NamespaceRecord {
    agent[module]
        .namespace
        .as_ref()
        .unwrap_or_else(|| unreachable!("namespace read before creation"))
}

/// ### [16.2.1.9 GetModuleNamespace](https://tc39.es/ecma262/#sec-GetModuleNamespace)
pub(crate) fn get_module_namespace(agent: &mut Agent, module: Module) -> ModuleNamespace {
    // 1. Namespaces only exist for modules whose graph has been resolved.
    assert!(agent[module].status >= ModuleStatus::Linking);
    if agent[module].namespace.is_none() {
        let names = get_exported_names(agent, module, &mut Vec::new());
        let mut exports: Vec<(Box<str>, ResolvedBinding)> = Vec::with_capacity(names.len());
        for name in names {
            // 3.c. Ambiguous names are left off the namespace.
            if let ResolveExportResult::Resolved(binding) =
                resolve_export(agent, module, &name, &mut Vec::new())
            {
                exports.push((name, binding));
            }
        }
        exports.sort_by(|(a, _), (b, _)| a.cmp(b));
        agent[module].namespace = Some(NamespaceRecord {
            exports: exports.into_boxed_slice(),
        });
    }
    ModuleNamespace(module)
}
