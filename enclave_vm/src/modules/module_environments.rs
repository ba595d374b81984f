// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [9.1.1.5 Module Environment Records](https://tc39.es/ecma262/#sec-module-environment-records)
//!
//! A module's environment maps binding names to slots. Local exports hold
//! their value in place; imported bindings are read-through references to the
//! exporting module's slot, which is what makes bindings live: a write in the
//! exporting module is observed by every importer on the next read.

use crate::{
    engine::agent::{Agent, ExceptionType, JsResult},
    modules::{
        module_namespaces::get_module_namespace,
        virtual_module_records::Module,
    },
    types::Value,
};

#[derive(Debug, Clone)]
pub(crate) enum EnvironmentSlot {
    /// One of the module's own exports. `None` until the executor
    /// initializes it (the temporal dead zone).
    LocalExport(Option<Value>),
    /// An imported binding, already resolved through any re-export chain to
    /// the module that locally provides it.
    Import { module: Module, binding: Box<str> },
    /// `import * as ns` or a resolved `export * as ns from`.
    NamespaceImport(Module),
}

/// Handle to a module's environment record.
#[derive(Debug, Clone, Copy)]
pub struct ModuleEnvironment(Module);

impl ModuleEnvironment {
    pub(crate) fn new(module: Module) -> Self {
        Self(module)
    }

    fn slots<'a>(
        agent: &'a Agent,
        module: Module,
    ) -> &'a hashbrown::HashMap<Box<str>, EnvironmentSlot> {
        agent[module]
            .environment
            .as_ref()
            .unwrap_or_else(|| unreachable!("environment accessed before linking"))
    }

    /// ### [9.1.1.5.1 GetBindingValue](https://tc39.es/ecma262/#sec-module-environment-records-getbindingvalue-n-s)
    pub fn get(self, agent: &mut Agent, name: &str) -> JsResult<Value> {
        let slot = Self::slots(agent, self.0).get(name).cloned();
        match slot {
            None => Err(agent.throw_exception(
                ExceptionType::ReferenceError,
                format!("{name} is not defined"),
            )),
            Some(EnvironmentSlot::LocalExport(Some(value))) => Ok(value),
            Some(EnvironmentSlot::LocalExport(None)) => Err(agent.throw_exception(
                ExceptionType::ReferenceError,
                format!("Cannot access '{name}' before initialization"),
            )),
            Some(EnvironmentSlot::Import { module, binding }) => {
                read_local_export(agent, module, &binding)
            }
            Some(EnvironmentSlot::NamespaceImport(module)) => {
                Ok(Value::Namespace(get_module_namespace(agent, module)))
            }
        }
    }

    /// Initialize or update a binding. Only the module's own exports are
    /// writable; imported bindings are immutable on the importing side.
    pub fn set(self, agent: &mut Agent, name: &str, value: Value) -> JsResult<()> {
        let environment = agent[self.0]
            .environment
            .as_mut()
            .unwrap_or_else(|| unreachable!("environment accessed before linking"));
        match environment.get_mut(name) {
            None => Err(agent.throw_exception(
                ExceptionType::ReferenceError,
                format!("{name} is not defined"),
            )),
            Some(EnvironmentSlot::LocalExport(slot)) => {
                *slot = Some(value);
                Ok(())
            }
            Some(EnvironmentSlot::Import { .. } | EnvironmentSlot::NamespaceImport(_)) => Err(
                agent.throw_exception(ExceptionType::TypeError, "Assignment to constant variable.")
            ),
        }
    }

    pub fn has(self, agent: &Agent, name: &str) -> bool {
        Self::slots(agent, self.0).contains_key(name)
    }
}

/// Read a module's own export slot. The resolution step guarantees the slot
/// is a local export.
pub(crate) fn read_local_export(agent: &mut Agent, module: Module, name: &str) -> JsResult<Value> {
    let slot = agent[module]
        .environment
        .as_ref()
        .unwrap_or_else(|| unreachable!("environment accessed before linking"))
        .get(name)
        .cloned();
    match slot {
        Some(EnvironmentSlot::LocalExport(Some(value))) => Ok(value),
        Some(EnvironmentSlot::LocalExport(None)) => Err(agent.throw_exception(
            ExceptionType::ReferenceError,
            format!("Cannot access '{name}' before initialization"),
        )),
        _ => unreachable!("import binding resolved to a non-local slot"),
    }
}
