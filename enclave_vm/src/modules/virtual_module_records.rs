// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.5 Cyclic Module Records](https://tc39.es/ecma262/#sec-cyclic-module-records)
//!
//! The virtual module record is the one module record kind of this crate: a
//! module whose imports and exports are declared as [`Binding`]s and whose
//! body is a host-provided executor closure. Loading, linking, and evaluation
//! follow the cyclic module record state machine; see the sibling
//! `graph_loading`, `linking`, and `evaluation` modules.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    engine::{
        agent::{Agent, ExceptionType, JsError, JsResult},
        promise_capability_records::{Promise, PromiseCapability},
    },
    modules::{
        bindings::{
            Binding, ImportEntryRecord, ImportName, IndirectExportEntryRecord,
            IndirectImportName, LocalExportEntryRecord, StarExportEntryRecord,
            normalize_bindings,
        },
        evaluation, graph_loading, linking,
        module_environments::{EnvironmentSlot, ModuleEnvironment},
        module_namespaces::{self, ModuleNamespace, NamespaceRecord},
    },
    types::{Object, Value},
};

/// Handle to a [`VirtualModuleRecord`] owned by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Module(u32);

impl Module {
    pub(crate) fn get_index(self) -> usize {
        self.0 as usize
    }

    /// ### [16.2.1.7.1 ParseModule](https://tc39.es/ecma262/#sec-parsemodule)
    ///
    /// Normalizes the source's bindings into entry records and creates the
    /// module record in the NEW state. Binding validation failures are
    /// `TypeError`s.
    pub fn new(
        agent: &mut Agent,
        source: VirtualModuleSource,
        options: ModuleOptions,
    ) -> JsResult<Module> {
        let entries = normalize_bindings(agent, &source.bindings)?;
        let record = VirtualModuleRecord {
            referral: options.referral,
            executor: source.executor,
            needs_import_meta: source.needs_import_meta,
            needs_import: source.needs_import,
            import_hook: options.import_hook,
            assigned_import_meta: options.import_meta,
            global_this: options.global_this,
            import_entries: entries.import_entries,
            local_export_entries: entries.local_export_entries,
            indirect_export_entries: entries.indirect_export_entries,
            star_export_entries: entries.star_export_entries,
            requested_modules: entries.requested_modules,
            loaded_modules: AHashMap::new(),
            resolved_modules: AHashMap::new(),
            environment: None,
            namespace: None,
            status: ModuleStatus::New,
            evaluation_error: None,
            dfs_index: None,
            dfs_ancestor_index: None,
            cycle_root: None,
            has_tla: source.has_top_level_await,
            async_evaluation: AsyncEvaluationState::Unset,
            top_level_capability: None,
            async_parent_modules: Vec::new(),
            pending_async_dependencies: None,
        };
        let index = u32::try_from(agent.modules.len())
            .map_err(|_| agent.throw_exception(ExceptionType::RangeError, "Too many modules"))?;
        agent.modules.push(record);
        log::trace!("created module {:?}", agent[Module(index)].referral);
        Ok(Module(index))
    }

    /// ### [16.2.1.5.1 LoadRequestedModules](https://tc39.es/ecma262/#sec-LoadRequestedModules)
    pub fn load_requested_modules(self, agent: &mut Agent) -> Promise<()> {
        graph_loading::load_requested_modules(agent, self)
    }

    /// ### [16.2.1.5.2 Link](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
    pub fn link(self, agent: &mut Agent) -> JsResult<()> {
        linking::link(agent, self)
    }

    /// ### [16.2.1.5.3 Evaluate](https://tc39.es/ecma262/#sec-moduleevaluation)
    pub fn evaluate(self, agent: &mut Agent) -> Promise<()> {
        evaluation::evaluate(agent, self)
    }

    /// Drive the whole load, link, evaluate pipeline and settle with the
    /// module's namespace. The promise counterpart of `import()`.
    pub fn import(self, agent: &mut Agent) -> Promise<ModuleNamespace> {
        evaluation::import_module(agent, self)
    }

    /// ### [16.2.1.9 GetModuleNamespace](https://tc39.es/ecma262/#sec-GetModuleNamespace)
    ///
    /// The module must have been linked.
    pub fn namespace(self, agent: &mut Agent) -> ModuleNamespace {
        module_namespaces::get_module_namespace(agent, self)
    }

    /// The referral value the module was constructed with, usually its
    /// specifier.
    pub fn referral(self, agent: &Agent) -> Value {
        agent[self].referral.clone()
    }
}

/// \[\[Status]]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ModuleStatus {
    New,
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    EvaluatingAsync,
    Evaluated,
}

/// \[\[AsyncEvaluationOrder]]
///
/// `Order` carries the value of the global async evaluation counter at the
/// moment the module entered async evaluation; fulfilled ancestors are
/// executed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AsyncEvaluationState {
    Unset,
    Order(u32),
    Done,
}

impl AsyncEvaluationState {
    /// True while the module is queued for or undergoing async evaluation.
    pub(crate) fn is_set(self) -> bool {
        matches!(self, AsyncEvaluationState::Order(_))
    }
}

/// The body of a virtual module. Runs exactly once, during evaluation.
pub type ModuleExecutor = Box<dyn FnOnce(&mut Agent, ExecuteContext) -> JsResult<()>>;

/// The static description a virtual module record is created from: its
/// declarative bindings, its executor, and the capabilities the executor
/// needs.
pub struct VirtualModuleSource {
    pub bindings: Vec<Binding>,
    pub executor: Option<ModuleExecutor>,
    /// The executor contains a top-level `await`: it signals completion
    /// through [`ExecuteContext::async_completion`] instead of by returning.
    pub has_top_level_await: bool,
    /// The executor reads `import.meta`.
    pub needs_import_meta: bool,
    /// The executor calls dynamic `import()`.
    pub needs_import: bool,
}

impl VirtualModuleSource {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            bindings,
            executor: None,
            has_top_level_await: false,
            needs_import_meta: false,
            needs_import: false,
        }
    }

    pub fn with_executor(
        mut self,
        executor: impl FnOnce(&mut Agent, ExecuteContext) -> JsResult<()> + 'static,
    ) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn with_top_level_await(mut self) -> Self {
        self.has_top_level_await = true;
        self
    }

    pub fn with_import_meta(mut self) -> Self {
        self.needs_import_meta = true;
        self
    }

    pub fn with_dynamic_import(mut self) -> Self {
        self.needs_import = true;
        self
    }
}

/// How an import hook answered a module request.
pub enum ImportHookResult {
    /// The hook produced the module synchronously.
    Resolved(Module),
    /// The hook is fetching; `None` settlement means the specifier did not
    /// resolve.
    Pending(Promise<Option<Module>>),
    /// The specifier does not resolve to any module.
    Unresolved,
}

/// The HostLoadImportedModule seam: given the requesting module's referral
/// and a specifier, produce the requested module.
pub type ImportHook = Rc<dyn Fn(&mut Agent, &str, &Value) -> JsResult<ImportHookResult>>;

/// Construction options for [`Module::new`].
#[derive(Default)]
pub struct ModuleOptions {
    /// Opaque identity passed back to the import hook, usually the module's
    /// own specifier.
    pub referral: Value,
    pub import_hook: Option<ImportHook>,
    /// Properties merged onto the executor's `import.meta` object.
    pub import_meta: Option<Object>,
    /// The `globalThis` value the executor observes.
    pub global_this: Value,
}

/// The agent-owned state of one virtual module.
pub struct VirtualModuleRecord {
    pub(crate) referral: Value,
    pub(crate) executor: Option<ModuleExecutor>,
    pub(crate) needs_import_meta: bool,
    pub(crate) needs_import: bool,
    pub(crate) import_hook: Option<ImportHook>,
    pub(crate) assigned_import_meta: Option<Object>,
    pub(crate) global_this: Value,
    pub(crate) import_entries: Box<[ImportEntryRecord]>,
    pub(crate) local_export_entries: Box<[LocalExportEntryRecord]>,
    pub(crate) indirect_export_entries: Box<[IndirectExportEntryRecord]>,
    pub(crate) star_export_entries: Box<[StarExportEntryRecord]>,
    /// \[\[RequestedModules]]
    pub(crate) requested_modules: Box<[Box<str>]>,
    /// \[\[LoadedModules]]
    pub(crate) loaded_modules: AHashMap<Box<str>, Module>,
    /// One import-hook call per specifier: the in-flight or settled load of
    /// each request this module has made.
    pub(crate) resolved_modules: AHashMap<Box<str>, Promise<Module>>,
    /// \[\[Environment]], present from InitializeEnvironment on.
    pub(crate) environment: Option<hashbrown::HashMap<Box<str>, EnvironmentSlot>>,
    /// Memoized namespace exports.
    pub(crate) namespace: Option<NamespaceRecord>,
    pub(crate) status: ModuleStatus,
    /// \[\[EvaluationError]]
    pub(crate) evaluation_error: Option<JsError>,
    /// \[\[DFSIndex]]
    pub(crate) dfs_index: Option<u32>,
    /// \[\[DFSAncestorIndex]]
    pub(crate) dfs_ancestor_index: Option<u32>,
    /// \[\[CycleRoot]]
    pub(crate) cycle_root: Option<Module>,
    /// \[\[HasTLA]]
    pub(crate) has_tla: bool,
    /// \[\[AsyncEvaluationOrder]]
    pub(crate) async_evaluation: AsyncEvaluationState,
    /// \[\[TopLevelCapability]]
    pub(crate) top_level_capability: Option<PromiseCapability<()>>,
    /// \[\[AsyncParentModules]]
    pub(crate) async_parent_modules: Vec<Module>,
    /// \[\[PendingAsyncDependencies]]
    pub(crate) pending_async_dependencies: Option<u32>,
}

/// Human-readable identity for error messages.
pub(crate) fn module_display(agent: &Agent, module: Module) -> String {
    match agent[module].referral.as_str() {
        Some(s) => s.to_owned(),
        None => format!("{:?}", agent[module].referral),
    }
}

/// What the executor of a running module sees: its global, its `import.meta`,
/// and accessors for its own environment.
pub struct ExecuteContext {
    module: Module,
    global_this: Value,
    import_meta: Option<Object>,
    can_import: bool,
    async_completion: Option<PromiseCapability<()>>,
}

impl ExecuteContext {
    pub fn module(&self) -> Module {
        self.module
    }

    pub fn global_this(&self) -> &Value {
        &self.global_this
    }

    /// `import.meta`, present only when the source declared it needs it.
    pub fn import_meta(&self) -> Option<&Object> {
        self.import_meta.as_ref()
    }

    /// Read a binding from the module's environment. Imported bindings read
    /// through to the exporting module, so later writes there are observed.
    pub fn get(&self, agent: &mut Agent, name: &str) -> JsResult<Value> {
        ModuleEnvironment::new(self.module).get(agent, name)
    }

    /// Initialize or update one of the module's own exported bindings.
    /// Writing to an imported binding is a `TypeError`.
    pub fn set(&self, agent: &mut Agent, name: &str, value: Value) -> JsResult<()> {
        ModuleEnvironment::new(self.module).set(agent, name, value)
    }

    /// Dynamic `import()`. Settles with the requested module's namespace
    /// value.
    pub fn import(&self, agent: &mut Agent, specifier: &str) -> Promise<Value> {
        if !self.can_import {
            let error = agent.throw_exception(
                ExceptionType::TypeError,
                "Dynamic import is not available in this module",
            );
            return Promise::rejected(error);
        }
        evaluation::dynamic_import(agent, self.module, specifier)
    }

    /// For sources with top-level await: the capability the executor settles
    /// when its asynchronous work completes. `None` for synchronous sources.
    pub fn async_completion(&self) -> Option<PromiseCapability<()>> {
        self.async_completion.clone()
    }
}

/// ### [16.2.1.6.2 GetExportedNames](https://tc39.es/ecma262/#sec-getexportednames)
pub(crate) fn get_exported_names(
    agent: &mut Agent,
    module: Module,
    export_star_set: &mut Vec<Module>,
) -> Vec<Box<str>> {
    // 2. If exportStarSet contains module, this is a circular `export *`;
    // every name along the cycle is picked up elsewhere.
    if export_star_set.contains(&module) {
        return Vec::new();
    }
    // 3. Append module to exportStarSet.
    export_star_set.push(module);
    // 5-6. Own names: local and indirect exports.
    let mut exported_names: Vec<Box<str>> = Vec::new();
    for e in agent[module].local_export_entries.iter() {
        exported_names.push(e.export_name.clone());
    }
    for e in agent[module].indirect_export_entries.iter() {
        exported_names.push(e.export_name.clone());
    }
    // 7. Star exports contribute the requested module's names, except
    // "default".
    let star_requests: Vec<Box<str>> = agent[module]
        .star_export_entries
        .iter()
        .map(|e| e.module_request.clone())
        .collect();
    for request in star_requests {
        let requested_module = get_imported_module(agent, module, &request);
        let star_names = get_exported_names(agent, requested_module, export_star_set);
        for name in star_names {
            if &*name != "default" && !exported_names.contains(&name) {
                exported_names.push(name);
            }
        }
    }
    exported_names
}

/// \[\[BindingName]] of a resolved binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BindingName {
    Named(Box<str>),
    /// The export is the whole namespace of the resolved module
    /// (`export * as ns from`).
    Namespace,
}

/// ### ResolvedBinding Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedBinding {
    pub(crate) module: Module,
    pub(crate) binding_name: BindingName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResolveExportResult {
    Resolved(ResolvedBinding),
    /// Multiple star exports provide distinct bindings for the name.
    Ambiguous,
    Unresolved,
}

/// ### [16.2.1.6.3 ResolveExport](https://tc39.es/ecma262/#sec-resolveexport)
///
/// Resolves `export_name` to the module and local binding that ultimately
/// provides it, following re-export chains. `resolve_set` detects circular
/// resolution; a repeated (module, name) pair resolves to nothing.
pub(crate) fn resolve_export(
    agent: &mut Agent,
    module: Module,
    export_name: &str,
    resolve_set: &mut Vec<(Module, Box<str>)>,
) -> ResolveExportResult {
    // 2. Circular import request.
    if resolve_set
        .iter()
        .any(|(m, name)| *m == module && &**name == export_name)
    {
        return ResolveExportResult::Unresolved;
    }
    // 3. Append the pair to resolveSet.
    resolve_set.push((module, export_name.into()));
    // 4. Local exports bind directly, under their exported name.
    if agent[module]
        .local_export_entries
        .iter()
        .any(|e| &*e.export_name == export_name)
    {
        return ResolveExportResult::Resolved(ResolvedBinding {
            module,
            binding_name: BindingName::Named(export_name.into()),
        });
    }
    // 5. Indirect exports resolve through the requested module.
    let indirect = agent[module]
        .indirect_export_entries
        .iter()
        .find(|e| &*e.export_name == export_name)
        .map(|e| (e.import_name.clone(), e.module_request.clone()));
    if let Some((import_name, request)) = indirect {
        let imported_module = get_imported_module(agent, module, &request);
        return match import_name {
            IndirectImportName::All => ResolveExportResult::Resolved(ResolvedBinding {
                module: imported_module,
                binding_name: BindingName::Namespace,
            }),
            IndirectImportName::Named(name) => {
                resolve_export(agent, imported_module, &name, resolve_set)
            }
        };
    }
    // 6. "default" is never provided by `export *`.
    if export_name == "default" {
        return ResolveExportResult::Unresolved;
    }
    // 7-8. Search star exports; distinct resolutions are ambiguous.
    let mut star_resolution: Option<ResolvedBinding> = None;
    let star_requests: Vec<Box<str>> = agent[module]
        .star_export_entries
        .iter()
        .map(|e| e.module_request.clone())
        .collect();
    for request in star_requests {
        let imported_module = get_imported_module(agent, module, &request);
        match resolve_export(agent, imported_module, export_name, resolve_set) {
            ResolveExportResult::Ambiguous => return ResolveExportResult::Ambiguous,
            ResolveExportResult::Resolved(resolution) => match &star_resolution {
                None => star_resolution = Some(resolution),
                Some(previous) => {
                    if *previous != resolution {
                        return ResolveExportResult::Ambiguous;
                    }
                }
            },
            ResolveExportResult::Unresolved => {}
        }
    }
    match star_resolution {
        Some(resolution) => ResolveExportResult::Resolved(resolution),
        None => ResolveExportResult::Unresolved,
    }
}

/// ### [16.2.1.10 GetImportedModule](https://tc39.es/ecma262/#sec-GetImportedModule)
pub(crate) fn get_imported_module(agent: &Agent, module: Module, specifier: &str) -> Module {
    *agent[module]
        .loaded_modules
        .get(specifier)
        .unwrap_or_else(|| {
            unreachable!(
                "module '{}' requested before loading completed",
                specifier
            )
        })
}

/// ### [16.2.1.7.3.1 InitializeEnvironment](https://tc39.es/ecma262/#sec-source-text-module-record-initialize-environment)
///
/// Validates re-exports, creates the module environment with read-through
/// slots for imports, and rejects ambiguously star-exported own names.
pub(crate) fn initialize_environment(agent: &mut Agent, module: Module) -> JsResult<()> {
    // 1-2. Every indirect export must resolve, unambiguously.
    let indirect: Vec<(Box<str>, Box<str>)> = agent[module]
        .indirect_export_entries
        .iter()
        .map(|e| (e.export_name.clone(), e.module_request.clone()))
        .collect();
    for (export_name, request) in indirect {
        match resolve_export(agent, module, &export_name, &mut Vec::new()) {
            ResolveExportResult::Resolved(_) => {}
            ResolveExportResult::Unresolved => {
                return Err(agent.throw_exception(
                    ExceptionType::SyntaxError,
                    format!(
                        "The requested module '{request}' does not provide an export named '{export_name}'"
                    ),
                ));
            }
            ResolveExportResult::Ambiguous => {
                return Err(agent.throw_exception(
                    ExceptionType::SyntaxError,
                    format!(
                        "The requested module '{request}' contains ambiguous star export of name '{export_name}'"
                    ),
                ));
            }
        }
    }

    // 7. Import bindings become read-through environment slots.
    let mut environment = hashbrown::HashMap::new();
    let imports: Vec<ImportEntryRecord> = agent[module].import_entries.to_vec();
    for entry in imports {
        let imported_module = get_imported_module(agent, module, &entry.module_request);
        let slot = match &entry.import_name {
            ImportName::Namespace => EnvironmentSlot::NamespaceImport(imported_module),
            ImportName::Named(name) => {
                match resolve_export(agent, imported_module, name, &mut Vec::new()) {
                    ResolveExportResult::Unresolved => {
                        return Err(agent.throw_exception(
                            ExceptionType::SyntaxError,
                            format!(
                                "The requested module '{}' does not provide an export named '{name}'",
                                entry.module_request
                            ),
                        ));
                    }
                    ResolveExportResult::Ambiguous => {
                        return Err(agent.throw_exception(
                            ExceptionType::SyntaxError,
                            format!(
                                "The requested module '{}' contains ambiguous star export of name '{name}'",
                                entry.module_request
                            ),
                        ));
                    }
                    ResolveExportResult::Resolved(resolution) => match resolution.binding_name {
                        BindingName::Namespace => {
                            EnvironmentSlot::NamespaceImport(resolution.module)
                        }
                        BindingName::Named(binding) => EnvironmentSlot::Import {
                            module: resolution.module,
                            binding,
                        },
                    },
                }
            }
        };
        environment.insert(entry.local_name, slot);
    }

    // Local exports start uninitialized; the executor initializes them.
    let local_exports: Vec<Box<str>> = agent[module]
        .local_export_entries
        .iter()
        .map(|e| e.export_name.clone())
        .collect();
    for name in local_exports {
        environment.insert(name, EnvironmentSlot::LocalExport(None));
    }
    agent[module].environment = Some(environment);

    // Own exported names must not be ambiguous, even the star-derived ones no
    // import has asked for yet.
    let own_names = get_exported_names(agent, module, &mut Vec::new());
    for name in own_names {
        if resolve_export(agent, module, &name, &mut Vec::new()) == ResolveExportResult::Ambiguous {
            let display = module_display(agent, module);
            return Err(agent.throw_exception(
                ExceptionType::SyntaxError,
                format!("Module '{display}' contains multiple exports named '{name}'"),
            ));
        }
    }
    Ok(())
}

/// ### [16.2.1.7.3.2 ExecuteModule](https://tc39.es/ecma262/#sec-source-text-module-record-execute-module)
///
/// Runs the executor. `capability` is present exactly when the source has
/// top-level await; a synchronous throw from an async executor rejects the
/// capability instead of propagating.
pub(crate) fn execute_module(
    agent: &mut Agent,
    module: Module,
    capability: Option<PromiseCapability<()>>,
) -> JsResult<()> {
    debug_assert_eq!(agent[module].has_tla, capability.is_some());
    let Some(executor) = agent[module].executor.take() else {
        // Instance-backed and body-less modules have nothing to run.
        if let Some(capability) = capability {
            capability.resolve(agent, ());
        }
        return Ok(());
    };
    let import_meta = if agent[module].needs_import_meta {
        Some(agent[module].assigned_import_meta.clone().unwrap_or_default())
    } else {
        None
    };
    let context = ExecuteContext {
        module,
        global_this: agent[module].global_this.clone(),
        import_meta,
        can_import: agent[module].needs_import,
        async_completion: capability.clone(),
    };
    log::trace!("executing module {:?}", agent[module].referral);
    let result = executor(agent, context);
    match capability {
        Some(capability) => {
            if let Err(error) = result {
                capability.reject(agent, error);
            }
            Ok(())
        }
        None => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_module(agent: &mut Agent, bindings: Vec<Binding>) -> Module {
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
    }

    #[test]
    fn star_exports_skip_default() {
        let mut agent = Agent::new();
        let dep = plain_module(
            &mut agent,
            vec![Binding::export("default"), Binding::export("a")],
        );
        let root = plain_module(&mut agent, vec![Binding::export_all_from("dep")]);
        wire(&mut agent, root, "dep", dep);
        let names = get_exported_names(&mut agent, root, &mut Vec::new());
        assert_eq!(names, vec![Box::from("a")]);
        assert_eq!(
            resolve_export(&mut agent, root, "default", &mut Vec::new()),
            ResolveExportResult::Unresolved
        );
    }

    #[test]
    fn local_export_resolves_under_exported_name() {
        let mut agent = Agent::new();
        let module = plain_module(&mut agent, vec![Binding::export("x")]);
        assert_eq!(
            resolve_export(&mut agent, module, "x", &mut Vec::new()),
            ResolveExportResult::Resolved(ResolvedBinding {
                module,
                binding_name: BindingName::Named("x".into()),
            })
        );
    }

    #[test]
    fn conflicting_star_exports_are_ambiguous() {
        let mut agent = Agent::new();
        let a = plain_module(&mut agent, vec![Binding::export("x")]);
        let b = plain_module(&mut agent, vec![Binding::export("x")]);
        let root = plain_module(
            &mut agent,
            vec![Binding::export_all_from("a"), Binding::export_all_from("b")],
        );
        wire(&mut agent, root, "a", a);
        wire(&mut agent, root, "b", b);
        assert_eq!(
            resolve_export(&mut agent, root, "x", &mut Vec::new()),
            ResolveExportResult::Ambiguous
        );
    }

    #[test]
    fn agreeing_star_exports_are_not_ambiguous() {
        let mut agent = Agent::new();
        let origin = plain_module(&mut agent, vec![Binding::export("x")]);
        // Both paths re-export the same binding of the same module.
        let via = plain_module(&mut agent, vec![Binding::export_all_from("origin")]);
        let root = plain_module(
            &mut agent,
            vec![
                Binding::export_all_from("origin"),
                Binding::export_all_from("via"),
            ],
        );
        wire(&mut agent, via, "origin", origin);
        wire(&mut agent, root, "origin", origin);
        wire(&mut agent, root, "via", via);
        assert_eq!(
            resolve_export(&mut agent, root, "x", &mut Vec::new()),
            ResolveExportResult::Resolved(ResolvedBinding {
                module: origin,
                binding_name: BindingName::Named("x".into()),
            })
        );
    }

    #[test]
    fn circular_star_exports_terminate() {
        let mut agent = Agent::new();
        let a = plain_module(
            &mut agent,
            vec![Binding::export("x"), Binding::export_all_from("b")],
        );
        let b = plain_module(&mut agent, vec![Binding::export_all_from("a")]);
        wire(&mut agent, a, "b", b);
        wire(&mut agent, b, "a", a);
        let names = get_exported_names(&mut agent, a, &mut Vec::new());
        assert_eq!(names, vec![Box::from("x")]);
        // b's names are a's names, minus nothing, through the cycle guard.
        let names = get_exported_names(&mut agent, b, &mut Vec::new());
        assert_eq!(names, vec![Box::from("x")]);
        assert!(matches!(
            resolve_export(&mut agent, b, "x", &mut Vec::new()),
            ResolveExportResult::Resolved(_)
        ));
    }
}
