// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Compartments: lightweight realms with their own global object and module
//! map. A compartment canonicalizes specifiers through its resolve hook,
//! caches one module per canonical specifier, and wires every module it wraps
//! to load siblings back through itself.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::{
    engine::{
        agent::{Agent, ExceptionType, JsError, JsResult},
        promise_capability_records::{Promise, PromiseCapability},
    },
    modules::{
        bindings::Binding,
        evaluation,
        module_namespaces::ModuleNamespace,
        virtual_module_records::{
            ExecuteContext, ImportHook, ImportHookResult, Module, ModuleOptions,
            VirtualModuleSource,
        },
    },
    types::{Object, Value},
};

/// Handle to a [`CompartmentRecord`] owned by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Compartment(u32);

/// Canonicalizes a specifier against the referrer's specifier. An error
/// fails the requesting import as a resolution failure.
pub type ResolveHook = Rc<dyn Fn(&mut Agent, &str, &str) -> JsResult<String>>;

/// Synchronous descriptor lookup consulted after the static module map.
pub type ModuleMapHook = Rc<dyn Fn(&mut Agent, &str) -> Option<ModuleDescriptor>>;

/// Asynchronous descriptor fetch, the last resort of specifier resolution.
pub type LoadHook = Rc<dyn Fn(&mut Agent, &str) -> JsResult<LoadHookResult>>;

pub enum LoadHookResult {
    Ready(Option<ModuleDescriptor>),
    Pending(Promise<Option<ModuleDescriptor>>),
}

/// Populates `import.meta` for a module as it is wrapped.
pub type ImportMetaHook = Rc<dyn Fn(&mut Agent, &str, &Object)>;

/// A single-use holder for a [`VirtualModuleSource`]. Descriptors are
/// cloneable; the underlying source (and its executor) is consumed by the
/// first compartment that wraps it.
#[derive(Clone)]
pub struct ModuleSource(Rc<RefCell<Option<VirtualModuleSource>>>);

impl ModuleSource {
    pub fn new(source: VirtualModuleSource) -> Self {
        Self(Rc::new(RefCell::new(Some(source))))
    }

    fn take(&self) -> Option<VirtualModuleSource> {
        self.0.borrow_mut().take()
    }
}

/// What a compartment knows about one specifier before wrapping it into a
/// module record.
#[derive(Clone)]
pub enum ModuleDescriptor {
    /// A source to instantiate within this compartment.
    Source {
        source: ModuleSource,
        /// Extra properties for the module's `import.meta`.
        import_meta: Option<Object>,
    },
    /// A pre-built instance: its properties become the module's exports.
    Instance { namespace: Object },
    /// An alias for another canonical specifier, resolved through the same
    /// per-compartment cache.
    Reference { specifier: String },
}

impl ModuleDescriptor {
    pub fn source(source: VirtualModuleSource) -> Self {
        ModuleDescriptor::Source {
            source: ModuleSource::new(source),
            import_meta: None,
        }
    }

    pub fn source_with_import_meta(source: VirtualModuleSource, import_meta: Object) -> Self {
        ModuleDescriptor::Source {
            source: ModuleSource::new(source),
            import_meta: Some(import_meta),
        }
    }

    pub fn instance(namespace: Object) -> Self {
        ModuleDescriptor::Instance { namespace }
    }

    pub fn reference(specifier: impl Into<String>) -> Self {
        ModuleDescriptor::Reference {
            specifier: specifier.into(),
        }
    }
}

/// Construction options for [`Compartment::new`]. Only the resolve hook is
/// mandatory; a compartment with neither map nor hooks can resolve nothing.
pub struct CompartmentOptions {
    pub globals: Option<Object>,
    pub resolve_hook: ResolveHook,
    pub module_map: Vec<(String, ModuleDescriptor)>,
    pub module_map_hook: Option<ModuleMapHook>,
    pub load_hook: Option<LoadHook>,
    pub import_meta_hook: Option<ImportMetaHook>,
}

impl CompartmentOptions {
    pub fn new(
        resolve_hook: impl Fn(&mut Agent, &str, &str) -> JsResult<String> + 'static,
    ) -> Self {
        Self {
            globals: None,
            resolve_hook: Rc::new(resolve_hook),
            module_map: Vec::new(),
            module_map_hook: None,
            load_hook: None,
            import_meta_hook: None,
        }
    }

    pub fn with_globals(mut self, globals: Object) -> Self {
        self.globals = Some(globals);
        self
    }

    pub fn with_module(mut self, specifier: impl Into<String>, descriptor: ModuleDescriptor) -> Self {
        self.module_map.push((specifier.into(), descriptor));
        self
    }

    pub fn with_module_map_hook(
        mut self,
        hook: impl Fn(&mut Agent, &str) -> Option<ModuleDescriptor> + 'static,
    ) -> Self {
        self.module_map_hook = Some(Rc::new(hook));
        self
    }

    pub fn with_load_hook(
        mut self,
        hook: impl Fn(&mut Agent, &str) -> JsResult<LoadHookResult> + 'static,
    ) -> Self {
        self.load_hook = Some(Rc::new(hook));
        self
    }

    pub fn with_import_meta_hook(mut self, hook: impl Fn(&mut Agent, &str, &Object) + 'static) -> Self {
        self.import_meta_hook = Some(Rc::new(hook));
        self
    }
}

/// The agent-owned state of one compartment.
pub struct CompartmentRecord {
    pub(crate) global_this: Object,
    /// One module per canonical specifier, pending loads included.
    pub(crate) module_cache: AHashMap<Box<str>, Promise<Module>>,
    resolve_hook: ResolveHook,
    module_map: AHashMap<Box<str>, ModuleDescriptor>,
    module_map_hook: Option<ModuleMapHook>,
    load_hook: Option<LoadHook>,
    import_meta_hook: Option<ImportMetaHook>,
}

impl Compartment {
    pub(crate) fn get_index(self) -> usize {
        self.0 as usize
    }

    pub fn new(agent: &mut Agent, options: CompartmentOptions) -> Compartment {
        let global_this = Object::new();
        if let Some(globals) = &options.globals {
            global_this.assign(globals);
        }
        global_this.set("globalThis", Value::Object(global_this.clone()));
        let module_map = options
            .module_map
            .into_iter()
            .map(|(specifier, descriptor)| (specifier.into_boxed_str(), descriptor))
            .collect();
        let record = CompartmentRecord {
            global_this,
            module_cache: AHashMap::new(),
            resolve_hook: options.resolve_hook,
            module_map,
            module_map_hook: options.module_map_hook,
            load_hook: options.load_hook,
            import_meta_hook: options.import_meta_hook,
        };
        let index = agent.compartments.len() as u32;
        agent.compartments.push(record);
        Compartment(index)
    }

    /// The compartment's global object. Holds a `globalThis` self-reference.
    pub fn global_this(self, agent: &Agent) -> Object {
        agent[self].global_this.clone()
    }

    /// Load, link, and evaluate the named module's graph; settles once
    /// evaluation completes, without exposing the namespace.
    pub fn load(self, agent: &mut Agent, specifier: &str) -> Promise<()> {
        let capability = PromiseCapability::new();
        let promise = capability.promise();
        let load = load_module(agent, self, specifier);
        load.on_settled(agent, move |agent, result| match result {
            Err(error) => capability.reject(agent, error),
            Ok(module) => {
                let imported = evaluation::import_module(agent, module);
                imported.on_settled(agent, move |agent, result| match result {
                    Ok(_) => capability.resolve(agent, ()),
                    Err(error) => capability.reject(agent, error),
                });
            }
        });
        promise
    }

    /// Load, link, and evaluate the named module; settles with its
    /// namespace. The specifier is taken as already canonical.
    pub fn import(self, agent: &mut Agent, specifier: &str) -> Promise<ModuleNamespace> {
        let capability = PromiseCapability::new();
        let promise = capability.promise();
        let load = load_module(agent, self, specifier);
        load.on_settled(agent, move |agent, result| match result {
            Err(error) => capability.reject(agent, error),
            Ok(module) => {
                let imported = evaluation::import_module(agent, module);
                imported.on_settled(agent, move |agent, result| match result {
                    Ok(namespace) => capability.resolve(agent, namespace),
                    Err(error) => capability.reject(agent, error),
                });
            }
        });
        promise
    }
}

/// Resolve one canonical specifier to a module record, at most once per
/// compartment. The descriptor is looked up in the module map, then the map
/// hook, then the load hook; no provider means the specifier cannot be
/// resolved.
pub(crate) fn load_module(
    agent: &mut Agent,
    compartment: Compartment,
    specifier: &str,
) -> Promise<Module> {
    if let Some(cached) = agent[compartment].module_cache.get(specifier) {
        return cached.clone();
    }
    let capability = PromiseCapability::<Module>::new();
    let promise = capability.promise();
    agent[compartment]
        .module_cache
        .insert(specifier.into(), promise.clone());

    let descriptor = agent[compartment].module_map.get(specifier).cloned();
    let descriptor = match descriptor {
        Some(descriptor) => Some(descriptor),
        None => match agent[compartment].module_map_hook.clone() {
            Some(hook) => hook(agent, specifier),
            None => None,
        },
    };
    if let Some(descriptor) = descriptor {
        settle_with_descriptor(agent, compartment, specifier, descriptor, &capability);
        return promise;
    }
    let Some(load_hook) = agent[compartment].load_hook.clone() else {
        let error = cannot_resolve(agent, specifier);
        capability.reject(agent, error);
        return promise;
    };
    match load_hook(agent, specifier) {
        Err(error) => capability.reject(agent, error),
        Ok(LoadHookResult::Ready(None)) => {
            let error = cannot_resolve(agent, specifier);
            capability.reject(agent, error);
        }
        Ok(LoadHookResult::Ready(Some(descriptor))) => {
            settle_with_descriptor(agent, compartment, specifier, descriptor, &capability);
        }
        Ok(LoadHookResult::Pending(pending)) => {
            let specifier: Box<str> = specifier.into();
            pending.on_settled(agent, move |agent, result| match result {
                Err(error) => capability.reject(agent, error),
                Ok(None) => {
                    let error = cannot_resolve(agent, &specifier);
                    capability.reject(agent, error);
                }
                Ok(Some(descriptor)) => {
                    settle_with_descriptor(agent, compartment, &specifier, descriptor, &capability);
                }
            });
        }
    }
    promise
}

fn settle_with_descriptor(
    agent: &mut Agent,
    compartment: Compartment,
    specifier: &str,
    descriptor: ModuleDescriptor,
    capability: &PromiseCapability<Module>,
) {
    // A reference never wraps anything itself; the aliased specifier's
    // module (shared through the cache) settles this entry.
    if let ModuleDescriptor::Reference { specifier: target } = descriptor {
        let capability = capability.clone();
        let load = load_module(agent, compartment, &target);
        load.on_settled(agent, move |agent, result| match result {
            Ok(module) => capability.resolve(agent, module),
            Err(error) => capability.reject(agent, error),
        });
        return;
    }
    match wrap_module_descriptor(agent, compartment, specifier, descriptor) {
        Ok(module) => capability.resolve(agent, module),
        Err(error) => capability.reject(agent, error),
    }
}

fn cannot_resolve(agent: &mut Agent, specifier: &str) -> JsError {
    agent.throw_exception(
        ExceptionType::TypeError,
        format!("Cannot resolve module \"{specifier}\""),
    )
}

/// Turn a descriptor into a module record bound to this compartment: its
/// global is the compartment's global, its `import.meta` is assembled here,
/// and its import hook resolves and loads through the compartment.
fn wrap_module_descriptor(
    agent: &mut Agent,
    compartment: Compartment,
    specifier: &str,
    descriptor: ModuleDescriptor,
) -> JsResult<Module> {
    let global_this = Value::Object(agent[compartment].global_this.clone());
    match descriptor {
        ModuleDescriptor::Source {
            source,
            import_meta,
        } => {
            let Some(source) = source.take() else {
                return Err(agent.throw_exception(
                    ExceptionType::TypeError,
                    format!("Module source for \"{specifier}\" was already used"),
                ));
            };
            // `import.meta` is only assembled for sources that declare a use
            // for it; the hook never observes other modules.
            let meta = if source.needs_import_meta {
                let meta = Object::new();
                if let Some(import_meta) = &import_meta {
                    meta.assign(import_meta);
                }
                if let Some(hook) = agent[compartment].import_meta_hook.clone() {
                    hook(agent, specifier, &meta);
                }
                Some(meta)
            } else {
                None
            };
            let import_hook: ImportHook = Rc::new(move |agent, request, referral| {
                let referrer = referral.as_str().unwrap_or_default().to_owned();
                let resolve_hook = agent[compartment].resolve_hook.clone();
                let canonical = resolve_hook(agent, request, &referrer)?;
                let load = load_module(agent, compartment, &canonical);
                // load_module yields Promise<Module>; the hook contract
                // wants Promise<Option<Module>>.
                let capability = PromiseCapability::<Option<Module>>::new();
                let adapted = capability.promise();
                load.on_settled(agent, move |agent, result| match result {
                    Ok(module) => capability.resolve(agent, Some(module)),
                    Err(error) => capability.reject(agent, error),
                });
                Ok(ImportHookResult::Pending(adapted))
            });
            Module::new(
                agent,
                source,
                ModuleOptions {
                    referral: Value::string(specifier),
                    import_hook: Some(import_hook),
                    import_meta: meta,
                    global_this,
                },
            )
        }
        ModuleDescriptor::Instance { namespace } => {
            // A synthetic module whose executor copies the instance's
            // properties into its own exports.
            let bindings = namespace
                .keys()
                .into_iter()
                .map(|key| Binding::export(&*key))
                .collect();
            let instance = namespace.clone();
            let executor = move |agent: &mut Agent, context: ExecuteContext| {
                for key in instance.keys() {
                    let value = instance.get(&key).unwrap_or_default();
                    context.set(agent, &key, value)?;
                }
                Ok(())
            };
            Module::new(
                agent,
                VirtualModuleSource::new(bindings).with_executor(executor),
                ModuleOptions {
                    referral: Value::string(specifier),
                    import_hook: None,
                    import_meta: None,
                    global_this,
                },
            )
        }
        ModuleDescriptor::Reference { .. } => {
            unreachable!("references settle before wrapping")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_this_refers_to_itself() {
        let mut agent = Agent::new();
        let compartment = Compartment::new(
            &mut agent,
            CompartmentOptions::new(|_, specifier, _| Ok(specifier.to_owned())),
        );
        let global = compartment.global_this(&agent);
        assert_eq!(global.get("globalThis"), Some(Value::Object(global.clone())));
    }

    #[test]
    fn globals_are_copied_onto_the_global_object() {
        let mut agent = Agent::new();
        let globals = Object::new();
        globals.set("answer", Value::Number(42.0));
        let compartment = Compartment::new(
            &mut agent,
            CompartmentOptions::new(|_, specifier, _| Ok(specifier.to_owned())).with_globals(globals),
        );
        let global = compartment.global_this(&agent);
        assert_eq!(global.get("answer"), Some(Value::Number(42.0)));
    }

    #[test]
    fn unresolvable_specifier_rejects_with_type_error() {
        let mut agent = Agent::new();
        let compartment = Compartment::new(
            &mut agent,
            CompartmentOptions::new(|_, specifier, _| Ok(specifier.to_owned())),
        );
        let promise = load_module(&mut agent, compartment, "nowhere");
        agent.run_jobs();
        let error = promise.result().unwrap().unwrap_err();
        assert_eq!(error.kind(), Some(ExceptionType::TypeError));
        let Value::Error(record) = error.value() else {
            panic!("expected an error value");
        };
        assert_eq!(record.message(), "Cannot resolve module \"nowhere\"");
    }
}
