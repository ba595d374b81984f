// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module graph behavior driven through the public `Module` API: loading
//! through import hooks, linking over cycles, evaluation with and without
//! top-level await, live bindings, and error caching.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use enclave_vm::{
    Agent, Binding, ExceptionType, ExecuteContext, HostFunction, ImportHook, ImportHookResult,
    JsError, Module, ModuleOptions, Object, PromiseCapability, Value, VirtualModuleSource,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A specifier-to-module table shared between the test and its import hook,
/// with a call log for at-most-once assertions.
#[derive(Clone, Default)]
struct Registry {
    modules: Rc<RefCell<HashMap<String, Module>>>,
    hook_calls: Rc<RefCell<Vec<String>>>,
}

impl Registry {
    fn hook(&self) -> ImportHook {
        let modules = self.modules.clone();
        let hook_calls = self.hook_calls.clone();
        Rc::new(move |_agent, specifier, _referral| {
            hook_calls.borrow_mut().push(specifier.to_owned());
            match modules.borrow().get(specifier) {
                Some(module) => Ok(ImportHookResult::Resolved(*module)),
                None => Ok(ImportHookResult::Unresolved),
            }
        })
    }

    fn register(&self, specifier: &str, module: Module) {
        self.modules
            .borrow_mut()
            .insert(specifier.to_owned(), module);
    }

    fn module(
        &self,
        agent: &mut Agent,
        specifier: &str,
        source: VirtualModuleSource,
    ) -> Module {
        let module = Module::new(
            agent,
            source,
            ModuleOptions {
                referral: Value::string(specifier),
                import_hook: Some(self.hook()),
                import_meta: None,
                global_this: Value::Undefined,
            },
        )
        .unwrap();
        self.register(specifier, module);
        module
    }
}

fn error_message(error: &JsError) -> String {
    match error.value() {
        Value::Error(record) => record.message().to_owned(),
        other => panic!("expected an error value, got {other:?}"),
    }
}

#[test]
fn imports_flow_between_modules() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    registry.module(
        &mut agent,
        "dep",
        VirtualModuleSource::new(vec![Binding::export("value")])
            .with_executor(|agent, ctx| ctx.set(agent, "value", Value::Number(7.0))),
    );
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![
            Binding::import("value", "dep"),
            Binding::export("doubled"),
        ])
        .with_executor(|agent, ctx| {
            let Value::Number(value) = ctx.get(agent, "value")? else {
                panic!("expected a number");
            };
            ctx.set(agent, "doubled", Value::Number(value * 2.0))
        }),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    let namespace = promise.result().unwrap().unwrap();
    assert_eq!(
        namespace.get(&mut agent, "doubled").unwrap(),
        Value::Number(14.0)
    );
    // Missing names read as undefined rather than failing.
    assert_eq!(
        namespace.get(&mut agent, "nonexistent").unwrap(),
        Value::Undefined
    );
}

#[test]
fn evaluation_is_idempotent() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let runs = Rc::new(Cell::new(0u32));
    let counter = runs.clone();
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![Binding::export("x")]).with_executor(move |agent, ctx| {
            counter.set(counter.get() + 1);
            ctx.set(agent, "x", Value::Number(1.0))
        }),
    );
    let first = root.import(&mut agent);
    agent.run_jobs();
    let second = root.import(&mut agent);
    agent.run_jobs();
    assert_eq!(runs.get(), 1);
    let first = first.result().unwrap().unwrap();
    let second = second.result().unwrap().unwrap();
    assert_eq!(first, second);
}

#[test]
fn exported_bindings_are_live() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    registry.module(
        &mut agent,
        "counter",
        VirtualModuleSource::new(vec![Binding::export("count"), Binding::export("bump")])
            .with_executor(|agent, ctx| {
                let ctx = Rc::new(ctx);
                ctx.set(agent, "count", Value::Number(1.0))?;
                let shared = ctx.clone();
                let bump = HostFunction::new(move |agent, _| {
                    let Value::Number(current) = shared.get(agent, "count")? else {
                        panic!("expected a number");
                    };
                    shared.set(agent, "count", Value::Number(current + 1.0))?;
                    Ok(Value::Undefined)
                });
                ctx.set(agent, "bump", Value::Function(bump))
            }),
    );
    // The importer sees writes made after its own evaluation finished.
    let observer = registry.module(
        &mut agent,
        "observer",
        VirtualModuleSource::new(vec![
            Binding::import("count", "counter"),
            Binding::export("initial"),
            Binding::export("read"),
            // Re-exported so it shows up on the observer's namespace.
            Binding::export_from("bump", None, "counter"),
        ])
        .with_executor(|agent, ctx| {
            let ctx = Rc::new(ctx);
            let initial = ctx.get(agent, "count")?;
            ctx.set(agent, "initial", initial)?;
            let shared = ctx.clone();
            let read = HostFunction::new(move |agent, _| shared.get(agent, "count"));
            ctx.set(agent, "read", Value::Function(read))
        }),
    );
    let promise = observer.import(&mut agent);
    agent.run_jobs();
    let namespace = promise.result().unwrap().unwrap();
    assert_eq!(
        namespace.get(&mut agent, "initial").unwrap(),
        Value::Number(1.0)
    );
    let Value::Function(bump) = namespace.get(&mut agent, "bump").unwrap() else {
        panic!("expected the bump function");
    };
    bump.call(&mut agent, &[]).unwrap();
    let Value::Function(read) = namespace.get(&mut agent, "read").unwrap() else {
        panic!("expected the read function");
    };
    assert_eq!(read.call(&mut agent, &[]).unwrap(), Value::Number(2.0));
}

#[test]
fn module_can_import_its_own_namespace() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![
            Binding::import_all("me", "root"),
            Binding::export("x"),
            Binding::export("seen"),
            Binding::export("myself"),
        ])
        .with_executor(|agent, ctx| {
            ctx.set(agent, "x", Value::Number(5.0))?;
            let myself = ctx.get(agent, "me")?;
            let Value::Namespace(me) = myself else {
                panic!("expected own namespace");
            };
            let seen = me.get(agent, "x")?;
            ctx.set(agent, "seen", seen)?;
            ctx.set(agent, "myself", Value::Namespace(me))
        }),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    let namespace = promise.result().unwrap().unwrap();
    assert_eq!(namespace.get(&mut agent, "seen").unwrap(), Value::Number(5.0));
    // A module's namespace is its identity, even seen from inside.
    let Value::Namespace(me) = namespace.get(&mut agent, "myself").unwrap() else {
        panic!("expected a namespace");
    };
    assert_eq!(me, namespace);
}

#[test]
fn circular_imports_link_and_evaluate() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let order = Rc::new(RefCell::new(Vec::new()));
    // Entering the a <-> b cycle at b, a executes first. a only installs a
    // function; the cross-cycle read happens once b has initialized "vb".
    let seen = order.clone();
    registry.module(
        &mut agent,
        "a",
        VirtualModuleSource::new(vec![
            Binding::import("vb", "b"),
            Binding::export("read_b"),
        ])
        .with_executor(move |agent, ctx| {
            seen.borrow_mut().push("a");
            let ctx = Rc::new(ctx);
            let shared = ctx.clone();
            let read_b = HostFunction::new(move |agent, _| shared.get(agent, "vb"));
            ctx.set(agent, "read_b", Value::Function(read_b))
        }),
    );
    let seen = order.clone();
    let b = registry.module(
        &mut agent,
        "b",
        VirtualModuleSource::new(vec![
            Binding::import("read_b", "a"),
            Binding::export("vb"),
            Binding::export("echoed"),
        ])
        .with_executor(move |agent, ctx| {
            seen.borrow_mut().push("b");
            ctx.set(agent, "vb", Value::Number(1.0))?;
            let Value::Function(read_b) = ctx.get(agent, "read_b")? else {
                panic!("expected a function");
            };
            let echoed = read_b.call(agent, &[])?;
            ctx.set(agent, "echoed", echoed)
        }),
    );
    let promise = b.import(&mut agent);
    agent.run_jobs();
    let namespace = promise.result().unwrap().unwrap();
    assert_eq!(&*order.borrow(), &["a", "b"]);
    assert_eq!(
        namespace.get(&mut agent, "echoed").unwrap(),
        Value::Number(1.0)
    );
}

#[test]
fn reading_a_cycle_binding_too_early_is_a_reference_error() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    registry.module(
        &mut agent,
        "a",
        VirtualModuleSource::new(vec![
            Binding::import("vb", "b"),
            Binding::export("va"),
        ])
        .with_executor(|agent, ctx| {
            // In the a -> b -> a cycle entered at b, a executes before b.
            let vb = ctx.get(agent, "vb")?;
            ctx.set(agent, "va", vb)
        }),
    );
    let b = registry.module(
        &mut agent,
        "b",
        VirtualModuleSource::new(vec![
            Binding::import("va", "a"),
            Binding::export("vb"),
        ])
        .with_executor(|agent, ctx| ctx.set(agent, "vb", Value::Number(1.0))),
    );
    let promise = b.import(&mut agent);
    agent.run_jobs();
    let error = promise.result().unwrap().unwrap_err();
    assert_eq!(error.kind(), Some(ExceptionType::ReferenceError));
    assert_eq!(
        error_message(&error),
        "Cannot access 'vb' before initialization"
    );
}

#[test]
fn star_export_echo_cycle_resolves() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    // a exports x and re-exports everything from b; b re-exports everything
    // from a. The echo must neither loop nor make x ambiguous.
    registry.module(
        &mut agent,
        "a",
        VirtualModuleSource::new(vec![
            Binding::export("x"),
            Binding::export_all_from("b"),
        ])
        .with_executor(|agent, ctx| ctx.set(agent, "x", Value::Number(3.0))),
    );
    registry.module(
        &mut agent,
        "b",
        VirtualModuleSource::new(vec![Binding::export_all_from("a")]),
    );
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![
            Binding::import("x", "b"),
            Binding::export("got"),
        ])
        .with_executor(|agent, ctx| {
            let x = ctx.get(agent, "x")?;
            ctx.set(agent, "got", x)
        }),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    let namespace = promise.result().unwrap().unwrap();
    assert_eq!(namespace.get(&mut agent, "got").unwrap(), Value::Number(3.0));
}

#[test]
fn conflicting_star_exports_fail_linking() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    registry.module(
        &mut agent,
        "left",
        VirtualModuleSource::new(vec![Binding::export("dup")])
            .with_executor(|agent, ctx| ctx.set(agent, "dup", Value::Number(1.0))),
    );
    registry.module(
        &mut agent,
        "right",
        VirtualModuleSource::new(vec![Binding::export("dup")])
            .with_executor(|agent, ctx| ctx.set(agent, "dup", Value::Number(2.0))),
    );
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![
            Binding::export_all_from("left"),
            Binding::export_all_from("right"),
        ]),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    let error = promise.result().unwrap().unwrap_err();
    assert_eq!(error.kind(), Some(ExceptionType::SyntaxError));
    assert_eq!(
        error_message(&error),
        "Module 'root' contains multiple exports named 'dup'"
    );
}

#[test]
fn missing_export_fails_linking() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    registry.module(
        &mut agent,
        "dep",
        VirtualModuleSource::new(vec![Binding::export("present")])
            .with_executor(|agent, ctx| ctx.set(agent, "present", Value::Undefined)),
    );
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![Binding::import("absent", "dep")]),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    let error = promise.result().unwrap().unwrap_err();
    assert_eq!(error.kind(), Some(ExceptionType::SyntaxError));
    assert_eq!(
        error_message(&error),
        "The requested module 'dep' does not provide an export named 'absent'"
    );
}

#[test]
fn unresolvable_specifier_fails_loading() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![Binding::import("x", "missing")]),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    let error = promise.result().unwrap().unwrap_err();
    assert_eq!(error.kind(), Some(ExceptionType::SyntaxError));
    assert_eq!(error_message(&error), "Failed to resolve module 'missing'");
}

#[test]
fn import_hook_runs_once_per_specifier() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    registry.module(
        &mut agent,
        "dep",
        VirtualModuleSource::new(vec![Binding::export("v")])
            .with_executor(|agent, ctx| ctx.set(agent, "v", Value::Number(9.0))),
    );
    // Three bindings, one request: the specifier list is deduplicated and
    // the hook memoized per (module, specifier).
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![
            Binding::import("v", "dep"),
            Binding::import_all("ns", "dep"),
            Binding::export_from("v", Some("again".into()), "dep"),
        ]),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    promise.result().unwrap().unwrap();
    assert_eq!(&*registry.hook_calls.borrow(), &["dep".to_owned()]);
}

#[test]
fn duplicate_exports_are_rejected_at_construction() {
    init_logging();
    let mut agent = Agent::new();
    let error = Module::new(
        &mut agent,
        VirtualModuleSource::new(vec![
            Binding::export("x"),
            Binding::export_from("y", Some("x".into()), "dep"),
        ]),
        ModuleOptions::default(),
    )
    .unwrap_err();
    assert_eq!(error.kind(), Some(ExceptionType::TypeError));
}

#[test]
fn evaluation_errors_are_cached() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let runs = Rc::new(Cell::new(0u32));
    let counter = runs.clone();
    registry.module(
        &mut agent,
        "faulty",
        VirtualModuleSource::new(vec![Binding::export("x")]).with_executor(move |agent, _ctx| {
            counter.set(counter.get() + 1);
            Err(agent.throw_exception(ExceptionType::Error, "boom"))
        }),
    );
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![Binding::import("x", "faulty")]),
    );
    let first = root.import(&mut agent);
    agent.run_jobs();
    let second = root.import(&mut agent);
    agent.run_jobs();
    let first = first.result().unwrap().unwrap_err();
    let second = second.result().unwrap().unwrap_err();
    // The same error value, not a rerun.
    assert_eq!(first, second);
    assert_eq!(runs.get(), 1);
    assert_eq!(error_message(&first), "boom");
}

#[test]
fn import_meta_is_exposed_to_the_executor() {
    init_logging();
    let mut agent = Agent::new();
    let meta = Object::new();
    meta.set("url", Value::string("virtual:root"));
    let seen = Rc::new(RefCell::new(None));
    let slot = seen.clone();
    let module = Module::new(
        &mut agent,
        VirtualModuleSource::new(vec![]).with_import_meta().with_executor(
            move |_agent, ctx| {
                *slot.borrow_mut() = ctx.import_meta().and_then(|meta| meta.get("url"));
                Ok(())
            },
        ),
        ModuleOptions {
            referral: Value::string("root"),
            import_hook: None,
            import_meta: Some(meta),
            global_this: Value::Undefined,
        },
    )
    .unwrap();
    let promise = module.import(&mut agent);
    agent.run_jobs();
    promise.result().unwrap().unwrap();
    assert_eq!(*seen.borrow(), Some(Value::string("virtual:root")));
}

#[test]
fn dynamic_import_resolves_through_the_hook() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    registry.module(
        &mut agent,
        "lazy",
        VirtualModuleSource::new(vec![Binding::export("v")])
            .with_executor(|agent, ctx| ctx.set(agent, "v", Value::Number(4.0))),
    );
    let result = Rc::new(RefCell::new(None));
    let slot = result.clone();
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![])
            .with_dynamic_import()
            .with_executor(move |agent, ctx| {
                let promise = ctx.import(agent, "lazy");
                *slot.borrow_mut() = Some(promise);
                Ok(())
            }),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    promise.result().unwrap().unwrap();
    let lazy = result.borrow().clone().unwrap();
    let Value::Namespace(namespace) = lazy.result().unwrap().unwrap() else {
        panic!("expected a namespace");
    };
    assert_eq!(namespace.get(&mut agent, "v").unwrap(), Value::Number(4.0));
    // The dynamic request joined the hook memoization.
    assert_eq!(&*registry.hook_calls.borrow(), &["lazy".to_owned()]);
}

#[test]
fn dynamic_import_requires_the_capability() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let result = Rc::new(RefCell::new(None));
    let slot = result.clone();
    // No with_dynamic_import: the context refuses.
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![]).with_executor(move |agent, ctx| {
            *slot.borrow_mut() = Some(ctx.import(agent, "anything"));
            Ok(())
        }),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    promise.result().unwrap().unwrap();
    let rejected = result.borrow().clone().unwrap();
    let error = rejected.result().unwrap().unwrap_err();
    assert_eq!(error.kind(), Some(ExceptionType::TypeError));
}

/// Helpers for top-level-await tests: the executor parks its context and
/// completion capability so the test can play the role of the awaited work.
#[derive(Clone, Default)]
struct ParkedModule {
    parked: Rc<RefCell<Option<(Rc<ExecuteContext>, PromiseCapability<()>)>>>,
}

impl ParkedModule {
    fn source(&self, bindings: Vec<Binding>) -> VirtualModuleSource {
        let parked = self.parked.clone();
        VirtualModuleSource::new(bindings)
            .with_top_level_await()
            .with_executor(move |_agent, ctx| {
                let completion = ctx.async_completion().unwrap();
                *parked.borrow_mut() = Some((Rc::new(ctx), completion));
                Ok(())
            })
    }

    fn finish(&self, agent: &mut Agent) {
        let (_, completion) = self.parked.borrow_mut().take().unwrap();
        completion.resolve(agent, ());
        agent.run_jobs();
    }

    fn finish_with(&self, agent: &mut Agent, name: &str, value: Value) {
        let (ctx, completion) = self.parked.borrow_mut().take().unwrap();
        ctx.set(agent, name, value).unwrap();
        completion.resolve(agent, ());
        agent.run_jobs();
    }

    fn fail(&self, agent: &mut Agent, error: JsError) {
        let (_, completion) = self.parked.borrow_mut().take().unwrap();
        completion.reject(agent, error);
        agent.run_jobs();
    }
}

#[test]
fn top_level_await_defers_ancestors_in_order() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let parked = ParkedModule::default();
    let order = Rc::new(RefCell::new(Vec::new()));

    registry.module(&mut agent, "a", parked.source(vec![]));
    for (name, deps) in [("b", vec!["a"]), ("c", vec!["a"])] {
        let seen = order.clone();
        let bindings = deps
            .into_iter()
            .map(|dep| Binding::import_all("ns", dep))
            .collect::<Vec<_>>();
        registry.module(
            &mut agent,
            name,
            VirtualModuleSource::new(bindings).with_executor(move |_agent, _ctx| {
                seen.borrow_mut().push(name);
                Ok(())
            }),
        );
    }
    let seen = order.clone();
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![
            Binding::import_all("b", "b"),
            Binding::import_all("c", "c"),
        ])
        .with_executor(move |_agent, _ctx| {
            seen.borrow_mut().push("root");
            Ok(())
        }),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    // Everything waits on a.
    assert!(promise.is_pending());
    assert!(order.borrow().is_empty());
    parked.finish(&mut agent);
    promise.result().unwrap().unwrap();
    // Ancestors resumed in the order they entered async evaluation.
    assert_eq!(&*order.borrow(), &["b", "c", "root"]);
}

#[test]
fn top_level_await_value_is_visible_to_importers() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let parked = ParkedModule::default();
    registry.module(&mut agent, "slow", parked.source(vec![Binding::export("v")]));
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![
            Binding::import("v", "slow"),
            Binding::export("got"),
        ])
        .with_executor(|agent, ctx| {
            let v = ctx.get(agent, "v")?;
            ctx.set(agent, "got", v)
        }),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    assert!(promise.is_pending());
    // The awaited work completes and initializes the export; root runs after.
    parked.finish_with(&mut agent, "v", Value::Number(11.0));
    let namespace = promise.result().unwrap().unwrap();
    assert_eq!(namespace.get(&mut agent, "got").unwrap(), Value::Number(11.0));
}

#[test]
fn top_level_await_rejection_reaches_every_ancestor() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let parked = ParkedModule::default();
    registry.module(&mut agent, "slow", parked.source(vec![]));
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![Binding::import_all("ns", "slow")]).with_executor(
            move |_agent, _ctx| {
                flag.set(true);
                Ok(())
            },
        ),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    assert!(promise.is_pending());
    let error = agent.throw_exception(ExceptionType::Error, "await failed");
    parked.fail(&mut agent, error);
    let rejection = promise.result().unwrap().unwrap_err();
    assert_eq!(error_message(&rejection), "await failed");
    assert!(!ran.get());
    // Later imports observe the same cached failure.
    let again = root.import(&mut agent);
    agent.run_jobs();
    assert_eq!(again.result().unwrap().unwrap_err(), rejection);
}

#[test]
fn sync_throw_in_async_module_rejects_its_graph() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    registry.module(
        &mut agent,
        "slow",
        VirtualModuleSource::new(vec![])
            .with_top_level_await()
            .with_executor(|agent, _ctx| {
                Err(agent.throw_exception(ExceptionType::Error, "early"))
            }),
    );
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![Binding::import_all("ns", "slow")]),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    let error = promise.result().unwrap().unwrap_err();
    assert_eq!(error_message(&error), "early");
}

#[test]
fn namespace_keys_are_sorted() {
    init_logging();
    let mut agent = Agent::new();
    let registry = Registry::default();
    let root = registry.module(
        &mut agent,
        "root",
        VirtualModuleSource::new(vec![
            Binding::export("zeta"),
            Binding::export("alpha"),
            Binding::export("mid"),
        ])
        .with_executor(|agent, ctx| {
            ctx.set(agent, "zeta", Value::Number(1.0))?;
            ctx.set(agent, "alpha", Value::Number(2.0))?;
            ctx.set(agent, "mid", Value::Number(3.0))
        }),
    );
    let promise = root.import(&mut agent);
    agent.run_jobs();
    let namespace = promise.result().unwrap().unwrap();
    let keys = namespace.keys(&agent);
    assert_eq!(
        keys,
        vec![Box::from("alpha"), Box::from("mid"), Box::from("zeta")]
    );
    assert!(namespace.has(&agent, "alpha"));
    assert!(!namespace.has(&agent, "omega"));
}
