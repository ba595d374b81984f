// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Language values passed between module executors, environments, and
//! namespaces. Reference-typed variants compare by identity, the rest by
//! content.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    engine::agent::{Agent, ExceptionType, JsResult},
    modules::module_namespaces::ModuleNamespace,
};

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Object(Object),
    Function(HostFunction),
    Namespace(ModuleNamespace),
    Error(ErrorRecord),
}

impl Value {
    pub fn string(value: impl Into<Rc<str>>) -> Self {
        Value::String(value.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<ModuleNamespace> {
        match self {
            Value::Namespace(ns) => Some(*ns),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Namespace(a), Value::Namespace(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(_) => write!(f, "[function]"),
            Value::Namespace(ns) => write!(f, "{ns:?}"),
            Value::Error(e) => write!(f, "{}: {}", e.kind().as_str(), e.message()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

/// A string-keyed, insertion-ordered property bag. This is what compartment
/// globals, `import.meta` objects, and pre-built module instances are made
/// of; module machinery never reaches deeper into host object graphs than
/// this.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<Vec<(Rc<str>, Value)>>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (impl Into<Rc<str>>, Value)>) -> Self {
        let object = Self::new();
        for (key, value) in entries {
            object.set(key, value);
        }
        object
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0
            .borrow()
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v.clone())
    }

    /// Create or overwrite a property.
    pub fn set(&self, key: impl Into<Rc<str>>, value: Value) {
        let key = key.into();
        let mut entries = self.0.borrow_mut();
        if let Some(entry) = entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            entries.push((key, value));
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.borrow().iter().any(|(k, _)| &**k == key)
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Copy every own property of `source` onto `self`, overwriting existing
    /// entries. The `Object.assign` of this value model.
    pub fn assign(&self, source: &Object) {
        for key in source.keys() {
            if let Some(value) = source.get(&key) {
                self.set(key, value);
            }
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").finish_non_exhaustive()
    }
}

/// A host function value. Calls receive the agent so they can re-enter the
/// module machinery (dynamic import helpers are built out of these).
#[derive(Clone)]
pub struct HostFunction(Rc<dyn Fn(&mut Agent, &[Value]) -> JsResult<Value>>);

impl HostFunction {
    pub fn new(f: impl Fn(&mut Agent, &[Value]) -> JsResult<Value> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, agent: &mut Agent, arguments: &[Value]) -> JsResult<Value> {
        (self.0)(agent, arguments)
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction").finish_non_exhaustive()
    }
}

/// The payload of an engine-created error value. Executor code may also throw
/// arbitrary [`Value`]s; this record only backs `Value::Error`.
#[derive(Clone, Debug)]
pub struct ErrorRecord(Rc<ErrorRecordData>);

#[derive(Debug)]
struct ErrorRecordData {
    kind: ExceptionType,
    message: Box<str>,
}

impl ErrorRecord {
    pub(crate) fn new(kind: ExceptionType, message: impl Into<Box<str>>) -> Self {
        Self(Rc::new(ErrorRecordData {
            kind,
            message: message.into(),
        }))
    }

    pub fn kind(&self) -> ExceptionType {
        self.0.kind
    }

    pub fn message(&self) -> &str {
        &self.0.message
    }
}

impl PartialEq for ErrorRecord {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
