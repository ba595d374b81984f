// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2 Modules](https://tc39.es/ecma262/#sec-modules)
//!
//! Virtual module records and the cyclic-module machinery that loads, links,
//! and evaluates them.

pub mod bindings;
pub mod evaluation;
pub mod graph_loading;
pub mod linking;
pub mod module_environments;
pub mod module_namespaces;
pub mod virtual_module_records;
