// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Declarative import/export bindings and their normalization into the
//! categorized entry records the module record constructor consumes
//! ([16.2.1.7 Source Text Module Records](https://tc39.es/ecma262/#sec-source-text-module-records),
//! tables 45-47).

use crate::engine::agent::{Agent, ExceptionType, JsResult};

/// One declarative edge of a virtual module record, as produced by the
/// compiler boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// `import { X as Y } from 'Z'`: imported = X, alias = Y, from = Z.
    Import {
        imported: String,
        alias: Option<String>,
        from: String,
    },
    /// `import * as Y from 'Z'`.
    ImportAll { alias: String, from: String },
    /// `export { X as Y }`, or `export { X as Y } from 'Z'` when `from` is
    /// present (a re-export).
    Export {
        exported: String,
        alias: Option<String>,
        from: Option<String>,
    },
    /// `export * from 'Z'`, or `export * as Y from 'Z'` when `alias` is
    /// present.
    ExportAll {
        alias: Option<String>,
        from: String,
    },
}

impl Binding {
    pub fn import(imported: impl Into<String>, from: impl Into<String>) -> Self {
        Binding::Import {
            imported: imported.into(),
            alias: None,
            from: from.into(),
        }
    }

    pub fn import_as(
        imported: impl Into<String>,
        alias: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Binding::Import {
            imported: imported.into(),
            alias: Some(alias.into()),
            from: from.into(),
        }
    }

    pub fn import_all(alias: impl Into<String>, from: impl Into<String>) -> Self {
        Binding::ImportAll {
            alias: alias.into(),
            from: from.into(),
        }
    }

    pub fn export(exported: impl Into<String>) -> Self {
        Binding::Export {
            exported: exported.into(),
            alias: None,
            from: None,
        }
    }

    pub fn export_as(exported: impl Into<String>, alias: impl Into<String>) -> Self {
        Binding::Export {
            exported: exported.into(),
            alias: Some(alias.into()),
            from: None,
        }
    }

    pub fn export_from(
        exported: impl Into<String>,
        alias: Option<String>,
        from: impl Into<String>,
    ) -> Self {
        Binding::Export {
            exported: exported.into(),
            alias,
            from: Some(from.into()),
        }
    }

    pub fn export_all_from(from: impl Into<String>) -> Self {
        Binding::ExportAll {
            alias: None,
            from: from.into(),
        }
    }

    pub fn export_all_as(alias: impl Into<String>, from: impl Into<String>) -> Self {
        Binding::ExportAll {
            alias: Some(alias.into()),
            from: from.into(),
        }
    }
}

/// \[\[ImportName]] of an import entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportName {
    Named(Box<str>),
    /// `import * as ns`: the namespace object itself.
    Namespace,
}

/// ### ImportEntry Record
#[derive(Debug, Clone)]
pub(crate) struct ImportEntryRecord {
    /// \[\[ModuleRequest]]
    pub(crate) module_request: Box<str>,
    /// \[\[ImportName]]
    pub(crate) import_name: ImportName,
    /// \[\[LocalName]]
    pub(crate) local_name: Box<str>,
}

/// ### ExportEntry Record, local flavor
///
/// Local exports are stored and resolved under their exported name; there is
/// no separate \[\[LocalName]] because a virtual module record's executor
/// writes exports through the environment by exported name.
#[derive(Debug, Clone)]
pub(crate) struct LocalExportEntryRecord {
    /// \[\[ExportName]]
    pub(crate) export_name: Box<str>,
}

/// \[\[ImportName]] of an indirect export entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IndirectImportName {
    Named(Box<str>),
    /// `export * as ns from 'mod'`: re-exports the whole namespace.
    All,
}

/// ### ExportEntry Record, re-export flavor
#[derive(Debug, Clone)]
pub(crate) struct IndirectExportEntryRecord {
    /// \[\[ExportName]]
    pub(crate) export_name: Box<str>,
    /// \[\[ImportName]]
    pub(crate) import_name: IndirectImportName,
    /// \[\[ModuleRequest]]
    pub(crate) module_request: Box<str>,
}

/// ### ExportEntry Record, `export * from` flavor (all-but-default)
#[derive(Debug, Clone)]
pub(crate) struct StarExportEntryRecord {
    /// \[\[ModuleRequest]]
    pub(crate) module_request: Box<str>,
}

/// The output of binding normalization: four frozen entry lists plus the
/// deduplicated, order-preserving requested-module list.
#[derive(Debug)]
pub(crate) struct ModuleEntries {
    pub(crate) import_entries: Box<[ImportEntryRecord]>,
    pub(crate) local_export_entries: Box<[LocalExportEntryRecord]>,
    pub(crate) indirect_export_entries: Box<[IndirectExportEntryRecord]>,
    pub(crate) star_export_entries: Box<[StarExportEntryRecord]>,
    pub(crate) requested_modules: Box<[Box<str>]>,
}

/// Validate and categorize a raw binding list.
///
/// The `Binding` enum makes shape errors (an entry that is both an import and
/// an export, or neither) unrepresentable; what remains to validate here is
/// duplicate lexical bindings among imports and duplicate exported names,
/// both `TypeError`-class failures.
pub(crate) fn normalize_bindings(agent: &mut Agent, bindings: &[Binding]) -> JsResult<ModuleEntries> {
    // Duplicate detection first; entry construction assumes validity.
    let mut lexically_declared_names = ahash::AHashSet::new();
    let mut exported_names = ahash::AHashSet::new();
    for binding in bindings {
        match binding {
            Binding::Import {
                imported, alias, ..
            } => {
                let local = alias.as_deref().unwrap_or(imported);
                if !lexically_declared_names.insert(local.to_owned()) {
                    return Err(agent.throw_exception(
                        ExceptionType::TypeError,
                        format!("Duplicate lexical binding for '{local}'"),
                    ));
                }
            }
            Binding::ImportAll { alias, .. } => {
                if !lexically_declared_names.insert(alias.clone()) {
                    return Err(agent.throw_exception(
                        ExceptionType::TypeError,
                        format!("Duplicate lexical binding for '{alias}'"),
                    ));
                }
            }
            Binding::Export {
                exported, alias, ..
            } => {
                let name = alias.as_deref().unwrap_or(exported);
                if !exported_names.insert(name.to_owned()) {
                    return Err(agent.throw_exception(
                        ExceptionType::TypeError,
                        format!("Duplicate export binding for '{name}'"),
                    ));
                }
            }
            // `export * from` contributes no static name of its own.
            Binding::ExportAll { alias: None, .. } => {}
            Binding::ExportAll {
                alias: Some(alias), ..
            } => {
                if !exported_names.insert(alias.clone()) {
                    return Err(agent.throw_exception(
                        ExceptionType::TypeError,
                        format!("Duplicate export binding for '{alias}'"),
                    ));
                }
            }
        }
    }

    // Requested modules: every referenced specifier, deduplicated, in first
    // occurrence order.
    let mut requested_modules: Vec<Box<str>> = Vec::new();
    for binding in bindings {
        let from = match binding {
            Binding::Import { from, .. } => Some(from.as_str()),
            Binding::ImportAll { from, .. } => Some(from.as_str()),
            Binding::Export { from, .. } => from.as_deref(),
            Binding::ExportAll { from, .. } => Some(from.as_str()),
        };
        if let Some(from) = from
            && !requested_modules.iter().any(|r| &**r == from)
        {
            requested_modules.push(from.into());
        }
    }

    let mut import_entries = Vec::new();
    let mut local_export_entries = Vec::new();
    let mut indirect_export_entries = Vec::new();
    let mut star_export_entries = Vec::new();
    for binding in bindings {
        match binding {
            Binding::Import {
                imported,
                alias,
                from,
            } => import_entries.push(ImportEntryRecord {
                module_request: from.as_str().into(),
                import_name: ImportName::Named(imported.as_str().into()),
                local_name: alias.as_deref().unwrap_or(imported).into(),
            }),
            Binding::ImportAll { alias, from } => import_entries.push(ImportEntryRecord {
                module_request: from.as_str().into(),
                import_name: ImportName::Namespace,
                local_name: alias.as_str().into(),
            }),
            // 16.2.1.7.1 ParseModule step 10.a: no module request means a
            // local export.
            Binding::Export {
                exported,
                alias,
                from: None,
            } => local_export_entries.push(LocalExportEntryRecord {
                export_name: alias.as_deref().unwrap_or(exported).into(),
            }),
            // Step 10.c: a named re-export resolves through the target.
            Binding::Export {
                exported,
                alias,
                from: Some(from),
            } => indirect_export_entries.push(IndirectExportEntryRecord {
                export_name: alias.as_deref().unwrap_or(exported).into(),
                import_name: IndirectImportName::Named(exported.as_str().into()),
                module_request: from.as_str().into(),
            }),
            // Step 10.b: `export * from` is the all-but-default entry.
            Binding::ExportAll { alias: None, from } => {
                star_export_entries.push(StarExportEntryRecord {
                    module_request: from.as_str().into(),
                })
            }
            // `export * as ns from` is indirect: it names a binding.
            Binding::ExportAll {
                alias: Some(alias),
                from,
            } => indirect_export_entries.push(IndirectExportEntryRecord {
                export_name: alias.as_str().into(),
                import_name: IndirectImportName::All,
                module_request: from.as_str().into(),
            }),
        }
    }

    Ok(ModuleEntries {
        import_entries: import_entries.into_boxed_slice(),
        local_export_entries: local_export_entries.into_boxed_slice(),
        indirect_export_entries: indirect_export_entries.into_boxed_slice(),
        star_export_entries: star_export_entries.into_boxed_slice(),
        requested_modules: requested_modules.into_boxed_slice(),
    })
}
