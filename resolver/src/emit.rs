// emit.rs — Artifact emission from the locked partition
//
// Consumes the finalized model and renders typed declarations and statements
// into source units: the top-level API header/source pair, one header per
// component, the shared type header, the task source/header pair, and
// optionally the test-double (mock) API pair. Everything is emitted as
// structured descriptors; an external renderer turns them into text.
//
// Preconditions: the partition is finalized; listings are already sorted.
// Postconditions: unit order and declaration order are fully determined by
//                 the locked model, never by hash-map iteration.
// Failure modes: none; invalid models never reach this phase.
// Side effects: none.

use crate::api::{AccessTarget, ApiKind, PortFunction};
use crate::cdecl::{
    CBinOp, CDecl, CExpr, CParam, CStmt, CType, CTypeDef, CondBranch, FnSignature, SourceUnit,
    Storage,
};
use crate::component::{Component, ModeActivation};
use crate::mode::ModeSwitchFunction;
use crate::model::TypeKind;
use crate::partition::Partition;
use crate::schedule::OsTask;
use crate::storage::CellKind;

// ── Public types ────────────────────────────────────────────────────────────

/// The full artifact plan, in fixed unit order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GeneratedArtifacts {
    pub units: Vec<SourceUnit>,
}

impl GeneratedArtifacts {
    pub fn unit(&self, file_name: &str) -> Option<&SourceUnit> {
        self.units.iter().find(|u| u.file_name == file_name)
    }

    /// Compact JSON of the whole plan; equal plans serialize identically.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("internal: artifact serialization")
    }
}

/// Emit all units for a finalized partition.
pub fn generate(p: &Partition) -> GeneratedArtifacts {
    let mut units = Vec::new();
    units.push(api_header(p));
    units.push(api_source(p));
    for component in &p.components {
        units.push(component_header(p, component));
    }
    units.push(type_header(p));
    units.push(task_header(p));
    units.push(task_source(p));
    if p.config.mock_api {
        units.push(mock_header(p));
        units.push(mock_source(p));
    }
    GeneratedArtifacts { units }
}

// ── Shared helpers ──────────────────────────────────────────────────────────

fn upper(prefix: &str) -> String {
    prefix.to_uppercase()
}

fn status_ok(prefix: &str) -> CExpr {
    CExpr::ident(format!("{}_E_OK", upper(prefix)))
}

fn status_unconnected(prefix: &str) -> CExpr {
    CExpr::ident(format!("{}_E_UNCONNECTED", upper(prefix)))
}

fn mode_const(prefix: &str, declaration: &str, mode: &str) -> String {
    format!("{}_MODE_{}_{}", upper(prefix), declaration, mode)
}

/// Storage-cell initializer: numeric literals become integers, anything
/// else is a named constant.
fn init_expr(literal: &str) -> CExpr {
    match literal.parse::<i64>() {
        Ok(value) => CExpr::Int(value),
        Err(_) => CExpr::ident(literal),
    }
}

fn banner(text: impl Into<String>) -> CDecl {
    CDecl::Comment(text.into())
}

// ── API header / source ─────────────────────────────────────────────────────

fn api_header(p: &Partition) -> SourceUnit {
    let prefix = &p.config.prefix;
    let mut decls = vec![
        banner(format!(
            "Client API for partition '{}'. Generated file, do not edit.",
            p.name
        )),
        CDecl::Include(format!("{prefix}_Type.h")),
        CDecl::Define {
            name: format!("{}_E_OK", upper(prefix)),
            value: CExpr::Int(0),
        },
        CDecl::Define {
            name: format!("{}_E_NOK", upper(prefix)),
            value: CExpr::Int(1),
        },
        CDecl::Define {
            name: format!("{}_E_UNCONNECTED", upper(prefix)),
            value: CExpr::Int(2),
        },
        banner("Client API prototypes"),
    ];
    for func in p.api.all_functions() {
        decls.push(CDecl::FnProto(func.sig.clone()));
    }
    SourceUnit {
        file_name: format!("{prefix}.h"),
        decls,
    }
}

fn api_source(p: &Partition) -> SourceUnit {
    let prefix = &p.config.prefix;
    let mut decls = vec![
        banner(format!(
            "Client API implementation for partition '{}'.",
            p.name
        )),
        CDecl::Include(format!("{prefix}.h")),
        banner("Shared signal and parameter storage"),
    ];
    for cell in p.storage.iter().filter(|c| c.kind != CellKind::ModeShadow) {
        decls.push(CDecl::Var {
            name: cell.symbol.clone(),
            ty: CType::named(cell.type_name.clone()),
            storage: Storage::Static,
            array_len: None,
            init: cell.init.as_deref().map(init_expr),
        });
    }

    // Boundary accessors are implemented by the communication stack; only
    // their prototypes appear here.
    let accessors: Vec<FnSignature> = p
        .api
        .all_functions()
        .filter_map(|f| match &f.target {
            AccessTarget::Accessor { symbol } => {
                let mut sig = f.sig.clone();
                sig.name = symbol.clone();
                Some(sig)
            }
            _ => None,
        })
        .collect();
    if !accessors.is_empty() {
        decls.push(banner("Communication-boundary accessor prototypes"));
        for sig in accessors {
            decls.push(CDecl::FnProto(sig));
        }
    }

    decls.push(banner("Client API"));
    for func in p.api.all_functions() {
        decls.push(CDecl::FnDef {
            sig: func.sig.clone(),
            body: api_body(prefix, func),
        });
    }
    SourceUnit {
        file_name: format!("{prefix}.c"),
        decls,
    }
}

fn copy_out(cell: &str, ty: &str) -> CStmt {
    CStmt::Expr(CExpr::call(
        "memcpy",
        vec![
            CExpr::ident("data"),
            CExpr::addr_of(CExpr::ident(cell)),
            CExpr::SizeOf(ty.to_string()),
        ],
    ))
}

fn copy_in(cell: &str, ty: &str) -> CStmt {
    CStmt::Expr(CExpr::call(
        "memcpy",
        vec![
            CExpr::addr_of(CExpr::ident(cell)),
            CExpr::ident("data"),
            CExpr::SizeOf(ty.to_string()),
        ],
    ))
}

fn api_body(prefix: &str, func: &PortFunction) -> Vec<CStmt> {
    let data_type = func.data_type.as_deref().unwrap_or("");
    match func.kind {
        ApiKind::Read | ApiKind::Receive => match &func.target {
            AccessTarget::Cell { symbol } => {
                let copy = if func.complex {
                    copy_out(symbol, data_type)
                } else {
                    CStmt::Assign {
                        target: CExpr::deref(CExpr::ident("data")),
                        value: CExpr::ident(symbol.clone()),
                    }
                };
                vec![copy, CStmt::Return(Some(status_ok(prefix)))]
            }
            AccessTarget::Accessor { symbol } => vec![CStmt::Return(Some(CExpr::call(
                symbol.clone(),
                vec![CExpr::ident("data")],
            )))],
            _ => vec![CStmt::Return(Some(status_unconnected(prefix)))],
        },
        ApiKind::Write | ApiKind::Send => match &func.target {
            AccessTarget::Cell { symbol } => {
                let copy = if func.complex {
                    copy_in(symbol, data_type)
                } else {
                    CStmt::Assign {
                        target: CExpr::ident(symbol.clone()),
                        value: CExpr::ident("data"),
                    }
                };
                vec![copy, CStmt::Return(Some(status_ok(prefix)))]
            }
            AccessTarget::Accessor { symbol } => vec![CStmt::Return(Some(CExpr::call(
                symbol.clone(),
                vec![CExpr::ident("data")],
            )))],
            _ => vec![CStmt::Return(Some(status_unconnected(prefix)))],
        },
        ApiKind::Call => match &func.target {
            AccessTarget::ServerCall { symbol } => {
                let args = func
                    .sig
                    .params
                    .iter()
                    .map(|p| CExpr::ident(p.name.clone()))
                    .collect();
                vec![CStmt::Return(Some(CExpr::call(symbol.clone(), args)))]
            }
            _ => vec![CStmt::Return(Some(status_unconnected(prefix)))],
        },
        ApiKind::Calprm => match &func.target {
            AccessTarget::Cell { symbol } if func.complex => vec![copy_out(symbol, data_type)],
            AccessTarget::Cell { symbol } => {
                vec![CStmt::Return(Some(CExpr::ident(symbol.clone())))]
            }
            _ => vec![CStmt::Return(Some(CExpr::Int(0)))],
        },
    }
}

// ── Per-component header ────────────────────────────────────────────────────

fn component_header(p: &Partition, component: &Component) -> SourceUnit {
    let prefix = &p.config.prefix;
    let mut decls = vec![
        banner(format!("Component API mapping for '{}'.", component.name)),
        CDecl::Include(format!("{prefix}.h")),
    ];
    if !component.api_refs.is_empty() {
        decls.push(banner("Short-name redirection table"));
    }
    for (kind, short) in &component.api_refs {
        if let Some(func) = p.api.lookup(*kind, short) {
            decls.push(CDecl::SymbolAlias {
                alias: short.clone(),
                target: func.long_name().to_string(),
            });
        }
    }
    SourceUnit {
        file_name: format!("{prefix}_{}.h", component.name),
        decls,
    }
}

// ── Shared type header ──────────────────────────────────────────────────────

/// Collect the names of all data types reachable from the partition's
/// ports, including record fields and array elements.
fn collect_used_types(p: &Partition) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut pending: Vec<String> = Vec::new();

    for port in &p.ports {
        for element in &port.elements {
            pending.push(element.type_name.clone());
        }
        for operation in &port.operations {
            for arg in &operation.arguments {
                pending.push(arg.type_name.clone());
            }
        }
    }
    while let Some(name) = pending.pop() {
        if !used.insert(name.clone()) {
            continue;
        }
        if let Some(decl) = p.model.data_type(&name) {
            match &decl.kind {
                TypeKind::Primitive { .. } => {}
                TypeKind::Record { fields } => {
                    pending.extend(fields.iter().map(|f| f.type_ref.clone()));
                }
                TypeKind::Array { element, .. } => pending.push(element.clone()),
            }
        }
    }

    // Model declaration order doubles as dependency order.
    p.model
        .data_types
        .iter()
        .filter(|t| used.contains(&t.name))
        .map(|t| t.name.clone())
        .collect()
}

fn type_header(p: &Partition) -> SourceUnit {
    let prefix = &p.config.prefix;
    let mut decls = vec![
        banner(format!("Shared types for partition '{}'.", p.name)),
        banner("Status and mode value types"),
        CDecl::TypeDef {
            name: format!("{prefix}_StatusType"),
            definition: CTypeDef::Alias(CType::named("unsigned char")),
        },
        CDecl::TypeDef {
            name: format!("{prefix}_ModeType"),
            definition: CTypeDef::Alias(CType::named("unsigned char")),
        },
        banner("Data types"),
    ];
    for name in collect_used_types(p) {
        let decl = p
            .model
            .data_type(&name)
            .expect("internal: used type missing from model");
        let definition = match &decl.kind {
            TypeKind::Primitive { native } => CTypeDef::Alias(CType::named(native.clone())),
            TypeKind::Record { fields } => CTypeDef::Record(
                fields
                    .iter()
                    .map(|f| CParam::new(f.name.clone(), CType::named(f.type_ref.clone())))
                    .collect(),
            ),
            TypeKind::Array { element, length } => CTypeDef::Array {
                element: CType::named(element.clone()),
                length: *length,
            },
        };
        decls.push(CDecl::TypeDef {
            name: decl.name.clone(),
            definition,
        });
    }

    // Mode constants per declaration group, one ordinal per mode plus the
    // transition sentinel.
    let mut groups: std::collections::BTreeMap<String, Vec<String>> =
        std::collections::BTreeMap::new();
    for port in &p.ports {
        if let Some(group) = &port.mode_group {
            groups
                .entry(group.name.clone())
                .or_insert_with(|| group.modes.clone());
        }
    }
    if !groups.is_empty() {
        decls.push(banner("Mode constants"));
        for (group, modes) in &groups {
            for (ordinal, mode) in modes.iter().enumerate() {
                decls.push(CDecl::Define {
                    name: mode_const(prefix, group, mode),
                    value: CExpr::Int(ordinal as i64),
                });
            }
            decls.push(CDecl::Define {
                name: format!("{}_TRANSITION_{}", upper(prefix), group),
                value: CExpr::Int(modes.len() as i64),
            });
        }
    }
    SourceUnit {
        file_name: format!("{prefix}_Type.h"),
        decls,
    }
}

// ── Task header / source ────────────────────────────────────────────────────

fn wait_all_symbol(task: &OsTask) -> String {
    format!("EVENT_MASK_{}_All", task.name)
}

fn task_header(p: &Partition) -> SourceUnit {
    let prefix = &p.config.prefix;
    let mut decls = vec![
        banner(format!("Task scheduling skeleton for partition '{}'.", p.name)),
        CDecl::Include(format!("{prefix}.h")),
        banner("Event masks"),
    ];
    for task in &p.tasks {
        for mask in &task.masks {
            decls.push(CDecl::Define {
                name: mask.symbol.clone(),
                value: CExpr::Int(mask.value as i64),
            });
        }
        decls.push(CDecl::Define {
            name: task.quit_symbol.clone(),
            value: CExpr::Int(task.quit_value as i64),
        });
        decls.push(CDecl::Define {
            name: wait_all_symbol(task),
            value: CExpr::Int(task.wait_mask() as i64),
        });
        decls.push(CDecl::Define {
            name: format!("ALARM_COUNT_{}", task.name),
            value: CExpr::Int(task.timer_count as i64),
        });
    }

    let alarm_total: usize = p.tasks.iter().map(|t| t.alarms.len()).sum();
    if alarm_total > 0 {
        decls.push(banner("Alarm configuration"));
        decls.push(CDecl::TypeDef {
            name: format!("{prefix}_AlarmConfigType"),
            definition: CTypeDef::Record(vec![
                CParam::new("eventMask", CType::named("unsigned long")),
                CParam::new("periodMs", CType::named("unsigned long")),
            ]),
        });
        decls.push(CDecl::Var {
            name: format!("{prefix}_AlarmConfig"),
            ty: CType::named(format!("{prefix}_AlarmConfigType")),
            storage: Storage::Extern,
            array_len: Some(alarm_total as u32),
            init: None,
        });
    }

    decls.push(banner("Task entry points"));
    for task in &p.tasks {
        decls.push(CDecl::FnProto(FnSignature {
            name: task.name.clone(),
            ret: CType::Void,
            params: Vec::new(),
        }));
    }

    if !p.mode_functions.is_empty() {
        decls.push(banner("Mode switch dispatch"));
        for function in &p.mode_functions {
            decls.push(CDecl::FnProto(mode_signature(prefix, function)));
        }
    }

    decls.push(banner("Wait-failure hook, provided by the integrator"));
    decls.push(CDecl::FnProto(FnSignature {
        name: format!("{prefix}_ErrorHook"),
        ret: CType::Void,
        params: vec![CParam::new("status", CType::named("StatusType"))],
    }));

    SourceUnit {
        file_name: format!("{prefix}_Task.h"),
        decls,
    }
}

fn task_source(p: &Partition) -> SourceUnit {
    let prefix = &p.config.prefix;
    let mut decls = vec![
        banner(format!("Generated task bodies for partition '{}'.", p.name)),
        CDecl::Include("Os.h".to_string()),
        CDecl::Include(format!("{prefix}_Task.h")),
    ];

    let alarms: Vec<CExpr> = p
        .tasks
        .iter()
        .flat_map(|t| t.alarms.iter())
        .map(|a| {
            CExpr::InitList(vec![
                CExpr::ident(a.mask_symbol.clone()),
                CExpr::Int(a.period_ms as i64),
            ])
        })
        .collect();
    if !alarms.is_empty() {
        decls.push(banner("Alarm configuration table"));
        decls.push(CDecl::Var {
            name: format!("{prefix}_AlarmConfig"),
            ty: CType::named(format!("{prefix}_AlarmConfigType")),
            storage: Storage::None,
            array_len: Some(alarms.len() as u32),
            init: Some(CExpr::InitList(alarms)),
        });
    }

    let shadows: Vec<CDecl> = p
        .storage
        .iter()
        .filter(|c| c.kind == CellKind::ModeShadow)
        .map(|cell| CDecl::Var {
            name: cell.symbol.clone(),
            ty: CType::named(cell.type_name.clone()),
            storage: Storage::Static,
            array_len: None,
            init: cell.init.as_deref().map(init_expr),
        })
        .collect();
    if !shadows.is_empty() {
        decls.push(banner("Previous-mode shadow storage"));
        decls.extend(shadows);
    }

    if !p.mode_functions.is_empty() {
        decls.push(banner("Mode switch dispatch"));
        for function in &p.mode_functions {
            decls.push(CDecl::FnDef {
                sig: mode_signature(prefix, function),
                body: mode_body(prefix, function),
            });
        }
    }

    decls.push(banner("Task bodies"));
    for task in &p.tasks {
        decls.push(CDecl::FnDef {
            sig: FnSignature {
                name: task.name.clone(),
                ret: CType::Void,
                params: Vec::new(),
            },
            body: task_body(p, task),
        });
    }

    SourceUnit {
        file_name: format!("{prefix}_Task.c"),
        decls,
    }
}

fn mode_signature(prefix: &str, function: &ModeSwitchFunction) -> FnSignature {
    FnSignature {
        name: function.name.clone(),
        ret: CType::Void,
        params: vec![CParam::new("next", CType::named(format!("{prefix}_ModeType")))],
    }
}

/// One `if`/`else if` chain comparing previous vs. new mode value, one
/// branch per distinct callback, then the shadow update.
fn mode_body(prefix: &str, function: &ModeSwitchFunction) -> Vec<CStmt> {
    let prev = CExpr::ident(function.shadow_symbol.clone());
    let next = CExpr::ident("next");
    let branches = function
        .branches
        .iter()
        .map(|branch| {
            let constant = CExpr::ident(mode_const(prefix, &branch.declaration, &branch.mode));
            let cond = match branch.activation {
                ModeActivation::OnEntry => CExpr::bin(
                    CBinOp::And,
                    CExpr::bin(CBinOp::Ne, prev.clone(), constant.clone()),
                    CExpr::bin(CBinOp::Eq, next.clone(), constant),
                ),
                ModeActivation::OnExit => CExpr::bin(
                    CBinOp::And,
                    CExpr::bin(CBinOp::Eq, prev.clone(), constant.clone()),
                    CExpr::bin(CBinOp::Ne, next.clone(), constant),
                ),
            };
            let body = branch
                .calls
                .iter()
                .map(|call| {
                    CStmt::Expr(CExpr::call(
                        "SetEvent",
                        vec![
                            CExpr::ident(call.task.clone()),
                            CExpr::ident(call.mask_symbol.clone()),
                        ],
                    ))
                })
                .collect();
            CondBranch { cond, body }
        })
        .collect();
    vec![
        CStmt::If {
            branches,
            else_body: None,
        },
        CStmt::Assign {
            target: prev,
            value: next,
        },
    ]
}

/// Waiting -> Dispatching -> Waiting loop; quit is terminal, wait failures
/// are reported and the task keeps waiting.
fn task_body(p: &Partition, task: &OsTask) -> Vec<CStmt> {
    let prefix = &p.config.prefix;
    let ev = CExpr::ident("ev");

    let mut dispatch = vec![
        CStmt::Expr(CExpr::call(
            "GetEvent",
            vec![CExpr::ident(task.name.clone()), CExpr::addr_of(ev.clone())],
        )),
        CStmt::Expr(CExpr::call("ClearEvent", vec![ev.clone()])),
        CStmt::If {
            branches: vec![CondBranch {
                cond: CExpr::bin(
                    CBinOp::BitAnd,
                    ev.clone(),
                    CExpr::ident(task.quit_symbol.clone()),
                ),
                body: vec![CStmt::Break],
            }],
            else_body: None,
        },
    ];
    for branch in &task.branches {
        let triggers = branch
            .triggers
            .iter()
            .map(|t| CExpr::ident(t.clone()))
            .collect();
        let calls = branch
            .calls
            .iter()
            .map(|rid| CStmt::Expr(CExpr::call(p.runnable(*rid).symbol.clone(), Vec::new())))
            .collect();
        dispatch.push(CStmt::If {
            branches: vec![CondBranch {
                cond: CExpr::bin(CBinOp::BitAnd, ev.clone(), CExpr::fold_bit_or(triggers)),
                body: calls,
            }],
            else_body: None,
        });
    }

    vec![
        CStmt::VarDecl {
            name: "ev".to_string(),
            ty: CType::named("EventMaskType"),
            init: None,
        },
        CStmt::VarDecl {
            name: "status".to_string(),
            ty: CType::named("StatusType"),
            init: None,
        },
        CStmt::Loop(vec![
            CStmt::Assign {
                target: CExpr::ident("status"),
                value: CExpr::call("WaitEvent", vec![CExpr::ident(wait_all_symbol(task))]),
            },
            CStmt::If {
                branches: vec![CondBranch {
                    cond: CExpr::bin(CBinOp::Eq, CExpr::ident("status"), CExpr::ident("E_OK")),
                    body: dispatch,
                }],
                else_body: Some(vec![CStmt::Expr(CExpr::call(
                    format!("{prefix}_ErrorHook"),
                    vec![CExpr::ident("status")],
                ))]),
            },
        ]),
        CStmt::Expr(CExpr::call("TerminateTask", Vec::new())),
    ]
}

// ── Mock API pair ───────────────────────────────────────────────────────────

fn mock_cell(func: &PortFunction) -> String {
    format!("{}_default", func.long_name())
}

fn mock_header(p: &Partition) -> SourceUnit {
    let prefix = &p.config.prefix;
    let mut decls = vec![
        banner(format!(
            "Test-double API for partition '{}'. Link instead of {prefix}.c.",
            p.name
        )),
        CDecl::Include(format!("{prefix}.h")),
        banner("Mock default values, writable from tests"),
    ];
    for func in p.api.all_functions() {
        if let Some(data_type) = &func.data_type {
            decls.push(CDecl::Var {
                name: mock_cell(func),
                ty: CType::named(data_type.clone()),
                storage: Storage::Extern,
                array_len: None,
                init: None,
            });
        }
    }
    SourceUnit {
        file_name: format!("{prefix}_Mock.h"),
        decls,
    }
}

fn mock_source(p: &Partition) -> SourceUnit {
    let prefix = &p.config.prefix;
    let unconnected: Vec<String> = p
        .unconnected_ports()
        .map(|id| {
            let port = p.port(id);
            format!("{}.{}", p.component(port.component).name, port.name)
        })
        .collect();
    let mut decls = vec![
        banner(format!("Test-double API implementation for '{}'.", p.name)),
        CDecl::Include(format!("{prefix}_Mock.h")),
        banner(if unconnected.is_empty() {
            "Unconnected ports: none".to_string()
        } else {
            format!("Unconnected ports: {}", unconnected.join(", "))
        }),
    ];
    for func in p.api.all_functions() {
        if let Some(data_type) = &func.data_type {
            decls.push(CDecl::Var {
                name: mock_cell(func),
                ty: CType::named(data_type.clone()),
                storage: Storage::None,
                array_len: None,
                init: None,
            });
        }
    }
    decls.push(banner("Mock API"));
    for func in p.api.all_functions() {
        decls.push(CDecl::FnDef {
            sig: func.sig.clone(),
            body: mock_body(prefix, func),
        });
    }
    SourceUnit {
        file_name: format!("{prefix}_Mock.c"),
        decls,
    }
}

fn mock_body(prefix: &str, func: &PortFunction) -> Vec<CStmt> {
    let cell = mock_cell(func);
    let data_type = func.data_type.as_deref().unwrap_or("");
    match func.kind {
        ApiKind::Read | ApiKind::Receive => {
            let copy = if func.complex {
                copy_out(&cell, data_type)
            } else {
                CStmt::Assign {
                    target: CExpr::deref(CExpr::ident("data")),
                    value: CExpr::ident(cell),
                }
            };
            vec![copy, CStmt::Return(Some(status_ok(prefix)))]
        }
        ApiKind::Write | ApiKind::Send => {
            let copy = if func.complex {
                copy_in(&cell, data_type)
            } else {
                CStmt::Assign {
                    target: CExpr::ident(cell),
                    value: CExpr::ident("data"),
                }
            };
            vec![copy, CStmt::Return(Some(status_ok(prefix)))]
        }
        ApiKind::Call => vec![CStmt::Return(Some(status_ok(prefix)))],
        ApiKind::Calprm if func.complex => vec![copy_out(&cell, data_type)],
        ApiKind::Calprm => vec![CStmt::Return(Some(CExpr::ident(cell)))],
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenConfig;
    use crate::model::{
        AccessPoint, BehaviorDecl, DataTypeDecl, ElementDecl, EventDecl, InterfaceDecl, Model,
        PortDecl, PortDirectionDecl, RunnableDecl, TypeKind,
    };

    fn speed_model() -> Model {
        Model {
            data_types: vec![DataTypeDecl {
                name: "uint16".to_string(),
                kind: TypeKind::Primitive {
                    native: "unsigned short".to_string(),
                },
            }],
            interfaces: vec![InterfaceDecl::SenderReceiver {
                name: "Speed_I".to_string(),
                elements: vec![ElementDecl {
                    name: "Speed".to_string(),
                    type_ref: "uint16".to_string(),
                    queued: false,
                    init: Some("0".to_string()),
                }],
            }],
        }
    }

    fn twin_runnable_component() -> crate::model::ComponentDecl {
        crate::model::ComponentDecl {
            name: "Worker".to_string(),
            ports: vec![PortDecl {
                name: "Speed".to_string(),
                direction: PortDirectionDecl::Provide,
                interface: "Speed_I".to_string(),
            }],
            behavior: BehaviorDecl {
                runnables: vec![
                    RunnableDecl {
                        name: "StepA".to_string(),
                        symbol: "Worker_StepA".to_string(),
                        data_receive_points: Vec::new(),
                        data_send_points: vec![AccessPoint {
                            port: "Speed".to_string(),
                            element: "Speed".to_string(),
                        }],
                        server_call_points: Vec::new(),
                        parameter_access_points: Vec::new(),
                    },
                    RunnableDecl {
                        name: "StepB".to_string(),
                        symbol: "Worker_StepB".to_string(),
                        data_receive_points: Vec::new(),
                        data_send_points: Vec::new(),
                        server_call_points: Vec::new(),
                        parameter_access_points: Vec::new(),
                    },
                ],
                events: vec![
                    EventDecl::Timer {
                        name: "T10".to_string(),
                        period_ms: 10,
                        runnable: "StepA".to_string(),
                    },
                    EventDecl::Timer {
                        name: "T10".to_string(),
                        period_ms: 10,
                        runnable: "StepB".to_string(),
                    },
                ],
            },
        }
    }

    fn finalized_partition() -> crate::partition::Partition {
        let mut p =
            crate::partition::Partition::new("App", speed_model(), GenConfig::default());
        p.add_component(&twin_runnable_component()).unwrap();
        p.auto_connect();
        p.finalize().unwrap();
        p
    }

    #[test]
    fn unit_order_is_fixed() {
        let p = finalized_partition();
        let artifacts = generate(&p);
        let names: Vec<&str> = artifacts.units.iter().map(|u| u.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Rte.h",
                "Rte.c",
                "Rte_Worker.h",
                "Rte_Type.h",
                "Rte_Task.h",
                "Rte_Task.c"
            ]
        );
    }

    #[test]
    fn shared_trigger_emits_one_dispatch_block() {
        let p = finalized_partition();
        let artifacts = generate(&p);
        let task_c = artifacts.unit("Rte_Task.c").unwrap();

        let task_fn = task_c
            .decls
            .iter()
            .find_map(|d| match d {
                CDecl::FnDef { sig, body } if sig.name == "App_Task" => Some(body),
                _ => None,
            })
            .expect("task body missing");

        // Loop -> If(E_OK) -> dispatch: quit check plus exactly one trigger
        // block containing two sequential calls.
        let dispatch = match &task_fn[2] {
            CStmt::Loop(stmts) => match &stmts[1] {
                CStmt::If { branches, .. } => &branches[0].body,
                other => panic!("expected status check, got: {other:?}"),
            },
            other => panic!("expected task loop, got: {other:?}"),
        };
        let trigger_blocks: Vec<&CondBranch> = dispatch
            .iter()
            .skip(3)
            .filter_map(|s| match s {
                CStmt::If { branches, .. } => Some(&branches[0]),
                _ => None,
            })
            .collect();
        assert_eq!(trigger_blocks.len(), 1);
        assert_eq!(trigger_blocks[0].body.len(), 2);
    }

    #[test]
    fn storage_cell_emitted_once() {
        let p = finalized_partition();
        let artifacts = generate(&p);
        let source = artifacts.unit("Rte.c").unwrap();
        let cells: Vec<&str> = source
            .decls
            .iter()
            .filter_map(|d| match d {
                CDecl::Var { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(cells, vec!["Worker_Speed_Speed"]);
    }

    #[test]
    fn component_header_aliases_short_names() {
        let p = finalized_partition();
        let artifacts = generate(&p);
        let header = artifacts.unit("Rte_Worker.h").unwrap();
        assert!(header.decls.iter().any(|d| matches!(
            d,
            CDecl::SymbolAlias { alias, target }
                if alias == "Rte_Write_Speed_Speed" && target == "Rte_Write_Worker_Speed_Speed"
        )));
    }

    #[test]
    fn event_masks_defined_in_task_header() {
        let p = finalized_partition();
        let artifacts = generate(&p);
        let header = artifacts.unit("Rte_Task.h").unwrap();
        let defines: Vec<(&str, &CExpr)> = header
            .decls
            .iter()
            .filter_map(|d| match d {
                CDecl::Define { name, value } => Some((name.as_str(), value)),
                _ => None,
            })
            .collect();
        assert!(defines
            .iter()
            .any(|(n, v)| *n == "EVENT_MASK_App_Task_T10" && **v == CExpr::Int(1)));
        assert!(defines
            .iter()
            .any(|(n, v)| *n == "EVENT_MASK_App_Task_Quit" && **v == CExpr::Int(2)));
    }

    #[test]
    fn mock_pair_emitted_when_configured() {
        let mut p = crate::partition::Partition::new(
            "App",
            speed_model(),
            GenConfig {
                mock_api: true,
                ..GenConfig::default()
            },
        );
        p.add_component(&twin_runnable_component()).unwrap();
        p.finalize().unwrap();
        let artifacts = generate(&p);
        assert!(artifacts.unit("Rte_Mock.h").is_some());
        let mock_c = artifacts.unit("Rte_Mock.c").unwrap();
        // The unconnected provide port shows up in the stub listing.
        assert!(mock_c.decls.iter().any(|d| matches!(
            d,
            CDecl::Comment(text) if text.contains("Worker.Speed")
        )));
    }

    #[test]
    fn generation_is_structurally_deterministic() {
        let a = generate(&finalized_partition());
        let b = generate(&finalized_partition());
        assert_eq!(a, b);
        assert_eq!(a.to_json(), b.to_json());
    }
}
