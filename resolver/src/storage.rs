// storage.rs — Shared storage arena and signal aliasing
//
// All process-wide named cells the generated code declares (shared signal
// buffers, calibration parameters, previous-mode shadows) live in one arena
// addressed by a stable string key and iterated in key order.
//
// The aliasing pass runs after connectors exist: for every provide port it
// visits the connected require ports and rebinds each require-side access
// function onto the provide side's cell, so the table holds exactly one
// entry per logical signal no matter how many require ports observe it.
// The one exception is a provide side owned by a communication-boundary
// component: its symbol is removed from the table and replaced by a
// call-based accessor.
//
// Preconditions: connectors are resolved; per-component port access has
//                been processed (provisional cells and functions exist).
// Postconditions: one cell per logical signal (P4); require-side functions
//                 target the canonical cell or a boundary accessor.
// Side effects: mutates the arena and retargets registry functions.

use std::collections::BTreeMap;

use crate::api::{short_name, AccessTarget, ApiKind, ClientApiRegistry};
use crate::component::Component;
use crate::config::GenConfig;
use crate::port::{Port, PortDirection, PortKind};

// ── Arena ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// A sender/receiver signal buffer.
    Signal,
    /// A calibration parameter value.
    Parameter,
    /// A previous-mode shadow owned by a mode-switch dispatch function.
    ModeShadow,
}

#[derive(Debug, Clone)]
pub struct StorageCell {
    pub symbol: String,
    pub type_name: String,
    pub complex: bool,
    pub init: Option<String>,
    pub kind: CellKind,
}

/// Arena of named storage, created once, referenced by many call sites.
#[derive(Debug, Default)]
pub struct StorageArena {
    cells: BTreeMap<String, StorageCell>,
}

impl StorageArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell unless the symbol is already present. Returns whether
    /// the cell was inserted.
    pub fn insert(&mut self, cell: StorageCell) -> bool {
        if self.cells.contains_key(&cell.symbol) {
            return false;
        }
        self.cells.insert(cell.symbol.clone(), cell);
        true
    }

    pub fn remove(&mut self, symbol: &str) -> Option<StorageCell> {
        self.cells.remove(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.cells.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&StorageCell> {
        self.cells.get(symbol)
    }

    /// Cells in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = &StorageCell> {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Canonical storage symbol for one signal.
pub fn cell_symbol(component: &str, port: &str, element: &str) -> String {
    format!("{component}_{port}_{element}")
}

/// Call-based accessor symbol for a boundary-provided signal, per direction.
pub fn accessor_symbol(prefix: &str, kind: ApiKind, component: &str, port: &str, element: &str) -> String {
    let verb = match kind {
        ApiKind::Read | ApiKind::Receive => "ComReceive",
        _ => "ComSend",
    };
    format!("{prefix}_{verb}_{component}_{port}_{element}")
}

// ── Aliasing pass ───────────────────────────────────────────────────────────

/// Collapse require-side readers onto the provide-side cell for every
/// resolved connector, applying the communication-boundary override.
pub fn alias_connected(
    ports: &[Port],
    components: &[Component],
    cfg: &GenConfig,
    storage: &mut StorageArena,
    api: &mut ClientApiRegistry,
) {
    for port in ports {
        if port.direction != PortDirection::Provide
            || port.kind != PortKind::SenderReceiver
            || !port.is_connected()
        {
            continue;
        }
        let provider = components[port.component.index()].name.as_str();
        let boundary = cfg.is_boundary(provider);

        for element in &port.elements {
            let provide_sym = cell_symbol(provider, &port.name, &element.name);
            let send_kind = if element.queued {
                ApiKind::Send
            } else {
                ApiKind::Write
            };
            let receive_kind = if element.queued {
                ApiKind::Receive
            } else {
                ApiKind::Read
            };

            if boundary {
                // Inter-ECU link: no shared cell, both sides go through
                // generated accessors.
                storage.remove(&provide_sym);
                api.retarget(
                    send_kind,
                    &short_name(&cfg.prefix, send_kind, &port.name, &element.name),
                    AccessTarget::Accessor {
                        symbol: accessor_symbol(
                            &cfg.prefix,
                            send_kind,
                            provider,
                            &port.name,
                            &element.name,
                        ),
                    },
                );
            } else {
                // The provider may never access its own signal; the cell
                // still has to exist for the readers.
                storage.insert(StorageCell {
                    symbol: provide_sym.clone(),
                    type_name: element.type_name.clone(),
                    complex: element.complex,
                    init: element.init.clone(),
                    kind: CellKind::Signal,
                });
            }

            for peer in &port.connectors {
                let require = &ports[peer.index()];
                let consumer = components[require.component.index()].name.as_str();
                storage.remove(&cell_symbol(consumer, &require.name, &element.name));

                let target = if boundary {
                    AccessTarget::Accessor {
                        symbol: accessor_symbol(
                            &cfg.prefix,
                            receive_kind,
                            provider,
                            &port.name,
                            &element.name,
                        ),
                    }
                } else {
                    AccessTarget::Cell {
                        symbol: provide_sym.clone(),
                    }
                };
                api.retarget(
                    receive_kind,
                    &short_name(&cfg.prefix, receive_kind, &require.name, &element.name),
                    target,
                );
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
