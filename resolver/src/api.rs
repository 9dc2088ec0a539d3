// api.rs — Client API registry
//
// A per-category map from deduplicated short name to function descriptor.
// Registration is idempotent by short name (first registration wins);
// `finalize()` converts each category into a sorted immutable sequence
// ordered by short name, independent of registration order. That sort is
// what makes repeated resolutions of the same model emit identically.
//
// Preconditions: descriptors carry fully built signatures.
// Postconditions: after finalize, category listings are sorted and stable.
// Failure modes: one short name derived from conflicting port/element
//                constituents.
// Side effects: none.

use std::collections::HashMap;

use crate::cdecl::FnSignature;
use crate::error::ResolveError;

// ── Categories ──────────────────────────────────────────────────────────────

/// Closed set of client API categories, in fixed emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKind {
    Read,
    Write,
    Send,
    Receive,
    Call,
    Calprm,
}

impl ApiKind {
    /// Emission order of `all_functions()`.
    pub const ALL: [ApiKind; 6] = [
        ApiKind::Read,
        ApiKind::Write,
        ApiKind::Send,
        ApiKind::Receive,
        ApiKind::Call,
        ApiKind::Calprm,
    ];

    /// Category token used in generated function names.
    pub fn token(self) -> &'static str {
        match self {
            ApiKind::Read => "Read",
            ApiKind::Write => "Write",
            ApiKind::Send => "Send",
            ApiKind::Receive => "Receive",
            ApiKind::Call => "Call",
            ApiKind::Calprm => "Calprm",
        }
    }

    fn index(self) -> usize {
        match self {
            ApiKind::Read => 0,
            ApiKind::Write => 1,
            ApiKind::Send => 2,
            ApiKind::Receive => 3,
            ApiKind::Call => 4,
            ApiKind::Calprm => 5,
        }
    }
}

// ── Naming contract ─────────────────────────────────────────────────────────

/// `<prefix>_<Category>_<Port>_<Element|Operation>`
pub fn short_name(prefix: &str, kind: ApiKind, port: &str, item: &str) -> String {
    format!("{}_{}_{}_{}", prefix, kind.token(), port, item)
}

/// `<prefix>_<Category>_<Component>_<Port>_<Element|Operation>`
pub fn long_name(prefix: &str, kind: ApiKind, component: &str, port: &str, item: &str) -> String {
    format!("{}_{}_{}_{}_{}", prefix, kind.token(), component, port, item)
}

// ── Descriptors ─────────────────────────────────────────────────────────────

/// What a generated function body reads or writes.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessTarget {
    /// A named cell in the shared storage arena.
    Cell { symbol: String },
    /// A generated call-based accessor (communication-boundary override).
    Accessor { symbol: String },
    /// Direct invocation of a resolved server runnable.
    ServerCall { symbol: String },
    /// No resolved peer; the body reports the unconnected status.
    Stub,
}

/// One client API function descriptor.
#[derive(Debug, Clone)]
pub struct PortFunction {
    pub kind: ApiKind,
    pub short_name: String,
    pub component: String,
    pub port_name: String,
    pub item: String,
    /// Element type for data access functions; `None` for calls.
    pub data_type: Option<String>,
    pub complex: bool,
    /// Full signature; `sig.name` is the long name.
    pub sig: FnSignature,
    pub target: AccessTarget,
}

impl PortFunction {
    pub fn long_name(&self) -> &str {
        &self.sig.name
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

pub struct ClientApiRegistry {
    pending: Vec<HashMap<String, PortFunction>>,
    sorted: Vec<Vec<PortFunction>>,
    finalized: bool,
}

impl Default for ClientApiRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientApiRegistry {
    pub fn new() -> Self {
        ClientApiRegistry {
            pending: (0..ApiKind::ALL.len()).map(|_| HashMap::new()).collect(),
            sorted: (0..ApiKind::ALL.len()).map(|_| Vec::new()).collect(),
            finalized: false,
        }
    }

    /// Register a function descriptor. Re-registering an existing short name
    /// with the same port/element constituents is a no-op; the same short
    /// name derived from different constituents is a hard failure.
    pub fn register(&mut self, func: PortFunction) -> Result<(), ResolveError> {
        debug_assert!(!self.finalized, "registration after finalize");
        let slot = &mut self.pending[func.kind.index()];
        if let Some(existing) = slot.get(&func.short_name) {
            if existing.port_name == func.port_name && existing.item == func.item {
                return Ok(());
            }
            return Err(ResolveError::DuplicateDefinition {
                kind: "client API short name",
                name: func.short_name,
            });
        }
        slot.insert(func.short_name.clone(), func);
        Ok(())
    }

    /// Rebind the access target of a registered function, if present.
    /// Used by storage aliasing after connector resolution.
    pub fn retarget(&mut self, kind: ApiKind, short_name: &str, target: AccessTarget) {
        if let Some(func) = self.pending[kind.index()].get_mut(short_name) {
            func.target = target;
        }
    }

    /// Sort each category by short name. Guarded: repeat calls are no-ops.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        for (index, slot) in self.pending.iter_mut().enumerate() {
            let mut funcs: Vec<PortFunction> = slot.drain().map(|(_, f)| f).collect();
            funcs.sort_by(|a, b| a.short_name.cmp(&b.short_name));
            self.sorted[index] = funcs;
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Sorted listing of one category. Empty before finalize.
    pub fn functions(&self, kind: ApiKind) -> &[PortFunction] {
        &self.sorted[kind.index()]
    }

    /// All categories in declared order, each sorted by short name (P7).
    pub fn all_functions(&self) -> impl Iterator<Item = &PortFunction> {
        ApiKind::ALL.iter().flat_map(|k| self.functions(*k).iter())
    }

    /// Look up a function by short name, before or after finalize.
    pub fn lookup(&self, kind: ApiKind, short_name: &str) -> Option<&PortFunction> {
        if self.finalized {
            let funcs = self.functions(kind);
            funcs
                .binary_search_by(|f| f.short_name.as_str().cmp(short_name))
                .ok()
                .map(|i| &funcs[i])
        } else {
            self.pending[kind.index()].get(short_name)
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
