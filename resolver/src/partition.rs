// partition.rs — Partition state and resolution pipeline
//
// Holds the resolved arenas (components, ports, runnables, events) plus the
// cross-component artifacts (storage arena, client API registry, mode
// dispatch functions, task schedules) and runs the fixed resolution
// pipeline over them.
//
// Preconditions: components are added, and connectors resolved, before
//                `finalize()`.
// Postconditions: after `finalize()` the model is locked and read-only;
//                 emitters consume it as-is.
// Failure modes: any resolution error aborts the whole partition build.
// Side effects: none beyond tracing events.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::api::{self, AccessTarget, ApiKind, ClientApiRegistry, PortFunction};
use crate::cdecl::{CParam, CType, FnSignature};
use crate::component::{
    build_event, build_runnable, Component, DataRef, Event, OperationRef, Runnable,
};
use crate::config::GenConfig;
use crate::connector;
use crate::emit::{self, GeneratedArtifacts};
use crate::error::ResolveError;
use crate::id::{ComponentId, IdAllocator, PortId, RunnableId};
use crate::model::{ArgDirection, ComponentDecl, Model};
use crate::mode::{self, ModeSwitchFunction};
use crate::port::{self, DataElement, Operation, Port};
use crate::schedule::{self, OsTask};
use crate::storage::{cell_symbol, CellKind, StorageArena, StorageCell};

// ── Provenance ──────────────────────────────────────────────────────────────

/// Fingerprints for hermetic builds and cache-key use.
///
/// `model_hash`: SHA-256 of the canonical compact model JSON.
/// `config_hash`: SHA-256 of the canonical compact config JSON.
/// `generator_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub model_hash: [u8; 32],
    pub config_hash: [u8; 32],
    pub generator_version: &'static str,
}

impl Provenance {
    /// Hex string of the model hash (64 characters).
    pub fn model_hash_hex(&self) -> String {
        bytes_to_hex(&self.model_hash)
    }

    /// Hex string of the config hash (64 characters).
    pub fn config_hash_hex(&self) -> String {
        bytes_to_hex(&self.config_hash)
    }

    /// Serialize provenance as a JSON string for build-info emission.
    pub fn to_json(&self) -> String {
        format!(
            "{{\n  \"model_hash\": \"{}\",\n  \"config_hash\": \"{}\",\n  \"manifest_schema_version\": 1,\n  \"generator_version\": \"{}\"\n}}\n",
            self.model_hash_hex(),
            self.config_hash_hex(),
            self.generator_version,
        )
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(data: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Compute fingerprints from the canonical JSON forms, so the result is
/// stable independent of display formatting.
pub fn compute_provenance(model: &Model, config: &GenConfig) -> Provenance {
    Provenance {
        model_hash: sha256(&model.canonical_json()),
        config_hash: sha256(&config.canonical_json()),
        generator_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Partition ───────────────────────────────────────────────────────────────

/// The resolved runtime composition of components scheduled together.
pub struct Partition {
    pub name: String,
    pub model: Model,
    pub config: GenConfig,
    ids: IdAllocator,
    pub components: Vec<Component>,
    pub ports: Vec<Port>,
    pub runnables: Vec<Runnable>,
    pub events: Vec<Event>,
    pub storage: StorageArena,
    pub api: ClientApiRegistry,
    pub mode_functions: Vec<ModeSwitchFunction>,
    pub tasks: Vec<OsTask>,
    finalized: bool,
    provenance: Option<Provenance>,
}

impl Partition {
    pub fn new(name: impl Into<String>, model: Model, config: GenConfig) -> Self {
        Partition {
            name: name.into(),
            model,
            config,
            ids: IdAllocator::new(),
            components: Vec::new(),
            ports: Vec::new(),
            runnables: Vec::new(),
            events: Vec::new(),
            storage: StorageArena::new(),
            api: ClientApiRegistry::new(),
            mode_functions: Vec::new(),
            tasks: Vec::new(),
            finalized: false,
            provenance: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Available after `finalize()`.
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.index()]
    }

    pub fn runnable(&self, id: RunnableId) -> &Runnable {
        &self.runnables[id.index()]
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.index()]
    }

    // ── Component registration ──────────────────────────────────────────

    /// Build the component's ports, runnables, and events and add it to the
    /// partition. Must be called before `finalize()`.
    pub fn add_component(&mut self, decl: &ComponentDecl) -> Result<ComponentId, ResolveError> {
        debug_assert!(!self.finalized, "add_component after finalize");

        if self.components.iter().any(|c| c.name == decl.name) {
            return Err(ResolveError::DuplicateDefinition {
                kind: "component",
                name: decl.name.clone(),
            });
        }

        let component = self.ids.alloc_component();

        let mut port_ids = Vec::with_capacity(decl.ports.len());
        for port_decl in &decl.ports {
            if decl.ports.iter().filter(|p| p.name == port_decl.name).count() > 1 {
                return Err(ResolveError::DuplicateDefinition {
                    kind: "port",
                    name: format!("{}.{}", decl.name, port_decl.name),
                });
            }
            let id = self.ids.alloc_port();
            let port = port::build_port(&self.model, component, &decl.name, id, port_decl)?;
            port_ids.push(id);
            self.ports.push(port);
        }

        let mut runnable_ids = Vec::with_capacity(decl.behavior.runnables.len());
        for runnable_decl in &decl.behavior.runnables {
            if decl
                .behavior
                .runnables
                .iter()
                .filter(|r| r.name == runnable_decl.name)
                .count()
                > 1
            {
                return Err(ResolveError::DuplicateDefinition {
                    kind: "runnable",
                    name: format!("{}.{}", decl.name, runnable_decl.name),
                });
            }
            let id = self.ids.alloc_runnable();
            let runnable = build_runnable(
                &self.ports,
                component,
                &port_ids,
                &decl.name,
                id,
                runnable_decl,
            )?;
            runnable_ids.push(id);
            self.runnables.push(runnable);
        }

        let mut event_ids = Vec::with_capacity(decl.behavior.events.len());
        for event_decl in &decl.behavior.events {
            let id = self.ids.alloc_event();
            let event = build_event(
                &self.ports,
                &self.runnables,
                component,
                &port_ids,
                &runnable_ids,
                &decl.name,
                id,
                event_decl,
            )?;
            event_ids.push(id);
            self.events.push(event);
        }

        debug!(
            component = %decl.name,
            ports = port_ids.len(),
            runnables = runnable_ids.len(),
            events = event_ids.len(),
            "component added"
        );

        self.components.push(Component {
            id: component,
            name: decl.name.clone(),
            ports: port_ids,
            runnables: runnable_ids,
            events: event_ids,
            api_refs: Vec::new(),
        });
        Ok(component)
    }

    // ── Connectors ──────────────────────────────────────────────────────

    fn find_port_id(&self, component: &str, port: &str) -> Result<PortId, ResolveError> {
        let comp = self
            .components
            .iter()
            .find(|c| c.name == component)
            .ok_or_else(|| ResolveError::ModelReference {
                kind: "component",
                name: component.to_string(),
                context: "connector reference".to_string(),
            })?;
        crate::component::find_port(&self.ports, &comp.ports, port)
            .map(|p| p.id)
            .ok_or_else(|| ResolveError::ModelReference {
                kind: "port",
                name: format!("{component}.{port}"),
                context: "connector reference".to_string(),
            })
    }

    /// Explicitly connect two ports given as `(component, port)` references.
    pub fn connect(
        &mut self,
        a: (&str, &str),
        b: (&str, &str),
    ) -> Result<(), ResolveError> {
        let pa = self.find_port_id(a.0, a.1)?;
        let pb = self.find_port_id(b.0, b.1)?;
        connector::connect(&mut self.ports, &self.components, pa, pb)
    }

    /// Connect all unconnected require ports by interface identity and port
    /// name, in declaration order.
    pub fn auto_connect(&mut self) {
        connector::auto_connect(&mut self.ports);
    }

    /// All ports with zero connectors, lazily.
    pub fn unconnected_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        connector::unconnected_ports(&self.ports)
    }

    // ── Finalization pipeline ───────────────────────────────────────────

    /// Run the fixed resolution pipeline and lock the model. Guarded by the
    /// finalized flag: repeat calls are no-ops.
    pub fn finalize(&mut self) -> Result<(), ResolveError> {
        if self.finalized {
            return Ok(());
        }

        debug!(partition = %self.name, "finalize: port access");
        for index in 0..self.components.len() {
            self.process_port_access(index)?;
        }

        debug!(partition = %self.name, "finalize: storage aliasing");
        crate::storage::alias_connected(
            &self.ports,
            &self.components,
            &self.config,
            &mut self.storage,
            &mut self.api,
        );

        debug!(partition = %self.name, "finalize: mode aggregation");
        let (task_names, event_tasks) =
            schedule::assign_tasks(&self.config, &self.name, &self.events);
        self.mode_functions = mode::aggregate(
            &self.events,
            &self.ports,
            &task_names,
            &event_tasks,
            &self.config.prefix,
            &mut self.storage,
        );

        debug!(partition = %self.name, "finalize: task schedules");
        self.tasks =
            schedule::build_tasks(&task_names, &event_tasks, &self.events, &self.runnables)?;

        self.api.finalize();
        self.provenance = Some(compute_provenance(&self.model, &self.config));
        self.finalized = true;
        debug!(
            partition = %self.name,
            cells = self.storage.len(),
            tasks = self.tasks.len(),
            "finalize complete"
        );
        Ok(())
    }

    /// Emit the artifact plan. Precondition: the partition is finalized.
    pub fn generate(&self) -> GeneratedArtifacts {
        assert!(self.finalized, "generate before finalize");
        emit::generate(self)
    }

    // ── Port access processing ──────────────────────────────────────────

    fn process_port_access(&mut self, component_index: usize) -> Result<(), ResolveError> {
        let runnable_ids = self.components[component_index].runnables.clone();
        for rid in runnable_ids {
            let receives = self.runnables[rid.index()].data_receive_points.clone();
            for point in receives {
                self.register_data_access(component_index, point, AccessSide::Receive)?;
            }
            let sends = self.runnables[rid.index()].data_send_points.clone();
            for point in sends {
                self.register_data_access(component_index, point, AccessSide::Send)?;
            }
            let calls = self.runnables[rid.index()].server_call_points.clone();
            for point in calls {
                self.register_server_call(component_index, point)?;
            }
            let parameters = self.runnables[rid.index()].parameter_access_points.clone();
            for point in parameters {
                self.register_data_access(component_index, point, AccessSide::Parameter)?;
            }
        }
        Ok(())
    }

    fn register_data_access(
        &mut self,
        component_index: usize,
        point: DataRef,
        side: AccessSide,
    ) -> Result<(), ResolveError> {
        let prefix = self.config.prefix.clone();
        let port = &self.ports[point.port.index()];
        let element = &port.elements[point.element];
        let component_name = self.components[component_index].name.as_str();

        let kind = match side {
            AccessSide::Receive if element.queued => ApiKind::Receive,
            AccessSide::Receive => ApiKind::Read,
            AccessSide::Send if element.queued => ApiKind::Send,
            AccessSide::Send => ApiKind::Write,
            AccessSide::Parameter => ApiKind::Calprm,
        };
        let short = api::short_name(&prefix, kind, &port.name, &element.name);
        let long = api::long_name(&prefix, kind, component_name, &port.name, &element.name);
        let symbol = cell_symbol(component_name, &port.name, &element.name);
        let sig = match kind {
            ApiKind::Calprm => calprm_signature(&prefix, long, element),
            _ => data_access_signature(&prefix, kind, long, element),
        };
        let cell = StorageCell {
            symbol: symbol.clone(),
            type_name: element.type_name.clone(),
            complex: element.complex,
            init: element.init.clone(),
            kind: if side == AccessSide::Parameter {
                CellKind::Parameter
            } else {
                CellKind::Signal
            },
        };
        let func = PortFunction {
            kind,
            short_name: short.clone(),
            component: component_name.to_string(),
            port_name: port.name.clone(),
            item: element.name.clone(),
            data_type: Some(element.type_name.clone()),
            complex: element.complex,
            sig,
            target: AccessTarget::Cell { symbol },
        };

        self.storage.insert(cell);
        self.api.register(func)?;
        self.components[component_index].record_api_ref(kind, &short);
        Ok(())
    }

    fn register_server_call(
        &mut self,
        component_index: usize,
        point: OperationRef,
    ) -> Result<(), ResolveError> {
        let prefix = self.config.prefix.clone();
        let port = &self.ports[point.port.index()];
        let operation = &port.operations[point.operation];
        let component_name = self.components[component_index].name.as_str();

        let target = match port.connectors.first() {
            None => AccessTarget::Stub,
            Some(peer) => {
                let server_port = &self.ports[peer.index()];
                let candidates: Vec<RunnableId> = self
                    .events
                    .iter()
                    .filter_map(|e| match e {
                        Event::OperationInvoked {
                            port: p,
                            operation: o,
                            runnable,
                            ..
                        } if *p == server_port.id && *o == point.operation => Some(*runnable),
                        _ => None,
                    })
                    .collect();
                match candidates.as_slice() {
                    [] => {
                        return Err(ResolveError::ModelReference {
                            kind: "server runnable",
                            name: operation.name.clone(),
                            context: format!(
                                "server call from component '{}' via port '{}'",
                                component_name, port.name
                            ),
                        })
                    }
                    [server] => AccessTarget::ServerCall {
                        symbol: self.runnables[server.index()].symbol.clone(),
                    },
                    many => {
                        return Err(ResolveError::AmbiguousServer {
                            operation: operation.name.clone(),
                            port: port.name.clone(),
                            count: many.len(),
                        })
                    }
                }
            }
        };

        let kind = ApiKind::Call;
        let short = api::short_name(&prefix, kind, &port.name, &operation.name);
        let long = api::long_name(&prefix, kind, component_name, &port.name, &operation.name);
        let sig = call_signature(&prefix, long, operation);
        let func = PortFunction {
            kind,
            short_name: short.clone(),
            component: component_name.to_string(),
            port_name: port.name.clone(),
            item: operation.name.clone(),
            data_type: None,
            complex: false,
            sig,
            target,
        };

        self.api.register(func)?;
        self.components[component_index].record_api_ref(kind, &short);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessSide {
    Receive,
    Send,
    Parameter,
}

// ── Signature synthesis ─────────────────────────────────────────────────────

fn status_type(prefix: &str) -> CType {
    CType::named(format!("{prefix}_StatusType"))
}

/// Read/Receive take an out pointer; Write/Send take the value, or a const
/// pointer for complex signals.
fn data_access_signature(
    prefix: &str,
    kind: ApiKind,
    long_name: String,
    element: &DataElement,
) -> FnSignature {
    let param = match kind {
        ApiKind::Read | ApiKind::Receive => {
            CParam::new("data", CType::pointer_to(element.type_name.clone()))
        }
        _ if element.complex => {
            CParam::new("data", CType::const_pointer_to(element.type_name.clone()))
        }
        _ => CParam::new("data", CType::named(element.type_name.clone())),
    };
    FnSignature {
        name: long_name,
        ret: status_type(prefix),
        params: vec![param],
    }
}

/// Scalar parameters are returned by value; complex ones are copied out.
fn calprm_signature(_prefix: &str, long_name: String, element: &DataElement) -> FnSignature {
    if element.complex {
        FnSignature {
            name: long_name,
            ret: CType::Void,
            params: vec![CParam::new(
                "data",
                CType::pointer_to(element.type_name.clone()),
            )],
        }
    } else {
        FnSignature {
            name: long_name,
            ret: CType::named(element.type_name.clone()),
            params: Vec::new(),
        }
    }
}

fn call_signature(prefix: &str, long_name: String, operation: &Operation) -> FnSignature {
    let params = operation
        .arguments
        .iter()
        .map(|arg| {
            let ty = match arg.direction {
                ArgDirection::In if arg.complex => {
                    CType::const_pointer_to(arg.type_name.clone())
                }
                ArgDirection::In => CType::named(arg.type_name.clone()),
                ArgDirection::Out | ArgDirection::InOut => {
                    CType::pointer_to(arg.type_name.clone())
                }
            };
            CParam::new(arg.name.clone(), ty)
        })
        .collect();
    FnSignature {
        name: long_name,
        ret: status_type(prefix),
        params,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
