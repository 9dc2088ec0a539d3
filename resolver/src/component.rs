// component.rs — Component wrapper: runnables and triggering events
//
// Binds one component description to its derived ports, runnables, and
// events. Runnable access points and event targets are resolved to arena
// handles here, once, when the component is added to a partition.
//
// Preconditions: the component's ports are already built and pushed into the
//                shared port arena.
// Failure modes: dangling runnable/port/element/operation references,
//                unsupported activation tokens.
// Side effects: none.

use crate::api::ApiKind;
use crate::error::ResolveError;
use crate::id::{ComponentId, EventId, PortId, RunnableId};
use crate::model::{EventDecl, RunnableDecl};
use crate::port::{Port, PortDirection, PortKind};

// ── Resolved component model ────────────────────────────────────────────────

#[derive(Debug)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    pub ports: Vec<PortId>,
    pub runnables: Vec<RunnableId>,
    pub events: Vec<EventId>,
    /// Client-API functions this component's runnables use, in first-access
    /// order. The per-component header aliases these short names.
    pub api_refs: Vec<(ApiKind, String)>,
}

impl Component {
    pub fn record_api_ref(&mut self, kind: ApiKind, short_name: &str) {
        if !self
            .api_refs
            .iter()
            .any(|(k, s)| *k == kind && s == short_name)
        {
            self.api_refs.push((kind, short_name.to_string()));
        }
    }
}

/// A runnable's access to one data element.
#[derive(Debug, Clone, Copy)]
pub struct DataRef {
    pub port: PortId,
    pub element: usize,
}

/// A runnable's call into one server operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationRef {
    pub port: PortId,
    pub operation: usize,
}

#[derive(Debug)]
pub struct Runnable {
    pub id: RunnableId,
    pub component: ComponentId,
    pub name: String,
    pub symbol: String,
    pub data_receive_points: Vec<DataRef>,
    pub data_send_points: Vec<DataRef>,
    pub server_call_points: Vec<OperationRef>,
    pub parameter_access_points: Vec<DataRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeActivation {
    OnEntry,
    OnExit,
}

impl ModeActivation {
    pub fn token(self) -> &'static str {
        match self {
            ModeActivation::OnEntry => "OnEntry",
            ModeActivation::OnExit => "OnExit",
        }
    }

    /// Parse an activation token. Both the XML-style and the camel-case
    /// spellings are accepted.
    pub fn parse(token: &str) -> Result<Self, ResolveError> {
        match token {
            "ENTRY" | "OnEntry" => Ok(ModeActivation::OnEntry),
            "EXIT" | "OnExit" => Ok(ModeActivation::OnExit),
            other => Err(ResolveError::UnsupportedConstruct {
                kind: "mode activation",
                construct: other.to_string(),
            }),
        }
    }
}

/// A trigger bound to exactly one runnable.
#[derive(Debug)]
pub enum Event {
    Timer {
        id: EventId,
        component: ComponentId,
        name: String,
        period_ms: u32,
        runnable: RunnableId,
    },
    OperationInvoked {
        id: EventId,
        component: ComponentId,
        name: String,
        port: PortId,
        operation: usize,
        runnable: RunnableId,
    },
    ModeSwitch {
        id: EventId,
        component: ComponentId,
        name: String,
        activation: ModeActivation,
        port: PortId,
        mode: String,
        runnable: RunnableId,
    },
}

impl Event {
    pub fn id(&self) -> EventId {
        match self {
            Event::Timer { id, .. }
            | Event::OperationInvoked { id, .. }
            | Event::ModeSwitch { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Event::Timer { name, .. }
            | Event::OperationInvoked { name, .. }
            | Event::ModeSwitch { name, .. } => name,
        }
    }

    pub fn runnable(&self) -> RunnableId {
        match self {
            Event::Timer { runnable, .. }
            | Event::OperationInvoked { runnable, .. }
            | Event::ModeSwitch { runnable, .. } => *runnable,
        }
    }
}

// ── Resolution helpers ──────────────────────────────────────────────────────

/// Find a component-local port by name in the shared arena.
pub fn find_port<'a>(
    ports: &'a [Port],
    component_ports: &[PortId],
    name: &str,
) -> Option<&'a Port> {
    component_ports
        .iter()
        .map(|id| &ports[id.index()])
        .find(|p| p.name == name)
}

fn require_port<'a>(
    ports: &'a [Port],
    component_ports: &[PortId],
    name: &str,
    context: String,
) -> Result<&'a Port, ResolveError> {
    find_port(ports, component_ports, name).ok_or_else(|| ResolveError::ModelReference {
        kind: "port",
        name: name.to_string(),
        context,
    })
}

/// Resolve one runnable declaration against the component's ports.
pub fn build_runnable(
    ports: &[Port],
    component: ComponentId,
    component_ports: &[PortId],
    component_name: &str,
    id: RunnableId,
    decl: &RunnableDecl,
) -> Result<Runnable, ResolveError> {
    let context = |what: &str| {
        format!(
            "{} of runnable '{}' in component '{}'",
            what, decl.name, component_name
        )
    };

    let mut runnable = Runnable {
        id,
        component,
        name: decl.name.clone(),
        symbol: decl.symbol.clone(),
        data_receive_points: Vec::new(),
        data_send_points: Vec::new(),
        server_call_points: Vec::new(),
        parameter_access_points: Vec::new(),
    };

    for point in &decl.data_receive_points {
        let port = require_port(
            ports,
            component_ports,
            &point.port,
            context("data receive point"),
        )?;
        runnable.data_receive_points.push(resolve_data_ref(
            port,
            &point.element,
            PortDirection::Require,
            PortKind::SenderReceiver,
            context("data receive point"),
        )?);
    }
    for point in &decl.data_send_points {
        let port = require_port(
            ports,
            component_ports,
            &point.port,
            context("data send point"),
        )?;
        runnable.data_send_points.push(resolve_data_ref(
            port,
            &point.element,
            PortDirection::Provide,
            PortKind::SenderReceiver,
            context("data send point"),
        )?);
    }
    for point in &decl.server_call_points {
        let port = require_port(
            ports,
            component_ports,
            &point.port,
            context("server call point"),
        )?;
        if port.direction != PortDirection::Require || port.kind != PortKind::ClientServer {
            return Err(ResolveError::ModelReference {
                kind: "client port",
                name: point.port.clone(),
                context: context("server call point"),
            });
        }
        let (operation, _) =
            port.operation(&point.operation)
                .ok_or_else(|| ResolveError::ModelReference {
                    kind: "operation",
                    name: point.operation.clone(),
                    context: context("server call point"),
                })?;
        runnable.server_call_points.push(OperationRef {
            port: port.id,
            operation,
        });
    }
    for point in &decl.parameter_access_points {
        let port = require_port(
            ports,
            component_ports,
            &point.port,
            context("parameter access point"),
        )?;
        runnable.parameter_access_points.push(resolve_data_ref(
            port,
            &point.element,
            PortDirection::Require,
            PortKind::Parameter,
            context("parameter access point"),
        )?);
    }

    Ok(runnable)
}

fn resolve_data_ref(
    port: &Port,
    element: &str,
    direction: PortDirection,
    kind: PortKind,
    context: String,
) -> Result<DataRef, ResolveError> {
    if port.direction != direction || port.kind != kind {
        return Err(ResolveError::ModelReference {
            kind: match (direction, kind) {
                (_, PortKind::Parameter) => "parameter port",
                (PortDirection::Require, _) => "require port",
                (PortDirection::Provide, _) => "provide port",
            },
            name: port.name.clone(),
            context,
        });
    }
    let (index, _) = port
        .element(element)
        .ok_or_else(|| ResolveError::ModelReference {
            kind: "data element",
            name: element.to_string(),
            context,
        })?;
    Ok(DataRef {
        port: port.id,
        element: index,
    })
}

/// Resolve one event declaration. The target runnable is looked up by name
/// among the runnables built for this component.
pub fn build_event(
    ports: &[Port],
    runnables: &[Runnable],
    component: ComponentId,
    component_ports: &[PortId],
    component_runnables: &[RunnableId],
    component_name: &str,
    id: EventId,
    decl: &EventDecl,
) -> Result<Event, ResolveError> {
    let context = format!(
        "event '{}' in component '{}'",
        decl.name(),
        component_name
    );

    let runnable = component_runnables
        .iter()
        .map(|rid| &runnables[rid.index()])
        .find(|r| r.name == decl.runnable())
        .ok_or_else(|| ResolveError::ModelReference {
            kind: "runnable",
            name: decl.runnable().to_string(),
            context: context.clone(),
        })?
        .id;

    match decl {
        EventDecl::Timer {
            name, period_ms, ..
        } => Ok(Event::Timer {
            id,
            component,
            name: name.clone(),
            period_ms: *period_ms,
            runnable,
        }),
        EventDecl::OperationInvoked {
            name,
            port,
            operation,
            ..
        } => {
            let port = require_port(ports, component_ports, port, context.clone())?;
            if port.direction != PortDirection::Provide || port.kind != PortKind::ClientServer {
                return Err(ResolveError::ModelReference {
                    kind: "server port",
                    name: port.name.clone(),
                    context,
                });
            }
            let (operation, _) =
                port.operation(operation)
                    .ok_or_else(|| ResolveError::ModelReference {
                        kind: "operation",
                        name: operation.clone(),
                        context: context.clone(),
                    })?;
            Ok(Event::OperationInvoked {
                id,
                component,
                name: name.clone(),
                port: port.id,
                operation,
                runnable,
            })
        }
        EventDecl::ModeSwitch {
            name,
            activation,
            port,
            mode,
            ..
        } => {
            let activation = ModeActivation::parse(activation)?;
            let port = require_port(ports, component_ports, port, context.clone())?;
            let group = port
                .mode_group
                .as_ref()
                .ok_or_else(|| ResolveError::ModelReference {
                    kind: "mode group",
                    name: port.name.clone(),
                    context: context.clone(),
                })?;
            if !group.modes.iter().any(|m| m == mode) {
                return Err(ResolveError::ModelReference {
                    kind: "mode",
                    name: mode.clone(),
                    context,
                });
            }
            Ok(Event::ModeSwitch {
                id,
                component,
                name: name.clone(),
                activation,
                port: port.id,
                mode: mode.clone(),
                runnable,
            })
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_token_parsing() {
        assert_eq!(
            ModeActivation::parse("ENTRY").unwrap(),
            ModeActivation::OnEntry
        );
        assert_eq!(
            ModeActivation::parse("OnExit").unwrap(),
            ModeActivation::OnExit
        );
        let err = ModeActivation::parse("ON-TRANSITION").unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedConstruct { .. }));
        assert!(format!("{err}").contains("ON-TRANSITION"));
    }

    #[test]
    fn api_refs_deduplicated() {
        let mut c = Component {
            id: ComponentId(0),
            name: "C".to_string(),
            ports: Vec::new(),
            runnables: Vec::new(),
            events: Vec::new(),
            api_refs: Vec::new(),
        };
        c.record_api_ref(ApiKind::Read, "Rte_Read_P_E");
        c.record_api_ref(ApiKind::Read, "Rte_Read_P_E");
        c.record_api_ref(ApiKind::Write, "Rte_Write_P_E");
        assert_eq!(c.api_refs.len(), 2);
    }
}
