// connector.rs — Require/provide connector resolution
//
// Builds the symmetric binding between provide and require ports, either
// explicitly (`connect`) or automatically (`auto_connect`). Direction
// mismatches and duplicate connectors are model-authoring errors and fail
// the build; they are never retried.
//
// Preconditions: the port arena is fully built.
// Postconditions: the connector relation is symmetric (P2).
// Failure modes: same-direction pairs, repeated connects of the same pair.
// Side effects: mutates the `connectors` lists of the affected ports.

use crate::component::Component;
use crate::error::ResolveError;
use crate::id::PortId;
use crate::port::{Port, PortDirection};

/// Qualified `Component.Port` path for error reporting.
fn port_path(ports: &[Port], components: &[Component], id: PortId) -> String {
    let port = &ports[id.index()];
    format!("{}.{}", components[port.component.index()].name, port.name)
}

/// Explicitly connect two ports. Either argument order is accepted; the
/// sides are classified by direction.
pub fn connect(
    ports: &mut [Port],
    components: &[Component],
    a: PortId,
    b: PortId,
) -> Result<(), ResolveError> {
    let (provide, require) = match (ports[a.index()].direction, ports[b.index()].direction) {
        (PortDirection::Provide, PortDirection::Require) => (a, b),
        (PortDirection::Require, PortDirection::Provide) => (b, a),
        (direction, _) => {
            return Err(ResolveError::DirectionMismatch {
                a: port_path(ports, components, a),
                b: port_path(ports, components, b),
                direction: direction.as_str(),
            })
        }
    };

    if ports[provide.index()].connectors.contains(&require) {
        return Err(ResolveError::DuplicateDefinition {
            kind: "connector",
            name: format!(
                "{} -> {}",
                port_path(ports, components, provide),
                port_path(ports, components, require)
            ),
        });
    }

    ports[provide.index()].connectors.push(require);
    ports[require.index()].connectors.push(provide);
    Ok(())
}

/// Connect every unconnected require port to the first provide port with
/// identical resolved interface identity and identical port name. Iteration
/// follows declaration order on both sides, so results are deterministic for
/// a fixed input order (P3). At most one match is taken per require port.
pub fn auto_connect(ports: &mut [Port]) {
    for r in 0..ports.len() {
        if ports[r].direction != PortDirection::Require || ports[r].is_connected() {
            continue;
        }
        let matched = (0..ports.len()).find(|&p| {
            ports[p].direction == PortDirection::Provide
                && ports[p].interface == ports[r].interface
                && ports[p].name == ports[r].name
        });
        if let Some(p) = matched {
            let provide_id = ports[p].id;
            let require_id = ports[r].id;
            ports[p].connectors.push(require_id);
            ports[r].connectors.push(provide_id);
        }
    }
}

/// Lazy single-pass sequence of all ports with zero connectors, in
/// declaration order. Consumed by downstream stub/mock generation.
pub fn unconnected_ports(ports: &[Port]) -> impl Iterator<Item = PortId> + '_ {
    ports.iter().filter(|p| !p.is_connected()).map(|p| p.id)
}

// ── Tests ───────────────────────────────────────────────────────────────────
