// port.rs — Resolved port and data element model
//
// Wraps a component's abstract port declarations into typed require/provide
// objects exposing data elements, operations, and mode groups. Construction
// eagerly resolves the declared interface against the model; any dangling
// interface or type reference is a hard `ModelReference` failure.
//
// Preconditions: `model` holds the shared interface/type tables.
// Postconditions: returned ports carry fully resolved children; no lazy
//                 lookups remain for downstream phases.
// Failure modes: unresolved references, parameter interfaces on provide
//                ports.
// Side effects: none.

use crate::error::ResolveError;
use crate::id::{ComponentId, PortId};
use crate::model::{ArgDirection, InterfaceDecl, Model, PortDecl, PortDirectionDecl};

// ── Resolved types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Require,
    Provide,
}

impl PortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Require => "require",
            PortDirection::Provide => "provide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    SenderReceiver,
    ClientServer,
    ModeSwitch,
    Parameter,
}

/// One named signal value, resolved against the type table.
#[derive(Debug, Clone)]
pub struct DataElement {
    pub name: String,
    /// Declared type name; the shared type header typedefs it.
    pub type_name: String,
    /// Record/array signals switch the calling convention to by-reference.
    pub complex: bool,
    pub queued: bool,
    pub init: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OperationArg {
    pub name: String,
    pub type_name: String,
    pub complex: bool,
    pub direction: ArgDirection,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub arguments: Vec<OperationArg>,
}

/// Resolved mode-declaration group exposed by a mode-switch port.
#[derive(Debug, Clone)]
pub struct ModeGroup {
    pub name: String,
    pub modes: Vec<String>,
}

/// A component's declared point of interaction, after interface resolution.
#[derive(Debug)]
pub struct Port {
    pub id: PortId,
    pub component: ComponentId,
    pub name: String,
    pub direction: PortDirection,
    pub kind: PortKind,
    /// Resolved interface identity; auto-connect matches on this.
    pub interface: String,
    pub elements: Vec<DataElement>,
    pub operations: Vec<Operation>,
    pub mode_group: Option<ModeGroup>,
    /// Symmetric connector relation: peer ports of the opposite direction.
    pub connectors: Vec<PortId>,
}

impl Port {
    pub fn is_connected(&self) -> bool {
        !self.connectors.is_empty()
    }

    pub fn element(&self, name: &str) -> Option<(usize, &DataElement)> {
        self.elements
            .iter()
            .enumerate()
            .find(|(_, e)| e.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<(usize, &Operation)> {
        self.operations
            .iter()
            .enumerate()
            .find(|(_, o)| o.name == name)
    }
}

// ── Construction ────────────────────────────────────────────────────────────

/// Resolve one port declaration into a `Port`.
pub fn build_port(
    model: &Model,
    component: ComponentId,
    component_name: &str,
    id: PortId,
    decl: &PortDecl,
) -> Result<Port, ResolveError> {
    let context = || format!("port '{}' of component '{}'", decl.name, component_name);

    let direction = match decl.direction {
        PortDirectionDecl::Require => PortDirection::Require,
        PortDirectionDecl::Provide => PortDirection::Provide,
    };

    let interface = model
        .interface(&decl.interface)
        .ok_or_else(|| ResolveError::ModelReference {
            kind: "interface",
            name: decl.interface.clone(),
            context: context(),
        })?;

    let mut port = Port {
        id,
        component,
        name: decl.name.clone(),
        direction,
        kind: PortKind::SenderReceiver,
        interface: decl.interface.clone(),
        elements: Vec::new(),
        operations: Vec::new(),
        mode_group: None,
        connectors: Vec::new(),
    };

    match interface {
        InterfaceDecl::SenderReceiver { elements, .. } => {
            port.kind = PortKind::SenderReceiver;
            for e in elements {
                port.elements
                    .push(resolve_element(model, e, &decl.interface, &context)?);
            }
        }
        InterfaceDecl::ClientServer { operations, .. } => {
            port.kind = PortKind::ClientServer;
            for op in operations {
                let mut arguments = Vec::new();
                for arg in &op.arguments {
                    let ty = model.data_type(&arg.type_ref).ok_or_else(|| {
                        ResolveError::ModelReference {
                            kind: "data type",
                            name: arg.type_ref.clone(),
                            context: format!(
                                "argument '{}' of operation '{}' in {}",
                                arg.name,
                                op.name,
                                context()
                            ),
                        }
                    })?;
                    arguments.push(OperationArg {
                        name: arg.name.clone(),
                        type_name: arg.type_ref.clone(),
                        complex: ty.is_complex(),
                        direction: arg.direction,
                    });
                }
                port.operations.push(Operation {
                    name: op.name.clone(),
                    arguments,
                });
            }
        }
        InterfaceDecl::ModeSwitch { group, .. } => {
            port.kind = PortKind::ModeSwitch;
            port.mode_group = Some(ModeGroup {
                name: group.name.clone(),
                modes: group.modes.clone(),
            });
        }
        InterfaceDecl::Parameter { elements, .. } => {
            // Calibration parameters are consumed, never provided.
            if direction == PortDirection::Provide {
                return Err(ResolveError::UnsupportedConstruct {
                    kind: "port interface",
                    construct: format!("parameter interface on {}", context()),
                });
            }
            port.kind = PortKind::Parameter;
            for e in elements {
                port.elements
                    .push(resolve_element(model, e, &decl.interface, &context)?);
            }
        }
    }

    Ok(port)
}

fn resolve_element(
    model: &Model,
    decl: &crate::model::ElementDecl,
    interface: &str,
    context: &dyn Fn() -> String,
) -> Result<DataElement, ResolveError> {
    let ty = model
        .data_type(&decl.type_ref)
        .ok_or_else(|| ResolveError::ModelReference {
            kind: "data type",
            name: decl.type_ref.clone(),
            context: format!(
                "element '{}' of interface '{}' in {}",
                decl.name,
                interface,
                context()
            ),
        })?;
    Ok(DataElement {
        name: decl.name.clone(),
        type_name: decl.type_ref.clone(),
        complex: ty.is_complex(),
        queued: decl.queued,
        init: decl.init.clone(),
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataTypeDecl, ElementDecl, ModeGroupDecl, TypeKind};

    fn model() -> Model {
        Model {
            data_types: vec![
                DataTypeDecl {
                    name: "uint8".to_string(),
                    kind: TypeKind::Primitive {
                        native: "unsigned char".to_string(),
                    },
                },
                DataTypeDecl {
                    name: "Block".to_string(),
                    kind: TypeKind::Array {
                        element: "uint8".to_string(),
                        length: 8,
                    },
                },
            ],
            interfaces: vec![
                InterfaceDecl::SenderReceiver {
                    name: "Data_I".to_string(),
                    elements: vec![
                        ElementDecl {
                            name: "Value".to_string(),
                            type_ref: "uint8".to_string(),
                            queued: false,
                            init: None,
                        },
                        ElementDecl {
                            name: "Payload".to_string(),
                            type_ref: "Block".to_string(),
                            queued: true,
                            init: None,
                        },
                    ],
                },
                InterfaceDecl::ModeSwitch {
                    name: "Power_I".to_string(),
                    group: ModeGroupDecl {
                        name: "PowerMode".to_string(),
                        modes: vec!["OFF".to_string(), "ON".to_string()],
                    },
                },
                InterfaceDecl::Parameter {
                    name: "Cal_I".to_string(),
                    elements: vec![ElementDecl {
                        name: "Gain".to_string(),
                        type_ref: "uint8".to_string(),
                        queued: false,
                        init: Some("1".to_string()),
                    }],
                },
            ],
        }
    }

    fn build(direction: PortDirectionDecl, interface: &str) -> Result<Port, ResolveError> {
        build_port(
            &model(),
            ComponentId(0),
            "Comp",
            PortId(0),
            &PortDecl {
                name: "P".to_string(),
                direction,
                interface: interface.to_string(),
            },
        )
    }

    #[test]
    fn sender_receiver_elements_resolved() {
        let p = build(PortDirectionDecl::Provide, "Data_I").unwrap();
        assert_eq!(p.kind, PortKind::SenderReceiver);
        assert_eq!(p.elements.len(), 2);
        assert!(!p.elements[0].complex);
        assert!(p.elements[1].complex);
        assert!(p.elements[1].queued);
    }

    #[test]
    fn mode_switch_group_resolved() {
        let p = build(PortDirectionDecl::Require, "Power_I").unwrap();
        assert_eq!(p.kind, PortKind::ModeSwitch);
        let group = p.mode_group.unwrap();
        assert_eq!(group.name, "PowerMode");
        assert_eq!(group.modes, vec!["OFF", "ON"]);
    }

    #[test]
    fn unknown_interface_fails() {
        let err = build(PortDirectionDecl::Require, "Missing_I").unwrap_err();
        match err {
            ResolveError::ModelReference { kind, name, .. } => {
                assert_eq!(kind, "interface");
                assert_eq!(name, "Missing_I");
            }
            other => panic!("expected ModelReference, got: {other}"),
        }
    }

    #[test]
    fn parameter_provide_port_unsupported() {
        let err = build(PortDirectionDecl::Provide, "Cal_I").unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn parameter_require_port_ok() {
        let p = build(PortDirectionDecl::Require, "Cal_I").unwrap();
        assert_eq!(p.kind, PortKind::Parameter);
        assert_eq!(p.elements[0].init.as_deref(), Some("1"));
    }

    #[test]
    fn element_lookup() {
        let p = build(PortDirectionDecl::Provide, "Data_I").unwrap();
        assert_eq!(p.element("Payload").unwrap().0, 1);
        assert!(p.element("Nope").is_none());
    }
}
