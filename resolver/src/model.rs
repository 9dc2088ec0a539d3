// model.rs — Component-description input model
//
// The already-parsed form of a set of independently authored software
// component descriptions: data types, port interfaces, and per-component
// port/behavior declarations. An external authoring or serialization layer
// produces this; the resolver only reads it.
//
// Preconditions: the model is well-formed serde data. Schema validation is
//                not performed here; dangling references are caught during
//                resolution and reported as `ModelReferenceError`.
// Side effects: none.

use serde::{Deserialize, Serialize};

// ── Data types ──────────────────────────────────────────────────────────────

/// Shape of a declared data type. Record and Array types are "complex":
/// access functions for them switch from by-value to by-reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Maps directly onto a native C type, e.g. `unsigned char`.
    Primitive { native: String },
    Record { fields: Vec<FieldDecl> },
    Array { element: String, length: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeDecl {
    pub name: String,
    pub kind: TypeKind,
}

impl DataTypeDecl {
    pub fn is_complex(&self) -> bool {
        matches!(self.kind, TypeKind::Record { .. } | TypeKind::Array { .. })
    }
}

// ── Interfaces ──────────────────────────────────────────────────────────────

/// One named signal exchanged over a sender/receiver or parameter port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDecl {
    pub name: String,
    pub type_ref: String,
    /// Queued elements synthesize Send/Receive access, unqueued Write/Read.
    #[serde(default)]
    pub queued: bool,
    /// Initial-value literal for the generated storage cell.
    #[serde(default)]
    pub init: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgDirection {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDecl {
    pub name: String,
    pub type_ref: String,
    pub direction: ArgDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDecl {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentDecl>,
}

/// An enumerated set of mutually exclusive states a component can switch
/// between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeGroupDecl {
    pub name: String,
    pub modes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InterfaceDecl {
    SenderReceiver {
        name: String,
        elements: Vec<ElementDecl>,
    },
    ClientServer {
        name: String,
        operations: Vec<OperationDecl>,
    },
    ModeSwitch {
        name: String,
        group: ModeGroupDecl,
    },
    Parameter {
        name: String,
        elements: Vec<ElementDecl>,
    },
}

impl InterfaceDecl {
    pub fn name(&self) -> &str {
        match self {
            InterfaceDecl::SenderReceiver { name, .. } => name,
            InterfaceDecl::ClientServer { name, .. } => name,
            InterfaceDecl::ModeSwitch { name, .. } => name,
            InterfaceDecl::Parameter { name, .. } => name,
        }
    }
}

// ── Model root ──────────────────────────────────────────────────────────────

/// Table of shared declarations that component descriptions reference by
/// name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    pub data_types: Vec<DataTypeDecl>,
    pub interfaces: Vec<InterfaceDecl>,
}

impl Model {
    pub fn interface(&self, name: &str) -> Option<&InterfaceDecl> {
        self.interfaces.iter().find(|i| i.name() == name)
    }

    pub fn data_type(&self, name: &str) -> Option<&DataTypeDecl> {
        self.data_types.iter().find(|t| t.name == name)
    }

    /// Compact JSON with fields in declaration order, used for
    /// fingerprinting. Stable independent of display formatting.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).expect("internal: model serialization")
    }
}

// ── Component declarations ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirectionDecl {
    Require,
    Provide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDecl {
    pub name: String,
    pub direction: PortDirectionDecl,
    pub interface: String,
}

/// A runnable's access to one data element, named by port and element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPoint {
    pub port: String,
    pub element: String,
}

/// A runnable's call into one server operation, named by port and operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPoint {
    pub port: String,
    pub operation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnableDecl {
    pub name: String,
    /// C symbol of the runnable entry point.
    pub symbol: String,
    #[serde(default)]
    pub data_receive_points: Vec<AccessPoint>,
    #[serde(default)]
    pub data_send_points: Vec<AccessPoint>,
    #[serde(default)]
    pub server_call_points: Vec<CallPoint>,
    #[serde(default)]
    pub parameter_access_points: Vec<AccessPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventDecl {
    Timer {
        name: String,
        period_ms: u32,
        runnable: String,
    },
    OperationInvoked {
        name: String,
        port: String,
        operation: String,
        runnable: String,
    },
    ModeSwitch {
        name: String,
        /// Activation token: `ENTRY`/`OnEntry` or `EXIT`/`OnExit`. Anything
        /// else is an unsupported construct.
        activation: String,
        port: String,
        mode: String,
        runnable: String,
    },
}

impl EventDecl {
    pub fn name(&self) -> &str {
        match self {
            EventDecl::Timer { name, .. } => name,
            EventDecl::OperationInvoked { name, .. } => name,
            EventDecl::ModeSwitch { name, .. } => name,
        }
    }

    pub fn runnable(&self) -> &str {
        match self {
            EventDecl::Timer { runnable, .. } => runnable,
            EventDecl::OperationInvoked { runnable, .. } => runnable,
            EventDecl::ModeSwitch { runnable, .. } => runnable,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDecl {
    #[serde(default)]
    pub runnables: Vec<RunnableDecl>,
    #[serde(default)]
    pub events: Vec<EventDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub name: String,
    pub ports: Vec<PortDecl>,
    #[serde(default)]
    pub behavior: BehaviorDecl,
}

// ── Tests ───────────────────────────────────────────────────────────────────
