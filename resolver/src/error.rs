// error.rs — Fatal resolution errors
//
// Every error here is raised at the point of detection and propagated with
// `?` all the way out of the partition build. Nothing is caught or retried:
// resolution is an offline pre-build step with no partial-success notion, so
// one invalid component invalidates the whole partition.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    /// A port/operation/data-element/interface reference cannot be resolved
    /// against the supplied component description.
    #[error("unresolved {kind} reference '{name}' in {context}")]
    ModelReference {
        kind: &'static str,
        name: String,
        context: String,
    },

    /// A client-server connector resolves to more than one candidate server
    /// runnable.
    #[error("operation '{operation}' on port '{port}' resolves to {count} candidate server runnables")]
    AmbiguousServer {
        operation: String,
        port: String,
        count: usize,
    },

    /// The same connector or client-API short name is registered twice with
    /// conflicting targets.
    #[error("duplicate {kind} '{name}'")]
    DuplicateDefinition { kind: &'static str, name: String },

    /// An event or port-interface construct not handled by this version of
    /// the resolver. Always names the offending construct.
    #[error("unsupported {kind}: {construct}")]
    UnsupportedConstruct {
        kind: &'static str,
        construct: String,
    },

    /// `connect()` was handed two ports of the same direction.
    #[error("cannot connect '{a}' and '{b}': both are {direction} ports")]
    DirectionMismatch {
        a: String,
        b: String,
        direction: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_construct() {
        let err = ResolveError::UnsupportedConstruct {
            kind: "mode activation",
            construct: "ON-TRANSITION".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "unsupported mode activation: ON-TRANSITION"
        );
    }

    #[test]
    fn display_reference_context() {
        let err = ResolveError::ModelReference {
            kind: "interface",
            name: "Speed_I".to_string(),
            context: "port 'Speed' of component 'Producer'".to_string(),
        };
        assert!(format!("{err}").contains("'Speed_I'"));
        assert!(format!("{err}").contains("Producer"));
    }
}
