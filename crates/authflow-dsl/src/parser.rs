use crate::document::{FlowDocument, RealmDocument};
use crate::error::DslError;

/// Parse a YAML string into a [`FlowDocument`].
///
/// Only structure is checked here. Graph rules are enforced when the flow
/// is loaded against a step registry.
pub fn parse_flow_document(yaml_str: &str) -> Result<FlowDocument, DslError> {
    let document: FlowDocument = serde_yaml::from_str(yaml_str)?;
    check_flow_fields(&document)?;
    Ok(document)
}

/// Parse a YAML string into a [`RealmDocument`]
pub fn parse_realm_document(yaml_str: &str) -> Result<RealmDocument, DslError> {
    let document: RealmDocument = serde_yaml::from_str(yaml_str)?;

    if document.tenant.trim().is_empty() {
        return Err(DslError::MissingRequiredField("tenant".to_string()));
    }
    if document.realm.trim().is_empty() {
        return Err(DslError::MissingRequiredField("realm".to_string()));
    }
    for flow in &document.flows {
        check_flow_fields(flow)?;
    }

    Ok(document)
}

fn check_flow_fields(document: &FlowDocument) -> Result<(), DslError> {
    if document.name.trim().is_empty() {
        return Err(DslError::MissingRequiredField("name".to_string()));
    }
    if document.start.trim().is_empty() {
        return Err(DslError::MissingRequiredField(format!(
            "start (flow '{}')",
            document.name
        )));
    }
    Ok(())
}
