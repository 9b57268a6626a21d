use authflow_core::{validate_flow, Flow, StepRegistry, ValidationError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::document::{FlowDocument, RealmDocument};
use crate::error::DslError;
use crate::error_codes;
use crate::parser::{parse_flow_document, parse_realm_document};

/// Parse, validate and wrap a single flow document for deployment
pub fn load_flow(
    yaml_str: &str,
    tenant: &str,
    realm: &str,
    registry: &StepRegistry,
) -> Result<Flow, DslError> {
    let document = parse_flow_document(yaml_str)?;
    build_flow(&document, tenant, realm, registry, yaml_str.to_string())
        .map_err(DslError::from_validation_errors)
}

/// Load every flow of a realm document.
///
/// Validation errors of all flows are collected and returned together, with
/// paths prefixed by the flow name. Each flow keeps the realm document text
/// as its source.
pub fn load_realm(yaml_str: &str, registry: &StepRegistry) -> Result<Vec<Flow>, DslError> {
    let document = parse_realm_document(yaml_str)?;
    load_realm_document(&document, yaml_str, registry)
}

/// Load a parsed realm document; `source` is the text it was parsed from
pub fn load_realm_document(
    document: &RealmDocument,
    source: &str,
    registry: &StepRegistry,
) -> Result<Vec<Flow>, DslError> {
    let mut flows = Vec::with_capacity(document.flows.len());
    let mut errors = Vec::new();
    let mut names: HashMap<&str, usize> = HashMap::new();
    let mut routes: HashMap<String, &str> = HashMap::new();

    for flow_doc in &document.flows {
        *names.entry(flow_doc.name.as_str()).or_default() += 1;
        if names[flow_doc.name.as_str()] == 2 {
            errors.push(ValidationError {
                code: error_codes::DUPLICATE_FLOW,
                message: format!("flow '{}' is defined more than once", flow_doc.name),
                path: Some(format!("flows.{}", flow_doc.name)),
            });
        }

        let route = authflow_core::domain::flow_definition::normalize_route(&flow_doc.effective_route());
        if let Some(existing) = routes.get(&route) {
            if *existing != flow_doc.name {
                errors.push(ValidationError {
                    code: error_codes::DUPLICATE_ROUTE,
                    message: format!(
                        "route '{}' of flow '{}' is already used by flow '{}'",
                        route, flow_doc.name, existing
                    ),
                    path: Some(format!("flows.{}.route", flow_doc.name)),
                });
            }
        } else {
            routes.insert(route, flow_doc.name.as_str());
        }

        match build_flow(flow_doc, &document.tenant, &document.realm, registry, source.to_string()) {
            Ok(flow) => flows.push(flow),
            Err(flow_errors) => errors.extend(flow_errors),
        }
    }

    if !errors.is_empty() {
        return Err(DslError::from_validation_errors(errors));
    }

    tracing::info!(
        tenant = %document.tenant,
        realm = %document.realm,
        flows = flows.len(),
        "Realm loaded"
    );
    Ok(flows)
}

/// Load every `*.yaml` / `*.yml` realm document in a directory, in file name
/// order
pub fn load_realms_dir(dir: impl AsRef<Path>, registry: &StepRegistry) -> Result<Vec<Flow>, DslError> {
    let dir = dir.as_ref();
    let io_error = |path: &Path, err: std::io::Error| DslError::IoError {
        path: path.display().to_string(),
        message: err.to_string(),
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if path.is_file() && is_yaml {
            paths.push(path);
        }
    }
    paths.sort();

    let mut flows = Vec::new();
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        tracing::debug!(path = %path.display(), "Loading realm document");
        flows.extend(load_realm(&text, registry)?);
    }

    Ok(flows)
}

fn build_flow(
    document: &FlowDocument,
    tenant: &str,
    realm: &str,
    registry: &StepRegistry,
    source: String,
) -> Result<Flow, Vec<ValidationError>> {
    let prefix = |mut error: ValidationError| {
        error.path = Some(match error.path.take() {
            Some(path) => format!("flows.{}.{}", document.name, path),
            None => format!("flows.{}", document.name),
        });
        error
    };

    let definition = document.to_definition().map_err(|e| vec![prefix(e)])?;
    let validated = validate_flow(definition, registry)
        .map_err(|errors| errors.into_iter().map(prefix).collect::<Vec<_>>())?;

    Ok(Flow::new(tenant, realm, document.effective_route(), validated)
        .with_active(document.active)
        .with_source(source))
}
