#![forbid(unsafe_code)]

use crate::error::WorkflowError;
use pf_core::{DepartmentCode, IncidentTemplate, SuggestedForm, TemplateRegistry};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateYaml {
    name: String,
    #[serde(default)]
    description: String,
    departments: Vec<String>,
    #[serde(default)]
    production_hold: bool,
    #[serde(default)]
    photo_required: bool,
    #[serde(default)]
    forms: BTreeMap<String, Vec<FormYaml>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FormYaml {
    form_id: String,
    form_type: String,
    #[serde(default)]
    route: String,
    #[serde(default)]
    required: bool,
}

pub fn load_registry(path: &Path) -> Result<TemplateRegistry, WorkflowError> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        WorkflowError::invalid_input(format!("cannot read templates file: {err}"))
            .with_id("path", path.display().to_string())
    })?;
    parse_registry(&raw)
}

/// Parses a YAML list of templates. File order is registration order, which decides
/// fuzzy-lookup ties.
pub fn parse_registry(raw: &str) -> Result<TemplateRegistry, WorkflowError> {
    let entries: Vec<TemplateYaml> = serde_yaml::from_str(raw)
        .map_err(|err| WorkflowError::invalid_input(format!("templates must be valid YAML: {err}")))?;
    let mut registry = TemplateRegistry::default();
    for entry in entries {
        registry.register(into_template(entry)?);
    }
    Ok(registry)
}

fn into_template(entry: TemplateYaml) -> Result<IncidentTemplate, WorkflowError> {
    let name = entry.name.trim().to_string();
    if name.is_empty() {
        return Err(WorkflowError::invalid_input("template name must not be empty"));
    }
    let in_template = |err: WorkflowError| err.with_id("template", name.clone());

    let mut forms = BTreeMap::new();
    for (code, list) in entry.forms {
        let code = DepartmentCode::try_new(&code).map_err(|err| in_template(err.into()))?;
        let list = list
            .into_iter()
            .map(|form| SuggestedForm {
                form_id: form.form_id,
                form_type: form.form_type,
                route: form.route,
                required: form.required,
            })
            .collect::<Vec<_>>();
        forms.insert(code, list);
    }

    let mut template = IncidentTemplate::new(name.clone(), entry.description)
        .with_production_hold(entry.production_hold)
        .with_photo_required(entry.photo_required);
    for code in entry.departments {
        let code = DepartmentCode::try_new(&code).map_err(|err| in_template(err.into()))?;
        let department_forms = forms.remove(&code).unwrap_or_default();
        template = template.with_department(code, department_forms);
    }
    if let Some(code) = forms.keys().next() {
        return Err(in_template(
            WorkflowError::invalid_input(format!(
                "forms listed for department {} which the template does not assign",
                code.as_str()
            ))
            .with_id("department", code.as_str()),
        ));
    }
    Ok(template)
}
