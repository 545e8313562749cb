#![forbid(unsafe_code)]

use super::super::StoreError;
use pf_core::{DepartmentCode, IncidentTemplate, SuggestedForm};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

pub(in crate::store) fn template_to_json(template: &IncidentTemplate) -> String {
    let mut forms = Map::new();
    for (code, list) in &template.department_forms {
        let entries = list
            .iter()
            .map(|form| {
                json!({
                    "form_id": form.form_id,
                    "form_type": form.form_type,
                    "route": form.route,
                    "required": form.required,
                })
            })
            .collect::<Vec<_>>();
        forms.insert(code.as_str().to_string(), Value::Array(entries));
    }
    json!({
        "id": template.id,
        "name": template.name,
        "description": template.description,
        "departments": template.departments.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        "is_production_hold": template.is_production_hold,
        "photo_required": template.photo_required,
        "department_forms": forms,
    })
    .to_string()
}

pub(in crate::store) fn template_from_json(raw: &str) -> Result<IncidentTemplate, StoreError> {
    const INVALID: StoreError = StoreError::Corrupt("invalid template snapshot");

    let value: Value = serde_json::from_str(raw).map_err(|_| INVALID)?;
    let str_field = |key: &str| -> Result<String, StoreError> {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(INVALID)
    };
    let bool_field = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);

    let mut departments = Vec::new();
    for raw_code in value
        .get("departments")
        .and_then(Value::as_array)
        .ok_or(INVALID)?
    {
        let code = raw_code
            .as_str()
            .and_then(|code| DepartmentCode::try_new(code).ok())
            .ok_or(INVALID)?;
        departments.push(code);
    }

    let mut department_forms = BTreeMap::new();
    if let Some(forms) = value.get("department_forms").and_then(Value::as_object) {
        for (raw_code, list) in forms {
            let code = DepartmentCode::try_new(raw_code).map_err(|_| INVALID)?;
            let mut out = Vec::new();
            for entry in list.as_array().ok_or(INVALID)? {
                let field = |key: &str| {
                    entry
                        .get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                out.push(SuggestedForm {
                    form_id: field("form_id"),
                    form_type: field("form_type"),
                    route: field("route"),
                    required: entry
                        .get("required")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                });
            }
            department_forms.insert(code, out);
        }
    }

    Ok(IncidentTemplate {
        id: str_field("id")?,
        name: str_field("name")?,
        description: str_field("description").unwrap_or_default(),
        departments,
        is_production_hold: bool_field("is_production_hold"),
        photo_required: bool_field("photo_required"),
        department_forms,
    })
}
