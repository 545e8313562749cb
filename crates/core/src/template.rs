#![forbid(unsafe_code)]

use crate::ids::DepartmentCode;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestedForm {
    pub form_id: String,
    pub form_type: String,
    pub route: String,
    pub required: bool,
}

impl SuggestedForm {
    pub fn new(form_id: &str, form_type: &str, route: &str, required: bool) -> Self {
        Self {
            form_id: form_id.to_string(),
            form_type: form_type.to_string(),
            route: route.to_string(),
            required,
        }
    }
}

/// Incident type definition. Posts keep a snapshot of the template they were created from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncidentTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Assigned departments in declaration order, without duplicates.
    pub departments: Vec<DepartmentCode>,
    pub is_production_hold: bool,
    pub photo_required: bool,
    pub department_forms: BTreeMap<DepartmentCode, Vec<SuggestedForm>>,
}

impl IncidentTemplate {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: template_slug(&name),
            name,
            description: description.into(),
            departments: Vec::new(),
            is_production_hold: false,
            photo_required: false,
            department_forms: BTreeMap::new(),
        }
    }

    pub fn with_department(mut self, code: DepartmentCode, forms: Vec<SuggestedForm>) -> Self {
        if !self.departments.contains(&code) {
            self.departments.push(code.clone());
        }
        if !forms.is_empty() {
            self.department_forms.entry(code).or_default().extend(forms);
        }
        self
    }

    pub fn with_production_hold(mut self, value: bool) -> Self {
        self.is_production_hold = value;
        self
    }

    pub fn with_photo_required(mut self, value: bool) -> Self {
        self.photo_required = value;
        self
    }

    pub fn forms_for(&self, code: &DepartmentCode) -> &[SuggestedForm] {
        self.department_forms
            .get(code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A department needs a distinct sign-off when any of its suggested forms is required.
    pub fn requires_signoff(&self, code: &DepartmentCode) -> bool {
        self.forms_for(code).iter().any(|form| form.required)
    }
}

fn template_slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "template".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateLookupError {
    NotFound { query: String },
}

impl TemplateLookupError {
    pub fn message(&self) -> String {
        match self {
            Self::NotFound { query } => format!("no incident template matches '{query}'"),
        }
    }
}

/// Ordered template catalog. Registration order decides fuzzy-match ties.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<IncidentTemplate>,
}

impl TemplateRegistry {
    pub fn new(templates: Vec<IncidentTemplate>) -> Self {
        let mut registry = Self::default();
        for template in templates {
            registry.register(template);
        }
        registry
    }

    /// Later registrations with an already-known name replace the earlier entry in place.
    pub fn register(&mut self, template: IncidentTemplate) {
        if let Some(existing) = self
            .templates
            .iter_mut()
            .find(|existing| existing.name == template.name)
        {
            *existing = template;
            return;
        }
        self.templates.push(template);
    }

    pub fn templates(&self) -> &[IncidentTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Exact name (or id) match first, then case-insensitive substring match in either
    /// direction. The first registered template wins among substring matches.
    pub fn lookup(&self, query: &str) -> Result<&IncidentTemplate, TemplateLookupError> {
        let trimmed = query.trim();
        let not_found = || TemplateLookupError::NotFound {
            query: trimmed.to_string(),
        };
        if trimmed.is_empty() {
            return Err(not_found());
        }

        if let Some(exact) = self
            .templates
            .iter()
            .find(|template| template.name == trimmed || template.id == trimmed)
        {
            return Ok(exact);
        }

        let needle = trimmed.to_lowercase();
        self.templates
            .iter()
            .find(|template| {
                let name = template.name.to_lowercase();
                name.contains(&needle) || needle.contains(&name)
            })
            .ok_or_else(not_found)
    }

    pub fn builtin() -> Self {
        Self::new(builtin_templates())
    }
}

fn dept(code: &'static str) -> DepartmentCode {
    DepartmentCode::from_static(code)
}

fn builtin_templates() -> Vec<IncidentTemplate> {
    vec![
        IncidentTemplate::new(
            "Chemical Spill",
            "Uncontrolled release of a process or cleaning chemical.",
        )
        .with_department(
            dept("QUAL"),
            vec![SuggestedForm::new("qa-hold-tag", "hold_tag", "/quality/hold-tags/new", false)],
        )
        .with_department(
            dept("SAFE"),
            vec![
                SuggestedForm::new("spill-report", "incident_report", "/safety/incidents/new", true),
                SuggestedForm::new("sds-review", "sds_review", "/safety/sds", false),
            ],
        )
        .with_department(
            dept("SANI"),
            vec![SuggestedForm::new(
                "sanitation-verification",
                "sanitation_verification",
                "/sanitation/verifications/new",
                true,
            )],
        )
        .with_department(
            dept("MAINT"),
            vec![SuggestedForm::new("work-order", "work_order", "/maintenance/work-orders/new", false)],
        )
        .with_department(dept("PROD"), Vec::new())
        .with_production_hold(true)
        .with_photo_required(true),
        IncidentTemplate::new(
            "Foreign Material",
            "Foreign material found in product or on a product-contact surface.",
        )
        .with_department(
            dept("QUAL"),
            vec![SuggestedForm::new("fm-investigation", "foreign_material", "/quality/foreign-material/new", true)],
        )
        .with_department(dept("PROD"), Vec::new())
        .with_department(
            dept("MAINT"),
            vec![SuggestedForm::new("work-order", "work_order", "/maintenance/work-orders/new", false)],
        )
        .with_production_hold(true)
        .with_photo_required(true),
        IncidentTemplate::new(
            "Allergen Cross-Contact",
            "Undeclared allergen exposure on a shared line.",
        )
        .with_department(
            dept("QUAL"),
            vec![SuggestedForm::new("allergen-review", "allergen_review", "/quality/allergens/new", true)],
        )
        .with_department(
            dept("SANI"),
            vec![SuggestedForm::new(
                "sanitation-verification",
                "sanitation_verification",
                "/sanitation/verifications/new",
                true,
            )],
        )
        .with_department(dept("PROD"), Vec::new())
        .with_production_hold(true),
        IncidentTemplate::new(
            "Equipment Failure",
            "Breakdown of production equipment.",
        )
        .with_department(
            dept("MAINT"),
            vec![SuggestedForm::new("work-order", "work_order", "/maintenance/work-orders/new", false)],
        )
        .with_department(dept("PROD"), Vec::new())
        .with_production_hold(true),
        IncidentTemplate::new(
            "Injury",
            "Employee injury or near miss.",
        )
        .with_department(
            dept("SAFE"),
            vec![SuggestedForm::new("injury-report", "incident_report", "/safety/incidents/new", true)],
        )
        .with_department(
            dept("HR"),
            vec![SuggestedForm::new("hr-follow-up", "hr_follow_up", "/hr/follow-ups/new", false)],
        )
        .with_photo_required(true),
        IncidentTemplate::new(
            "Pest Sighting",
            "Pest activity observed inside the facility.",
        )
        .with_department(
            dept("SANI"),
            vec![SuggestedForm::new("pest-log", "pest_log", "/sanitation/pest-log/new", false)],
        )
        .with_department(dept("QUAL"), Vec::new())
        .with_photo_required(true),
        IncidentTemplate::new(
            "Temperature Deviation",
            "Storage or process temperature outside its limits.",
        )
        .with_department(
            dept("QUAL"),
            vec![SuggestedForm::new("deviation-report", "deviation_report", "/quality/deviations/new", false)],
        )
        .with_department(dept("WH"), Vec::new()),
    ]
}
