//! Targets: output templates and the variables they need.

use std::collections::BTreeSet;

use crate::core::ArgumentDictionary;
use crate::templating::utils::extract_references;

/// Extra requirements that apply when `switch` resolves to `case`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalRequirement {
    /// Variable whose value selects the requirement
    pub switch: String,
    /// Value that activates it
    pub case: String,
    /// Names that become required
    pub names: BTreeSet<String>,
}

/// An output document template with its required variables.
///
/// Names come from two places: the explicit requirement list, and the names the
/// template references. A referenced name that is also listed under a conditional
/// requirement is only required while that condition holds; explicit names are
/// always required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
    explicit: BTreeSet<String>,
    referenced: BTreeSet<String>,
    required: BTreeSet<String>,
    template: String,
    conditions: Vec<ConditionalRequirement>,
}

impl Target {
    /// Creates a target with an explicit required set.
    pub fn new<I, S>(name: impl Into<String>, required: I, template: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let explicit: BTreeSet<String> = required.into_iter().map(Into::into).collect();
        Self {
            name: name.into(),
            required: explicit.clone(),
            explicit,
            referenced: BTreeSet::new(),
            template: template.into(),
            conditions: Vec::new(),
        }
    }

    /// Creates a target requiring every variable its template references.
    pub fn from_template(name: impl Into<String>, template: impl Into<String>) -> Self {
        let template = template.into();
        let referenced = extract_references(&template);
        Self {
            name: name.into(),
            explicit: BTreeSet::new(),
            required: referenced.clone(),
            referenced,
            template,
            conditions: Vec::new(),
        }
    }

    /// Adds names to the explicit required set.
    #[must_use]
    pub fn requiring<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit.extend(names.into_iter().map(Into::into));
        self.refresh_required();
        self
    }

    /// Adds requirements that only apply when `switch` resolves to `case`.
    ///
    /// Template references among `names` stop being unconditionally required.
    #[must_use]
    pub fn when<I, S>(mut self, switch: impl Into<String>, case: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions.push(ConditionalRequirement {
            switch: switch.into(),
            case: case.into(),
            names: names.into_iter().map(Into::into).collect(),
        });
        self.refresh_required();
        self
    }

    fn refresh_required(&mut self) {
        let conditional: BTreeSet<&String> = self.conditions.iter().flat_map(|c| c.names.iter()).collect();
        self.required = self
            .referenced
            .iter()
            .filter(|name| !conditional.contains(name))
            .chain(self.explicit.iter())
            .cloned()
            .collect();
    }

    /// Target name; also the output document name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unconditionally required variables.
    #[must_use]
    pub fn required_variables(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Template body.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Conditional requirements in declaration order.
    #[must_use]
    pub fn conditions(&self) -> &[ConditionalRequirement] {
        &self.conditions
    }

    /// Every variable required given the values resolved so far.
    #[must_use]
    pub fn active_requirements(&self, values: &ArgumentDictionary) -> BTreeSet<String> {
        let mut names = self.required.clone();
        for condition in &self.conditions {
            if values.get(&condition.switch) == Some(&condition.case) {
                names.extend(condition.names.iter().cloned());
            }
        }
        names
    }
}
