//! A loaded content pack and its reference checks.

use arbiter_rules::domain::actions::{ActionSpec, TemplateReference};
use arbiter_rules::domain::context::Templates;
use arbiter_rules::domain::operations::Operation;
use serde::Serialize;

/// Template categories a pack defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    /// Authorable action templates.
    Action,
    /// Modifier templates.
    Effect,
    /// Resource templates.
    Resource,
}

impl ContentCategory {
    /// Section key in the pack document.
    #[must_use]
    pub fn section(self) -> &'static str {
        match self {
            Self::Action => "actions",
            Self::Effect => "effects",
            Self::Resource => "resources",
        }
    }
}

/// A unit that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentIssue {
    /// Section the unit came from.
    pub category: ContentCategory,
    /// Template id of the unit.
    pub id: String,
    /// Why it was skipped.
    pub reason: String,
}

/// A template reference that names nothing in the pack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DanglingReference {
    /// Category of the template that holds the reference.
    pub owner_category: ContentCategory,
    /// Id of the template that holds the reference.
    pub owner: String,
    /// Category of the missing template.
    pub category: ContentCategory,
    /// The missing id.
    pub id: String,
}

/// Typed templates loaded from one pack source.
#[derive(Debug, Clone)]
pub struct ContentPack {
    version_hash: String,
    templates: Templates,
    issues: Vec<ContentIssue>,
}

impl ContentPack {
    /// Assembles a pack from already-parsed parts.
    #[must_use]
    pub fn new(version_hash: String, templates: Templates, issues: Vec<ContentIssue>) -> Self {
        Self {
            version_hash,
            templates,
            issues,
        }
    }

    /// Hex SHA-256 of the pack source.
    #[must_use]
    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }

    /// The loaded templates.
    #[must_use]
    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Consumes the pack, keeping only its templates.
    #[must_use]
    pub fn into_templates(self) -> Templates {
        self.templates
    }

    /// Units skipped while loading.
    #[must_use]
    pub fn issues(&self) -> &[ContentIssue] {
        &self.issues
    }

    /// References to effect and resource templates that the pack does not
    /// define, sorted by owner.
    ///
    /// Action templates are searched through every nested branch list.
    /// Effect templates are searched through the actions their
    /// `invoke_action` operations resolve.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut found = Vec::new();

        for (id, spec) in self.templates.actions() {
            self.collect_dangling(ContentCategory::Action, id, spec, &mut found);
        }
        for (id, effect) in self.templates.effects() {
            let invoked = effect
                .filters
                .iter()
                .flat_map(|filter| &filter.operations)
                .filter_map(|operation| match operation {
                    Operation::InvokeAction { action, .. } => Some(action),
                    _ => None,
                });
            for spec in invoked {
                self.collect_dangling(ContentCategory::Effect, id, spec, &mut found);
            }
        }

        found.sort();
        found.dedup();
        found
    }

    fn collect_dangling(
        &self,
        owner_category: ContentCategory,
        owner: &str,
        root: &ActionSpec,
        found: &mut Vec<DanglingReference>,
    ) {
        root.visit(&mut |spec| {
            let missing = match spec.template_reference() {
                Some(TemplateReference::Effect(id)) if !self.templates.has_effect(id) => {
                    Some((ContentCategory::Effect, id))
                }
                Some(TemplateReference::Resource(id)) if !self.templates.has_resource(id) => {
                    Some((ContentCategory::Resource, id))
                }
                _ => None,
            };
            if let Some((category, id)) = missing {
                found.push(DanglingReference {
                    owner_category,
                    owner: owner.to_owned(),
                    category,
                    id: id.to_owned(),
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use arbiter_rules::domain::modifiers::ModifierTemplate;
    use serde_json::json;

    use super::*;

    fn spec(value: serde_json::Value) -> ActionSpec {
        ActionSpec::from_value(value).unwrap()
    }

    fn pack(templates: Templates) -> ContentPack {
        ContentPack::new("hash".to_owned(), templates, Vec::new())
    }

    // --- dangling references ---

    #[test]
    fn test_reports_missing_effect_in_nested_branch() {
        let mut templates = Templates::new();
        templates.insert_action(
            "shove",
            spec(json!({
                "subevent": "ability_contest",
                "source": {"ability": "str"},
                "target": {"ability": "dex"},
                "source_wins": [{"subevent": "give_effect", "effect": "prone"}]
            })),
        );

        let dangling = pack(templates).dangling_references();

        assert_eq!(
            dangling,
            vec![DanglingReference {
                owner_category: ContentCategory::Action,
                owner: "shove".to_owned(),
                category: ContentCategory::Effect,
                id: "prone".to_owned(),
            }]
        );
    }

    #[test]
    fn test_defined_references_are_not_reported() {
        let mut templates = Templates::new();
        templates.insert_effect("prone", ModifierTemplate::default());
        templates.insert_action(
            "trip",
            spec(json!({"subevent": "give_effect", "effect": "prone"})),
        );

        assert!(pack(templates).dangling_references().is_empty());
    }

    #[test]
    fn test_searches_actions_invoked_by_effects() {
        let effect: ModifierTemplate = serde_json::from_value(json!({
            "filters": [{
                "subevent": "attack_roll",
                "operations": [{
                    "function": "invoke_action",
                    "action": {"subevent": "give_resource", "resource": "superiority_die"}
                }]
            }]
        }))
        .unwrap();
        let mut templates = Templates::new();
        templates.insert_effect("battle_master", effect);

        let dangling = pack(templates).dangling_references();

        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].owner_category, ContentCategory::Effect);
        assert_eq!(dangling[0].category, ContentCategory::Resource);
        assert_eq!(dangling[0].id, "superiority_die");
    }

    #[test]
    fn test_repeated_reference_is_reported_once() {
        let mut templates = Templates::new();
        templates.insert_action(
            "curse",
            spec(json!({
                "subevent": "saving_throw",
                "ability": "wis",
                "dc": 13,
                "fail": [
                    {"subevent": "give_effect", "effect": "hexed"},
                    {"subevent": "give_effect", "effect": "hexed"}
                ]
            })),
        );

        assert_eq!(pack(templates).dangling_references().len(), 1);
    }
}
