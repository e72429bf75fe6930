//! Consumable resources and the selection policy used to mutate them.

use std::cmp::Reverse;

use arbiter_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag carried by resources granted through `give_resource`. Only resources
/// with this tag can be removed again.
pub const TEMPORARY_TAG: &str = "temporary";

/// A consumable owned by one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Identifier.
    pub id: Uuid,
    /// Resource kind, e.g. `spell_slot`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Strength tier used for ordering.
    #[serde(default)]
    pub potency: i64,
    /// True once spent.
    #[serde(default)]
    pub exhausted: bool,
    /// When the resource comes back, e.g. `long_rest`.
    #[serde(default)]
    pub refresh: Option<String>,
    /// Item that supplies this resource, if any.
    #[serde(default)]
    pub origin_item: Option<Uuid>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Resource {
    /// Creates an unspent resource.
    #[must_use]
    pub fn new(resource_type: &str, potency: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_type: resource_type.to_owned(),
            potency,
            exhausted: false,
            refresh: None,
            origin_item: None,
            tags: Vec::new(),
        }
    }

    /// True if the resource was granted temporarily.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.has_tag(TEMPORARY_TAG)
    }

    /// True if the resource carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Content template for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// Resource kind.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Strength tier.
    #[serde(default)]
    pub potency: i64,
    /// Refresh criterion.
    #[serde(default)]
    pub refresh: Option<String>,
    /// Tags copied onto every instance.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ResourceTemplate {
    /// Creates a fresh resource from this template.
    #[must_use]
    pub fn instantiate(&self, origin_item: Option<Uuid>) -> Resource {
        Resource {
            id: Uuid::new_v4(),
            resource_type: self.resource_type.clone(),
            potency: self.potency,
            exhausted: false,
            refresh: self.refresh.clone(),
            origin_item,
            tags: self.tags.clone(),
        }
    }
}

/// Order in which matching resources are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    /// Ascending potency, stable among equals.
    LowFirst,
    /// Descending potency, stable among equals.
    HighFirst,
    /// Uniformly shuffled.
    Random,
}

/// Which resources an exhaust or refresh touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSelection {
    /// Resource kind to match.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Inclusive lower potency bound.
    #[serde(default)]
    pub minimum_potency: Option<i64>,
    /// Inclusive upper potency bound.
    #[serde(default)]
    pub maximum_potency: Option<i64>,
    /// Upper bound on how many resources change; unbounded when absent.
    #[serde(default)]
    pub count: Option<usize>,
    /// Visit order. Always authored, never defaulted.
    pub order: SelectionOrder,
}

impl ResourceSelection {
    /// True if `resource` matches the kind and potency bounds.
    #[must_use]
    pub fn matches(&self, resource: &Resource) -> bool {
        resource.resource_type == self.resource_type
            && self.minimum_potency.is_none_or(|min| resource.potency >= min)
            && self.maximum_potency.is_none_or(|max| resource.potency <= max)
    }

    /// Indices into `resources` to mutate, in visit order, limited to
    /// resources whose exhausted flag equals `exhausted`.
    pub fn select(
        &self,
        resources: &[Resource],
        exhausted: bool,
        rng: &mut dyn DeterministicRng,
    ) -> Vec<usize> {
        let mut candidates: Vec<usize> = resources
            .iter()
            .enumerate()
            .filter(|(_, r)| r.exhausted == exhausted && self.matches(r))
            .map(|(i, _)| i)
            .collect();

        match self.order {
            SelectionOrder::LowFirst => candidates.sort_by_key(|&i| resources[i].potency),
            SelectionOrder::HighFirst => {
                candidates.sort_by_key(|&i| Reverse(resources[i].potency));
            }
            SelectionOrder::Random => shuffle(&mut candidates, rng),
        }

        if let Some(count) = self.count {
            candidates.truncate(count);
        }
        candidates
    }
}

/// Fisher-Yates shuffle driven by the injected RNG.
fn shuffle(items: &mut [usize], rng: &mut dyn DeterministicRng) {
    for i in (1..items.len()).rev() {
        let bound = u32::try_from(i).unwrap_or(u32::MAX);
        let j = usize::try_from(rng.next_u32_range(0, bound)).map_or(i, |j| j.min(i));
        items.swap(i, j);
    }
}
