//! Content representation of an authorable action.
//!
//! The `subevent` key selects the kind; the remaining keys are the kind's
//! payload. Parsing goes through [`ActionSpec::from_value`] so that an
//! unrecognised kind anywhere in the tree surfaces as `UnknownActionKind`
//! instead of a generic parse failure.

use arbiter_core::error::RulesError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::attack::{AttackRoll, AttackRollRequest};
use super::checks::{
    AbilityCheck, AbilityCheckRequest, AbilityContest, AbilityContestRequest, Contest,
    ContestRequest,
};
use super::damage::{DealDamage, DealDamageRequest};
use super::effects::{EffectRequest, GiveEffect, RemoveEffect};
use super::resources::{
    ExhaustResource, GiveResource, GiveResourceRequest, RefreshResource, TakeResource,
    TakeResourceRequest,
};
use super::restoration::{
    GiveHealing, GiveHealingRequest, GiveTemporaryHitPoints, GiveTemporaryHitPointsRequest,
};
use super::saving_throw::{SavingThrow, SavingThrowRequest};
use super::{Action, ActionHeader, ActionKind};
use crate::domain::resources::ResourceSelection;

const KIND_KEY: &str = "subevent";
const TAGS_KEY: &str = "tags";

/// Kind-specific payload of an authorable action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "subevent", rename_all = "snake_case")]
pub enum ActionBody {
    AbilityCheck(AbilityCheckRequest),
    AttackRoll(AttackRollRequest),
    SavingThrow(SavingThrowRequest),
    AbilityContest(AbilityContestRequest),
    Contest(ContestRequest),
    DealDamage(DealDamageRequest),
    GiveHealing(GiveHealingRequest),
    GiveTemporaryHitPoints(GiveTemporaryHitPointsRequest),
    GiveEffect(EffectRequest),
    RemoveEffect(EffectRequest),
    ExhaustResource(ResourceSelection),
    RefreshResource(ResourceSelection),
    GiveResource(GiveResourceRequest),
    TakeResource(TakeResourceRequest),
}

impl ActionBody {
    /// The kind this payload instantiates.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::AbilityCheck(_) => ActionKind::AbilityCheck,
            Self::AttackRoll(_) => ActionKind::AttackRoll,
            Self::SavingThrow(_) => ActionKind::SavingThrow,
            Self::AbilityContest(_) => ActionKind::AbilityContest,
            Self::Contest(_) => ActionKind::Contest,
            Self::DealDamage(_) => ActionKind::DealDamage,
            Self::GiveHealing(_) => ActionKind::GiveHealing,
            Self::GiveTemporaryHitPoints(_) => ActionKind::GiveTemporaryHitPoints,
            Self::GiveEffect(_) => ActionKind::GiveEffect,
            Self::RemoveEffect(_) => ActionKind::RemoveEffect,
            Self::ExhaustResource(_) => ActionKind::ExhaustResource,
            Self::RefreshResource(_) => ActionKind::RefreshResource,
            Self::GiveResource(_) => ActionKind::GiveResource,
            Self::TakeResource(_) => ActionKind::TakeResource,
        }
    }
}

/// A template reference carried by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateReference<'a> {
    /// An effect template id.
    Effect(&'a str),
    /// A resource template id.
    Resource(&'a str),
}

/// An authorable action as content describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSpec {
    /// Tags added to the action on top of those it inherits.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Kind and payload.
    #[serde(flatten)]
    pub body: ActionBody,
}

fn malformed(kind: &str, reason: impl ToString) -> RulesError {
    RulesError::MalformedContent {
        kind: kind.to_owned(),
        reason: reason.to_string(),
    }
}

fn parse<T: DeserializeOwned>(kind: ActionKind, body: Map<String, Value>) -> Result<T, RulesError> {
    serde_json::from_value(Value::Object(body)).map_err(|e| malformed(kind.key(), e))
}

fn authorable_kind(key: &str) -> Result<ActionKind, RulesError> {
    ActionKind::from_key(key)
        .filter(|kind| kind.is_authorable())
        .ok_or_else(|| RulesError::UnknownActionKind(key.to_owned()))
}

/// Rejects the first nested `subevent` naming no authorable kind.
fn check_nested_kinds(value: &Value) -> Result<(), RulesError> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(key)) = map.get(KIND_KEY) {
                authorable_kind(key)?;
            }
            map.values().try_for_each(check_nested_kinds)
        }
        Value::Array(items) => items.iter().try_for_each(check_nested_kinds),
        _ => Ok(()),
    }
}

impl ActionSpec {
    /// Wraps a payload with no extra tags.
    #[must_use]
    pub fn new(body: ActionBody) -> Self {
        Self {
            tags: Vec::new(),
            body,
        }
    }

    /// Adds a tag (builder pattern).
    #[must_use]
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_owned());
        self
    }

    /// The kind this spec instantiates.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.body.kind()
    }

    /// Parses a content value.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownActionKind` if this action or any nested
    /// one names an unrecognised or internal kind, and
    /// `RulesError::MalformedContent` for any other shape problem.
    pub fn from_value(value: Value) -> Result<Self, RulesError> {
        let Value::Object(mut map) = value else {
            return Err(malformed("action", "expected a mapping"));
        };
        let kind = match map.remove(KIND_KEY) {
            Some(Value::String(key)) => authorable_kind(&key)?,
            Some(_) => return Err(malformed("action", "`subevent` must be a string")),
            None => return Err(malformed("action", "missing `subevent`")),
        };
        let tags = match map.remove(TAGS_KEY) {
            Some(value) => serde_json::from_value(value).map_err(|e| malformed(kind.key(), e))?,
            None => Vec::new(),
        };
        map.values().try_for_each(check_nested_kinds)?;

        let body = match kind {
            ActionKind::AbilityCheck => ActionBody::AbilityCheck(parse(kind, map)?),
            ActionKind::AttackRoll => ActionBody::AttackRoll(parse(kind, map)?),
            ActionKind::SavingThrow => ActionBody::SavingThrow(parse(kind, map)?),
            ActionKind::AbilityContest => ActionBody::AbilityContest(parse(kind, map)?),
            ActionKind::Contest => ActionBody::Contest(parse(kind, map)?),
            ActionKind::DealDamage => ActionBody::DealDamage(parse(kind, map)?),
            ActionKind::GiveHealing => ActionBody::GiveHealing(parse(kind, map)?),
            ActionKind::GiveTemporaryHitPoints => {
                ActionBody::GiveTemporaryHitPoints(parse(kind, map)?)
            }
            ActionKind::GiveEffect => ActionBody::GiveEffect(parse(kind, map)?),
            ActionKind::RemoveEffect => ActionBody::RemoveEffect(parse(kind, map)?),
            ActionKind::ExhaustResource => ActionBody::ExhaustResource(parse(kind, map)?),
            ActionKind::RefreshResource => ActionBody::RefreshResource(parse(kind, map)?),
            ActionKind::GiveResource => ActionBody::GiveResource(parse(kind, map)?),
            ActionKind::TakeResource => ActionBody::TakeResource(parse(kind, map)?),
            internal => return Err(RulesError::UnknownActionKind(internal.key().to_owned())),
        };
        Ok(Self { tags, body })
    }

    /// Creates a fresh, unprepared action.
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn Action> {
        let mut header = ActionHeader::new(self.kind());
        header.tags.extend(self.tags.iter().cloned());
        match &self.body {
            ActionBody::AbilityCheck(r) => Box::new(AbilityCheck::with_header(header, r.clone())),
            ActionBody::AttackRoll(r) => Box::new(AttackRoll::with_header(header, r.clone())),
            ActionBody::SavingThrow(r) => Box::new(SavingThrow::with_header(header, r.clone())),
            ActionBody::AbilityContest(r) => {
                Box::new(AbilityContest::with_header(header, r.clone()))
            }
            ActionBody::Contest(r) => Box::new(Contest::with_header(header, r.clone())),
            ActionBody::DealDamage(r) => Box::new(DealDamage::with_header(header, r.clone())),
            ActionBody::GiveHealing(r) => Box::new(GiveHealing::with_header(header, r.clone())),
            ActionBody::GiveTemporaryHitPoints(r) => {
                Box::new(GiveTemporaryHitPoints::with_header(header, r.clone()))
            }
            ActionBody::GiveEffect(r) => Box::new(GiveEffect::with_header(header, r.clone())),
            ActionBody::RemoveEffect(r) => Box::new(RemoveEffect::with_header(header, r.clone())),
            ActionBody::ExhaustResource(s) => {
                Box::new(ExhaustResource::with_header(header, s.clone()))
            }
            ActionBody::RefreshResource(s) => {
                Box::new(RefreshResource::with_header(header, s.clone()))
            }
            ActionBody::GiveResource(r) => Box::new(GiveResource::with_header(header, r.clone())),
            ActionBody::TakeResource(r) => Box::new(TakeResource::with_header(header, r.clone())),
        }
    }

    /// Branch lists directly under this action.
    #[must_use]
    pub fn children(&self) -> Vec<&ActionSpec> {
        let branches: [&[ActionSpec]; 2] = match &self.body {
            ActionBody::AbilityCheck(r) => [r.pass.as_slice(), r.fail.as_slice()],
            ActionBody::SavingThrow(r) => [r.pass.as_slice(), r.fail.as_slice()],
            ActionBody::AttackRoll(r) => [r.hit.as_slice(), r.miss.as_slice()],
            ActionBody::AbilityContest(r) => [r.source_wins.as_slice(), r.target_wins.as_slice()],
            ActionBody::Contest(r) => [r.source_wins.as_slice(), r.target_wins.as_slice()],
            _ => return Vec::new(),
        };
        branches.into_iter().flatten().collect()
    }

    /// Visits this action and every nested branch action, depth first.
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a ActionSpec)) {
        visitor(self);
        for child in self.children() {
            child.visit(visitor);
        }
    }

    /// The template this action names, if any.
    #[must_use]
    pub fn template_reference(&self) -> Option<TemplateReference<'_>> {
        match &self.body {
            ActionBody::GiveEffect(r) | ActionBody::RemoveEffect(r) => {
                Some(TemplateReference::Effect(&r.effect))
            }
            ActionBody::GiveResource(r) => Some(TemplateReference::Resource(&r.resource)),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ActionSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
