//! Resolvable actions and their lifecycle.
//!
//! Every action moves through `Unprepared -> Prepared -> Submitted ->
//! Resolved`. [`ActionExt::prepare`] runs target-independent setup once;
//! [`ActionExt::invoke`] checks the declared kind, submits the action to the
//! modifier protocol and then runs the kind-specific resolution, which may
//! resolve further nested actions through [`resolve_nested`].
//!
//! Concrete actions do not inherit from one another. They compose a
//! [`Calculation`] or [`Roll`] where they need one and expose capabilities
//! through the accessor methods on [`Action`], which default to `None`.

use std::fmt;

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calculation::Calculation;
use super::context::Context;
use super::objects::{Ability, ProficiencyLevel};
use super::pool::{TypedCollection, TypedRoll, Vampirism};
use super::roll::Roll;

/// Expands to the `kind`, `header` and `header_mut` methods of an
/// [`Action`] impl for a struct with a `header` field.
macro_rules! header_accessors {
    ($kind:expr) => {
        fn kind(&self) -> ActionKind {
            $kind
        }

        fn header(&self) -> &ActionHeader {
            &self.header
        }

        fn header_mut(&mut self) -> &mut ActionHeader {
            &mut self.header
        }
    };
}

mod attack;
mod calculations;
mod checks;
mod damage;
mod effects;
mod resources;
mod restoration;
mod saving_throw;
mod spec;

pub use attack::{AttackOutcome, AttackRoll, AttackRollRequest, AttackType};
pub use calculations::{
    CalculateAbilityScore, CalculateArmorClass, CalculateCriticalHitThreshold,
    CalculateDifficultyClass, CalculateProficiencyBonus, GetProficiency,
};
pub use checks::{
    AbilityCheck, AbilityCheckRequest, AbilityContest, AbilityContestRequest, Contest,
    ContestRequest, ContestSide, ContestWinner, Opposition, decide,
};
pub use damage::{
    AffinityGrants, CriticalHitDamageCollection, DamageAffinity, DamageCollection,
    DamageDelivery, DamageRoll, DealDamage, DealDamageRequest,
};
pub use effects::{EffectRequest, GiveEffect, RemoveEffect};
pub use resources::{
    ExhaustResource, GiveResource, GiveResourceRequest, RefreshResource, TakeResource,
    TakeResourceRequest,
};
pub use restoration::{
    GiveHealing, GiveHealingRequest, GiveTemporaryHitPoints, GiveTemporaryHitPointsRequest,
    HealingCollection, HealingDelivery, HealingRoll, TemporaryHitPointCollection,
    TemporaryHitPointDelivery, TemporaryHitPointRoll,
};
pub use saving_throw::{SavingThrow, SavingThrowRequest};
pub use spec::{ActionBody, ActionSpec, TemplateReference};

/// Tag added to the target-agnostic damage pass.
pub const BASE_DAMAGE_TAG: &str = "base_damage_collection";

/// Tag added to the per-victim damage pass.
pub const TARGET_DAMAGE_TAG: &str = "target_damage_collection";

/// Every action kind the engine can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    // internal
    CalculateAbilityScore,
    CalculateProficiencyBonus,
    GetProficiency,
    CalculateDifficultyClass,
    CalculateArmorClass,
    CalculateCriticalHitThreshold,
    DamageCollection,
    CriticalHitDamageCollection,
    DamageRoll,
    DamageAffinity,
    DamageDelivery,
    HealingCollection,
    HealingRoll,
    HealingDelivery,
    TemporaryHitPointCollection,
    TemporaryHitPointRoll,
    TemporaryHitPointDelivery,
    // authorable
    AbilityCheck,
    AttackRoll,
    SavingThrow,
    AbilityContest,
    Contest,
    DealDamage,
    GiveHealing,
    GiveTemporaryHitPoints,
    GiveEffect,
    RemoveEffect,
    ExhaustResource,
    RefreshResource,
    GiveResource,
    TakeResource,
}

impl ActionKind {
    /// Every kind, internal kinds first.
    pub const ALL: [Self; 31] = [
        Self::CalculateAbilityScore,
        Self::CalculateProficiencyBonus,
        Self::GetProficiency,
        Self::CalculateDifficultyClass,
        Self::CalculateArmorClass,
        Self::CalculateCriticalHitThreshold,
        Self::DamageCollection,
        Self::CriticalHitDamageCollection,
        Self::DamageRoll,
        Self::DamageAffinity,
        Self::DamageDelivery,
        Self::HealingCollection,
        Self::HealingRoll,
        Self::HealingDelivery,
        Self::TemporaryHitPointCollection,
        Self::TemporaryHitPointRoll,
        Self::TemporaryHitPointDelivery,
        Self::AbilityCheck,
        Self::AttackRoll,
        Self::SavingThrow,
        Self::AbilityContest,
        Self::Contest,
        Self::DealDamage,
        Self::GiveHealing,
        Self::GiveTemporaryHitPoints,
        Self::GiveEffect,
        Self::RemoveEffect,
        Self::ExhaustResource,
        Self::RefreshResource,
        Self::GiveResource,
        Self::TakeResource,
    ];

    /// Stable string key.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::CalculateAbilityScore => "calculate_ability_score",
            Self::CalculateProficiencyBonus => "calculate_proficiency_bonus",
            Self::GetProficiency => "get_proficiency",
            Self::CalculateDifficultyClass => "calculate_difficulty_class",
            Self::CalculateArmorClass => "calculate_armor_class",
            Self::CalculateCriticalHitThreshold => "calculate_critical_hit_threshold",
            Self::DamageCollection => "damage_collection",
            Self::CriticalHitDamageCollection => "critical_hit_damage_collection",
            Self::DamageRoll => "damage_roll",
            Self::DamageAffinity => "damage_affinity",
            Self::DamageDelivery => "damage_delivery",
            Self::HealingCollection => "healing_collection",
            Self::HealingRoll => "healing_roll",
            Self::HealingDelivery => "healing_delivery",
            Self::TemporaryHitPointCollection => "temporary_hit_point_collection",
            Self::TemporaryHitPointRoll => "temporary_hit_point_roll",
            Self::TemporaryHitPointDelivery => "temporary_hit_point_delivery",
            Self::AbilityCheck => "ability_check",
            Self::AttackRoll => "attack_roll",
            Self::SavingThrow => "saving_throw",
            Self::AbilityContest => "ability_contest",
            Self::Contest => "contest",
            Self::DealDamage => "deal_damage",
            Self::GiveHealing => "give_healing",
            Self::GiveTemporaryHitPoints => "give_temporary_hit_points",
            Self::GiveEffect => "give_effect",
            Self::RemoveEffect => "remove_effect",
            Self::ExhaustResource => "exhaust_resource",
            Self::RefreshResource => "refresh_resource",
            Self::GiveResource => "give_resource",
            Self::TakeResource => "take_resource",
        }
    }

    /// Looks a kind up by key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.key() == key)
    }

    /// True for kinds content may author directly.
    #[must_use]
    pub fn is_authorable(self) -> bool {
        matches!(
            self,
            Self::AbilityCheck
                | Self::AttackRoll
                | Self::SavingThrow
                | Self::AbilityContest
                | Self::Contest
                | Self::DealDamage
                | Self::GiveHealing
                | Self::GiveTemporaryHitPoints
                | Self::GiveEffect
                | Self::RemoveEffect
                | Self::ExhaustResource
                | Self::RefreshResource
                | Self::GiveResource
                | Self::TakeResource
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    /// Built, not yet prepared.
    Unprepared,
    /// Target-independent setup done.
    Prepared,
    /// Modifiers have run.
    Submitted,
    /// Resolution finished.
    Resolved,
}

impl ActionPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Unprepared => "unprepared",
            Self::Prepared => "prepared",
            Self::Submitted => "submitted",
            Self::Resolved => "resolved",
        }
    }
}

/// State every action carries regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionHeader {
    /// Kind recorded at construction, checked against the implementation on
    /// invoke.
    pub declared_kind: ActionKind,
    /// Ordered tags; duplicates are permitted.
    pub tags: Vec<String>,
    /// Acting object.
    pub source: Option<Uuid>,
    /// Object acted upon.
    pub target: Option<Uuid>,
    /// Item whose use caused the action.
    pub origin_item: Option<Uuid>,
    /// Identities of modifiers that already applied.
    pub applied_modifiers: Vec<Uuid>,
    phase: ActionPhase,
}

impl ActionHeader {
    /// A fresh, unprepared header.
    #[must_use]
    pub fn new(declared_kind: ActionKind) -> Self {
        Self {
            declared_kind,
            tags: Vec::new(),
            source: None,
            target: None,
            origin_item: None,
            applied_modifiers: Vec::new(),
            phase: ActionPhase::Unprepared,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ActionPhase {
        self.phase
    }

    /// True if the action carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Appends a tag.
    pub fn add_tag(&mut self, tag: &str) {
        self.tags.push(tag.to_owned());
    }

    /// True if the modifier with `id` already applied to this action.
    #[must_use]
    pub fn has_applied(&self, id: Uuid) -> bool {
        self.applied_modifiers.contains(&id)
    }

    /// The bound source.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::MissingBinding` if no source is bound.
    pub fn source(&self) -> Result<Uuid, RulesError> {
        self.source.ok_or(RulesError::MissingBinding {
            kind: self.declared_kind.key(),
            role: "source",
        })
    }

    /// The bound target.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::MissingBinding` if no target is bound.
    pub fn target(&self) -> Result<Uuid, RulesError> {
        self.target.ok_or(RulesError::MissingBinding {
            kind: self.declared_kind.key(),
            role: "target",
        })
    }

    fn expect_phase(&self, kind: ActionKind, expected: ActionPhase) -> Result<(), RulesError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(RulesError::InvalidPhase {
                kind: kind.key(),
                expected: expected.as_str(),
                actual: self.phase.as_str(),
            })
        }
    }
}

/// Actions a modifier can cancel. Resolution checks the flag before doing
/// the action's real work.
pub trait Cancelable {
    /// True once canceled.
    fn is_canceled(&self) -> bool;

    /// Sets the flag.
    fn cancel(&mut self);
}

/// Actions made with a particular ability.
pub trait HasAbility {
    /// The ability.
    fn ability(&self) -> Ability;
}

/// Actions that resolve to a single number.
pub trait YieldsValue {
    /// The resolved number.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::MissingBase` if read before resolution.
    fn value(&self) -> Result<i64, RulesError>;
}

/// Object-safe cloning for boxed actions.
pub trait ActionClone {
    /// Clones into a box, keeping the header and its modifier history.
    fn clone_box(&self) -> Box<dyn Action>;
}

impl<T: Action + Clone + 'static> ActionClone for T {
    fn clone_box(&self) -> Box<dyn Action> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Action> {
    fn clone(&self) -> Self {
        (**self).clone_box()
    }
}

/// One resolvable action kind.
pub trait Action: ActionClone + fmt::Debug {
    /// The implementation's kind.
    fn kind(&self) -> ActionKind;

    /// Shared state.
    fn header(&self) -> &ActionHeader;

    /// Shared state, mutable.
    fn header_mut(&mut self) -> &mut ActionHeader;

    /// Target-independent setup. Runs once, before any target is bound.
    ///
    /// # Errors
    ///
    /// Returns any error raised while computing defaults.
    fn on_prepare(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    /// Kind-specific resolution, after modifiers have run.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the resolution or a nested action. Side
    /// effects committed before the error are kept.
    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError>;

    /// Calculation capability.
    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        None
    }

    /// d20 roll capability.
    fn roll_mut(&mut self) -> Option<&mut Roll> {
        None
    }

    /// Cancellation capability.
    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        None
    }

    /// Ability capability.
    fn as_has_ability(&self) -> Option<&dyn HasAbility> {
        None
    }

    /// Unrolled damage pool.
    fn damage_collection_mut(&mut self) -> Option<&mut TypedCollection> {
        None
    }

    /// Rolled damage pool.
    fn damage_roll_mut(&mut self) -> Option<&mut TypedRoll> {
        None
    }

    /// Unrolled healing pool.
    fn healing_collection_mut(&mut self) -> Option<&mut TypedCollection> {
        None
    }

    /// Rolled healing pool.
    fn healing_roll_mut(&mut self) -> Option<&mut TypedRoll> {
        None
    }

    /// Unrolled temporary hit point pool.
    fn temporary_hit_point_collection_mut(&mut self) -> Option<&mut TypedCollection> {
        None
    }

    /// Rolled temporary hit point pool.
    fn temporary_hit_point_roll_mut(&mut self) -> Option<&mut TypedRoll> {
        None
    }

    /// Damage immunity/resistance/vulnerability grants.
    fn affinity_mut(&mut self) -> Option<&mut AffinityGrants> {
        None
    }

    /// Proficiency level under query.
    fn proficiency_mut(&mut self) -> Option<&mut ProficiencyLevel> {
        None
    }

    /// Vampiric healing setting.
    fn vampirism_mut(&mut self) -> Option<&mut Option<Vampirism>> {
        None
    }
}

/// Lifecycle driver implemented for every action.
pub trait ActionExt: Action {
    /// Runs target-independent setup. Must be called exactly once.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::InvalidPhase` if already prepared, or any error
    /// raised by the setup itself.
    fn prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError>;

    /// Submits the action to the modifier protocol and resolves it.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::KindMismatch` if the declared kind disagrees
    /// with the implementation, `RulesError::InvalidPhase` if the action is
    /// not freshly prepared, `RulesError::NestingTooDeep` past the depth
    /// limit, or any error raised during resolution.
    fn invoke(&mut self, ctx: &mut Context) -> Result<(), RulesError>;
}

impl<T: Action + ?Sized> ActionExt for T {
    fn prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.header()
            .expect_phase(self.kind(), ActionPhase::Unprepared)?;
        self.on_prepare(ctx)?;
        self.header_mut().phase = ActionPhase::Prepared;
        Ok(())
    }

    fn invoke(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        let declared = self.header().declared_kind;
        if declared != self.kind() {
            return Err(RulesError::KindMismatch {
                declared: declared.key(),
                implemented: self.kind().key(),
            });
        }
        self.header()
            .expect_phase(self.kind(), ActionPhase::Prepared)?;

        ctx.enter()?;
        let result = submit_and_run(self, ctx);
        ctx.leave();
        result
    }
}

fn submit_and_run<A: Action + ?Sized>(action: &mut A, ctx: &mut Context) -> Result<(), RulesError> {
    ctx.process_action(action)?;
    action.header_mut().phase = ActionPhase::Submitted;
    action.run(ctx)?;
    action.header_mut().phase = ActionPhase::Resolved;
    Ok(())
}

/// Who a nested action is bound to and which tags it inherits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    /// Acting object.
    pub source: Option<Uuid>,
    /// Object acted upon.
    pub target: Option<Uuid>,
    /// Item whose use caused the action.
    pub origin_item: Option<Uuid>,
    /// Tags prepended to the nested action's own tags.
    pub tags: Vec<String>,
}

impl Binding {
    /// An empty binding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inherits source, target, origin item and every tag of `parent`.
    #[must_use]
    pub fn inherit(parent: &ActionHeader) -> Self {
        Self {
            source: parent.source,
            target: parent.target,
            origin_item: parent.origin_item,
            tags: parent.tags.clone(),
        }
    }

    /// Replaces the source (builder pattern).
    #[must_use]
    pub fn with_source(mut self, source: Option<Uuid>) -> Self {
        self.source = source;
        self
    }

    /// Replaces the target (builder pattern).
    #[must_use]
    pub fn with_target(mut self, target: Option<Uuid>) -> Self {
        self.target = target;
        self
    }

    /// Replaces the origin item (builder pattern).
    #[must_use]
    pub fn with_origin_item(mut self, origin_item: Option<Uuid>) -> Self {
        self.origin_item = origin_item;
        self
    }

    /// Binds source, origin item and inherited tags. Called before
    /// `prepare`.
    pub fn bind_before_prepare(&self, header: &mut ActionHeader) {
        header.source = self.source;
        header.origin_item = self.origin_item;
        if !self.tags.is_empty() {
            let own = std::mem::take(&mut header.tags);
            header.tags = self.tags.iter().cloned().chain(own).collect();
        }
    }

    /// Binds the target. Called after `prepare`.
    pub fn bind_target(&self, header: &mut ActionHeader) {
        header.target = self.target;
    }
}

/// Binds, prepares and invokes a nested action in one step.
///
/// # Errors
///
/// Returns any lifecycle or resolution error of the nested action.
pub fn resolve_nested<A: Action + ?Sized>(
    action: &mut A,
    binding: &Binding,
    ctx: &mut Context,
) -> Result<(), RulesError> {
    binding.bind_before_prepare(action.header_mut());
    action.prepare(ctx)?;
    binding.bind_target(action.header_mut());
    action.invoke(ctx)
}

/// Resolves every action of a content branch list, inheriting `parent`.
///
/// # Errors
///
/// Stops at and returns the first error; earlier branch actions keep their
/// effects.
pub(crate) fn run_branch(
    ctx: &mut Context,
    parent: &ActionHeader,
    branch: &[ActionSpec],
) -> Result<(), RulesError> {
    let binding = Binding::inherit(parent);
    for spec in branch {
        ctx.invoke_spec(spec, &binding)?;
    }
    Ok(())
}
