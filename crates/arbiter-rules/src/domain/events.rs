//! Journal events recorded while an action resolves.

use arbiter_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actions::{ActionKind, AttackOutcome, ContestWinner};
use super::objects::Ability;

/// Emitted when an ability check is rolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResolved {
    /// The actor who rolled.
    pub source: Option<Uuid>,
    /// The ability rolled.
    pub ability: Ability,
    /// The kept d20 face.
    pub natural: u32,
    /// Final total.
    pub total: i64,
    /// The dc, if the check had one.
    pub dc: Option<i64>,
    /// Outcome against the dc.
    pub passed: Option<bool>,
}

/// Emitted when an attack roll is compared to armor class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResolved {
    /// The attacker.
    pub source: Option<Uuid>,
    /// The defender.
    pub target: Uuid,
    /// The kept d20 face.
    pub natural: u32,
    /// Final total.
    pub total: i64,
    /// The defender's armor class.
    pub armor_class: i64,
    /// The lowest natural roll that crits.
    pub critical_hit_threshold: i64,
    /// How the attack landed.
    pub outcome: AttackOutcome,
}

/// Emitted when a saving throw is decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingThrowResolved {
    /// Who set the dc.
    pub source: Option<Uuid>,
    /// Who saved.
    pub target: Uuid,
    /// The saving ability.
    pub ability: Ability,
    /// The dc.
    pub dc: i64,
    /// The kept d20 face.
    pub natural: u32,
    /// The target's total.
    pub total: i64,
    /// True if the target met the dc.
    pub passed: bool,
}

/// Emitted when a contest is decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestResolved {
    /// The acting side.
    pub source: Option<Uuid>,
    /// The opposing side.
    pub target: Option<Uuid>,
    /// The acting side's total.
    pub source_total: i64,
    /// The opposing total or dc.
    pub opposition_total: i64,
    /// Who won.
    pub winner: ContestWinner,
}

/// Damage of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageAmount {
    /// Damage type; untyped when absent.
    pub damage_type: Option<String>,
    /// Amount after affinities.
    pub amount: i64,
}

/// Emitted when damage is applied to a victim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageDelivered {
    /// Who dealt it.
    pub source: Option<Uuid>,
    /// Who took it.
    pub target: Uuid,
    /// Per-type amounts.
    pub amounts: Vec<DamageAmount>,
    /// Sum of the amounts.
    pub total: i64,
}

/// Emitted when hit points are restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingDelivered {
    /// The healer.
    pub source: Option<Uuid>,
    /// The healed actor.
    pub target: Uuid,
    /// Healing offered.
    pub amount: i64,
    /// Hit points actually restored.
    pub restored: i64,
}

/// Emitted when temporary hit points are offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryHitPointsDelivered {
    /// The giver.
    pub source: Option<Uuid>,
    /// The receiver.
    pub target: Uuid,
    /// Amount offered.
    pub amount: i64,
    /// True if the offer replaced a smaller buffer.
    pub replaced: bool,
}

/// Emitted when an effect is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectGiven {
    /// The affected actor.
    pub target: Uuid,
    /// The effect template id.
    pub effect: String,
    /// Identity of the new modifier.
    pub modifier_id: Uuid,
}

/// Emitted when an effect is detached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRemoved {
    /// The affected actor.
    pub target: Uuid,
    /// The effect template id.
    pub effect: String,
    /// Number of modifiers removed.
    pub removed: usize,
}

/// Payload shared by every resource pool change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesChanged {
    /// Pool owner.
    pub owner: Uuid,
    /// Resources touched, in visit order.
    pub resource_ids: Vec<Uuid>,
}

/// Emitted when a modifier cancels an action before its effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCanceled {
    /// The canceled kind.
    pub kind: ActionKind,
    /// Its source.
    pub source: Option<Uuid>,
    /// Its target.
    pub target: Option<Uuid>,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionEventKind {
    /// An ability check was rolled.
    CheckResolved(CheckResolved),
    /// An attack was compared to armor class.
    AttackResolved(AttackResolved),
    /// A saving throw was decided.
    SavingThrowResolved(SavingThrowResolved),
    /// A contest was decided.
    ContestResolved(ContestResolved),
    /// Damage was applied.
    DamageDelivered(DamageDelivered),
    /// Hit points were restored.
    HealingDelivered(HealingDelivered),
    /// Temporary hit points were offered.
    TemporaryHitPointsDelivered(TemporaryHitPointsDelivered),
    /// An effect was attached.
    EffectGiven(EffectGiven),
    /// An effect was detached.
    EffectRemoved(EffectRemoved),
    /// Resources were exhausted.
    ResourcesExhausted(ResourcesChanged),
    /// Resources were refreshed.
    ResourcesRefreshed(ResourcesChanged),
    /// Temporary resources were granted.
    ResourcesGiven(ResourcesChanged),
    /// Temporary resources were removed.
    ResourcesTaken(ResourcesChanged),
    /// An action was canceled.
    ActionCanceled(ActionCanceled),
}

impl ResolutionEventKind {
    /// The journal type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CheckResolved(_) => "rules.check_resolved",
            Self::AttackResolved(_) => "rules.attack_resolved",
            Self::SavingThrowResolved(_) => "rules.saving_throw_resolved",
            Self::ContestResolved(_) => "rules.contest_resolved",
            Self::DamageDelivered(_) => "rules.damage_delivered",
            Self::HealingDelivered(_) => "rules.healing_delivered",
            Self::TemporaryHitPointsDelivered(_) => "rules.temporary_hit_points_delivered",
            Self::EffectGiven(_) => "rules.effect_given",
            Self::EffectRemoved(_) => "rules.effect_removed",
            Self::ResourcesExhausted(_) => "rules.resources_exhausted",
            Self::ResourcesRefreshed(_) => "rules.resources_refreshed",
            Self::ResourcesGiven(_) => "rules.resources_given",
            Self::ResourcesTaken(_) => "rules.resources_taken",
            Self::ActionCanceled(_) => "rules.action_canceled",
        }
    }
}

/// Journal entry envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: ResolutionEventKind,
}

impl DomainEvent for ResolutionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("ResolutionEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
