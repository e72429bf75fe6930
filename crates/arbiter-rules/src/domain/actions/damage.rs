//! The damage pipeline: collection, critical doubling, roll, affinity and
//! delivery, plus the authorable `deal_damage`.
//!
//! Damage is assembled in two passes. The base pass is target-agnostic and
//! runs during `prepare`; the target pass runs once per victim and is
//! merged in before rolling.

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::restoration::deliver_healing;
use super::{
    Action, ActionHeader, ActionKind, BASE_DAMAGE_TAG, Binding, Cancelable, TARGET_DAMAGE_TAG,
    resolve_nested,
};
use crate::domain::context::Context;
use crate::domain::events::{DamageAmount, DamageDelivered, ResolutionEventKind};
use crate::domain::pool::{
    DamageProportion, PoolDescriptor, TypedCollection, TypedRoll, Vampirism,
};

/// Per-type damage amounts.
pub type Amounts = Vec<(Option<String>, i64)>;

/// Unrolled damage open to `add_damage`.
#[derive(Debug, Clone)]
pub struct DamageCollection {
    header: ActionHeader,
    collection: TypedCollection,
}

impl DamageCollection {
    /// Wraps a collection.
    #[must_use]
    pub fn new(collection: TypedCollection) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::DamageCollection),
            collection,
        }
    }

    /// The collection.
    #[must_use]
    pub fn collection(&self) -> &TypedCollection {
        &self.collection
    }
}

impl Action for DamageCollection {
    header_accessors!(ActionKind::DamageCollection);

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn damage_collection_mut(&mut self) -> Option<&mut TypedCollection> {
        Some(&mut self.collection)
    }
}

/// Base damage with every die doubled, before target damage joins it.
#[derive(Debug, Clone)]
pub struct CriticalHitDamageCollection {
    header: ActionHeader,
    collection: TypedCollection,
}

impl CriticalHitDamageCollection {
    /// Wraps the base collection; dice are doubled during `prepare`.
    #[must_use]
    pub fn new(collection: TypedCollection) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::CriticalHitDamageCollection),
            collection,
        }
    }

    /// The collection.
    #[must_use]
    pub fn collection(&self) -> &TypedCollection {
        &self.collection
    }
}

impl Action for CriticalHitDamageCollection {
    header_accessors!(ActionKind::CriticalHitDamageCollection);

    fn on_prepare(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        self.collection.double_dice();
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn damage_collection_mut(&mut self) -> Option<&mut TypedCollection> {
        Some(&mut self.collection)
    }
}

/// Rolled damage open to maximize, reroll and set operations.
#[derive(Debug, Clone)]
pub struct DamageRoll {
    header: ActionHeader,
    collection: TypedCollection,
    roll: TypedRoll,
}

impl DamageRoll {
    /// Wraps a collection; it is rolled during `prepare`.
    #[must_use]
    pub fn new(collection: TypedCollection) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::DamageRoll),
            collection,
            roll: TypedRoll::default(),
        }
    }

    /// The rolled pool.
    #[must_use]
    pub fn roll(&self) -> &TypedRoll {
        &self.roll
    }
}

impl Action for DamageRoll {
    header_accessors!(ActionKind::DamageRoll);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.roll = self.collection.roll(ctx.rng());
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn damage_roll_mut(&mut self) -> Option<&mut TypedRoll> {
        Some(&mut self.roll)
    }
}

/// Immunities, resistances and vulnerabilities granted for one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityGrants {
    /// Types reduced to zero.
    #[serde(default)]
    pub immunities: Vec<String>,
    /// Types halved, rounded down.
    #[serde(default)]
    pub resistances: Vec<String>,
    /// Types doubled.
    #[serde(default)]
    pub vulnerabilities: Vec<String>,
}

impl AffinityGrants {
    /// Adjusts one amount. Immunity wins outright; resistance and
    /// vulnerability together cancel out. Untyped damage is unaffected.
    #[must_use]
    pub fn adjust(&self, damage_type: Option<&str>, amount: i64) -> i64 {
        let Some(damage_type) = damage_type else {
            return amount;
        };
        let granted = |list: &[String]| list.iter().any(|t| t == damage_type);
        if granted(&self.immunities) {
            return 0;
        }
        match (granted(&self.resistances), granted(&self.vulnerabilities)) {
            (true, false) => amount.div_euclid(2),
            (false, true) => amount * 2,
            _ => amount,
        }
    }
}

/// Applies the victim's affinities. Bound with the victim as source.
#[derive(Debug, Clone)]
pub struct DamageAffinity {
    header: ActionHeader,
    amounts: Amounts,
    grants: AffinityGrants,
}

impl DamageAffinity {
    /// Wraps per-type amounts.
    #[must_use]
    pub fn new(amounts: Amounts) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::DamageAffinity),
            amounts,
            grants: AffinityGrants::default(),
        }
    }

    /// Amounts after adjustment, once resolved.
    #[must_use]
    pub fn amounts(&self) -> &Amounts {
        &self.amounts
    }
}

impl Action for DamageAffinity {
    header_accessors!(ActionKind::DamageAffinity);

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        for (damage_type, amount) in &mut self.amounts {
            *amount = self.grants.adjust(damage_type.as_deref(), *amount);
        }
        Ok(())
    }

    fn affinity_mut(&mut self) -> Option<&mut AffinityGrants> {
        Some(&mut self.grants)
    }
}

/// Reduces a damage roll to per-type amounts and applies them to the
/// target.
#[derive(Debug, Clone)]
pub struct DamageDelivery {
    header: ActionHeader,
    roll: TypedRoll,
    proportion: DamageProportion,
    vampirism: Option<Vampirism>,
    delivered: Amounts,
}

impl DamageDelivery {
    /// Creates a delivery.
    #[must_use]
    pub fn new(roll: TypedRoll, proportion: DamageProportion, vampirism: Option<Vampirism>) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::DamageDelivery),
            roll,
            proportion,
            vampirism,
            delivered: Vec::new(),
        }
    }

    /// Per-type amounts dealt, once resolved.
    #[must_use]
    pub fn delivered(&self) -> &Amounts {
        &self.delivered
    }
}

impl Action for DamageDelivery {
    header_accessors!(ActionKind::DamageDelivery);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        let victim = self.header.target()?;
        let amounts: Amounts = self
            .roll
            .totals()
            .into_iter()
            .map(|(damage_type, amount)| (damage_type, self.proportion.apply(amount)))
            .collect();

        let mut affinity = DamageAffinity::new(amounts);
        let binding = Binding::inherit(&self.header)
            .with_source(Some(victim))
            .with_target(self.header.source);
        resolve_nested(&mut affinity, &binding, ctx)?;
        self.delivered = affinity.amounts;

        let total: i64 = self.delivered.iter().map(|(_, amount)| amount).sum();
        let lost = ctx.objects.actor_mut(victim)?.hit_points.take_damage(total);
        info!(%victim, total, lost, "damage delivered");
        ctx.record(ResolutionEventKind::DamageDelivered(DamageDelivered {
            source: self.header.source,
            target: victim,
            amounts: self
                .delivered
                .iter()
                .map(|(damage_type, amount)| DamageAmount {
                    damage_type: damage_type.clone(),
                    amount: *amount,
                })
                .collect(),
            total,
        }));

        if let (Some(vampirism), Some(source)) = (&self.vampirism, self.header.source) {
            let healing = vampirism.healing_from(&self.delivered);
            if healing > 0 {
                let binding = Binding::inherit(&self.header)
                    .with_source(Some(source))
                    .with_target(Some(source));
                deliver_healing(ctx, &binding, healing)?;
            }
        }
        Ok(())
    }

    fn vampirism_mut(&mut self) -> Option<&mut Option<Vampirism>> {
        Some(&mut self.vampirism)
    }
}

/// Runs a collection through a tagged [`DamageCollection`] so modifiers can
/// add to it.
pub(crate) fn collect_damage(
    ctx: &mut Context,
    binding: &Binding,
    collection: TypedCollection,
    tag: &str,
) -> Result<TypedCollection, RulesError> {
    let mut action = DamageCollection::new(collection);
    action.header.add_tag(tag);
    resolve_nested(&mut action, binding, ctx)?;
    Ok(action.collection)
}

/// Doubles the dice of a base collection through a
/// [`CriticalHitDamageCollection`].
pub(crate) fn critical_damage(
    ctx: &mut Context,
    parent: &ActionHeader,
    base: TypedCollection,
) -> Result<TypedCollection, RulesError> {
    let mut action = CriticalHitDamageCollection::new(base);
    resolve_nested(&mut action, &Binding::inherit(parent), ctx)?;
    Ok(action.collection)
}

/// Rolls and delivers damage from `parent`'s source to its target.
pub(crate) fn deliver_damage(
    ctx: &mut Context,
    parent: &ActionHeader,
    collection: TypedCollection,
    proportion: DamageProportion,
    vampirism: Option<Vampirism>,
) -> Result<Amounts, RulesError> {
    let binding = Binding::inherit(parent);
    let mut roll = DamageRoll::new(collection);
    resolve_nested(&mut roll, &binding, ctx)?;
    let mut delivery = DamageDelivery::new(roll.roll, proportion, vampirism);
    resolve_nested(&mut delivery, &binding, ctx)?;
    Ok(delivery.delivered)
}

/// Content payload of a `deal_damage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealDamageRequest {
    /// Damage entries.
    pub damage: Vec<PoolDescriptor>,
    /// Portion delivered.
    #[serde(default)]
    pub proportion: DamageProportion,
    /// Heals the source from the damage dealt.
    #[serde(default)]
    pub vampirism: Option<Vampirism>,
}

/// Damage with no roll to hit.
#[derive(Debug, Clone)]
pub struct DealDamage {
    header: ActionHeader,
    request: DealDamageRequest,
    canceled: bool,
    base_damage: TypedCollection,
    vampirism: Option<Vampirism>,
    delivered: Amounts,
}

impl DealDamage {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(request: DealDamageRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::DealDamage), request)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: DealDamageRequest) -> Self {
        let vampirism = request.vampirism.clone();
        Self {
            header,
            request,
            canceled: false,
            base_damage: TypedCollection::new(),
            vampirism,
            delivered: Vec::new(),
        }
    }

    /// Per-type amounts dealt, once resolved.
    #[must_use]
    pub fn delivered(&self) -> &Amounts {
        &self.delivered
    }
}

impl Action for DealDamage {
    header_accessors!(ActionKind::DealDamage);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.base_damage = collect_damage(
            ctx,
            &Binding::inherit(&self.header),
            TypedCollection::from_descriptors(&self.request.damage),
            BASE_DAMAGE_TAG,
        )?;
        Ok(())
    }

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let mut damage = self.base_damage.clone();
        damage.merge(&collect_damage(
            ctx,
            &Binding::inherit(&self.header),
            TypedCollection::new(),
            TARGET_DAMAGE_TAG,
        )?);
        self.delivered = deliver_damage(
            ctx,
            &self.header,
            damage,
            self.request.proportion,
            self.vampirism.clone(),
        )?;
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }

    fn vampirism_mut(&mut self) -> Option<&mut Option<Vampirism>> {
        Some(&mut self.vampirism)
    }
}

impl Cancelable for DealDamage {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}
