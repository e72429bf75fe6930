//! Healing and temporary hit points.
//!
//! Both follow the damage pipeline's shape without the affinity step:
//! collection, roll, delivery.

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Action, ActionHeader, ActionKind, Binding, Cancelable, YieldsValue, resolve_nested};
use crate::domain::calculation::Calculation;
use crate::domain::context::Context;
use crate::domain::events::{
    HealingDelivered, ResolutionEventKind, TemporaryHitPointsDelivered,
};
use crate::domain::pool::{PoolDescriptor, TypedCollection, TypedRoll};

/// Unrolled healing open to `add_healing`.
#[derive(Debug, Clone)]
pub struct HealingCollection {
    header: ActionHeader,
    collection: TypedCollection,
}

impl HealingCollection {
    /// Wraps a collection.
    #[must_use]
    pub fn new(collection: TypedCollection) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::HealingCollection),
            collection,
        }
    }
}

impl Action for HealingCollection {
    header_accessors!(ActionKind::HealingCollection);

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn healing_collection_mut(&mut self) -> Option<&mut TypedCollection> {
        Some(&mut self.collection)
    }
}

/// Rolled healing open to `maximize_healing`.
#[derive(Debug, Clone)]
pub struct HealingRoll {
    header: ActionHeader,
    collection: TypedCollection,
    roll: TypedRoll,
}

impl HealingRoll {
    /// Wraps a collection; it is rolled during `prepare`.
    #[must_use]
    pub fn new(collection: TypedCollection) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::HealingRoll),
            collection,
            roll: TypedRoll::default(),
        }
    }
}

impl Action for HealingRoll {
    header_accessors!(ActionKind::HealingRoll);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.roll = self.collection.roll(ctx.rng());
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn healing_roll_mut(&mut self) -> Option<&mut TypedRoll> {
        Some(&mut self.roll)
    }
}

/// Restores hit points to the target. The amount is a calculation so
/// modifiers can adjust healing received.
#[derive(Debug, Clone)]
pub struct HealingDelivery {
    header: ActionHeader,
    amount: Calculation,
    restored: i64,
}

impl HealingDelivery {
    /// Creates a delivery of `amount`.
    #[must_use]
    pub fn new(amount: i64) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::HealingDelivery),
            amount: Calculation::with_base(amount),
            restored: 0,
        }
    }

    /// Hit points actually restored, once resolved.
    #[must_use]
    pub fn restored(&self) -> i64 {
        self.restored
    }
}

impl Action for HealingDelivery {
    header_accessors!(ActionKind::HealingDelivery);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        let target = self.header.target()?;
        let amount = self.amount.get()?.max(0);
        self.restored = ctx.objects.actor_mut(target)?.hit_points.heal(amount);
        info!(%target, amount, restored = self.restored, "healing delivered");
        ctx.record(ResolutionEventKind::HealingDelivered(HealingDelivered {
            source: self.header.source,
            target,
            amount,
            restored: self.restored,
        }));
        Ok(())
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(&mut self.amount)
    }
}

impl YieldsValue for HealingDelivery {
    fn value(&self) -> Result<i64, RulesError> {
        self.amount.get()
    }
}

/// Unrolled temporary hit points open to `add_temporary_hit_points`.
#[derive(Debug, Clone)]
pub struct TemporaryHitPointCollection {
    header: ActionHeader,
    collection: TypedCollection,
}

impl TemporaryHitPointCollection {
    /// Wraps a collection.
    #[must_use]
    pub fn new(collection: TypedCollection) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::TemporaryHitPointCollection),
            collection,
        }
    }
}

impl Action for TemporaryHitPointCollection {
    header_accessors!(ActionKind::TemporaryHitPointCollection);

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn temporary_hit_point_collection_mut(&mut self) -> Option<&mut TypedCollection> {
        Some(&mut self.collection)
    }
}

/// Rolled temporary hit points open to `maximize_temporary_hit_points`.
#[derive(Debug, Clone)]
pub struct TemporaryHitPointRoll {
    header: ActionHeader,
    collection: TypedCollection,
    roll: TypedRoll,
}

impl TemporaryHitPointRoll {
    /// Wraps a collection; it is rolled during `prepare`.
    #[must_use]
    pub fn new(collection: TypedCollection) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::TemporaryHitPointRoll),
            collection,
            roll: TypedRoll::default(),
        }
    }
}

impl Action for TemporaryHitPointRoll {
    header_accessors!(ActionKind::TemporaryHitPointRoll);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.roll = self.collection.roll(ctx.rng());
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn temporary_hit_point_roll_mut(&mut self) -> Option<&mut TypedRoll> {
        Some(&mut self.roll)
    }
}

/// Grants temporary hit points to the target; the larger buffer is kept.
#[derive(Debug, Clone)]
pub struct TemporaryHitPointDelivery {
    header: ActionHeader,
    amount: Calculation,
    replaced: bool,
}

impl TemporaryHitPointDelivery {
    /// Creates a delivery of `amount`.
    #[must_use]
    pub fn new(amount: i64) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::TemporaryHitPointDelivery),
            amount: Calculation::with_base(amount),
            replaced: false,
        }
    }
}

impl Action for TemporaryHitPointDelivery {
    header_accessors!(ActionKind::TemporaryHitPointDelivery);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        let target = self.header.target()?;
        let amount = self.amount.get()?.max(0);
        self.replaced = ctx
            .objects
            .actor_mut(target)?
            .hit_points
            .give_temporary(amount);
        ctx.record(ResolutionEventKind::TemporaryHitPointsDelivered(
            TemporaryHitPointsDelivered {
                source: self.header.source,
                target,
                amount,
                replaced: self.replaced,
            },
        ));
        Ok(())
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(&mut self.amount)
    }
}

/// Delivers a fixed amount of healing under `binding`.
pub(crate) fn deliver_healing(
    ctx: &mut Context,
    binding: &Binding,
    amount: i64,
) -> Result<i64, RulesError> {
    let mut delivery = HealingDelivery::new(amount);
    resolve_nested(&mut delivery, binding, ctx)?;
    Ok(delivery.restored)
}

/// Content payload of a `give_healing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiveHealingRequest {
    /// Healing entries.
    pub healing: Vec<PoolDescriptor>,
}

/// Rolls and delivers healing to the target.
#[derive(Debug, Clone)]
pub struct GiveHealing {
    header: ActionHeader,
    request: GiveHealingRequest,
    canceled: bool,
}

impl GiveHealing {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(request: GiveHealingRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::GiveHealing), request)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: GiveHealingRequest) -> Self {
        Self {
            header,
            request,
            canceled: false,
        }
    }
}

impl Action for GiveHealing {
    header_accessors!(ActionKind::GiveHealing);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let binding = Binding::inherit(&self.header);

        let mut collection =
            HealingCollection::new(TypedCollection::from_descriptors(&self.request.healing));
        resolve_nested(&mut collection, &binding, ctx)?;

        let mut roll = HealingRoll::new(collection.collection);
        resolve_nested(&mut roll, &binding, ctx)?;

        deliver_healing(ctx, &binding, roll.roll.total())?;
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

impl Cancelable for GiveHealing {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}

/// Content payload of a `give_temporary_hit_points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiveTemporaryHitPointsRequest {
    /// Temporary hit point entries.
    pub temporary_hit_points: Vec<PoolDescriptor>,
}

/// Rolls and grants temporary hit points to the target.
#[derive(Debug, Clone)]
pub struct GiveTemporaryHitPoints {
    header: ActionHeader,
    request: GiveTemporaryHitPointsRequest,
    canceled: bool,
}

impl GiveTemporaryHitPoints {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(request: GiveTemporaryHitPointsRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::GiveTemporaryHitPoints), request)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: GiveTemporaryHitPointsRequest) -> Self {
        Self {
            header,
            request,
            canceled: false,
        }
    }
}

impl Action for GiveTemporaryHitPoints {
    header_accessors!(ActionKind::GiveTemporaryHitPoints);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let binding = Binding::inherit(&self.header);

        let mut collection = TemporaryHitPointCollection::new(TypedCollection::from_descriptors(
            &self.request.temporary_hit_points,
        ));
        resolve_nested(&mut collection, &binding, ctx)?;

        let mut roll = TemporaryHitPointRoll::new(collection.collection);
        resolve_nested(&mut roll, &binding, ctx)?;

        let mut delivery = TemporaryHitPointDelivery::new(roll.roll.total());
        resolve_nested(&mut delivery, &binding, ctx)
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

impl Cancelable for GiveTemporaryHitPoints {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}
