//! Resource pool mutations.
//!
//! Every resource action works on the target's pool, or on the source's
//! when no target is bound (a creature spending its own slots).

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{Action, ActionHeader, ActionKind, Cancelable};
use crate::domain::context::Context;
use crate::domain::events::{ResolutionEventKind, ResourcesChanged};
use crate::domain::resources::{ResourceSelection, TEMPORARY_TAG};

fn pool_owner(header: &ActionHeader) -> Result<Uuid, RulesError> {
    header.target.map_or_else(|| header.source(), Ok)
}

/// Flips the exhausted flag on up to `count` selected resources.
fn set_exhausted(
    ctx: &mut Context,
    owner: Uuid,
    selection: &ResourceSelection,
    exhausted: bool,
) -> Result<Vec<Uuid>, RulesError> {
    let resources = ctx.objects.actor(owner)?.resources.clone();
    let picked = selection.select(&resources, !exhausted, ctx.rng());
    let actor = ctx.objects.actor_mut(owner)?;
    Ok(picked
        .into_iter()
        .map(|index| {
            let resource = &mut actor.resources[index];
            resource.exhausted = exhausted;
            resource.id
        })
        .collect())
}

macro_rules! cancelable {
    ($ty:ty) => {
        impl Cancelable for $ty {
            fn is_canceled(&self) -> bool {
                self.canceled
            }

            fn cancel(&mut self) {
                self.canceled = true;
            }
        }
    };
}

/// Exhausts matching unexhausted resources.
#[derive(Debug, Clone)]
pub struct ExhaustResource {
    header: ActionHeader,
    selection: ResourceSelection,
    canceled: bool,
    changed: Vec<Uuid>,
}

impl ExhaustResource {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(selection: ResourceSelection) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::ExhaustResource), selection)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, selection: ResourceSelection) -> Self {
        Self {
            header,
            selection,
            canceled: false,
            changed: Vec::new(),
        }
    }

    /// Ids of the resources exhausted, once resolved.
    #[must_use]
    pub fn changed(&self) -> &[Uuid] {
        &self.changed
    }
}

impl Action for ExhaustResource {
    header_accessors!(ActionKind::ExhaustResource);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let owner = pool_owner(&self.header)?;
        self.changed = set_exhausted(ctx, owner, &self.selection, true)?;
        info!(%owner, count = self.changed.len(), "resources exhausted");
        ctx.record(ResolutionEventKind::ResourcesExhausted(ResourcesChanged {
            owner,
            resource_ids: self.changed.clone(),
        }));
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

cancelable!(ExhaustResource);

/// Refreshes matching exhausted resources.
#[derive(Debug, Clone)]
pub struct RefreshResource {
    header: ActionHeader,
    selection: ResourceSelection,
    canceled: bool,
    changed: Vec<Uuid>,
}

impl RefreshResource {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(selection: ResourceSelection) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::RefreshResource), selection)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, selection: ResourceSelection) -> Self {
        Self {
            header,
            selection,
            canceled: false,
            changed: Vec::new(),
        }
    }

    /// Ids of the resources refreshed, once resolved.
    #[must_use]
    pub fn changed(&self) -> &[Uuid] {
        &self.changed
    }
}

impl Action for RefreshResource {
    header_accessors!(ActionKind::RefreshResource);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let owner = pool_owner(&self.header)?;
        self.changed = set_exhausted(ctx, owner, &self.selection, false)?;
        info!(%owner, count = self.changed.len(), "resources refreshed");
        ctx.record(ResolutionEventKind::ResourcesRefreshed(ResourcesChanged {
            owner,
            resource_ids: self.changed.clone(),
        }));
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

cancelable!(RefreshResource);

fn one() -> usize {
    1
}

/// Content payload of a `give_resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiveResourceRequest {
    /// Resource template id.
    pub resource: String,
    /// Number of instances.
    #[serde(default = "one")]
    pub count: usize,
}

/// Grants temporary resources from a template.
///
/// Each instance is tagged with the template id and with `temporary`, so a
/// later `take_resource` can find it.
#[derive(Debug, Clone)]
pub struct GiveResource {
    header: ActionHeader,
    request: GiveResourceRequest,
    canceled: bool,
    given: Vec<Uuid>,
}

impl GiveResource {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(request: GiveResourceRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::GiveResource), request)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: GiveResourceRequest) -> Self {
        Self {
            header,
            request,
            canceled: false,
            given: Vec::new(),
        }
    }

    /// Ids of the resources created, once resolved.
    #[must_use]
    pub fn given(&self) -> &[Uuid] {
        &self.given
    }
}

impl Action for GiveResource {
    header_accessors!(ActionKind::GiveResource);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let owner = pool_owner(&self.header)?;
        let template = ctx.templates.resource(&self.request.resource)?.clone();
        let actor = ctx.objects.actor_mut(owner)?;
        self.given.clear();
        for _ in 0..self.request.count {
            let mut resource = template.instantiate(self.header.origin_item);
            resource.tags.push(self.request.resource.clone());
            resource.tags.push(TEMPORARY_TAG.to_owned());
            self.given.push(resource.id);
            actor.resources.push(resource);
        }
        info!(%owner, resource = %self.request.resource, count = self.given.len(), "resources given");
        ctx.record(ResolutionEventKind::ResourcesGiven(ResourcesChanged {
            owner,
            resource_ids: self.given.clone(),
        }));
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

cancelable!(GiveResource);

/// Content payload of a `take_resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeResourceRequest {
    /// Tag the removed resources must carry.
    pub tag: String,
    /// Upper bound; unbounded when absent.
    #[serde(default)]
    pub count: Option<usize>,
}

/// Removes temporary resources carrying a tag. Permanent resources are
/// never removed.
#[derive(Debug, Clone)]
pub struct TakeResource {
    header: ActionHeader,
    request: TakeResourceRequest,
    canceled: bool,
    taken: Vec<Uuid>,
}

impl TakeResource {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(request: TakeResourceRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::TakeResource), request)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: TakeResourceRequest) -> Self {
        Self {
            header,
            request,
            canceled: false,
            taken: Vec::new(),
        }
    }

    /// Ids of the resources removed, once resolved.
    #[must_use]
    pub fn taken(&self) -> &[Uuid] {
        &self.taken
    }
}

impl Action for TakeResource {
    header_accessors!(ActionKind::TakeResource);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let owner = pool_owner(&self.header)?;
        let limit = self.request.count.unwrap_or(usize::MAX);
        let tag = self.request.tag.as_str();
        let actor = ctx.objects.actor_mut(owner)?;

        let mut taken = Vec::new();
        actor.resources.retain(|resource| {
            let removable =
                taken.len() < limit && resource.is_temporary() && resource.has_tag(tag);
            if removable {
                taken.push(resource.id);
            }
            !removable
        });
        self.taken = taken;

        info!(%owner, tag, count = self.taken.len(), "resources taken");
        ctx.record(ResolutionEventKind::ResourcesTaken(ResourcesChanged {
            owner,
            resource_ids: self.taken.clone(),
        }));
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

cancelable!(TakeResource);
