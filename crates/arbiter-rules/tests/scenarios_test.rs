//! End-to-end resolution scenarios driven through the command handler.

mod common;

use arbiter_core::config::EngineConfig;
use arbiter_core::error::RulesError;
use arbiter_rules::domain::actions::{
    Action, ActionExt, ActionHeader, ActionKind, ActionSpec, AttackOutcome, ContestWinner,
    EffectRequest, GiveEffect,
};
use arbiter_rules::domain::context::{Context, Templates};
use arbiter_rules::domain::events::ResolutionEventKind;
use arbiter_rules::domain::modifiers::{Modifier, ModifierTemplate};
use arbiter_rules::domain::objects::{
    ARMOR_SLOT, Ability, Actor, Item, ObjectStore, ProficiencyLevel,
};
use arbiter_rules::domain::resources::{Resource, ResourceTemplate, TEMPORARY_TAG};
use arbiter_test_support::{MockRng, SequenceRng};
use serde_json::json;
use uuid::Uuid;

fn fighter() -> Actor {
    Actor::new("Fighter")
        .with_ability(Ability::Strength, 16)
        .with_proficiency_bonus(2)
        .with_proficiency("martial_weapons", ProficiencyLevel::Full)
        .with_hit_points(20)
}

fn longsword_attack(determined: u32) -> serde_json::Value {
    json!({
        "subevent": "attack_roll",
        "attack_type": "melee_weapon",
        "attack_ability": "str",
        "proficiency": "martial_weapons",
        "damage": [{"type": "slashing", "dice": [{"size": 8, "determined": [6]}]}],
        "determined": [determined],
        "hit": [{"subevent": "give_effect", "effect": "bleeding"}],
        "miss": [{"subevent": "give_effect", "effect": "shaken"}]
    })
}

fn attack_templates() -> Templates {
    let mut templates = Templates::new();
    templates.insert_effect("bleeding", ModifierTemplate::default());
    templates.insert_effect("shaken", ModifierTemplate::default());
    templates
}

fn has_effect(ctx: &Context, actor: Uuid, effect: &str) -> bool {
    ctx.objects
        .actor(actor)
        .unwrap()
        .modifiers
        .iter()
        .any(|m| m.template.as_deref() == Some(effect))
}

// --- attack roll ---

#[test]
fn test_attack_meeting_armor_class_hits_without_critical() {
    let mut objects = ObjectStore::new();
    let attacker = objects.insert_actor(fighter());
    let knight = objects.insert_actor(Actor::new("Knight").with_hit_points(30));
    let plate = objects.insert_item(Item::new("Plate").with_armor(18, Some(0)));
    objects.equip(knight, ARMOR_SLOT, plate).unwrap();
    let mut ctx = common::context(objects, attack_templates(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, longsword_attack(15), attacker, &[knight]).unwrap();

    let resolved = common::of_type(&events, "rules.attack_resolved");
    assert_eq!(resolved.len(), 1);
    let ResolutionEventKind::AttackResolved(attack) = &resolved[0].kind else {
        panic!("expected an attack event");
    };
    assert_eq!(attack.natural, 15);
    assert_eq!(attack.total, 20);
    assert_eq!(attack.armor_class, 18);
    assert_eq!(attack.critical_hit_threshold, 20);
    assert_eq!(attack.outcome, AttackOutcome::Hit);

    // 1d8 showing 6 plus the strength modifier.
    assert_eq!(common::hit_points(&ctx, knight), 21);
    assert!(has_effect(&ctx, knight, "bleeding"));
    assert!(!has_effect(&ctx, knight, "shaken"));
}

#[test]
fn test_natural_one_misses_regardless_of_total() {
    let mut objects = ObjectStore::new();
    let attacker = objects.insert_actor(fighter().with_ability(Ability::Strength, 30));
    let goblin = objects.insert_actor(Actor::new("Goblin").with_hit_points(7));
    let mut ctx = common::context(objects, attack_templates(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, longsword_attack(1), attacker, &[goblin]).unwrap();

    assert!(common::of_type(&events, "rules.damage_delivered").is_empty());
    assert_eq!(common::hit_points(&ctx, goblin), 7);
    assert!(has_effect(&ctx, goblin, "shaken"));
}

#[test]
fn test_critical_hit_doubles_dice_but_not_bonuses() {
    let mut objects = ObjectStore::new();
    let attacker = objects.insert_actor(fighter());
    let ogre = objects.insert_actor(Actor::new("Ogre").with_hit_points(59));
    let mut ctx = common::context(objects, attack_templates(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, longsword_attack(20), attacker, &[ogre]).unwrap();

    let ResolutionEventKind::AttackResolved(attack) =
        &common::of_type(&events, "rules.attack_resolved")[0].kind
    else {
        panic!("expected an attack event");
    };
    assert_eq!(attack.outcome, AttackOutcome::CriticalHit);
    // Two d8s showing 6 each, plus 3 once.
    assert_eq!(common::hit_points(&ctx, ogre), 59 - 15);
}

#[test]
fn test_lowered_critical_hit_threshold_crits_on_nineteen() {
    let mut objects = ObjectStore::new();
    let champion = objects.insert_actor(fighter().with_modifier(common::modifier(
        "improved_critical",
        json!({
            "subevent": "calculate_critical_hit_threshold",
            "operations": [{"function": "add_bonus", "value": -1}]
        }),
    )));
    let ogre = objects.insert_actor(Actor::new("Ogre").with_hit_points(59));
    let mut ctx = common::context(objects, attack_templates(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, longsword_attack(19), champion, &[ogre]).unwrap();

    let ResolutionEventKind::AttackResolved(attack) =
        &common::of_type(&events, "rules.attack_resolved")[0].kind
    else {
        panic!("expected an attack event");
    };
    assert_eq!(attack.critical_hit_threshold, 19);
    assert_eq!(attack.outcome, AttackOutcome::CriticalHit);
}

#[test]
fn test_each_target_reuses_base_damage_and_collects_its_own() {
    let mut objects = ObjectStore::new();
    let paladin = objects.insert_actor(fighter().with_modifier(common::modifier(
        "divine_favor",
        json!({
            "subevent": "damage_collection",
            "tags": ["base_damage_collection"],
            "operations": [{"function": "add_damage", "damage": [{"type": "radiant", "bonus": 2}]}]
        }),
    )));
    let hexed = objects.insert_actor(Actor::new("Hexed").with_hit_points(30).with_modifier(
        common::modifier(
            "hex",
            json!({
                "subevent": "damage_collection",
                "tags": ["target_damage_collection"],
                "operations": [{"function": "add_damage", "damage": [{"type": "necrotic", "bonus": 3}]}]
            }),
        ),
    ));
    let plain = objects.insert_actor(Actor::new("Plain").with_hit_points(30));
    let mut ctx = common::context(objects, attack_templates(), SequenceRng::new(vec![]));

    let events =
        common::resolve(&mut ctx, longsword_attack(15), paladin, &[hexed, plain]).unwrap();

    assert_eq!(common::of_type(&events, "rules.damage_delivered").len(), 2);
    assert_eq!(common::hit_points(&ctx, hexed), 30 - (9 + 2 + 3));
    assert_eq!(common::hit_points(&ctx, plain), 30 - (9 + 2));
}

#[test]
fn test_canceled_attack_records_cancellation_only() {
    let mut objects = ObjectStore::new();
    let attacker = objects.insert_actor(fighter());
    let cleric = objects.insert_actor(Actor::new("Cleric").with_hit_points(18));
    let mut sanctuary = common::modifier(
        "sanctuary",
        json!({
            "subevent": "attack_roll",
            "conditions": [{"condition": "objects_match", "left": "action_target", "right": "modifier_target"}],
            "operations": [{"function": "cancel_action"}]
        }),
    );
    sanctuary.target = Some(cleric);
    push_modifier(&mut objects, cleric, sanctuary);
    let mut ctx = common::context(objects, attack_templates(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, longsword_attack(18), attacker, &[cleric]).unwrap();

    assert_eq!(events.len(), 1);
    let ResolutionEventKind::ActionCanceled(canceled) = &events[0].kind else {
        panic!("expected a cancellation");
    };
    assert_eq!(canceled.kind, ActionKind::AttackRoll);
    assert_eq!(canceled.target, Some(cleric));
    assert_eq!(common::hit_points(&ctx, cleric), 18);
}

fn push_modifier(
    objects: &mut ObjectStore,
    actor: Uuid,
    modifier: Modifier,
) {
    objects.actor_mut(actor).unwrap().modifiers.push(modifier);
}

// --- saving throw ---

#[test]
fn test_saving_throw_derives_dc_from_caster() {
    let mut objects = ObjectStore::new();
    let wizard = objects.insert_actor(
        Actor::new("Wizard")
            .with_ability(Ability::Intelligence, 14)
            .with_proficiency_bonus(3),
    );
    let bandit = objects.insert_actor(Actor::new("Bandit").with_hit_points(11));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({
            "subevent": "saving_throw",
            "ability": "dex",
            "dc_ability": "int",
            "damage": [{"type": "fire", "dice": [{"count": 2, "size": 6, "determined": [3, 4]}]}],
            "determined": [12]
        }),
        wizard,
        &[bandit],
    )
    .unwrap();

    let ResolutionEventKind::SavingThrowResolved(save) =
        &common::of_type(&events, "rules.saving_throw_resolved")[0].kind
    else {
        panic!("expected a saving throw event");
    };
    assert_eq!(save.dc, 13);
    assert_eq!(save.total, 12);
    assert!(!save.passed);
    assert_eq!(common::hit_points(&ctx, bandit), 11 - 7);
}

#[test]
fn test_passed_save_takes_half_damage() {
    let mut objects = ObjectStore::new();
    let wizard = objects.insert_actor(Actor::new("Wizard"));
    let bandit = objects.insert_actor(Actor::new("Bandit").with_hit_points(11));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    common::resolve(
        &mut ctx,
        json!({
            "subevent": "saving_throw",
            "ability": "dex",
            "dc": 10,
            "damage": [{"type": "fire", "dice": [{"count": 2, "size": 6, "determined": [3, 4]}]}],
            "determined": [10]
        }),
        wizard,
        &[bandit],
    )
    .unwrap();

    assert_eq!(common::hit_points(&ctx, bandit), 11 - 3);
}

fn dex_save(dc: i64, determined: &[u32]) -> serde_json::Value {
    json!({
        "subevent": "saving_throw",
        "ability": "dex",
        "dc": dc,
        "determined": determined
    })
}

fn saving_throw_event(events: &[arbiter_rules::domain::events::ResolutionEvent]) -> (u32, i64, bool) {
    let ResolutionEventKind::SavingThrowResolved(save) =
        &common::of_type(events, "rules.saving_throw_resolved")[0].kind
    else {
        panic!("expected a saving throw event");
    };
    (save.natural, save.total, save.passed)
}

#[test]
fn test_modifiers_adjust_the_saving_roll() {
    let mut objects = ObjectStore::new();
    let wizard = objects.insert_actor(Actor::new("Wizard"));
    let paladin = objects.insert_actor(Actor::new("Paladin").with_hit_points(30));
    let mut aura = common::modifier(
        "aura_of_protection",
        json!({
            "subevent": "saving_throw",
            "conditions": [{"condition": "objects_match", "left": "action_target", "right": "modifier_target"}],
            "operations": [
                {"function": "add_bonus", "value": 2},
                {"function": "grant_advantage"}
            ]
        }),
    );
    aura.target = Some(paladin);
    push_modifier(&mut objects, paladin, aura);
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, dex_save(17, &[4, 15]), wizard, &[paladin]).unwrap();

    // Advantage keeps the 15 over the 4; the aura adds 2.
    assert_eq!(saving_throw_event(&events), (15, 17, true));
}

#[test]
fn test_caster_modifier_on_saves_does_not_reach_unmatched_targets() {
    let mut objects = ObjectStore::new();
    let cleric = objects.insert_actor(Actor::new("Cleric"));
    let mut bless = common::modifier(
        "bless",
        json!({
            "subevent": "saving_throw",
            "conditions": [{"condition": "objects_match", "left": "action_target", "right": "modifier_target"}],
            "operations": [{"function": "add_bonus", "value": 2}]
        }),
    );
    bless.target = Some(cleric);
    push_modifier(&mut objects, cleric, bless);
    let bandit = objects.insert_actor(Actor::new("Bandit").with_hit_points(11));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, dex_save(12, &[11]), cleric, &[bandit]).unwrap();

    assert_eq!(saving_throw_event(&events), (11, 11, false));
}

#[test]
fn test_save_adds_target_ability_and_save_proficiency() {
    let mut objects = ObjectStore::new();
    let wizard = objects.insert_actor(Actor::new("Wizard"));
    let rogue = objects.insert_actor(
        Actor::new("Rogue")
            .with_ability(Ability::Dexterity, 16)
            .with_proficiency_bonus(2)
            .with_proficiency("dex_save", ProficiencyLevel::Full),
    );
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, dex_save(15, &[10]), wizard, &[rogue]).unwrap();

    assert_eq!(saving_throw_event(&events), (10, 15, true));
}

#[test]
fn test_target_damage_joins_a_save_without_authored_damage() {
    let mut objects = ObjectStore::new();
    let warlock = objects.insert_actor(Actor::new("Warlock"));
    let hexed = objects.insert_actor(Actor::new("Hexed").with_hit_points(20).with_modifier(
        common::modifier(
            "hex",
            json!({
                "subevent": "damage_collection",
                "tags": ["target_damage_collection"],
                "operations": [{"function": "add_damage", "damage": [{"type": "necrotic", "bonus": 3}]}]
            }),
        ),
    ));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(&mut ctx, dex_save(20, &[5]), warlock, &[hexed]).unwrap();

    assert_eq!(common::of_type(&events, "rules.damage_delivered").len(), 1);
    assert_eq!(common::hit_points(&ctx, hexed), 17);
}

// --- contests ---

fn contest_against(opposition: serde_json::Value) -> serde_json::Value {
    json!({
        "subevent": "contest",
        "source": {"ability": "dex", "determined": [10]},
        "opposition": opposition
    })
}

fn contest_winner(opposition: serde_json::Value) -> ContestWinner {
    let mut objects = ObjectStore::new();
    let rogue = objects.insert_actor(Actor::new("Rogue"));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));
    let events = common::resolve(&mut ctx, contest_against(opposition), rogue, &[]).unwrap();
    let ResolutionEventKind::ContestResolved(contest) =
        &common::of_type(&events, "rules.contest_resolved")[0].kind
    else {
        panic!("expected a contest event");
    };
    assert_eq!(contest.source_total, 10);
    assert_eq!(contest.opposition_total, 10);
    contest.winner
}

#[test]
fn test_tie_against_plain_dc_goes_to_source() {
    let winner = contest_winner(json!({"type": "difficulty_class", "dc": 10}));
    assert_eq!(winner, ContestWinner::Source);
}

#[test]
fn test_tie_against_save_dc_goes_to_target() {
    let winner = contest_winner(json!({"type": "save_difficulty_class", "dc": 10}));
    assert_eq!(winner, ContestWinner::Target);
}

// --- resources ---

#[test]
fn test_exhaust_low_first_spends_cheapest_slots() {
    let slots: Vec<Resource> = [1, 2, 2, 3]
        .iter()
        .map(|p| Resource::new("spell_slot", *p))
        .collect();
    let ids: Vec<Uuid> = slots.iter().map(|r| r.id).collect();
    let mut wizard = Actor::new("Wizard");
    for slot in slots {
        wizard = wizard.with_resource(slot);
    }
    let mut objects = ObjectStore::new();
    let wizard = objects.insert_actor(wizard);
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({"subevent": "exhaust_resource", "type": "spell_slot", "count": 2, "order": "low_first"}),
        wizard,
        &[],
    )
    .unwrap();

    let ResolutionEventKind::ResourcesExhausted(changed) = &events[0].kind else {
        panic!("expected an exhaust event");
    };
    assert_eq!(changed.resource_ids, vec![ids[0], ids[1]]);
    let remaining: Vec<Uuid> = ctx
        .objects
        .actor(wizard)
        .unwrap()
        .resources
        .iter()
        .filter(|r| !r.exhausted)
        .map(|r| r.id)
        .collect();
    assert_eq!(remaining, vec![ids[2], ids[3]]);
}

fn tagged(resource: Resource, tags: &[&str]) -> Resource {
    let mut resource = resource;
    resource.tags = tags.iter().map(|t| (*t).to_owned()).collect();
    resource
}

#[test]
fn test_refresh_high_first_restores_strongest_spent_slots() {
    let mut slots: Vec<Resource> = [1, 2, 3]
        .iter()
        .map(|p| Resource::new("spell_slot", *p))
        .collect();
    for slot in &mut slots {
        slot.exhausted = true;
    }
    let ids: Vec<Uuid> = slots.iter().map(|r| r.id).collect();
    let mut sorcerer = Actor::new("Sorcerer");
    for slot in slots {
        sorcerer = sorcerer.with_resource(slot);
    }
    let mut objects = ObjectStore::new();
    let sorcerer = objects.insert_actor(sorcerer);
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({"subevent": "refresh_resource", "type": "spell_slot", "count": 2, "order": "high_first"}),
        sorcerer,
        &[],
    )
    .unwrap();

    let ResolutionEventKind::ResourcesRefreshed(changed) = &events[0].kind else {
        panic!("expected a refresh event");
    };
    assert_eq!(changed.resource_ids, vec![ids[2], ids[1]]);
    let still_spent: Vec<Uuid> = ctx
        .objects
        .actor(sorcerer)
        .unwrap()
        .resources
        .iter()
        .filter(|r| r.exhausted)
        .map(|r| r.id)
        .collect();
    assert_eq!(still_spent, vec![ids[0]]);
}

#[test]
fn test_give_resource_tags_instances_as_temporary() {
    let mut templates = Templates::new();
    templates.insert_resource(
        "inspiration",
        ResourceTemplate {
            resource_type: "inspiration".to_owned(),
            potency: 0,
            refresh: None,
            tags: vec!["bardic".to_owned()],
        },
    );
    let mut objects = ObjectStore::new();
    let bard = objects.insert_actor(Actor::new("Bard"));
    let fighter = objects.insert_actor(Actor::new("Fighter"));
    let mut ctx = common::context(objects, templates, SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({"subevent": "give_resource", "resource": "inspiration", "count": 2}),
        bard,
        &[fighter],
    )
    .unwrap();

    let resources = &ctx.objects.actor(fighter).unwrap().resources;
    assert_eq!(resources.len(), 2);
    for resource in resources {
        assert_eq!(resource.tags, vec!["bardic", "inspiration", TEMPORARY_TAG]);
        assert!(resource.is_temporary());
    }
    let ResolutionEventKind::ResourcesGiven(given) = &events[0].kind else {
        panic!("expected a give event");
    };
    assert_eq!(given.owner, fighter);
    assert_eq!(given.resource_ids.len(), 2);
    assert!(ctx.objects.actor(bard).unwrap().resources.is_empty());
}

#[test]
fn test_take_resource_never_removes_permanent_resources() {
    let permanent = tagged(Resource::new("ki", 1), &["ki"]);
    let first = tagged(Resource::new("ki", 1), &["ki", TEMPORARY_TAG]);
    let second = tagged(Resource::new("ki", 1), &["ki", TEMPORARY_TAG]);
    let other = tagged(Resource::new("rage", 1), &["rage", TEMPORARY_TAG]);
    let (permanent_id, first_id, second_id, other_id) = (permanent.id, first.id, second.id, other.id);
    let mut objects = ObjectStore::new();
    let monk = objects.insert_actor(
        Actor::new("Monk")
            .with_resource(permanent)
            .with_resource(first)
            .with_resource(second)
            .with_resource(other),
    );
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({"subevent": "take_resource", "tag": "ki"}),
        monk,
        &[],
    )
    .unwrap();

    let ResolutionEventKind::ResourcesTaken(taken) = &events[0].kind else {
        panic!("expected a take event");
    };
    assert_eq!(taken.resource_ids, vec![first_id, second_id]);
    let left: Vec<Uuid> = ctx
        .objects
        .actor(monk)
        .unwrap()
        .resources
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(left, vec![permanent_id, other_id]);
}

#[test]
fn test_take_resource_respects_count() {
    let mut objects = ObjectStore::new();
    let monk = objects.insert_actor(
        Actor::new("Monk")
            .with_resource(tagged(Resource::new("ki", 1), &["ki", TEMPORARY_TAG]))
            .with_resource(tagged(Resource::new("ki", 1), &["ki", TEMPORARY_TAG])),
    );
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    common::resolve(
        &mut ctx,
        json!({"subevent": "take_resource", "tag": "ki", "count": 1}),
        monk,
        &[],
    )
    .unwrap();

    assert_eq!(ctx.objects.actor(monk).unwrap().resources.len(), 1);
}

// --- damage ---

#[test]
fn test_vampiric_damage_heals_half_rounded_down() {
    let mut objects = ObjectStore::new();
    let vampire = objects.insert_actor(Actor::new("Vampire").with_hit_points(20).with_modifier(
        common::modifier(
            "bite",
            json!({
                "subevent": "deal_damage",
                "operations": [{
                    "function": "apply_vampirism",
                    "scale": {"numerator": 1, "denominator": 2, "round_up": false}
                }]
            }),
        ),
    ));
    set_current_hit_points(&mut objects, vampire, 10);
    let villager = objects.insert_actor(Actor::new("Villager").with_hit_points(12));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({
            "subevent": "deal_damage",
            "damage": [{"type": "necrotic", "dice": [{"count": 2, "size": 4, "determined": [3, 4]}]}]
        }),
        vampire,
        &[villager],
    )
    .unwrap();

    assert_eq!(common::hit_points(&ctx, villager), 12 - 7);
    assert_eq!(common::hit_points(&ctx, vampire), 13);
    let ResolutionEventKind::HealingDelivered(healing) =
        &common::of_type(&events, "rules.healing_delivered")[0].kind
    else {
        panic!("expected a healing event");
    };
    assert_eq!(healing.target, vampire);
    assert_eq!(healing.amount, 3);
}

#[test]
fn test_authored_vampirism_heals_the_source() {
    let mut objects = ObjectStore::new();
    let vampire = objects.insert_actor(Actor::new("Vampire").with_hit_points(20));
    set_current_hit_points(&mut objects, vampire, 10);
    let villager = objects.insert_actor(Actor::new("Villager").with_hit_points(12));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({
            "subevent": "deal_damage",
            "damage": [{"type": "necrotic", "dice": [{"count": 2, "size": 4, "determined": [3, 4]}]}],
            "vampirism": {"type": "necrotic", "scale": {"numerator": 1, "denominator": 2}}
        }),
        vampire,
        &[villager],
    )
    .unwrap();

    assert_eq!(common::hit_points(&ctx, villager), 5);
    assert_eq!(common::hit_points(&ctx, vampire), 13);
    assert_eq!(common::of_type(&events, "rules.healing_delivered").len(), 1);
}

#[test]
fn test_authored_vampirism_ignores_other_damage_types() {
    let mut objects = ObjectStore::new();
    let vampire = objects.insert_actor(Actor::new("Vampire").with_hit_points(20));
    set_current_hit_points(&mut objects, vampire, 10);
    let villager = objects.insert_actor(Actor::new("Villager").with_hit_points(12));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({
            "subevent": "attack_roll",
            "attack_type": "melee_weapon",
            "attack_ability": "str",
            "damage": [{"type": "piercing", "dice": [{"size": 4, "determined": [4]}]}],
            "vampirism": {"type": "necrotic"},
            "determined": [18]
        }),
        vampire,
        &[villager],
    )
    .unwrap();

    assert_eq!(common::hit_points(&ctx, villager), 8);
    assert_eq!(common::hit_points(&ctx, vampire), 10);
    assert!(common::of_type(&events, "rules.healing_delivered").is_empty());
}

fn set_current_hit_points(objects: &mut ObjectStore, actor: Uuid, current: i64) {
    objects.actor_mut(actor).unwrap().hit_points.current = current;
}

// --- modifier protocol ---

#[test]
fn test_modifier_on_both_parties_applies_once() {
    let blessing = common::modifier(
        "shared_blessing",
        json!({
            "subevent": "ability_check",
            "operations": [{"function": "add_bonus", "value": 2}]
        }),
    );
    let mut objects = ObjectStore::new();
    let rogue = objects.insert_actor(Actor::new("Rogue").with_modifier(blessing.clone()));
    let guard = objects.insert_actor(Actor::new("Guard").with_modifier(blessing));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));

    let events = common::resolve(
        &mut ctx,
        json!({"subevent": "ability_check", "ability": "dex", "determined": [10]}),
        rogue,
        &[guard],
    )
    .unwrap();

    let ResolutionEventKind::CheckResolved(check) = &events[0].kind else {
        panic!("expected a check event");
    };
    assert_eq!(check.total, 12);
}

#[test]
fn test_clone_keeps_modifier_history_and_fresh_instance_starts_clean() {
    let guidance = common::modifier(
        "guidance",
        json!({
            "subevent": "ability_check",
            "operations": [{"function": "add_bonus", "value": 2}]
        }),
    );
    let guidance_id = guidance.id;
    let mut objects = ObjectStore::new();
    let bard = objects.insert_actor(Actor::new("Bard").with_modifier(guidance));
    let mut ctx = common::context(objects, Templates::new(), SequenceRng::new(vec![]));
    let spec = ActionSpec::from_value(
        json!({"subevent": "ability_check", "ability": "cha", "determined": [10]}),
    )
    .unwrap();

    let mut original = spec.instantiate();
    original.header_mut().source = Some(bard);
    ctx.process_action(original.as_mut()).unwrap();

    let mut copy = original.clone();
    ctx.process_action(copy.as_mut()).unwrap();
    assert_eq!(copy.header().applied_modifiers, vec![guidance_id]);
    assert_eq!(copy.calculation_mut().unwrap().bonus(), 2);

    let mut fresh = spec.instantiate();
    assert!(fresh.header().applied_modifiers.is_empty());
    fresh.header_mut().source = Some(bard);
    ctx.process_action(fresh.as_mut()).unwrap();
    assert_eq!(fresh.calculation_mut().unwrap().bonus(), 2);
}

#[test]
fn test_self_triggering_modifier_hits_depth_limit() {
    let echo = common::modifier(
        "echo",
        json!({
            "subevent": "ability_check",
            "operations": [{
                "function": "invoke_action",
                "action": {"subevent": "ability_check", "ability": "wis"}
            }]
        }),
    );
    let mut objects = ObjectStore::new();
    let monk = objects.insert_actor(Actor::new("Monk").with_modifier(echo));
    let config = EngineConfig {
        max_nesting_depth: 4,
        ..EngineConfig::default()
    };
    let mut ctx = Context::new(objects, Templates::new(), config, Box::new(MockRng));

    let result = common::resolve(
        &mut ctx,
        json!({"subevent": "ability_check", "ability": "wis"}),
        monk,
        &[],
    );

    assert_eq!(result, Err(RulesError::NestingTooDeep { limit: 4 }));
}

#[test]
fn test_declared_kind_must_match_implementation() {
    let mut objects = ObjectStore::new();
    let druid = objects.insert_actor(Actor::new("Druid"));
    let mut ctx = common::context(objects, attack_templates(), SequenceRng::new(vec![]));
    let mut action = GiveEffect::with_header(
        ActionHeader::new(ActionKind::RemoveEffect),
        EffectRequest {
            effect: "bleeding".to_owned(),
        },
    );
    action.header_mut().target = Some(druid);

    action.prepare(&mut ctx).unwrap();
    let result = action.invoke(&mut ctx);

    assert_eq!(
        result,
        Err(RulesError::KindMismatch {
            declared: "remove_effect",
            implemented: "give_effect",
        })
    );
    assert!(!has_effect(&ctx, druid, "bleeding"));
}

// --- content parsing ---

#[test]
fn test_unknown_kinds_are_rejected_at_parse_time() {
    let unknown = ActionSpec::from_value(json!({"subevent": "fireball"}));
    assert_eq!(unknown.unwrap_err(), RulesError::UnknownActionKind("fireball".to_owned()));

    let internal = ActionSpec::from_value(json!({"subevent": "damage_delivery"}));
    assert_eq!(
        internal.unwrap_err(),
        RulesError::UnknownActionKind("damage_delivery".to_owned())
    );

    let nested = ActionSpec::from_value(json!({
        "subevent": "ability_check",
        "ability": "str",
        "pass": [{"subevent": "summon_dragon"}]
    }));
    assert_eq!(
        nested.unwrap_err(),
        RulesError::UnknownActionKind("summon_dragon".to_owned())
    );
}
