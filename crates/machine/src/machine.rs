//! The dispensing machine: stock, authorization gate, and the
//! eject/deny/cooldown state machine.
//!
//! One machine runs on a single-threaded fixed-timestep loop; requests are
//! synchronous and either mutate state immediately or stage a transition
//! resolved on a later [`VendingMachine::update`]. Exactly one eject or
//! deny sequence is in flight at a time, which is what prevents
//! double-dispense races.

use crate::{
    collect_accepted, AccessPolicy, Effect, Notice, RestockAction, SoundCue, StockEntry,
    StockGroup, StockTable, ThrowSpec, TypeWhitelist, VisualState,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use smartvend_core::{
    machine_rng, ActorId, Container, ItemId, ItemStore, MachineId, RejectReason,
};
use tracing::debug;

/// Exclusive animation state of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Ready for requests.
    Idle,
    /// Playing the eject sequence; the pending item releases when the timer
    /// elapses.
    Ejecting,
    /// Playing the deny sequence.
    Denying,
}

/// What an eject request points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EjectTarget {
    /// A specific item instance.
    Item(ItemId),
    /// The first group of the given type id.
    Kind(String),
}

/// External pricing collaborator.
pub trait PriceSource {
    /// Unit price for one item of the given type.
    fn unit_price(&self, type_id: &str) -> f64;
}

impl<F> PriceSource for F
where
    F: Fn(&str) -> f64,
{
    fn unit_price(&self, type_id: &str) -> f64 {
        self(type_id)
    }
}

/// Tuning knobs for one machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Seconds the machine stays in `Ejecting` before releasing the item.
    pub eject_delay: f32,
    /// Seconds the machine stays in `Denying`.
    pub deny_delay: f32,
    /// Probability that a qualifying hit dispenses a random item. `None`
    /// disables hit-triggered dispensing.
    pub dispense_on_hit_chance: Option<f64>,
    /// Minimum damage per hit to roll for a dispense.
    pub dispense_on_hit_threshold: f32,
    /// Seconds before damage can trigger another dispense. Zero means no
    /// cooldown.
    pub dispense_on_hit_cooldown: f32,
    /// Whether user-requested vends are thrown rather than dropped.
    pub throw_on_vend: bool,
    /// Force handed to the throw collaborator.
    pub throw_force: f32,
    /// Each planar throw component is drawn from `[-range, range]`.
    pub throw_range: f32,
    /// Which item types the machine accepts.
    pub item_whitelist: TypeWhitelist,
    /// Which source container kinds may bulk-restock the machine.
    pub source_whitelist: TypeWhitelist,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            eject_delay: 0.6,
            deny_delay: 1.0,
            dispense_on_hit_chance: None,
            dispense_on_hit_threshold: 2.0,
            dispense_on_hit_cooldown: 1.0,
            throw_on_vend: false,
            throw_force: 7.5,
            throw_range: 5.0,
            item_whitelist: TypeWhitelist::Any,
            source_whitelist: TypeWhitelist::Any,
        }
    }
}

/// A stock-backed dispensing machine instance.
pub struct VendingMachine {
    id: MachineId,
    config: MachineConfig,
    stock: StockTable,
    container: Container,

    mode: Mode,
    pending_eject: Option<ItemId>,
    pending_throw: bool,
    eject_elapsed: f32,
    deny_elapsed: f32,
    hit_cooling_down: bool,
    hit_cooldown_elapsed: f32,

    broken: bool,
    powered: bool,
    access_bypass: bool,
    access: Option<Box<dyn AccessPolicy + Send + Sync>>,
    restock: Option<RestockAction>,

    effects: Vec<Effect>,
    last_visual: Option<VisualState>,
    rng: StdRng,
}

impl VendingMachine {
    /// Create a powered, idle, empty machine.
    pub fn new(id: MachineId, config: MachineConfig, world_seed: u64) -> Self {
        let rng = machine_rng(world_seed, id);
        let mut machine = Self {
            id,
            config,
            stock: StockTable::new(),
            container: Container::new(),
            mode: Mode::Idle,
            pending_eject: None,
            pending_throw: false,
            eject_elapsed: 0.0,
            deny_elapsed: 0.0,
            hit_cooling_down: false,
            hit_cooldown_elapsed: 0.0,
            broken: false,
            powered: true,
            access_bypass: false,
            access: None,
            restock: None,
            effects: Vec::new(),
            last_visual: None,
            rng,
        };
        machine.push_visual();
        machine
    }

    /// Attach an access policy; without one, everyone is authorized.
    pub fn with_access_policy(mut self, policy: impl AccessPolicy + Send + Sync + 'static) -> Self {
        self.access = Some(Box::new(policy));
        self
    }

    /// This machine's identifier.
    pub fn id(&self) -> MachineId {
        self.id
    }

    /// Current exclusive mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Machine configuration.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Read-only stock table.
    pub fn stock(&self) -> &StockTable {
        &self.stock
    }

    /// The machine's physical container contents.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Item staged for release, while `mode == Ejecting`.
    pub fn pending_eject(&self) -> Option<ItemId> {
        self.pending_eject
    }

    /// Whether the machine is broken.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Whether the machine is powered.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Whether a hit-triggered dispense is on cooldown.
    pub fn hit_cooling_down(&self) -> bool {
        self.hit_cooling_down
    }

    /// Whether a timed restock is waiting to complete.
    pub fn restock_in_progress(&self) -> bool {
        self.restock.is_some()
    }

    /// Read-only stock listing for observers.
    pub fn snapshot(&self) -> Vec<StockEntry> {
        self.stock.snapshot()
    }

    /// Take all effects emitted since the last drain.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Set the powered flag (external power collaborator).
    pub fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
        self.push_visual();
    }

    /// Set the broken flag (external destructible collaborator). Breaking a
    /// machine interrupts any pending restock.
    pub fn set_broken(&mut self, broken: bool) {
        self.broken = broken;
        if broken {
            self.cancel_restock();
        }
        self.push_visual();
    }

    /// Administrative unlock: authorize every actor regardless of policy.
    pub fn set_access_bypass(&mut self, bypass: bool) {
        self.access_bypass = bypass;
    }

    /// Externally visible state, derived from current fields. First match
    /// wins: broken, ejecting, denying, unpowered, normal.
    pub fn visual_state(&self) -> VisualState {
        if self.broken {
            VisualState::Broken
        } else if self.mode == Mode::Ejecting {
            VisualState::Eject
        } else if self.mode == Mode::Denying {
            VisualState::Deny
        } else if !self.powered {
            VisualState::Off
        } else {
            VisualState::Normal
        }
    }

    /// Total value of held stock.
    pub fn stock_value(&self, prices: &dyn PriceSource) -> f64 {
        self.stock
            .groups()
            .iter()
            .map(|g| g.count as f64 * prices.unit_price(&g.type_id))
            .sum()
    }

    /// The authorization gate. Returns true when no policy is configured,
    /// the bypass flag is set, or the policy allows the actor. On refusal,
    /// emits the access-denied notice and starts the deny sequence.
    pub fn is_authorized(&mut self, actor: ActorId) -> bool {
        if self.access_bypass {
            return true;
        }
        match &self.access {
            None => true,
            Some(policy) => {
                if policy.is_allowed(actor, self.id) {
                    true
                } else {
                    self.effects.push(Effect::Notice(Notice::AccessDenied));
                    self.deny();
                    false
                }
            }
        }
    }

    /// Authorization-gated eject request from an actor.
    pub fn request_eject(
        &mut self,
        actor: ActorId,
        target: EjectTarget,
        throw: bool,
    ) -> Result<(), RejectReason> {
        if self.broken || !self.powered {
            return Err(RejectReason::Unavailable);
        }
        if self.mode != Mode::Idle {
            return Err(RejectReason::Busy);
        }
        if !self.is_authorized(actor) {
            return Err(RejectReason::NotAuthorized);
        }
        self.try_eject(target, throw)
    }

    /// Stage an eject without consulting the access policy (trigger-driven
    /// callers). Still requires a powered, intact, idle machine.
    pub fn try_eject(&mut self, target: EjectTarget, throw: bool) -> Result<(), RejectReason> {
        if self.broken || !self.powered {
            return Err(RejectReason::Unavailable);
        }
        if self.mode != Mode::Idle {
            return Err(RejectReason::Busy);
        }

        let idx = match &target {
            EjectTarget::Item(id) => self.stock.position_by_item(*id),
            EjectTarget::Kind(type_id) => self.stock.position_by_type(type_id),
        };
        let Some(idx) = idx else {
            self.effects.push(Effect::Notice(Notice::InvalidItem));
            self.deny();
            return Err(RejectReason::InvalidTarget);
        };

        // A resolved group can still be empty if a concurrent request won
        // the race for its last unit.
        let Some(id) = self.stock.remove_one_at(idx) else {
            self.effects.push(Effect::Notice(Notice::OutOfStock));
            self.deny();
            return Err(RejectReason::OutOfStock);
        };

        // The unit is logically gone from stock the instant the eject is
        // accepted; physical release waits for the timer. Machines tuned to
        // throw do so even when the caller did not ask.
        self.mode = Mode::Ejecting;
        self.eject_elapsed = 0.0;
        self.pending_eject = Some(id);
        self.pending_throw = throw || self.config.throw_on_vend;
        self.effects.push(Effect::StockChanged);
        self.effects.push(Effect::Sound(SoundCue::Vend));
        self.push_visual();
        debug!(machine = self.id.0, item = id.0, "eject staged");
        Ok(())
    }

    /// Start the deny sequence. Idempotent while already denying (the timer
    /// is not restarted); a no-op while ejecting.
    pub fn deny(&mut self) {
        if self.mode != Mode::Idle {
            return;
        }
        self.mode = Mode::Denying;
        self.deny_elapsed = 0.0;
        self.effects.push(Effect::Sound(SoundCue::Deny));
        self.push_visual();
    }

    /// Dispense a random available item. Forced ejection skips the gate and
    /// the animation, never touches `mode`, releases the group head
    /// immediately, and deletes the whole group in one step. Non-forced
    /// routes through the regular staged eject. A no-op on empty stock.
    pub fn eject_random(&mut self, throw: bool, forced: bool) {
        let heads: Vec<ItemId> = self.stock.available().map(|g| g.ids[0]).collect();
        if heads.is_empty() {
            return;
        }
        let head = heads[self.rng.gen_range(0..heads.len())];

        if forced {
            let Some(idx) = self.stock.position_by_item(head) else {
                return;
            };
            let removed = self.stock.remove_group_at(idx, &mut self.container);
            let spec = throw.then(|| self.random_throw());
            self.effects.push(Effect::Release {
                item: head,
                throw: spec,
            });
            self.effects.push(Effect::StockChanged);
            debug!(
                machine = self.id.0,
                item = head.0,
                discarded = removed.len() - 1,
                "forced eject"
            );
        } else {
            let _ = self.try_eject(EjectTarget::Item(head), throw);
        }
    }

    /// Damage event from the destructible collaborator. Interrupts a
    /// pending restock, then rolls the hit-triggered dispense.
    pub fn apply_damage(&mut self, delta: f32) {
        if delta <= 0.0 {
            return;
        }
        self.cancel_restock();

        let Some(chance) = self.config.dispense_on_hit_chance else {
            return;
        };
        if self.broken || self.hit_cooling_down {
            return;
        }
        if delta < self.config.dispense_on_hit_threshold {
            return;
        }
        if !self.rng.gen_bool(chance.clamp(0.0, 1.0)) {
            return;
        }
        if self.config.dispense_on_hit_cooldown > 0.0 {
            self.hit_cooling_down = true;
            self.hit_cooldown_elapsed = 0.0;
        }
        self.eject_random(true, true);
    }

    /// Begin a timed restock from a source container. Items are only
    /// inserted when the wait completes; see [`crate::RestockAction`].
    pub fn begin_restock(
        &mut self,
        actor: ActorId,
        source: &Container,
        source_kind: &str,
        store: &ItemStore,
    ) -> Result<(), RejectReason> {
        if self.broken || !self.powered {
            return Err(RejectReason::Unavailable);
        }
        if self.restock.is_some() {
            return Err(RejectReason::Busy);
        }
        if !self.config.source_whitelist.matches(source_kind) {
            return Err(RejectReason::RejectedItem);
        }
        if !self.is_authorized(actor) {
            return Err(RejectReason::NotAuthorized);
        }

        let pending = collect_accepted(source, &self.config.item_whitelist, store);
        if pending.is_empty() {
            // A source with nothing acceptable degrades to a no-op.
            return Err(RejectReason::RejectedItem);
        }
        debug!(
            machine = self.id.0,
            actor = actor.0,
            items = pending.len(),
            "restock started"
        );
        self.restock = Some(RestockAction::new(actor, pending));
        Ok(())
    }

    /// Interrupt a pending restock (movement or damage). No stock mutation
    /// has happened yet, so the source keeps everything.
    pub fn cancel_restock(&mut self) {
        if self.restock.take().is_some() {
            debug!(machine = self.id.0, "restock interrupted");
        }
    }

    /// Insert a single item, with the same whitelist and gate as restock
    /// but no timed action.
    pub fn add_item(
        &mut self,
        actor: ActorId,
        id: ItemId,
        store: &ItemStore,
    ) -> Result<(), RejectReason> {
        if self.broken || !self.powered {
            return Err(RejectReason::Unavailable);
        }
        let Some(record) = store.get(id) else {
            return Err(RejectReason::InvalidTarget);
        };
        let record = record.clone();
        if !self.config.item_whitelist.matches(&record.type_id) {
            return Err(RejectReason::RejectedItem);
        }
        if !self.is_authorized(actor) {
            return Err(RejectReason::NotAuthorized);
        }
        self.stock
            .insert(id, &record.type_id, &record.display_name, &mut self.container);
        self.effects.push(Effect::Sound(SoundCue::Insert));
        self.effects.push(Effect::StockChanged);
        Ok(())
    }

    /// Advance timers by one fixed step. Resolves pending ejections and
    /// denials, ticks the hit cooldown, and completes a finished restock.
    pub fn update(&mut self, dt: f32, store: &ItemStore) {
        match self.mode {
            Mode::Ejecting => {
                self.eject_elapsed += dt;
                if self.eject_elapsed >= self.config.eject_delay {
                    self.eject_elapsed = 0.0;
                    self.mode = Mode::Idle;
                    self.release_pending();
                    self.push_visual();
                }
            }
            Mode::Denying => {
                self.deny_elapsed += dt;
                if self.deny_elapsed >= self.config.deny_delay {
                    self.deny_elapsed = 0.0;
                    self.mode = Mode::Idle;
                    self.push_visual();
                }
            }
            Mode::Idle => {}
        }

        if self.hit_cooling_down {
            self.hit_cooldown_elapsed += dt;
            if self.hit_cooldown_elapsed >= self.config.dispense_on_hit_cooldown {
                self.hit_cooldown_elapsed = 0.0;
                self.hit_cooling_down = false;
            }
        }

        let restock_done = self
            .restock
            .as_mut()
            .is_some_and(|action| action.advance(dt));
        if restock_done {
            if let Some(action) = self.restock.take() {
                self.finish_restock(action, store);
            }
        }
    }

    fn release_pending(&mut self) {
        let Some(id) = self.pending_eject.take() else {
            return;
        };
        self.container.remove(id);
        let throw = self.pending_throw.then(|| self.random_throw());
        self.pending_throw = false;
        self.effects.push(Effect::Release { item: id, throw });
        debug!(machine = self.id.0, item = id.0, "item released");
    }

    fn finish_restock(&mut self, action: RestockAction, store: &ItemStore) {
        let mut raw = Vec::new();
        let mut items = Vec::new();
        for pending in action.pending {
            // Items despawned during the wait are skipped.
            if !store.contains(pending.id) {
                continue;
            }
            raw.push(StockGroup::single(
                pending.id,
                pending.type_id,
                pending.display_name,
            ));
            items.push(pending.id);
        }
        if items.is_empty() {
            return;
        }
        self.stock.merge(raw, &mut self.container);
        self.effects.push(Effect::Sound(SoundCue::Insert));
        self.effects.push(Effect::StockChanged);
        self.effects.push(Effect::RestockComplete { items });
        debug!(machine = self.id.0, total = self.stock.total_count(), "restock complete");
    }

    fn random_throw(&mut self) -> ThrowSpec {
        let range = self.config.throw_range;
        ThrowSpec {
            direction: (
                self.rng.gen_range(-range..=range),
                self.rng.gen_range(-range..=range),
            ),
            force: self.config.throw_force,
        }
    }

    fn push_visual(&mut self) {
        let state = self.visual_state();
        if self.last_visual != Some(state) {
            self.last_visual = Some(state);
            self.effects.push(Effect::Visual(state));
        }
    }
}
