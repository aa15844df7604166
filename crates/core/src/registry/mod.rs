//! Named cart stacks and everything that spans more than one of them.
//!
//! [`StackRegistry::activate`] is the only path that puts a cart on air. It
//! retires whatever is live in every other stack before delegating to the
//! owning queue, which keeps at most one live cart across the whole deck.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::StackConfig,
    queue::{CartQueue, Placement, ReorderTarget},
    CartError, CartId, CartItem, Result, SourceDescriptor,
};

/// Stable identifier of a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackId(String);

impl StackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed cross-stack move message sent by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MoveRequest {
    pub cart_id: CartId,
    pub source_stack: StackId,
    pub target_stack: StackId,
    /// Insert before this cart. `None` or an unknown id appends at the tail.
    #[serde(default)]
    pub before_id: Option<CartId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { index: usize, requeued: bool },
    /// Same-stack drags go through [`StackRegistry::reorder`].
    SameStack,
    /// The cart or one of the stacks does not exist; nothing changed.
    NotFound,
}

/// Read-only ordered view of one stack for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackSnapshot {
    pub id: StackId,
    pub items: Vec<CartItem>,
    pub active: Option<CartId>,
}

#[derive(Debug, Clone)]
struct Stack {
    id: StackId,
    queue: CartQueue,
}

#[derive(Debug, Clone)]
pub struct StackRegistry {
    config: StackConfig,
    stacks: Vec<Stack>,
}

impl Default for StackRegistry {
    fn default() -> Self {
        Self::new(StackConfig::default())
    }
}

impl StackRegistry {
    /// Creates one empty stack per configured name, in configuration order.
    pub fn new(config: StackConfig) -> Self {
        let mut registry = Self {
            config,
            stacks: Vec::new(),
        };
        for name in registry.config.names.clone() {
            registry.add_stack(name.as_str());
        }
        registry
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Registers a new empty stack. Returns `false` if it already exists.
    pub fn add_stack(&mut self, id: impl Into<StackId>) -> bool {
        let id = id.into();
        if self.index_of(&id).is_some() {
            return false;
        }
        self.stacks.push(Stack {
            id,
            queue: CartQueue::new(),
        });
        true
    }

    pub fn stack_ids(&self) -> Vec<StackId> {
        self.stacks.iter().map(|stack| stack.id.clone()).collect()
    }

    pub fn queue(&self, stack: &StackId) -> Option<&CartQueue> {
        self.index_of(stack).map(|index| &self.stacks[index].queue)
    }

    /// Returns the stack that currently owns `id`.
    pub fn locate(&self, id: CartId) -> Option<&StackId> {
        self.stacks
            .iter()
            .find(|stack| stack.queue.contains(id))
            .map(|stack| &stack.id)
    }

    pub fn get(&self, id: CartId) -> Option<&CartItem> {
        self.stacks.iter().find_map(|stack| stack.queue.get(id))
    }

    /// Ingests one source. Non-audio sources are skipped and yield `None`.
    pub fn add_source(
        &mut self,
        stack: &StackId,
        descriptor: SourceDescriptor,
    ) -> Result<Option<CartItem>> {
        let index = self.require(stack)?;
        Ok(self.ingest(index, descriptor))
    }

    /// Ingests a batch of sources, returning the carts that were created.
    pub fn add_sources(
        &mut self,
        stack: &StackId,
        descriptors: impl IntoIterator<Item = SourceDescriptor>,
    ) -> Result<Vec<CartItem>> {
        let index = self.require(stack)?;
        Ok(descriptors
            .into_iter()
            .filter_map(|descriptor| self.ingest(index, descriptor))
            .collect())
    }

    fn ingest(&mut self, index: usize, descriptor: SourceDescriptor) -> Option<CartItem> {
        if !self.config.accepts_mime(&descriptor.mime_type) {
            debug!(
                name = %descriptor.display_name,
                mime = %descriptor.mime_type,
                "skipping non-audio source"
            );
            return None;
        }

        let item = CartItem::from_descriptor(descriptor, &self.config.fallback_title);
        let stack = &mut self.stacks[index];
        stack.queue.append(item.clone());
        debug!(stack = %stack.id, cart = %item.id(), title = item.title(), "cart added");
        Some(item)
    }

    /// Back-fills a duration resolved after ingestion. Carts removed in the
    /// meantime are not brought back.
    pub fn apply_duration(&mut self, id: CartId, seconds: f64) -> bool {
        if !seconds.is_finite() || seconds < 0.0 {
            warn!(cart = %id, seconds, "ignoring invalid resolved duration");
            return false;
        }

        let updated = self
            .stacks
            .iter_mut()
            .any(|stack| stack.queue.set_duration(id, seconds));
        if !updated {
            debug!(cart = %id, "duration resolved for a removed cart");
        }
        updated
    }

    pub fn remove(&mut self, stack: &StackId, id: CartId) -> Option<CartItem> {
        let index = self.index_of(stack)?;
        self.stacks[index].queue.remove(id)
    }

    pub fn reorder(
        &mut self,
        stack: &StackId,
        id: CartId,
        target: ReorderTarget,
    ) -> Option<Placement> {
        let index = self.index_of(stack)?;
        self.stacks[index].queue.reorder(id, target)
    }

    pub fn requeue_to_top(&mut self, stack: &StackId, id: CartId) -> Option<Placement> {
        let index = self.index_of(stack)?;
        self.stacks[index].queue.requeue_to_top(id)
    }

    pub fn rename(&mut self, id: CartId, title: &str) -> bool {
        let fallback = self.config.fallback_title.as_str();
        self.stacks
            .iter_mut()
            .any(|stack| stack.queue.rename(id, title, fallback))
    }

    /// Moves a cart between two different stacks.
    pub fn move_across(&mut self, request: MoveRequest) -> MoveOutcome {
        if request.source_stack == request.target_stack {
            return MoveOutcome::SameStack;
        }

        let (Some(from), Some(to)) = (
            self.index_of(&request.source_stack),
            self.index_of(&request.target_stack),
        ) else {
            return MoveOutcome::NotFound;
        };

        let Some(item) = self.stacks[from].queue.remove(request.cart_id) else {
            return MoveOutcome::NotFound;
        };

        let Placement { index, requeued } = self.stacks[to]
            .queue
            .insert(item, ReorderTarget::from(request.before_id));

        debug!(
            cart = %request.cart_id,
            from = %request.source_stack,
            to = %request.target_stack,
            index,
            requeued,
            "cart moved across stacks"
        );
        MoveOutcome::Moved { index, requeued }
    }

    /// Parses a JSON move message and applies it.
    pub fn apply_move_payload(&mut self, payload: &str) -> Result<MoveOutcome> {
        let request: MoveRequest = serde_json::from_str(payload).map_err(|err| {
            warn!(%err, "rejecting malformed move payload");
            CartError::MalformedPayload(err.to_string())
        })?;
        Ok(self.move_across(request))
    }

    /// Puts `id` on air. The live cart of every other stack is retired and
    /// the owning queue demotes its own previous live cart.
    pub fn activate(&mut self, stack: &StackId, id: CartId) -> Option<CartItem> {
        let target = self.index_of(stack)?;
        if !self.stacks[target].queue.contains(id) {
            return None;
        }

        for (index, other) in self.stacks.iter_mut().enumerate() {
            if index == target {
                continue;
            }
            if let Some(retired) = other.queue.deactivate() {
                debug!(stack = %other.id, cart = %retired, "retired live cart");
            }
        }

        let queue = &mut self.stacks[target].queue;
        let activation = queue.activate_top(id)?;
        debug!(stack = %stack, cart = %id, demoted = ?activation.demoted, "cart on air");
        queue.get(id).cloned()
    }

    /// Hotkey play: arms whatever sits at position 0, even if it was played.
    pub fn play_top(&mut self, stack: &StackId) -> Option<CartItem> {
        let id = self.queue(stack)?.top()?.id();
        self.activate(stack, id)
    }

    /// Stops the live cart of `stack`.
    pub fn stop(&mut self, stack: &StackId) -> Option<CartId> {
        let index = self.index_of(stack)?;
        self.stacks[index].queue.deactivate()
    }

    /// The playback surface reported that `id` reached its end.
    pub fn playback_ended(&mut self, id: CartId) -> bool {
        self.stacks.iter_mut().any(|stack| stack.queue.finish(id))
    }

    pub fn pause(&mut self, id: CartId) -> bool {
        self.stacks.iter_mut().any(|stack| stack.queue.pause(id))
    }

    pub fn resume(&mut self, id: CartId) -> bool {
        self.stacks.iter_mut().any(|stack| stack.queue.resume(id))
    }

    /// The single live cart across all stacks, if any.
    pub fn now_playing(&self) -> Option<(&StackId, &CartItem)> {
        self.stacks
            .iter()
            .find_map(|stack| stack.queue.live().map(|item| (&stack.id, item)))
    }

    pub fn stack_snapshot(&self, stack: &StackId) -> Option<StackSnapshot> {
        self.index_of(stack)
            .map(|index| Self::snapshot_of(&self.stacks[index]))
    }

    pub fn snapshot(&self) -> Vec<StackSnapshot> {
        self.stacks.iter().map(Self::snapshot_of).collect()
    }

    fn snapshot_of(stack: &Stack) -> StackSnapshot {
        StackSnapshot {
            id: stack.id.clone(),
            items: stack.queue.items().to_vec(),
            active: stack.queue.active().map(CartItem::id),
        }
    }

    fn index_of(&self, id: &StackId) -> Option<usize> {
        self.stacks.iter().position(|stack| &stack.id == id)
    }

    fn require(&self, id: &StackId) -> Result<usize> {
        self.index_of(id)
            .ok_or_else(|| CartError::UnknownStack(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CartStatus, SourceHandle};

    fn registry() -> StackRegistry {
        StackRegistry::new(StackConfig {
            names: vec!["A".into(), "B".into()],
            ..StackConfig::default()
        })
    }

    fn audio(name: &str) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceHandle::Path(format!("{name}.wav").into()),
            "audio/wav",
            name,
        )
    }

    fn fill(registry: &mut StackRegistry, stack: &str, names: &[&str]) -> Vec<CartId> {
        registry
            .add_sources(&stack.into(), names.iter().map(|name| audio(name)))
            .unwrap()
            .iter()
            .map(CartItem::id)
            .collect()
    }

    fn titles(registry: &StackRegistry, stack: &str) -> Vec<String> {
        registry
            .queue(&stack.into())
            .unwrap()
            .items()
            .iter()
            .map(|item| item.title().to_string())
            .collect()
    }

    fn live_count(registry: &StackRegistry) -> usize {
        registry
            .snapshot()
            .iter()
            .flat_map(|stack| stack.items.iter())
            .filter(|item| item.status().is_live())
            .count()
    }

    #[test]
    fn ingestion_filters_non_audio_sources() {
        let mut registry = registry();
        let created = registry
            .add_sources(
                &"A".into(),
                vec![
                    audio("jingle"),
                    SourceDescriptor::new(SourceHandle::Url("blob:x".into()), "image/png", "art"),
                    SourceDescriptor::new(SourceHandle::Url("blob:y".into()), "audio/mpeg", ""),
                ],
            )
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(titles(&registry, "A"), vec!["jingle", "Untitled"]);
        assert!(created
            .iter()
            .all(|item| item.status() == CartStatus::Queued && item.duration_seconds() == 0.0));
    }

    #[test]
    fn ingestion_into_unknown_stack_is_rejected() {
        let mut registry = registry();
        let err = registry.add_source(&"Z".into(), audio("x")).unwrap_err();
        assert!(matches!(err, CartError::UnknownStack(name) if name == "Z"));
    }

    #[test]
    fn duration_backfill_updates_only_matching_cart() {
        let mut registry = registry();
        let ids = fill(&mut registry, "A", &["a", "b"]);

        assert!(registry.apply_duration(ids[1], 31.0));
        assert_eq!(registry.get(ids[1]).unwrap().duration_seconds(), 31.0);
        assert_eq!(registry.get(ids[0]).unwrap().duration_seconds(), 0.0);
        assert!(!registry.apply_duration(ids[0], f64::NAN));
    }

    #[test]
    fn repeated_duration_results_keep_last_value() {
        let mut registry = registry();
        let ids = fill(&mut registry, "A", &["a", "b"]);
        registry.activate(&"A".into(), ids[1]);

        assert!(registry.apply_duration(ids[1], 3.0));
        assert!(registry.apply_duration(ids[1], 5.0));

        let queue = registry.queue(&"A".into()).unwrap();
        assert_eq!(queue.get(ids[1]).unwrap().duration_seconds(), 5.0);
        assert_eq!(queue.get(ids[1]).unwrap().status(), CartStatus::Playing);
        assert_eq!(queue.ids(), ids);
    }

    #[test]
    fn late_duration_does_not_resurrect_removed_cart() {
        let mut registry = registry();
        let ids = fill(&mut registry, "A", &["a"]);
        registry.remove(&"A".into(), ids[0]);

        assert!(!registry.apply_duration(ids[0], 4.0));
        assert!(registry.get(ids[0]).is_none());
        assert!(registry.queue(&"A".into()).unwrap().is_empty());
    }

    #[test]
    fn move_across_inserts_before_target() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1", "a2"]);
        let b = fill(&mut registry, "B", &["b1", "b2"]);
        registry.apply_duration(a[0], 9.0);

        let outcome = registry.move_across(MoveRequest {
            cart_id: a[0],
            source_stack: "A".into(),
            target_stack: "B".into(),
            before_id: Some(b[1]),
        });

        assert_eq!(outcome, MoveOutcome::Moved { index: 1, requeued: false });
        assert_eq!(titles(&registry, "A"), vec!["a2"]);
        assert_eq!(titles(&registry, "B"), vec!["b1", "a1", "b2"]);
        assert_eq!(registry.locate(a[0]), Some(&"B".into()));
        assert_eq!(registry.get(a[0]).unwrap().duration_seconds(), 9.0);
    }

    #[test]
    fn move_across_with_unknown_target_appends() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1"]);
        fill(&mut registry, "B", &["b1"]);

        let outcome = registry.move_across(MoveRequest {
            cart_id: a[0],
            source_stack: "A".into(),
            target_stack: "B".into(),
            before_id: Some(CartId::new()),
        });

        assert_eq!(outcome, MoveOutcome::Moved { index: 1, requeued: false });
        assert_eq!(titles(&registry, "B"), vec!["b1", "a1"]);
    }

    #[test]
    fn move_of_missing_cart_leaves_both_stacks_unchanged() {
        let mut registry = registry();
        fill(&mut registry, "A", &["a1"]);
        let b = fill(&mut registry, "B", &["b1"]);
        let before = registry.snapshot();

        let outcome = registry.move_across(MoveRequest {
            cart_id: b[0],
            source_stack: "A".into(),
            target_stack: "B".into(),
            before_id: None,
        });
        assert_eq!(outcome, MoveOutcome::NotFound);

        let outcome = registry.move_across(MoveRequest {
            cart_id: b[0],
            source_stack: "B".into(),
            target_stack: "Z".into(),
            before_id: None,
        });
        assert_eq!(outcome, MoveOutcome::NotFound);
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn same_stack_move_is_noop() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1", "a2"]);

        let outcome = registry.move_across(MoveRequest {
            cart_id: a[1],
            source_stack: "A".into(),
            target_stack: "A".into(),
            before_id: Some(a[0]),
        });
        assert_eq!(outcome, MoveOutcome::SameStack);
        assert_eq!(titles(&registry, "A"), vec!["a1", "a2"]);
    }

    #[test]
    fn played_cart_moved_to_top_of_other_stack_is_requeued() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1"]);
        let b = fill(&mut registry, "B", &["b1"]);
        registry.play_top(&"A".into());
        registry.playback_ended(a[0]);
        assert_eq!(registry.get(a[0]).unwrap().status(), CartStatus::Played);

        let outcome = registry.move_across(MoveRequest {
            cart_id: a[0],
            source_stack: "A".into(),
            target_stack: "B".into(),
            before_id: Some(b[0]),
        });

        assert_eq!(outcome, MoveOutcome::Moved { index: 0, requeued: true });
        assert_eq!(registry.get(a[0]).unwrap().status(), CartStatus::Queued);
    }

    #[test]
    fn played_cart_moved_below_top_keeps_status() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1"]);
        fill(&mut registry, "B", &["b1"]);
        registry.play_top(&"A".into());
        registry.stop(&"A".into());

        let outcome = registry.move_across(MoveRequest {
            cart_id: a[0],
            source_stack: "A".into(),
            target_stack: "B".into(),
            before_id: None,
        });

        assert_eq!(outcome, MoveOutcome::Moved { index: 1, requeued: false });
        assert_eq!(registry.get(a[0]).unwrap().status(), CartStatus::Played);
    }

    #[test]
    fn move_payload_round_trips_through_json() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1"]);
        let payload = format!(
            r#"{{"cartId": "{}", "sourceStack": "A", "targetStack": "B", "beforeId": null}}"#,
            a[0]
        );

        let outcome = registry.apply_move_payload(&payload).unwrap();
        assert_eq!(outcome, MoveOutcome::Moved { index: 0, requeued: false });
    }

    #[test]
    fn malformed_move_payload_is_rejected_without_changes() {
        let mut registry = registry();
        fill(&mut registry, "A", &["a1"]);
        let before = registry.snapshot();

        for payload in [
            "not json",
            r#"{"cartId": "nope", "sourceStack": "A", "targetStack": "B"}"#,
            r#"{"sourceStack": "A", "targetStack": "B"}"#,
        ] {
            let err = registry.apply_move_payload(payload).unwrap_err();
            assert!(matches!(err, CartError::MalformedPayload(_)));
        }
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn only_one_cart_is_live_across_stacks() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1", "a2"]);
        let b = fill(&mut registry, "B", &["b1"]);

        registry.play_top(&"A".into());
        assert_eq!(live_count(&registry), 1);

        let on_air = registry.play_top(&"B".into()).unwrap();
        assert_eq!(on_air.id(), b[0]);
        assert_eq!(live_count(&registry), 1);
        assert_eq!(registry.get(a[0]).unwrap().status(), CartStatus::Played);
        assert_eq!(titles(&registry, "A"), vec!["a2", "a1"]);
        assert_eq!(registry.now_playing().map(|(stack, _)| stack.as_str()), Some("B"));
    }

    #[test]
    fn activation_within_stack_demotes_exactly_one_cart() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1", "a2", "a3"]);

        registry.activate(&"A".into(), a[0]);
        registry.activate(&"A".into(), a[2]);

        assert_eq!(titles(&registry, "A"), vec!["a2", "a3", "a1"]);
        assert_eq!(registry.get(a[0]).unwrap().status(), CartStatus::Played);
        assert_eq!(registry.get(a[1]).unwrap().status(), CartStatus::Queued);
        assert_eq!(live_count(&registry), 1);
    }

    #[test]
    fn hotkey_rearms_played_cart_on_top() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1"]);

        registry.play_top(&"A".into());
        registry.playback_ended(a[0]);
        assert_eq!(registry.get(a[0]).unwrap().status(), CartStatus::Played);

        let on_air = registry.play_top(&"A".into()).unwrap();
        assert_eq!(on_air.status(), CartStatus::Playing);
    }

    #[test]
    fn activation_of_foreign_cart_changes_nothing() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1"]);
        let b = fill(&mut registry, "B", &["b1"]);
        registry.play_top(&"A".into());

        assert!(registry.activate(&"A".into(), b[0]).is_none());
        assert_eq!(registry.get(a[0]).unwrap().status(), CartStatus::Playing);
    }

    #[test]
    fn active_item_prefers_live_cart_then_top() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1", "a2"]);
        let stack: StackId = "A".into();

        assert_eq!(registry.stack_snapshot(&stack).unwrap().active, Some(a[0]));
        registry.activate(&stack, a[1]);
        assert_eq!(registry.stack_snapshot(&stack).unwrap().active, Some(a[1]));
        assert_eq!(registry.stack_snapshot(&"B".into()).unwrap().active, None);
    }

    #[test]
    fn pause_and_resume_keep_the_slot() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1", "a2"]);
        registry.play_top(&"A".into());

        assert!(registry.pause(a[0]));
        assert_eq!(registry.get(a[0]).unwrap().status(), CartStatus::Paused);
        assert_eq!(registry.now_playing().map(|(_, item)| item.id()), Some(a[0]));
        assert!(registry.resume(a[0]));
        assert!(!registry.resume(a[0]));
        assert!(registry.playback_ended(a[0]));
        assert!(registry.now_playing().is_none());
    }

    #[test]
    fn rename_normalizes_blank_titles() {
        let mut registry = registry();
        let a = fill(&mut registry, "A", &["a1"]);

        assert!(registry.rename(a[0], "  "));
        assert_eq!(registry.get(a[0]).unwrap().title(), "Untitled");
        assert!(!registry.rename(CartId::new(), "x"));
    }

    #[test]
    fn snapshots_serialize_for_rendering() {
        let mut registry = registry();
        fill(&mut registry, "A", &["a1"]);

        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json[0]["id"], "A");
        assert_eq!(json[0]["items"][0]["title"], "a1");
        assert!(json[1]["items"].as_array().unwrap().is_empty());
    }
}
