//! Core aggregate and domain event traits.

use std::fmt::{Debug, Display};

use chrono::{DateTime, Utc};
use common::{AggregateId, AggregateType, GameId};
use event_store::{EventEnvelope, EventId, StoredEvent, Version};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::DomainError;

/// Payload schema version of every event this crate records.
pub const SCHEMA_VERSION: u32 = 1;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent:
    Serialize + DeserializeOwned + Send + Sync + Clone + PartialEq + Debug
{
    /// Returns the event type name.
    ///
    /// This is used for serialization and event store filtering.
    fn event_type(&self) -> &'static str;

    /// The game this fact belongs to.
    fn game_id(&self) -> &GameId;
}

/// A domain event together with the identity and time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent<E> {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub schema_version: u32,
    pub event: E,
}

impl<E: DomainEvent> RecordedEvent<E> {
    /// Stamps a fresh id and the current time onto `event`.
    pub fn new(event: E) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_at: Utc::now(),
            schema_version: SCHEMA_VERSION,
            event,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }

    /// Builds the envelope handed to the event store.
    pub fn to_envelope(&self) -> Result<EventEnvelope, DomainError> {
        Ok(
            EventEnvelope::from_payload(self.event.event_type(), self.event.game_id().clone(), &self.event)?
                .with_event_id(self.event_id)
                .with_schema_version(self.schema_version)
                .with_occurred_at(self.occurred_at),
        )
    }

    /// Decodes a stored event back into the domain vocabulary.
    pub fn from_stored(stored: StoredEvent) -> Result<Self, DomainError> {
        Ok(Self {
            event_id: stored.event_id,
            occurred_at: stored.occurred_at,
            schema_version: stored.schema_version,
            event: serde_json::from_value(stored.payload)?,
        })
    }
}

/// Direction of a compensating event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restoration {
    Undo,
    Redo,
}

/// Payload of `ActionUndone` / `ActionRedone`: the whole state the aggregate
/// had at `restored_to_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRestoredData<S> {
    pub game_id: GameId,
    pub restored_to_version: Version,
    pub state: S,
}

/// Identity, committed version, state and pending changes of one aggregate.
///
/// State only changes through `record`, which applies the event before
/// buffering it, or through the fold performed at load time.
#[derive(Debug, Clone)]
pub struct Root<Id, E, S> {
    id: Id,
    version: Version,
    state: S,
    uncommitted: Vec<RecordedEvent<E>>,
}

impl<Id, E: DomainEvent, S> Root<Id, E, S> {
    pub(crate) fn committed(id: Id, state: S, version: Version) -> Self {
        Self {
            id,
            version,
            state,
            uncommitted: Vec::new(),
        }
    }

    /// A brand-new aggregate whose creation event is still pending.
    pub(crate) fn created(id: Id, state: S, creation: E) -> Self {
        Self {
            id,
            version: Version::initial(),
            state,
            uncommitted: vec![RecordedEvent::new(creation)],
        }
    }

    pub(crate) fn record(&mut self, event: E, apply: fn(&mut S, &E)) {
        apply(&mut self.state, &event);
        self.uncommitted.push(RecordedEvent::new(event));
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    fn uncommitted(&self) -> &[RecordedEvent<E>] {
        &self.uncommitted
    }

    fn mark_committed(&mut self, new_version: Version) {
        self.uncommitted.clear();
        self.version = new_version;
    }
}

/// Trait for aggregates in an event-sourced system.
///
/// An aggregate is rebuilt by folding its own stream: the first event must be
/// its creation event, and every later event goes through
/// [`apply_event`](Aggregate::apply_event), which is pure and infallible.
pub trait Aggregate: Send + Sync + Sized {
    /// Typed identifier of the aggregate.
    type Id: Clone + Display + Debug + Send + Sync + Into<AggregateId>;

    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Everything replay reconstructs; also the snapshot payload.
    type State: Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync;

    /// Returns the aggregate type tag.
    fn aggregate_type() -> AggregateType;

    /// Builds the initial state from a creation event, or None if `event`
    /// does not create this aggregate.
    fn state_from_creation(event: &Self::Event) -> Option<Self::State>;

    /// Applies an event to the state.
    ///
    /// Given the same state and event it must always produce the same new
    /// state, without side effects and without failing.
    fn apply_event(state: &mut Self::State, event: &Self::Event);

    /// Wraps a compensating event in the aggregate's own vocabulary.
    fn restoration_event(
        kind: Restoration,
        data: StateRestoredData<Self::State>,
    ) -> Self::Event;

    fn from_root(root: Root<Self::Id, Self::Event, Self::State>) -> Self;

    fn root(&self) -> &Root<Self::Id, Self::Event, Self::State>;

    fn root_mut(&mut self) -> &mut Root<Self::Id, Self::Event, Self::State>;

    /// The game the aggregate belongs to.
    fn game_id(&self) -> GameId;

    fn id(&self) -> &Self::Id {
        self.root().id()
    }

    fn aggregate_id(&self) -> AggregateId {
        self.id().clone().into()
    }

    /// The last committed version: the one this instance was loaded at, or
    /// the one returned by the last successful save.
    fn version(&self) -> Version {
        self.root().version()
    }

    fn state(&self) -> &Self::State {
        self.root().state()
    }

    /// Rehydrates an aggregate from a state captured at `version`.
    fn from_snapshot(id: Self::Id, state: Self::State, version: Version) -> Self {
        Self::from_root(Root::committed(id, state, version))
    }

    /// Folds a complete stream, assigning versions 1, 2, ...
    fn replay<I>(id: Self::Id, events: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = Self::Event>,
    {
        let aggregate_id: AggregateId = id.clone().into();
        let numbered = events
            .into_iter()
            .scan(Version::initial(), |version, event| {
                *version = version.next();
                Some((*version, event))
            });
        let (state, version) = fold::<Self, _>(&aggregate_id, None, numbered)?.ok_or_else(|| {
            DomainError::AggregateNotFound {
                aggregate_type: Self::aggregate_type(),
                aggregate_id: aggregate_id.to_string(),
            }
        })?;
        Ok(Self::from_snapshot(id, state, version))
    }

    /// Events recorded since the last commit, in order. Returned by value.
    fn get_uncommitted_events(&self) -> Vec<RecordedEvent<Self::Event>> {
        self.root().uncommitted().to_vec()
    }

    fn has_uncommitted_events(&self) -> bool {
        !self.root().uncommitted().is_empty()
    }

    /// Clears the pending buffer after the store accepted it at `new_version`.
    fn mark_events_as_committed(&mut self, new_version: Version) {
        self.root_mut().mark_committed(new_version);
    }

    /// Records a compensating event that puts the aggregate back into `state`.
    fn restore(&mut self, kind: Restoration, restored_to_version: Version, state: Self::State) {
        let event = Self::restoration_event(
            kind,
            StateRestoredData {
                game_id: self.game_id(),
                restored_to_version,
                state,
            },
        );
        self.root_mut().record(event, Self::apply_event);
    }
}

/// Folds numbered events onto an optional baseline.
///
/// Without a baseline the first event must create the aggregate. Versions
/// must continue the baseline without gaps. Returns None for an empty stream
/// without a baseline.
pub fn fold<A, I>(
    aggregate_id: &AggregateId,
    baseline: Option<(A::State, Version)>,
    events: I,
) -> Result<Option<(A::State, Version)>, DomainError>
where
    A: Aggregate,
    I: IntoIterator<Item = (Version, A::Event)>,
{
    let corrupt = |reason: String| DomainError::CorruptStream {
        aggregate_id: aggregate_id.to_string(),
        reason,
    };

    let mut events = events.into_iter();
    let (mut state, mut version) = match baseline {
        Some(baseline) => baseline,
        None => {
            let Some((version, first)) = events.next() else {
                return Ok(None);
            };
            if version != Version::first() {
                return Err(corrupt(format!("stream starts at version {version}")));
            }
            let state = A::state_from_creation(&first).ok_or_else(|| {
                corrupt(format!("first event is {}", first.event_type()))
            })?;
            (state, version)
        }
    };

    for (next, event) in events {
        if next != version.next() {
            return Err(corrupt(format!("expected version {}, found {next}", version.next())));
        }
        A::apply_event(&mut state, &event);
        version = next;
    }

    Ok(Some((state, version)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    enum CounterEvent {
        Created { game_id: GameId },
        Added { game_id: GameId, amount: i32 },
        Restored(StateRestoredData<CounterState>),
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Created { .. } => "CounterCreated",
                CounterEvent::Added { .. } => "CounterAdded",
                CounterEvent::Restored(_) => "CounterRestored",
            }
        }

        fn game_id(&self) -> &GameId {
            match self {
                CounterEvent::Created { game_id } | CounterEvent::Added { game_id, .. } => game_id,
                CounterEvent::Restored(data) => &data.game_id,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct CounterState {
        game_id: GameId,
        value: i32,
    }

    struct Counter {
        root: Root<GameId, CounterEvent, CounterState>,
    }

    impl Aggregate for Counter {
        type Id = GameId;
        type Event = CounterEvent;
        type State = CounterState;

        fn aggregate_type() -> AggregateType {
            AggregateType::Game
        }

        fn state_from_creation(event: &CounterEvent) -> Option<CounterState> {
            match event {
                CounterEvent::Created { game_id } => Some(CounterState {
                    game_id: game_id.clone(),
                    value: 0,
                }),
                _ => None,
            }
        }

        fn apply_event(state: &mut CounterState, event: &CounterEvent) {
            match event {
                CounterEvent::Created { .. } => state.value = 0,
                CounterEvent::Added { amount, .. } => state.value += amount,
                CounterEvent::Restored(data) => *state = data.state.clone(),
            }
        }

        fn restoration_event(
            _kind: Restoration,
            data: StateRestoredData<CounterState>,
        ) -> CounterEvent {
            CounterEvent::Restored(data)
        }

        fn from_root(root: Root<GameId, CounterEvent, CounterState>) -> Self {
            Self { root }
        }

        fn root(&self) -> &Root<GameId, CounterEvent, CounterState> {
            &self.root
        }

        fn root_mut(&mut self) -> &mut Root<GameId, CounterEvent, CounterState> {
            &mut self.root
        }

        fn game_id(&self) -> GameId {
            self.root.state().game_id.clone()
        }
    }

    fn game() -> GameId {
        GameId::new("g1").unwrap()
    }

    fn added(amount: i32) -> CounterEvent {
        CounterEvent::Added {
            game_id: game(),
            amount,
        }
    }

    #[test]
    fn replay_folds_in_order() {
        let events = vec![CounterEvent::Created { game_id: game() }, added(2), added(5)];
        let counter = Counter::replay(game(), events).unwrap();

        assert_eq!(counter.state().value, 7);
        assert_eq!(counter.version(), Version::new(3));
        assert!(!counter.has_uncommitted_events());
    }

    #[test]
    fn replay_rejects_stream_without_creation() {
        let result = Counter::replay(game(), vec![added(1)]);
        assert!(matches!(result, Err(DomainError::CorruptStream { .. })));
    }

    #[test]
    fn replay_of_empty_stream_is_not_found() {
        let result = Counter::replay(game(), Vec::new());
        assert!(matches!(result, Err(DomainError::AggregateNotFound { .. })));
    }

    #[test]
    fn fold_detects_version_gap() {
        let id = AggregateId::from(game());
        let baseline = Some((
            CounterState {
                game_id: game(),
                value: 1,
            },
            Version::new(4),
        ));
        let result = fold::<Counter, _>(&id, baseline, vec![(Version::new(6), added(1))]);
        assert!(matches!(result, Err(DomainError::CorruptStream { .. })));
    }

    #[test]
    fn restore_records_compensating_event() {
        let events = vec![CounterEvent::Created { game_id: game() }, added(2), added(5)];
        let mut counter = Counter::replay(game(), events).unwrap();

        let earlier = CounterState {
            game_id: game(),
            value: 2,
        };
        counter.restore(Restoration::Undo, Version::new(2), earlier.clone());

        assert_eq!(counter.state(), &earlier);
        let pending = counter.get_uncommitted_events();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type(), "CounterRestored");

        counter.mark_events_as_committed(Version::new(4));
        assert_eq!(counter.version(), Version::new(4));
        assert!(counter.get_uncommitted_events().is_empty());
    }

    #[test]
    fn recorded_event_round_trips_through_envelope() {
        let recorded = RecordedEvent::new(added(3));
        let envelope = recorded.to_envelope().unwrap();
        assert_eq!(envelope.event_type, "CounterAdded");
        assert_eq!(envelope.event_id, recorded.event_id);
        assert_eq!(envelope.game_id, game());
    }
}
