//! Applies lifecycle events to the session snapshot.
//!
//! ```text
//! spawn                         → active   (new record, totalTasks += 1)
//! progress                      → unchanged status, progress/current/completed updated
//! waiting                       → waiting  (waitingFor, waitingReason)
//! handoff from X, receiver waits for X → active (waiting fields cleared)
//! error (blocking)              → error
//! error (warning)               → unchanged status, error recorded
//! complete                      → complete, moved to completedAgents
//! ```
//!
//! Only active agents are touched. An event for an unknown id is a no-op
//! (`None`), never an error: the host must not see a failure because an
//! agent forgot to announce itself.

use crate::catalog::get_agent_icon;
use crate::events::{
    CompleteData, ErrorData, EventKind, EventPayload, HandoffData, ProgressData, Severity,
    SpawnData, SpawnerEvent, WaitingData,
};
use crate::state::{AgentState, AgentStatus, NotificationState};

/// Agents touched by a handoff, as they look after it was applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandoffOutcome {
    pub sender: Option<AgentState>,
    pub receiver: Option<AgentState>,
    /// The receiver was waiting for the sender and is active again.
    pub unblocked: bool,
}

/// What a single event did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Spawned(AgentState),
    Progressed(AgentState),
    Waiting(AgentState),
    Handoff {
        handoff: HandoffData,
        outcome: HandoffOutcome,
    },
    Completed(AgentState),
    Errored {
        agent: AgentState,
        severity: Severity,
    },
    /// The event referenced an agent this session does not know about.
    Ignored(EventKind),
}

pub fn handle_spawn(state: &mut NotificationState, data: &SpawnData, now: i64) -> Option<AgentState> {
    if state.contains(&data.id) {
        tracing::debug!(id = %data.id, "Ignoring duplicate spawn");
        return None;
    }

    let name = if data.name.trim().is_empty() {
        data.id.clone()
    } else {
        data.name.clone()
    };
    let icon = if data.icon.trim().is_empty() {
        get_agent_icon(&name).to_string()
    } else {
        data.icon.clone()
    };

    let agent = AgentState {
        id: data.id.clone(),
        name,
        icon,
        skills: data.skills.clone(),
        task: data.task.clone(),
        status: AgentStatus::Active,
        progress: 0,
        current: "Starting...".to_string(),
        start_time: now,
        ..Default::default()
    };

    state.active_agents.insert(agent.id.clone(), agent.clone());
    state.index_name(&agent.name, &agent.id);
    state.total_tasks += 1;
    Some(agent)
}

pub fn handle_progress(state: &mut NotificationState, data: &ProgressData) -> Option<AgentState> {
    let agent = state.active_agents.get_mut(&data.id)?;

    agent.progress = clamp_percent(data.percent);
    if !data.message.trim().is_empty() {
        agent.current = data.message.clone();
    }
    agent.completed = data.completed.clone();
    Some(agent.clone())
}

pub fn handle_waiting(state: &mut NotificationState, data: &WaitingData) -> Option<AgentState> {
    let agent = state.active_agents.get_mut(&data.id)?;

    agent.status = AgentStatus::Waiting;
    agent.waiting_for = Some(data.waiting_for.clone());
    agent.waiting_reason = if data.reason.trim().is_empty() {
        None
    } else {
        Some(data.reason.clone())
    };
    agent.current = format!("Waiting for {}", data.waiting_for);
    Some(agent.clone())
}

/// Records the handoff, then updates sender and receiver (resolved by name
/// among active agents). The only event that can unblock a waiting agent.
pub fn handle_handoff(state: &mut NotificationState, data: &HandoffData) -> HandoffOutcome {
    state.handoffs.push(data.clone());

    let sender_id = state.active_id_for_name(&data.from).map(str::to_string);
    let receiver_id = state.active_id_for_name(&data.to).map(str::to_string);

    let mut outcome = HandoffOutcome::default();

    let sender = match sender_id {
        Some(id) => state.active_agents.get_mut(id.as_str()),
        None => None,
    };
    if let Some(sender) = sender {
        sender.handoffs_out.push(data.to.clone());
        outcome.sender = Some(sender.clone());
    }

    let receiver = match receiver_id {
        Some(id) => state.active_agents.get_mut(id.as_str()),
        None => None,
    };
    if let Some(receiver) = receiver {
        receiver.handoffs_in.push(data.from.clone());
        if receiver.is_waiting_for(&data.from) {
            receiver.status = AgentStatus::Active;
            receiver.waiting_for = None;
            receiver.waiting_reason = None;
            receiver.current = if data.description.trim().is_empty() {
                format!("Received handoff from {}", data.from)
            } else {
                data.description.clone()
            };
            outcome.unblocked = true;
        }
        outcome.receiver = Some(receiver.clone());
    }

    // A self-handoff touches one record twice; report its final shape.
    if data.from == data.to {
        if let (Some(sender), Some(receiver)) = (&mut outcome.sender, &outcome.receiver) {
            *sender = receiver.clone();
        }
    }

    outcome
}

/// Marks the agent complete and moves it to `completed_agents`.
///
/// Duration prefers the event's value and falls back to `now - start_time`.
pub fn handle_complete(state: &mut NotificationState, data: &CompleteData, now: i64) -> Option<AgentState> {
    let mut agent = state.active_agents.shift_remove(&data.id)?;

    agent.status = AgentStatus::Complete;
    agent.progress = 100;
    agent.duration = match data.duration {
        Some(ms) if ms > 0 => ms,
        _ => now.saturating_sub(agent.start_time).max(0) as u64,
    };
    if !data.result.trim().is_empty() {
        agent.current = data.result.clone();
    } else {
        agent.current = "Done".to_string();
    }
    agent.waiting_for = None;
    agent.waiting_reason = None;
    if data.tasks_completed.is_some() {
        agent.tasks_completed = data.tasks_completed;
    }

    state
        .completed_agents
        .insert(agent.id.clone(), agent.clone());
    state.rebuild_name_index();
    Some(agent)
}

pub fn handle_error(state: &mut NotificationState, data: &ErrorData) -> Option<AgentState> {
    let agent = state.active_agents.get_mut(&data.id)?;

    agent.error = Some(data.error.clone());
    if data.severity == Severity::Blocking {
        agent.status = AgentStatus::Error;
        agent.current = format!("Blocked: {}", data.error);
    }
    Some(agent.clone())
}

/// True once every agent seen this session has completed.
pub fn all_agents_complete(state: &NotificationState) -> bool {
    state.active_agents.is_empty() && !state.completed_agents.is_empty()
}

/// Dispatches one event to its handler.
///
/// `now` is the invocation's clock. Spawn times and elapsed durations use it
/// rather than `event.timestamp`, which agents stamp with their own clocks.
pub fn apply_event(state: &mut NotificationState, event: &SpawnerEvent, now: i64) -> Applied {
    let kind = event.kind();
    let applied = match &event.payload {
        EventPayload::Spawn(data) => handle_spawn(state, data, now).map(Applied::Spawned),
        EventPayload::Progress(data) => handle_progress(state, data).map(Applied::Progressed),
        EventPayload::Waiting(data) => handle_waiting(state, data).map(Applied::Waiting),
        EventPayload::Handoff(data) => Some(Applied::Handoff {
            handoff: data.clone(),
            outcome: handle_handoff(state, data),
        }),
        EventPayload::Complete(data) => handle_complete(state, data, now).map(Applied::Completed),
        EventPayload::Error(data) => handle_error(state, data).map(|agent| Applied::Errored {
            agent,
            severity: data.severity,
        }),
    };

    applied.unwrap_or_else(|| {
        tracing::debug!(kind = %kind, "Event references an unknown agent");
        Applied::Ignored(kind)
    })
}

fn clamp_percent(percent: f64) -> u8 {
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(state: &mut NotificationState, id: &str, name: &str) -> AgentState {
        handle_spawn(
            state,
            &SpawnData {
                id: id.into(),
                name: name.into(),
                icon: String::new(),
                skills: vec![],
                task: format!("{} work", name),
            },
            1_000,
        )
        .unwrap()
    }

    fn waiting(id: &str, waiting_for: &str) -> WaitingData {
        WaitingData {
            id: id.into(),
            waiting_for: waiting_for.into(),
            reason: "needs input".into(),
        }
    }

    fn handoff(from: &str, to: &str) -> HandoffData {
        HandoffData {
            from: from.into(),
            to: to.into(),
            payload: serde_json::Value::Null,
            description: "contract ready".into(),
        }
    }

    fn complete(id: &str) -> CompleteData {
        CompleteData {
            id: id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_spawn_inserts_active_agent_and_counts_task() {
        let mut state = NotificationState::new(0);
        let agent = spawn(&mut state, "a1", "Frontend");

        assert_eq!(agent.status, AgentStatus::Active);
        assert_eq!(agent.progress, 0);
        assert_eq!(agent.icon, "🎨");
        assert_eq!(agent.start_time, 1_000);
        assert_eq!(state.total_tasks, 1);
        assert!(state.active_agents.contains_key("a1"));
    }

    #[test]
    fn test_duplicate_spawn_is_ignored() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        let again = handle_spawn(
            &mut state,
            &SpawnData {
                id: "a1".into(),
                name: "Other".into(),
                ..Default::default()
            },
            2_000,
        );
        assert!(again.is_none());
        assert_eq!(state.total_tasks, 1);
        assert_eq!(state.active_agents["a1"].name, "Frontend");
    }

    #[test]
    fn test_spawn_without_name_uses_id() {
        let mut state = NotificationState::new(0);
        let agent = handle_spawn(
            &mut state,
            &SpawnData {
                id: "toolu_9".into(),
                ..Default::default()
            },
            0,
        )
        .unwrap();
        assert_eq!(agent.name, "toolu_9");
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        let before = state.clone();

        assert!(handle_progress(
            &mut state,
            &ProgressData {
                id: "ghost".into(),
                percent: 10.0,
                ..Default::default()
            }
        )
        .is_none());
        assert!(handle_waiting(&mut state, &waiting("ghost", "Frontend")).is_none());
        assert!(handle_complete(&mut state, &complete("ghost"), 5_000).is_none());
        assert!(handle_error(
            &mut state,
            &ErrorData {
                id: "ghost".into(),
                error: "boom".into(),
                severity: Severity::Blocking,
            }
        )
        .is_none());

        assert_eq!(state, before);
    }

    #[test]
    fn test_progress_replaces_completed_list_and_clamps() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");

        handle_progress(
            &mut state,
            &ProgressData {
                id: "a1".into(),
                message: "layout".into(),
                percent: 30.0,
                completed: vec!["setup".into(), "layout".into()],
            },
        );
        let agent = handle_progress(
            &mut state,
            &ProgressData {
                id: "a1".into(),
                message: String::new(),
                percent: 140.0,
                completed: vec!["setup".into()],
            },
        )
        .unwrap();

        assert_eq!(agent.progress, 100);
        assert_eq!(agent.completed, vec!["setup".to_string()]);
        assert_eq!(agent.current, "layout");
    }

    #[test]
    fn test_progress_after_completion_does_not_regress() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        handle_complete(&mut state, &complete("a1"), 2_000);

        let result = handle_progress(
            &mut state,
            &ProgressData {
                id: "a1".into(),
                percent: 10.0,
                ..Default::default()
            },
        );
        assert!(result.is_none());
        assert_eq!(state.completed_agents["a1"].progress, 100);
    }

    #[test]
    fn test_handoff_unblocks_receiver_waiting_for_sender() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        spawn(&mut state, "a2", "Backend");
        handle_waiting(&mut state, &waiting("a1", "Backend"));
        assert_eq!(state.active_agents["a1"].status, AgentStatus::Waiting);

        let outcome = handle_handoff(&mut state, &handoff("Backend", "Frontend"));

        assert!(outcome.unblocked);
        let frontend = &state.active_agents["a1"];
        assert_eq!(frontend.status, AgentStatus::Active);
        assert!(frontend.waiting_for.is_none());
        assert!(frontend.waiting_reason.is_none());
        assert_eq!(frontend.handoffs_in, vec!["Backend".to_string()]);
        assert_eq!(state.active_agents["a2"].handoffs_out, vec!["Frontend".to_string()]);
        assert_eq!(state.handoffs.len(), 1);
    }

    #[test]
    fn test_handoff_to_active_receiver_keeps_status() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        spawn(&mut state, "a2", "Backend");

        let outcome = handle_handoff(&mut state, &handoff("Backend", "Frontend"));

        assert!(!outcome.unblocked);
        assert_eq!(state.active_agents["a1"].status, AgentStatus::Active);
        assert_eq!(state.active_agents["a1"].handoffs_in.len(), 1);
        assert_eq!(state.active_agents["a2"].handoffs_out.len(), 1);
    }

    #[test]
    fn test_handoff_from_other_agent_does_not_unblock() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        spawn(&mut state, "a2", "Backend");
        spawn(&mut state, "a3", "QA");
        handle_waiting(&mut state, &waiting("a1", "Backend"));

        let outcome = handle_handoff(&mut state, &handoff("QA", "Frontend"));

        assert!(!outcome.unblocked);
        assert_eq!(state.active_agents["a1"].status, AgentStatus::Waiting);
    }

    #[test]
    fn test_handoff_between_unknown_names_is_still_recorded() {
        let mut state = NotificationState::new(0);
        let outcome = handle_handoff(&mut state, &handoff("Ghost", "Phantom"));
        assert_eq!(outcome, HandoffOutcome::default());
        assert_eq!(state.handoffs.len(), 1);
    }

    #[test]
    fn test_handoff_resolves_duplicate_names_to_latest_spawn() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Backend");
        spawn(&mut state, "a2", "Backend");
        spawn(&mut state, "a3", "Frontend");

        handle_handoff(&mut state, &handoff("Backend", "Frontend"));

        assert!(state.active_agents["a1"].handoffs_out.is_empty());
        assert_eq!(state.active_agents["a2"].handoffs_out.len(), 1);
    }

    #[test]
    fn test_complete_moves_agent_and_uses_elapsed_time() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");

        let agent = handle_complete(&mut state, &complete("a1"), 4_500).unwrap();

        assert_eq!(agent.status, AgentStatus::Complete);
        assert_eq!(agent.progress, 100);
        assert_eq!(agent.duration, 3_500);
        assert!(!state.active_agents.contains_key("a1"));
        assert!(state.completed_agents.contains_key("a1"));
        assert!(state.active_id_for_name("Frontend").is_none());
    }

    #[test]
    fn test_complete_prefers_event_duration() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        let agent = handle_complete(
            &mut state,
            &CompleteData {
                id: "a1".into(),
                result: "Shipped".into(),
                duration: Some(42),
                tasks_completed: Some(3),
            },
            9_999,
        )
        .unwrap();
        assert_eq!(agent.duration, 42);
        assert_eq!(agent.current, "Shipped");
        assert_eq!(agent.task_count(), 3);
    }

    #[test]
    fn test_complete_twice_keeps_single_record() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        handle_complete(&mut state, &complete("a1"), 2_000);
        assert!(handle_complete(&mut state, &complete("a1"), 3_000).is_none());
        assert_eq!(state.completed_agents.len(), 1);
        assert!(state.active_agents.is_empty());
    }

    #[test]
    fn test_blocking_error_sets_error_status() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        let agent = handle_error(
            &mut state,
            &ErrorData {
                id: "a1".into(),
                error: "npm install failed".into(),
                severity: Severity::Blocking,
            },
        )
        .unwrap();
        assert_eq!(agent.status, AgentStatus::Error);
        assert_eq!(agent.error.as_deref(), Some("npm install failed"));
    }

    #[test]
    fn test_warning_error_keeps_status() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Frontend");
        let agent = handle_error(
            &mut state,
            &ErrorData {
                id: "a1".into(),
                error: "deprecated API".into(),
                severity: Severity::Warning,
            },
        )
        .unwrap();
        assert_eq!(agent.status, AgentStatus::Active);
        assert_eq!(agent.error.as_deref(), Some("deprecated API"));
    }

    #[test]
    fn test_all_agents_complete_truth_table() {
        let mut state = NotificationState::new(0);
        assert!(!all_agents_complete(&state));

        spawn(&mut state, "a1", "Frontend");
        assert!(!all_agents_complete(&state));

        spawn(&mut state, "a2", "Backend");
        handle_complete(&mut state, &complete("a1"), 2_000);
        assert!(!all_agents_complete(&state));

        handle_complete(&mut state, &complete("a2"), 3_000);
        assert!(all_agents_complete(&state));
    }

    #[test]
    fn test_apply_event_reports_ignored_for_unknown_agent() {
        let mut state = NotificationState::new(0);
        let event = SpawnerEvent::at(
            5,
            EventPayload::Complete(complete("nobody")),
        );
        assert_eq!(apply_event(&mut state, &event, 10), Applied::Ignored(EventKind::Complete));
    }

    #[test]
    fn test_apply_event_uses_invocation_clock_for_spawn() {
        let mut state = NotificationState::new(0);
        let event = SpawnerEvent::at(
            777,
            EventPayload::Spawn(SpawnData {
                id: "a1".into(),
                name: "QA".into(),
                ..Default::default()
            }),
        );
        match apply_event(&mut state, &event, 5_000) {
            Applied::Spawned(agent) => assert_eq!(agent.start_time, 5_000),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_complete_duration_ignores_skewed_event_timestamp() {
        let mut state = NotificationState::new(0);
        spawn(&mut state, "a1", "Backend");
        state.active_agents["a1"].start_time = 1_000_000;

        let skewed = SpawnerEvent::at(1_000, EventPayload::Complete(complete("a1")));
        match apply_event(&mut state, &skewed, 1_060_000) {
            Applied::Completed(agent) => assert_eq!(agent.duration, 60_000),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-5.0), 0);
        assert_eq!(clamp_percent(49.6), 50);
        assert_eq!(clamp_percent(f64::NAN), 0);
    }
}
