use std::sync::Arc;

use engine_core::{ChoiceResult, EngineConfig, EvolutionResult, Fate, NarrativeResult, SessionId, SessionStore};
use engine_frames::FrameRegistry;
use engine_scheduler::{DispatchError, Scheduler, SchedulerEvent, TurnOutcome};
use engine_state_memory::MemorySessionStore;
use engine_testkit::{FixedFateResolver, FrozenClock, ScriptedChoices, ScriptedEvolver, ScriptedImage, ScriptedNarrative};
use engine_turn::TurnPipeline;
use engine_world::Evolver;

fn narrative(dispatch: &str, vision: &str, alive: bool) -> NarrativeResult {
    NarrativeResult {
        dispatch: dispatch.to_string(),
        vision: vision.to_string(),
        player_alive_after: alive,
        hard_transition: false,
    }
}

fn evolution(summary: &str) -> EvolutionResult {
    EvolutionResult {
        world_prompt: "World.".to_string(),
        evolution_summary: summary.to_string(),
        discovered_entities: vec![],
    }
}

fn build_scheduler(
    narratives: Vec<NarrativeResult>,
    images: Vec<String>,
    choices: Vec<ChoiceResult>,
    evolutions: Vec<EvolutionResult>,
) -> (Scheduler, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let frames = Arc::new(FrameRegistry::new());
    let config = EngineConfig::default();
    let evolver = Arc::new(Evolver::new(Arc::new(ScriptedEvolver::new(evolutions)), config.clone()));

    let pipeline = Arc::new(TurnPipeline::new(
        store.clone(),
        frames.clone(),
        evolver,
        Arc::new(FixedFateResolver::new(Fate::Normal)),
        Arc::new(FrozenClock::new()),
        Arc::new(ScriptedNarrative::new(narratives)),
        Arc::new(ScriptedImage::new(images)),
        Arc::new(ScriptedChoices::new(choices)),
        config,
    ));

    (Scheduler::new(pipeline, store.clone(), frames), store)
}

/// Scenario E2 — a second `PlayerChoice` submitted while the first is
/// still in flight is rejected, not queued; it never touches state.
#[tokio::test]
async fn e2_concurrent_player_choice_is_rejected_not_queued() {
    let (scheduler, store) = build_scheduler(
        vec![narrative("You sprint.", "A gate looms.", true)],
        vec!["frame-1.png".to_string()],
        vec![ChoiceResult {
            choices: ["A".into(), "B".into(), "C".into()],
            timeout_penalty: "Penalty".into(),
        }],
        vec![evolution("Sprint toward the gate")],
    );
    let scheduler = Arc::new(scheduler);
    let session = SessionId::parse("alpha").unwrap();

    let first = {
        let scheduler = Arc::clone(&scheduler);
        let session = session.clone();
        tokio::spawn(async move {
            scheduler
                .dispatch(
                    session,
                    SchedulerEvent::PlayerChoice {
                        choice_text: "Sprint toward the gate".to_string(),
                        is_custom: false,
                    },
                )
                .await
        })
    };

    // Give the first dispatch a moment to clear admission before the
    // second races in; both requests target the same session.
    tokio::task::yield_now().await;
    let second = scheduler
        .dispatch(
            session.clone(),
            SchedulerEvent::PlayerChoice {
                choice_text: "Sprint again".to_string(),
                is_custom: false,
            },
        )
        .await;

    let first = first.await.unwrap();
    assert!(matches!(first, Ok(TurnOutcome::Turn { .. })));
    assert!(matches!(second, Err(DispatchError::Scheduler(engine_core::SchedulerError::Rejected))));

    let state = store.load_state(&session).await.unwrap();
    assert_eq!(state.turn_count, 1, "the rejected event must not bump turn_count");
}

/// Scenario E3 — a `TimeoutPenalty` event runs Phase A with `Fate::Normal`
/// and the stored penalty phrase, still producing a committed turn.
#[tokio::test]
async fn e3_timeout_penalty_runs_with_normal_fate() {
    let (scheduler, store) = build_scheduler(
        vec![narrative("You freeze up and pay for it.", "The moment passes you by.", true)],
        vec!["frame-1.png".to_string()],
        vec![ChoiceResult {
            choices: ["A".into(), "B".into(), "C".into()],
            timeout_penalty: "You hesitate.".into(),
        }],
        vec![evolution("Hesitation costs you")],
    );
    let session = SessionId::parse("alpha").unwrap();

    let outcome = scheduler
        .dispatch(
            session.clone(),
            SchedulerEvent::TimeoutPenalty {
                penalty_text: "You hesitate too long.".to_string(),
            },
        )
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Turn { phase_a, phase_b } => {
            assert_eq!(phase_a.fate, Fate::Normal);
            assert!(phase_b.is_some());
        }
        TurnOutcome::Restarted => panic!("expected a Turn outcome"),
    }

    let history = store.load_history(&session).await.unwrap();
    assert_eq!(history[0].choice, "You hesitate too long.");
    assert!(!history[0].is_custom_action);
}

/// A turn that kills the player yields `phase_b: None` — no further
/// choices are offered until Restart.
#[tokio::test]
async fn dead_player_turn_has_no_phase_b() {
    let (scheduler, _store) = build_scheduler(
        vec![narrative("The creature strikes true.", "Darkness takes you.", false)],
        vec!["frame-1.png".to_string()],
        vec![],
        vec![evolution("You fall")],
    );
    let session = SessionId::parse("alpha").unwrap();

    let outcome = scheduler
        .dispatch(
            session,
            SchedulerEvent::PlayerChoice {
                choice_text: "Stand and fight".to_string(),
                is_custom: false,
            },
        )
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Turn { phase_a, phase_b } => {
            assert!(!phase_a.player_alive);
            assert!(phase_b.is_none());
        }
        TurnOutcome::Restarted => panic!("expected a Turn outcome"),
    }
}

/// `Restart` clears the session back to fresh defaults and always
/// succeeds, even with no prior turn.
#[tokio::test]
async fn restart_resets_state_and_clears_frames() {
    let (scheduler, store) = build_scheduler(
        vec![narrative("You sprint.", "A gate looms.", true)],
        vec!["frame-1.png".to_string()],
        vec![ChoiceResult {
            choices: ["A".into(), "B".into(), "C".into()],
            timeout_penalty: "Penalty".into(),
        }],
        vec![evolution("Sprint toward the gate")],
    );
    let session = SessionId::parse("alpha").unwrap();

    scheduler
        .dispatch(
            session.clone(),
            SchedulerEvent::PlayerChoice {
                choice_text: "Sprint toward the gate".to_string(),
                is_custom: false,
            },
        )
        .await
        .unwrap();

    let outcome = scheduler.dispatch(session.clone(), SchedulerEvent::Restart).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Restarted));

    let state = store.load_state(&session).await.unwrap();
    assert_eq!(state.turn_count, 0);
}
