use std::sync::Arc;

use engine_core::{EngineConfig, EvolutionResult, TurnEvent, WorldState};
use engine_testkit::ScriptedEvolver;
use engine_world::Evolver;

fn event(turn_number: u32) -> TurnEvent {
    TurnEvent {
        choice: "Push forward".to_string(),
        dispatch: "You push forward into the dark.".to_string(),
        vision: "A narrow passage opens ahead.".to_string(),
        prior_vision_analysis: None,
        turn_number,
    }
}

fn result(prompt: &str, summary: &str, entities: Vec<&str>) -> EvolutionResult {
    EvolutionResult {
        world_prompt: prompt.to_string(),
        evolution_summary: summary.to_string(),
        discovered_entities: entities.into_iter().map(str::to_string).collect(),
    }
}

#[tokio::test]
async fn recent_events_accumulate_and_cap() {
    let config = EngineConfig::default();
    let generator = ScriptedEvolver::new(
        (1..=11)
            .map(|n| result("world", &format!("Turn {n} happens."), vec![]))
            .collect(),
    );
    let evolver = Evolver::new(Arc::new(generator), config.clone());

    let mut state = WorldState::fresh(chrono::Utc::now());
    for turn in 1..=11 {
        let outcome = evolver.evolve(&state, &event(turn)).await.unwrap();
        state.recent_events = outcome.recent_events;
        state.seen_elements = outcome.seen_elements;
    }

    assert_eq!(state.recent_events.len(), config.recent_events_cap);
    assert!(state.recent_events.last().unwrap().contains("Turn 11"));
}

#[tokio::test]
async fn periodic_condensation_shrinks_below_normal_cap() {
    let config = EngineConfig::default();
    let generator = ScriptedEvolver::new(
        (1..=config.condensation_period_turns)
            .map(|n| result("world", &format!("Turn {n} happens."), vec![]))
            .collect(),
    );
    let evolver = Evolver::new(Arc::new(generator), config.clone());

    let mut state = WorldState::fresh(chrono::Utc::now());
    for turn in 1..=config.condensation_period_turns {
        let outcome = evolver.evolve(&state, &event(turn)).await.unwrap();
        state.recent_events = outcome.recent_events;
        state.seen_elements = outcome.seen_elements;
    }

    assert_eq!(state.recent_events.len(), config.recent_events_condensed_cap);
}

#[tokio::test]
async fn newly_discovered_entities_are_prepended_and_deduplicated() {
    let config = EngineConfig::default();
    let generator = ScriptedEvolver::new(vec![
        result("world", "You meet someone new.", vec!["Kessler"]),
        result("world", "You meet another.", vec!["Voidspawn", "Kessler"]),
    ]);
    let evolver = Evolver::new(Arc::new(generator), config);

    let mut state = WorldState::fresh(chrono::Utc::now());
    let first = evolver.evolve(&state, &event(1)).await.unwrap();
    state.seen_elements = first.seen_elements;
    let second = evolver.evolve(&state, &event(2)).await.unwrap();

    assert_eq!(second.seen_elements[0], "Kessler");
    assert_eq!(second.seen_elements[1], "Voidspawn");
    assert_eq!(second.seen_elements.iter().filter(|e| *e == "Kessler").count(), 1);
}

#[tokio::test]
async fn generic_environment_terms_are_excluded_from_seen_elements() {
    let config = EngineConfig::default();
    let generator =
        ScriptedEvolver::new(vec![result("world", "Nothing much.", vec!["ground", "Kessler"])]);
    let evolver = Evolver::new(Arc::new(generator), config);

    let state = WorldState::fresh(chrono::Utc::now());
    let outcome = evolver.evolve(&state, &event(1)).await.unwrap();

    assert_eq!(outcome.seen_elements, vec!["Kessler".to_string()]);
}
