use crate::common::PetHarness;
use status_workflow::workflow::TransitionRequest;
use status_workflow::WorkflowError;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_pet_moves_through_its_workflow() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));

    assert_ok!(harness.workflow.transition(&pet, "awake").await);
    assert_err!(harness.workflow.transition(&pet, "fed").await);
    assert_ok!(harness.workflow.transition(&pet, "sleep").await);

    assert_eq!(harness.status(&pet).as_deref(), Some("sleep"));
    assert_eq!(harness.status_history(&pet), vec!["awake", "sleep"]);
}

#[tokio::test]
async fn test_intermediate_status_is_written_before_the_action_runs() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));
    let entities = harness.entities.clone();
    let observed = pet.clone();

    let seen_during_action = harness
        .workflow
        .transition_with(&pet, TransitionRequest::to("fed").via("feeding"), || async move {
            Ok::<_, std::io::Error>(entities.text_field(&observed, "status"))
        })
        .await
        .unwrap();

    assert_eq!(seen_during_action.as_deref(), Some("feeding"));
    assert_eq!(harness.status(&pet).as_deref(), Some("fed"));
    assert_eq!(harness.status_history(&pet), vec!["feeding", "fed"]);
}

#[tokio::test]
async fn test_invalid_first_status_reports_expected_sources() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("awake"));

    let err = harness
        .workflow
        .transition(&pet, TransitionRequest::to("fed").via("feeding"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::InvalidTransition {
            from: Some("awake".to_string()),
            to: "feeding".to_string(),
            expected: "sleep".to_string(),
        }
    );
    assert!(harness.status_history(&pet).is_empty());
    assert!(!harness.locks.is_held(&crate::common::lease_key(1)));
}

#[tokio::test]
async fn test_final_status_rechecked_after_the_intermediate() {
    // awake is reachable from sleep, but not from feeding
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));

    let err = harness
        .workflow
        .transition_with(&pet, TransitionRequest::to("awake").via("feeding"), || async {
            Ok::<_, std::io::Error>(())
        })
        .await
        .unwrap_err();

    assert!(err.is_invalid_transition());
    assert_eq!(
        err.to_string(),
        "can't enter awake from feeding, expected sleep"
    );
    assert_eq!(harness.status(&pet).as_deref(), Some("feeding"));
    assert!(!harness.locks.is_held(&crate::common::lease_key(1)));
}

#[tokio::test]
async fn test_unset_status_enters_initial_targets_only() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, None);

    let err = harness.workflow.transition(&pet, "awake").await.unwrap_err();
    assert_eq!(err.to_string(), "can't enter awake from nil, expected sleep");

    harness.workflow.transition(&pet, "sleep").await.unwrap();
    assert_eq!(harness.status(&pet).as_deref(), Some("sleep"));
}

#[tokio::test]
async fn test_enter_if_possible_swallows_only_invalid_transitions() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));

    assert!(!harness.workflow.enter_if_possible(&pet, "run").await.unwrap());
    assert!(harness.workflow.enter_if_possible(&pet, "awake").await.unwrap());
    assert_eq!(harness.status(&pet).as_deref(), Some("awake"));

    let missing = crate::common::pet(404);
    let err = harness
        .workflow
        .enter_if_possible(&missing, "awake")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::EntityStore(_)));
}

#[tokio::test]
async fn test_transition_with_if_possible_skips_the_action() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("awake"));
    let mut ran = false;

    let outcome = harness
        .workflow
        .transition_with_if_possible(&pet, "fed", || {
            ran = true;
            async { Ok::<_, std::io::Error>(1) }
        })
        .await
        .unwrap();

    assert_eq!(outcome, None);
    assert!(!ran);
}

#[tokio::test]
async fn test_entity_handle_reads_and_enters() {
    let harness = PetHarness::new();
    harness.insert_pet(7, Some("sleep"));
    let pet = harness.workflow.entity(7_i64);

    assert_eq!(pet.status().await.unwrap().as_deref(), Some("sleep"));
    assert!(pet.can_enter("feeding").await.unwrap());
    assert!(!pet.can_enter("fed").await.unwrap());

    pet.enter_via("feeding", "fed").await.unwrap();
    assert_eq!(pet.status().await.unwrap().as_deref(), Some("fed"));

    let portion = pet
        .enter_with("sleep", || async { Ok::<_, std::io::Error>("nap") })
        .await
        .unwrap();
    assert_eq!(portion, "nap");
    assert!(!pet.enter_if_possible("sleep").await.unwrap());
}

#[tokio::test]
async fn test_feeding_scenario_ends_fed() {
    use status_workflow::entity::InMemoryEntityStore;
    use status_workflow::lease::InMemoryLockStore;
    use status_workflow::state_machine::TransitionTable;
    use status_workflow::workflow::StatusWorkflow;
    use std::sync::Arc;

    let entities = InMemoryEntityStore::new();
    let workflow = StatusWorkflow::builder("Pet")
        .workflow(
            TransitionTable::new()
                .allow("sleep", ["feeding"])
                .allow("feeding", ["fed"])
                .allow("fed", ["sleep", "run"])
                .allow("run", ["sleep"]),
        )
        .lock_store(Arc::new(InMemoryLockStore::new()))
        .entity_store(Arc::new(entities.clone()))
        .build()
        .unwrap();
    let pet = crate::common::pet(1);
    entities.insert(pet.clone(), Some("sleep"));

    workflow
        .transition_with(&pet, TransitionRequest::to("fed").via("feeding"), || async {
            Ok::<_, std::io::Error>(())
        })
        .await
        .unwrap();
    workflow.transition(&pet, "run").await.unwrap();
    workflow.transition(&pet, "sleep").await.unwrap();

    assert_eq!(entities.text_field(&pet, "status").as_deref(), Some("sleep"));
    assert_eq!(
        entities
            .field_history(&pet, "status")
            .iter()
            .filter_map(|value| value.as_text())
            .collect::<Vec<_>>(),
        vec!["feeding", "fed", "run", "sleep"]
    );
}
