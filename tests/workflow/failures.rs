use crate::common::{lease_key, PetHarness};
use status_workflow::workflow::TransitionRequest;
use status_workflow::TransitionError;

#[derive(Debug, thiserror::Error)]
enum FeedingError {
    #[error("bowl is empty")]
    BowlEmpty,
}

#[tokio::test]
async fn test_failed_action_parks_pet_in_intermediate_error_status() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));

    let err = harness
        .workflow
        .transition_with(&pet, TransitionRequest::to("fed").via("feeding"), || async {
            Err::<(), _>(FeedingError::BowlEmpty)
        })
        .await
        .unwrap_err();

    assert!(matches!(err, TransitionError::ActionFailed(FeedingError::BowlEmpty)));
    assert_eq!(harness.status(&pet).as_deref(), Some("feeding_error"));
    let recorded = harness.error(&pet).unwrap();
    assert!(recorded.starts_with("FeedingError: bowl is empty"));
    assert_eq!(harness.status_history(&pet), vec!["feeding", "feeding_error"]);
    assert!(!harness.locks.is_held(&lease_key(1)));
}

#[tokio::test]
async fn test_failed_action_without_intermediate_uses_current_status() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));

    let err = harness
        .workflow
        .transition_with(&pet, "awake", || async {
            Err::<(), _>(anyhow::anyhow!("alarm clock broke"))
        })
        .await
        .unwrap_err();

    assert_eq!(err.into_action_error().unwrap().to_string(), "alarm clock broke");
    assert_eq!(harness.status(&pet).as_deref(), Some("sleep_error"));
    assert!(harness.error(&pet).unwrap().starts_with("Error: alarm clock broke"));
}

#[tokio::test]
async fn test_failed_action_from_unset_status_writes_bare_error_suffix() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, None);

    harness
        .workflow
        .transition_with(&pet, "sleep", || async {
            Err::<(), _>(FeedingError::BowlEmpty)
        })
        .await
        .unwrap_err();

    assert_eq!(harness.status(&pet).as_deref(), Some("_error"));
}

#[tokio::test]
async fn test_error_status_blocks_further_transitions() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));

    harness
        .workflow
        .transition_with(&pet, TransitionRequest::to("fed").via("feeding"), || async {
            Err::<(), _>(FeedingError::BowlEmpty)
        })
        .await
        .unwrap_err();

    assert!(!harness.workflow.enter_if_possible(&pet, "fed").await.unwrap());
    assert!(!harness.workflow.enter_if_possible(&pet, "sleep").await.unwrap());
    assert_eq!(harness.status(&pet).as_deref(), Some("feeding_error"));
}

#[tokio::test]
async fn test_panicking_action_is_recorded_then_resumes_unwinding() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));
    let workflow = harness.workflow.clone();
    let entity = pet.clone();

    let joined = tokio::spawn(async move {
        workflow
            .transition_with(&entity, TransitionRequest::to("fed").via("feeding"), || async {
                if entity_is_hungry() {
                    panic!("pet bit the feeder");
                }
                Ok::<_, std::io::Error>(())
            })
            .await
    })
    .await;

    let join_err = joined.unwrap_err();
    assert!(join_err.is_panic());
    assert_eq!(harness.status(&pet).as_deref(), Some("feeding_error"));
    assert!(harness
        .error(&pet)
        .unwrap()
        .starts_with("panic: pet bit the feeder"));
    assert!(!harness.locks.is_held(&lease_key(1)));
}

fn entity_is_hungry() -> bool {
    true
}
