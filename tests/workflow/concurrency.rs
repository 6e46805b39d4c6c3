use crate::common::PetHarness;
use status_workflow::workflow::TransitionRequest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_concurrent_transitions_never_overlap() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let workflow = harness.workflow.clone();
        let entity = pet.clone();
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        tasks.push(tokio::spawn(async move {
            // Every task toggles sleep <-> awake, whichever is valid when it gets the lease
            let target = match workflow.entity(1_i64).status().await.ok().flatten().as_deref() {
                Some("sleep") => "awake",
                _ => "sleep",
            };
            workflow
                .transition_with_if_possible(&entity, target, || async {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>(())
                })
                .await
        }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(!harness.status_history(&pet).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_waiters_observe_the_previous_holders_write() {
    let harness = PetHarness::new();
    let pet = harness.insert_pet(1, Some("sleep"));

    let first = {
        let workflow = harness.workflow.clone();
        let entity = pet.clone();
        tokio::spawn(async move {
            workflow
                .transition_with(&entity, TransitionRequest::to("fed").via("feeding"), || async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok::<_, std::io::Error>(())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Queued behind the feeding; validated against "fed", not "sleep"
    harness.workflow.transition(&pet, "sleep").await.unwrap();
    first.await.unwrap().unwrap();

    assert_eq!(harness.status_history(&pet), vec!["feeding", "fed", "sleep"]);
}
