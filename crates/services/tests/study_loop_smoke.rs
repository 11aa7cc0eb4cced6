use chrono::Duration;
use kanji_core::selector::DuePolicy;
use kanji_core::time::{fixed_clock, fixed_now, fixed_today};
use services::{AppServices, StudyTally};
use storage::repository::Storage;
use storage::seed::{DEFAULT_COLLECTION, SAMPLE_KANJI, seed_sample};

async fn drain(services: &AppServices, score: i64) -> StudyTally {
    let study = services.study_loop();
    let collection = services.collection().id();
    let mut tally = StudyTally::default();
    while let Some(current) = study.next_card(collection).await.unwrap() {
        let answer = study.answer(&current, score).await.unwrap();
        tally.record(&answer.review);
    }
    tally
}

#[tokio::test]
async fn study_loop_drains_seeded_collection() {
    let storage = Storage::in_memory();
    seed_sample(&storage, DEFAULT_COLLECTION, fixed_now())
        .await
        .unwrap();
    let services =
        AppServices::from_storage(storage.clone(), fixed_clock(), DEFAULT_COLLECTION, DuePolicy::default())
            .await
            .unwrap();
    assert!(!services.collection_created());

    let tally = drain(&services, 4).await;
    let seeded = u32::try_from(SAMPLE_KANJI.len()).unwrap();
    assert_eq!(tally.reviewed, seeded);
    assert_eq!(tally.passed, seeded);
    assert_eq!(tally.repeated, 0);

    for card in storage
        .cards
        .list_cards(services.collection().id())
        .await
        .unwrap()
    {
        assert_eq!(card.next_review(), fixed_today() + Duration::days(1));
        assert_eq!(
            storage.review_logs.logs_for_card(card.id()).await.unwrap().len(),
            1
        );
    }
}

#[tokio::test]
async fn missed_cards_come_back_until_passed() {
    let storage = Storage::in_memory();
    seed_sample(&storage, DEFAULT_COLLECTION, fixed_now())
        .await
        .unwrap();
    let services =
        AppServices::from_storage(storage, fixed_clock(), DEFAULT_COLLECTION, DuePolicy::default())
            .await
            .unwrap();
    let study = services.study_loop();
    let collection = services.collection().id();

    let first = study.next_card(collection).await.unwrap().unwrap();
    let missed = study.answer(&first, 1).await.unwrap();
    assert_eq!(missed.review.state.last_missed(), fixed_today());

    // The fresh miss is picked ahead of every untouched card.
    let again = study.next_card(collection).await.unwrap().unwrap();
    assert_eq!(again.card.id(), first.card.id());

    study.answer(&again, 5).await.unwrap();
    let tally = drain(&services, 4).await;
    assert_eq!(
        tally.reviewed,
        u32::try_from(SAMPLE_KANJI.len()).unwrap() - 1
    );
}

#[tokio::test]
async fn study_loop_over_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_study_loop?mode=memory&cache=shared")
        .await
        .unwrap();
    seed_sample(&storage, DEFAULT_COLLECTION, fixed_now())
        .await
        .unwrap();
    let services =
        AppServices::from_storage(storage, fixed_clock(), DEFAULT_COLLECTION, DuePolicy::default())
            .await
            .unwrap();

    let tally = drain(&services, 5).await;
    assert_eq!(tally.reviewed, u32::try_from(SAMPLE_KANJI.len()).unwrap());

    let stats = services
        .card_service()
        .collection_stats(services.collection().id(), fixed_today())
        .await
        .unwrap();
    assert_eq!(stats.due, 0);
}
