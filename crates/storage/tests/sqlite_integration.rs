use chrono::Duration;
use kanji_core::model::{
    CardDraft, Collection, CollectionDraft, Kanji, KanjiCard, KanjiDraft, ValidatedCard,
};
use kanji_core::scheduler::Scheduler;
use kanji_core::selector::DuePolicy;
use kanji_core::time::{fixed_now, fixed_today};
use storage::repository::{
    CardRepository, CollectionRepository, InMemoryRepository, KanjiRepository,
    ReviewLogRepository, ReviewPersistence, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn draft(collection: &Collection, kanji: &Kanji) -> ValidatedCard {
    CardDraft::new(collection.id(), kanji.id, format!("story for {}", kanji.keyword))
        .validate(fixed_now())
        .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_scheduling_and_logs() {
    let repo = connect("memdb_roundtrip").await;
    let (collection, kanji) = fixture(&repo).await;

    let card = repo.insert_card(draft(&collection, &kanji[1])).await.unwrap();
    let fetched = repo.get_card(card.id()).await.unwrap().unwrap();
    assert_eq!(fetched, card);
    assert_eq!(fetched.next_review(), fixed_today());

    let today = fixed_today();
    let after_first = review(&repo, &card, 4, today).await;
    assert_eq!(after_first.revision(), 1);
    assert_eq!(after_first.scheduling().total_reviews(), 1);
    assert_eq!(after_first.scheduling().consecutive_correct(), 1);
    assert_eq!(after_first.next_review(), today + Duration::days(1));

    let tomorrow = today + Duration::days(1);
    let after_second = review(&repo, &after_first, 4, tomorrow).await;
    assert_eq!(after_second.revision(), 2);
    assert_eq!(after_second.next_review(), tomorrow + Duration::days(6));

    let logs = repo.logs_for_card(card.id()).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs[0].id < logs[1].id);
    assert_eq!(logs[0].log.score.value(), 4);
    assert_eq!(logs[1].log.reviewed_on, tomorrow);
    assert_eq!(logs[1].log.next_review, after_second.next_review());
    assert_eq!(logs[1].log.consecutive_correct, 2);

    let listed = repo.list_cards(collection.id()).await.unwrap();
    assert_eq!(listed, vec![after_second]);
}

#[tokio::test]
async fn sqlite_lookups_and_listing() {
    let repo = connect("memdb_lookups").await;
    let (collection, kanji) = fixture(&repo).await;

    assert_eq!(repo.find_kanji('日').await.unwrap(), Some(kanji[1].clone()));
    assert_eq!(repo.find_kanji('木').await.unwrap(), None);
    assert_eq!(repo.get_kanji(kanji[2].id).await.unwrap(), Some(kanji[2].clone()));

    let indexes: Vec<u32> = repo
        .list_kanji()
        .await
        .unwrap()
        .iter()
        .map(|k| k.heisig_index)
        .collect();
    assert_eq!(indexes, vec![11, 12, 13]);

    assert_eq!(
        repo.find_collection("default").await.unwrap(),
        Some(collection.clone())
    );
    assert_eq!(repo.get_collection(collection.id()).await.unwrap(), Some(collection));
}

#[tokio::test]
async fn sqlite_enforces_uniqueness() {
    let repo = connect("memdb_unique").await;
    let (collection, kanji) = fixture(&repo).await;

    repo.insert_card(draft(&collection, &kanji[0])).await.unwrap();

    let same_kanji = CardDraft::new(collection.id(), kanji[0].id, "another story")
        .validate(fixed_now())
        .unwrap();
    assert!(matches!(
        repo.insert_card(same_kanji).await,
        Err(StorageError::Conflict)
    ));

    let same_mnemonic = CardDraft::new(collection.id(), kanji[1].id, "story for mouth")
        .validate(fixed_now())
        .unwrap();
    assert!(matches!(
        repo.insert_card(same_mnemonic).await,
        Err(StorageError::Conflict)
    ));

    let same_character = KanjiDraft::new("口", "opening", 99).validate().unwrap();
    assert!(matches!(
        repo.insert_kanji(same_character).await,
        Err(StorageError::Conflict)
    ));

    let same_name = CollectionDraft::new(" default ").validate(fixed_now()).unwrap();
    assert!(matches!(
        repo.insert_collection(same_name).await,
        Err(StorageError::Conflict)
    ));
}

#[tokio::test]
async fn sqlite_rejects_cards_for_missing_collection() {
    let repo = connect("memdb_missing_parent").await;
    let (_collection, kanji) = fixture(&repo).await;

    let orphan = CardDraft::new(kanji_core::model::CollectionId::new(999), kanji[0].id, "lost")
        .validate(fixed_now())
        .unwrap();
    assert!(matches!(
        repo.insert_card(orphan).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_rejects_stale_review_writes() {
    let repo = connect("memdb_stale").await;
    let (collection, kanji) = fixture(&repo).await;
    let card = repo.insert_card(draft(&collection, &kanji[0])).await.unwrap();
    let today = fixed_today();

    let mut first = card.clone();
    let mut second = card.clone();
    let a = first.set_review_score(&Scheduler::new(), 5, today).unwrap();
    let b = second.set_review_score(&Scheduler::new(), 0, today).unwrap();

    let applied = repo.apply_review(&first, first.review_log(&a)).await.unwrap();
    assert_eq!(applied.revision, 1);

    let err = repo
        .apply_review(&second, second.review_log(&b))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let stored = repo.get_card(card.id()).await.unwrap().unwrap();
    assert_eq!(stored.scheduling(), first.scheduling());
    assert_eq!(repo.logs_for_card(card.id()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_review_of_missing_card_is_not_found() {
    let repo = connect("memdb_missing_card").await;
    let (collection, kanji) = fixture(&repo).await;
    let card = KanjiCard::new(
        kanji_core::model::CardId::new(77),
        collection.id(),
        kanji[0].id,
        "ghost",
        fixed_now(),
    )
    .unwrap();

    let mut reviewed = card.clone();
    let outcome = reviewed
        .set_review_score(&Scheduler::new(), 4, fixed_today())
        .unwrap();
    let err = repo
        .apply_review(&reviewed, reviewed.review_log(&outcome))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_and_memory_pick_the_same_due_card() {
    let sqlite = connect("memdb_due_order").await;
    let memory = InMemoryRepository::new();

    let today = fixed_today() + Duration::days(1);
    let mut picks = Vec::new();

    for (label, repo) in [
        ("sqlite", &sqlite as &dyn Backend),
        ("memory", &memory as &dyn Backend),
    ] {
        let (collection, kanji) = fixture(repo).await;
        let mut cards = Vec::new();
        for k in &kanji {
            cards.push(repo.insert_card(draft(&collection, k)).await.unwrap());
        }
        let c = collection.id();

        // Created yesterday: only visible as overdue.
        assert!(repo.next_due(c, today, DuePolicy::ScheduledToday).await.unwrap().is_none());
        assert_eq!(repo.due_count(c, today, DuePolicy::IncludeOverdue).await.unwrap(), 3);

        // A miss today jumps the queue.
        let missed = review(repo, &cards[2], 1, today).await;
        let next = repo.next_due(c, today, DuePolicy::IncludeOverdue).await.unwrap().unwrap();
        assert_eq!(next.id(), missed.id(), "{label}");
        let exact = repo.next_due(c, today, DuePolicy::ScheduledToday).await.unwrap().unwrap();
        assert_eq!(exact.id(), missed.id(), "{label}");

        // Passing it pushes it out; the lowest id of the rest is next.
        review(repo, &missed, 4, today).await;
        let next = repo.next_due(c, today, DuePolicy::IncludeOverdue).await.unwrap().unwrap();
        assert_eq!(next.id(), cards[0].id(), "{label}");
        assert_eq!(repo.due_count(c, today, DuePolicy::ScheduledToday).await.unwrap(), 0);
        assert_eq!(repo.due_count(c, today, DuePolicy::IncludeOverdue).await.unwrap(), 2);

        picks.push(next.mnemonic().to_owned());
    }

    assert_eq!(picks[0], picks[1]);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(applied, 1);
}

trait Backend: KanjiRepository + CollectionRepository + CardRepository + ReviewPersistence {}

impl<T> Backend for T where T: KanjiRepository + CollectionRepository + CardRepository + ReviewPersistence
{}

async fn fixture(repo: &dyn Backend) -> (Collection, Vec<Kanji>) {
    let collection = repo
        .insert_collection(CollectionDraft::new("default").validate(fixed_now()).unwrap())
        .await
        .unwrap();
    let mut kanji = Vec::new();
    for (character, keyword, index) in [("口", "mouth", 11), ("日", "day", 12), ("月", "month", 13)]
    {
        kanji.push(
            repo.insert_kanji(KanjiDraft::new(character, keyword, index).validate().unwrap())
                .await
                .unwrap(),
        );
    }
    (collection, kanji)
}

async fn review(
    repo: &dyn Backend,
    card: &KanjiCard,
    score: i64,
    today: chrono::NaiveDate,
) -> KanjiCard {
    let mut reviewed = card.clone();
    let outcome = reviewed
        .set_review_score(&Scheduler::new(), score, today)
        .unwrap();
    repo.apply_review(&reviewed, reviewed.review_log(&outcome))
        .await
        .unwrap();
    repo.get_card(card.id()).await.unwrap().unwrap()
}
