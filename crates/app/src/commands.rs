//! Subcommand handlers. Each writes either human-readable text or one JSON
//! document per result to `out`.

use std::error::Error;
use std::io::{BufRead, Write};

use chrono::NaiveDate;
use kanji_core::model::{CardId, Kanji, KanjiCard, ReviewOutcome, ReviewScore};
use kanji_core::scheduler::ScheduledReview;
use serde::Serialize;
use services::{AppServices, StudyCard, StudyTally};
use storage::seed::seed_sample;

type CmdResult<T = ()> = Result<T, Box<dyn Error>>;

//
// ─── OUTPUT VIEWS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct CardView<'a> {
    card_id: CardId,
    character: String,
    keyword: &'a str,
    heisig_index: u32,
    mnemonic: &'a str,
    next_review: NaiveDate,
    efactor: f64,
    consecutive_correct: u32,
    total_reviews: u32,
}

impl<'a> CardView<'a> {
    fn new(card: &'a KanjiCard, kanji: &'a Kanji) -> Self {
        let state = card.scheduling();
        Self {
            card_id: card.id(),
            character: kanji.character.to_string(),
            keyword: &kanji.keyword,
            heisig_index: kanji.heisig_index,
            mnemonic: card.mnemonic(),
            next_review: state.next_review(),
            efactor: state.efactor(),
            consecutive_correct: state.consecutive_correct(),
            total_reviews: state.total_reviews(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReviewView {
    card_id: CardId,
    score: ReviewScore,
    outcome: ReviewOutcome,
    interval_days: u32,
    next_review: NaiveDate,
    efactor: f64,
    consecutive_correct: u32,
    log_id: i64,
}

impl ReviewView {
    fn new(card_id: CardId, review: &ScheduledReview, log_id: i64) -> Self {
        Self {
            card_id,
            score: review.score,
            outcome: review.outcome,
            interval_days: review.interval_days,
            next_review: review.state.next_review(),
            efactor: review.state.efactor(),
            consecutive_correct: review.state.consecutive_correct(),
            log_id,
        }
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> CmdResult {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn describe_review<W: Write>(out: &mut W, review: &ScheduledReview) -> CmdResult {
    let outcome = match review.outcome {
        ReviewOutcome::Pass => "pass",
        ReviewOutcome::Miss => "miss",
    };
    if review.score.lengthens_interval() {
        writeln!(
            out,
            "{outcome}: next review {} (+{}d), ease {:.2}",
            review.state.next_review(),
            review.interval_days,
            review.state.efactor()
        )?;
    } else {
        writeln!(
            out,
            "{outcome}: card stays due today, ease {:.2}",
            review.state.efactor()
        )?;
    }
    Ok(())
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

pub async fn seed<W: Write>(services: &AppServices, out: &mut W, json: bool) -> CmdResult {
    let report = seed_sample(
        services.storage(),
        services.collection().name(),
        services.clock().now(),
    )
    .await?;

    if json {
        #[derive(Serialize)]
        struct SeedView<'a> {
            collection: &'a str,
            kanji_created: u32,
            cards_created: u32,
        }
        return write_json(
            out,
            &SeedView {
                collection: report.collection.name(),
                kanji_created: report.kanji_created,
                cards_created: report.cards_created,
            },
        );
    }

    writeln!(
        out,
        "Seeded {}: {} new kanji, {} new cards",
        report.collection.name(),
        report.kanji_created,
        report.cards_created
    )?;
    Ok(())
}

pub async fn add<W: Write>(
    services: &AppServices,
    character: char,
    mnemonic: &str,
    out: &mut W,
    json: bool,
) -> CmdResult {
    let card = services
        .card_service()
        .create_card(services.collection().id(), character, mnemonic)
        .await?;

    if json {
        return write_json(
            out,
            &serde_json::json!({ "card_id": card.id(), "next_review": card.next_review() }),
        );
    }
    writeln!(out, "Added card {} for {character}", card.id())?;
    Ok(())
}

pub async fn next<W: Write>(services: &AppServices, out: &mut W, json: bool) -> CmdResult {
    let current = services
        .study_loop()
        .next_card(services.collection().id())
        .await?;

    match (current, json) {
        (Some(StudyCard { card, kanji }), true) => write_json(out, &CardView::new(&card, &kanji)),
        (None, true) => write_json(out, &serde_json::Value::Null),
        (Some(StudyCard { card, kanji }), false) => {
            writeln!(
                out,
                "card {}: {} (#{}, {})",
                card.id(),
                kanji.character,
                kanji.heisig_index,
                kanji.keyword
            )?;
            writeln!(out, "  mnemonic: {}", card.mnemonic())?;
            Ok(())
        }
        (None, false) => {
            writeln!(out, "Nothing due in {}.", services.collection().name())?;
            Ok(())
        }
    }
}

pub async fn review<W: Write>(
    services: &AppServices,
    card_id: CardId,
    score: i64,
    out: &mut W,
    json: bool,
) -> CmdResult {
    let storage = services.storage();
    let persisted = services
        .review_service()
        .review_card_persisted_by_id(
            card_id,
            storage.cards.as_ref(),
            storage.reviews.as_ref(),
            score,
        )
        .await?;

    if json {
        return write_json(
            out,
            &ReviewView::new(persisted.card.id(), &persisted.review, persisted.log_id),
        );
    }
    write!(out, "card {}: ", persisted.card.id())?;
    describe_review(out, &persisted.review)
}

pub async fn stats<W: Write>(services: &AppServices, out: &mut W, json: bool) -> CmdResult {
    let today = services.clock().today();
    let stats = services
        .card_service()
        .collection_stats(services.collection().id(), today)
        .await?;

    if json {
        return write_json(out, &stats);
    }
    writeln!(
        out,
        "{} on {today}: {} cards, {} due, {} overdue",
        services.collection().name(),
        stats.total,
        stats.due,
        stats.overdue
    )?;
    Ok(())
}

enum Prompt {
    Line(String),
    Quit,
}

fn read_prompt<R: BufRead>(input: &mut R) -> CmdResult<Prompt> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Prompt::Quit);
    }
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Ok(Prompt::Quit);
    }
    Ok(Prompt::Line(line.to_owned()))
}

/// Interactive loop: show the character, reveal keyword and mnemonic on
/// Enter, then read a score. Invalid scores re-prompt. `q` or end of input
/// stops early; otherwise the loop ends when nothing is due.
pub async fn study<R: BufRead, W: Write>(
    services: &AppServices,
    mut input: R,
    out: &mut W,
    json: bool,
) -> CmdResult<StudyTally> {
    let study = services.study_loop();
    let collection = services.collection().id();
    let mut tally = StudyTally::default();

    'cards: while let Some(current) = study.next_card(collection).await? {
        if !json {
            writeln!(out, "\n{}    (Enter to reveal, q to quit)", current.kanji.character)?;
            out.flush()?;
            if let Prompt::Quit = read_prompt(&mut input)? {
                break;
            }
            writeln!(
                out,
                "{} (#{})\n  {}",
                current.kanji.keyword,
                current.kanji.heisig_index,
                current.card.mnemonic()
            )?;
        }

        let answer = loop {
            if !json {
                write!(out, "score 0-5: ")?;
                out.flush()?;
            }
            let raw = match read_prompt(&mut input)? {
                Prompt::Quit => break 'cards,
                Prompt::Line(raw) => raw,
            };
            let score = match raw.parse::<ReviewScore>() {
                Ok(score) => score,
                Err(err) if json => {
                    write_json(out, &serde_json::json!({ "error": err.to_string() }))?;
                    continue;
                }
                Err(err) => {
                    writeln!(out, "{err}")?;
                    continue;
                }
            };
            break study.answer(&current, i64::from(score)).await?;
        };

        tally.record(&answer.review);
        if json {
            write_json(
                out,
                &ReviewView::new(answer.card.id(), &answer.review, answer.log_id),
            )?;
        } else {
            describe_review(out, &answer.review)?;
        }
    }

    if json {
        write_json(out, &tally)?;
    } else {
        writeln!(
            out,
            "\nReviewed {} ({} passed, {} missed).",
            tally.reviewed, tally.passed, tally.missed
        )?;
    }
    Ok(tally)
}
