use clap::{Parser, Subcommand};
use review_scheduler::database::db;
use review_scheduler::database::stats::{deck_stats, recent_summary, review_streak, weekly_summary};
use review_scheduler::session::{build_pooled_session, build_session};
use review_scheduler::{Config, Result, SchedulerError, Sm2Scheduler};

use chrono::{DateTime, Local, Utc};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "review-scheduler", about = "Spaced repetition review scheduler", version)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "db.sqlite3")]
    db: PathBuf,

    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a sample deck if the database has none
    Seed,

    /// Create a new deck
    AddDeck { name: String },

    /// Add a card to a deck
    AddCard {
        deck: String,
        front: String,
        back: String,
    },

    /// Include a deck in pooled sessions
    Activate { deck: String },

    /// Leave a deck out of pooled sessions
    Deactivate { deck: String },

    /// List the cards of the next session
    Session {
        /// Decks to study; all active decks when omitted
        #[arg(long)]
        deck: Vec<String>,
        #[arg(long)]
        max_total: Option<usize>,
        #[arg(long)]
        max_new: Option<usize>,
    },

    /// Answer a card
    Review {
        card_id: i64,
        quality: u8,
        /// Seconds spent on the card
        #[arg(long)]
        time_spent: Option<u32>,
    },

    /// Show deck counts and today's accuracy
    Stats {
        #[arg(long)]
        deck: Vec<String>,
    },

    /// Move the simulated clock one day forward
    AdvanceDay,
}

/// Formats a timestamp as local YYYY-MM-DD HH:MM
fn format_time(time: DateTime<Utc>) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let scheduler = Sm2Scheduler::new(config.scheduler.clone(), config.ratings.clone())?;
    let mut conn = db::open_database(&cli.db)?;
    let now = db::init_clock(Utc::now(), &conn)?;

    match cli.command {
        Command::Seed => {
            if db::load_all_decks(&conn)?.decks.is_empty() {
                let deck = db::new_deck("Polish Vocabulary", now, &conn)?;
                let words = [("cześć", "hello"), ("dziękuję", "thank you"), ("proszę", "please")];
                for (front, back) in words {
                    db::add_card(deck, front, back, now, scheduler.config(), &conn)?;
                }
                println!("Sample data created!");
            } else {
                println!("Database already has decks, nothing to seed.");
            }
        }
        Command::AddDeck { name } => {
            let id = db::new_deck(&name, now, &conn)?;
            println!("Deck '{name}' created (id {id}).");
        }
        Command::AddCard { deck, front, back } => {
            let deck = db::get_deck_by_name(&deck, &conn)?;
            let id = db::add_card(deck.id, &front, &back, now, scheduler.config(), &conn)?;
            println!("Card {id} added to '{}'.", deck.name);
        }
        Command::Activate { deck } => db::set_deck_active(&deck, true, &conn)?,
        Command::Deactivate { deck } => db::set_deck_active(&deck, false, &conn)?,
        Command::Session {
            deck,
            max_total,
            max_new,
        } => {
            let mut limits = config.session.clone();
            limits.max_total = max_total.unwrap_or(limits.max_total);
            limits.max_new = max_new.unwrap_or(limits.max_new);

            let decks = db::load_all_decks(&conn)?;
            let ids = match deck.as_slice() {
                [] => build_pooled_session(&decks, None, now, &limits, &conn)?,
                // A single deck is studied even when it is inactive
                [name] => {
                    let deck = decks
                        .find_by_name(name)
                        .ok_or_else(|| SchedulerError::DeckNotFound(name.clone()))?;
                    build_session(&conn, &[deck.id], now, &limits)?
                }
                names => {
                    let requested = names
                        .iter()
                        .map(|name| {
                            decks
                                .find_by_name(name)
                                .map(|deck| deck.id)
                                .ok_or_else(|| SchedulerError::DeckNotFound(name.clone()))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    build_pooled_session(&decks, Some(requested.as_slice()), now, &limits, &conn)?
                }
            };

            if ids.is_empty() {
                println!("Nothing to review right now.");
            }
            for card in db::get_cards(&ids, &conn)? {
                let kind = if card.is_new() { "new" } else { "due" };
                println!("{:>6}  [{kind}]  {}", card.id, card.front);
            }
        }
        Command::Review {
            card_id,
            quality,
            time_spent,
        } => {
            let card = db::record_review(card_id, quality, now, time_spent, &scheduler, &mut conn)?;
            let label = scheduler.ratings().label(quality).unwrap_or("?");
            println!(
                "{} -> {label}: next review {} (in {} days, ease {:.2})",
                card.front,
                format_time(card.state.due_at),
                card.state.interval_days,
                card.state.ease
            );
        }
        Command::Stats { deck } => {
            let decks = db::load_all_decks(&conn)?;
            let selected: Vec<_> = if deck.is_empty() {
                decks.decks.iter().collect()
            } else {
                decks
                    .decks
                    .iter()
                    .filter(|d| deck.contains(&d.name))
                    .collect()
            };

            println!("Now: {}", format_time(now));
            for d in selected {
                let stats = deck_stats(&[d.id], now, &conn)?;
                println!(
                    "  - {}{}: {} cards, {} new, {} due, {} learning, {} mastered, {:.1}% success",
                    d.name,
                    if d.is_active { "" } else { " (inactive)" },
                    stats.total_cards,
                    stats.new_cards,
                    stats.due_cards,
                    stats.learning_cards,
                    stats.mastered_cards,
                    stats.success_rate
                );
            }

            let summary = recent_summary(now, 1, scheduler.ratings(), &conn)?;
            println!(
                "Last 24h: {} reviews, {:.1}% passed, {} s spent",
                summary.total_reviews, summary.accuracy, summary.time_spent_secs
            );
            let week = weekly_summary(now, scheduler.ratings(), &conn)?;
            println!(
                "Last 7 days: {} reviews, {:.1} per day, {} days active",
                week.summary.total_reviews, week.average_daily_reviews, week.summary.days_active
            );
            println!("Streak: {} days", review_streak(now, &conn)?);
        }
        Command::AdvanceDay => {
            let next = db::advance_day(&conn)?;
            println!("Current date is now {}", format_time(next));
        }
    }

    Ok(())
}
