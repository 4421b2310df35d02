use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Duration, Local, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use vocab_review::config::Config;
use vocab_review::database::db;
use vocab_review::export::json::{export_json_to_path, import_into, import_json};
use vocab_review::models::stats::{
    MAX_STREAK_DAYS, Retention, ReviewStats, predict_workload, review_stats, review_streak,
};
use vocab_review::models::{Grade, VocabularyWord, WordKey};
use vocab_review::service::review::{ReviewRequest, due_words, submit_review, word_details};

/// Spaced-repetition review for saved vocabulary
#[derive(Parser)]
#[command(name = "vocab-review")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schedule and review saved vocabulary with SM-2")]
struct Cli {
    /// SQLite database file (defaults to $VOCAB_REVIEW_DB or the platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Learner id (defaults to $VOCAB_REVIEW_USER or demo-user)
    #[arg(long, short, global = true)]
    user: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a word lookup
    Click {
        word: String,
        #[arg(long)]
        translation: Option<String>,
        /// Sentence the word was found in
        #[arg(long)]
        context: Option<String>,
    },

    /// Add a word to the review set
    Save {
        word: String,
        #[arg(long)]
        translation: Option<String>,
    },

    /// Remove a word from the review set
    Unsave {
        /// Word id
        id: i64,
    },

    /// Grade a review: 0-1 again, 2 hard, 3 good, 4 easy, 5 perfect
    Review {
        /// Word id or text
        word: String,
        #[arg(allow_negative_numbers = true)]
        quality: i64,
        /// Time spent answering, in milliseconds
        #[arg(long)]
        time_spent: Option<u64>,
    },

    /// List words due for review, in review order
    Due {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one word with its recent reviews
    Word {
        /// Word id or text
        word: String,
    },

    /// Show progress statistics
    Stats,

    /// Predict reviews per day
    Workload {
        #[arg(long, default_value = "30")]
        days: u32,
    },

    /// List mastered words
    Mastered,

    /// List words still being learned
    Learning {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Export vocabulary to a JSON file
    Export { output: PathBuf },

    /// Import vocabulary from a JSON file
    Import { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(user) = cli.user {
        config.default_user = user;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Some(parent) = config.database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut conn = db::init_database(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    let user = config.default_user.as_str();
    let now = Utc::now();
    let json = cli.json;

    match cli.command {
        Commands::Click {
            word,
            translation,
            context,
        } => {
            let word = db::track_click(
                user,
                &word,
                translation.as_deref(),
                context.as_deref(),
                now,
                &conn,
            )?;
            emit(json, &word, || {
                println!("'{}' looked up {} time(s)", word.word, word.state.click_count)
            })?;
        }
        Commands::Save { word, translation } => {
            let word = db::save_word(user, &word, translation.as_deref(), now, &conn)?;
            emit(json, &word, || println!("Saved '{}' (#{})", word.word, word.id))?;
        }
        Commands::Unsave { id } => {
            if !db::unsave_word(user, id, &conn)? {
                anyhow::bail!("word #{id} not found for {user}");
            }
            emit(json, &id, || println!("Removed #{id} from review"))?;
        }
        Commands::Review {
            word,
            quality,
            time_spent,
        } => {
            let request = ReviewRequest {
                user_id: user.to_string(),
                word: WordKey::parse(&word),
                quality: Some(quality),
                time_spent_ms: time_spent,
            };
            let result = submit_review(&request, now, &mut conn)?;
            emit(json, &result, || {
                println!(
                    "'{}' graded {}: next review {} (interval {} day(s), mastery {}/5)",
                    result.word.word,
                    result.grade.label(),
                    format_time(result.outcome.next_review),
                    result.outcome.interval,
                    result.outcome.mastery_level
                )
            })?;
        }
        Commands::Due { limit } => {
            let words = due_words(user, now, limit.unwrap_or(config.daily_limit), &conn)?;
            emit(json, &words, || print_words(&words))?;
        }
        Commands::Word { word } => {
            let details = word_details(user, &WordKey::parse(&word), &conn)?;
            emit(json, &details, || {
                print_words(std::slice::from_ref(&details.word));
                if details.history.is_empty() {
                    println!("No reviews yet.");
                }
                for event in &details.history {
                    let spent = event
                        .time_spent_ms
                        .map(|ms| format!("{ms} ms"))
                        .unwrap_or_else(|| "-".to_string());
                    let grade = Grade::from_quality(event.quality).map_or("?", Grade::label);
                    println!("  {}  {:<7} {}", format_time(event.created_at), grade, spent);
                }
            })?;
        }
        Commands::Stats => {
            let words = db::words_for_user(user, true, &conn)?;
            let (total, successful) = db::review_totals(user, &conn)?;
            let since = now - Duration::days(i64::from(MAX_STREAK_DAYS) + 1);
            let recent = db::review_events_since(user, since, &conn)?;
            let report = StatsReport {
                stats: review_stats(&words, now),
                retention: Retention::from_counts(total, successful),
                streak: review_streak(&recent, now.date_naive()),
            };
            emit(json, &report, || {
                let s = &report.stats;
                println!(
                    "Words: {} ({} due now, {} due tomorrow)",
                    s.total, s.due_now, s.due_tomorrow
                );
                println!("By mastery: {:?}", s.by_mastery);
                println!("Average easiness: {:.2}", s.average_easiness);
                println!("Longest run: {}", s.longest_run);
                println!("Recommended daily reviews: {}", s.recommended_daily);
                println!(
                    "Retention: {}% of {} review(s)",
                    report.retention.rate, report.retention.total_reviews
                );
                println!("Streak: {} day(s)", report.streak);
            })?;
        }
        Commands::Workload { days } => {
            let words = db::words_for_user(user, true, &conn)?;
            let workload = predict_workload(&words, now.date_naive(), days);
            emit(json, &workload, || {
                for day in &workload {
                    println!("{}  {}", day.date, day.due);
                }
            })?;
        }
        Commands::Mastered => {
            let words = db::mastered_words(user, &conn)?;
            emit(json, &words, || print_words(&words))?;
        }
        Commands::Learning { limit } => {
            let words = db::learning_words(user, limit, &conn)?;
            emit(json, &words, || print_words(&words))?;
        }
        Commands::Export { output } => {
            let words = db::words_for_user(user, false, &conn)?;
            export_json_to_path(&words, &output)?;
            emit(json, &words.len(), || {
                println!("Exported {} word(s) to {}", words.len(), output.display())
            })?;
        }
        Commands::Import { file } => {
            let words = import_json(&file)?;
            let stored = import_into(user, &words, now, &mut conn)?;
            emit(json, &stored, || {
                println!("Imported {stored} word(s) from {}", file.display())
            })?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct StatsReport {
    stats: ReviewStats,
    retention: Retention,
    streak: u32,
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

/// Formats a timestamp in local time as YYYY-MM-DD HH:MM
fn format_time(time: DateTime<Utc>) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

fn print_words(words: &[VocabularyWord]) {
    if words.is_empty() {
        println!("Nothing here.");
        return;
    }
    for word in words {
        let due = word
            .state
            .next_review
            .map(format_time)
            .unwrap_or_else(|| "new".to_string());
        println!(
            "#{:<5} {:<20} {:<20} mastery {}  clicks {}  due {}",
            word.id,
            word.word,
            word.translation.as_deref().unwrap_or("-"),
            word.state.mastery_level,
            word.state.click_count,
            due
        );
    }
}
