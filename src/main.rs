use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::debug;
use morse_coach::{
    actuator::{self, LogActuator, PlaybackTiming},
    clock::{Clock, ManualClock, SystemClock},
    codec::{self, CODE_TABLE},
    config::{Config, ConfigStore, FileConfigStore},
    daily,
    difficulty::Difficulty,
    lessons, phrases,
    practice::{GameMode, PracticeRound, StreakCounter},
    progress::{quietly, ProgressRecorder},
    replay,
    scoring::{InputAction, RacerSession, RacerStatus},
    selector::{drill_plan, DrillStep},
    store::SqliteStore,
};
use serde::Serialize;
use std::{error::Error, io, path::PathBuf, thread, time::Duration};

/// morse code trainer: transcoder, keyer replay, scoring and adaptive practice
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    /// progress database (defaults to the per-user state directory)
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// user whose progress is read and written
    #[clap(short = 'u', long, global = true)]
    user: Option<String>,

    /// keyer timing preset
    #[clap(short = 'd', long, value_enum, global = true)]
    difficulty: Option<Difficulty>,

    /// config file (defaults to the platform config directory)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// more log output (-v info, -vv debug); RUST_LOG wins when set
    #[clap(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// text to code
    Encode {
        text: Vec<String>,
        /// play the code back in real time, one log line per pulse
        #[clap(long)]
        play: bool,
    },
    /// code to text
    Decode { code: String },
    /// every character with its code
    Glossary,
    /// replay key timings through the keyer
    Keyer {
        /// phrase to key (random for the difficulty when omitted)
        #[clap(short, long)]
        phrase: Option<String>,
        /// strokes as <hold_ms>:<gap_ms>, separated by spaces or commas
        #[clap(short, long)]
        timings: String,
    },
    /// score a typed phrase attempt
    Race {
        #[clap(short, long)]
        phrase: Option<String>,
        /// keystrokes: `.` `-` space, ` / ` for a word gap, `<` for backspace
        #[clap(short, long)]
        keys: Option<String>,
        /// time taken to type the phrase
        #[clap(short, long, default_value_t = 60_000)]
        elapsed_ms: u64,
    },
    /// answer single-character questions as <CHAR>=<ANSWER>
    Practice {
        #[clap(short, long, value_enum, default_value_t = GameMode::Standard)]
        mode: GameMode,
        /// characters whose hint was shown before answering
        #[clap(long = "hint-on")]
        hints: Vec<char>,
        /// answer time recorded per question
        #[clap(short, long, default_value_t = 2_000)]
        elapsed_ms: u64,
        answers: Vec<String>,
    },
    /// the lesson curriculum and which lessons are done
    Lessons,
    /// show a lesson's characters, or grade its quiz answers in order
    Lesson {
        /// lesson id or number
        id: String,
        answers: Vec<String>,
    },
    /// today's word; submit with --answer
    Daily {
        #[clap(short, long)]
        answer: Option<String>,
        /// override today's date (YYYY-MM-DD)
        #[clap(long)]
        date: Option<NaiveDate>,
    },
    /// weakest characters by mistake rate and answer time
    Weakest {
        #[clap(short = 'n', long)]
        count: Option<usize>,
        /// print a teach/quiz drill for them
        #[clap(long)]
        plan: bool,
    },
    /// progress summary
    Stats {
        #[clap(long)]
        json: bool,
    },
    /// run history as CSV
    Export {
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

/// Settings after applying command-line overrides to the config file.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    config: Config,
    db_path: PathBuf,
}

impl Cli {
    fn settings(&self, mut config: Config) -> Settings {
        if let Some(user) = &self.user {
            config.user_id = user.clone();
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(db) = &self.db {
            config.db_path = Some(db.clone());
        }
        let db_path = config
            .resolved_db_path()
            .unwrap_or_else(|| PathBuf::from("morse-coach.db"));
        Settings { config, db_path }
    }
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[derive(Debug, Serialize)]
struct HistoryRow {
    recorded_at: String,
    wpm: f64,
    accuracy: f64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level(cli.verbose)))
        .init();

    let config_store = cli
        .config
        .as_ref()
        .map(FileConfigStore::with_path)
        .unwrap_or_default();
    let settings = cli.settings(config_store.load());
    debug!("settings: {settings:?}");

    run(&cli.command, &settings)?;
    Ok(())
}

fn open_recorder(settings: &Settings) -> morse_coach::Result<ProgressRecorder<SqliteStore>> {
    let store = SqliteStore::open(&settings.db_path)?;
    Ok(ProgressRecorder::new(store, settings.config.user_id.clone())
        .with_max_history(settings.config.max_history))
}

fn run(command: &Command, settings: &Settings) -> morse_coach::Result<()> {
    let difficulty = settings.config.difficulty;
    match command {
        Command::Encode { text, play } => {
            let stream = codec::encode(&text.join(" "));
            println!("{stream}");
            if *play {
                let steps = actuator::plan(&stream, &PlaybackTiming::default());
                let mut out = LogActuator::new();
                actuator::transmit(&steps, &mut out, |ms| {
                    thread::sleep(Duration::from_millis(ms))
                });
                println!(
                    "played {} pulses in {}ms",
                    out.pulses(),
                    actuator::total_duration_ms(&steps)
                );
            }
        }
        Command::Decode { code } => println!("{}", codec::decode_str(code)),
        Command::Glossary => {
            for c in CODE_TABLE.characters() {
                println!("{c}  {}", CODE_TABLE.code_for(c).unwrap_or_default());
            }
        }
        Command::Keyer { phrase, timings } => {
            let phrase = phrase
                .clone()
                .unwrap_or_else(|| phrases::phrase_for(&mut rand::thread_rng(), difficulty, None).to_string());
            let strokes = replay::parse_strokes(timings)?;
            let outcome = replay::replay(difficulty.profile(), &phrase, &strokes);

            println!("target:  {} ({})", phrase.to_uppercase(), codec::encode(&phrase));
            println!("keyed:   {}", outcome.code);
            println!("decoded: {}", outcome.text);
            if outcome.completed {
                println!("complete on {difficulty} after {}ms", outcome.elapsed_ms);
                let recorder = open_recorder(settings)?;
                if let Err(notice) = quietly(
                    "record keyer completion",
                    recorder.increment_keyer_completion(difficulty),
                ) {
                    eprintln!("{notice}");
                }
            } else if outcome.error {
                println!("off track");
            }
        }
        Command::Race {
            phrase,
            keys,
            elapsed_ms,
        } => {
            let phrase = phrase
                .clone()
                .unwrap_or_else(|| phrases::random_phrase(&mut rand::thread_rng(), None).to_string());
            let Some(keys) = keys else {
                println!("{}", phrase.to_uppercase());
                println!("{}", codec::encode(&phrase));
                return Ok(());
            };

            let clock = ManualClock::new(SystemClock::new().now_ms());
            let mut racer = RacerSession::new(&phrase, clock.clone());
            clock.advance(*elapsed_ms);
            for action in InputAction::parse_keystrokes(keys)? {
                if racer.apply(action) == RacerStatus::Finished {
                    debug!("ignoring {action:?} after completion");
                }
            }

            match racer.run() {
                Some(run) => {
                    println!("{} wpm, {}% accuracy", run.wpm, run.accuracy);
                    let recorder = open_recorder(settings)?;
                    match quietly("save run", recorder.record_run(&run)) {
                        Ok(record) if record.new_personal_best => println!("new personal best!"),
                        Ok(_) => {}
                        Err(notice) => eprintln!("{notice}"),
                    }
                }
                None => {
                    let tally = racer.tally();
                    println!(
                        "incomplete: {} ({} appends, {} mistakes)",
                        racer.input(),
                        tally.attempts,
                        tally.mistakes
                    );
                }
            }
        }
        Command::Practice {
            mode,
            hints,
            elapsed_ms,
            answers,
        } => {
            let recorder = open_recorder(settings)?;
            let mut streak = StreakCounter::new(*mode);
            let mut best = 0;
            for pair in answers {
                let Some((question, answer)) = pair.split_once('=') else {
                    eprintln!("skipping {pair:?}: expected <CHAR>=<ANSWER>");
                    continue;
                };
                let Some(character) = question.trim().chars().next() else {
                    continue;
                };
                let round = PracticeRound::new(*mode, character, 0);
                if hints.iter().any(|h| h.eq_ignore_ascii_case(&character)) {
                    streak.reveal_hint();
                }
                let correct = round.check(answer);
                let current = streak.record_answer(correct);
                best = best.max(current);
                streak.next_question();

                println!(
                    "{} {}  streak {current}",
                    round.character,
                    if correct { "correct" } else { "wrong" }
                );
                if let Err(notice) = quietly(
                    "record attempt",
                    recorder.record_char_attempt(round.character, correct, *elapsed_ms),
                ) {
                    eprintln!("{notice}");
                }
            }
            match quietly("save streak", recorder.merge_high_streak(*mode, best)) {
                Ok(true) => println!("new {mode} high streak: {best}"),
                Ok(false) => {}
                Err(notice) => eprintln!("{notice}"),
            }
        }
        Command::Lessons => {
            let completed = open_recorder(settings)?.completed_lessons()?;
            let next = lessons::next_lesson(&completed).map(|l| l.id);
            for lesson in &lessons::LESSONS {
                let mark = if completed.iter().any(|id| id == lesson.id) {
                    "x"
                } else if Some(lesson.id) == next {
                    ">"
                } else {
                    " "
                };
                println!(
                    "[{mark}] {}. {:<20} {}",
                    lesson.order, lesson.title, lesson.content
                );
            }
        }
        Command::Lesson { id, answers } => {
            let lesson = lessons::find(id)?;
            if answers.is_empty() {
                println!("{}: {}", lesson.order, lesson.title);
                for step in lesson.steps() {
                    match step {
                        DrillStep::Teach(c) => {
                            println!("teach {c}  {}", CODE_TABLE.code_for(c).unwrap_or_default())
                        }
                        DrillStep::Quiz(c) => println!("quiz  {c}"),
                    }
                }
                return Ok(());
            }

            let grade = lesson.grade(answers);
            for (c, ok) in &grade.results {
                println!("{c} {}", if *ok { "correct" } else { "wrong" });
            }
            if !grade.passed() {
                println!("{}/{} correct; try again", grade.correct(), grade.results.len());
                return Ok(());
            }
            let recorder = open_recorder(settings)?;
            match quietly("save lesson", recorder.mark_lesson_complete(lesson.id)) {
                Ok(true) => println!("lesson {} complete!", lesson.order),
                Ok(false) => println!("lesson {} already complete", lesson.order),
                Err(notice) => eprintln!("{notice}"),
            }
        }
        Command::Daily { answer, date } => {
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            let today_key = daily::date_key(today);
            let recorder = open_recorder(settings)?;
            let info = recorder.daily_info()?;

            if daily::already_played(&info.last_date, &today_key) {
                println!("already played {today_key}; streak {}", info.streak);
                return Ok(());
            }
            let Some(answer) = answer else {
                println!("{today_key}: {}", daily::word_for(today));
                return Ok(());
            };

            let outcome = daily::submit(today, answer, info.streak);
            if outcome.correct {
                println!("correct! streak {}", outcome.streak);
            } else {
                println!("expected {}; streak lost", daily::expected_code(today));
            }
            if let Err(notice) = quietly("save daily result", recorder.record_daily(&outcome)) {
                eprintln!("{notice}");
            }
        }
        Command::Weakest { count, plan } => {
            let recorder = open_recorder(settings)?;
            let weak = recorder.weakest(count.unwrap_or(settings.config.weakest_count))?;
            if weak.is_empty() {
                println!("not enough practice data yet");
                return Ok(());
            }
            println!("{}", weak.iter().map(char::to_string).collect::<Vec<_>>().join(" "));
            if *plan {
                for step in drill_plan(&weak) {
                    match step {
                        DrillStep::Teach(c) => {
                            println!("teach {c}  {}", CODE_TABLE.code_for(c).unwrap_or_default())
                        }
                        DrillStep::Quiz(c) => println!("quiz  {c}"),
                    }
                }
            }
        }
        Command::Stats { json } => {
            let summary = open_recorder(settings)?.summary()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
            println!("personal best:   {} wpm", show(summary.personal_best_wpm));
            println!("lifetime runs:   {}", summary.lifetime_runs);
            println!(
                "lifetime avg:    {} wpm, {}%",
                show(summary.lifetime_avg_wpm),
                show(summary.lifetime_avg_accuracy)
            );
            println!(
                "last {} avg:     {} wpm, {}%",
                summary.recent_runs,
                show(summary.recent_avg_wpm),
                show(summary.recent_avg_accuracy)
            );
            for (mode, high) in &summary.high_streaks {
                println!("{mode} high streak: {high}");
            }
            for (d, n) in &summary.keyer_completions {
                println!("keyer {d}: {n}");
            }
            println!(
                "daily streak:    {} (best {})",
                summary.daily_streak, summary.daily_high_streak
            );
        }
        Command::Export { output } => {
            let history = open_recorder(settings)?.history()?;
            let rows = history.iter().map(|run| HistoryRow {
                recorded_at: run
                    .recorded_at()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                wpm: run.wpm,
                accuracy: run.accuracy,
            });
            match output {
                Some(path) => write_csv(csv::Writer::from_path(path)?, rows)?,
                None => write_csv(csv::Writer::from_writer(io::stdout()), rows)?,
            }
        }
    }
    Ok(())
}

fn write_csv<W: io::Write>(
    mut writer: csv::Writer<W>,
    rows: impl Iterator<Item = HistoryRow>,
) -> morse_coach::Result<()> {
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["morse-coach", "-vv", "encode", "sos", "now"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Encode { ref text, play: false } if text == &["sos", "now"]
        ));

        let cli = Cli::try_parse_from(["morse-coach", "encode", "--play", "e"]).unwrap();
        assert!(matches!(cli.command, Command::Encode { play: true, .. }));

        let cli = Cli::try_parse_from(["morse-coach", "lesson", "1", ".", "-"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Lesson { ref id, ref answers } if id == "1" && answers.len() == 2
        ));

        let cli = Cli::try_parse_from([
            "morse-coach",
            "keyer",
            "--timings",
            "100:500",
            "--difficulty",
            "fast",
        ])
        .unwrap();
        assert_eq!(cli.difficulty, Some(Difficulty::Fast));
        assert!(matches!(cli.command, Command::Keyer { ref timings, .. } if timings == "100:500"));
    }

    #[test]
    fn test_cli_rejects_unknown_difficulty() {
        assert!(Cli::try_parse_from(["morse-coach", "-d", "ludicrous", "glossary"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "morse-coach",
            "--user",
            "op",
            "--db",
            "/tmp/x.db",
            "-d",
            "relaxed",
            "stats",
        ])
        .unwrap();
        let settings = cli.settings(Config::default());
        assert_eq!(settings.config.user_id, "op");
        assert_eq!(settings.config.difficulty, Difficulty::Relaxed);
        assert_eq!(settings.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.config.max_history, 10);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), "warn");
        assert_eq!(log_level(1), "info");
        assert_eq!(log_level(5), "debug");
    }
}
