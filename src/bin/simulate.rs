use clap::Parser;
use maze_chase_engine::autopilot::Autopilot;
use maze_chase_engine::constants::{STARTING_LIVES, TILE_SIZE};
use maze_chase_engine::engine::{tile_center, GameEngine, GameEngineOptions};
use maze_chase_engine::logging::{emit_log, now_iso};
use maze_chase_engine::maze::Maze;
use maze_chase_engine::types::{RuntimeEvent, SessionPhase, SessionSummary, Snapshot};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_MAX_TICKS: u64 = 60 * 60 * 30;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless autopilot soak runner for the maze chase engine")]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 3)]
    sessions: u32,
    #[arg(long)]
    max_ticks: Option<u64>,
    #[arg(long)]
    session_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct SessionResultLine {
    session: String,
    seed: u64,
    outcome: String,
    #[serde(flatten)]
    summary: SessionSummary,
    #[serde(rename = "bonusLives")]
    bonus_lives: u32,
    #[serde(rename = "roundsCleared")]
    rounds_cleared: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct SessionRunResult {
    #[serde(flatten)]
    result: SessionResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtIso")]
    started_at_iso: String,
    #[serde(rename = "finishedAtIso")]
    finished_at_iso: String,
    #[serde(rename = "sessionCount")]
    session_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "bestRound")]
    best_round: u32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    sessions: Vec<SessionResultLine>,
}

/// Values carried from the previous tick for monotonicity checks.
#[derive(Clone, Copy, Debug, Default)]
struct Previous {
    score: u32,
    round: u32,
}

fn main() {
    let cli = Cli::parse();
    let base_seed = cli.seed.unwrap_or_else(rand::random::<u64>);
    let max_ticks = cli.max_ticks.unwrap_or(DEFAULT_MAX_TICKS).max(1);
    let started_at_iso = now_iso();
    let run_id = cli
        .session_id
        .clone()
        .unwrap_or_else(|| default_run_id(base_seed));

    let mut has_anomaly = false;
    let mut results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for index in 0..cli.sessions.max(1) {
        let seed = derive_seed(base_seed, index);
        let session = format!("{run_id}-{}", index + 1);
        emit_log(
            "info",
            "session_started",
            Some(&session),
            Some(seed),
            None,
            json!({ "maxTicks": max_ticks }),
        );

        let run = match run_session(&session, seed, max_ticks) {
            Ok(run) => run,
            Err(error) => {
                emit_log(
                    "error",
                    "maze_load_failed",
                    Some(&session),
                    Some(seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                Some(&session),
                Some(seed),
                Some(anomaly.tick),
                json!({ "message": anomaly.message }),
            );
        }
        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run.anomaly_records.len();
        *outcome_counts.entry(run.result.outcome.clone()).or_insert(0) += 1;

        emit_log(
            "info",
            "session_finished",
            Some(&session),
            Some(seed),
            Some(run.result.summary.ticks),
            json!({
                "outcome": run.result.outcome,
                "score": run.result.summary.score,
                "roundReached": run.result.summary.round_reached,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&run.result).expect("session result should serialize")
        );
        results.push(run.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        started_at_iso,
        now_iso(),
        results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                Some(&run_id),
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        Some(&run_id),
        Some(base_seed),
        None,
        json!({
            "sessionCount": summary.session_count,
            "anomalyCount": summary.anomaly_count,
            "averageScore": summary.average_score,
            "bestRound": summary.best_round,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_session(
    session: &str,
    seed: u64,
    max_ticks: u64,
) -> Result<SessionRunResult, maze_chase_engine::maze::MazeError> {
    let mut engine = GameEngine::new(GameEngineOptions {
        seed,
        starting_round: 1,
    })?;

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut previous = Previous {
        score: 0,
        round: engine.round(),
    };
    let mut bonus_lives = 0;
    let mut rounds_cleared = 0;

    let mut pilot = Autopilot::new();
    while !engine.is_session_over() && engine.tick_count() < max_ticks {
        let dir = pilot.next_direction(&engine);
        engine.set_direction(dir);
        engine.tick();
        let snapshot = engine.build_snapshot(true);

        for message in collect_snapshot_anomalies(engine.maze(), &snapshot, previous) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        for event in &snapshot.events {
            match event {
                RuntimeEvent::BonusLife { .. } => bonus_lives += 1,
                RuntimeEvent::RoundCleared { .. } => rounds_cleared += 1,
                _ => {}
            }
        }
        previous = Previous {
            score: snapshot.player.score,
            round: snapshot.round,
        };
    }

    let outcome = if engine.is_session_over() {
        "game_over"
    } else {
        "tick_limit"
    };
    let summary = engine.build_summary();
    if bonus_lives > 1 {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            summary.ticks,
            format!("bonus life granted {bonus_lives} times"),
        );
    }

    Ok(SessionRunResult {
        result: SessionResultLine {
            session: session.to_string(),
            seed,
            outcome: outcome.to_string(),
            summary,
            bonus_lives,
            rounds_cleared,
            anomalies,
        },
        anomaly_records,
    })
}

fn collect_snapshot_anomalies(maze: &Maze, snapshot: &Snapshot, previous: Previous) -> Vec<String> {
    let mut anomalies = Vec::new();

    if snapshot.pellets_remaining > snapshot.pellets_total {
        anomalies.push(format!(
            "pellet count out of range: {}/{}",
            snapshot.pellets_remaining, snapshot.pellets_total
        ));
    }
    if snapshot.player.lives > STARTING_LIVES + 1 {
        anomalies.push(format!("too many lives: {}", snapshot.player.lives));
    }
    if snapshot.player.score < previous.score {
        anomalies.push(format!(
            "score decreased: {} -> {}",
            previous.score, snapshot.player.score
        ));
    }
    if snapshot.round < previous.round {
        anomalies.push(format!(
            "round decreased: {} -> {}",
            previous.round, snapshot.round
        ));
    }
    if snapshot.phase == SessionPhase::RoundCleared && snapshot.pellets_remaining != 0 {
        anomalies.push("round cleared with pellets left".to_string());
    }

    if !maze.is_open(snapshot.player.tile) {
        anomalies.push(format!("player on closed tile: {:?}", snapshot.player.tile));
    }
    if tile_center(snapshot.player.tile).distance(snapshot.player.pos) > TILE_SIZE {
        anomalies.push(format!(
            "player drifted off its tile: {:?}",
            snapshot.player.tile
        ));
    }
    for adversary in &snapshot.adversaries {
        if !maze.is_open(adversary.tile) {
            anomalies.push(format!(
                "adversary {} on closed tile: {:?}",
                adversary.id, adversary.tile
            ));
        }
        if tile_center(adversary.tile).distance(adversary.pos) > TILE_SIZE {
            anomalies.push(format!(
                "adversary {} drifted off its tile: {:?}",
                adversary.id, adversary.tile
            ));
        }
    }
    anomalies
}

fn derive_seed(base_seed: u64, index: u32) -> u64 {
    base_seed.wrapping_add(u64::from(index).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u64) -> String {
    format!("sim-{seed}")
}

fn build_run_summary(
    run_id: String,
    started_at_iso: String,
    finished_at_iso: String,
    sessions: Vec<SessionResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let session_count = sessions.len();
    let total_score: u64 = sessions
        .iter()
        .map(|session| u64::from(session.summary.score))
        .sum();
    let average_score = if session_count == 0 {
        0
    } else {
        (total_score / session_count as u64) as u32
    };
    let best_round = sessions
        .iter()
        .map(|session| session.summary.round_reached)
        .max()
        .unwrap_or(0);
    RunSummary {
        run_id,
        started_at_iso,
        finished_at_iso,
        session_count,
        anomaly_count,
        average_score,
        best_round,
        outcome_counts,
        sessions,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}
