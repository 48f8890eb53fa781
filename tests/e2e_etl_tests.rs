//! End-to-end tests for a full load over on-disk corpora.

mod common;

use common::*;
use serde_json::Value;
use sparkify_etl::pipeline::{LookupStrategy, PipelineError};
use sparkify_etl::warehouse::{Level, TableCounts};
use sparkify_etl::{run_etl, SqliteWarehouse, Warehouse};

fn run(corpus: &TestCorpus, lookup: LookupStrategy) -> anyhow::Result<sparkify_etl::EtlReport> {
    let mut warehouse = corpus.open_warehouse();
    run_etl(&mut warehouse, &corpus.config(lookup))
}

#[test]
fn test_single_song_single_play_end_to_end() {
    let corpus = TestCorpus::new();
    corpus.add_song_file(
        "A/A/A/TRAAAAW128F429D538.json",
        &song_json(SONG_ID, SONG_TITLE, ARTIST_ID, ARTIST_NAME, SONG_DURATION),
    );
    corpus.add_log_file(
        "2018/11/2018-11-02-events.json",
        &[log_line(SONG_TITLE, ARTIST_NAME, SONG_DURATION, TS, "free")],
    );

    let report = run(&corpus, LookupStrategy::Query).unwrap();

    assert_eq!(
        report.counts,
        TableCounts {
            songs: 1,
            artists: 1,
            users: 1,
            time: 1,
            songplays: 1,
        }
    );

    let warehouse = corpus.open_warehouse();
    let song = warehouse.get_song(SONG_ID).unwrap().unwrap();
    assert_eq!(song.year, 2000);
    assert_eq!(song.duration, SONG_DURATION);
    let artist = warehouse.get_artist(ARTIST_ID).unwrap().unwrap();
    assert_eq!(artist.location.as_deref(), Some("L"));
    assert_eq!(artist.latitude, Some(1.0));
    assert_eq!(artist.longitude, Some(2.0));

    let time = warehouse.get_time(START_TIME).unwrap().unwrap();
    assert_eq!((time.hour, time.day, time.month, time.year), (1, 2, 11, 2018));

    let user = warehouse.get_user(USER_ID).unwrap().unwrap();
    assert_eq!(user.first_name, "Ryan");
    assert_eq!(user.level, Level::Free);

    let songplays = warehouse.get_songplays().unwrap();
    assert_eq!(songplays.len(), 1);
    assert_eq!(songplays[0].start_time, START_TIME);
    assert_eq!(songplays[0].user_id, USER_ID);
    assert_eq!(songplays[0].song_id.as_deref(), Some(SONG_ID));
    assert_eq!(songplays[0].artist_id.as_deref(), Some(ARTIST_ID));
    assert_eq!(songplays[0].session_id, 583);
}

#[test]
fn test_empty_roots_complete_without_inserts() {
    let corpus = TestCorpus::new();

    let report = run(&corpus, LookupStrategy::Query).unwrap();

    assert_eq!(report.songs.files_found, 0);
    assert_eq!(report.logs.files_found, 0);
    assert_eq!(report.counts, TableCounts::default());
}

#[test]
fn test_showtime_join_hit_and_unknown_track_miss() {
    for lookup in [LookupStrategy::Query, LookupStrategy::Preload] {
        let corpus = TestCorpus::new();
        corpus.add_song_file(
            "S/SOSHOW.json",
            &song_json("SOSHOW", "Showtime", "ARTONY", "Tony Bennett", 215.5),
        );
        corpus.add_log_file(
            "events.json",
            &[
                log_line("Showtime", "Tony Bennett", 215.5, TS, "free"),
                log_line("Unknown Track", "Tony Bennett", 215.5, TS + 1000, "free"),
            ],
        );

        let report = run(&corpus, lookup).unwrap();
        assert_eq!(report.logs.totals.lookup_hits, 1, "{:?}", lookup);
        assert_eq!(report.logs.totals.lookup_misses, 1, "{:?}", lookup);

        let songplays = corpus.open_warehouse().get_songplays().unwrap();
        assert_eq!(songplays[0].song_id.as_deref(), Some("SOSHOW"));
        assert_eq!(songplays[0].artist_id.as_deref(), Some("ARTONY"));
        assert_eq!(songplays[1].song_id, None);
        assert_eq!(songplays[1].artist_id, None);
    }
}

#[test]
fn test_song_and_artist_keys_are_never_half_set() {
    let corpus = TestCorpus::new();
    corpus.add_song_file("a.json", &song_json("S1", "T", "A1", "N", 180.0));
    corpus.add_song_file("b.json", &song_json("S2", "U", "A2", "M", 200.0));
    corpus.add_log_file(
        "events.json",
        &[
            log_line("T", "N", 180.0, TS, "free"),
            // title of one song, artist of another
            log_line("T", "M", 180.0, TS + 1, "free"),
            log_line("U", "M", 180.0, TS + 2, "free"),
            log_line("U", "M", 200.0, TS + 3, "free"),
        ],
    );

    run(&corpus, LookupStrategy::Query).unwrap();

    let songplays = corpus.open_warehouse().get_songplays().unwrap();
    assert_eq!(songplays.len(), 4);
    for songplay in &songplays {
        assert_eq!(songplay.song_id.is_some(), songplay.artist_id.is_some());
    }
    let resolved: Vec<_> = songplays.iter().map(|s| s.song_id.as_deref()).collect();
    assert_eq!(resolved, vec![Some("S1"), None, None, Some("S2")]);
}

#[test]
fn test_non_playback_and_incomplete_records_contribute_nothing() {
    let corpus = TestCorpus::new();
    let mut home = log_line("T", "N", 180.0, TS, "free");
    home["page"] = Value::from("Home");
    home["userId"] = Value::from("40");
    let mut logged_out = log_line("T", "N", 180.0, TS + 5, "free");
    logged_out["userId"] = Value::from("");
    logged_out["firstName"] = Value::Null;
    let mut no_agent = log_line("T", "N", 180.0, TS + 9, "paid");
    no_agent["userId"] = Value::from("41");
    no_agent.as_object_mut().unwrap().remove("userAgent");
    let mut no_registration = log_line("T", "N", 180.0, TS + 12, "paid");
    no_registration["userId"] = Value::from("42");
    no_registration["registration"] = Value::Null;
    corpus.add_log_file(
        "events.json",
        &[home, logged_out, no_agent, no_registration],
    );

    let report = run(&corpus, LookupStrategy::Query).unwrap();

    assert_eq!(report.logs.totals.records, 4);
    assert_eq!(report.logs.totals.filtered_out, 1);
    assert_eq!(report.logs.totals.rejected, 3);
    assert_eq!(report.counts.time, 0);
    assert_eq!(report.counts.users, 0);
    assert_eq!(report.counts.songplays, 0);
}

#[test]
fn test_rerun_is_idempotent_for_dimensions_and_latest_level_wins() {
    let corpus = TestCorpus::new();
    corpus.add_song_file("a.json", &song_json(SONG_ID, SONG_TITLE, ARTIST_ID, ARTIST_NAME, 180.0));
    corpus.add_log_file(
        "2018-11-01-events.json",
        &[
            log_line(SONG_TITLE, ARTIST_NAME, 180.0, TS, "free"),
            log_line(SONG_TITLE, ARTIST_NAME, 180.0, TS, "free"),
        ],
    );
    corpus.add_log_file(
        "2018-11-02-events.json",
        &[log_line(SONG_TITLE, ARTIST_NAME, 180.0, TS + 60_000, "paid")],
    );

    run(&corpus, LookupStrategy::Query).unwrap();
    let report = run(&corpus, LookupStrategy::Query).unwrap();

    assert_eq!(report.counts.songs, 1);
    assert_eq!(report.counts.artists, 1);
    assert_eq!(report.counts.time, 2);
    assert_eq!(report.counts.users, 1);
    // facts are at-least-once
    assert_eq!(report.counts.songplays, 6);

    let warehouse = corpus.open_warehouse();
    assert_eq!(warehouse.get_user(USER_ID).unwrap().unwrap().level, Level::Paid);
}

#[test]
fn test_malformed_log_file_aborts_after_committing_earlier_files() {
    let corpus = TestCorpus::new();
    corpus.add_log_file(
        "a/2018-11-01-events.json",
        &[log_line("T", "N", 180.0, TS, "free")],
    );
    corpus.add_raw_log_file(
        "b/2018-11-02-events.json",
        &format!(
            "{}\n{{\"ts\": 1541121934796, \"page\": ",
            log_line("T", "N", 180.0, TS + 1, "free")
        ),
    );
    corpus.add_log_file(
        "c/2018-11-03-events.json",
        &[log_line("T", "N", 180.0, TS + 2, "free")],
    );

    let err = run(&corpus, LookupStrategy::Query).unwrap_err();
    assert!(err.chain().any(|cause| matches!(
        cause.downcast_ref::<PipelineError>(),
        Some(PipelineError::Json { line: 2, .. })
    )));

    let mut warehouse: SqliteWarehouse = corpus.open_warehouse();
    let counts = warehouse.counts().unwrap();
    assert_eq!(counts.songplays, 1);
    assert_eq!(counts.time, 1);
}
