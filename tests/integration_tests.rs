use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;
use video_sub_renamer::matching::levenshtein_distance;
use video_sub_renamer::{
    assign, ConfigBuilder, Match, Processor, ScanStatus, Scorer, ScorerRegistry, Strategy,
};

fn folder_with(names: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for name in names {
        let path = temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, name.as_bytes()).unwrap();
    }
    temp_dir
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_end_to_end_match_and_commit() {
    let temp_dir = folder_with(&["Movie.2019.1080p.mkv", "Movie.2019.srt", "Unrelated.srt"]);
    let processor = Processor::new(ConfigBuilder::new().build());

    let report = processor.scan(temp_dir.path());
    assert!(matches!(report.status, ScanStatus::Scanned { matched: 1, .. }));
    assert_eq!(
        report.store.matches(),
        &[Match::new("Movie.2019.1080p.mkv", "Movie.2019.srt")]
    );
    assert_eq!(report.store.unmatched_auxiliaries(), vec!["Unrelated.srt"]);

    let commit = processor.commit(&report.store);
    assert_eq!(commit.renamed, 1);
    assert!(commit.is_clean());
    assert!(temp_dir.path().join("Movie.2019.1080p.srt").exists());
    assert!(!temp_dir.path().join("Movie.2019.srt").exists());

    // the rescan finds the pair by exact name and has nothing left to do
    let rescanned = processor.scan(temp_dir.path());
    assert_eq!(
        rescanned.store.matches(),
        &[Match::new("Movie.2019.1080p.mkv", "Movie.2019.1080p.srt")]
    );
    let again = processor.commit(&rescanned.store);
    assert_eq!((again.renamed, again.skipped), (0, 1));
}

#[test]
fn test_commit_backs_up_existing_caption() {
    let temp_dir = folder_with(&["Movie.mkv", "Old.srt", "Movie.srt"]);
    let processor = Processor::new(ConfigBuilder::new().build());

    let mut report = processor.scan(temp_dir.path());
    // Movie.srt pairs exactly; override by hand
    report.store.create("Movie.mkv", "Old.srt").unwrap();
    assert_eq!(report.store.matches(), &[Match::new("Movie.mkv", "Old.srt")]);

    let commit = processor.commit(&report.store);
    assert_eq!(commit.renamed, 1);
    assert_eq!(fs::read(temp_dir.path().join("Movie.srt")).unwrap(), b"Old.srt");
    assert_eq!(fs::read(temp_dir.path().join("Movie.srt.bak")).unwrap(), b"Movie.srt");
}

#[test]
fn test_marker_round_trip_through_store() {
    let temp_dir = folder_with(&["Show.mkv", "Show.srt"]);
    let processor = Processor::new(ConfigBuilder::new().build());
    let mut report = processor.scan(temp_dir.path());

    assert!(report.store.remove("Show.mkv", "Show.srt"));
    assert!(temp_dir.path().join("--Show.mkv").exists());
    assert!(!temp_dir.path().join("Show.mkv").exists());

    report.store.create("Show.mkv", "Show.srt").unwrap();
    assert!(temp_dir.path().join("Show.mkv").exists());
    assert!(!temp_dir.path().join("--Show.mkv").exists());
    assert_eq!(report.store.matches(), &[Match::new("Show.mkv", "Show.srt")]);
}

#[test]
fn test_marked_video_is_matched_and_unmarked_on_scan() {
    let temp_dir = folder_with(&["--Show.S01E01.mkv", "Show.S01E01.en.srt"]);
    let report = Processor::new(ConfigBuilder::new().build()).scan(temp_dir.path());

    assert_eq!(
        report.store.matches(),
        &[Match::new("Show.S01E01.mkv", "Show.S01E01.en.srt")]
    );
    assert!(temp_dir.path().join("Show.S01E01.mkv").exists());
}

#[test]
fn test_recursive_commit_places_caption_next_to_video() {
    let temp_dir = folder_with(&["season1/Show.S01E01.mkv", "subs/show.s01e01.eng.srt"]);
    let processor = Processor::new(ConfigBuilder::new().recursive(true).build());

    let report = processor.scan(temp_dir.path());
    assert_eq!(report.store.matches().len(), 1);

    let commit = processor.commit(&report.store);
    assert_eq!(commit.renamed, 1);
    assert!(temp_dir.path().join("season1/Show.S01E01.srt").exists());
}

#[test]
fn test_assignment_is_idempotent_and_unique() {
    let primaries = owned(&[
        "Show.S01E01.720p.HDTV.mkv",
        "Show.S01E02.720p.HDTV.mkv",
        "Show.S01E03.720p.HDTV.mkv",
        "Film.2010.mkv",
        "Film.2012.mkv",
    ]);
    let auxiliaries = owned(&[
        "Show.S01E03.WEB.srt",
        "Show.S01E02.srt",
        "Show.S01E01.srt",
        "Film.2012.srt",
        "Film.2010.en.srt",
        "Film.srt",
    ]);

    let registry = ScorerRegistry::standard();
    for id in registry.ids() {
        let scorer = registry.select(Some(id));
        let first = assign(&primaries, &auxiliaries, &scorer, 0.5);
        let second = assign(&primaries, &auxiliaries, &scorer, 0.5);
        assert_eq!(first, second, "strategy {}", id);

        let videos: HashSet<_> = first.iter().map(|m| m.primary.clone()).collect();
        let captions: HashSet<_> = first.iter().map(|m| m.auxiliary.clone()).collect();
        assert_eq!(videos.len(), first.len());
        assert_eq!(captions.len(), first.len());
    }
}

#[test]
fn test_year_veto() {
    for strategy in [Strategy::YearWord, Strategy::Hybrid] {
        let score = Scorer::new(strategy).score("Show.2020", "Show.2021");
        assert!(score <= 0.1, "{} scored {}", strategy, score);
    }
}

#[test]
fn test_season_episode_scores() {
    let scorer = Scorer::default();
    assert_eq!(scorer.score("Show.S02E05", "Show.S02E05"), 1.0);
    assert_eq!(scorer.score("Show.S02E05", "Show.S02E06"), 0.3);
}

#[test]
fn test_levenshtein_symmetry() {
    let samples = ["", "show", "Show.2020", "the office", "office the"];
    for a in samples {
        assert_eq!(levenshtein_distance(a, a), 0);
        for b in samples {
            assert_eq!(levenshtein_distance(a, b), levenshtein_distance(b, a));
        }
    }
}

#[test]
fn test_swap_then_commit() {
    let temp_dir = folder_with(&["A.mkv", "B.mkv", "A.srt", "B.srt"]);
    let processor = Processor::new(ConfigBuilder::new().build());
    let mut report = processor.scan(temp_dir.path());

    report.store.swap("A.mkv", "A.srt", "B.mkv", "B.srt").unwrap();
    let commit = processor.commit(&report.store);
    assert_eq!(commit.renamed, 2);

    assert_eq!(fs::read(temp_dir.path().join("A.srt")).unwrap(), b"B.srt");
    assert_eq!(fs::read(temp_dir.path().join("B.srt")).unwrap(), b"A.srt");
}
