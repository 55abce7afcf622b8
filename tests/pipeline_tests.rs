//! End-to-end run of the tidy stages over a temporary download folder.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tempfile::tempdir;

use media_tidy::actions::{self, ActionEntry, ActionProcessor};
use media_tidy::lookup::{self, MetadataLookup};
use media_tidy::mover::Mover;
use media_tidy::organize::{self, MediaFilter};
use media_tidy::record::{Candidate, RecordAssembler, RecordMap};
use media_tidy::{artifact, folders, prune};

/// Answers every query with a fixed identifier derived from the query.
struct UppercaseLookup;

impl MetadataLookup for UppercaseLookup {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let (base, _) = media_tidy::part::extract_part(query);
        let number = base.trim_end_matches(['_', '-']).to_uppercase();
        Ok(vec![Candidate {
            number,
            actors: vec!["Alice".to_string(), "Bob".to_string()],
            homepage: String::new(),
        }])
    }
}

fn media_extensions() -> Vec<String> {
    media_tidy::DEFAULT_MEDIA_EXTENSIONS.iter().map(ToString::to_string).collect()
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn stages_turn_downloads_into_library() {
    let library = tempdir().unwrap();
    let state = tempdir().unwrap();
    let root = library.path();

    write(&root.join("dl1").join("abc-001_cd1.mp4"), "part one");
    write(&root.join("dl1").join("abc-001_cd2.mp4"), "part two");
    write(&root.join("dl1").join("readme.txt"), "junk");
    write(&root.join("dl2").join("nested").join("xyz-123.mkv"), "xyz");
    write(&root.join("dl2").join("trailer.mp4"), "");
    write(&root.join("dl3").join("unwanted.avi"), "bad");
    write(&root.join("dl3").join("maybe.wmv"), "later");

    let mut mover = Mover::new(root, false, false);

    // Clean: drop junk files and flatten the rest into the root.
    let filter = MediaFilter::new(&media_extensions(), 0);
    let clean = organize::clean_and_move(root, &filter, &mut mover).unwrap();
    assert_eq!(clean.deleted, 1);
    assert_eq!(clean.moved, 6);
    assert_eq!(clean.pruned, 4);
    assert!(!root.join("dl1").exists());
    assert!(root.join("abc-001_cd1.mp4").is_file());
    assert!(root.join("xyz-123.mkv").is_file());
    assert!(root.join("trailer.mp4").is_file());

    // Emit and edit the action file.
    let action_file = state.path().join("output.json");
    let mut action_map = actions::emit_action_map(root).unwrap();
    assert!(action_map.contains_key("maybe"));
    action_map.insert("unwanted".to_string(), ActionEntry::new("d"));
    action_map.insert("maybe".to_string(), ActionEntry::new("m"));
    action_map.insert("trailer".to_string(), ActionEntry::new("d"));
    artifact::save(&action_file, &action_map).unwrap();

    // Apply.
    let action_map = artifact::load(&action_file).unwrap();
    let report = ActionProcessor::default().apply(root, &action_map, &mut mover).unwrap();
    assert_eq!(report.deleted, 2);
    assert_eq!(report.quarantined, 1);
    assert!(root.join("Later").join("maybe.wmv").is_file());
    assert!(!root.join("unwanted.avi").exists());

    // Lookup into the record file.
    let record_file = state.path().join("data.json");
    let records = lookup::lookup_records(
        root,
        &UppercaseLookup,
        &RecordAssembler::default(),
        &media_extensions(),
        Duration::ZERO,
    )
    .await
    .unwrap();
    assert_eq!(
        records.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["ABC-0011", "ABC-0012", "XYZ-123"]
    );
    artifact::save(&record_file, &records).unwrap();

    // File by record.
    let records: RecordMap = artifact::load(&record_file).unwrap();
    let filed = organize::file_by_records(root, &records, &mut mover, Duration::ZERO).unwrap();
    assert_eq!(filed.moved, 3);
    let abc = root.join("Alice,Bob").join("ABC-001");
    assert_eq!(fs::read_to_string(abc.join("ABC-0011.mp4")).unwrap(), "part one");
    assert_eq!(fs::read_to_string(abc.join("ABC-0012.mp4")).unwrap(), "part two");
    assert!(root.join("Alice,Bob").join("XYZ-123").join("XYZ-123.mkv").is_file());

    // Renaming after folders keeps the filed names.
    let renamed =
        organize::rename_to_folder(root, &media_extensions(), actions::DEFAULT_QUARANTINE_DIR, &mut mover).unwrap();
    assert_eq!(renamed.moved, 0);
    assert!(root.join("Later").join("maybe.wmv").is_file());
    assert!(abc.join("ABC-0011.mp4").is_file());

    // A duplicate folder from a later download is consolidated.
    write(&root.join("Alice,Bob(1)").join("DEF-002").join("DEF-002.mp4"), "def");
    let consolidated = folders::consolidate(root, &mut mover).unwrap();
    assert_eq!(consolidated.families, 1);
    assert!(!root.join("Alice,Bob").exists());
    assert!(root.join("Alice,Bob(1)").join("ABC-001").join("ABC-0012.mp4").is_file());
    assert!(root.join("Alice,Bob(1)").join("DEF-002").join("DEF-002.mp4").is_file());

    // Nothing left to prune.
    assert_eq!(prune::prune_empty_dirs(root, &mut mover).unwrap(), 0);
}

#[test]
fn dryrun_stages_leave_tree_untouched() {
    let library = tempdir().unwrap();
    let root = library.path();
    write(&root.join("dl").join("movie.mp4"), "movie");
    write(&root.join("dl").join("junk.nfo"), "junk");
    write(&root.join("A(1)").join("x").join("x.mp4"), "x");
    write(&root.join("A").join("y").join("y.mp4"), "y");
    fs::create_dir_all(root.join("empty")).unwrap();

    let mut mover = Mover::new(root, true, false);
    let filter = MediaFilter::new(&media_extensions(), 0);
    organize::clean_and_move(root, &filter, &mut mover).unwrap();
    folders::consolidate(root, &mut mover).unwrap();
    let pruned = prune::prune_empty_dirs(root, &mut mover).unwrap();

    assert_eq!(pruned, 1);
    assert!(root.join("dl").join("movie.mp4").is_file());
    assert!(root.join("dl").join("junk.nfo").is_file());
    assert!(root.join("A").join("y").join("y.mp4").is_file());
    assert!(root.join("empty").is_dir());
}
