//! End-to-end rebuild pipeline tests over real on-disk mod layouts.

use std::path::Path;
use std::sync::Arc;

use modlayer::archive::{ArchiveEntry, ArchiveRoot, InMemoryArchives};
use modlayer::builder::{GraphBuilder, RebuildSources};
use modlayer::config::{BuilderConfig, ModEntry, Profile};
use modlayer::loadorder::StaticLoadOrder;
use modlayer::walk::FsWalker;
use modlayer::Generation;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Flatten a generation into comparable (path, winner, losers) rows.
///
/// Origin ids differ between runs depending on worker scheduling, so
/// comparisons use origin names.
fn shape(generation: &Generation) -> Vec<(String, String, Vec<String>)> {
    let name_of = |id| {
        generation
            .find_origin_by_id(id)
            .map(|o| o.name())
            .unwrap_or_else(|| "?".to_string())
    };
    let mut rows: Vec<(String, String, Vec<String>)> = generation
        .files()
        .records()
        .iter()
        .map(|record| {
            (
                generation.relative_path(record),
                record.primary().map(|p| name_of(p.origin)).unwrap_or_default(),
                record
                    .alternatives()
                    .iter()
                    .map(|a| name_of(a.origin))
                    .collect(),
            )
        })
        .collect();
    rows.sort();
    rows
}

/// Build the §-style three-origin fixture: data, ModA (archived), ModB
/// (loose) all providing `textures/rock.dds`.
struct Fixture {
    _temp: TempDir,
    profile: Profile,
    archives: InMemoryArchives,
    load_order: StaticLoadOrder,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        let mod_a = temp.path().join("mods/ModA");
        let mod_b = temp.path().join("mods/ModB");

        write(&data.join("textures/rock.dds"), "from data");
        write(&data.join("textures/grass.dds"), "from data");
        std::fs::create_dir_all(&mod_a).unwrap();
        write(&mod_b.join("textures/rock.dds"), "from ModB");
        write(&mod_b.join("meshes/chair.nif"), "from ModB");

        // ModA provides rock.dds only through its archive.
        let archives = InMemoryArchives::new();
        let mut root = ArchiveRoot::new();
        root.root_mut()
            .add_folder("textures")
            .add_file(ArchiveEntry::new("rock.dds", 64, Some(128)));
        let archive_path = mod_a.join("ModA.bsa");
        archives.insert(&archive_path, root);

        let profile = Profile {
            data_path: data,
            plugins: vec!["ModA.esp".to_string()],
            mods: vec![
                ModEntry::new("ModA", &mod_a, 1).with_archives([&archive_path]),
                ModEntry::new("ModB", &mod_b, 2),
            ],
        };

        Self {
            _temp: temp,
            profile,
            archives,
            load_order: StaticLoadOrder::new(["ModA.esp"]),
        }
    }

    fn rebuild(&self, builder: &GraphBuilder, walker: &FsWalker) -> Arc<Generation> {
        builder.rebuild(
            &self.profile,
            RebuildSources {
                walker,
                archives: Some(&self.archives),
                load_order: Some(&self.load_order),
            },
        )
    }
}

#[test]
fn conflict_scenario_winner_and_sorted_alternatives() {
    let fixture = Fixture::new();
    let builder = GraphBuilder::new(BuilderConfig::default());
    let walker = FsWalker::new();
    let generation = fixture.rebuild(&builder, &walker);

    let rock = generation.find_file("textures/rock.dds").unwrap();
    let mod_b = generation.find_origin_by_name("ModB").unwrap();
    let mod_a = generation.find_origin_by_name("ModA").unwrap();
    let data = generation.find_origin_by_name("data").unwrap();

    // ModB's loose file wins; alternatives ascend [data, ModA].
    let primary = rock.primary().unwrap();
    assert_eq!(primary.origin, mod_b.id());
    assert!(primary.is_loose());

    let alternatives = rock.alternatives();
    assert_eq!(alternatives.len(), 2);
    assert_eq!(alternatives[0].origin, data.id());
    assert_eq!(alternatives[1].origin, mod_a.id());
    let archive = alternatives[1].archive.as_ref().unwrap();
    assert_eq!(archive.name, "ModA.bsa");
    assert_eq!(archive.load_order, Some(0));

    // The conflict report reflects the same resolution.
    let conflicts = generation.conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].relative_path, "textures/rock.dds");
}

#[test]
fn disabling_the_winner_promotes_next_origin() {
    let fixture = Fixture::new();
    let builder = GraphBuilder::new(BuilderConfig::default());
    let walker = FsWalker::new();
    let generation = fixture.rebuild(&builder, &walker);

    let mod_b = generation.find_origin_by_name("ModB").unwrap();
    generation.files().disable_origin(&mod_b, generation.tree());

    // rock.dds survives with ModA promoted; ModB's sole files are gone.
    let rock = generation.find_file("textures/rock.dds").unwrap();
    let mod_a = generation.find_origin_by_name("ModA").unwrap();
    assert_eq!(rock.primary().unwrap().origin, mod_a.id());
    assert!(generation.find_file("meshes/chair.nif").is_none());
    assert!(!mod_b.is_enabled());
    assert_eq!(mod_b.file_count(), 0);

    // Untouched files keep their providers.
    let grass = generation.find_file("textures/grass.dds").unwrap();
    assert_eq!(grass.provider_count(), 1);
}

#[test]
fn rebuild_is_deterministic_across_worker_counts() {
    let fixture = Fixture::new();
    let walker = FsWalker::new();

    let serial = GraphBuilder::new(BuilderConfig::default().with_worker_threads(1));
    let parallel = GraphBuilder::new(BuilderConfig::default().with_worker_threads(4));

    let baseline = shape(&fixture.rebuild(&serial, &walker));
    assert!(!baseline.is_empty());
    for _ in 0..5 {
        let run = shape(&fixture.rebuild(&parallel, &walker));
        assert_eq!(run, baseline);
    }
}

#[test]
fn readers_keep_old_snapshot_across_rebuilds() {
    let fixture = Fixture::new();
    let builder = GraphBuilder::new(BuilderConfig::default());
    let walker = FsWalker::new();

    let first = fixture.rebuild(&builder, &walker);
    let first_count = first.files().count();

    // A second rebuild publishes a new generation and retires the old.
    let second = fixture.rebuild(&builder, &walker);
    builder.wait_for_retirement();
    assert!(!builder.is_retiring());

    // The held snapshot is unchanged and fully navigable.
    assert_eq!(first.files().count(), first_count);
    assert!(first.find_file("textures/rock.dds").is_some());
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&second, &builder.generation()));
}

#[test]
fn consecutive_rebuilds_are_serialized() {
    let fixture = Fixture::new();
    let builder = Arc::new(GraphBuilder::new(BuilderConfig::default()));
    let walker = FsWalker::new();

    std::thread::scope(|scope| {
        for _ in 0..3 {
            scope.spawn(|| {
                fixture.rebuild(&builder, &walker);
            });
        }
    });

    builder.wait_for_retirement();
    let generation = builder.generation();
    assert_eq!(generation.files().count(), 3);
    assert_eq!(builder.progress().percent_done(), 100);
}

#[test]
fn metrics_count_loose_and_archived_files() {
    let fixture = Fixture::new();
    let builder = GraphBuilder::new(BuilderConfig::default());
    let walker = FsWalker::new();
    fixture.rebuild(&builder, &walker);

    let metrics = builder.metrics();
    // data: rock + grass, ModB: rock + chair.
    assert_eq!(metrics.loose_files, 4);
    assert_eq!(metrics.archive_files, 1);
    assert_eq!(metrics.archives_read, 1);
    assert_eq!(metrics.mods_scanned, 3);
    assert_eq!(metrics.scan_errors, 0);
}

#[test]
fn unmatched_archive_still_contributes_without_order() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    let mod_a = temp.path().join("mods/ModA");
    std::fs::create_dir_all(&mod_a).unwrap();

    let archives = InMemoryArchives::new();
    let mut root = ArchiveRoot::new();
    root.root_mut()
        .add_file(ArchiveEntry::new("orphan.dds", 1, None));
    let archive_path = mod_a.join("Unmatched.bsa");
    archives.insert(&archive_path, root);

    let profile = Profile {
        data_path: data,
        plugins: vec!["Other.esp".to_string()],
        mods: vec![ModEntry::new("ModA", &mod_a, 1).with_archives([&archive_path])],
    };

    let builder = GraphBuilder::new(BuilderConfig::default());
    let walker = FsWalker::new();
    let load_order = StaticLoadOrder::new(["Other.esp"]);
    let generation = builder.rebuild(
        &profile,
        RebuildSources {
            walker: &walker,
            archives: Some(&archives),
            load_order: Some(&load_order),
        },
    );

    let orphan = generation.find_file("orphan.dds").unwrap();
    let claim = orphan.primary().unwrap();
    assert_eq!(claim.archive.as_ref().unwrap().load_order, None);
}

#[test]
fn case_insensitive_merge_across_origins() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    let mod_a = temp.path().join("mods/ModA");
    write(&data.join("Textures/Rock.dds"), "data");
    write(&mod_a.join("textures/ROCK.DDS"), "mod");

    let profile = Profile {
        data_path: data,
        plugins: Vec::new(),
        mods: vec![ModEntry::new("ModA", &mod_a, 1)],
    };

    let builder = GraphBuilder::new(BuilderConfig::default());
    let walker = FsWalker::new();
    let generation = builder.rebuild(
        &profile,
        RebuildSources {
            walker: &walker,
            archives: None,
            load_order: None,
        },
    );

    // Both spellings merged into one record with a conflict.
    assert_eq!(generation.files().count(), 1);
    let record = generation.find_file("TEXTURES/rock.DDS").unwrap();
    assert!(record.has_conflict());
    let mod_a_id = generation.find_origin_by_name("ModA").unwrap().id();
    assert_eq!(record.primary().unwrap().origin, mod_a_id);
}
