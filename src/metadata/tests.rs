use super::plugin::expand_pattern_entries;
use super::*;
use crate::env::testing::MockEnv;
use crate::prelude::*;

fn session(env: &MockEnv) -> EvalSession<'_> {
    EvalSession::new(env, Language::English)
}

fn condition(text: &str) -> Condition {
    Condition::parse(text).unwrap()
}

#[test]
fn pattern_names_are_detected_by_trigger_characters() {
    assert!(is_name_pattern(r"Hotfix \d\.esp"));
    assert!(is_name_pattern("DLC?.esm"));
    assert!(is_name_pattern("A|B.esp"));
    assert!(!is_name_pattern("Plain Name (v2).esp"));
    assert!(!is_name_pattern("Dots.and.dashes-2.esp"));
}

#[test]
fn ghost_extensions_are_trimmed() {
    assert_eq!(trim_ghost("Foo.esp.ghost"), "Foo.esp");
    assert_eq!(trim_ghost("Foo.esp.GHOST"), "Foo.esp");
    assert_eq!(trim_ghost("Foo.esp"), "Foo.esp");
    assert_eq!(trim_ghost("ghost"), "ghost");
}

#[test]
fn files_compare_by_name_alone() {
    let plain = File::new("Foo.esp");
    let decorated = File::new("FOO.ESP")
        .with_display("Foo, the mod")
        .with_condition(condition("true"));

    assert_eq!(plain, decorated);

    let mut set = IndexSet::new();
    set.insert(plain);
    set.insert(decorated);
    assert_eq!(set.len(), 1);
}

#[test]
fn tags_distinguish_additions_from_removals() {
    assert_eq!(Tag::from_spec("Relev"), Tag::new("Relev", true));
    assert_eq!(Tag::from_spec("-Relev"), Tag::new("Relev", false));
    assert_ne!(Tag::new("Relev", true), Tag::new("Relev", false));

    let mut tags = vec![
        Tag::new("Delev", false),
        Tag::new("Relev", true),
        Tag::new("Names", true),
    ];
    tags.sort();
    let specs: Vec<_> = tags
        .iter()
        .map(|t| (t.name(), t.is_addition()))
        .collect();
    assert_eq!(
        specs,
        vec![("Names", true), ("Relev", true), ("Delev", false)]
    );
}

#[test]
fn multilingual_messages_require_english_content() {
    let monolingual = Message::with_content(
        MessageType::Say,
        vec![MessageContent::new("Привет", Language::Russian)],
    );
    assert!(monolingual.validate().is_ok());

    let no_english = Message::with_content(
        MessageType::Say,
        vec![
            MessageContent::new("Привет", Language::Russian),
            MessageContent::new("Hallo", Language::German),
        ],
    );
    assert!(matches!(
        no_english.validate(),
        Err(MetadataError::MissingEnglishContent)
    ));
}

#[test]
fn language_selection_prefers_exact_then_english_then_first() {
    let content = vec![
        MessageContent::new("Bonjour", Language::French),
        MessageContent::new("Hello", Language::English),
        MessageContent::new("Hallo", Language::German),
    ];

    let mut message = Message::with_content(MessageType::Say, content.clone());
    message.select_language(Language::German);
    assert_eq!(message.content()[0].text(), "Hallo");

    let mut message = Message::with_content(MessageType::Say, content.clone());
    message.select_language(Language::Russian);
    assert_eq!(message.content()[0].text(), "Hello");

    let mut message = Message::with_content(
        MessageType::Say,
        vec![
            MessageContent::new("Bonjour", Language::French),
            MessageContent::new("Hallo", Language::German),
        ],
    );
    message.select_language(Language::Russian);
    assert_eq!(message.content()[0].text(), "Bonjour");

    // Selecting again must not change the choice.
    message.select_language(Language::German);
    assert_eq!(message.content()[0].text(), "Bonjour");
}

#[test]
fn priorities_decode_sign_preserving() {
    let priority = Priority::from_raw(-1_000_005);
    assert_eq!(priority.value(), -5);
    assert!(priority.is_global());
    assert!(priority.is_explicit());
    assert_eq!(priority.raw(), -1_000_005);

    let priority = Priority::from_raw(3);
    assert_eq!(priority.value(), 3);
    assert!(!priority.is_global());
    assert_eq!(priority.raw(), 3);

    let priority = Priority::from_raw(0);
    assert!(!priority.is_explicit());
}

#[test]
fn explicit_priorities_reject_out_of_range_values() {
    assert!(Priority::new(999_999, true).is_ok());
    assert!(matches!(
        Priority::new(1_000_000, false),
        Err(MetadataError::PriorityOutOfRange(_))
    ));

    // An explicit zero still counts as set.
    assert!(Priority::new(0, false).unwrap().is_explicit());
    assert!(!Priority::default().is_explicit());
}

#[test]
fn dirty_info_requires_a_crc_match_before_its_condition() {
    let env = MockEnv::new();
    let mut session = session(&env);

    let info = DirtyInfo::new(0xDEADBEEF, 4, 0, 1, "TES5Edit").with_condition(condition("true"));

    assert!(info.eval(Some(0xDEADBEEF), &mut session).unwrap());
    assert!(!info.eval(Some(0x12345678), &mut session).unwrap());
    assert!(!info.eval(None, &mut session).unwrap());

    let gated = DirtyInfo::new(0xDEADBEEF, 4, 0, 1, "TES5Edit").with_condition(condition("false"));
    assert!(!gated.eval(Some(0xDEADBEEF), &mut session).unwrap());
}

#[test]
fn merging_unions_sets_and_concatenates_messages() {
    let mut base = PluginMetadata::new("Foo.esp");
    base.set_load_after(IndexSet::from([File::new("A.esp")]));
    base.add_message(Message::new(MessageType::Say, "From the masterlist."));

    let mut other = PluginMetadata::new("Foo.esp");
    other.set_load_after(IndexSet::from([File::new("a.esp"), File::new("B.esp")]));
    other.set_tags(IndexSet::from([Tag::new("Relev", true)]));
    other.add_message(Message::new(MessageType::Warn, "From the userlist."));
    other.set_priority(Priority::new(10, false).unwrap());

    base.merge_metadata(&other);

    assert_eq!(base.load_after().len(), 2);
    assert_eq!(base.tags().len(), 1);
    assert_eq!(base.messages().len(), 2);
    assert_eq!(base.priority().value(), 10);
}

#[test]
fn merging_metadata_with_itself_only_doubles_messages() {
    let mut meta = PluginMetadata::new("Foo.esp");
    meta.set_load_after(IndexSet::from([File::new("A.esp")]));
    meta.set_tags(IndexSet::from([Tag::new("Relev", true)]));
    meta.set_locations(IndexSet::from([Location::new("https://example.com/foo")]));
    meta.set_dirty_info(IndexSet::from([DirtyInfo::new(1, 0, 0, 0, "TES5Edit")]));
    meta.add_message(Message::new(MessageType::Say, "Twice after a self-merge."));

    let copy = meta.clone();
    meta.merge_metadata(&copy);

    // Sets union with themselves; the message list concatenates.
    assert_eq!(meta.load_after().len(), 1);
    assert_eq!(meta.tags().len(), 1);
    assert_eq!(meta.locations().len(), 1);
    assert_eq!(meta.dirty_info().len(), 1);
    assert_eq!(meta.messages().len(), 2);
}

#[test]
fn merging_a_name_only_entry_changes_nothing() {
    let mut base = PluginMetadata::new("Foo.esp");
    base.set_enabled(false);
    base.set_priority(Priority::new(5, false).unwrap());

    base.merge_metadata(&PluginMetadata::new("Foo.esp"));

    assert!(!base.is_enabled());
    assert_eq!(base.priority().value(), 5);
}

#[test]
fn merging_keeps_priority_unless_explicitly_overridden() {
    let mut base = PluginMetadata::new("Foo.esp");
    base.set_priority(Priority::new(5, false).unwrap());

    let mut implicit = PluginMetadata::new("Foo.esp");
    implicit.set_tags(IndexSet::from([Tag::new("Relev", true)]));
    base.merge_metadata(&implicit);
    assert_eq!(base.priority().value(), 5);

    let mut explicit = PluginMetadata::new("Foo.esp");
    explicit.set_priority(Priority::new(0, false).unwrap());
    base.merge_metadata(&explicit);
    assert_eq!(base.priority().value(), 0);
}

#[test]
fn diffing_keeps_only_non_shared_metadata() {
    let shared = File::new("Shared.esp");

    let mut a = PluginMetadata::new("Foo.esp");
    a.set_load_after(IndexSet::from([shared.clone(), File::new("OnlyA.esp")]));
    a.set_priority(Priority::new(5, true).unwrap());
    a.add_message(Message::new(MessageType::Say, "Shared note."));
    a.add_message(Message::new(MessageType::Say, "A only."));

    let mut b = PluginMetadata::new("Foo.esp");
    b.set_load_after(IndexSet::from([shared, File::new("OnlyB.esp")]));
    b.set_priority(Priority::new(5, true).unwrap());
    b.add_message(Message::new(MessageType::Say, "Shared note."));

    let diff = a.diff_metadata(&b);

    let names: Vec<_> = diff.load_after().iter().map(File::name).collect();
    assert_eq!(names, vec!["OnlyA.esp", "OnlyB.esp"]);

    // Equal priorities cancel out.
    assert!(!diff.priority().is_explicit());
    assert_eq!(diff.messages().len(), 1);
    assert_eq!(diff.messages()[0].content()[0].text(), "A only.");
}

#[test]
fn diffing_keeps_this_sides_enabled_flag() {
    let mut a = PluginMetadata::new("Foo.esp");
    a.set_enabled(false);
    let b = PluginMetadata::new("Foo.esp");

    assert!(!a.diff_metadata(&b).is_enabled());
    assert!(b.diff_metadata(&a).is_enabled());
}

#[test]
fn diffing_differing_priorities_keeps_the_other_side() {
    let mut a = PluginMetadata::new("Foo.esp");
    a.set_priority(Priority::new(5, false).unwrap());
    let mut b = PluginMetadata::new("Foo.esp");
    b.set_priority(Priority::new(5, true).unwrap());

    let diff = a.diff_metadata(&b);
    assert_eq!(diff.priority().value(), 5);
    assert!(diff.priority().is_global());
}

#[test]
fn new_metadata_is_an_asymmetric_difference() {
    let mut a = PluginMetadata::new("Foo.esp");
    a.set_tags(IndexSet::from([
        Tag::new("Relev", true),
        Tag::new("Delev", true),
    ]));

    let mut b = PluginMetadata::new("Foo.esp");
    b.set_tags(IndexSet::from([
        Tag::new("Relev", true),
        Tag::new("Names", true),
    ]));

    let new = a.new_metadata(&b);
    let names: Vec<_> = new.tags().iter().map(Tag::name).collect();
    assert_eq!(names, vec!["Delev"]);
}

#[test]
fn name_matching_handles_patterns_on_either_side() {
    let literal = PluginMetadata::new("Foo.esp");
    assert!(literal.name_matches("FOO.ESP").unwrap());
    assert!(literal.name_matches("Foo.esp.ghost").unwrap());
    assert!(!literal.name_matches("Bar.esp").unwrap());

    let pattern = PluginMetadata::new(r"Hotfix \d\.esp");
    assert!(pattern.is_regex_entry());
    assert!(pattern.name_matches("Hotfix 3.esp").unwrap());
    assert!(pattern.name_matches("HOTFIX 7.ESP").unwrap());
    assert!(!pattern.name_matches("Hotfix 30.esp").unwrap());

    let broken = PluginMetadata::new(r"Unclosed[\d.esp");
    assert!(matches!(
        broken.name_matches("Anything.esp"),
        Err(MetadataError::InvalidNamePattern { .. })
    ));
}

#[test]
fn condition_evaluation_filters_gated_entries() {
    let env = MockEnv::new().with_file("present.esp", 0xAAAA);
    let mut session = session(&env);

    let mut meta = PluginMetadata::new("Foo.esp");
    meta.set_load_after(IndexSet::from([
        File::new("Kept.esp").with_condition(condition("file(\"present.esp\")")),
        File::new("Dropped.esp").with_condition(condition("file(\"missing.esp\")")),
        File::new("Unconditional.esp"),
    ]));
    meta.set_messages(vec![
        Message::new(MessageType::Say, "Keep me."),
        Message::new(MessageType::Warn, "Drop me.").with_condition(condition("false")),
    ]);

    meta.eval_all_conditions(&mut session).unwrap();

    let names: Vec<_> = meta.load_after().iter().map(File::name).collect();
    assert_eq!(names, vec!["Kept.esp", "Unconditional.esp"]);
    assert_eq!(meta.messages().len(), 1);
    assert_eq!(meta.messages()[0].kind(), MessageType::Say);
}

#[test]
fn condition_evaluation_gates_dirty_info_by_crc() {
    let env = MockEnv::new().with_file("foo.esp", 0xDEADBEEF);
    let mut session = session(&env);

    let mut meta = PluginMetadata::new("Foo.esp");
    meta.set_dirty_info(IndexSet::from([
        DirtyInfo::new(0xDEADBEEF, 1, 0, 0, "TES5Edit"),
        DirtyInfo::new(0x11111111, 9, 9, 9, "TES5Edit"),
    ]));

    meta.eval_all_conditions(&mut session).unwrap();

    assert_eq!(meta.dirty_info().len(), 1);
    assert_eq!(meta.dirty_info().first().unwrap().crc(), 0xDEADBEEF);

    // An uninstalled plugin matches no dirty info at all.
    let mut meta = PluginMetadata::new("Gone.esp");
    meta.set_dirty_info(IndexSet::from([DirtyInfo::new(0xDEADBEEF, 1, 0, 0, "TES5Edit")]));
    meta.eval_all_conditions(&mut session).unwrap();
    assert!(meta.dirty_info().is_empty());
}

#[test]
fn pattern_entries_expand_per_matching_plugin() {
    let mut entry = PluginMetadata::new(r"Hotfix \d\.esp");
    entry.set_tags(IndexSet::from([Tag::new("Relev", true)]));

    let installed = vec![
        String::from("Hotfix 1.esp"),
        String::from("Hotfix 2.esp.ghost"),
        String::from("Unrelated.esp"),
    ];

    let expanded = expand_pattern_entries(&[entry], &installed).unwrap();

    let names: Vec<_> = expanded.iter().map(PluginMetadata::name).collect();
    assert_eq!(names, vec!["Hotfix 1.esp", "Hotfix 2.esp"]);
    assert!(expanded.iter().all(|e| !e.is_regex_entry()));
    assert!(expanded.iter().all(|e| e.tags().len() == 1));
}

#[test]
fn evaluate_all_merges_masterlist_then_userlist() {
    let env = MockEnv::new().with_file("foo.esp", 0xAAAA);
    let mut session = session(&env);

    let mut master_entry = PluginMetadata::new("Foo.esp");
    master_entry.set_load_after(IndexSet::from([File::new("Base.esp")]));
    master_entry.set_priority(Priority::new(3, false).unwrap());

    let mut user_entry = PluginMetadata::new("foo.esp");
    user_entry.set_load_after(IndexSet::from([File::new("UserPick.esp")]));
    user_entry.set_priority(Priority::new(7, true).unwrap());

    let mut db = MetadataDb::new();
    db.set_masterlist(vec![master_entry]);
    db.set_userlist(vec![user_entry]);

    let installed = vec![String::from("Foo.esp"), String::from("Bar.esp")];
    let evaluated = db.evaluate_all(&installed, &mut session).unwrap();

    let foo = &evaluated["foo.esp"];
    assert_eq!(foo.load_after().len(), 2);
    assert_eq!(foo.priority().value(), 7);
    assert!(foo.priority().is_global());

    // Plugins without metadata still get an empty entry.
    assert!(evaluated["bar.esp"].has_name_only());
}

#[test]
fn evaluated_for_applies_pattern_entries() {
    let env = MockEnv::new();
    let mut session = session(&env);

    let mut pattern = PluginMetadata::new(r"Hotfix \d\.esp");
    pattern.set_tags(IndexSet::from([Tag::new("Relev", true)]));

    let mut db = MetadataDb::new();
    db.set_masterlist(vec![pattern]);

    let merged = db.evaluated_for("Hotfix 3.esp", &mut session).unwrap();
    assert_eq!(merged.name(), "Hotfix 3.esp");
    assert_eq!(merged.tags().len(), 1);

    let unrelated = db.evaluated_for("Other.esp", &mut session).unwrap();
    assert!(unrelated.has_name_only());
}
