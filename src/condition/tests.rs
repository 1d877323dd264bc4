use super::*;
use crate::env::testing::MockEnv;
use crate::metadata::Language;
use crate::prelude::*;

fn session(env: &MockEnv) -> EvalSession<'_> {
    EvalSession::new(env, Language::English)
}

#[test]
fn literals_and_operators_parse() {
    let condition = Condition::parse("true").unwrap();
    assert_eq!(condition.expr, Expr::Literal(true));

    let condition = Condition::parse("not false and ( true or false )").unwrap();
    assert_eq!(
        condition.expr,
        Expr::And(
            Box::new(Expr::Not(Box::new(Expr::Literal(false)))),
            Box::new(Expr::Or(
                Box::new(Expr::Literal(true)),
                Box::new(Expr::Literal(false)),
            )),
        )
    );
}

#[test]
fn predicates_parse() {
    let condition = Condition::parse("file(\"Foo.esp\")").unwrap();
    assert_eq!(condition.expr, Expr::FileExists("Foo.esp".into()));

    let condition = Condition::parse("active(\"Foo.esp\")").unwrap();
    assert_eq!(condition.expr, Expr::Active("Foo.esp".into()));

    let condition = Condition::parse("checksum(\"Foo.esp\", DEADBEEF)").unwrap();
    assert_eq!(
        condition.expr,
        Expr::ChecksumMatches("Foo.esp".into(), 0xDEADBEEF)
    );

    let condition = Condition::parse("version(\"Foo.esp\", \"1.2\", >=)").unwrap();
    assert_eq!(
        condition.expr,
        Expr::VersionCheck("Foo.esp".into(), "1.2".into(), Comparator::Ge)
    );
}

#[test]
fn keywords_are_case_insensitive() {
    let upper = Condition::parse("NOT FILE(\"a.esp\") AND True").unwrap();
    let lower = Condition::parse("not file(\"a.esp\") and true").unwrap();
    assert_eq!(upper.expr, lower.expr);
}

#[test]
fn malformed_conditions_fail_to_parse() {
    let cases = [
        "",
        "file(\"unterminated.esp)",
        "file(missing_quotes.esp)",
        "frobnicate(\"a.esp\")",
        "file(\"a.esp\") and",
        "checksum(\"a.esp\", NOTHEX)",
        "version(\"a.esp\", \"1.0\", ~)",
        "true true",
        "(true",
    ];

    for text in cases {
        let error = Condition::parse(text).unwrap_err();
        assert!(
            matches!(error, ConditionError::Parse { .. }),
            "expected parse failure for {text:?}"
        );
    }
}

#[test]
fn deserializing_goes_through_the_parser() {
    assert!(Condition::try_from(String::from("file(\"a.esp\")")).is_ok());
    assert!(Condition::try_from(String::from("file(")).is_err());
}

#[test]
fn conditions_compare_case_insensitively() {
    let a = Condition::parse("file(\"Foo.esp\")").unwrap();
    let b = Condition::parse("FILE(\"FOO.ESP\")").unwrap();
    assert_eq!(a, b);
}

#[test]
fn file_predicate_checks_existence() {
    let env = MockEnv::new().with_file("present.esp", 1);
    let mut session = session(&env);

    let present = Condition::parse("file(\"present.esp\")").unwrap();
    let missing = Condition::parse("file(\"missing.esp\")").unwrap();

    assert!(present.eval(&mut session).unwrap());
    assert!(!missing.eval(&mut session).unwrap());
}

#[test]
fn file_predicate_accepts_patterns() {
    let env = MockEnv::new().with_file("hotfix 3.esp", 1);
    let mut session = session(&env);

    let condition = Condition::parse(r#"file("hotfix \d\.esp")"#).unwrap();
    assert!(condition.eval(&mut session).unwrap());

    let condition = Condition::parse(r#"file("patch \d\.esp")"#).unwrap();
    assert!(!condition.eval(&mut session).unwrap());
}

#[test]
fn invalid_patterns_are_reported() {
    let env = MockEnv::new();
    let mut session = session(&env);

    let condition = Condition::parse(r#"file("broken[.esp\")"#).unwrap();
    let error = condition.eval(&mut session).unwrap_err();
    assert!(matches!(error, ConditionError::InvalidRegex { .. }));
}

#[test]
fn active_predicate_checks_the_load_order() {
    let env = MockEnv::new()
        .with_file("on.esp", 1)
        .with_file("off.esp", 2)
        .with_active("on.esp");
    let mut session = session(&env);

    assert!(Condition::parse("active(\"on.esp\")")
        .unwrap()
        .eval(&mut session)
        .unwrap());
    assert!(!Condition::parse("active(\"off.esp\")")
        .unwrap()
        .eval(&mut session)
        .unwrap());
}

#[test]
fn checksum_predicate_requires_an_exact_crc() {
    let env = MockEnv::new().with_file("foo.esp", 0xDEADBEEF);
    let mut session = session(&env);

    assert!(Condition::parse("checksum(\"foo.esp\", DEADBEEF)")
        .unwrap()
        .eval(&mut session)
        .unwrap());
    assert!(!Condition::parse("checksum(\"foo.esp\", 0000BEEF)")
        .unwrap()
        .eval(&mut session)
        .unwrap());
    assert!(!Condition::parse("checksum(\"gone.esp\", DEADBEEF)")
        .unwrap()
        .eval(&mut session)
        .unwrap());
}

#[test]
fn version_predicate_compares_versions() {
    let env = MockEnv::new()
        .with_file("foo.esp", 1)
        .with_version("foo.esp", "1.10.0");
    let mut session = session(&env);

    let checks = [
        ("version(\"foo.esp\", \"1.9\", >)", true),
        ("version(\"foo.esp\", \"1.10.0\", ==)", true),
        ("version(\"foo.esp\", \"1.10.0\", <)", false),
        ("version(\"foo.esp\", \"2.0\", >=)", false),
    ];

    for (text, expected) in checks {
        let actual = Condition::parse(text).unwrap().eval(&mut session).unwrap();
        assert_eq!(actual, expected, "for condition {text:?}");
    }
}

#[test]
fn version_of_a_missing_file_only_satisfies_not_equal() {
    let env = MockEnv::new();
    let mut session = session(&env);

    assert!(Condition::parse("version(\"gone.esp\", \"1.0\", !=)")
        .unwrap()
        .eval(&mut session)
        .unwrap());
    assert!(!Condition::parse("version(\"gone.esp\", \"1.0\", ==)")
        .unwrap()
        .eval(&mut session)
        .unwrap());
    assert!(!Condition::parse("version(\"gone.esp\", \"1.0\", <)")
        .unwrap()
        .eval(&mut session)
        .unwrap());
}

#[test]
fn versionless_files_count_as_version_zero() {
    let env = MockEnv::new().with_file("foo.esp", 1);
    let mut session = session(&env);

    assert!(Condition::parse("version(\"foo.esp\", \"1.0\", <)")
        .unwrap()
        .eval(&mut session)
        .unwrap());
}

#[test]
fn results_are_cached_for_the_length_of_a_pass() {
    let env = MockEnv::new().with_file("foo.esp", 1);
    let mut session = session(&env);

    let condition = Condition::parse("file(\"foo.esp\")").unwrap();

    assert!(condition.eval(&mut session).unwrap());
    assert_eq!(env.probe_count(), 1);

    // Case differences hit the same cache entry.
    let same = Condition::parse("FILE(\"FOO.ESP\")").unwrap();
    assert!(condition.eval(&mut session).unwrap());
    assert!(same.eval(&mut session).unwrap());
    assert_eq!(env.probe_count(), 1);

    // A new pass probes again.
    session.clear();
    assert!(condition.eval(&mut session).unwrap());
    assert_eq!(env.probe_count(), 2);
}
