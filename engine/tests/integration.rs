use engine::{
    expand, match_pattern, BoundaryMatcher, FieldValue, MatchResult, MatcherRegistry,
    RegexMatcher,
};
use notepat::{Compiler, InputType};
use rstest::rstest;

fn run(template: &str, input: &str) -> Option<MatchResult> {
    let pattern = notepat::compile(template).expect("compile failed");
    match_pattern(input, &pattern, &MatcherRegistry::builtin()).expect("match failed")
}

fn single(result: &MatchResult, name: &str) -> String {
    match result.value(name) {
        Some(FieldValue::Single(value)) => value.clone(),
        other => panic!("expected single value for '{}', got {:?}", name, other),
    }
}

#[test]
fn literal_template_matches_itself() {
    for template in ["hello", "Buy milk!", "a-b-c 123"] {
        let result = run(template, template).expect("no match");
        assert!(result.fields.is_empty());
        assert!(result.combination.is_some());
    }
}

#[test]
fn tag_and_note() {
    let result = run("#{tag:word} {note:text}", "#ideas Draw fan-art of Haruhi").expect("no match");
    assert_eq!(single(&result, "tag"), "ideas");
    assert_eq!(single(&result, "note"), "Draw fan-art of Haruhi");
}

#[test]
fn missing_anchor_does_not_match() {
    assert!(run("#{tag:word} {note:text}", "Write HTML parser").is_none());
}

#[test]
fn repeated_tags_accumulate_and_spill_into_note() {
    let result = run(
        "[#{tag:word} ][#{tag:word} ][#{tag:word} ]{note:text}",
        "#a #b #c #d my note",
    )
    .expect("no match");
    assert_eq!(
        result.value("tag"),
        Some(&FieldValue::List(vec!["a".into(), "b".into(), "c".into()]))
    );
    assert_eq!(single(&result, "note"), "#d my note");
}

#[test]
fn fewer_tags_than_slots() {
    let result = run(
        "[#{tag:word} ][#{tag:word} ][#{tag:word} ]{note:text}",
        "#a my note",
    )
    .expect("no match");
    assert_eq!(single(&result, "tag"), "a");
    assert_eq!(single(&result, "note"), "my note");
}

#[test]
fn typed_matchers_win_ranking() {
    let result = run("{name:word}[ {phone:phone}][ {email:email}]", "Jon +380123456789")
        .expect("no match");
    assert_eq!(single(&result, "name"), "Jon");
    assert_eq!(single(&result, "phone"), "+380123456789");
    assert!(result.field("email").is_none());

    let result = run(
        "{name:word}[ {phone:phone}][ {email:email}]",
        "Jon +380123456789 jon@example.com",
    )
    .expect("no match");
    assert_eq!(single(&result, "email"), "jon@example.com");

    let result = run("{name:word}[ {phone:phone}][ {email:email}]", "Jon jon@example.com")
        .expect("no match");
    assert!(result.field("phone").is_none());
    assert_eq!(single(&result, "email"), "jon@example.com");
}

#[test]
fn typed_capture_preferred_over_free_text() {
    let template = "remind (at {time:number}|{what:text})";
    let result = run(template, "remind at 9").expect("no match");
    assert_eq!(single(&result, "time"), "9");

    let result = run(template, "remind at noon").expect("no match");
    assert_eq!(single(&result, "what"), "at noon");
}

#[rstest]
#[case("a=1;b=2;c=3;")]
#[case("a=1;c=3;b=2;")]
#[case("b=2;a=1;c=3;")]
#[case("b=2;c=3;a=1;")]
#[case("c=3;a=1;b=2;")]
#[case("c=3;b=2;a=1;")]
fn any_order_accepts_every_permutation(#[case] input: &str) {
    let result = run("<a={a:word};|b={b:word};|c={c:word};>", input).expect("no match");
    assert_eq!(single(&result, "a"), "1");
    assert_eq!(single(&result, "b"), "2");
    assert_eq!(single(&result, "c"), "3");
}

#[rstest]
#[case("abc")]
#[case("acb")]
#[case("bac")]
#[case("bca")]
#[case("cab")]
#[case("cba")]
fn any_order_literals_accept_every_permutation(#[case] input: &str) {
    assert!(run("<a|b|c>", input).is_some());
}

#[rstest]
#[case("")]
#[case("a")]
#[case("ab")]
#[case("cb")]
#[case("abca")]
#[case("aab")]
fn any_order_rejects_partial_or_repeated(#[case] input: &str) {
    assert!(run("<a|b|c>", input).is_none());
}

#[test]
fn any_order_of_adjacent_variables_never_matches() {
    let pattern = notepat::compile("<{a}|{b}|{c}>").expect("compile failed");
    assert!(expand(&pattern).is_empty());
    assert!(run("<{a}|{b}|{c}>", "x").is_none());
}

#[test]
fn matching_is_idempotent() {
    let pattern = notepat::compile("[#{tag:word} ]{note}").expect("compile failed");
    let registry = MatcherRegistry::builtin();
    let first = match_pattern("#x some note", &pattern, &registry).expect("match failed");
    let second = match_pattern("#x some note", &pattern, &registry).expect("match failed");
    assert_eq!(first, second);
    assert!(first.is_some());
}

#[test]
fn numbers_urls_and_sub_patterns() {
    let result = run(
        "spent {amount:{n:number}[ ](usd|eur)} on {item} [see {link:url}]",
        "spent 12.5 eur on lunch see example.com/receipt",
    )
    .expect("no match");
    assert_eq!(single(&result, "amount"), "12.5 eur");
    assert_eq!(single(&result, "item"), "lunch");
    assert_eq!(single(&result, "link"), "example.com/receipt");
}

#[test]
fn custom_matcher_plugin() {
    let pattern = Compiler::new("due {when:date} {task}", 0)
        .with_custom_types(["date"])
        .compile()
        .expect("compile failed");

    let registry = MatcherRegistry::builtin().with(
        InputType::Custom("date".into()),
        RegexMatcher::new("date", r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"),
    );
    let result = match_pattern("due 2024-05-01 file taxes", &pattern, &registry)
        .expect("match failed")
        .expect("no match");
    assert_eq!(single(&result, "when"), "2024-05-01");
    assert_eq!(single(&result, "task"), "file taxes");

    assert!(match_pattern("due tomorrow file taxes", &pattern, &registry)
        .expect("match failed")
        .is_none());
}

#[test]
fn builtin_matchers_can_be_replaced() {
    fn comma_decimal(value: &str) -> bool {
        value.replace(',', ".").parse::<f64>().is_ok_and(f64::is_finite)
    }

    let pattern = notepat::compile("{n:number} kg").expect("compile failed");
    assert!(match_pattern("2,5 kg", &pattern, &MatcherRegistry::builtin())
        .expect("match failed")
        .is_none());

    let registry = MatcherRegistry::builtin().with(InputType::Number, BoundaryMatcher::new(comma_decimal));
    let result = match_pattern("2,5 kg", &pattern, &registry)
        .expect("match failed")
        .expect("no match");
    assert_eq!(single(&result, "n"), "2,5");
}

#[test]
fn unregistered_custom_type_is_a_configuration_error() {
    let pattern = Compiler::new("{when:date}", 0)
        .with_custom_types(["date"])
        .compile()
        .expect("compile failed");
    let err = match_pattern("today", &pattern, &MatcherRegistry::builtin())
        .expect_err("expected configuration error");
    assert_eq!(err.to_string(), "no matcher registered for input type 'date'");
}

#[test]
fn combination_reports_the_reading_used() {
    let input = "#work call Ann";
    let result = run("[#{tag:word} ]{note}", input).expect("no match");
    let combination = result.combination.as_ref().expect("combination");
    assert_eq!(combination.to_string(), "#{tag:word} {note}");
    assert_eq!(result.highlight(input, "[", "]"), "#[work] [call Ann]");
}
