use rstest::rstest;
use xpath_matcher::{Reason, compile_uncached};

fn reason(src: &str) -> Reason {
    compile_uncached(src).expect_err("should be rejected").reason
}

#[rstest]
fn unknown_function_is_named() {
    let err = compile_uncached("foo()").unwrap_err();
    assert_eq!(err.reason, Reason::UnknownFunction("foo".into()));
    assert_eq!(err.expression, "foo()");
    assert!(err.to_string().contains("foo()"), "{err}");
}

#[rstest]
#[case("a[true()]", "true")]
#[case("a[string(.) = 'x']", "string")]
#[case("a[b[concat('x', 'y')]]", "concat")]
fn functions_outside_the_table(#[case] src: &str, #[case] name: &str) {
    assert_eq!(reason(src), Reason::UnknownFunction(name.into()));
}

#[rstest]
#[case("a[contains(.)]", "contains", 1)]
#[case("a[position(1)]", "position", 1)]
#[case("a[not()]", "not", 0)]
#[case("a[local-name(., .)]", "local-name", 2)]
fn wrong_arity(#[case] src: &str, #[case] name: &str, #[case] given: usize) {
    match reason(src) {
        Reason::WrongArity { name: n, given: g, expected } => {
            assert_eq!(n, name);
            assert_eq!(g, given);
            assert!(!expected.accepts(given));
        }
        other => panic!("unexpected reason {other:?}"),
    }
}

#[rstest]
fn arity_message_names_function() {
    let err = compile_uncached("a[count()]").unwrap_err();
    assert_eq!(
        err.to_string(),
        "unsupported XPath expression `a[count()]`: function `count()` called with 0 argument(s), expected 1"
    );
}

#[rstest]
#[case("a[]")]
#[case("/a/b[]/c")]
#[case("(//a)[]")]
fn empty_predicate(#[case] src: &str) {
    assert_eq!(reason(src), Reason::EmptyPredicate);
}

#[rstest]
#[case("")]
#[case("   ")]
fn empty_expression(#[case] src: &str) {
    assert_eq!(reason(src), Reason::Empty);
}

#[rstest]
#[case("a[1.5]", "1.5")]
#[case("a[99999999999999999999]", "99999999999999999999")]
fn malformed_number(#[case] src: &str, #[case] text: &str) {
    assert_eq!(reason(src), Reason::MalformedNumber(text.into()));
}

#[rstest]
#[case("a | b")]
#[case("a[b | c]")]
#[case("a[-b]")]
#[case("/")]
fn unsupported_constructs(#[case] src: &str) {
    assert!(matches!(reason(src), Reason::Construct(_)), "{src}");
}

#[rstest]
#[case("a[")]
#[case("/a/")]
#[case("a[@]")]
#[case("a = ")]
fn syntax_errors(#[case] src: &str) {
    assert!(matches!(reason(src), Reason::Syntax(_)), "{src}");
}

#[rstest]
fn errors_inside_filter_parts_are_reported() {
    assert_eq!(reason("(//a)[foo()]"), Reason::UnknownFunction("foo".into()));
    assert_eq!(reason("(//a)[1]/b[bar()]"), Reason::UnknownFunction("bar".into()));
}

#[rstest]
fn negative_numeral_is_accepted() {
    assert!(compile_uncached("a[-1]").is_ok());
}
