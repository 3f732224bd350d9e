use rstest::rstest;
use xpath_matcher::{CompiledExpr, MatchStrategy, NameTest, PathFlags, compile_uncached};

fn rendered(src: &str) -> Vec<String> {
    compile_uncached(src).unwrap().steps().iter().map(ToString::to_string).collect()
}

#[rstest]
#[case("/a/b/c/../d", &["a", "b[c]", "d"])]
#[case("/a/b/c/parent::node()/d", &["a", "b[c]", "d"])]
#[case("/a/b/c/parent::b/d", &["a", "b[c]", "d"])]
#[case("/a/b/c/parent::*/d", &["a", "b[c]", "d"])]
#[case("/a/b/c/../../d", &["a[b/c]", "d"])]
#[case("/a/b/c/..[@k]/d", &["a", "b[c][@k]", "d"])]
#[case("/a/b/c[@x]/../d", &["a", "b[c[@x]]", "d"])]
fn folded(#[case] src: &str, #[case] expected: &[&str]) {
    assert_eq!(rendered(src), expected, "{src}");
}

#[rstest]
#[case("../x[2]")]
#[case("a/../b")]
#[case("/a//b/../c")]
#[case("/a/b/c/parent::x/d")]
#[case("/a/b/c/..[1]/d")]
#[case("/a/b/c//../d")]
#[case("/a/b/c/parent::text()/d")]
fn left_in_place(#[case] src: &str) {
    let c = compile_uncached(src).unwrap();
    assert!(c.steps().iter().any(|s| s.is_backtrack()), "{src}");
}

#[rstest]
fn folding_recomputes_flags_and_strategy() {
    let c = compile_uncached("/a/b/c/../d").unwrap();
    assert_eq!(c.flags(), PathFlags::ABSOLUTE);
    let b = &c.steps()[1];
    assert_eq!(b.predicates(), [CompiledExpr::Child(NameTest::name("c"))]);
    assert_eq!(b.strategy(), MatchStrategy::NameThenPredicates);
    assert!(c.steps().iter().all(|s| !s.followed_by_backtrack()));
}
