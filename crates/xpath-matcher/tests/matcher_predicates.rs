use rstest::{fixture, rstest};
use xpath_matcher::model::simple::{SimpleNode, attr, comment, doc, elem, text};
use xpath_matcher::{XmlNode, compile, matches};

/// ```xml
/// <root xmlns="urn:default" xmlns:svg="urn:svg" lang="en">
///   <item id="1">Hello</item>
///   <item id="2">World</item>
///   <svg:rect svg:w="10" xml:lang="de"/>
///   <!-- between -->
///   <item id="3"/>
/// </root>
/// ```
#[fixture]
fn tree() -> SimpleNode {
    doc()
        .child(
            elem("root")
                .attrs([attr("xmlns", "urn:default"), attr("xmlns:svg", "urn:svg"), attr("lang", "en")])
                .child(elem("item").attr(attr("id", "1")).child(text("Hello")))
                .child(elem("item").attr(attr("id", "2")).child(text("World")))
                .child(elem("svg:rect").attr(attr("svg:w", "10")).attr(attr("xml:lang", "de")))
                .child(comment("between"))
                .child(elem("item").attr(attr("id", "3"))),
        )
        .build()
}

fn items(tree: &SimpleNode, expr: &str) -> Vec<bool> {
    let compiled = compile(expr).unwrap();
    tree.find_all("item").iter().map(|n| matches(&compiled, &n.cursor())).collect()
}

#[rstest]
#[case("//item[@id = '2']", [false, true, false])]
#[case("//item[@id = 2]", [false, true, false])]
#[case("//item[@id > 1]", [false, true, true])]
#[case("//item[@id != '1']", [false, true, true])]
#[case("//item[@id = '1' or @id = '3']", [true, false, true])]
#[case("//item[@id and . = 'World']", [false, true, false])]
#[case("//item[. = 'Hello']", [true, false, false])]
#[case("//item[count(@*) = 1]", [true, true, true])]
#[case("//item[../@lang = 'en']", [true, true, true])]
#[case("//item[/root/@lang = 'en']", [true, true, true])]
#[case("//item[/root/@lang = 'fr']", [false, false, false])]
#[case("//item[count(../item) = 3]", [true, true, true])]
#[case("//item[@id = /root/item[2]/@id]", [false, true, false])]
fn comparisons(tree: SimpleNode, #[case] expr: &str, #[case] expected: [bool; 3]) {
    assert_eq!(items(&tree, expr), expected, "{expr}");
}

#[rstest]
#[case("//item[1]", [true, false, false])]
#[case("//item[3]", [false, false, true])]
#[case("//item[last()]", [false, false, true])]
#[case("//item[position() = 2]", [false, true, false])]
#[case("//item[position() < last()]", [true, true, false])]
#[case("//item[2][@id = '2']", [false, true, false])]
#[case("//item[@id = '3'][3]", [false, false, true])]
#[case("//item[-1]", [false, false, false])]
#[case("//item[4]", [false, false, false])]
fn positions_count_only_matching_siblings(tree: SimpleNode, #[case] expr: &str, #[case] expected: [bool; 3]) {
    assert_eq!(items(&tree, expr), expected, "{expr}");
}

#[rstest]
#[case("//item[contains(., 'ell')]", [true, false, false])]
#[case("//item[starts-with(., 'W')]", [false, true, false])]
#[case("//item[ends-with(., 'lo')]", [true, false, false])]
#[case("//item[string-length() = 5]", [true, true, false])]
#[case("//item[string-length(@id) = 1]", [true, true, true])]
#[case("//item[substring-before(., 'llo') = 'He']", [true, false, false])]
#[case("//item[substring-after(., 'Wo') = 'rld']", [false, true, false])]
#[case("//item[text()]", [true, true, false])]
#[case("//item[not(text())]", [false, false, true])]
#[case("//item[local-name() = 'item']", [true, true, true])]
#[case("//item[namespace-uri() = 'urn:default']", [true, true, true])]
fn string_and_node_functions(tree: SimpleNode, #[case] expr: &str, #[case] expected: [bool; 3]) {
    assert_eq!(items(&tree, expr), expected, "{expr}");
}

#[rstest]
fn prefixed_names(tree: SimpleNode) {
    let rect = tree.find("svg:rect").unwrap();
    let root = tree.find("root").unwrap();
    assert!(matches(&compile("//*[local-name() = 'rect']").unwrap(), &rect.cursor()));
    assert!(matches(&compile("//*[namespace-uri() = 'urn:svg']").unwrap(), &rect.cursor()));
    assert!(!matches(&compile("//*[namespace-uri() = 'urn:svg']").unwrap(), &root.cursor()));
    assert!(matches(&compile("/root/svg:rect").unwrap(), &rect.cursor()));
    assert!(!matches(&compile("/root/rect").unwrap(), &rect.cursor()));

    let attrs = rect.attributes();
    let svg_ns = compile("//svg:rect/@*[namespace-uri() = 'urn:svg']").unwrap();
    assert!(matches(&svg_ns, &attrs[0].cursor()));
    assert!(!matches(&svg_ns, &attrs[1].cursor()));
    let xml_ns = compile("//@xml:lang[namespace-uri() = 'http://www.w3.org/XML/1998/namespace']").unwrap();
    assert!(matches(&xml_ns, &attrs[1].cursor()));

    let id = tree.find("item").unwrap().attributes()[0].clone();
    assert!(matches(&compile("//item/@*[namespace-uri() = '']").unwrap(), &id.cursor()));
}

#[rstest]
fn node_type_step_with_predicate(tree: SimpleNode) {
    let texts: Vec<SimpleNode> = tree.find_all("item").iter().flat_map(XmlNode::children).collect();
    let compiled = compile("//item/text()[contains(., 'or')]").unwrap();
    let hits: Vec<bool> = texts.iter().map(|t| matches(&compiled, &t.cursor())).collect();
    assert_eq!(hits, [false, true]);
}

#[rstest]
#[case(". = 'Hello'", [true, false, false])]
#[case("@id = '2'", [false, true, false])]
#[case("count(//item) = 3", [true, true, true])]
#[case("count(../item) > 3", [false, false, false])]
#[case("local-name() = 'item' and not(text())", [false, false, true])]
fn boolean_expressions_use_current_node(tree: SimpleNode, #[case] expr: &str, #[case] expected: [bool; 3]) {
    assert_eq!(items(&tree, expr), expected, "{expr}");
}

#[rstest]
fn boolean_expression_on_root(tree: SimpleNode) {
    let root = tree.find("root").unwrap();
    assert!(matches(&compile("count(item) > 2").unwrap(), &root.cursor()));
    assert!(!matches(&compile("count(item) > 3").unwrap(), &root.cursor()));
    assert!(matches(&compile("@lang = 'en' or @missing").unwrap(), &root.cursor()));
}
