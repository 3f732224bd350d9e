use rstest::{fixture, rstest};
use std::sync::Arc;
use xpath_matcher::{Cursor, NodeKind, XPathMatcher, XmlNode, compile, matches};

// Arena-backed tree: the matcher only needs the trait plus a cursor, no parent links.
#[derive(Debug)]
struct Dom {
    nodes: Vec<NodeRec>,
}

#[derive(Debug)]
struct NodeRec {
    kind: NodeKind,
    name: Option<String>,
    value: String,
    children: Vec<usize>,
    attrs: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Node {
    dom: Arc<Dom>,
    idx: usize,
}

impl PartialEq for Node {
    fn eq(&self, o: &Self) -> bool {
        Arc::ptr_eq(&self.dom, &o.dom) && self.idx == o.idx
    }
}
impl Eq for Node {}

impl Node {
    fn rec(&self) -> &NodeRec {
        &self.dom.nodes[self.idx]
    }
    fn at(&self, idx: usize) -> Node {
        Node { dom: self.dom.clone(), idx }
    }
}

impl XmlNode for Node {
    fn kind(&self) -> NodeKind {
        self.rec().kind
    }
    fn name(&self) -> Option<&str> {
        self.rec().name.as_deref()
    }
    fn string_value(&self) -> String {
        match self.kind() {
            NodeKind::Element | NodeKind::Document => self.children().iter().map(XmlNode::string_value).collect(),
            _ => self.rec().value.clone(),
        }
    }
    fn children(&self) -> Vec<Self> {
        self.rec().children.iter().map(|&i| self.at(i)).collect()
    }
    fn attributes(&self) -> Vec<Self> {
        self.rec().attrs.iter().map(|&i| self.at(i)).collect()
    }
}

struct Built {
    list: Node,
    entries: Vec<Node>,
    flag: Node,
}

/// `<list><entry>a</entry><entry flag="on">b</entry><entry>c</entry></list>`
#[fixture]
fn built() -> Built {
    let rec = |kind, name: Option<&str>, value: &str, children: Vec<usize>, attrs: Vec<usize>| NodeRec {
        kind,
        name: name.map(str::to_owned),
        value: value.to_owned(),
        children,
        attrs,
    };
    let nodes = vec![
        rec(NodeKind::Element, Some("list"), "", vec![1, 3, 6], vec![]),
        rec(NodeKind::Element, Some("entry"), "", vec![2], vec![]),
        rec(NodeKind::Text, None, "a", vec![], vec![]),
        rec(NodeKind::Element, Some("entry"), "", vec![4], vec![5]),
        rec(NodeKind::Text, None, "b", vec![], vec![]),
        rec(NodeKind::Attribute, Some("flag"), "on", vec![], vec![]),
        rec(NodeKind::Element, Some("entry"), "", vec![7], vec![]),
        rec(NodeKind::Text, None, "c", vec![], vec![]),
    ];
    let list = Node { dom: Arc::new(Dom { nodes }), idx: 0 };
    let entries = vec![list.at(1), list.at(3), list.at(6)];
    let flag = list.at(5);
    Built { list, entries, flag }
}

fn cursors(b: &Built) -> Vec<Cursor<Node>> {
    b.entries.iter().map(|e| Cursor::root(b.list.clone()).child(e.clone())).collect()
}

#[rstest]
#[case("/list/entry", [true, true, true])]
#[case("/list/entry[2]", [false, true, false])]
#[case("entry[@flag = 'on']", [false, true, false])]
#[case("//entry[. = 'c']", [false, false, true])]
#[case("(//entry)[last()]", [false, false, true])]
#[case("count(../entry) = 3 and not(@flag)", [true, false, true])]
fn arena_nodes_match(built: Built, #[case] expr: &str, #[case] expected: [bool; 3]) {
    let compiled = compile(expr).unwrap();
    let got: Vec<bool> = cursors(&built).iter().map(|c| matches(&compiled, c)).collect();
    assert_eq!(got, expected, "{expr}");
}

#[rstest]
fn cursor_can_be_walked_incrementally(built: Built) {
    let m = XPathMatcher::new("/list/entry/@flag");
    let mut cursor = Cursor::root(built.list.clone());
    cursor.push(built.entries[1].clone());
    cursor.push(built.flag.clone());
    assert!(m.matches(&cursor));
    assert_eq!(cursor.depth(), 3);
    cursor.pop();
    assert!(!m.matches(&cursor));
    assert_eq!(cursor.current(), Some(&built.entries[1]));
}
