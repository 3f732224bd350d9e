use xpath_matcher::{XPathBody, compile_uncached};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: xpath_matcher_print [--debug] <xpath>");
        std::process::exit(2);
    }
    let debug = args.iter().any(|a| a == "--debug");
    let Some(src) = args.iter().skip(1).find(|a| *a != "--debug") else {
        eprintln!("Usage: xpath_matcher_print [--debug] <xpath>");
        std::process::exit(2);
    };
    match compile_uncached(src) {
        Ok(c) if debug => println!("{c:#?}"),
        Ok(c) => {
            println!("{:?} {:?}", c.kind(), c.flags());
            match c.body() {
                XPathBody::Path(steps) => {
                    for (i, step) in steps.iter().enumerate() {
                        println!("  {i}: {step}  [{:?}]", step.strategy());
                    }
                }
                XPathBody::Boolean(expr) => println!("  {expr}"),
                XPathBody::Filter(filter) => {
                    println!("  inner: {}", filter.inner_text);
                    for p in &filter.predicates {
                        println!("  [{p}]");
                    }
                    if let Some(trailing) = &filter.trailing {
                        let sep = if filter.trailing_descendant { "//" } else { "/" };
                        println!("  then: {sep}{trailing}");
                    }
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
