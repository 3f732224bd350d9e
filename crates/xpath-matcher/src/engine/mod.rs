pub mod cursor;
pub(crate) mod evaluator;
pub mod matcher;
