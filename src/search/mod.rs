pub mod cache;
pub mod evaluator;
pub mod nearest;
pub mod sorter;
