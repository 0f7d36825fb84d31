pub mod fields;
pub mod term_index;
