pub mod inspect;
pub mod pair;
pub mod rules;
pub mod simulate;
