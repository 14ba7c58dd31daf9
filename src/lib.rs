pub mod agreement;
pub mod analysis;
pub mod batch;
pub mod conllu;
pub mod entries;
pub mod error;
pub mod extract;
pub mod generate;
pub mod hit;
pub mod predicate;
pub mod render;
pub mod sampling;
pub mod text;
