pub mod github;
pub mod roast;
