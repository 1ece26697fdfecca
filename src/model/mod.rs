pub mod encoder;
pub mod translate;
pub mod variant;
