/// Seeded random-projection encoder over the spectral generator.
pub mod reference;
/// Cosine-basis image parameterization.
pub mod spectral;
