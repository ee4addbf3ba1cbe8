/// Reference resolution.
///
/// Turns the `ref` of a request need into a unit, symbol or layout target,
/// or into a typed missing / ambiguous result.
mod resolver;

pub use resolver::Resolver;
