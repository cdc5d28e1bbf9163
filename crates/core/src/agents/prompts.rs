//! Default system prompts bundled at compile time.

/// Analyzer - decomposes queries into intent and required elements
pub const ANALYZER: &str = include_str!("defaults/analyzer.md");

/// Generator - answers strictly from retrieved context
pub const GENERATOR: &str = include_str!("defaults/generator.md");

/// Reflector - judges answer completeness and ambiguity
pub const REFLECTOR: &str = include_str!("defaults/reflector.md");

/// Clarifier - simulates a user's reply to a clarifying question
pub const CLARIFIER: &str = include_str!("defaults/clarifier.md");

/// Enricher - synthesizes placeholder content for missing elements
pub const ENRICHER: &str = include_str!("defaults/enricher.md");

/// All default prompts with their slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("analyzer", ANALYZER),
        ("generator", GENERATOR),
        ("reflector", REFLECTOR),
        ("clarifier", CLARIFIER),
        ("enricher", ENRICHER),
    ]
}
