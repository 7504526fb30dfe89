//! Naming helpers for copied entities.

/// Suffix appended to the name of a copied rule, category, preset or template.
pub const COPY_SUFFIX: &str = " (copy)";

/// Name for a copy of an entity called `original`.
///
/// # Examples
///
/// ```
/// use rulekeeper_core::naming::copy_name;
///
/// assert_eq!(copy_name("Formatting"), "Formatting (copy)");
/// assert_eq!(copy_name("Formatting (copy)"), "Formatting (copy) (copy)");
/// ```
pub fn copy_name(original: &str) -> String {
    format!("{original}{COPY_SUFFIX}")
}
