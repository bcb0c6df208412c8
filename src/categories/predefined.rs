use lazy_static::lazy_static;

lazy_static! {
    /// Built-in categories shared by every user. Lowercase, never mutated.
    pub static ref PREDEFINED: Vec<&'static str> = vec![
        "groceries",
        "dining",
        "transport",
        "housing",
        "utilities",
        "health",
        "entertainment",
        "shopping",
        "education",
        "travel",
        "other",
    ];
}

/// Canonical predefined name for `name`, ignoring case and surrounding
/// whitespace.
pub fn find(name: &str) -> Option<&'static str> {
    let name = name.trim();
    PREDEFINED
        .iter()
        .copied()
        .find(|p| p.eq_ignore_ascii_case(name))
}
