use std::collections::HashMap;

/// Disambiguate duplicate display names within one snapshot by appending an
/// ordinal suffix `(2)`, `(3)`, ... in encounter order.
///
/// Presentation only: callers must apply this after all ordering and
/// identity decisions are made. Names are visited through the iterator in
/// snapshot encounter order, so two renders of the same snapshot suffix the
/// same players.
pub fn disambiguate<'a, I>(names: I)
where
    I: IntoIterator<Item = &'a mut String>,
{
    let mut names: Vec<&'a mut String> = names.into_iter().collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names.iter() {
        *counts.entry((**name).clone()).or_insert(0) += 1;
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for name in names.iter_mut() {
        if counts.get(name.as_str()).copied().unwrap_or(0) < 2 {
            continue;
        }
        let ordinal = seen.entry((**name).clone()).or_insert(0);
        *ordinal += 1;
        if *ordinal > 1 {
            **name = format!("{} ({})", name, ordinal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(input: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        disambiguate(names.iter_mut());
        names
    }

    #[test]
    fn unique_names_untouched() {
        assert_eq!(apply(&["Air", "Bank", "Chai"]), vec!["Air", "Bank", "Chai"]);
    }

    #[test]
    fn duplicates_get_ordinals_in_encounter_order() {
        assert_eq!(
            apply(&["Air", "Bank", "Air", "Air"]),
            vec!["Air", "Bank", "Air (2)", "Air (3)"]
        );
    }

    #[test]
    fn several_duplicate_groups() {
        assert_eq!(
            apply(&["A", "B", "A", "B"]),
            vec!["A", "B", "A (2)", "B (2)"]
        );
    }
}
