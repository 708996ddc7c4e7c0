use fiscus_kernel::{SAFE_ALPHABET, safe_nanoid};

#[test]
fn default_length_is_twelve() {
    let id = safe_nanoid!();
    assert_eq!(id.len(), 12);
}

#[test]
fn custom_length_is_respected() {
    let id = safe_nanoid!(21);
    assert_eq!(id.len(), 21);
}

#[test]
fn only_unambiguous_characters_are_used() {
    for _ in 0..100 {
        let id = safe_nanoid!();
        assert!(
            id.chars().all(|c| SAFE_ALPHABET.contains(&c)),
            "id {id} contains a character outside the safe alphabet"
        );
    }
}

#[test]
fn ids_are_unique_in_practice() {
    let mut seen = std::collections::HashSet::new();
    for _ in 0..1000 {
        assert!(seen.insert(safe_nanoid!()));
    }
}
