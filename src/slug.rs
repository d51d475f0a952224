//! Defines [`slugify`], which turns free text (titles, tags, author names)
//! into URL-safe tokens.

use unicode_normalization::UnicodeNormalization;

/// The combining diacritical marks block. Characters in this range are what
/// remain of accents after canonical decomposition (e.g., `é` decomposes into
/// `e` followed by U+0301).
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036f}';

/// Converts `text` into a slug: a lowercase string made only of `[a-z0-9-]`,
/// with no leading, trailing, or repeated hyphens. Accented latin letters are
/// reduced to their base letter; every other character outside of
/// `[a-z0-9 -]` is dropped rather than replaced, so `"it's"` becomes `its`.
/// Runs of spaces become a single hyphen.
///
/// Any input produces a slug, though it may be empty.
///
/// ```
/// use shelf::slug::slugify;
///
/// assert_eq!(slugify("Hello World!"), "hello-world");
/// assert_eq!(slugify("Café  Déjà-vu"), "cafe-deja-vu");
/// ```
pub fn slugify(text: &str) -> String {
    let lowered = strip_diacritics(text).to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    for c in lowered.trim().chars() {
        let c = match c {
            'a'..='z' | '0'..='9' | '-' => c,
            ' ' => '-',
            _ => continue,
        };
        if c == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(c);
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Decomposes `text` (NFD) and drops the combining marks, leaving base
/// characters in their original case.
pub(crate) fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !COMBINING_MARKS.contains(c)).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_slugify_punctuation() {
        assert_eq!("hello-world", slugify("Hello World!"));
        assert_eq!("its-a-trap", slugify("It's a trap"));
        assert_eq!("v123", slugify("v1.2.3"));
    }

    #[test]
    fn test_slugify_diacritics() {
        assert_eq!("cafe-deja-vu", slugify("Café  Déjà-vu"));
        assert_eq!("angstrom", slugify("Ångström"));
    }

    #[test]
    fn test_slugify_collapses_hyphens() {
        assert_eq!("a-b", slugify("a - b"));
        assert_eq!("a-b", slugify("a---b"));
        assert_eq!("edge", slugify("--edge--"));
        assert_eq!("hello", slugify("Hello !"));
    }

    #[test]
    fn test_slugify_drops_non_space_whitespace() {
        // Only the space character survives the filter; tabs and newlines
        // are dropped like any other character.
        assert_eq!("ab", slugify("a\tb"));
        assert_eq!("a-b", slugify("  a \n b  "));
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!("", slugify(""));
        assert_eq!("", slugify("   "));
        assert_eq!("", slugify("!!!"));
        assert_eq!("", slugify("日本語"));
    }

    #[test]
    fn test_strip_diacritics_keeps_case() {
        assert_eq!("Cafe Deja", strip_diacritics("Café Déjà"));
    }

    proptest! {
        #[test]
        fn slugify_output_is_url_safe(s in "\\PC*") {
            let slug = slugify(&s);
            prop_assert!(
                slug.is_empty()
                    || (slug.split('-').all(|part| {
                        !part.is_empty()
                            && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                    })),
                "unexpected slug {:?} for {:?}",
                slug,
                s
            );
        }

        #[test]
        fn slugify_is_idempotent(s in "\\PC*") {
            let once = slugify(&s);
            prop_assert_eq!(slugify(&once), once);
        }
    }
}
