//! Slug derivation for notes
//!
//! Titles are mostly Russian, so they are transliterated to Latin before
//! being reduced to a URL token.

/// Longest slug a note may carry
pub const MAX_SLUG_LENGTH: usize = 100;

/// Latin spelling of a lowercase Cyrillic letter, `None` if `c` is not one.
fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'і' => "i",
        'ї' => "yi",
        'є' => "ye",
        'ґ' => "g",
        _ => return None,
    };
    Some(latin)
}

/// Derive a slug from a note title.
///
/// Lowercases and transliterates, keeps only ASCII letters, digits, `_`
/// and separators, collapses every run of whitespace and hyphens into a
/// single `-`, and cuts the result to [`MAX_SLUG_LENGTH`].
///
/// # Examples
///
/// ```
/// use noteboard::services::slug::slugify;
///
/// assert_eq!(slugify("Привет мир"), "privet-mir");
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// ```
pub fn slugify(title: &str) -> String {
    let mut latin = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        match transliterate(c) {
            Some(s) => latin.push_str(s),
            None => latin.push(c),
        }
    }

    let mut result = String::with_capacity(latin.len());
    let mut pending_separator = false;

    for c in latin.chars() {
        if c.is_whitespace() || c == '-' {
            pending_separator = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            // Separators at the very start are dropped, like a trim.
            if pending_separator && !result.is_empty() {
                result.push('-');
            }
            pending_separator = false;
            result.push(c);
        }
        // Punctuation and untransliterated letters vanish without
        // splitting the surrounding word.
    }

    if result.len() > MAX_SLUG_LENGTH {
        result.truncate(MAX_SLUG_LENGTH);
        while result.ends_with('-') {
            result.pop();
        }
    }

    result
}

/// Whether a user-supplied slug is acceptable: 1 to 100 of `[A-Za-z0-9_-]`.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
