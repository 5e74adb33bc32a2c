//! URL-safe names for CKAN.
//!
//! CKAN names are lowercase ASCII alphanumerics and `-`, at most 100 chars.

use crate::models::Tag;

/// Maximum length of a CKAN entity name.
pub const MAX_NAME_LEN: usize = 100;

/// Convert a string to a URL-safe slug.
///
/// Common Latin accented letters are folded to ASCII; every other run of
/// non-alphanumeric characters becomes a single `-`. Idempotent.
pub fn slugify(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_separator = false;

    for c in s.chars().flat_map(fold_latin) {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_separator = false;
        } else if !last_was_separator && !result.is_empty() {
            result.push('-');
            last_was_separator = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Dataset name: slug of the title followed by the slug of the source id.
///
/// The title part is shortened so the whole name fits [`MAX_NAME_LEN`].
pub fn dataset_name(title: &str, source_id: &str) -> String {
    let id = slugify(source_id);
    let title = slugify(title);

    if title.is_empty() {
        return id;
    }
    if id.is_empty() {
        return truncate_slug(&title, MAX_NAME_LEN);
    }

    let room = MAX_NAME_LEN.saturating_sub(id.len() + 1);
    let head = truncate_slug(&title, room);
    if head.is_empty() {
        id
    } else {
        format!("{head}-{id}")
    }
}

/// Split a comma-separated keyword list into slugified tags.
///
/// Blank segments are dropped, as are segments with nothing sluggable.
pub fn parse_tags(keywords: &str) -> Vec<Tag> {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(slugify)
        .filter(|name| !name.is_empty())
        .map(|name| Tag { name })
        .collect()
}

fn truncate_slug(slug: &str, max: usize) -> String {
    // slugs are ASCII, byte slicing is safe
    let cut = &slug[..slug.len().min(max)];
    cut.trim_end_matches('-').to_string()
}

fn fold_latin(c: char) -> std::iter::Take<std::array::IntoIter<char, 2>> {
    let (a, b) = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => ('a', None),
        'æ' | 'Æ' => ('a', Some('e')),
        'ç' | 'Ç' => ('c', None),
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => ('e', None),
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => ('i', None),
        'ñ' | 'Ñ' => ('n', None),
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => ('o', None),
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => ('u', None),
        'ý' | 'ÿ' | 'Ý' => ('y', None),
        'ß' => ('s', Some('s')),
        other => (other, None),
    };
    match b {
        Some(b) => [a, b].into_iter().take(2),
        None => [a, a].into_iter().take(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Roads & Bridges 2020"), "roads-bridges-2020");
        assert_eq!(slugify("  Health  "), "health");
        assert_eq!(slugify("--already-a-slug--"), "already-a-slug");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_idempotent() {
        for input in ["Gov B", "Société Générale", "a_b.c", "roads-2020"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Société Générale"), "societe-generale");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_parse_tags_drops_empty() {
        let tags = parse_tags("Health, Education, ");
        assert_eq!(
            tags,
            vec![
                Tag { name: "health".into() },
                Tag { name: "education".into() }
            ]
        );
    }

    #[test]
    fn test_parse_tags_empty_input() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,").is_empty());
    }

    #[test]
    fn test_dataset_name_appends_id() {
        assert_eq!(dataset_name("Roads", "abcd-1234"), "roads-abcd-1234");
        assert_eq!(dataset_name("", "abcd-1234"), "abcd-1234");
    }

    #[test]
    fn test_dataset_name_fits_limit() {
        let title = "word ".repeat(60);
        let name = dataset_name(&title, "abcd-1234");
        assert!(name.len() <= MAX_NAME_LEN);
        assert!(name.ends_with("-abcd-1234"));
        assert!(!name.contains("--"));
    }
}
