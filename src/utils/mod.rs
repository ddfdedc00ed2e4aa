//! Shared helpers: clock, pagination, list filtering, slugs, and
//! relative timestamps.

use serde::Serialize;
use time::OffsetDateTime;

/// Current wall-clock time in epoch milliseconds, the timestamp unit
/// used throughout the store schema.
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Page bookkeeping for in-memory list views. `from`/`to` are 1-based
/// positions of the slice within the full result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: usize,
    pub last_page: usize,
    pub from: usize,
    pub to: usize,
    pub total: usize,
}

/// Slice an already-fetched list down to one page. A page past the end
/// clamps to the last page; page numbers are 1-based. This does not
/// scale to large sets and is only used for catalog-sized lists.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> (Vec<T>, PageMeta) {
    let per_page = per_page.max(1);
    let total = items.len();
    let last_page = total.div_ceil(per_page).max(1);
    let current_page = page.clamp(1, last_page);

    let from = (current_page - 1) * per_page;
    let to = (from + per_page).min(total);
    let slice = items[from..to].to_vec();

    let meta = PageMeta {
        current_page,
        last_page,
        from: if total == 0 { 0 } else { from + 1 },
        to,
        total,
    };
    (slice, meta)
}

/// Case-insensitive substring match over a set of searchable fields.
pub fn matches_needle(fields: &[&str], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Derive a storage slug from a title: lowercase, alphanumerics kept,
/// every other run of characters folded into a single dash. Derived once
/// at creation; the slug is the book's immutable storage key.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}

const DATE_UNITS: &[(&str, i64)] = &[
    ("year", 31_536_000),
    ("month", 2_629_800),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
];

/// Human-friendly distance between two epoch-millisecond timestamps:
/// "3 days ago", "in 2 hours", "just now".
pub fn relative_time(then_ms: i64, now_ms: i64) -> String {
    let elapsed = (now_ms - then_ms) / 1000;
    let magnitude = elapsed.abs();

    for (unit, seconds) in DATE_UNITS {
        if magnitude >= *seconds {
            let count = magnitude / seconds;
            let plural = if count == 1 { "" } else { "s" };
            return if elapsed >= 0 {
                format!("{count} {unit}{plural} ago")
            } else {
                format!("in {count} {unit}{plural}")
            };
        }
    }
    if magnitude >= 5 {
        if elapsed >= 0 {
            format!("{magnitude} seconds ago")
        } else {
            format!("in {magnitude} seconds")
        }
    } else {
        "just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_slices_and_clamps() {
        let items: Vec<i32> = (1..=25).collect();

        let (page, meta) = paginate(&items, 1, 10);
        assert_eq!(page, (1..=10).collect::<Vec<_>>());
        assert_eq!(
            meta,
            PageMeta {
                current_page: 1,
                last_page: 3,
                from: 1,
                to: 10,
                total: 25
            }
        );

        let (page, meta) = paginate(&items, 3, 10);
        assert_eq!(page, vec![21, 22, 23, 24, 25]);
        assert_eq!(meta.from, 21);
        assert_eq!(meta.to, 25);

        // Requests past the end clamp to the last page.
        let (page, meta) = paginate(&items, 9, 10);
        assert_eq!(meta.current_page, 3);
        assert_eq!(page.len(), 5);
    }

    #[test]
    fn paginate_empty_list() {
        let (page, meta) = paginate::<i32>(&[], 1, 10);
        assert!(page.is_empty());
        assert_eq!(meta.last_page, 1);
        assert_eq!(meta.from, 0);
        assert_eq!(meta.to, 0);
    }

    #[test]
    fn needle_matching_is_case_insensitive() {
        assert!(matches_needle(&["Dune", "Frank Herbert"], "herbert"));
        assert!(matches_needle(&["Dune"], "  DUNE "));
        assert!(matches_needle(&["Dune"], ""));
        assert!(!matches_needle(&["Dune"], "asimov"));
    }

    #[test]
    fn slugify_folds_punctuation_and_case() {
        assert_eq!(slugify("Cien Años de Soledad"), "cien-años-de-soledad");
        assert_eq!(slugify("The Left Hand of Darkness"), "the-left-hand-of-darkness");
        assert_eq!(slugify("  ¡Hola!  Mundo  "), "hola-mundo");
        assert_eq!(slugify("1984"), "1984");
    }

    #[test]
    fn relative_time_picks_the_largest_unit() {
        let now = 1_700_000_000_000;
        assert_eq!(relative_time(now - 3 * 86_400_000, now), "3 days ago");
        assert_eq!(relative_time(now - 90_000, now), "1 minute ago");
        assert_eq!(relative_time(now - 1_000, now), "just now");
        assert_eq!(relative_time(now + 7_200_000, now), "in 2 hours");
    }
}
