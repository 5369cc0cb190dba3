// ── Catalog selection policy ──
//
// The service returns catalogs as ordered lists. A run picks the first
// entry whose identifying string starts with a requested prefix; with
// several matches the service's order decides.

/// First item, in list order, whose `key` starts with `prefix`.
pub fn first_by_prefix<'a, T>(
    items: &'a [T],
    prefix: &str,
    key: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    items.iter().find(|item| key(item).starts_with(prefix))
}
