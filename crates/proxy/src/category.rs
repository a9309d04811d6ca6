// ABOUTME: Derives a coarse article category from path segments of its URL.
// ABOUTME: The first table entry with a matching segment wins; unmatched URLs get the default.

/// Category assigned when no rule matches.
pub const DEFAULT_CATEGORY: &str = "turkiye";

const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "turkiye",
        &["/gundem/", "/turkiye/", "/politika/", "/siyaset/", "/haber/"],
    ),
    ("world", &["/dunya/", "/abd/", "/israil/", "/avrupa/"]),
    (
        "business",
        &[
            "/ekonomi/",
            "/sektorler/",
            "/sirket/",
            "/borsa/",
            "/kobi/",
            "/ntvpara/",
            "/piyasalar/",
            "/veriler/",
            "/enerji/",
            "/gayrimenkul/",
            "/is-dunyasi/",
            "/sirket-haberleri/",
            "/finans/",
        ],
    ),
    ("technology", &["/teknoloji/", "/bilisim/", "/bilim/"]),
    ("health", &["/saglik/", "/health/", "/saglikli-yasam/"]),
    ("entertainment", &["/magazin/", "/kultur/", "/sanat/"]),
];

pub fn category_for_url(url: &str) -> &'static str {
    let lower = url.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(category_for_url("https://a.test/Ekonomi/borsa-rekor"), "business");
        assert_eq!(category_for_url("https://a.test/dunya/x"), "world");
        assert_eq!(category_for_url("https://a.test/teknoloji/x"), "technology");
        assert_eq!(category_for_url("https://a.test/saglik/x"), "health");
        assert_eq!(category_for_url("https://a.test/kultur/x"), "entertainment");
        assert_eq!(category_for_url("https://a.test/misc/x"), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_earlier_rule_wins() {
        assert_eq!(category_for_url("https://a.test/gundem/ekonomi/x"), "turkiye");
    }
}
