//! Selector chains for kinopoisk.ru pages
//!
//! Each chain is ordered by preference. Ready conditions only need the
//! element attached to the DOM.

use kinocheck_common::SelectorStrategy;

/// Labels of the consent dialog's accept button
pub const CONSENT_LABELS: [&str; 3] = ["Принять", "Accept", "Согласен"];

fn present_chain(queries: &[&str]) -> Vec<SelectorStrategy> {
    queries.iter().map(|q| SelectorStrategy::present(*q)).collect()
}

pub fn home_ready() -> Vec<SelectorStrategy> {
    present_chain(&["header", "[class*='header']", "h1"])
}

pub fn search_results_ready() -> Vec<SelectorStrategy> {
    present_chain(&[
        "h1",
        ".title",
        "[data-test-id*='search']",
        ".search-results",
        ".results",
        ".items",
    ])
}

pub fn film_ready() -> Vec<SelectorStrategy> {
    present_chain(&[
        "h1",
        "[itemprop='name']",
        "[data-test-id='film-title']",
        ".styles_title__j5ose",
    ])
}

pub fn listing_ready() -> Vec<SelectorStrategy> {
    present_chain(&[
        "h1",
        "[data-test-id='page-title']",
        "[class*='title']",
        "[class*='header']",
    ])
}

/// Max text length of a link recorded by the navigation flow
pub const NAV_LINK_MAX_CHARS: usize = 50;

/// Max text length of the link the navigation flow clicks
pub const CLICK_LINK_MAX_CHARS: usize = 30;

fn visible_chain(queries: &[&str]) -> Vec<SelectorStrategy> {
    queries.iter().map(|q| SelectorStrategy::visible(*q)).collect()
}

fn text_chain(queries: &[&str], max_len: Option<usize>) -> Vec<SelectorStrategy> {
    queries
        .iter()
        .map(|q| SelectorStrategy::non_empty_text(*q, max_len))
        .collect()
}

pub fn consent_buttons() -> Vec<SelectorStrategy> {
    vec![SelectorStrategy::with_text("button", CONSENT_LABELS)]
}

pub fn logo() -> Vec<SelectorStrategy> {
    visible_chain(&[
        "a[href*='kinopoisk.ru'] img[src*='logo']",
        "a[data-test-id='logo']",
        "[class*='logo'] img",
        "header img[alt*='Кинопоиск']",
        "svg[aria-label*='Кинопоиск']",
    ])
}

pub fn search_inputs() -> Vec<SelectorStrategy> {
    visible_chain(&[
        "input[type='search']",
        "input[placeholder*='поиск']",
        "input[placeholder*='фильм']",
        "input[data-test-id='search-input']",
        "[class*='search'] input[type='text']",
    ])
}

/// Inputs most likely to be the active search box, tried before the generic ones
pub fn focused_search_inputs() -> Vec<SelectorStrategy> {
    visible_chain(&[
        "input[type='search']:focus",
        "input[type='text']:focus",
        "input[placeholder*='поиск']",
        "input[data-test-id='search-input']",
    ])
}

pub fn generic_inputs() -> Vec<SelectorStrategy> {
    visible_chain(&["input[type='search']", "input[type='text']"])
}

pub fn search_buttons() -> Vec<SelectorStrategy> {
    visible_chain(&[
        "button[type='submit'][aria-label*='поиск']",
        "button[aria-label*='поиск']",
        "button[data-test-id='search-button']",
        "[data-test-id='search-button']",
        "[class*='search'] button",
        "svg[class*='search']",
        "button[type='submit']",
    ])
}

pub fn film_title() -> Vec<SelectorStrategy> {
    text_chain(
        &[
            "h1[itemprop='name']",
            "[data-test-id='film-title']",
            ".styles_title__j5ose",
            "h1.styles_title__j5ose",
            ".film-page__title",
            "h1",
        ],
        None,
    )
}

pub fn film_year() -> Vec<SelectorStrategy> {
    text_chain(
        &[
            "[data-test-id='film-year']",
            ".film-page__year",
            "a[href*='/lists/movies/']",
            ".styles_secondaryTitle__ighTt",
        ],
        None,
    )
}

pub fn film_rating() -> Vec<SelectorStrategy> {
    text_chain(
        &[
            "[data-test-id='rating']",
            ".film-rating",
            ".rating",
            ".styles_ratingValue__G_1_e",
        ],
        None,
    )
}

pub fn nav_links() -> Vec<SelectorStrategy> {
    text_chain(
        &[
            "a[href*='/film/']",
            "a[href*='/series/']",
            "a[href*='/cartoons/']",
            "a[href*='/lists/']",
            "a[href*='/media/']",
            "a[href*='/collections/']",
        ],
        Some(NAV_LINK_MAX_CHARS),
    )
}

/// Any visible link with text, for when the nav chain finds nothing
pub fn any_links() -> Vec<SelectorStrategy> {
    text_chain(&["a"], None)
}

pub fn click_targets() -> Vec<SelectorStrategy> {
    text_chain(
        &["a[href*='/lists/']", "a[href*='/film/']", "a[href*='/media/']"],
        Some(CLICK_LINK_MAX_CHARS),
    )
}

/// Links leading to the listing at `slug`, e.g. `lists/movies/movies-in-cinema`
pub fn listing_links(slug: &str, link_text: &str) -> Vec<SelectorStrategy> {
    let slug = slug.trim_matches('/');
    let tail = slug_tail(slug);

    vec![
        SelectorStrategy::visible(format!("a[href*='/{}/']", slug)),
        SelectorStrategy::visible(format!("a[href*='{}']", tail)),
        SelectorStrategy::with_text("a", [link_text]),
        SelectorStrategy::visible(format!("a[title*='{}']", link_text)),
    ]
}

pub fn listing_content() -> Vec<SelectorStrategy> {
    visible_chain(&[
        "[class*='movie']",
        "[class*='film']",
        "[data-test-id*='movie']",
        "[class*='card']",
        "[class*='poster']",
        "[class*='item']",
    ])
}

/// Last path segment of a slug
pub fn slug_tail(slug: &str) -> &str {
    let slug = slug.trim_matches('/');
    slug.rsplit('/').next().unwrap_or(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_links_from_slug() {
        let chain = listing_links("/lists/movies/movies-in-cinema/", "в кино");
        assert_eq!(chain[0].query, "a[href*='/lists/movies/movies-in-cinema/']");
        assert_eq!(chain[1].query, "a[href*='movies-in-cinema']");
        assert_eq!(chain[2].to_string(), "a ~ [в кино]");
    }

    #[test]
    fn test_slug_tail() {
        assert_eq!(slug_tail("lists/movies/movies-in-cinema"), "movies-in-cinema");
        assert_eq!(slug_tail("top250/"), "top250");
    }
}
