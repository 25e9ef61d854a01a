//! HTML parsing utilities for provider implementations.
//!
//! Wraps the `scraper` crate with CSS-selector convenience functions and a
//! `rayon`-parallel item parser for large listing pages. Selector failures
//! (invalid CSS, no match) are represented as `None`/empty rather than a
//! panic, since provider markup changes over time and callers generally
//! want to treat a missing field as "not present" rather than fatal.
//!
//! # Examples
//!
//! ```rust
//! use luminary::net::html;
//!
//! let html_content = r#"
//!     <div class="manga-item">
//!         <h3 class="title">One Piece</h3>
//!         <img src="cover.jpg" alt="Cover">
//!         <span class="author">Oda Eiichiro</span>
//!     </div>
//! "#;
//!
//! let document = html::parse(html_content);
//! let title = html::select_text(&document, ".title").unwrap();
//! let cover_url = html::select_attr(&document, "img", "src").unwrap();
//! ```

use rayon::prelude::*;
use scraper::{ElementRef, Html, Selector};

/// Parses an HTML document from a string.
pub fn parse(html: &str) -> Html {
    Html::parse_document(html)
}

/// Text content of the first element matching `selector`, trimmed.
pub fn select_text(html: &Html, selector: &str) -> Option<String> {
    Selector::parse(selector).ok().and_then(|sel| {
        html.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    })
}

/// Attribute value of the first element matching `selector`.
pub fn select_attr(html: &Html, selector: &str, attr: &str) -> Option<String> {
    Selector::parse(selector).ok().and_then(|sel| {
        html.select(&sel)
            .next()
            .and_then(|el| el.value().attr(attr).map(String::from))
    })
}

/// Text content of every element matching `selector`.
pub fn select_all_text(html: &Html, selector: &str) -> Vec<String> {
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            html.select(&sel)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Attribute value of every element matching `selector`.
pub fn select_all_attr(html: &Html, selector: &str, attr: &str) -> Vec<String> {
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            html.select(&sel)
                .filter_map(|el| el.value().attr(attr).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// The first ancestor element matching `selector`, starting from `element`'s
/// immediate parent.
pub fn parent<'a>(element: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| sel.matches(el))
}

/// The next sibling element, regardless of tag, or `None` at the end of the
/// parent's children.
pub fn next_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .next_siblings()
        .find_map(ElementRef::wrap)
}

/// The previous sibling element.
pub fn prev_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .prev_siblings()
        .find_map(ElementRef::wrap)
}

/// Direct child elements matching `selector`. Unlike `select`, this does not
/// descend into non-matching children's subtrees.
pub fn children<'a>(element: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| sel.matches(el))
        .collect()
}

/// Whether `element` itself matches `selector`.
pub fn is(element: ElementRef<'_>, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|sel| sel.matches(&element))
        .unwrap_or(false)
}

/// Whether `element`'s `class` attribute contains `name` as one of its
/// space-separated values.
pub fn has_class(element: ElementRef<'_>, name: &str) -> bool {
    element
        .value()
        .attr("class")
        .map(|classes| classes.split_whitespace().any(|c| c == name))
        .unwrap_or(false)
}

/// Parses listing items from HTML in parallel using rayon.
///
/// Finds every element matching `selector`, round-trips each through an
/// HTML string (to sidestep `scraper`'s lifetime-bound `ElementRef` across
/// threads), then applies `parser` to each fragment concurrently. Elements
/// for which `parser` returns `None` are dropped.
pub fn parse_manga_items<F>(html: &Html, selector: &str, parser: F) -> Vec<crate::types::Manga>
where
    F: Fn(ElementRef) -> Option<crate::types::Manga> + Sync,
{
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            let elements: Vec<String> = html.select(&sel).map(|el| el.html()).collect();

            elements
                .into_par_iter()
                .filter_map(|html_str| {
                    let doc = Html::parse_fragment(&html_str);
                    let element = doc.root_element();
                    parser(element)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_finds_matching_ancestor() {
        let doc = parse(r#"<div class="chapter"><ul><li class="page">1</li></ul></div>"#);
        let li_sel = Selector::parse(".page").unwrap();
        let li = doc.select(&li_sel).next().unwrap();
        let found = parent(li, ".chapter");
        assert!(found.is_some());
    }

    #[test]
    fn next_and_prev_sibling_skip_text_nodes() {
        let doc = parse("<ul><li>a</li>\n<li>b</li>\n<li>c</li></ul>");
        let sel = Selector::parse("li").unwrap();
        let items: Vec<_> = doc.select(&sel).collect();
        let middle = items[1];
        assert_eq!(
            next_sibling(middle).unwrap().text().collect::<String>(),
            "c"
        );
        assert_eq!(
            prev_sibling(middle).unwrap().text().collect::<String>(),
            "a"
        );
    }

    #[test]
    fn children_only_returns_direct_matches() {
        let doc = parse(r#"<div><span class="x">1</span><p><span class="x">2</span></p></div>"#);
        let div_sel = Selector::parse("div").unwrap();
        let div = doc.select(&div_sel).next().unwrap();
        let kids = children(div, ".x");
        assert_eq!(kids.len(), 1);
    }

    #[test]
    fn is_matches_self_selector() {
        let doc = parse(r#"<span class="tag">Action</span>"#);
        let sel = Selector::parse("span").unwrap();
        let el = doc.select(&sel).next().unwrap();
        assert!(is(el, ".tag"));
        assert!(!is(el, ".other"));
    }

    #[test]
    fn has_class_matches_one_of_several_space_separated_values() {
        let doc = parse(r#"<div class="manga-item featured"></div>"#);
        let sel = Selector::parse("div").unwrap();
        let el = doc.select(&sel).next().unwrap();
        assert!(has_class(el, "featured"));
        assert!(has_class(el, "manga-item"));
        assert!(!has_class(el, "manga"));
    }
}
