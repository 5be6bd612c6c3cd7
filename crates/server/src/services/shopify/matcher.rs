//! Order eligibility matching against the configured keyword allow-list.

use super::types::OrderPayload;

/// Decide whether an order qualifies for account provisioning.
///
/// An empty keyword list accepts every order. Otherwise each line item's
/// lowercased `title`, `name` and `sku` are concatenated into one search
/// string, and the order matches as soon as any trimmed, lowercased keyword
/// appears as a substring of any item's search string.
#[must_use]
pub fn order_matches_keywords(order: &OrderPayload, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }

    order.line_items.iter().any(|item| {
        let search_text = format!(
            "{} {} {}",
            item.title.as_deref().unwrap_or("").to_lowercase(),
            item.name.as_deref().unwrap_or("").to_lowercase(),
            item.sku.as_deref().unwrap_or("").to_lowercase(),
        );

        keywords.iter().any(|keyword| {
            let keyword = keyword.trim().to_lowercase();
            !keyword.is_empty() && search_text.contains(&keyword)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::shopify::types::LineItem;

    fn order_with_items(items: Vec<LineItem>) -> OrderPayload {
        OrderPayload {
            line_items: items,
            ..Default::default()
        }
    }

    fn item(title: &str) -> LineItem {
        LineItem {
            title: Some(title.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_keywords_accept_all() {
        let order = order_with_items(vec![item("Anything")]);
        assert!(order_matches_keywords(&order, &[]));

        let no_items = OrderPayload::default();
        assert!(order_matches_keywords(&no_items, &[]));
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let order = order_with_items(vec![item("Premium Widget Pro")]);
        assert!(order_matches_keywords(&order, &["premium".to_owned()]));
        assert!(order_matches_keywords(&order, &["PREMIUM".to_owned()]));
        assert!(order_matches_keywords(&order, &["widget pro".to_owned()]));
        assert!(!order_matches_keywords(&order, &["xyz".to_owned()]));
    }

    #[test]
    fn test_keywords_are_trimmed() {
        let order = order_with_items(vec![item("Premium Widget")]);
        assert!(order_matches_keywords(&order, &["  premium ".to_owned()]));
    }

    #[test]
    fn test_matches_on_sku() {
        let order = order_with_items(vec![LineItem {
            sku: Some("VCARD-STD-01".to_owned()),
            ..Default::default()
        }]);
        assert!(order_matches_keywords(&order, &["vcard".to_owned()]));
    }

    #[test]
    fn test_any_item_suffices() {
        let order = order_with_items(vec![item("Plain Sticker"), item("Premium Card")]);
        assert!(order_matches_keywords(&order, &["premium".to_owned()]));
    }

    #[test]
    fn test_no_items_no_match() {
        let order = OrderPayload::default();
        assert!(!order_matches_keywords(&order, &["premium".to_owned()]));
    }

    #[test]
    fn test_blank_keywords_do_not_match_everything() {
        let order = order_with_items(vec![item("Plain Sticker")]);
        assert!(!order_matches_keywords(&order, &["   ".to_owned()]));
    }
}
