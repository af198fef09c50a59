use anyhow::{anyhow, Result};
use scraper::ElementRef;

use crate::declare::PriceRecord;

pub const ITEM_TYPE: &str = "itemtype";
pub const ITEM_PROP: &str = "itemprop";
/// 價格與幣別放在 meta 的 content 屬性
pub const CONTENT: &str = "content";

pub const PRODUCT: &str = "http://schema.org/Product";
pub const REVIEW: &str = "http://schema.org/Review";
pub const OFFER: &str = "http://schema.org/Offer";

pub const DATE_PUBLISHED: &str = "datePublished";
pub const PRICE: &str = "price";
pub const PRICE_CURRENCY: &str = "priceCurrency";

/// A node of a parsed markup document, as far as the price extraction needs it.
///
/// Implemented for [`scraper::ElementRef`]; tests implement it for hand-built trees.
pub trait MarkupNode: Copy {
    /// Only element nodes can match an attribute query.
    fn is_element(&self) -> bool;
    fn attr(&self, key: &str) -> Option<&str>;
    /// Child nodes in document order.
    fn children(&self) -> Vec<Self>;
    /// The text of the first child, if that child is a text node.
    fn first_text(&self) -> Option<String>;
}

impl<'a> MarkupNode for ElementRef<'a> {
    fn is_element(&self) -> bool {
        true
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.value().attr(key)
    }

    fn children(&self) -> Vec<Self> {
        (**self).children().filter_map(ElementRef::wrap).collect()
    }

    fn first_text(&self) -> Option<String> {
        (**self)
            .first_child()
            .and_then(|node| node.value().as_text().map(|text| String::from(&**text)))
    }
}

/// Depth-first, pre-order search for the first element carrying `key="value"`.
///
/// The node itself is checked before its children, and children are visited left to
/// right, so with several matches the first one in document order wins even when a
/// later one is nested deeper.
pub fn node_by_attr<N: MarkupNode>(node: N, key: &str, value: &str) -> Option<N> {
    if node.is_element() && node.attr(key) == Some(value) {
        return Some(node);
    }

    node.children()
        .into_iter()
        .find_map(|child| node_by_attr(child, key, value))
}

fn find_node<N: MarkupNode>(node: N, key: &str, value: &str) -> Result<N> {
    node_by_attr(node, key, value)
        .ok_or_else(|| anyhow!("Cannot find the node with {}=\"{}\"", key, value))
}

/// Pulls a [`PriceRecord`] out of the schema.org microdata under `root`.
///
/// The date is the first text of `datePublished` inside the Product's Review; amount
/// and currency are the `content` attributes of `price` and `priceCurrency` inside
/// the Product's Offer. Every value is trimmed and must not be empty. `ident` is
/// taken as given, the page never supplies it.
pub fn extract_price<N: MarkupNode>(root: N, ident: &str) -> Result<PriceRecord> {
    let product = find_node(root, ITEM_TYPE, PRODUCT)?;

    // 日期
    let review = find_node(product, ITEM_TYPE, REVIEW)?;
    let date_node = find_node(review, ITEM_PROP, DATE_PUBLISHED)?;
    let date = date_node
        .first_text()
        .map(|text| text.trim().to_string())
        .unwrap_or_default();
    if date.is_empty() {
        return Err(anyhow!("Cannot find their date"));
    }

    // 價格與幣別
    let offer = find_node(product, ITEM_TYPE, OFFER)?;
    let price_node = find_node(offer, ITEM_PROP, PRICE)?;
    let currency_node = find_node(offer, ITEM_PROP, PRICE_CURRENCY)?;

    let amount = price_node.attr(CONTENT).unwrap_or_default().trim().to_string();
    if amount.is_empty() {
        return Err(anyhow!("Cannot find their amount"));
    }

    let currency = currency_node
        .attr(CONTENT)
        .unwrap_or_default()
        .trim()
        .to_string();
    if currency.is_empty() {
        return Err(anyhow!("Cannot find their currency"));
    }

    Ok(PriceRecord::new(date, ident.to_string(), amount, currency))
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    /// 手動建立的節點樹，不需要真的解析 HTML
    #[derive(Debug, Default)]
    struct FakeNode {
        name: &'static str,
        element: bool,
        attrs: Vec<(&'static str, &'static str)>,
        text: &'static str,
        children: Vec<FakeNode>,
    }

    impl FakeNode {
        fn element(name: &'static str, attrs: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                name,
                element: true,
                attrs,
                ..Default::default()
            }
        }

        fn text(text: &'static str) -> Self {
            Self {
                text,
                ..Default::default()
            }
        }

        fn with(mut self, children: Vec<FakeNode>) -> Self {
            self.children = children;
            self
        }
    }

    impl<'a> MarkupNode for &'a FakeNode {
        fn is_element(&self) -> bool {
            self.element
        }

        fn attr(&self, key: &str) -> Option<&str> {
            self.attrs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
        }

        fn children(&self) -> Vec<Self> {
            let node: &'a FakeNode = *self;
            node.children.iter().collect()
        }

        fn first_text(&self) -> Option<String> {
            self.children
                .first()
                .filter(|child| !child.element)
                .map(|child| child.text.to_string())
        }
    }

    fn review(date: &'static str) -> FakeNode {
        FakeNode::element("div", vec![(ITEM_TYPE, REVIEW)]).with(vec![FakeNode::element(
            "span",
            vec![(ITEM_PROP, DATE_PUBLISHED)],
        )
        .with(vec![FakeNode::text(date)])])
    }

    fn offer(amount: &'static str, currency: &'static str) -> FakeNode {
        FakeNode::element("div", vec![(ITEM_TYPE, OFFER)]).with(vec![
            FakeNode::element("meta", vec![(ITEM_PROP, PRICE), (CONTENT, amount)]),
            FakeNode::element("meta", vec![(ITEM_PROP, PRICE_CURRENCY), (CONTENT, currency)]),
        ])
    }

    fn page(product_children: Vec<FakeNode>) -> FakeNode {
        FakeNode::element("html", vec![]).with(vec![FakeNode::element("body", vec![]).with(
            vec![FakeNode::element("div", vec![(ITEM_TYPE, PRODUCT)]).with(product_children)],
        )])
    }

    #[test]
    fn test_node_by_attr_pre_order() {
        // 外層先被找到，即使內層也符合
        let tree = FakeNode::element("div", vec![]).with(vec![
            FakeNode::element("section", vec![("id", "outer"), ("class", "hit")]).with(vec![
                FakeNode::element("span", vec![("id", "inner"), ("class", "hit")]),
            ]),
            FakeNode::element("section", vec![("id", "sibling"), ("class", "hit")]),
        ]);

        let found = node_by_attr(&tree, "class", "hit").unwrap();
        assert_eq!(found.attr("id"), Some("outer"));

        // 深度優先：先走完第一個子樹，才輪到兄弟節點
        let tree = FakeNode::element("div", vec![]).with(vec![
            FakeNode::element("section", vec![]).with(vec![FakeNode::element(
                "span",
                vec![("id", "deep"), ("class", "hit")],
            )]),
            FakeNode::element("section", vec![("id", "shallow"), ("class", "hit")]),
        ]);

        let found = node_by_attr(&tree, "class", "hit").unwrap();
        assert_eq!(found.attr("id"), Some("deep"));
        assert_eq!(found.name, "span");
    }

    #[test]
    fn test_node_by_attr_matches_self_and_skips_text() {
        let tree = FakeNode::element("div", vec![("class", "hit")]);
        assert!(node_by_attr(&tree, "class", "hit").is_some());

        let text = FakeNode {
            attrs: vec![("class", "hit")],
            ..FakeNode::text("not an element")
        };
        assert!(node_by_attr(&text, "class", "hit").is_none());
        assert!(node_by_attr(&tree, "class", "miss").is_none());
    }

    #[test]
    fn test_extract_price() {
        let tree = page(vec![review(" 2023-02-01\n"), offer(" 101.25 ", "SEK ")]);

        let record = extract_price(&tree, "ZERO").unwrap();
        assert_eq!(
            record,
            PriceRecord::new(
                "2023-02-01".to_string(),
                "ZERO".to_string(),
                "101.25".to_string(),
                "SEK".to_string()
            )
        );
    }

    #[test]
    fn test_extract_price_first_offer_wins() {
        let tree = page(vec![
            review("2023-02-01"),
            FakeNode::element("div", vec![]).with(vec![offer("101.25", "SEK")]),
            offer("999.99", "USD"),
        ]);

        let record = extract_price(&tree, "ZERO").unwrap();
        assert_eq!(record.amount, "101.25");
        assert_eq!(record.currency, "SEK");
    }

    #[test]
    fn test_extract_price_missing_structure() {
        let cases = vec![
            ("no product", FakeNode::element("html", vec![])),
            ("no review", page(vec![offer("101.25", "SEK")])),
            ("no offer", page(vec![review("2023-02-01")])),
            ("blank date", page(vec![review("   "), offer("101.25", "SEK")])),
            ("blank amount", page(vec![review("2023-02-01"), offer(" ", "SEK")])),
            ("blank currency", page(vec![review("2023-02-01"), offer("101.25", "")])),
            (
                "date without text",
                page(vec![
                    FakeNode::element("div", vec![(ITEM_TYPE, REVIEW)]).with(vec![
                        FakeNode::element("span", vec![(ITEM_PROP, DATE_PUBLISHED)]),
                    ]),
                    offer("101.25", "SEK"),
                ]),
            ),
            (
                "price without content",
                page(vec![
                    review("2023-02-01"),
                    FakeNode::element("div", vec![(ITEM_TYPE, OFFER)]).with(vec![
                        FakeNode::element("meta", vec![(ITEM_PROP, PRICE)]),
                        FakeNode::element(
                            "meta",
                            vec![(ITEM_PROP, PRICE_CURRENCY), (CONTENT, "SEK")],
                        ),
                    ]),
                ]),
            ),
        ];

        for (name, tree) in cases {
            assert!(extract_price(&tree, "ZERO").is_err(), "{} should fail", name);
        }
    }

    #[test]
    fn test_extract_price_offer_outside_product_is_ignored() {
        let tree = FakeNode::element("html", vec![]).with(vec![
            offer("101.25", "SEK"),
            FakeNode::element("div", vec![(ITEM_TYPE, PRODUCT)]).with(vec![review("2023-02-01")]),
        ]);

        assert!(extract_price(&tree, "ZERO").is_err());
    }

    const AVANZA_LIKE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Avanza Zero</title></head>
<body>
  <div class="header" itemscope itemtype="http://schema.org/Organization">Avanza</div>
  <div itemscope itemtype="http://schema.org/Product">
    <h1 itemprop="name">Avanza Zero</h1>
    <div itemprop="review" itemscope itemtype="http://schema.org/Review">
      <span itemprop="datePublished">
        2023-02-01
      </span>
    </div>
    <ul>
      <li itemprop="offers" itemscope itemtype="http://schema.org/Offer">
        <meta itemprop="price" content=" 101.25 ">
        <meta itemprop="priceCurrency" content="SEK">
        <span>101,25 SEK</span>
      </li>
      <li itemprop="offers" itemscope itemtype="http://schema.org/Offer">
        <meta itemprop="price" content="1.00">
        <meta itemprop="priceCurrency" content="USD">
      </li>
    </ul>
  </div>
</body>
</html>"#;

    #[test]
    fn test_extract_price_from_html() {
        let document = Html::parse_document(AVANZA_LIKE);
        let record = extract_price(document.root_element(), "ZERO").unwrap();

        assert_eq!(record.encode(), "P 2023-02-01 ZERO 101.25 SEK");
    }

    #[test]
    fn test_extract_price_from_html_without_offer() {
        let html = AVANZA_LIKE.replace("http://schema.org/Offer", "http://schema.org/Thing");
        let document = Html::parse_document(&html);

        let why = extract_price(document.root_element(), "ZERO").unwrap_err();
        assert!(why.to_string().contains(OFFER), "{}", why);
    }
}
