//! Turns product matches into Messenger template replies.

use {
    marketbot_common::{ProductMatch, ProductView},
    marketbot_config::RepliesConfig,
    marketbot_messenger::{Button, Element, ReplyPayload},
    tracing::warn,
};

use crate::links::PublicUrl;

/// The Send API rejects list templates with more than four elements.
pub const MAX_LIST_ELEMENTS: usize = 4;

pub struct ProductCards<'a> {
    pub replies: &'a RepliesConfig,
    pub links: &'a PublicUrl,
}

impl ProductCards<'_> {
    /// Reply for a similarity result: a text when nothing matched, a single
    /// card for one match, a list otherwise.
    pub fn for_matches(&self, products: Vec<ProductMatch>) -> ReplyPayload {
        if products.len() > 1 {
            return self.list(products);
        }
        match products.into_iter().next() {
            Some(product) => self.single(product),
            None => ReplyPayload::text(&self.replies.no_matched_product),
        }
    }

    /// Generic template for one product, linking to its detail page.
    pub fn single(&self, product: ProductMatch) -> ReplyPayload {
        let element = Element {
            title: product.card_title(),
            subtitle: Some(format!(
                "{}\nPrice: {}\nIn Stock: {}",
                product.name,
                product.price_label(),
                product.inventory_level
            )),
            image_url: non_empty(&product.image),
            buttons: Vec::new(),
        };
        let url = self.links.products_url(&ProductView::single(product));
        ReplyPayload::generic(vec![Element {
            buttons: vec![Button::web_url(&self.replies.view_product_button, url)],
            ..element
        }])
    }

    /// List template with one item per product, in order, and a button
    /// opening the product page on the first one. Only the first
    /// [`MAX_LIST_ELEMENTS`] products get an item; the product page behind the
    /// button still carries all of them.
    pub fn list(&self, products: Vec<ProductMatch>) -> ReplyPayload {
        if products.len() > MAX_LIST_ELEMENTS {
            warn!(
                matches = products.len(),
                shown = MAX_LIST_ELEMENTS,
                "too many products for a list reply, truncating"
            );
        }
        let elements = products
            .iter()
            .take(MAX_LIST_ELEMENTS)
            .map(|product| Element {
                title: if product.name.is_empty() {
                    product.product_id.clone()
                } else {
                    product.name.clone()
                },
                subtitle: Some(format!(
                    "{}\nPrice: {}",
                    product.card_title(),
                    product.price_label()
                )),
                image_url: non_empty(&product.image),
                buttons: Vec::new(),
            })
            .collect();

        let buttons = match products.first() {
            Some(first) => {
                let view = ProductView {
                    selected_product: first.clone(),
                    similar_products: products.clone(),
                };
                vec![Button::web_url(
                    &self.replies.view_more_button,
                    self.links.products_url(&view),
                )]
            },
            None => Vec::new(),
        };
        ReplyPayload::list(elements, buttons)
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
